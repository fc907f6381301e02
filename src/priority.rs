use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::{ScoringConfig, Tuning};
use crate::error::ScoringError;
use crate::factors::{due_urgency, grade_impact_factor, grade_weight_factor, type_multiplier, unit};
use crate::models::{
    Category, PriorityBreakdown, PriorityBucket, ScoredItem, WeightConfig, WorkItem,
};
use crate::weights::normalize_weights;

/// Grade weight used as the peer maximum when a group has no positive weights.
const FULL_GRADE_PERCENT: f64 = 100.0;

/// Heaviest grade weight per group, computed once before scoring a batch.
#[derive(Debug, Clone, Default)]
pub struct PeerIndex {
    max_by_group: HashMap<String, f64>,
}

impl PeerIndex {
    pub fn build<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a WorkItem>,
    {
        let mut max_by_group: HashMap<String, f64> = HashMap::new();
        for item in items {
            let Some(weight) = item.grade_weight.filter(|w| w.is_finite() && *w > 0.0) else {
                continue;
            };
            let entry = max_by_group.entry(item.group_id.clone()).or_insert(weight);
            if weight > *entry {
                *entry = weight;
            }
        }
        Self { max_by_group }
    }

    pub fn max_grade_weight(&self, group_id: &str) -> f64 {
        self.max_by_group
            .get(group_id)
            .copied()
            .unwrap_or(FULL_GRADE_PERCENT)
    }
}

/// Anything that can turn a work item into a priority breakdown.
pub trait Scorer {
    fn breakdown_at(
        &self,
        item: &WorkItem,
        peers: &PeerIndex,
        now: DateTime<Utc>,
    ) -> PriorityBreakdown;

    fn score_at(&self, item: &WorkItem, peers: &PeerIndex, now: DateTime<Utc>) -> f64 {
        self.breakdown_at(item, peers, now).score
    }
}

/// The pure scoring engine. Weights are normalized once at construction.
#[derive(Debug, Clone)]
pub struct PriorityEngine {
    weights: WeightConfig,
    tuning: Tuning,
}

impl PriorityEngine {
    pub fn new(weights: &WeightConfig, tuning: Tuning) -> Result<Self, ScoringError> {
        let weights = normalize_weights(weights)?;
        tuning.validate()?;
        Ok(Self { weights, tuning })
    }

    pub fn from_config(config: &ScoringConfig) -> Result<Self, ScoringError> {
        Self::new(&config.weights, config.tuning.clone())
    }

    pub fn weights(&self) -> &WeightConfig {
        &self.weights
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }
}

impl Scorer for PriorityEngine {
    fn breakdown_at(
        &self,
        item: &WorkItem,
        peers: &PeerIndex,
        now: DateTime<Utc>,
    ) -> PriorityBreakdown {
        let multiplier = type_multiplier(item.category);
        if item.completed {
            return PriorityBreakdown {
                due_urgency: 0.0,
                grade_weight_factor: 0.0,
                grade_impact_factor: 0.0,
                type_multiplier: multiplier,
                weights: self.weights,
                score: 0.0,
            };
        }

        let urgency = due_urgency(item.due_at, now, &self.tuning);
        let weight_factor = grade_weight_factor(
            item.grade_weight,
            peers.max_grade_weight(&item.group_id),
            &self.tuning,
        );
        let impact = grade_impact_factor(item.points_possible, item.current_score, &self.tuning);

        let base = urgency * self.weights.due_date
            + weight_factor * self.weights.grade_weight
            + impact * self.weights.impact;

        PriorityBreakdown {
            due_urgency: urgency,
            grade_weight_factor: weight_factor,
            grade_impact_factor: impact,
            type_multiplier: multiplier,
            weights: self.weights,
            score: unit(base * multiplier),
        }
    }
}

/// Scores one item against its peer group with default tuning and the current time.
pub fn score_priority(
    item: &WorkItem,
    peers: &[WorkItem],
    weights: &WeightConfig,
) -> Result<f64, ScoringError> {
    let engine = PriorityEngine::new(weights, Tuning::default())?;
    let index = PeerIndex::build(peers.iter().chain(std::iter::once(item)));
    Ok(engine.score_at(item, &index, Utc::now()))
}

/// Scores a batch against a single time sample, highest priority first.
pub fn rank_items<S: Scorer + ?Sized>(
    scorer: &S,
    items: &[WorkItem],
    now: DateTime<Utc>,
) -> Vec<ScoredItem> {
    let index = PeerIndex::build(items);
    let mut ranked: Vec<ScoredItem> = items
        .iter()
        .map(|item| {
            let breakdown = scorer.breakdown_at(item, &index, now);
            ScoredItem {
                item: item.clone(),
                bucket: PriorityBucket::from_score(breakdown.score),
                breakdown,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.item.due_at.cmp(&b.item.due_at))
    });
    ranked
}

pub fn filter_ranked(
    ranked: Vec<ScoredItem>,
    bucket: Option<PriorityBucket>,
    category: Option<Category>,
) -> Vec<ScoredItem> {
    ranked
        .into_iter()
        .filter(|scored| bucket.map_or(true, |b| scored.bucket == b))
        .filter(|scored| category.map_or(true, |c| scored.item.category == c))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    pub(crate) fn sample_item(title: &str, due_in: Duration) -> WorkItem {
        WorkItem {
            title: title.to_string(),
            due_at: now() + due_in,
            group_id: "BIO-101".to_string(),
            grade_weight: Some(20.0),
            points_possible: Some(100.0),
            current_score: Some(75.0),
            completed: false,
            category: Category::Assignment,
        }
    }

    fn engine(weights: WeightConfig) -> PriorityEngine {
        PriorityEngine::new(&weights, Tuning::default()).unwrap()
    }

    fn score(engine: &PriorityEngine, item: &WorkItem, peers: &[WorkItem]) -> f64 {
        let index = PeerIndex::build(peers.iter().chain(std::iter::once(item)));
        engine.score_at(item, &index, now())
    }

    fn weights(due_date: f64, grade_weight: f64, impact: f64) -> WeightConfig {
        WeightConfig {
            due_date,
            grade_weight,
            impact,
        }
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let engine = engine(WeightConfig::default());
        let mut items = Vec::new();
        for days in [-30, -1, 0, 1, 3, 7, 10, 40] {
            for category in [Category::Quiz, Category::Announcement, Category::Other] {
                let mut item = sample_item("bounded", Duration::days(days));
                item.category = category;
                item.current_score = Some(-50.0);
                item.grade_weight = Some(180.0);
                items.push(item);
            }
        }
        for item in &items {
            let value = score(&engine, item, &items);
            assert!((0.0..=1.0).contains(&value), "{value} out of range");
        }
    }

    #[test]
    fn completed_items_score_zero() {
        let engine = engine(WeightConfig::default());
        let mut item = sample_item("done", Duration::days(-2));
        item.category = Category::Quiz;
        item.current_score = Some(10.0);
        item.completed = true;
        assert_eq!(score(&engine, &item, &[]), 0.0);
    }

    #[test]
    fn sooner_items_rank_higher() {
        let engine = engine(WeightConfig::default());
        let soon = sample_item("soon", Duration::days(1));
        let later = sample_item("later", Duration::days(7));
        let peers = vec![soon.clone(), later.clone()];
        assert!(score(&engine, &soon, &peers) > score(&engine, &later, &peers));
    }

    #[test]
    fn overdue_matches_due_now() {
        let engine = engine(weights(1.0, 0.0, 0.0));
        let overdue = sample_item("overdue", Duration::days(-4));
        let due_now = sample_item("now", Duration::zero());
        assert_eq!(score(&engine, &overdue, &[]), 1.0);
        assert_eq!(score(&engine, &due_now, &[]), 1.0);
    }

    #[test]
    fn scaling_weights_does_not_change_score() {
        let small = engine(weights(3.0, 3.0, 4.0));
        let large = engine(weights(30.0, 30.0, 40.0));
        let item = sample_item("scaled", Duration::days(4));
        let peers = vec![item.clone(), sample_item("peer", Duration::days(2))];
        let a = score(&small, &item, &peers);
        let b = score(&large, &item, &peers);
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn zero_weights_are_rejected() {
        let item = sample_item("any", Duration::days(1));
        let err = score_priority(&item, &[], &weights(0.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidConfiguration(_)));
    }

    fn live_item(title: &str, due_in: Duration) -> WorkItem {
        WorkItem {
            due_at: Utc::now() + due_in,
            ..sample_item(title, Duration::zero())
        }
    }

    #[test]
    fn score_priority_zeroes_completed_items() {
        let mut item = live_item("done", Duration::hours(-5));
        item.category = Category::Quiz;
        item.completed = true;
        let value = score_priority(&item, &[], &WeightConfig::default()).unwrap();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn score_priority_saturates_overdue_items() {
        let item = live_item("late", Duration::days(-2));
        let value = score_priority(&item, &[], &weights(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(value, 1.0);
    }

    #[test]
    fn score_priority_ignores_weight_scale() {
        let item = live_item("essay", Duration::days(20));
        let peers = vec![live_item("quiz", Duration::days(3))];
        let small = score_priority(&item, &peers, &weights(3.0, 3.0, 4.0)).unwrap();
        let large = score_priority(&item, &peers, &weights(30.0, 30.0, 40.0)).unwrap();
        assert!((0.0..=1.0).contains(&small));
        assert!((small - large).abs() < 1e-12, "{small} != {large}");
    }

    #[test]
    fn score_priority_blends_only_same_group_peers() {
        let grade_only = weights(0.0, 1.0, 0.0);
        let item = live_item("lab", Duration::days(20));

        let mut other_course = live_item("term paper", Duration::days(20));
        other_course.group_id = "HIST-200".to_string();
        other_course.grade_weight = Some(80.0);

        let alone = score_priority(&item, &[], &grade_only).unwrap();
        let with_other_course = score_priority(&item, &[other_course], &grade_only).unwrap();
        // the item is its own heaviest peer: (0.2 + 20 / 20) / 2
        assert!((alone - 0.6).abs() < 1e-12, "got {alone}");
        assert!((with_other_course - alone).abs() < 1e-12);

        let mut heavier_classmate = live_item("final", Duration::days(20));
        heavier_classmate.grade_weight = Some(80.0);
        let with_classmate = score_priority(&item, &[heavier_classmate], &grade_only).unwrap();
        // (0.2 + 20 / 80) / 2
        assert!((with_classmate - 0.225).abs() < 1e-12, "got {with_classmate}");
    }

    #[test]
    fn quizzes_outrank_discussions() {
        let engine = engine(WeightConfig::default());
        let mut quiz = sample_item("quiz", Duration::days(5));
        quiz.category = Category::Quiz;
        let mut discussion = quiz.clone();
        discussion.category = Category::Discussion;
        assert!(score(&engine, &quiz, &[]) > score(&engine, &discussion, &[]));
    }

    #[test]
    fn urgent_important_beats_later_unimportant() {
        let engine = engine(WeightConfig::default());
        let urgent = WorkItem {
            title: "Lab report".to_string(),
            due_at: now() + Duration::days(1),
            group_id: "CHEM-110".to_string(),
            grade_weight: Some(40.0),
            points_possible: Some(100.0),
            current_score: Some(65.0),
            completed: false,
            category: Category::Assignment,
        };
        let later = WorkItem {
            title: "Reading reflection".to_string(),
            due_at: now() + Duration::days(7),
            grade_weight: Some(10.0),
            current_score: Some(85.0),
            ..urgent.clone()
        };
        let peers = vec![urgent.clone(), later.clone()];
        let urgent_score = score(&engine, &urgent, &peers);
        let later_score = score(&engine, &later, &peers);
        assert!(
            urgent_score > 1.5 * later_score,
            "{urgent_score} vs {later_score}"
        );
    }

    #[test]
    fn missing_grade_data_uses_defaults() {
        let engine = engine(WeightConfig::default());
        let mut item = sample_item("sparse", Duration::days(20));
        item.grade_weight = None;
        item.points_possible = None;
        item.current_score = None;
        let breakdown = engine.breakdown_at(&item, &PeerIndex::default(), now());
        assert_eq!(breakdown.due_urgency, 0.0);
        assert_eq!(breakdown.grade_weight_factor, 0.4);
        assert_eq!(breakdown.grade_impact_factor, 0.5);
        assert!((breakdown.score - (0.4 * 0.3 + 0.5 * 0.3)).abs() < 1e-12);
    }

    #[test]
    fn peer_index_tracks_heaviest_weight_per_group() {
        let mut heavy = sample_item("final", Duration::days(3));
        heavy.grade_weight = Some(35.0);
        let mut other_group = sample_item("essay", Duration::days(3));
        other_group.group_id = "HIST-200".to_string();
        other_group.grade_weight = None;
        let items = vec![sample_item("quiz", Duration::days(1)), heavy, other_group];

        let index = PeerIndex::build(&items);
        assert_eq!(index.max_grade_weight("BIO-101"), 35.0);
        assert_eq!(index.max_grade_weight("HIST-200"), 100.0);
        assert_eq!(index.max_grade_weight("unknown"), 100.0);
    }

    #[test]
    fn ranking_sorts_by_score_then_due_date() {
        let engine = engine(WeightConfig::default());
        let mut done = sample_item("done", Duration::days(1));
        done.completed = true;
        let items = vec![
            sample_item("later", Duration::days(9)),
            done,
            sample_item("soon", Duration::hours(20)),
            sample_item("middle", Duration::days(4)),
        ];

        let ranked = rank_items(&engine, &items, now());
        let titles: Vec<&str> = ranked.iter().map(|s| s.item.title.as_str()).collect();
        assert_eq!(titles, vec!["soon", "middle", "later", "done"]);
        assert_eq!(ranked[3].bucket, PriorityBucket::Low);
    }

    #[test]
    fn filters_by_bucket_and_category() {
        let engine = engine(WeightConfig::default());
        let mut quiz = sample_item("quiz", Duration::hours(6));
        quiz.category = Category::Quiz;
        let items = vec![
            quiz,
            sample_item("assignment", Duration::hours(6)),
            sample_item("far", Duration::days(30)),
        ];
        let ranked = rank_items(&engine, &items, now());

        let high_quizzes = filter_ranked(
            ranked.clone(),
            Some(PriorityBucket::High),
            Some(Category::Quiz),
        );
        assert_eq!(high_quizzes.len(), 1);
        assert_eq!(high_quizzes[0].item.title, "quiz");

        let low = filter_ranked(ranked.clone(), Some(PriorityBucket::Low), None);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].item.title, "far");

        assert_eq!(filter_ranked(ranked, None, None).len(), 3);
    }
}
