use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Assignment,
    Quiz,
    Discussion,
    Announcement,
    #[serde(other)]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Assignment => "assignment",
            Category::Quiz => "quiz",
            Category::Discussion => "discussion",
            Category::Announcement => "announcement",
            Category::Other => "other",
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "assignment" => Category::Assignment,
            "quiz" => Category::Quiz,
            "discussion" => Category::Discussion,
            "announcement" => Category::Announcement,
            _ => Category::Other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub title: String,
    pub due_at: DateTime<Utc>,
    pub group_id: String,
    pub grade_weight: Option<f64>,
    pub points_possible: Option<f64>,
    pub current_score: Option<f64>,
    pub completed: bool,
    pub category: Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub due_date: f64,
    pub grade_weight: f64,
    pub impact: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            due_date: 0.4,
            grade_weight: 0.3,
            impact: 0.3,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PriorityBucket {
    High,
    Medium,
    Low,
}

impl PriorityBucket {
    pub const HIGH_THRESHOLD: f64 = 0.7;
    pub const MEDIUM_THRESHOLD: f64 = 0.4;

    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            PriorityBucket::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            PriorityBucket::Medium
        } else {
            PriorityBucket::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityBucket::High => "high",
            PriorityBucket::Medium => "medium",
            PriorityBucket::Low => "low",
        }
    }
}

impl fmt::Display for PriorityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individual components behind a final priority score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriorityBreakdown {
    pub due_urgency: f64,
    pub grade_weight_factor: f64,
    pub grade_impact_factor: f64,
    pub type_multiplier: f64,
    pub weights: WeightConfig,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem {
    pub item: WorkItem,
    pub breakdown: PriorityBreakdown,
    pub bucket: PriorityBucket,
}

impl ScoredItem {
    pub fn score(&self) -> f64 {
        self.breakdown.score
    }
}

#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: Category,
    pub count: usize,
    pub avg_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_follow_fixed_thresholds() {
        assert_eq!(PriorityBucket::from_score(1.0), PriorityBucket::High);
        assert_eq!(PriorityBucket::from_score(0.7), PriorityBucket::High);
        assert_eq!(PriorityBucket::from_score(0.6999), PriorityBucket::Medium);
        assert_eq!(PriorityBucket::from_score(0.4), PriorityBucket::Medium);
        assert_eq!(PriorityBucket::from_score(0.3999), PriorityBucket::Low);
        assert_eq!(PriorityBucket::from_score(0.0), PriorityBucket::Low);
    }

    #[test]
    fn categories_parse_leniently() {
        assert_eq!(Category::from("Quiz"), Category::Quiz);
        assert_eq!(Category::from(" discussion "), Category::Discussion);
        assert_eq!(Category::from("lab"), Category::Other);
    }

    #[test]
    fn unknown_category_deserializes_to_other() {
        let parsed: Category = serde_json::from_str("\"survey\"").unwrap();
        assert_eq!(parsed, Category::Other);
    }
}
