use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{CategorySummary, PriorityBucket, ScoredItem};

pub fn summarize_by_category(ranked: &[ScoredItem]) -> Vec<CategorySummary> {
    let mut map: std::collections::HashMap<_, (usize, f64)> = std::collections::HashMap::new();

    for scored in ranked {
        let entry = map.entry(scored.item.category).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += scored.score();
    }

    let mut summaries: Vec<CategorySummary> = map
        .into_iter()
        .map(|(category, (count, total_score))| CategorySummary {
            category,
            count,
            avg_score: if count == 0 {
                0.0
            } else {
                total_score / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.category.as_str().cmp(b.category.as_str()))
    });
    summaries
}

pub fn count_by_bucket(ranked: &[ScoredItem]) -> [(PriorityBucket, usize); 3] {
    let mut counts = [
        (PriorityBucket::High, 0),
        (PriorityBucket::Medium, 0),
        (PriorityBucket::Low, 0),
    ];
    for scored in ranked {
        if let Some(entry) = counts.iter_mut().find(|(bucket, _)| *bucket == scored.bucket) {
            entry.1 += 1;
        }
    }
    counts
}

pub fn format_item_line(scored: &ScoredItem) -> String {
    format!(
        "{} [{}, {}] due {} score {:.2} ({})",
        scored.item.title,
        scored.item.group_id,
        scored.item.category,
        scored.item.due_at.format("%Y-%m-%d %H:%M UTC"),
        scored.score(),
        scored.bucket
    )
}

pub fn build_report(group: Option<&str>, now: DateTime<Utc>, ranked: &[ScoredItem]) -> String {
    let summaries = summarize_by_category(ranked);

    let mut output = String::new();
    let group_label = group.unwrap_or("all courses");

    let _ = writeln!(output, "# CanvasPal Priority Report");
    let _ = writeln!(
        output,
        "Generated for {} at {}",
        group_label,
        now.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Priority Mix");

    if ranked.is_empty() {
        let _ = writeln!(output, "No work items to prioritize.");
    } else {
        for (bucket, count) in count_by_bucket(ranked) {
            let _ = writeln!(output, "- {bucket}: {count} items");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Category");

    if summaries.is_empty() {
        let _ = writeln!(output, "No work items to prioritize.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} items (avg score {:.2})",
                summary.category, summary.count, summary.avg_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Priorities");

    let open: Vec<&ScoredItem> = ranked.iter().filter(|s| !s.item.completed).collect();
    if open.is_empty() {
        let _ = writeln!(output, "Nothing left to do.");
    } else {
        for scored in open.iter().take(10) {
            let b = &scored.breakdown;
            let _ = writeln!(output, "- {}", format_item_line(scored));
            let _ = writeln!(
                output,
                "  - urgency {:.2}, grade weight {:.2}, impact {:.2}, type x{:.1}",
                b.due_urgency, b.grade_weight_factor, b.grade_impact_factor, b.type_multiplier
            );
        }
    }

    let mut upcoming: Vec<&ScoredItem> = open
        .iter()
        .copied()
        .filter(|s| s.item.due_at >= now)
        .collect();
    upcoming.sort_by(|a, b| a.item.due_at.cmp(&b.item.due_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming Deadlines");

    if upcoming.is_empty() {
        let _ = writeln!(output, "No upcoming deadlines.");
    } else {
        for scored in upcoming.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}) on {}",
                scored.item.title,
                scored.item.group_id,
                scored.item.due_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
    }

    output
}
