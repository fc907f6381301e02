use chrono::{DateTime, Utc};

use crate::config::Tuning;
use crate::models::Category;

const LOW_STANDING_PERCENT: f64 = 70.0;
const FAIR_STANDING_PERCENT: f64 = 80.0;

/// Clamps into [0, 1]. NaN maps to 0, infinities saturate.
pub fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub fn hours_until(due_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (due_at - now).num_milliseconds() as f64 / 3_600_000.0
}

/// Urgency from time remaining: saturated when overdue, zero past the window,
/// linear in between plus the largest matching bonus band.
///
/// Bonus bands do not add to each other: an item inside several windows gets
/// only the biggest bonus among them.
pub fn due_urgency(due_at: DateTime<Utc>, now: DateTime<Utc>, tuning: &Tuning) -> f64 {
    let remaining_hours = hours_until(due_at, now);
    if remaining_hours <= 0.0 {
        return 1.0;
    }

    let days_remaining = remaining_hours / 24.0;
    if days_remaining > tuning.far_future_days {
        return 0.0;
    }

    let linear = 1.0 - days_remaining / tuning.far_future_days;
    let bonus = tuning
        .bonus_bands
        .iter()
        .filter(|band| remaining_hours <= band.within_hours)
        .map(|band| band.bonus)
        .fold(0.0, f64::max);

    unit(linear + bonus)
}

/// `peer_max` is the heaviest grade weight in the item's group.
pub fn grade_weight_factor(grade_weight: Option<f64>, peer_max: f64, tuning: &Tuning) -> f64 {
    let Some(weight) = usable(grade_weight) else {
        return tuning.default_grade_weight_factor;
    };

    let absolute = weight / 100.0;
    if !tuning.peer_normalization || !peer_max.is_finite() || peer_max <= 0.0 {
        return unit(absolute);
    }

    let relative = weight / peer_max;
    unit((absolute + relative) / 2.0)
}

pub fn standing_multiplier(current_percent: f64, tuning: &Tuning) -> f64 {
    if current_percent < LOW_STANDING_PERCENT {
        1.5
    } else if current_percent < FAIR_STANDING_PERCENT {
        1.2
    } else if tuning.excellence_damping && current_percent >= tuning.excellence_cutoff {
        0.8
    } else {
        1.0
    }
}

pub fn grade_impact_factor(
    points_possible: Option<f64>,
    current_score: Option<f64>,
    tuning: &Tuning,
) -> f64 {
    let (Some(possible), Some(score)) = (usable(points_possible), usable(current_score)) else {
        return tuning.default_impact_factor;
    };
    if possible <= 0.0 {
        return tuning.default_impact_factor;
    }

    let current_percent = score / possible * 100.0;
    let potential_impact = (possible - score) / possible;
    unit(potential_impact * standing_multiplier(current_percent, tuning))
}

pub fn type_multiplier(category: Category) -> f64 {
    match category {
        Category::Quiz => 1.2,
        Category::Assignment => 1.0,
        Category::Discussion => 0.8,
        Category::Announcement => 0.5,
        Category::Other => 1.0,
    }
}
