use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::models::{PriorityBreakdown, WorkItem};
use crate::priority::{PeerIndex, Scorer};

pub const METRIC_DURATION_MS: &str = "priority.duration_ms";
pub const METRIC_DUE_URGENCY: &str = "priority.due_urgency";
pub const METRIC_GRADE_WEIGHT: &str = "priority.grade_weight";
pub const METRIC_GRADE_IMPACT: &str = "priority.grade_impact";
pub const METRIC_SCORE: &str = "priority.score";

/// Receives named metric samples from instrumented scoring.
pub trait MetricObserver: Send + Sync {
    fn on_metric(&self, name: &str, value: f64);
}

impl<T: MetricObserver + ?Sized> MetricObserver for &T {
    fn on_metric(&self, name: &str, value: f64) {
        (**self).on_metric(name, value);
    }
}

impl<A: MetricObserver, B: MetricObserver> MetricObserver for (A, B) {
    fn on_metric(&self, name: &str, value: f64) {
        self.0.on_metric(name, value);
        self.1.on_metric(name, value);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MetricObserver for NoopObserver {
    fn on_metric(&self, _name: &str, _value: f64) {}
}

/// Forwards every metric as a debug-level tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl MetricObserver for TracingObserver {
    fn on_metric(&self, name: &str, value: f64) {
        tracing::debug!(metric = name, value, "priority metric");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub name: String,
    pub count: usize,
    pub total: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
}

/// Collects samples in memory and summarizes them per metric name.
#[derive(Debug, Default)]
pub struct TimingCollector {
    samples: Mutex<BTreeMap<String, Vec<f64>>>,
}

impl TimingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self) -> Vec<MetricSummary> {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| {
                let total: f64 = values.iter().sum();
                MetricSummary {
                    name: name.clone(),
                    count: values.len(),
                    total,
                    average: total / values.len() as f64,
                    max: values.iter().copied().fold(f64::MIN, f64::max),
                    min: values.iter().copied().fold(f64::MAX, f64::min),
                }
            })
            .collect()
    }
}

impl MetricObserver for TimingCollector {
    fn on_metric(&self, name: &str, value: f64) {
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.entry(name.to_string()).or_default().push(value);
    }
}

/// Wraps a scorer and reports timing and factor values for every call.
pub struct InstrumentedScorer<S, O> {
    inner: S,
    observer: O,
}

impl<S: Scorer, O: MetricObserver> InstrumentedScorer<S, O> {
    pub fn new(inner: S, observer: O) -> Self {
        Self { inner, observer }
    }
}

impl<S: Scorer, O: MetricObserver> Scorer for InstrumentedScorer<S, O> {
    fn breakdown_at(
        &self,
        item: &WorkItem,
        peers: &PeerIndex,
        now: DateTime<Utc>,
    ) -> PriorityBreakdown {
        let started = Instant::now();
        let breakdown = self.inner.breakdown_at(item, peers, now);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.observer.on_metric(METRIC_DURATION_MS, elapsed_ms);
        self.observer
            .on_metric(METRIC_DUE_URGENCY, breakdown.due_urgency);
        self.observer
            .on_metric(METRIC_GRADE_WEIGHT, breakdown.grade_weight_factor);
        self.observer
            .on_metric(METRIC_GRADE_IMPACT, breakdown.grade_impact_factor);
        self.observer.on_metric(METRIC_SCORE, breakdown.score);
        breakdown
    }
}
