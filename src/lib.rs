pub mod config;
pub mod db;
pub mod error;
pub mod factors;
pub mod ingest;
pub mod models;
pub mod observer;
pub mod priority;
pub mod report;
pub mod weights;

pub use error::ScoringError;
pub use models::{Category, PriorityBucket, WeightConfig, WorkItem};
pub use priority::{score_priority, PriorityEngine};
