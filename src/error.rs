#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
