use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrajectoryError>;

/// Failures that make an aircraft permanently invalid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrajectoryError {
    #[error("position not normal: {0}")]
    NumericInvalid(String),

    #[error("flight data lock poisoned")]
    LockPoisoned,

    #[error("flight data provider failed")]
    ProviderFailed,

    #[error("panic while advancing: {0}")]
    Panicked(String),
}
