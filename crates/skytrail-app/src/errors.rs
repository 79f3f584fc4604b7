use thiserror::Error;

use skytrail_core::errors::TrajectoryError;
use skytrail_phase::errors::FlightModelError;

pub type Result<T> = std::result::Result<T, ReplayError>;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("IO error {0}")]
    IOError(#[from] std::io::Error),

    #[error("track file error {0}")]
    TrackError(#[from] serde_json::Error),

    #[error("engine config error {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("flight model error {0}")]
    ModelError(#[from] FlightModelError),

    #[error("flight data error {0}")]
    FeedError(#[from] TrajectoryError),

    #[error("feed worker stopped")]
    WorkerGone,
}
