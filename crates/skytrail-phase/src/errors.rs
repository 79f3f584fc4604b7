use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlightModelError>;

#[derive(Error, Debug)]
pub enum FlightModelError {
    #[error("IO error {0}")]
    IOError(#[from] std::io::Error),

    #[error("flight model file parse error {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("model '{model}' refers to unknown parent '{parent}'")]
    UnknownParent { model: String, parent: String },
}
