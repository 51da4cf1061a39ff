use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to parse engine config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
    #[error("invalid palette color `{0}`, expected #RRGGBB")]
    InvalidColor(String),
    #[error("platform error: {0}")]
    Platform(Box<dyn std::error::Error + Send + Sync>),
    #[error("trail manager is already active")]
    AlreadyActive,
    #[error("trail manager has been torn down")]
    TornDown,
}

impl From<Box<dyn std::error::Error + Send + Sync>> for EngineError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        EngineError::Platform(err)
    }
}
