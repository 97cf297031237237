use thiserror::Error;

pub type Result<T> = std::result::Result<T, TweekError>;

#[derive(Error, Debug)]
pub enum TweekError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Media not captured for content {0}")]
    NotCaptured(String),
}

impl From<serde_json::Error> for TweekError {
    fn from(err: serde_json::Error) -> Self {
        TweekError::Decode(err.to_string())
    }
}
