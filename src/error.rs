//! Engine Errors
//!
//! Only caller contract violations surface here. Corrupted stored state is
//! repaired by [`crate::sanitize`] and never produces an error.

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid grade {0}: expected 0..=5")]
    InvalidGrade(u8),
    #[error("config error: {0}")]
    Config(String),
    #[error("json decode failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
