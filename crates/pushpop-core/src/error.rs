use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A required field is missing or a value is malformed.
    #[error("{0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }
}
