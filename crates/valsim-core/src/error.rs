use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Simulation cancelled before completion")]
    Cancelled,

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl EngineError {
    /// True when the error is a problem with the request itself rather than
    /// with the engine. A request/response transport maps these to a client
    /// error (HTTP 400); everything else is a generic server failure (500).
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidInput { .. }
                | EngineError::FinancialImpossibility(_)
                | EngineError::InsufficientData(_)
        )
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::SerializationError(e.to_string())
    }
}
