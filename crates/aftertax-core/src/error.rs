use thiserror::Error;

#[derive(Debug, Error)]
pub enum AfterTaxError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Malformed bracket table: {reason}")]
    MalformedBracketTable { reason: String },

    #[error("Unknown jurisdiction: {0}")]
    UnknownJurisdiction(String),

    #[error("Unknown account setup '{name}' for jurisdiction '{jurisdiction}'")]
    UnknownAccountSetup { jurisdiction: String, name: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for AfterTaxError {
    fn from(e: serde_json::Error) -> Self {
        AfterTaxError::SerializationError(e.to_string())
    }
}
