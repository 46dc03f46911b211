use thiserror::Error;

/// Recoverable conditions surfaced by the session core. None of them is
/// fatal; the rejected operation leaves all state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BeastError {
    #[error("Unknown step '{step}' for the {flow} flow")]
    InvalidStep { flow: &'static str, step: String },

    #[error("Incomplete configuration: {0}")]
    IncompleteConfiguration(String),

    #[error("Rate your confidence before answering")]
    MissingConfidence,

    #[error("Confidence must be between 1 and 5, got {0}")]
    InvalidConfidence(u8),

    #[error("Option {selected} is out of range ({available} options)")]
    InvalidOption { selected: usize, available: usize },

    #[error("Answer for question {got} submitted while question {expected} is current")]
    OutOfOrder { expected: usize, got: usize },

    #[error("Operation not allowed while {0}")]
    NotActive(&'static str),

    #[error("Write a reflection on the missed question before moving on")]
    ReflectionRequired,

    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl From<std::io::Error> for BeastError {
    fn from(err: std::io::Error) -> Self {
        BeastError::StorageFailure(err.to_string())
    }
}

impl From<serde_json::Error> for BeastError {
    fn from(err: serde_json::Error) -> Self {
        BeastError::StorageFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BeastError>;
