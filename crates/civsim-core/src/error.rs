//! Engine error taxonomy.

use thiserror::Error;

use crate::citizen::CitizenId;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("citizen store is full (capacity {capacity})")]
    Capacity { capacity: usize },

    #[error("citizen not found: {0}")]
    NotFound(CitizenId),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("resource exhausted: {pool}")]
    ResourceExhausted { pool: &'static str },

    #[error("citizen store corrupted: {0}")]
    StoreCorrupted(String),

    #[error("engine halted after an unrecoverable error")]
    Halted,

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<civsim_logic::state::UnknownState> for EngineError {
    fn from(e: civsim_logic::state::UnknownState) -> Self {
        EngineError::Configuration(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// A problem confined to one citizen. The citizen is flagged and skipped;
/// the rest of the batch carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CitizenFault {
    #[error("non-finite {field}")]
    NonFinite { field: &'static str },

    #[error("{field} out of range")]
    OutOfRange { field: &'static str },

    #[error("relationship list inconsistent")]
    Relationships,
}
