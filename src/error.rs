use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the hotbar store.
///
/// Only caller contract violations and lifecycle misuse are returned here.
/// Soft policy violations (an out-of-range preferred index, an unknown hotbar
/// id) are logged and degrade to a fallback instead, and persistence failures
/// are logged without rolling back in-memory state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The entity handed to the store does not have the required shape.
    #[error("invalid catalog entity: {0}")]
    InvalidEntity(String),

    /// A slot index outside of `[0, capacity)`.
    #[error("slot index {index} is outside of range [0, {capacity})")]
    IndexOutOfRange { index: i64, capacity: usize },

    #[error("cannot remove the last hotbar")]
    LastHotbar,

    #[error("hotbar {0} is protected and cannot be removed")]
    ProtectedHotbar(Uuid),

    #[error("a hotbar with id {0} already exists")]
    DuplicateHotbar(Uuid),

    #[error("hotbar store has already been created")]
    AlreadyInitialized,

    #[error("hotbar store has not been created")]
    NotInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether this error is a slot-bounds violation.
    pub fn is_range_error(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. })
    }

    /// Whether this error is an entity shape violation.
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::InvalidEntity(_))
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
