//! Error types for the storage layer.

use planner_core::{BoardId, GroupId, NoteId, NoteParent, UserId};
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Connection(#[from] sqlx::Error),

    /// User not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// Board not found.
    #[error("board not found: {0}")]
    BoardNotFound(BoardId),

    /// Group not found within the given board.
    #[error("group {group} not found in board {board}")]
    GroupNotFound { board: BoardId, group: GroupId },

    /// Note not found in its parent collection.
    #[error("note {id} not found in {parent}")]
    NoteNotFound { parent: NoteParent, id: NoteId },

    /// A membership removal included the board owner.
    #[error("the owner of board {0} cannot be removed from its members")]
    OwnerNotRemovable(BoardId),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row or document could not be mapped to a domain type.
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    MigrationError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The backend refused or failed the operation.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this error means the addressed entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::BoardNotFound(_)
                | Self::GroupNotFound { .. }
                | Self::NoteNotFound { .. }
        )
    }

    /// Maps unique-constraint violations to [`StoreError::Conflict`].
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(format!("{} already exists", what))
            }
            _ => Self::Connection(err),
        }
    }
}
