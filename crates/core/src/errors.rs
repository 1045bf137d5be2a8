use thiserror::Error;

use crate::{models::queue::QueueStatus, store::StoreUnavailable};

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid transition: cannot {action} an entry that is {from}")]
    InvalidTransition {
        from: QueueStatus,
        action: &'static str,
    },

    #[error("Student is already in queue")]
    AlreadyInQueue,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Database error: {0}")]
    Database(eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl QueueError {
    /// Stable machine-readable kind, used as the `code` field of error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            QueueError::NotFound(_) => "not_found",
            QueueError::Forbidden(_) => "forbidden",
            QueueError::InvalidTransition { .. } => "invalid_transition",
            QueueError::AlreadyInQueue => "already_in_queue",
            QueueError::Validation(_) => "validation",
            QueueError::Authentication(_) => "authentication",
            QueueError::Transport(_) => "transport",
            QueueError::Database(_) => "database",
            QueueError::Internal(_) => "internal",
        }
    }
}

/// Store failures become `Database` errors, except when the store marked
/// itself unreachable, which is a `Transport` error.
impl From<eyre::Report> for QueueError {
    fn from(report: eyre::Report) -> Self {
        match report.downcast_ref::<StoreUnavailable>() {
            Some(unavailable) => QueueError::Transport(unavailable.to_string()),
            None => QueueError::Database(report),
        }
    }
}

pub type QueueResult<T> = Result<T, QueueError>;
