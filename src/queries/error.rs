//! Errors surfaced by query gates.

use crate::backend::{
    map_backend_error, BackendErrorInfo, ErrorCode, RecoveryAction, TransportError,
};

/// Caller-visible failure of a gated read.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum QueryError {
    /// The backend answered with a domain error.
    #[error("{}", .info.message)]
    Domain {
        code: ErrorCode,
        info: BackendErrorInfo,
    },
    /// The gate was asked to fetch without a ready client.
    #[error("Backend actor not available")]
    ActorUnavailable,
    /// Query-level retries ran out on transport failures.
    #[error("{0}")]
    Transport(TransportError),
}

impl QueryError {
    pub fn domain(code: ErrorCode) -> Self {
        QueryError::Domain {
            code,
            info: map_backend_error(code),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            QueryError::Domain { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Recovery actions to offer the user.
    pub fn actions(&self) -> &'static [RecoveryAction] {
        match self {
            QueryError::Domain { info, .. } => info.actions,
            QueryError::ActorUnavailable | QueryError::Transport(_) => &[RecoveryAction::Retry],
        }
    }
}

impl From<TransportError> for QueryError {
    fn from(e: TransportError) -> Self {
        QueryError::Transport(e)
    }
}
