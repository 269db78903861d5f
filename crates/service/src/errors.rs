use thiserror::Error;

use crate::actionlog::Severity;
use crate::store::StoreError;

/// Caller-facing classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidFormat,
    NotFound,
    PermissionDenied,
    StaleData,
    HandleNotUnique,
    StoreFailure,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid ID")]
    InvalidId,
    #[error("invalid handle")]
    InvalidHandle,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("not allowed to {0}")]
    NotAllowed(&'static str),
    #[error("stale data")]
    StaleData,
    #[error("handle not unique")]
    HandleNotUnique,
    #[error("store error: {0}")]
    Store(#[source] StoreError),
    #[error("operation cancelled")]
    Cancelled,
}

/// A handle clash caught by the store itself (a concurrent writer won the
/// race past the uniqueness check) surfaces like the check's own failure.
impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::HandleTaken => ServiceError::HandleNotUnique,
            other => ServiceError::Store(other),
        }
    }
}

impl ServiceError {
    pub fn not_found(entity: &'static str) -> Self { Self::NotFound(entity) }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidId => ErrorKind::InvalidArgument,
            ServiceError::InvalidHandle => ErrorKind::InvalidFormat,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::NotAllowed(_) => ErrorKind::PermissionDenied,
            ServiceError::StaleData => ErrorKind::StaleData,
            ServiceError::HandleNotUnique => ErrorKind::HandleNotUnique,
            ServiceError::Store(_) => ErrorKind::StoreFailure,
            ServiceError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::InvalidId => 2001,
            ServiceError::InvalidHandle => 2002,
            ServiceError::NotFound(_) => 2003,
            ServiceError::NotAllowed(_) => 2004,
            ServiceError::StaleData => 2005,
            ServiceError::HandleNotUnique => 2006,
            ServiceError::Store(_) => 2100,
            ServiceError::Cancelled => 2200,
        }
    }

    /// Severity of the action record written for a failed operation.
    pub fn severity(&self) -> Severity {
        match self {
            ServiceError::Store(_) => Severity::Error,
            _ => Severity::Warning,
        }
    }
}
