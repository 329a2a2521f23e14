use std::fmt::Debug;

use thiserror::Error;
use uuid::Uuid;

use super::value_objects::Handle;

/// Contract of the external identity/index service mapping stable
/// identifiers to process-local handles.
///
/// Implementors are expected to be deterministic per identifier: asking twice
/// for the same identifier against the same store yields the same handle.
pub trait IdentifierLookup: Send + Sync {
    /// Looks up the handle assigned to `id`.
    ///
    /// Returns `Ok(None)` when the service is reachable but has not assigned a
    /// handle to the identifier yet, and `Err` when the service itself cannot
    /// answer.
    fn lookup(&self, id: &Uuid) -> Result<Option<Handle>, LookupFailure>;
}

/// Failure reported by an [`IdentifierLookup`] that could not answer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("identifier lookup failed: {reason}")]
pub struct LookupFailure {
    reason: String,
}

impl LookupFailure {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Opaque reference to a durable transaction produced by the external
/// versioning subsystem.
///
/// The classifier core stores and hands back commit records without looking
/// inside them.
pub trait CommitRecord: Debug + Send + Sync {}
