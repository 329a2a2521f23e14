use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::DashMap;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::kind::LogicNodeKind;
use crate::{
    config::ResolverSettings,
    ontology::{contracts::IdentifierLookup, value_objects::Handle},
};

/// Failures raised while resolving a logic-node kind to a handle.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The identifier-lookup service could not answer. Retrying later may
    /// succeed.
    #[error("identifier lookup unavailable for `{kind}` ({id}): {reason}")]
    LookupUnavailable {
        kind: LogicNodeKind,
        id: Uuid,
        reason: String,
    },
    /// The service answered but holds no handle for the identifier.
    #[error("no handle assigned to `{kind}` ({id})")]
    NotAssigned { kind: LogicNodeKind, id: Uuid },
}

impl ResolveError {
    /// Only [`ResolveError::LookupUnavailable`] is worth retrying unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LookupUnavailable { .. })
    }

    #[must_use]
    pub fn kind(&self) -> LogicNodeKind {
        match self {
            Self::LookupUnavailable { kind, .. } | Self::NotAssigned { kind, .. } => *kind,
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct CachedHandle {
    handle: Handle,
    epoch: u64,
}

/// Resolves logic-node kinds to process-local handles, caching each answer
/// until the next [`IdentityResolver::reset`].
///
/// Every cache entry is stamped with the epoch observed before its lookup
/// started. `reset` bumps the epoch, so a lookup racing with a reset can
/// still write its entry but nobody will read it afterwards.
pub struct IdentityResolver {
    lookup: Arc<dyn IdentifierLookup>,
    cache: DashMap<Uuid, CachedHandle>,
    epoch: AtomicU64,
}

impl IdentityResolver {
    /// Creates a resolver with an empty cache.
    pub fn new(lookup: Arc<dyn IdentifierLookup>) -> Self {
        Self {
            lookup,
            cache: DashMap::new(),
            epoch: AtomicU64::new(0),
        }
    }

    /// Builds a resolver from configuration, preloading every kind when asked
    /// to.
    ///
    /// # Errors
    /// When preloading is enabled and any kind fails to resolve.
    pub fn from_config(
        lookup: Arc<dyn IdentifierLookup>,
        settings: &ResolverSettings,
    ) -> Result<Self, ResolveError> {
        let resolver = Self::new(lookup);
        if settings.preload {
            resolver.preload()?;
        }
        Ok(resolver)
    }

    /// Stable identifier of `kind`. Never calls the lookup service.
    #[must_use]
    pub fn stable_id(&self, kind: LogicNodeKind) -> Uuid {
        kind.stable_id()
    }

    /// Returns the handle of `kind`, asking the lookup service on a cache
    /// miss.
    ///
    /// Concurrent first-time resolutions of the same kind may each reach the
    /// lookup service; the service is deterministic so they agree.
    ///
    /// # Errors
    /// [`ResolveError::LookupUnavailable`] when the service fails, and
    /// [`ResolveError::NotAssigned`] when it has no entry for the kind.
    pub fn resolve(&self, kind: LogicNodeKind) -> Result<Handle, ResolveError> {
        let id = kind.stable_id();
        let epoch = self.epoch.load(Ordering::Acquire);
        if let Some(cached) = self.cached_in_epoch(&id, epoch) {
            tracing::trace!(kind = %kind, handle = %cached, "identity_cache_hit");
            return Ok(cached);
        }

        tracing::debug!(kind = %kind, id = %id, epoch, "identity_cache_miss");
        let handle = match self.lookup.lookup(&id) {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                tracing::warn!(kind = %kind, id = %id, "identity_not_assigned");
                return Err(ResolveError::NotAssigned { kind, id });
            }
            Err(failure) => {
                tracing::warn!(kind = %kind, id = %id, err.msg = %failure, "identity_lookup_unavailable");
                return Err(ResolveError::LookupUnavailable {
                    kind,
                    id,
                    reason: failure.reason().to_string(),
                });
            }
        };

        self.cache.insert(id, CachedHandle { handle, epoch });
        Ok(handle)
    }

    /// Resolves several kinds in order, stopping at the first failure.
    ///
    /// # Errors
    /// The first [`ResolveError`] encountered.
    pub fn resolve_all(
        &self,
        kinds: impl IntoIterator<Item = LogicNodeKind>,
    ) -> Result<Vec<(LogicNodeKind, Handle)>, ResolveError> {
        kinds
            .into_iter()
            .map(|kind| self.resolve(kind).map(|handle| (kind, handle)))
            .collect()
    }

    /// Resolves every [`LogicNodeKind`].
    ///
    /// # Errors
    /// The first [`ResolveError`] encountered.
    pub fn preload(&self) -> Result<(), ResolveError> {
        let resolved = self.resolve_all(LogicNodeKind::ALL)?;
        tracing::info!(count = resolved.len(), "identity_cache_preloaded");
        Ok(())
    }

    /// Returns the cached handle of `kind` without calling the lookup service.
    #[must_use]
    pub fn cached(&self, kind: LogicNodeKind) -> Option<Handle> {
        self.cached_in_epoch(&kind.stable_id(), self.epoch.load(Ordering::Acquire))
    }

    /// Finds the kind a handle was resolved for in the current epoch.
    #[must_use]
    pub fn kind_for_handle(&self, handle: Handle) -> Option<LogicNodeKind> {
        LogicNodeKind::ALL
            .into_iter()
            .find(|kind| self.cached(*kind) == Some(handle))
    }

    /// Forgets every cached handle. Later resolutions ask the lookup service
    /// again.
    pub fn reset(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.cache.clear();
        tracing::info!(epoch, "identity_resolver_reset");
    }

    /// Current cache epoch; incremented by every [`IdentityResolver::reset`].
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Runs [`IdentityResolver::resolve`] on tokio's blocking pool.
    ///
    /// Dropping the returned handle does not cancel the lookup; its answer
    /// still lands in the cache.
    pub fn spawn_resolve(
        self: Arc<Self>,
        kind: LogicNodeKind,
    ) -> JoinHandle<Result<Handle, ResolveError>> {
        tokio::task::spawn_blocking(move || self.resolve(kind))
    }

    fn cached_in_epoch(&self, id: &Uuid, epoch: u64) -> Option<Handle> {
        self.cache
            .get(id)
            .filter(|entry| entry.epoch == epoch)
            .map(|entry| entry.handle)
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("cached", &self.cache.len())
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}
