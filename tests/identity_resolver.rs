use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use classifier_core::{
    logic::{IdentityResolver, LogicNodeKind, ResolveError},
    ontology::{Handle, IdentifierLookup, LookupFailure},
    Error,
};
use uuid::Uuid;

struct IndexStub {
    handles: HashMap<Uuid, Handle>,
    calls: AtomicUsize,
    reachable: AtomicBool,
}

impl IndexStub {
    fn with_every_kind(offset: i32) -> Self {
        let handles = LogicNodeKind::ALL
            .iter()
            .zip(1..)
            .map(|(kind, n)| (kind.stable_id(), Handle::new(offset - n)))
            .collect();
        Self {
            handles,
            calls: AtomicUsize::new(0),
            reachable: AtomicBool::new(true),
        }
    }
}

impl IdentifierLookup for IndexStub {
    fn lookup(&self, id: &Uuid) -> Result<Option<Handle>, LookupFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(LookupFailure::new("index service unreachable"));
        }
        Ok(self.handles.get(id).copied())
    }
}

#[test]
fn stable_ids_are_fixed_across_resolvers() {
    let first = IdentityResolver::new(Arc::new(IndexStub::with_every_kind(0)));
    let second = IdentityResolver::new(Arc::new(IndexStub::with_every_kind(-1000)));
    for kind in LogicNodeKind::ALL {
        assert_eq!(first.stable_id(kind), second.stable_id(kind));
        assert_eq!(first.stable_id(kind), kind.stable_id());
    }
}

#[test]
fn resolve_caches_until_reset() {
    let index = Arc::new(IndexStub::with_every_kind(0));
    let resolver = IdentityResolver::new(index.clone());

    let handle = resolver.resolve(LogicNodeKind::RoleAll).expect("resolved");
    assert_eq!(resolver.resolve(LogicNodeKind::RoleAll), Ok(handle));
    assert_eq!(index.calls.load(Ordering::SeqCst), 1);

    resolver.reset();
    assert_eq!(resolver.resolve(LogicNodeKind::RoleAll), Ok(handle));
    assert_eq!(index.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn unreachable_index_is_retryable_at_crate_level() {
    let index = Arc::new(IndexStub::with_every_kind(0));
    index.reachable.store(false, Ordering::SeqCst);
    let resolver = IdentityResolver::new(index.clone());

    let err: Error = resolver
        .resolve(LogicNodeKind::Boolean)
        .expect_err("unreachable")
        .into();
    assert!(err.is_retryable());

    index.reachable.store(true, Ordering::SeqCst);
    assert!(resolver.resolve(LogicNodeKind::Boolean).is_ok());
}

#[test]
fn unknown_identifier_is_not_assigned() {
    let index = IndexStub {
        handles: HashMap::new(),
        calls: AtomicUsize::new(0),
        reachable: AtomicBool::new(true),
    };
    let resolver = IdentityResolver::new(Arc::new(index));
    let err = resolver
        .resolve(LogicNodeKind::Float)
        .expect_err("unassigned");
    assert_eq!(
        err,
        ResolveError::NotAssigned {
            kind: LogicNodeKind::Float,
            id: LogicNodeKind::Float.stable_id(),
        }
    );
    assert!(!Error::from(err).is_retryable());
}

#[test]
fn batched_resolution_keeps_order() {
    let resolver = IdentityResolver::new(Arc::new(IndexStub::with_every_kind(0)));
    let kinds = [LogicNodeKind::Or, LogicNodeKind::And, LogicNodeKind::Concept];
    let resolved = resolver.resolve_all(kinds).expect("resolved");
    let order: Vec<_> = resolved.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(order, kinds);
    for (kind, handle) in resolved {
        assert_eq!(resolver.kind_for_handle(handle), Some(kind));
    }
}
