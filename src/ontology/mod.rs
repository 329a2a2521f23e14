//! Terminology value objects and the contracts of external collaborators.
//!
//! Nothing in this module performs I/O. The identifier-lookup service and the
//! commit-record producer are described as traits so the components of this
//! crate can be wired against any store.

pub mod contracts;
pub mod value_objects;

pub use contracts::{CommitRecord, IdentifierLookup, LookupFailure};
pub use value_objects::{ConceptRef, ConceptRefError, ConceptSequence, Handle};
