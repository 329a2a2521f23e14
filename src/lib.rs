//! Identity, classification-result and expression-document core for a
//! terminology classification pipeline.
//!
//! * [`logic`] assigns namespace-derived identifiers to logic-node kinds and
//!   resolves them to process-local handles.
//! * [`classification`] packages the outcome of a classification run into an
//!   immutable, validated aggregate.
//! * [`serialization`] moves expression trees across process boundaries as
//!   XML documents, parsing them with a hardened reader.

pub mod classification;
pub mod config;
mod errors;
pub mod logger;
pub mod logic;
pub mod ontology;
pub mod serialization;

pub use errors::Error;

/// Application results options list
pub type Result<T, E = Error> = std::result::Result<T, E>;
