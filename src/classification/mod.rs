//! Aggregation of classification run outputs.
//!
//! Computing the partition belongs to the classifier; this module only
//! validates and freezes what the classifier hands over.

pub mod result;

pub use result::{
    ClassificationError, ClassificationResult, ClassificationResultBuilder,
    ClassificationSummary, EquivalentSet,
};
