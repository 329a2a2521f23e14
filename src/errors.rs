//! Crate level error wrapping every component failure.

use std::path::PathBuf;

use crate::{
    classification::ClassificationError, logic::ResolveError,
    serialization::SerializationError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error("cannot read configuration `{path}`: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("cannot initialize logger: {0}")]
    Logger(String),
}

impl Error {
    /// Whether retrying the failed operation without changing its input may
    /// succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Resolve(err) if err.is_retryable())
    }
}
