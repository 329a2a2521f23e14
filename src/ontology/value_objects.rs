use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Sequence number of a concept inside the terminology store.
///
/// Classification results speak in sequence numbers because they are produced
/// against one loaded store.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptSequence(u32);

impl ConceptSequence {
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for ConceptSequence {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Display for ConceptSequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cross-system reference to a concept, carried inside expression documents.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptRef(Uuid);

impl ConceptRef {
    #[must_use]
    pub const fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub const fn uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ConceptRef {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for ConceptRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for ConceptRef {
    type Err = ConceptRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ConceptRefError::Invalid {
                value: s.to_owned(),
            })
    }
}

/// Errors produced when parsing a [`ConceptRef`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConceptRefError {
    /// The provided text is not a UUID.
    #[error("invalid concept reference: {value}")]
    Invalid { value: String },
}

/// Process-local integer handle assigned by the identifier-lookup service.
///
/// Handles are only meaningful against the store that issued them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(i32);

impl Handle {
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl From<i32> for Handle {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
