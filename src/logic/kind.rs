use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::{uuid, Uuid};

/// Namespace every logic-node stable identifier is derived from.
///
/// Together with [`LogicNodeKind::canonical_name`] this is a wire format:
/// persisted data produced by other systems relies on both staying fixed.
pub const LOGIC_NODE_NAMESPACE: Uuid = uuid!("d96cb408-b9ae-473d-a08d-ece06dbcedf9");

/// Category grouping the logic-node kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeCategory {
    SetOperator,
    Relational,
    Literal,
    Substitution,
}

impl NodeCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetOperator => "SetOperator",
            Self::Relational => "Relational",
            Self::Literal => "Literal",
            Self::Substitution => "Substitution",
        }
    }
}

impl Display for NodeCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of description-logic constructs an expression node can be.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogicNodeKind {
    NecessarySet,
    SufficientSet,
    And,
    Or,
    DisjointWith,
    DefinitionRoot,
    RoleAll,
    RoleSome,
    Concept,
    Feature,
    Boolean,
    Float,
    Instant,
    Integer,
    String,
    Template,
    SubstitutionConcept,
    SubstitutionBoolean,
    SubstitutionFloat,
    SubstitutionInstant,
    SubstitutionInteger,
    SubstitutionString,
}

impl LogicNodeKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 22] = [
        Self::NecessarySet,
        Self::SufficientSet,
        Self::And,
        Self::Or,
        Self::DisjointWith,
        Self::DefinitionRoot,
        Self::RoleAll,
        Self::RoleSome,
        Self::Concept,
        Self::Feature,
        Self::Boolean,
        Self::Float,
        Self::Instant,
        Self::Integer,
        Self::String,
        Self::Template,
        Self::SubstitutionConcept,
        Self::SubstitutionBoolean,
        Self::SubstitutionFloat,
        Self::SubstitutionInstant,
        Self::SubstitutionInteger,
        Self::SubstitutionString,
    ];

    #[must_use]
    pub fn category(self) -> NodeCategory {
        match self {
            Self::NecessarySet
            | Self::SufficientSet
            | Self::And
            | Self::Or
            | Self::DisjointWith
            | Self::DefinitionRoot => NodeCategory::SetOperator,
            Self::RoleAll | Self::RoleSome | Self::Concept | Self::Feature => {
                NodeCategory::Relational
            }
            Self::Boolean | Self::Float | Self::Instant | Self::Integer | Self::String => {
                NodeCategory::Literal
            }
            Self::Template
            | Self::SubstitutionConcept
            | Self::SubstitutionBoolean
            | Self::SubstitutionFloat
            | Self::SubstitutionInstant
            | Self::SubstitutionInteger
            | Self::SubstitutionString => NodeCategory::Substitution,
        }
    }

    /// Variant name as it appears in the canonical name.
    #[must_use]
    pub fn variant_name(self) -> &'static str {
        match self {
            Self::NecessarySet => "NecessarySet",
            Self::SufficientSet => "SufficientSet",
            Self::And => "And",
            Self::Or => "Or",
            Self::DisjointWith => "DisjointWith",
            Self::DefinitionRoot => "DefinitionRoot",
            Self::RoleAll => "RoleAll",
            Self::RoleSome => "RoleSome",
            Self::Concept => "Concept",
            Self::Feature => "Feature",
            Self::Boolean => "Boolean",
            Self::Float => "Float",
            Self::Instant => "Instant",
            Self::Integer => "Integer",
            Self::String => "String",
            Self::Template => "Template",
            Self::SubstitutionConcept => "SubstitutionConcept",
            Self::SubstitutionBoolean => "SubstitutionBoolean",
            Self::SubstitutionFloat => "SubstitutionFloat",
            Self::SubstitutionInstant => "SubstitutionInstant",
            Self::SubstitutionInteger => "SubstitutionInteger",
            Self::SubstitutionString => "SubstitutionString",
        }
    }

    /// Name hashed into the stable identifier: `<Category>.<Variant>`.
    #[must_use]
    pub fn canonical_name(self) -> String {
        format!("{}.{}", self.category().as_str(), self.variant_name())
    }

    /// Namespace-derived identifier of this kind (UUID v5).
    ///
    /// Pure and total: never touches external services.
    #[must_use]
    pub fn stable_id(self) -> Uuid {
        Uuid::new_v5(&LOGIC_NODE_NAMESPACE, self.canonical_name().as_bytes())
    }

    /// Maps a stable identifier back to its kind.
    ///
    /// Unknown identifiers yield `None` rather than a placeholder kind.
    #[must_use]
    pub fn from_stable_id(id: &Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.stable_id() == *id)
    }

    /// Element name used in serialized expression documents.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::NecessarySet => "necessary-set",
            Self::SufficientSet => "sufficient-set",
            Self::And => "and",
            Self::Or => "or",
            Self::DisjointWith => "disjoint-with",
            Self::DefinitionRoot => "definition-root",
            Self::RoleAll => "role-all",
            Self::RoleSome => "role-some",
            Self::Concept => "concept",
            Self::Feature => "feature",
            Self::Boolean => "literal-boolean",
            Self::Float => "literal-float",
            Self::Instant => "literal-instant",
            Self::Integer => "literal-integer",
            Self::String => "literal-string",
            Self::Template => "template",
            Self::SubstitutionConcept => "substitution-concept",
            Self::SubstitutionBoolean => "substitution-boolean",
            Self::SubstitutionFloat => "substitution-float",
            Self::SubstitutionInstant => "substitution-instant",
            Self::SubstitutionInteger => "substitution-integer",
            Self::SubstitutionString => "substitution-string",
        }
    }

    /// Looks a kind up by its document element name.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Whether nodes of this kind combine an ordered list of children.
    #[must_use]
    pub fn is_connective(self) -> bool {
        self.category() == NodeCategory::SetOperator
    }

    /// Whether nodes of this kind are placeholders awaiting substitution.
    #[must_use]
    pub fn is_substitution(self) -> bool {
        self.category() == NodeCategory::Substitution && self != Self::Template
    }
}

impl Display for LogicNodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.variant_name())
    }
}

impl FromStr for LogicNodeKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.variant_name() == s || kind.tag() == s)
            .ok_or_else(|| UnknownKind {
                value: s.to_owned(),
            })
    }
}

/// Text did not name any [`LogicNodeKind`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown logic node kind: {value}")]
pub struct UnknownKind {
    pub value: String,
}
