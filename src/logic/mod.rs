//! Logic-node identity and expression trees.
//!
//! [`LogicNodeKind`] is pure: its stable identifier is derived from a fixed
//! namespace and never changes. The process-local handle of a kind lives in
//! an [`IdentityResolver`], which owns the only mutable state of this module.

pub mod expression;
pub mod kind;
pub mod resolver;

pub use expression::{
    Binding, ConcreteDomainOperator, ExpressionNode, InvalidExpression, LiteralValue,
    NodePayload, SubstitutionBindings,
};
pub use kind::{LogicNodeKind, NodeCategory, UnknownKind, LOGIC_NODE_NAMESPACE};
pub use resolver::{IdentityResolver, ResolveError};
