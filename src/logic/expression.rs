//! Expression trees built from logic nodes.
//!
//! A tree is rooted at one [`ExpressionNode`] that owns its children. Child
//! order is significant and preserved everywhere, including in serialized
//! documents.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

use super::kind::{LogicNodeKind, NodeCategory};
use crate::ontology::value_objects::ConceptRef;

/// Comparison applied by a feature node between the feature value and its
/// literal child.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConcreteDomainOperator {
    Equals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ConcreteDomainOperator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::LessThan => "less-than",
            Self::LessThanOrEqual => "less-than-or-equal",
            Self::GreaterThan => "greater-than",
            Self::GreaterThanOrEqual => "greater-than-or-equal",
        }
    }
}

impl Display for ConcreteDomainOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConcreteDomainOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Equals,
            Self::LessThan,
            Self::LessThanOrEqual,
            Self::GreaterThan,
            Self::GreaterThanOrEqual,
        ]
        .into_iter()
        .find(|op| op.as_str() == s)
        .ok_or_else(|| format!("unknown concrete domain operator `{s}`"))
    }
}

/// Typed value carried by a literal node.
#[derive(Clone, Debug, PartialEq)]
pub enum LiteralValue {
    Boolean(bool),
    Float(f64),
    Instant(DateTime<Utc>),
    Integer(i64),
    String(String),
}

impl LiteralValue {
    /// Literal kind able to carry this value.
    #[must_use]
    pub fn kind(&self) -> LogicNodeKind {
        match self {
            Self::Boolean(_) => LogicNodeKind::Boolean,
            Self::Float(_) => LogicNodeKind::Float,
            Self::Instant(_) => LogicNodeKind::Instant,
            Self::Integer(_) => LogicNodeKind::Integer,
            Self::String(_) => LogicNodeKind::String,
        }
    }

    /// Substitution kind whose placeholder this value can replace.
    #[must_use]
    pub fn substitution_kind(&self) -> LogicNodeKind {
        match self {
            Self::Boolean(_) => LogicNodeKind::SubstitutionBoolean,
            Self::Float(_) => LogicNodeKind::SubstitutionFloat,
            Self::Instant(_) => LogicNodeKind::SubstitutionInstant,
            Self::Integer(_) => LogicNodeKind::SubstitutionInteger,
            Self::String(_) => LogicNodeKind::SubstitutionString,
        }
    }
}

/// Kind specific data attached to a node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodePayload {
    /// Connectives carry only children.
    None,
    Concept(ConceptRef),
    Role(ConceptRef),
    Feature {
        feature: ConceptRef,
        operator: ConcreteDomainOperator,
    },
    /// `None` marks a literal whose value has not been set.
    Literal(Option<LiteralValue>),
    Template {
        template: ConceptRef,
        assemblage: ConceptRef,
    },
    Substitution {
        field: String,
        deferred: bool,
    },
}

/// One node of an expression tree.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionNode {
    kind: LogicNodeKind,
    payload: NodePayload,
    children: Vec<ExpressionNode>,
}

impl ExpressionNode {
    /// Assembles a node without checking that payload and children suit the
    /// kind. [`ExpressionNode::validate`] reports mismatches.
    #[must_use]
    pub fn new(kind: LogicNodeKind, payload: NodePayload, children: Vec<Self>) -> Self {
        Self {
            kind,
            payload,
            children,
        }
    }

    /// Set operator combining `children` in order.
    #[must_use]
    pub fn connective(kind: LogicNodeKind, children: Vec<Self>) -> Self {
        Self::new(kind, NodePayload::None, children)
    }

    #[must_use]
    pub fn and(children: Vec<Self>) -> Self {
        Self::connective(LogicNodeKind::And, children)
    }

    #[must_use]
    pub fn or(children: Vec<Self>) -> Self {
        Self::connective(LogicNodeKind::Or, children)
    }

    #[must_use]
    pub fn necessary_set(children: Vec<Self>) -> Self {
        Self::connective(LogicNodeKind::NecessarySet, children)
    }

    #[must_use]
    pub fn sufficient_set(children: Vec<Self>) -> Self {
        Self::connective(LogicNodeKind::SufficientSet, children)
    }

    #[must_use]
    pub fn disjoint_with(children: Vec<Self>) -> Self {
        Self::connective(LogicNodeKind::DisjointWith, children)
    }

    #[must_use]
    pub fn definition_root(children: Vec<Self>) -> Self {
        Self::connective(LogicNodeKind::DefinitionRoot, children)
    }

    #[must_use]
    pub fn concept(concept: ConceptRef) -> Self {
        Self::new(LogicNodeKind::Concept, NodePayload::Concept(concept), vec![])
    }

    #[must_use]
    pub fn role_some(role: ConceptRef, restriction: Self) -> Self {
        Self::new(
            LogicNodeKind::RoleSome,
            NodePayload::Role(role),
            vec![restriction],
        )
    }

    #[must_use]
    pub fn role_all(role: ConceptRef, restriction: Self) -> Self {
        Self::new(
            LogicNodeKind::RoleAll,
            NodePayload::Role(role),
            vec![restriction],
        )
    }

    #[must_use]
    pub fn feature(feature: ConceptRef, operator: ConcreteDomainOperator, value: Self) -> Self {
        Self::new(
            LogicNodeKind::Feature,
            NodePayload::Feature { feature, operator },
            vec![value],
        )
    }

    #[must_use]
    pub fn literal(value: LiteralValue) -> Self {
        Self::new(value.kind(), NodePayload::Literal(Some(value)), vec![])
    }

    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::literal(LiteralValue::Boolean(value))
    }

    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::literal(LiteralValue::Float(value))
    }

    #[must_use]
    pub fn instant(value: DateTime<Utc>) -> Self {
        Self::literal(LiteralValue::Instant(value))
    }

    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::literal(LiteralValue::Integer(value))
    }

    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::literal(LiteralValue::String(value.into()))
    }

    /// Literal node of `kind` whose value is still unset.
    #[must_use]
    pub fn unset_literal(kind: LogicNodeKind) -> Self {
        Self::new(kind, NodePayload::Literal(None), vec![])
    }

    #[must_use]
    pub fn template(template: ConceptRef, assemblage: ConceptRef) -> Self {
        Self::new(
            LogicNodeKind::Template,
            NodePayload::Template {
                template,
                assemblage,
            },
            vec![],
        )
    }

    /// Placeholder of substitution `kind` to be filled from `field`.
    #[must_use]
    pub fn substitution(kind: LogicNodeKind, field: impl Into<String>) -> Self {
        Self::new(
            kind,
            NodePayload::Substitution {
                field: field.into(),
                deferred: false,
            },
            vec![],
        )
    }

    /// Marks a substitution placeholder as intentionally left unexpanded.
    /// Other nodes are returned unchanged.
    #[must_use]
    pub fn deferred(mut self) -> Self {
        if let NodePayload::Substitution { deferred, .. } = &mut self.payload {
            *deferred = true;
        }
        self
    }

    /// Appends a child after the existing ones.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn kind(&self) -> LogicNodeKind {
        self.kind
    }

    #[must_use]
    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    /// Children in their significant order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Referenced concept of a concept node.
    #[must_use]
    pub fn concept_ref(&self) -> Option<ConceptRef> {
        match self.payload {
            NodePayload::Concept(concept) => Some(concept),
            _ => None,
        }
    }

    /// Value of a literal node, when set.
    #[must_use]
    pub fn literal_value(&self) -> Option<&LiteralValue> {
        match &self.payload {
            NodePayload::Literal(value) => value.as_ref(),
            _ => None,
        }
    }

    /// Number of nodes in the tree rooted here.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Levels of nesting in the tree rooted here; a lone node is 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Self::depth).max().unwrap_or(0)
    }

    /// Checks the whole tree is fit to leave the process.
    ///
    /// Besides the per-kind shape rules, every substitution placeholder must
    /// be either expanded or marked [`ExpressionNode::deferred`].
    ///
    /// # Errors
    /// The first offending node, identified by its path from the root.
    pub fn validate(&self) -> Result<(), InvalidExpression> {
        self.validate_at(self.kind.tag().to_string())
    }

    fn validate_at(&self, path: String) -> Result<(), InvalidExpression> {
        let fail = |reason: String| {
            Err(InvalidExpression {
                path: path.clone(),
                reason,
            })
        };

        match (self.kind.category(), &self.payload) {
            (NodeCategory::SetOperator, NodePayload::None) => {
                if self.children.is_empty() {
                    return fail(format!("`{}` requires at least one child", self.kind));
                }
            }
            (NodeCategory::Relational, NodePayload::Concept(_))
                if self.kind == LogicNodeKind::Concept =>
            {
                self.expect_children(0, &path)?;
            }
            (NodeCategory::Relational, NodePayload::Role(_))
                if matches!(self.kind, LogicNodeKind::RoleAll | LogicNodeKind::RoleSome) =>
            {
                self.expect_children(1, &path)?;
            }
            (NodeCategory::Relational, NodePayload::Feature { .. })
                if self.kind == LogicNodeKind::Feature =>
            {
                self.expect_children(1, &path)?;
                let value = &self.children[0];
                let carries_value = value.kind.category() == NodeCategory::Literal
                    || (value.kind.is_substitution()
                        && value.kind != LogicNodeKind::SubstitutionConcept);
                if !carries_value {
                    return fail(format!(
                        "`Feature` requires a literal child, found `{}`",
                        value.kind
                    ));
                }
            }
            (NodeCategory::Literal, NodePayload::Literal(value)) => {
                self.expect_children(0, &path)?;
                match value {
                    None => return fail(format!("`{}` literal has no value", self.kind)),
                    Some(value) if value.kind() != self.kind => {
                        return fail(format!(
                            "`{}` literal carries a `{}` value",
                            self.kind,
                            value.kind()
                        ));
                    }
                    Some(LiteralValue::Float(number)) if !number.is_finite() => {
                        return fail(format!("`Float` literal is not finite: {number}"));
                    }
                    Some(LiteralValue::Instant(instant))
                        if !(0..=9999).contains(&instant.year()) =>
                    {
                        return fail(format!(
                            "`Instant` literal year {} is outside 0000..=9999",
                            instant.year()
                        ));
                    }
                    Some(LiteralValue::String(text)) if !text.chars().all(is_xml_char) => {
                        return fail(
                            "`String` literal holds a character XML 1.0 cannot carry".to_string(),
                        );
                    }
                    Some(_) => {}
                }
            }
            (NodeCategory::Substitution, NodePayload::Template { .. })
                if self.kind == LogicNodeKind::Template =>
            {
                self.expect_children(0, &path)?;
            }
            (NodeCategory::Substitution, NodePayload::Substitution { field, deferred })
                if self.kind.is_substitution() =>
            {
                self.expect_children(0, &path)?;
                if field.trim().is_empty() {
                    return fail(format!("`{}` placeholder has no field name", self.kind));
                }
                if !field.chars().all(is_xml_char) {
                    return fail(format!(
                        "`{}` field name holds a character XML 1.0 cannot carry",
                        self.kind
                    ));
                }
                if !deferred {
                    return fail(format!(
                        "placeholder `{field}` is neither expanded nor deferred"
                    ));
                }
            }
            (_, payload) => {
                return fail(format!(
                    "`{}` cannot carry payload {payload:?}",
                    self.kind
                ));
            }
        }

        for (index, child) in self.children.iter().enumerate() {
            child.validate_at(format!("{path}[{index}]/{}", child.kind.tag()))?;
        }
        Ok(())
    }

    fn expect_children(&self, expected: usize, path: &str) -> Result<(), InvalidExpression> {
        if self.children.len() == expected {
            Ok(())
        } else {
            Err(InvalidExpression {
                path: path.to_string(),
                reason: format!(
                    "`{}` requires {expected} child(ren), found {}",
                    self.kind,
                    self.children.len()
                ),
            })
        }
    }

    /// Returns a copy of the tree with bound placeholders replaced by concrete
    /// nodes. Unbound placeholders are kept as they are.
    ///
    /// # Errors
    /// When a binding's type does not fit the placeholder it targets.
    pub fn expand(&self, bindings: &SubstitutionBindings) -> Result<Self, InvalidExpression> {
        if let NodePayload::Substitution { field, .. } = &self.payload {
            let Some(binding) = bindings.get(field) else {
                return Ok(self.clone());
            };
            return match (self.kind, binding) {
                (LogicNodeKind::SubstitutionConcept, Binding::Concept(concept)) => {
                    Ok(Self::concept(*concept))
                }
                (kind, Binding::Literal(value)) if value.substitution_kind() == kind => {
                    Ok(Self::literal(value.clone()))
                }
                (kind, _) => Err(InvalidExpression {
                    path: kind.tag().to_string(),
                    reason: format!("binding for `{field}` does not fit a `{kind}` placeholder"),
                }),
            };
        }

        let children = self
            .children
            .iter()
            .map(|child| child.expand(bindings))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            kind: self.kind,
            payload: self.payload.clone(),
            children,
        })
    }
}

/// `Char` production of XML 1.0.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Value bound to a substitution field.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    Concept(ConceptRef),
    Literal(LiteralValue),
}

/// Field name to value map used by [`ExpressionNode::expand`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubstitutionBindings {
    values: BTreeMap<String, Binding>,
}

impl SubstitutionBindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bind(mut self, field: impl Into<String>, binding: Binding) -> Self {
        self.values.insert(field.into(), binding);
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Binding> {
        self.values.get(field)
    }
}

/// Tree shape rejected before any output is produced.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid expression at `{path}`: {reason}")]
pub struct InvalidExpression {
    pub path: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn concept(n: u128) -> ConceptRef {
        ConceptRef::new(Uuid::from_u128(n))
    }

    #[test]
    fn well_formed_tree_validates() {
        let tree = ExpressionNode::sufficient_set(vec![ExpressionNode::and(vec![
            ExpressionNode::concept(concept(1)),
            ExpressionNode::role_some(concept(2), ExpressionNode::concept(concept(3))),
            ExpressionNode::feature(
                concept(4),
                ConcreteDomainOperator::GreaterThan,
                ExpressionNode::float(2.5),
            ),
        ])]);
        assert!(tree.validate().is_ok());
        assert_eq!(tree.node_count(), 7);
    }

    #[test]
    fn unset_literal_is_rejected_with_path() {
        let tree = ExpressionNode::and(vec![
            ExpressionNode::concept(concept(1)),
            ExpressionNode::unset_literal(LogicNodeKind::Integer),
        ]);
        let err = tree.validate().expect_err("unset literal");
        assert_eq!(err.path, "and[1]/literal-integer");
        assert!(err.reason.contains("no value"));
    }

    #[test]
    fn role_without_restriction_is_rejected() {
        let node = ExpressionNode::new(
            LogicNodeKind::RoleAll,
            NodePayload::Role(concept(1)),
            vec![],
        );
        assert!(node.validate().is_err());
    }

    #[test]
    fn empty_connective_is_rejected() {
        assert!(ExpressionNode::or(vec![]).validate().is_err());
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        let node = ExpressionNode::new(
            LogicNodeKind::Boolean,
            NodePayload::Literal(Some(LiteralValue::Integer(1))),
            vec![],
        );
        assert!(node.validate().is_err());

        let node = ExpressionNode::new(LogicNodeKind::Concept, NodePayload::None, vec![]);
        assert!(node.validate().is_err());
    }

    #[test]
    fn non_finite_float_is_rejected() {
        assert!(ExpressionNode::float(f64::NAN).validate().is_err());
    }

    #[test]
    fn instant_outside_four_digit_years_is_rejected() {
        let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        assert!(ExpressionNode::instant(last).validate().is_ok());
        assert!(ExpressionNode::instant(Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap())
            .validate()
            .is_ok());

        let err = ExpressionNode::instant(last + Duration::days(2))
            .validate()
            .expect_err("year 10000");
        assert_eq!(err.path, "literal-instant");
        assert!(err.reason.contains("10000"));

        let before = Utc.with_ymd_and_hms(-5, 1, 1, 0, 0, 0).unwrap();
        assert!(ExpressionNode::instant(before).validate().is_err());
    }

    #[test]
    fn control_characters_are_rejected() {
        assert!(ExpressionNode::string("tab\tand\nnewline").validate().is_ok());
        assert!(ExpressionNode::string("nul\u{0}").validate().is_err());
        assert!(ExpressionNode::string("bell\u{7}").validate().is_err());
        assert!(ExpressionNode::string("\u{FFFE}").validate().is_err());
        let placeholder =
            ExpressionNode::substitution(LogicNodeKind::SubstitutionString, "na\u{1b}me").deferred();
        assert!(placeholder.validate().is_err());
    }

    #[test]
    fn depth_counts_nesting_levels() {
        let leaf = ExpressionNode::concept(concept(1));
        assert_eq!(leaf.depth(), 1);
        let tree = ExpressionNode::and(vec![
            leaf.clone(),
            ExpressionNode::role_some(concept(2), leaf),
        ]);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn placeholders_must_be_expanded_or_deferred() {
        let pending = ExpressionNode::substitution(LogicNodeKind::SubstitutionConcept, "target");
        let err = pending.validate().expect_err("pending placeholder");
        assert!(err.reason.contains("target"));
        assert!(pending.clone().deferred().validate().is_ok());
    }

    #[test]
    fn expand_replaces_bound_placeholders() {
        let tree = ExpressionNode::and(vec![
            ExpressionNode::substitution(LogicNodeKind::SubstitutionConcept, "target"),
            ExpressionNode::feature(
                concept(5),
                ConcreteDomainOperator::Equals,
                ExpressionNode::substitution(LogicNodeKind::SubstitutionInteger, "count"),
            ),
            ExpressionNode::substitution(LogicNodeKind::SubstitutionString, "later"),
        ]);
        let bindings = SubstitutionBindings::new()
            .bind("target", Binding::Concept(concept(9)))
            .bind("count", Binding::Literal(LiteralValue::Integer(3)));

        let expanded = tree.expand(&bindings).expect("expanded");
        assert_eq!(expanded.children()[0], ExpressionNode::concept(concept(9)));
        assert_eq!(
            expanded.children()[1].children()[0],
            ExpressionNode::integer(3)
        );
        assert_eq!(expanded.children()[2].kind(), LogicNodeKind::SubstitutionString);
        assert!(expanded.validate().is_err());
    }

    #[test]
    fn expand_rejects_mistyped_binding() {
        let node = ExpressionNode::substitution(LogicNodeKind::SubstitutionBoolean, "flag");
        let bindings =
            SubstitutionBindings::new().bind("flag", Binding::Literal(LiteralValue::Float(1.0)));
        assert!(node.expand(&bindings).is_err());
    }
}
