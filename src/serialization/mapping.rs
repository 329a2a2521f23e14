//! Maps a hardened [`ParsedDocument`] onto an expression tree.
//!
//! The entry point takes a `ParsedDocument` and nothing else: raw text has to
//! go through [`super::parse::HardenedParser`] first.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::{
    parse::{Element, ParsedDocument},
    SerializationError,
};
use crate::{
    logic::{
        expression::{ExpressionNode, LiteralValue, NodePayload},
        kind::{LogicNodeKind, NodeCategory},
    },
    ontology::value_objects::ConceptRef,
};

/// Builds the expression tree described by `document` and checks its shape.
///
/// # Errors
/// [`SerializationError::MalformedDocument`] for unknown elements or
/// attributes, values that do not parse as their declared type, and trees
/// whose shape is invalid.
pub fn map_document(document: &ParsedDocument) -> Result<ExpressionNode, SerializationError> {
    let root = map_element(document.root(), document.root().name())?;
    root.validate()
        .map_err(|err| malformed(&err.path, &err.reason))?;
    Ok(root)
}

fn map_element(element: &Element, path: &str) -> Result<ExpressionNode, SerializationError> {
    let kind = LogicNodeKind::from_tag(element.name())
        .ok_or_else(|| malformed(path, &format!("unknown element `{}`", element.name())))?;

    let payload = match kind.category() {
        NodeCategory::SetOperator => {
            expect_attributes(element, path, &[])?;
            NodePayload::None
        }
        NodeCategory::Relational => match kind {
            LogicNodeKind::Concept => {
                expect_attributes(element, path, &["concept"])?;
                NodePayload::Concept(concept_attribute(element, path, "concept")?)
            }
            LogicNodeKind::Feature => {
                expect_attributes(element, path, &["feature", "operator"])?;
                NodePayload::Feature {
                    feature: concept_attribute(element, path, "feature")?,
                    operator: parse_attribute(element, path, "operator")?,
                }
            }
            _ => {
                expect_attributes(element, path, &["role"])?;
                NodePayload::Role(concept_attribute(element, path, "role")?)
            }
        },
        NodeCategory::Literal => {
            expect_attributes(element, path, &["value"])?;
            NodePayload::Literal(Some(literal_value(element, path, kind)?))
        }
        NodeCategory::Substitution if kind == LogicNodeKind::Template => {
            expect_attributes(element, path, &["template", "assemblage"])?;
            NodePayload::Template {
                template: concept_attribute(element, path, "template")?,
                assemblage: concept_attribute(element, path, "assemblage")?,
            }
        }
        NodeCategory::Substitution => {
            expect_attributes(element, path, &["field", "deferred"])?;
            NodePayload::Substitution {
                field: required_attribute(element, path, "field")?.to_string(),
                deferred: match element.attribute("deferred") {
                    Some(_) => parse_attribute(element, path, "deferred")?,
                    None => false,
                },
            }
        }
    };

    if kind.category() != NodeCategory::Literal && !element.text().is_empty() {
        return Err(malformed(path, "unexpected character data"));
    }

    let children = element
        .children()
        .iter()
        .enumerate()
        .map(|(index, child)| map_element(child, &format!("{path}[{index}]/{}", child.name())))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ExpressionNode::new(kind, payload, children))
}

fn literal_value(
    element: &Element,
    path: &str,
    kind: LogicNodeKind,
) -> Result<LiteralValue, SerializationError> {
    let raw = match (element.attribute("value"), element.text()) {
        (Some(_), text) if !text.is_empty() => {
            return Err(malformed(path, "literal value given both as attribute and text"));
        }
        (Some(value), _) => value,
        (None, text) if !text.is_empty() => text,
        (None, _) => return Err(malformed(path, "literal has no value")),
    };

    let mismatch = |expected: &str| malformed(path, &format!("`{raw}` is not a valid {expected}"));
    match kind {
        LogicNodeKind::Boolean => raw
            .parse::<bool>()
            .map(LiteralValue::Boolean)
            .map_err(|_| mismatch("boolean")),
        LogicNodeKind::Float => raw
            .parse::<f64>()
            .map(LiteralValue::Float)
            .map_err(|_| mismatch("float")),
        LogicNodeKind::Instant => DateTime::parse_from_rfc3339(raw)
            .map(|instant| LiteralValue::Instant(instant.with_timezone(&Utc)))
            .map_err(|_| mismatch("RFC 3339 instant")),
        LogicNodeKind::Integer => raw
            .parse::<i64>()
            .map(LiteralValue::Integer)
            .map_err(|_| mismatch("integer")),
        LogicNodeKind::String => Ok(LiteralValue::String(raw.to_string())),
        other => Err(malformed(path, &format!("`{other}` is not a literal kind"))),
    }
}

fn expect_attributes(
    element: &Element,
    path: &str,
    allowed: &[&str],
) -> Result<(), SerializationError> {
    match element
        .attributes()
        .iter()
        .find(|(key, _)| !allowed.contains(&key.as_str()))
    {
        Some((key, _)) => Err(malformed(path, &format!("unexpected attribute `{key}`"))),
        None => Ok(()),
    }
}

fn required_attribute<'a>(
    element: &'a Element,
    path: &str,
    key: &str,
) -> Result<&'a str, SerializationError> {
    element
        .attribute(key)
        .ok_or_else(|| malformed(path, &format!("missing attribute `{key}`")))
}

fn concept_attribute(
    element: &Element,
    path: &str,
    key: &str,
) -> Result<ConceptRef, SerializationError> {
    parse_attribute(element, path, key)
}

fn parse_attribute<T: FromStr>(
    element: &Element,
    path: &str,
    key: &str,
) -> Result<T, SerializationError> {
    let raw = required_attribute(element, path, key)?;
    raw.parse()
        .map_err(|_| malformed(path, &format!("attribute `{key}` has invalid value `{raw}`")))
}

fn malformed(path: &str, reason: &str) -> SerializationError {
    SerializationError::MalformedDocument {
        reason: format!("at `{path}`: {reason}"),
    }
}
