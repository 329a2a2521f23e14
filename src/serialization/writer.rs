use std::fmt::Display;

use chrono::SecondsFormat;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, Event},
    Writer,
};

use super::SerializationError;
use crate::logic::expression::{ExpressionNode, LiteralValue, NodePayload};

/// Writes an already validated tree as an indented XML document.
pub(super) fn write_document(
    root: &ExpressionNode,
    indent: usize,
) -> Result<String, SerializationError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', indent);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_failed)?;
    write_node(&mut writer, root)?;

    let mut document = String::from_utf8(writer.into_inner()).map_err(write_failed)?;
    document.push('\n');
    Ok(document)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &ExpressionNode) -> Result<(), SerializationError> {
    let tag = node.kind().tag();
    let mut start = BytesStart::new(tag);

    match node.payload() {
        NodePayload::None => {}
        NodePayload::Concept(concept) => {
            start.push_attribute(("concept", concept.to_string().as_str()));
        }
        NodePayload::Role(role) => {
            start.push_attribute(("role", role.to_string().as_str()));
        }
        NodePayload::Feature { feature, operator } => {
            start.push_attribute(("feature", feature.to_string().as_str()));
            start.push_attribute(("operator", operator.as_str()));
        }
        NodePayload::Literal(value) => {
            let value = value
                .as_ref()
                .ok_or_else(|| write_failed(format!("`{tag}` literal has no value")))?;
            start.push_attribute(("value", literal_text(value).as_str()));
        }
        NodePayload::Template {
            template,
            assemblage,
        } => {
            start.push_attribute(("template", template.to_string().as_str()));
            start.push_attribute(("assemblage", assemblage.to_string().as_str()));
        }
        NodePayload::Substitution { field, deferred } => {
            start.push_attribute(("field", field.as_str()));
            if *deferred {
                start.push_attribute(("deferred", "true"));
            }
        }
    }

    if node.children().is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(write_failed);
    }

    writer
        .write_event(Event::Start(start.borrow()))
        .map_err(write_failed)?;
    for child in node.children() {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(write_failed)
}

fn literal_text(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Boolean(flag) => flag.to_string(),
        LiteralValue::Float(number) => number.to_string(),
        LiteralValue::Instant(instant) => instant.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        LiteralValue::Integer(number) => number.to_string(),
        LiteralValue::String(text) => text.clone(),
    }
}

fn write_failed(reason: impl Display) -> SerializationError {
    SerializationError::Write {
        reason: reason.to_string(),
    }
}
