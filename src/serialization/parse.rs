//! Hardened XML reader.
//!
//! Doctype declarations and processing instructions are refused outright, so
//! no entity can ever be declared. Only the five predefined entities and
//! character references are expanded; any other reference fails. Nothing is
//! fetched from outside the input text.

use std::fmt::Display;

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use super::SerializationError;
use crate::config::SerializerSettings;

/// Element of a document produced by [`HardenedParser::parse`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in document order, values unescaped.
    #[must_use]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements in document order.
    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Character data directly inside the element, trimmed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Document tree that went through [`HardenedParser::parse`].
///
/// This type can only be built by the hardened parser, which makes it the
/// sole input accepted by the mapping stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedDocument {
    root: Element,
}

impl ParsedDocument {
    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }
}

/// XML reader refusing doctype declarations and bounding input size and
/// nesting depth.
#[derive(Clone, Debug)]
pub struct HardenedParser {
    max_depth: usize,
    max_document_bytes: usize,
}

impl Default for HardenedParser {
    fn default() -> Self {
        Self::from_config(&SerializerSettings::default())
    }
}

impl HardenedParser {
    #[must_use]
    pub fn from_config(settings: &SerializerSettings) -> Self {
        Self {
            max_depth: settings.max_depth,
            max_document_bytes: settings.max_document_bytes,
        }
    }

    /// Deepest element nesting accepted; the root alone is depth 1.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[must_use]
    pub fn max_document_bytes(&self) -> usize {
        self.max_document_bytes
    }

    /// Parses `text` into a [`ParsedDocument`].
    ///
    /// # Errors
    /// [`SerializationError::MalformedDocument`] for a doctype declaration, a
    /// processing instruction, an unknown entity reference, broken or
    /// truncated markup, or when a size or depth bound is exceeded.
    pub fn parse(&self, text: &str) -> Result<ParsedDocument, SerializationError> {
        if text.len() > self.max_document_bytes {
            return Err(malformed(format!(
                "document is {} bytes, the limit is {}",
                text.len(),
                self.max_document_bytes
            )));
        }

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|err| {
                malformed(format!(
                    "invalid markup at byte {}: {err}",
                    reader.error_position()
                ))
            })?;

            match event {
                Event::DocType(_) => {
                    return Err(malformed("doctype declarations are not accepted"));
                }
                Event::PI(_) => {
                    return Err(malformed("processing instructions are not accepted"));
                }
                Event::Decl(_) | Event::Comment(_) => {}
                Event::Start(start) => {
                    self.check_open(&stack, root.as_ref())?;
                    stack.push(element_from(&start)?);
                }
                Event::Empty(start) => {
                    self.check_open(&stack, root.as_ref())?;
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| malformed("closing tag without opening tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(content) => {
                    let value = content.unescape().map_err(malformed)?;
                    push_text(&mut stack, &value)?;
                }
                Event::CData(content) => {
                    let value = std::str::from_utf8(&content).map_err(malformed)?;
                    push_text(&mut stack, value)?;
                }
                Event::Eof => break,
            }
        }

        if let Some(open) = stack.last() {
            return Err(malformed(format!(
                "truncated document: `<{}>` is never closed",
                open.name
            )));
        }
        root.map(|root| ParsedDocument { root })
            .ok_or_else(|| malformed("document has no root element"))
    }

    fn check_open(
        &self,
        stack: &[Element],
        root: Option<&Element>,
    ) -> Result<(), SerializationError> {
        if stack.is_empty() && root.is_some() {
            return Err(malformed("document has more than one root element"));
        }
        if stack.len() >= self.max_depth {
            return Err(malformed(format!(
                "nesting deeper than {} elements",
                self.max_depth
            )));
        }
        Ok(())
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, SerializationError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(malformed)?
        .to_string();

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(malformed)?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(malformed)?
            .to_string();
        let value = attribute.unescape_value().map_err(malformed)?.into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), SerializationError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(malformed("document has more than one root element"));
    }
    Ok(())
}

fn push_text(stack: &mut [Element], value: &str) -> Result<(), SerializationError> {
    match stack.last_mut() {
        Some(element) => {
            element.text.push_str(value);
            Ok(())
        }
        None if value.trim().is_empty() => Ok(()),
        None => Err(malformed("character data outside the root element")),
    }
}

fn malformed(reason: impl Display) -> SerializationError {
    SerializationError::MalformedDocument {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> HardenedParser {
        HardenedParser::default()
    }

    fn assert_malformed(text: &str, needle: &str) {
        match parser().parse(text) {
            Err(SerializationError::MalformedDocument { reason }) => {
                assert!(reason.contains(needle), "unexpected reason: {reason}");
            }
            other => panic!("expected malformed document, got {other:?}"),
        }
    }

    #[test]
    fn builds_tree_in_document_order() {
        let document = parser()
            .parse(r#"<?xml version="1.0"?><and><concept concept="a"/><!-- c --><or x="1 &amp; 2"/></and>"#)
            .expect("parsed");
        let root = document.root();
        assert_eq!(root.name(), "and");
        let names: Vec<_> = root.children().iter().map(Element::name).collect();
        assert_eq!(names, vec!["concept", "or"]);
        assert_eq!(root.children()[1].attribute("x"), Some("1 & 2"));
    }

    #[test]
    fn rejects_external_entity_doctype() {
        assert_malformed(
            r#"<?xml version="1.0"?><!DOCTYPE and [<!ENTITY xxe SYSTEM "file:///etc/passwd">]><and>&xxe;</and>"#,
            "doctype",
        );
    }

    #[test]
    fn rejects_entity_expansion_bomb() {
        assert_malformed(
            r#"<!DOCTYPE lolz [<!ENTITY lol "lol"><!ENTITY lol2 "&lol;&lol;&lol;">]><lolz>&lol2;</lolz>"#,
            "doctype",
        );
    }

    #[test]
    fn rejects_undeclared_entity_reference() {
        assert!(parser().parse("<and>&xxe;</and>").is_err());
        assert!(parser().parse(r#"<and a="&xxe;"/>"#).is_err());
    }

    #[test]
    fn rejects_processing_instruction() {
        assert_malformed(
            r#"<and><?xml-stylesheet href="http://example.org/x.xsl"?></and>"#,
            "processing instructions",
        );
    }

    #[test]
    fn rejects_truncated_and_broken_markup() {
        assert!(parser().parse("<and><concept/>").is_err());
        assert!(parser().parse("<and></or>").is_err());
        assert!(parser().parse("").is_err());
        assert_malformed("<and/><or/>", "more than one root");
    }

    #[test]
    fn enforces_depth_and_size_bounds() {
        let settings = SerializerSettings {
            max_depth: 2,
            max_document_bytes: 64,
            ..SerializerSettings::default()
        };
        let parser = HardenedParser::from_config(&settings);
        assert!(parser.parse("<and><or/></and>").is_ok());
        assert!(parser.parse("<and><or><and/></or></and>").is_err());
        assert!(parser.parse(&format!("<and x=\"{}\"/>", "y".repeat(64))).is_err());
    }
}
