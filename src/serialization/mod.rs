//! XML documents for expression trees.
//!
//! Writing validates the whole tree before producing a single byte. Reading
//! is a two stage pipeline: [`parse::HardenedParser`] turns text into a
//! [`parse::ParsedDocument`], and [`mapping::map_document`] turns that
//! document, and only that, into an [`ExpressionNode`].
//!
//! Each node becomes one element named after [`LogicNodeKind::tag`], children
//! in order:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <and>
//!   <concept concept="6d9c3c0a-1c1e-4b8b-9a0e-1f2d3c4b5a69"/>
//!   <role-some role="1f0b6c3e-8d1a-4e1e-9a55-3a6c1e2b7d90">
//!     <concept concept="0b2f4c6e-7a3d-4c1b-8e9f-5d6a7b8c9d0e"/>
//!   </role-some>
//! </and>
//! ```
//!
//! [`LogicNodeKind::tag`]: crate::logic::LogicNodeKind::tag

pub mod mapping;
pub mod parse;
mod writer;

use thiserror::Error;

use crate::{
    config::SerializerSettings,
    logic::expression::{ExpressionNode, InvalidExpression},
};
use parse::HardenedParser;

/// Errors raised while writing or reading expression documents.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SerializationError {
    /// Input text was rejected: doctype present, broken or truncated markup,
    /// or values that do not match their declared type.
    #[error("malformed document: {reason}")]
    MalformedDocument { reason: String },
    /// The tree handed to the writer is structurally invalid. Nothing was
    /// written.
    #[error(transparent)]
    InvalidExpression(#[from] InvalidExpression),
    /// The XML writer failed.
    #[error("cannot write document: {reason}")]
    Write { reason: String },
}

/// Writes and reads expression trees as XML documents.
#[derive(Clone, Debug)]
pub struct ExpressionSerializer {
    indent: usize,
    parser: HardenedParser,
}

impl Default for ExpressionSerializer {
    fn default() -> Self {
        Self::from_config(&SerializerSettings::default())
    }
}

impl ExpressionSerializer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(settings: &SerializerSettings) -> Self {
        Self {
            indent: settings.indent,
            parser: HardenedParser::from_config(settings),
        }
    }

    /// Serializes the tree rooted at `root`.
    ///
    /// Output is deterministic for a given tree, and always within the depth
    /// and size bounds [`ExpressionSerializer::deserialize`] enforces.
    ///
    /// # Errors
    /// [`SerializationError::InvalidExpression`] when the tree is invalid,
    /// still holds a placeholder that is neither expanded nor deferred, or is
    /// too deep or too large to be read back.
    pub fn serialize(&self, root: &ExpressionNode) -> Result<String, SerializationError> {
        self.check_writable(root).map_err(|err| {
            tracing::warn!(path = %err.path, reason = %err.reason, "expression_rejected");
            err
        })?;
        let document = writer::write_document(root, self.indent)?;
        if document.len() > self.parser.max_document_bytes() {
            let err = InvalidExpression {
                path: root.kind().tag().to_string(),
                reason: format!(
                    "document would be {} bytes, the limit is {}",
                    document.len(),
                    self.parser.max_document_bytes()
                ),
            };
            tracing::warn!(path = %err.path, reason = %err.reason, "expression_rejected");
            return Err(err.into());
        }
        tracing::debug!(nodes = root.node_count(), bytes = document.len(), "expression_serialized");
        Ok(document)
    }

    fn check_writable(&self, root: &ExpressionNode) -> Result<(), InvalidExpression> {
        let depth = root.depth();
        if depth > self.parser.max_depth() {
            return Err(InvalidExpression {
                path: root.kind().tag().to_string(),
                reason: format!(
                    "tree is {depth} levels deep, the limit is {}",
                    self.parser.max_depth()
                ),
            });
        }
        root.validate()
    }

    /// Reads a tree from `text` through the hardened parser.
    ///
    /// # Errors
    /// [`SerializationError::MalformedDocument`] when the text is rejected.
    pub fn deserialize(&self, text: &str) -> Result<ExpressionNode, SerializationError> {
        let root = self
            .parser
            .parse(text)
            .and_then(|document| mapping::map_document(&document))
            .map_err(|err| {
                tracing::warn!(err.msg = %err, "expression_document_rejected");
                err
            })?;
        tracing::debug!(nodes = root.node_count(), "expression_deserialized");
        Ok(root)
    }
}
