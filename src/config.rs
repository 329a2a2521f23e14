//! Configuration for the classifier core.
//!
//! Settings are read from YAML. Every section and field is optional and falls
//! back to the defaults documented on each field, so an empty document is a
//! valid configuration.
//!
//! ```yaml
//! logger:
//!   enable: true
//!   level: debug
//!   format: json
//! resolver:
//!   preload: true
//! serializer:
//!   indent: 2
//!   max_depth: 256
//!   max_document_bytes: 4194304
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Top level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logger: Logger,
    pub resolver: ResolverSettings,
    pub serializer: SerializerSettings,
}

impl Config {
    /// Parses a configuration from YAML text.
    ///
    /// # Errors
    /// When the text is not valid YAML or contains unknown values.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reads and parses a YAML configuration file.
    ///
    /// # Errors
    /// When the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
}

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Logger {
    /// Installs a subscriber when `true`. Defaults to `true`.
    pub enable: bool,
    /// Minimum level emitted. `RUST_LOG` takes precedence when set.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            enable: true,
            level: LogLevel::Info,
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Identity resolver configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Resolve every logic-node kind eagerly when the resolver is built from
    /// configuration. Defaults to `false`.
    pub preload: bool,
}

/// Expression serializer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerializerSettings {
    /// Spaces per nesting level in produced documents.
    pub indent: usize,
    /// Deepest element nesting accepted while parsing.
    pub max_depth: usize,
    /// Largest input accepted while parsing, in bytes.
    pub max_document_bytes: usize,
}

impl Default for SerializerSettings {
    fn default() -> Self {
        Self {
            indent: 2,
            max_depth: 256,
            max_document_bytes: 4 * 1024 * 1024,
        }
    }
}
