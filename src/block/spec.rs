//! YAML configuration of composite blocks

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::error::{GenerateError, Result};

/// A composite block file
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub params: IndexMap<String, Scalar>,
    pub blocks: Vec<BlockSpec>,
}

impl CompositeConfig {
    /// Parse a composite configuration read from `path`
    pub fn from_str(source: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| GenerateError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Descriptor of one child block
#[derive(Debug, Clone, Deserialize)]
pub struct BlockSpec {
    pub file: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub params: IndexMap<String, Scalar>,
    #[serde(default)]
    pub repeat: Option<Scalar>,
    #[serde(default)]
    pub hide: Option<Scalar>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub output: Vec<OutputRule>,
}

impl BlockSpec {
    /// Name used in logs and error messages
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.file)
    }
}

/// A YAML scalar kept in its textual form
///
/// Parameters are strings throughout generation; numbers and booleans are
/// stored as they would print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar(pub String);

impl Scalar {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar(s.to_string())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        use serde::de::Error;

        match serde_yaml::Value::deserialize(deserializer)? {
            serde_yaml::Value::String(s) => Ok(Scalar(s)),
            serde_yaml::Value::Number(n) => Ok(Scalar(n.to_string())),
            serde_yaml::Value::Bool(b) => Ok(Scalar(b.to_string())),
            serde_yaml::Value::Null => Ok(Scalar(String::new())),
            other => Err(D::Error::custom(format!(
                "expected a scalar value, found {:?}",
                other
            ))),
        }
    }
}

/// One `{in, out}` output mapping rule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputRule {
    #[serde(rename = "in")]
    pub source: Slot,
    #[serde(rename = "out")]
    pub target: Slot,
}

/// Side of an output rule: a positional index or a named key
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawSlot")]
pub enum Slot {
    Index(usize),
    Key(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSlot {
    Index(usize),
    Text(String),
}

impl From<RawSlot> for Slot {
    fn from(raw: RawSlot) -> Self {
        match raw {
            RawSlot::Index(index) => Slot::Index(index),
            RawSlot::Text(text) => match text.parse::<usize>() {
                Ok(index) if text.bytes().all(|b| b.is_ascii_digit()) => Slot::Index(index),
                _ => Slot::Key(text),
            },
        }
    }
}
