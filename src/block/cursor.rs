//! Output cursor threaded between sibling blocks

use std::fmt;

use indexmap::IndexMap;

use crate::error::{GenerateError, Result};
use crate::template::InputRef;

use super::spec::{OutputRule, Slot};

/// Positional outputs plus named outputs of the most recently loaded block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub outputs: Vec<String>,
    pub named: IndexMap<String, String>,
}

impl Cursor {
    /// Create an empty cursor
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cursor with positional outputs only
    pub fn with_outputs<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outputs: outputs.into_iter().map(Into::into).collect(),
            named: IndexMap::new(),
        }
    }

    /// Set a named output
    pub fn with_named(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }

    /// Look up the value an `[INPUT...]` placeholder stands for
    pub fn input(&self, reference: &InputRef) -> Result<String> {
        match reference {
            InputRef::First => self
                .outputs
                .first()
                .cloned()
                .ok_or(GenerateError::NoInputFound {
                    block: String::new(),
                }),
            InputRef::Index(index) => self.positional(*index),
            InputRef::Name(name) => self.named_value(name),
        }
    }

    fn positional(&self, index: usize) -> Result<String> {
        self.outputs
            .get(index)
            .cloned()
            .ok_or_else(|| GenerateError::IndexOutOfRange {
                index,
                len: self.outputs.len(),
                block: String::new(),
            })
    }

    fn named_value(&self, name: &str) -> Result<String> {
        self.named
            .get(name)
            .cloned()
            .ok_or_else(|| GenerateError::unresolved(name))
    }

    /// Apply a descriptor's output mapping rules in order
    ///
    /// A positional destination past the end appends, one within range
    /// overwrites. Keyed destinations set the named output.
    pub fn apply_rules(&mut self, rules: &[OutputRule]) -> Result<()> {
        for rule in rules {
            let value = match &rule.source {
                Slot::Index(index) => self.positional(*index)?,
                Slot::Key(key) => self.named_value(key)?,
            };
            match &rule.target {
                Slot::Index(index) if *index < self.outputs.len() => self.outputs[*index] = value,
                Slot::Index(_) => self.outputs.push(value),
                Slot::Key(key) => {
                    self.named.insert(key.clone(), value);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list: {:?} dict: {{", self.outputs)?;
        for (i, (key, value)) in self.named.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", key, value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rule(source: Slot, target: Slot) -> OutputRule {
        OutputRule { source, target }
    }

    #[test]
    fn test_input_lookup() {
        let cursor = Cursor::with_outputs(["a", "b", "c"]).with_named("skip", "s");
        assert_eq!(cursor.input(&InputRef::First).unwrap(), "a");
        assert_eq!(cursor.input(&InputRef::Index(2)).unwrap(), "c");
        assert_eq!(cursor.input(&InputRef::Name("skip".into())).unwrap(), "s");
    }

    #[test]
    fn test_first_input_on_empty_cursor() {
        let err = Cursor::new().input(&InputRef::First).unwrap_err();
        assert!(matches!(err, GenerateError::NoInputFound { .. }));
    }

    #[test]
    fn test_index_out_of_range() {
        let err = Cursor::with_outputs(["a", "b", "c"])
            .input(&InputRef::Index(5))
            .unwrap_err();
        match err {
            GenerateError::IndexOutOfRange { index, len, .. } => {
                assert_eq!((index, len), (5, 3));
            }
            other => panic!("Expected IndexOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_rules_append_overwrite_and_set() {
        let mut cursor = Cursor::with_outputs(["a", "b"]).with_named("skip", "s");
        cursor
            .apply_rules(&[
                rule(Slot::Index(0), Slot::Index(5)),
                rule(Slot::Key("skip".into()), Slot::Index(1)),
                rule(Slot::Index(0), Slot::Key("saved".into())),
            ])
            .unwrap();
        assert_eq!(cursor.outputs, vec!["a", "s", "a"]);
        assert_eq!(cursor.named.get("saved").map(String::as_str), Some("a"));
    }

    #[test]
    fn test_rule_with_missing_source() {
        let mut cursor = Cursor::new();
        let err = cursor
            .apply_rules(&[rule(Slot::Key("nope".into()), Slot::Index(0))])
            .unwrap_err();
        assert!(matches!(err, GenerateError::UnresolvedReference { .. }));
    }
}
