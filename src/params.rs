//! Parameter sets and `::NAME` reference resolution
//!
//! Parameters are plain strings. A value may refer to other parameters with
//! `::NAME` tokens, which are substituted when a child block's parameters are
//! computed. The loop variable `::ITER` is special: it is left in place until
//! the iteration index is known.

use std::collections::HashMap;
use std::ops::Range;

use indexmap::IndexMap;

use crate::error::{GenerateError, Result};
use crate::expr;

/// Reserved loop variable name, bound to the 1-based iteration index
pub const LOOP_VARIABLE: &str = "ITER";

/// Prefix marking a value for expression evaluation
pub const EXPRESSION_MARKER: &str = "!!";

/// Ordered mapping from parameter name to raw string value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    values: IndexMap<String, String>,
}

impl ParameterSet {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Set a value, replacing any existing one
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Set a value only if the name is not defined yet
    ///
    /// Used to merge a file's declared defaults under the values handed down
    /// by the parent: existing keys win.
    pub fn insert_default(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.entry(name.into()).or_insert_with(|| value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy this set and apply `overrides` on top of the copy
    pub fn with_overrides<I, K, V>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut child = self.clone();
        for (name, value) in overrides {
            child.insert(name, value);
        }
        child
    }

    /// Resolve the references of every value against `scope`
    ///
    /// The loop variable is skipped so that it can be bound per iteration
    /// by [`ParameterSet::for_iteration`].
    pub fn resolved_against(&self, scope: &ParameterSet) -> Result<Self> {
        let mut resolver = Resolver::new(scope, true);
        let mut values = IndexMap::with_capacity(self.values.len());
        for (name, value) in &self.values {
            values.insert(name.clone(), resolver.resolve(value)?);
        }
        Ok(Self { values })
    }

    /// Bind the loop variable to `iteration` and evaluate `!!`-marked values
    pub fn for_iteration(&self, iteration: usize) -> Result<Self> {
        let index = iteration.to_string();
        let mut values = IndexMap::with_capacity(self.values.len());
        for (name, value) in &self.values {
            let value = bind_loop_variable(value, &index);
            let value = match value.strip_prefix(EXPRESSION_MARKER) {
                Some(source) => expr::evaluate_source(source)
                    .map_err(|err| GenerateError::expression(source, err))?
                    .to_string(),
                None => value,
            };
            values.insert(name.clone(), value);
        }
        Ok(Self { values })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = ParameterSet::new();
        set.extend(iter);
        set
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for ParameterSet {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

/// Resolve every `::NAME` token in `text` against `params`
///
/// With `skip_loop_var`, `::ITER` tokens are left untouched. Fails with
/// `UnresolvedReference` for unknown names and `CyclicReference` when a
/// value refers back to itself.
pub fn resolve_references(text: &str, params: &ParameterSet, skip_loop_var: bool) -> Result<String> {
    Resolver::new(params, skip_loop_var).resolve(text)
}

/// Locate the next `::NAME` token at or after `from`
pub(crate) fn find_reference(text: &str, from: usize) -> Option<(Range<usize>, &str)> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while let Some(found) = text.get(pos..)?.find("::") {
        let start = pos + found;
        let name_start = start + 2;
        let name_len = bytes[name_start..]
            .iter()
            .take_while(|b| is_reference_char(**b))
            .count();
        if name_len > 0 {
            let end = name_start + name_len;
            return Some((start..end, &text[name_start..end]));
        }
        pos = start + 1;
    }
    None
}

fn is_reference_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')
}

/// Replace `::ITER` tokens (and only those) with `index`
fn bind_loop_variable(value: &str, index: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    let mut pos = 0;
    while let Some((span, name)) = find_reference(value, pos) {
        if name == LOOP_VARIABLE {
            out.push_str(&value[last..span.start]);
            out.push_str(index);
            last = span.end;
        }
        pos = span.end;
    }
    out.push_str(&value[last..]);
    out
}

/// Resolution state for one top-level call
struct Resolver<'p> {
    params: &'p ParameterSet,
    skip_loop_var: bool,
    /// Names whose values are currently being resolved
    in_progress: Vec<String>,
    resolved: HashMap<String, String>,
}

impl<'p> Resolver<'p> {
    fn new(params: &'p ParameterSet, skip_loop_var: bool) -> Self {
        Self {
            params,
            skip_loop_var,
            in_progress: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    fn resolve(&mut self, text: &str) -> Result<String> {
        let mut text = text.to_string();
        // scanning restarts here after every substitution
        let mut offset = 0;
        while let Some((span, name)) = find_reference(&text, offset) {
            if self.skip_loop_var && name == LOOP_VARIABLE {
                offset = span.end;
                continue;
            }
            let name = name.to_string();
            let value = self.value_of(&name)?;
            text.replace_range(span, &value);
        }
        Ok(text)
    }

    fn value_of(&mut self, name: &str) -> Result<String> {
        if let Some(value) = self.resolved.get(name) {
            return Ok(value.clone());
        }
        if self.in_progress.iter().any(|n| n == name) {
            let mut chain = self.in_progress.clone();
            chain.push(name.to_string());
            return Err(GenerateError::CyclicReference { chain });
        }
        let raw = self
            .params
            .get(name)
            .ok_or_else(|| GenerateError::unresolved(name))?
            .to_string();

        self.in_progress.push(name.to_string());
        let value = self.resolve(&raw);
        self.in_progress.pop();

        let value = value?;
        self.resolved.insert(name.to_string(), value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(pairs: &[(&str, &str)]) -> ParameterSet {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_resolve_simple_reference() {
        let p = params(&[("NUM", "64")]);
        assert_eq!(
            resolve_references("num_output: ::NUM", &p, false).unwrap(),
            "num_output: 64"
        );
    }

    #[test]
    fn test_resolve_nested_references() {
        let p = params(&[("A", "::B/x"), ("B", "::C"), ("C", "7")]);
        assert_eq!(resolve_references("::A/::C", &p, false).unwrap(), "7/x/7");
    }

    #[test]
    fn test_dash_and_dot_belong_to_the_name() {
        let p = params(&[("B", "7"), ("B-x", "dash"), ("v.2", "dot")]);
        assert_eq!(resolve_references("::B-x ::v.2 ::B", &p, false).unwrap(), "dash dot 7");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let p = params(&[("A", "::B"), ("B", "done")]);
        let once = resolve_references("x ::A y", &p, false).unwrap();
        let twice = resolve_references(&once, &p, false).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_skip_loop_variable() {
        let p = params(&[("NAME", "conv")]);
        assert_eq!(
            resolve_references("::ITER/::NAME/::ITER", &p, true).unwrap(),
            "::ITER/conv/::ITER"
        );
    }

    #[test]
    fn test_loop_variable_not_skipped_must_resolve() {
        let err = resolve_references("::ITER", &ParameterSet::new(), false).unwrap_err();
        assert!(matches!(err, GenerateError::UnresolvedReference { name, .. } if name == "ITER"));
    }

    #[test]
    fn test_unresolved_reference() {
        let err = resolve_references("a ::MISSING b", &ParameterSet::new(), true).unwrap_err();
        assert!(matches!(err, GenerateError::UnresolvedReference { name, .. } if name == "MISSING"));
    }

    #[test]
    fn test_cyclic_reference_fails_fast() {
        let p = params(&[("A", "::B"), ("B", "x ::A")]);
        let err = resolve_references("::A", &p, false).unwrap_err();
        match err {
            GenerateError::CyclicReference { chain } => assert_eq!(chain, vec!["A", "B", "A"]),
            other => panic!("Expected CyclicReference, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_is_cyclic() {
        let p = params(&[("A", "::A")]);
        assert!(matches!(
            resolve_references("::A", &p, false),
            Err(GenerateError::CyclicReference { .. })
        ));
    }

    #[test]
    fn test_lone_colons_are_not_tokens() {
        let p = params(&[("b", "B")]);
        assert_eq!(resolve_references("a :: :::b", &p, false).unwrap(), "a :: :B");
    }

    #[test]
    fn test_insert_default_keeps_existing() {
        let mut p = params(&[("NUM", "3")]);
        p.insert_default("NUM", "5");
        p.insert_default("OTHER", "1");
        assert_eq!(p.get("NUM"), Some("3"));
        assert_eq!(p.get("OTHER"), Some("1"));
    }

    #[test]
    fn test_overrides_do_not_touch_parent() {
        let parent = params(&[("NUM", "3")]);
        let child = parent.with_overrides([("NUM", "9")]);
        assert_eq!(parent.get("NUM"), Some("3"));
        assert_eq!(child.get("NUM"), Some("9"));
    }

    #[test]
    fn test_resolved_against_parent_scope() {
        let parent = params(&[("NUM", "3")]);
        let child = parent
            .with_overrides([("NUM", "::NUM0"), ("OUT", "::NUM")])
            .resolved_against(&parent.with_overrides([("NUM0", "x")]))
            .unwrap();
        assert_eq!(child.get("NUM"), Some("x"));
        assert_eq!(child.get("OUT"), Some("3"));
    }

    #[test]
    fn test_for_iteration_binds_and_evaluates() {
        let p = params(&[
            ("NAME", "block_::ITER"),
            ("WIDTH", "!!16 * ::ITER"),
            ("ITERATION", "::ITERATION_COUNT"),
        ]);
        let third = p.for_iteration(3).unwrap();
        assert_eq!(third.get("NAME"), Some("block_3"));
        assert_eq!(third.get("WIDTH"), Some("48"));
        assert_eq!(third.get("ITERATION"), Some("::ITERATION_COUNT"));
    }

    #[test]
    fn test_for_iteration_rejects_bad_expression() {
        let p = params(&[("WIDTH", "!!open('x')")]);
        assert!(matches!(
            p.for_iteration(1),
            Err(GenerateError::Expression { .. })
        ));
    }
}
