//! Span locators and the scan-and-replace loop
//!
//! Each locator returns the byte range of the next match at or after a
//! position. Matches never overlap and are found left to right.

use std::ops::Range;

use crate::error::{GenerateError, Result};

/// Upper bound on substitutions performed by a single rewrite pass
pub const MAX_REWRITES: usize = 10_000;

/// Keys whose quoted values are qualified with the block prefix
pub const PREFIX_KEYS: [&str; 3] = ["bottom", "top", "name"];

const INPUT_OPEN: &str = "[INPUT";

/// Where scanning continues after a replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Rescan the inserted text
    AtMatch,
    /// Continue after the inserted text
    AfterReplacement,
}

/// Replace every match of `locate` in `text` with the result of `replace`
///
/// `replace` receives the matched slice. Fails with `RewriteLimit` once
/// more than [`MAX_REWRITES`] substitutions were made.
pub fn rewrite_all<L, R>(text: &str, resume: Resume, mut locate: L, mut replace: R) -> Result<String>
where
    L: FnMut(&str, usize) -> Option<Range<usize>>,
    R: FnMut(&str) -> Result<String>,
{
    let mut text = text.to_string();
    let mut pos = 0;
    let mut count = 0;
    while let Some(span) = locate(&text, pos) {
        count += 1;
        if count > MAX_REWRITES {
            return Err(GenerateError::RewriteLimit {
                block: String::new(),
                placeholder: text[span].to_string(),
            });
        }
        let replacement = replace(&text[span.clone()])?;
        pos = match resume {
            Resume::AtMatch => span.start,
            Resume::AfterReplacement => span.start + replacement.len(),
        };
        text.replace_range(span, &replacement);
    }
    Ok(text)
}

/// Next `[INPUT]` or `[INPUT:<ref>]` placeholder
pub fn find_input(text: &str, from: usize) -> Option<Range<usize>> {
    let mut pos = from;
    while let Some(found) = text.get(pos..)?.find(INPUT_OPEN) {
        let start = pos + found;
        let rest = &text[start + INPUT_OPEN.len()..];
        if rest.starts_with(']') {
            return Some(start..start + INPUT_OPEN.len() + 1);
        }
        if let Some(reference) = rest.strip_prefix(':') {
            let len = reference
                .find(|c: char| c == ']' || c.is_whitespace())
                .filter(|&i| i > 0 && reference[i..].starts_with(']'));
            if let Some(len) = len {
                return Some(start..start + INPUT_OPEN.len() + 1 + len + 1);
            }
        }
        pos = start + 1;
    }
    None
}

/// Next `[[expr]]` span, bracket depth aware and confined to one line
pub fn find_expression(text: &str, from: usize) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while let Some(found) = text.get(pos..)?.find("[[") {
        let start = pos + found;
        if let Some(end) = expression_end(bytes, start + 2) {
            return Some(start..end);
        }
        pos = start + 1;
    }
    None
}

fn expression_end(bytes: &[u8], mut i: usize) -> Option<usize> {
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => return None,
            b'[' => depth += 1,
            b']' if depth > 0 => depth -= 1,
            b']' => {
                return (bytes.get(i + 1) == Some(&b']')).then_some(i + 2);
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Next `[NAME]` or `[NAME:default]` placeholder
///
/// The bracket content must be non-empty and free of whitespace and
/// nested brackets.
pub fn find_variable(text: &str, from: usize) -> Option<Range<usize>> {
    let mut pos = from;
    while let Some(found) = text.get(pos..)?.find('[') {
        let start = pos + found;
        let rest = &text[start + 1..];
        let len = rest
            .find(|c: char| c == ']' || c == '[' || c.is_whitespace())
            .filter(|&i| i > 0 && rest[i..].starts_with(']'));
        if let Some(len) = len {
            return Some(start..start + len + 2);
        }
        pos = start + 1;
    }
    None
}

/// Next `key: "value"` pair for one of [`PREFIX_KEYS`]
pub fn find_prefix_key(text: &str, from: usize) -> Option<Range<usize>> {
    find_key_value(text, from, &PREFIX_KEYS).map(|(span, _)| span)
}

/// Next quoted value after one of `keys`
///
/// Keys match as whole words followed by `:` and optional spaces; the quoted
/// value must close on the same line. Returns the span of the whole pair and
/// the span of the value between the quotes.
pub fn find_key_value(text: &str, from: usize, keys: &[&str]) -> Option<(Range<usize>, Range<usize>)> {
    let mut pos = from;
    loop {
        let rest = text.get(pos..)?;
        let (offset, key) = keys
            .iter()
            .filter_map(|key| rest.find(key).map(|i| (i, *key)))
            .min_by_key(|(i, _)| *i)?;
        let start = pos + offset;
        if let Some(value) = quoted_value_after(text, start, key) {
            return Some((start..value.end + 1, value));
        }
        pos = start + 1;
    }
}

fn quoted_value_after(text: &str, start: usize, key: &str) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    if start > 0 && is_word_byte(bytes[start - 1]) {
        return None;
    }
    let mut i = start + key.len();
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    i += 1;
    while bytes.get(i) == Some(&b' ') {
        i += 1;
    }
    if bytes.get(i) != Some(&b'"') {
        return None;
    }
    let value_start = i + 1;
    let close = text[value_start..].find(['"', '\n'])? + value_start;
    (bytes[close] == b'"').then_some(value_start..close)
}

/// Top name of the last `layer { ... top: "..." }` construct
pub fn last_layer_top(text: &str) -> Option<&str> {
    let mut pos = 0;
    let mut last = None;
    while let Some(open) = find_layer_open(text, pos) {
        match find_key_value(text, open, &["top"]) {
            Some((span, value)) if !value.is_empty() => {
                last = Some(&text[value]);
                pos = span.end;
            }
            _ => break,
        }
    }
    last
}

/// Position just after the `{` of the next `layer {`
fn find_layer_open(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while let Some(found) = text.get(pos..)?.find("layer") {
        let start = pos + found;
        let mut i = start + "layer".len();
        while bytes.get(i) == Some(&b' ') {
            i += 1;
        }
        let boundary = start == 0 || !is_word_byte(bytes[start - 1]);
        if boundary && bytes.get(i) == Some(&b'{') {
            return Some(i + 1);
        }
        pos = start + 1;
    }
    None
}

/// Trailing output declaration: start of its `[` and the bracket content
///
/// The last non-blank line must end in `]`; the list opens at the first `[`
/// of that line.
pub fn split_output_declaration(text: &str) -> Option<(usize, &str)> {
    let trimmed = text.trim_end();
    if !trimmed.ends_with(']') {
        return None;
    }
    let line_start = trimmed.rfind('\n').map_or(0, |i| i + 1);
    let open = trimmed[line_start..].find('[')? + line_start;
    let content = &trimmed[open + 1..trimmed.len() - 1];
    (!content.is_empty()).then_some((open, content))
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn all(text: &str, locate: fn(&str, usize) -> Option<Range<usize>>) -> Vec<&str> {
        let mut found = Vec::new();
        let mut pos = 0;
        while let Some(span) = locate(text, pos) {
            pos = span.end;
            found.push(&text[span]);
        }
        found
    }

    #[test]
    fn test_find_inputs() {
        let text = r#"bottom: "[INPUT]" bottom: "[INPUT:1]" [INPUTS] [INPUT:skip]"#;
        assert_eq!(
            all(text, find_input),
            vec!["[INPUT]", "[INPUT:1]", "[INPUT:skip]"]
        );
    }

    #[test]
    fn test_input_reference_stops_at_first_bracket() {
        assert_eq!(all("[INPUT:a]b]", find_input), vec!["[INPUT:a]"]);
        assert!(find_input("[INPUT:]", 0).is_none());
    }

    #[test]
    fn test_find_variables() {
        let text = "num_output: [NUM] pad: [PAD:0] [not a var] []";
        assert_eq!(all(text, find_variable), vec!["[NUM]", "[PAD:0]"]);
    }

    #[test]
    fn test_variable_inside_brackets() {
        assert_eq!(all("[[NUM]", find_variable), vec!["[NUM]"]);
    }

    #[test]
    fn test_find_expression_with_nested_variable() {
        let text = "num_output: [[ [NUM] * 2 ]] x";
        assert_eq!(all(text, find_expression), vec!["[[ [NUM] * 2 ]]"]);
    }

    #[test]
    fn test_expression_must_close_on_line() {
        assert!(find_expression("[[ 1 +\n 2 ]]", 0).is_none());
        assert_eq!(all("[[1] [[2]]", find_expression), vec!["[[2]]"]);
    }

    #[test]
    fn test_find_prefix_keys() {
        let text = "name: \"conv\"\n  bottom:\"data\"\n  top:   \"conv\"\n  layer_top: \"x\"";
        assert_eq!(
            all(text, find_prefix_key),
            vec!["name: \"conv\"", "bottom:\"data\"", "top:   \"conv\""]
        );
    }

    #[test]
    fn test_prefix_value_on_one_line() {
        assert!(find_prefix_key("top: \"a\nb\"", 0).is_none());
    }

    #[test]
    fn test_rewrite_rescans_inserted_text() {
        let out = rewrite_all("[A]", Resume::AtMatch, find_variable, |m| {
            Ok(if m == "[A]" { "[B]!".to_string() } else { "b".to_string() })
        })
        .unwrap();
        assert_eq!(out, "b!");
    }

    #[test]
    fn test_rewrite_after_replacement_does_not_rescan() {
        let out = rewrite_all("top: \"x\"", Resume::AfterReplacement, find_prefix_key, |m| {
            Ok(format!("{} top: \"y\"", m))
        })
        .unwrap();
        assert_eq!(out, "top: \"x\" top: \"y\"");
    }

    #[test]
    fn test_rewrite_limit() {
        let err = rewrite_all("[A]", Resume::AtMatch, find_variable, |m| Ok(m.to_string()))
            .unwrap_err();
        assert!(matches!(err, GenerateError::RewriteLimit { placeholder, .. } if placeholder == "[A]"));
    }

    #[test]
    fn test_last_layer_top() {
        let text = r#"
layer {
  name: "a"
  top: "a_out"
}
layer {
  name: "b"
  top: "b_out"
}
"#;
        assert_eq!(last_layer_top(text), Some("b_out"));
        assert_eq!(last_layer_top("input: \"data\""), None);
    }

    #[test]
    fn test_split_output_declaration() {
        let text = "layer {\n}\n[out, skip:[INPUT:0]]  \n\n";
        let (start, content) = split_output_declaration(text).unwrap();
        assert_eq!(&text[..start], "layer {\n}\n");
        assert_eq!(content, "out, skip:[INPUT:0]");
    }

    #[test]
    fn test_no_output_declaration() {
        assert_eq!(split_output_declaration("layer {\n}\n"), None);
        assert_eq!(split_output_declaration("x\n[]"), None);
    }
}
