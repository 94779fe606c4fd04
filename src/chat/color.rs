//! Inline color-hint extraction from assistant replies.
//!
//! The assistant is asked to end its reply with a fragment such as
//! `{"color": "#87CEEB"}` that the user never sees. This module finds the first
//! balanced `{...}` fragment, parses it, and reports what it found.

use serde_json::{Map, Value};
use std::ops::Range;

/// Result of probing a reply for its color fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorHint {
    /// A JSON object with a non-empty string `color`.
    FoundWithColor { color: String, fragment: Range<usize> },
    /// A JSON object without a usable `color`.
    FoundWithoutColor { fragment: Range<usize> },
    NotFound,
}

impl ColorHint {
    pub fn color(&self) -> Option<&str> {
        match self {
            ColorHint::FoundWithColor { color, .. } => Some(color),
            _ => None,
        }
    }

    /// Byte range of the fragment within the probed text.
    pub fn fragment(&self) -> Option<Range<usize>> {
        match self {
            ColorHint::FoundWithColor { fragment, .. } | ColorHint::FoundWithoutColor { fragment } => {
                Some(fragment.clone())
            }
            ColorHint::NotFound => None,
        }
    }
}

/// Probe `text` for the first balanced brace fragment and parse it as a JSON
/// object. A fragment that is not an object counts as not found.
pub fn parse_color_hint(text: &str) -> ColorHint {
    let Some(fragment) = find_balanced_fragment(text) else {
        return ColorHint::NotFound;
    };
    let Ok(object) = serde_json::from_str::<Map<String, Value>>(&text[fragment.clone()]) else {
        return ColorHint::NotFound;
    };
    match object
        .get("color")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        Some(color) => ColorHint::FoundWithColor {
            color: color.to_string(),
            fragment,
        },
        None => ColorHint::FoundWithoutColor { fragment },
    }
}

/// Remove the fragment (if any) and trim what remains.
pub fn strip_color_hint(text: &str) -> String {
    strip_fragment(text, &parse_color_hint(text))
}

pub(crate) fn strip_fragment(text: &str, hint: &ColorHint) -> String {
    match hint.fragment() {
        Some(range) => {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..range.start]);
            out.push_str(&text[range.end..]);
            out.trim().to_string()
        }
        None => text.to_string(),
    }
}

fn find_balanced_fragment(text: &str) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, &b)| b == b'{')
        .find_map(|(start, _)| balanced_end(bytes, start).map(|end| start..end))
}

/// Exclusive end of the brace group opened at `start`, honouring JSON string
/// literals and escapes.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
