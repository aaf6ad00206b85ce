//! Sequence hunk engine.
//!
//! Strings and arrays are both sequences: strings are indexed by `char`,
//! arrays by element. A [`Hunk`] replaces a span of the pre-edit sequence;
//! a [`Patch`] is a canonical set of hunks applied simultaneously.

pub mod hunk;
pub mod rebase;

pub use hunk::{
    adjust_range_against_patch, adjust_selections_against_patch, compose_hunks, Hunk, Patch,
    RangeSlot,
};
pub use rebase::rebase_patches;

use serde_json::Value;

use crate::error::{mismatch, OtError, OtResult};

/// Length of a sequence value, `None` for anything else.
pub fn seq_len(v: &Value) -> Option<usize> {
    match v {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

pub fn is_seq(v: &Value) -> bool {
    matches!(v, Value::String(_) | Value::Array(_))
}

/// `v[start..end]`, clamped to the sequence bounds.
pub fn slice(v: &Value, start: usize, end: usize) -> Value {
    match v {
        Value::String(s) => {
            Value::String(s.chars().skip(start).take(end.saturating_sub(start)).collect())
        }
        Value::Array(items) => {
            let end = end.min(items.len());
            let start = start.min(end);
            Value::Array(items[start..end].to_vec())
        }
        other => other.clone(),
    }
}

/// Concatenates sequence values of one kind. Empty parts of the other kind
/// are ignored, so an empty string insertion can edit an array.
pub fn concat<'a>(parts: impl IntoIterator<Item = &'a Value>) -> OtResult<Value> {
    let mut text: Option<String> = None;
    let mut items: Option<Vec<Value>> = None;
    for part in parts {
        match part {
            Value::String(s) if s.is_empty() => {}
            Value::Array(a) if a.is_empty() => {}
            Value::String(s) if items.is_none() => {
                text.get_or_insert_with(String::new).push_str(s)
            }
            Value::Array(a) if text.is_none() => {
                items.get_or_insert_with(Vec::new).extend(a.iter().cloned())
            }
            Value::String(_) | Value::Array(_) => {
                return Err(mismatch("cannot concatenate strings with arrays"));
            }
            _ => return Err(mismatch("sequence edits insert strings or arrays")),
        }
    }
    Ok(match (text, items) {
        (Some(s), _) => Value::String(s),
        (None, Some(a)) => Value::Array(a),
        (None, None) => Value::String(String::new()),
    })
}

/// The element at `index`: an array item, or a one-char string.
pub fn element(seq: &Value, index: usize) -> OtResult<Value> {
    match seq {
        Value::String(s) => s
            .chars()
            .nth(index)
            .map(|c| Value::String(c.to_string()))
            .ok_or(OtError::OutOfBounds),
        Value::Array(items) => items.get(index).cloned().ok_or(OtError::OutOfBounds),
        _ => Err(mismatch("element access needs a string or an array")),
    }
}

/// Every element of a sequence, see [`element`].
pub fn elements(seq: &Value) -> OtResult<Vec<Value>> {
    match seq {
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        Value::Array(items) => Ok(items.clone()),
        _ => Err(mismatch("element access needs a string or an array")),
    }
}

/// Rebuilds a sequence of the same kind as `like` from elements.
///
/// Elements of a string must stay single characters.
pub fn from_elements(like: &Value, elements: Vec<Value>) -> OtResult<Value> {
    match like {
        Value::String(_) => {
            let mut out = String::with_capacity(elements.len());
            for el in elements {
                match el.as_str().map(|s| {
                    let mut chars = s.chars();
                    (chars.next(), chars.next())
                }) {
                    Some((Some(c), None)) => out.push(c),
                    _ => return Err(mismatch("string elements must remain single characters")),
                }
            }
            Ok(Value::String(out))
        }
        Value::Array(_) => Ok(Value::Array(elements)),
        _ => Err(mismatch("element access needs a string or an array")),
    }
}
