//! JSON Pointer (RFC 6901) helpers.
//!
//! Selection paths in [`Meta`](crate::Meta) and COPY locations are JSON
//! Pointers. A [`Step`] is one resolved component: an object key or an
//! array/string index.

use std::fmt;

use serde_json::Value;

use crate::error::{invalid, mismatch, OtError, OtResult};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Key(String),
    Index(usize),
}

impl Step {
    /// Raw (unescaped) pointer component for this step.
    pub fn component(&self) -> String {
        match self {
            Step::Key(k) => k.clone(),
            Step::Index(i) => i.to_string(),
        }
    }

    pub fn matches(&self, component: &str) -> bool {
        match self {
            Step::Key(k) => k == component,
            Step::Index(i) => component.parse::<usize>().map(|c| c == *i).unwrap_or(false),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Key(k) => write!(f, "{k:?}"),
            Step::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Step {
    fn from(k: &str) -> Self {
        Step::Key(k.to_string())
    }
}

impl From<String> for Step {
    fn from(k: String) -> Self {
        Step::Key(k)
    }
}

impl From<usize> for Step {
    fn from(i: usize) -> Self {
        Step::Index(i)
    }
}

/// Escapes `~` and `/` in a single pass over the component.
fn escape_component(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '~' => out.push_str("~0"),
            '/' => out.push_str("~1"),
            c => out.push(c),
        }
    }
    out
}

/// Decodes `~0` and `~1`. Any other `~` sequence is not a valid RFC 6901
/// escape and is rejected instead of being passed through.
fn unescape_component(component: &str) -> OtResult<String> {
    let mut out = String::with_capacity(component.len());
    let mut chars = component.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return Err(invalid(format!("bad escape in pointer component {component:?}"))),
        }
    }
    Ok(out)
}

/// Appends one step to a pointer string.
pub fn join(pointer: &str, step: &Step) -> String {
    format!("{pointer}/{}", escape_component(&step.component()))
}

pub fn parse(pointer: &str) -> OtResult<Vec<String>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    if !pointer.starts_with('/') {
        return Err(invalid(format!("pointer {pointer:?} must start with '/'")));
    }
    pointer[1..].split('/').map(unescape_component).collect()
}

pub fn format(components: &[String]) -> String {
    components
        .iter()
        .map(|c| format!("/{}", escape_component(c)))
        .collect()
}

/// Resolves a component against a container, turning it into a [`Step`].
pub fn resolve_step(container: &Value, component: &str) -> OtResult<Step> {
    match container {
        Value::Object(_) => Ok(Step::Key(component.to_string())),
        Value::Array(_) => component
            .parse::<usize>()
            .map(Step::Index)
            .map_err(|_| invalid(format!("{component:?} is not an array index"))),
        _ => Err(mismatch(format!("cannot step into {component:?} of a scalar"))),
    }
}

pub fn get<'a>(doc: &'a Value, components: &[String]) -> OtResult<&'a Value> {
    let mut cur = doc;
    for component in components {
        cur = match resolve_step(cur, component)? {
            Step::Key(k) => cur
                .get(k.as_str())
                .ok_or_else(|| OtError::NotFound(format(components)))?,
            Step::Index(i) => cur.get(i).ok_or(OtError::OutOfBounds)?,
        };
    }
    Ok(cur)
}

/// Returns a copy of `doc` with the value at `components` replaced.
///
/// Object keys may be new; array indices must exist.
pub fn set(doc: &Value, components: &[String], value: Value) -> OtResult<Value> {
    let Some((head, rest)) = components.split_first() else {
        return Ok(value);
    };
    let mut out = doc.clone();
    match (&mut out, resolve_step(doc, head)?) {
        (Value::Object(map), Step::Key(k)) => {
            let child = match map.get(&k) {
                Some(child) => set(child, rest, value)?,
                None if rest.is_empty() => value,
                None => return Err(OtError::NotFound(format(components))),
            };
            map.insert(k, child);
        }
        (Value::Array(items), Step::Index(i)) => {
            let slot = items.get_mut(i).ok_or(OtError::OutOfBounds)?;
            *slot = set(slot, rest, value)?;
        }
        _ => return Err(mismatch("pointer step does not match container")),
    }
    Ok(out)
}
