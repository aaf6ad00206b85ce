//! COPY helpers.

use std::ops::Deref;

use serde_json::Value;

use super::Operation;
use crate::error::{OtError, OtResult};
use crate::pointer::{self, Step};

/// `(from, to)` pairs whose locations all parse as JSON Pointers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CopyPairs(Vec<(String, String)>);

impl CopyPairs {
    pub fn new(pairs: Vec<(String, String)>) -> OtResult<Self> {
        for (from, to) in &pairs {
            pointer::parse(from)?;
            pointer::parse(to)?;
        }
        Ok(CopyPairs(pairs))
    }
}

impl Deref for CopyPairs {
    type Target = [(String, String)];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub(crate) fn apply_copy(pairs: &[(String, String)], doc: &Value) -> OtResult<Value> {
    pairs.iter().try_fold(doc.clone(), |doc, (from, to)| {
        let value = pointer::get(&doc, &pointer::parse(from)?)?.clone();
        pointer::set(&doc, &pointer::parse(to)?, value)
    })
}

/// Restores every target in reverse order.
pub(crate) fn invert_copy(pairs: &[(String, String)], doc: &Value) -> OtResult<Operation> {
    let mut current = doc.clone();
    let mut restores = Vec::with_capacity(pairs.len());
    for (from, to) in pairs {
        let target = pointer::parse(to)?;
        restores.push(restore(&current, &target)?);
        let value = pointer::get(&current, &pointer::parse(from)?)?.clone();
        current = pointer::set(&current, &target, value)?;
    }
    restores.reverse();
    Ok(Operation::List(restores).simplify())
}

/// An operation putting back what `doc` holds at `components`.
fn restore(doc: &Value, components: &[String]) -> OtResult<Operation> {
    let Some((head, rest)) = components.split_first() else {
        return Ok(Operation::Set(doc.clone()));
    };
    match pointer::resolve_step(doc, head)? {
        Step::Key(key) => match doc.get(&key) {
            Some(child) => Ok(Operation::at_key(key, restore(child, rest)?)),
            None => Ok(Operation::rem(key)),
        },
        Step::Index(i) => {
            let child = doc.get(i).ok_or(OtError::OutOfBounds)?;
            Ok(Operation::at_index(i, restore(child, rest)?))
        }
    }
}

/// Pairs lying entirely under `step`, made relative to it.
pub(crate) fn drilldown(pairs: &[(String, String)], step: &Step) -> Operation {
    let under = |ptr: &str| -> Option<String> {
        let components = pointer::parse(ptr).ok()?;
        let (head, rest) = components.split_first()?;
        step.matches(head).then(|| pointer::format(rest))
    };
    let relative: Vec<(String, String)> = pairs
        .iter()
        .filter_map(|(from, to)| Some((under(from)?, under(to)?)))
        .collect();
    if relative.is_empty() {
        Operation::NoOp
    } else {
        Operation::Copy(CopyPairs(relative))
    }
}

/// First components of every location; `None` when a pair touches the root.
pub(crate) fn top_components(pairs: &[(String, String)]) -> Option<Vec<String>> {
    pairs
        .iter()
        .flat_map(|(from, to)| [from, to])
        .map(|ptr| pointer::parse(ptr).ok()?.into_iter().next())
        .collect()
}

/// Whether some pair moves data across the boundary of the child `key`,
/// or replaces that child as a whole.
pub(crate) fn crosses(pairs: &[(String, String)], key: &str) -> bool {
    let head = |ptr: &str| pointer::parse(ptr).ok().map(|c| (c.first().cloned(), c.len()));
    pairs.iter().any(|(from, to)| match (head(from), head(to)) {
        (Some((f, f_len)), Some((t, t_len))) => {
            let (f_in, t_in) = (f.as_deref() == Some(key), t.as_deref() == Some(key));
            f_in != t_in || (f_in && (f_len == 1 || t_len == 1))
        }
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn copy(pairs: &[(&str, &str)]) -> Operation {
        let pairs = pairs.iter().map(|(f, t)| (f.to_string(), t.to_string())).collect();
        Operation::copy(pairs).unwrap()
    }

    #[test]
    fn copies_values() {
        let doc = json!({"a": {"x": 1}, "b": [0, 0]});
        let op = copy(&[("/a/x", "/b/1"), ("/b", "/c")]);
        assert_eq!(op.apply_value(&doc).unwrap(), json!({"a": {"x": 1}, "b": [0, 1], "c": [0, 1]}));
    }

    #[test]
    fn missing_source_fails() {
        let op = copy(&[("/nope", "/a")]);
        assert!(matches!(op.apply_value(&json!({})), Err(OtError::NotFound(_))));
        assert!(Operation::copy(vec![("nope".into(), "/a".into())]).is_err());
    }

    #[test]
    fn pairs_are_checked_on_construction() {
        assert!(CopyPairs::new(vec![("/a".into(), "b".into())]).is_err());
        assert!(CopyPairs::new(vec![("/a~9".into(), "/b".into())]).is_err());
        let pairs = CopyPairs::new(vec![("/a".into(), "/b".into())]).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0], ("/a".to_string(), "/b".to_string()));
    }

    #[test]
    fn inverse_restores_targets() {
        let doc = json!({"a": "x", "b": {"c": [1, 2]}});
        let op = copy(&[("/a", "/b/c/0"), ("/b", "/d"), ("/a", "/a")]);
        let after = op.apply_value(&doc).unwrap();
        assert_eq!(op.invert(&doc).unwrap().apply_value(&after).unwrap(), doc);
    }

    #[test]
    fn drilldown_relativizes() {
        let op = copy(&[("/a/x", "/a/y"), ("/a/x", "/b")]);
        assert_eq!(op.drilldown("a"), copy(&[("/x", "/y")]));
        assert_eq!(op.drilldown("b"), Operation::NoOp);
        assert_eq!(top_components(&[("".into(), "/a".into())]), None);
    }

    #[test]
    fn crossing_pairs() {
        let inside = [("/a/x".to_string(), "/a/y".to_string())];
        assert!(!crosses(&inside, "a"));
        assert!(!crosses(&inside, "b"));
        assert!(crosses(&[("/a/x".into(), "/b".into())], "a"));
        assert!(crosses(&[("/b".into(), "/a".into())], "a"));
    }
}
