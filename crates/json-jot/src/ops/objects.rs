//! PUT, REM and APPLY helpers.
//!
//! The three object variants are handled uniformly as per-key edits so that
//! compose and rebase can pair them up key by key.

use std::collections::BTreeMap;

use serde_json::Value;

use super::Operation;
use crate::error::{mismatch, OtError, OtResult};
use crate::meta::Meta;
use crate::pointer::{self, Step};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum KeyEdit {
    Put(Value),
    Rem,
    Apply(Operation),
}

/// Splits a PUT, REM or APPLY into its per-key edits.
pub(crate) fn key_edits(op: &Operation) -> Option<BTreeMap<String, KeyEdit>> {
    match op {
        Operation::Put { key, value } => {
            Some(BTreeMap::from([(key.clone(), KeyEdit::Put(value.clone()))]))
        }
        Operation::Rem { key } => Some(BTreeMap::from([(key.clone(), KeyEdit::Rem)])),
        Operation::Apply(ops) => Some(
            ops.iter()
                .map(|(key, op)| (key.clone(), KeyEdit::Apply(op.clone())))
                .collect(),
        ),
        _ => None,
    }
}

/// Reassembles per-key edits. Mixed edits become a LIST over distinct keys.
pub(crate) fn from_key_edits(edits: BTreeMap<String, KeyEdit>) -> Operation {
    let mut applies = BTreeMap::new();
    let mut ops = Vec::new();
    for (key, edit) in edits {
        match edit {
            KeyEdit::Apply(op) if op.is_no_op() => {}
            KeyEdit::Apply(op) => {
                applies.insert(key, op);
            }
            KeyEdit::Put(value) => ops.push(Operation::Put { key, value }),
            KeyEdit::Rem => ops.push(Operation::Rem { key }),
        }
    }
    if !applies.is_empty() {
        ops.insert(0, Operation::Apply(applies));
    }
    match ops.len() {
        0 => Operation::NoOp,
        1 => ops.remove(0),
        _ => Operation::List(ops),
    }
}

fn object(doc: &Value) -> OtResult<&serde_json::Map<String, Value>> {
    doc.as_object().ok_or_else(|| mismatch("object operations need an object"))
}

pub(crate) fn apply_put(key: &str, value: &Value, doc: &Value) -> OtResult<Value> {
    let mut out = object(doc)?.clone();
    out.insert(key.to_string(), value.clone());
    Ok(Value::Object(out))
}

pub(crate) fn apply_rem(key: &str, doc: &Value) -> OtResult<Value> {
    let mut out = object(doc)?.clone();
    out.shift_remove(key).ok_or_else(|| OtError::NotFound(key.to_string()))?;
    Ok(Value::Object(out))
}

pub(crate) fn apply_at_keys(
    ops: &BTreeMap<String, Operation>,
    doc: &Value,
    meta: &mut Meta,
    path: &str,
) -> OtResult<Value> {
    let map = object(doc)?;
    let mut out = map.clone();
    for (key, op) in ops {
        let child_path = pointer::join(path, &Step::Key(key.clone()));
        match (map.get(key), op) {
            (Some(child), _) => {
                let value = op.apply_at(child, meta, &child_path)?;
                out.insert(key.clone(), value);
            }
            (None, Operation::Set(value)) => {
                out.insert(key.clone(), value.clone());
            }
            (None, Operation::NoOp | Operation::Select(_)) => {
                op.apply_at(&Value::Null, meta, &child_path)?;
            }
            (None, _) => return Err(OtError::NotFound(key.clone())),
        }
    }
    Ok(Value::Object(out))
}

pub(crate) fn compose(first: &Operation, second: &Operation) -> Option<Operation> {
    let mut edits = key_edits(first)?;
    for (key, next) in key_edits(second)? {
        let merged = match (edits.remove(&key), next) {
            (None, next) => next,
            (Some(KeyEdit::Put(value)), KeyEdit::Apply(op)) if !op.affects_meta() => {
                KeyEdit::Put(op.apply_value(&value).ok()?)
            }
            (Some(KeyEdit::Apply(x)), KeyEdit::Apply(y)) => KeyEdit::Apply(match x.compose(&y) {
                Some(c) => c,
                None => Operation::List(vec![x, y]).simplify(),
            }),
            (Some(KeyEdit::Put(_)), next @ (KeyEdit::Put(_) | KeyEdit::Rem)) => next,
            (Some(KeyEdit::Rem), next @ KeyEdit::Put(_)) => next,
            (Some(KeyEdit::Apply(x)), next @ (KeyEdit::Put(_) | KeyEdit::Rem))
                if !x.affects_meta() =>
            {
                next
            }
            _ => return None,
        };
        edits.insert(key, merged);
    }
    match from_key_edits(edits) {
        Operation::List(_) => None,
        composed => Some(composed),
    }
}

pub(crate) fn simplify_at_keys(ops: &BTreeMap<String, Operation>) -> Operation {
    let kept: BTreeMap<String, Operation> = ops
        .iter()
        .map(|(key, op)| (key.clone(), op.simplify()))
        .filter(|(_, op)| !op.is_no_op())
        .collect();
    if kept.is_empty() {
        Operation::NoOp
    } else {
        Operation::Apply(kept)
    }
}

pub(crate) fn invert_put(key: &str, doc: &Value) -> OtResult<Operation> {
    Ok(match object(doc)?.get(key) {
        Some(old) => Operation::put(key, old.clone()),
        None => Operation::rem(key),
    })
}

pub(crate) fn invert_rem(key: &str, doc: &Value) -> OtResult<Operation> {
    match object(doc)?.get(key) {
        Some(old) => Ok(Operation::put(key, old.clone())),
        None => Err(OtError::NotFound(key.to_string())),
    }
}

pub(crate) fn invert_at_keys(
    ops: &BTreeMap<String, Operation>,
    doc: &Value,
) -> OtResult<Operation> {
    let map = object(doc)?;
    let mut edits = BTreeMap::new();
    for (key, op) in ops {
        let edit = match (map.get(key), op) {
            (Some(child), _) => KeyEdit::Apply(op.invert(child)?),
            // The key was created by a SET.
            (None, Operation::Set(_)) => KeyEdit::Rem,
            (None, _) => KeyEdit::Apply(Operation::NoOp),
        };
        edits.insert(key.clone(), edit);
    }
    Ok(from_key_edits(edits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::MathOp;
    use serde_json::json;

    #[test]
    fn put_rem_apply_on_objects() {
        let doc = json!({"a": 1, "b": 2});
        assert_eq!(
            Operation::put("c", json!(3)).apply_value(&doc).unwrap(),
            json!({"a": 1, "b": 2, "c": 3})
        );
        assert_eq!(Operation::rem("a").apply_value(&doc).unwrap(), json!({"b": 2}));
        assert_eq!(Operation::rem("z").apply_value(&doc), Err(OtError::NotFound("z".into())));
        assert!(matches!(
            Operation::put("a", json!(1)).apply_value(&json!([])),
            Err(OtError::TypeMismatch(_))
        ));
        let op = Operation::at_key("b", Operation::math(MathOp::Mult, json!(10)).unwrap());
        assert_eq!(op.apply_value(&doc).unwrap(), json!({"a": 1, "b": 20}));
    }

    #[test]
    fn rem_keeps_key_order() {
        let doc: Value = serde_json::from_str(r#"{"z": 1, "y": 2, "x": 3}"#).unwrap();
        let out = Operation::rem("z").apply_value(&doc).unwrap();
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["y", "x"]);
    }

    #[test]
    fn set_under_missing_key_creates_it() {
        let op = Operation::at_key("new", Operation::set(json!([])));
        assert_eq!(op.apply_value(&json!({})).unwrap(), json!({"new": []}));
        assert_eq!(op.invert(&json!({})).unwrap(), Operation::rem("new"));
        let op = Operation::at_key("new", Operation::math(MathOp::Add, json!(1)).unwrap());
        assert_eq!(op.apply_value(&json!({})), Err(OtError::NotFound("new".into())));
    }

    #[test]
    fn key_edit_composition() {
        let put = Operation::put("k", json!(1));
        let rem = Operation::rem("k");
        let bump = Operation::at_key("k", Operation::math(MathOp::Add, json!(1)).unwrap());
        assert_eq!(put.compose(&rem), Some(rem.clone()));
        assert_eq!(rem.compose(&put), Some(put.clone()));
        assert_eq!(put.compose(&bump), Some(Operation::put("k", json!(2))));
        assert_eq!(bump.compose(&rem), Some(rem.clone()));
        assert_eq!(rem.compose(&rem), None);
        assert_eq!(put.compose(&Operation::put("j", json!(0))), None, "two keys need a LIST");
    }

    #[test]
    fn apply_composes_per_key() {
        let a = Operation::at_key("x", Operation::math(MathOp::Add, json!(1)).unwrap());
        let b = Operation::at_keys(BTreeMap::from([
            ("x".to_string(), Operation::math(MathOp::Add, json!(2)).unwrap()),
            ("y".to_string(), Operation::set(json!(0))),
        ]));
        let expected = Operation::at_keys(BTreeMap::from([
            ("x".to_string(), Operation::math(MathOp::Add, json!(3)).unwrap()),
            ("y".to_string(), Operation::set(json!(0))),
        ]));
        assert_eq!(a.compose(&b), Some(expected));
    }

    #[test]
    fn mixed_edits_reassemble_into_list() {
        let edits = BTreeMap::from([
            ("a".to_string(), KeyEdit::Rem),
            ("b".to_string(), KeyEdit::Apply(Operation::set(json!(1)))),
        ]);
        assert_eq!(
            from_key_edits(edits),
            Operation::list(vec![
                Operation::at_key("b", Operation::set(json!(1))),
                Operation::rem("a"),
            ])
        );
    }
}
