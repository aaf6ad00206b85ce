//! Canonical, deterministic encoding of JSON values.
//!
//! Object keys are emitted in sorted order so that two structurally equal
//! values always encode to the same string regardless of insertion order.
//! Conflictless rebasing compares these encodings to break ties, which
//! makes the outcome independent of which replica performs the rebase.

use std::cmp::Ordering;

use serde_json::Value;

/// Serializes `val` with object keys sorted.
pub fn stringify(val: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, val);
    out
}

fn write_value(out: &mut String, val: &Value) {
    match val {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            out.push_str(&val.to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(obj) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_value(out, &obj[key.as_str()]);
            }
            out.push('}');
        }
    }
}

/// Total order over JSON values via their canonical encodings.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    stringify(a).cmp(&stringify(b))
}
