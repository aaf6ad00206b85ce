#![allow(dead_code)]

use json_jot::{Meta, Operation, Range, RebaseMode};
use serde_json::{json, Value};

pub fn r(start: usize, end: usize) -> Range {
    Range::new(start, end).expect("valid range")
}

pub fn splice(index: usize, removed: usize, inserted: &str) -> Operation {
    Operation::splice(index, removed, json!(inserted)).expect("valid splice")
}

pub fn select(entries: &[(&str, Option<Range>)]) -> Operation {
    Operation::select_many(entries.iter().map(|(id, range)| (id.to_string(), *range)).collect())
}

/// Rebases both ways, checks that the result does not depend on argument
/// order, applies both sides and returns the converged document and Meta.
pub fn converge(a: &Operation, b: &Operation, doc: &Value, mode: RebaseMode<'_>) -> (Value, Meta) {
    converge_from(a, b, doc, &Meta::new(), mode)
}

/// [`converge`], starting from existing Meta.
pub fn converge_from(
    a: &Operation,
    b: &Operation,
    doc: &Value,
    meta: &Meta,
    mode: RebaseMode<'_>,
) -> (Value, Meta) {
    let (a2, b2) = a.rebase_pair(b, mode).expect("rebase succeeds");
    let (b3, a3) = b.rebase_pair(a, mode).expect("mirrored rebase succeeds");
    assert_eq!(a2, a3);
    assert_eq!(b2, b3);

    let (after_a, meta_a) = a.apply(doc, meta).expect("a applies");
    let left = b2.apply(&after_a, &meta_a).expect("b' applies after a");
    let (after_b, meta_b) = b.apply(doc, meta).expect("b applies");
    let right = a2.apply(&after_b, &meta_b).expect("a' applies after b");
    assert_eq!(left, right, "replicas diverged");
    left
}
