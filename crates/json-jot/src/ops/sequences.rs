//! SPLICE, ATINDEX and MAP helpers.

use std::collections::BTreeMap;

use serde_json::Value;

use super::Operation;
use crate::error::{OtError, OtResult};
use crate::meta::Meta;
use crate::pointer::{self, Step};
use crate::sequence::hunk::Origin;
use crate::sequence::{adjust_selections_against_patch, elements, from_elements, Patch};

/// SPLICE of `patch`, or NO_OP when the patch is empty.
pub(crate) fn splice_or_noop(patch: Patch) -> Operation {
    if patch.is_empty() {
        Operation::NoOp
    } else {
        Operation::Splice(patch)
    }
}

pub(crate) fn apply_splice(
    patch: &Patch,
    doc: &Value,
    meta: &mut Meta,
    path: &str,
) -> OtResult<Value> {
    let out = patch.apply(doc)?;
    if let Some(ranges) = meta.selections_at(path) {
        let moved = adjust_selections_against_patch(ranges, patch)?;
        meta.replace_selections(path, moved);
    }
    Ok(out)
}

pub(crate) fn apply_at_index(
    ops: &BTreeMap<usize, Operation>,
    doc: &Value,
    meta: &mut Meta,
    path: &str,
) -> OtResult<Value> {
    let mut items = elements(doc)?;
    for (&i, op) in ops {
        let slot = items.get_mut(i).ok_or(OtError::OutOfBounds)?;
        *slot = op.apply_at(slot, meta, &pointer::join(path, &Step::Index(i)))?;
    }
    from_elements(doc, items)
}

pub(crate) fn apply_map(
    op: &Operation,
    doc: &Value,
    meta: &mut Meta,
    path: &str,
) -> OtResult<Value> {
    let items = elements(doc)?
        .iter()
        .enumerate()
        .map(|(i, item)| op.apply_at(item, meta, &pointer::join(path, &Step::Index(i))))
        .collect::<OtResult<Vec<_>>>()?;
    from_elements(doc, items)
}

pub(crate) fn compose(first: &Operation, second: &Operation) -> Option<Operation> {
    match (first, second) {
        (Operation::Splice(p), Operation::Splice(q)) => p.compose(q).ok().map(splice_or_noop),
        (Operation::Splice(p), Operation::AtIndex(ops)) if !second.affects_meta() => {
            edit_inserted(p, ops).map(Operation::Splice)
        }
        // Every edited element is then removed.
        (Operation::AtIndex(ops), Operation::Splice(p))
            if !first.affects_meta() && ops.keys().all(|&i| p.map_index(i).is_none()) =>
        {
            Some(second.clone())
        }
        (Operation::AtIndex(x), Operation::AtIndex(y)) => {
            let mut out = x.clone();
            for (&i, op) in y {
                let merged = match out.remove(&i) {
                    Some(prev) => match prev.compose(op) {
                        Some(c) => c,
                        None => Operation::List(vec![prev, op.clone()]),
                    },
                    None => op.clone(),
                };
                out.insert(i, merged);
            }
            Some(Operation::AtIndex(out).simplify())
        }
        (Operation::Map(x), Operation::Map(y)) => x.compose(y).map(Operation::map),
        _ => None,
    }
}

/// Folds ATINDEX children into the content `patch` inserts. Fails unless
/// every index lands in inserted content.
fn edit_inserted(patch: &Patch, ops: &BTreeMap<usize, Operation>) -> Option<Patch> {
    let mut per_hunk: BTreeMap<usize, Vec<(usize, &Operation)>> = BTreeMap::new();
    for (&i, op) in ops {
        match patch.origin(i) {
            Origin::Inserted { hunk, offset } => {
                per_hunk.entry(hunk).or_default().push((offset, op))
            }
            Origin::Original(_) => return None,
        }
    }
    patch
        .map_inserted(|hunk, inserted| {
            let Some(edits) = per_hunk.get(&hunk) else {
                return Ok(inserted.clone());
            };
            let mut items = elements(inserted)?;
            for &(offset, op) in edits {
                let slot = items.get_mut(offset).ok_or(OtError::OutOfBounds)?;
                *slot = op.apply_value(slot)?;
            }
            from_elements(inserted, items)
        })
        .ok()
}

/// Runs `op` over every element `patch` inserts.
pub(crate) fn map_inserted_elements(patch: &Patch, op: &Operation) -> OtResult<Patch> {
    patch.map_inserted(|_, inserted| {
        let items = elements(inserted)?
            .iter()
            .map(|item| op.apply_value(item))
            .collect::<OtResult<Vec<_>>>()?;
        from_elements(inserted, items)
    })
}

pub(crate) fn simplify_at_index(ops: &BTreeMap<usize, Operation>) -> Operation {
    let kept: BTreeMap<usize, Operation> = ops
        .iter()
        .map(|(&i, op)| (i, op.simplify()))
        .filter(|(_, op)| !op.is_no_op())
        .collect();
    if kept.is_empty() {
        Operation::NoOp
    } else {
        Operation::AtIndex(kept)
    }
}

pub(crate) fn invert_at_index(
    ops: &BTreeMap<usize, Operation>,
    doc: &Value,
) -> OtResult<Operation> {
    let items = elements(doc)?;
    let inverted = ops
        .iter()
        .map(|(&i, op)| {
            let item = items.get(i).ok_or(OtError::OutOfBounds)?;
            Ok((i, op.invert(item)?))
        })
        .collect::<OtResult<BTreeMap<_, _>>>()?;
    Ok(Operation::AtIndex(inverted))
}

pub(crate) fn invert_map(op: &Operation, doc: &Value) -> OtResult<Operation> {
    let inverted = elements(doc)?
        .iter()
        .enumerate()
        .map(|(i, item)| Ok((i, op.invert(item)?)))
        .collect::<OtResult<BTreeMap<_, _>>>()?;
    Ok(Operation::AtIndex(inverted))
}
