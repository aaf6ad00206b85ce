//! LIST helpers: simplification and inversion.
//!
//! Simplifying a LIST repeats one pass until nothing changes:
//!
//! 1. simplify the children and flatten nested LISTs, dropping NO_OPs;
//! 2. compose each child into its left neighbour where possible;
//! 3. fold every run of SELECT and SPLICE into one SPLICE followed by one
//!    SELECT whose ranges are already expressed after the SPLICE.
//!
//! Step 3 is what turns one edit per keystroke, each followed by a cursor
//! update, back into a single patch and a single selection change.

use serde_json::Value;

use super::Operation;
use crate::error::OtResult;
use crate::meta::SelectionUpdate;
use crate::sequence::{adjust_selections_against_patch, Patch};

/// `first` followed by `second`, simplified.
pub(crate) fn concat(first: &[Operation], second: &[Operation]) -> Operation {
    Operation::List(first.iter().chain(second).cloned().collect()).simplify()
}

pub(crate) fn simplify(ops: &[Operation]) -> Operation {
    let mut current = ops.to_vec();
    let mut passes = 0;
    loop {
        let next = pass(&current);
        passes += 1;
        if next == current {
            break;
        }
        current = next;
    }
    log::trace!("LIST of {} simplified to {} in {passes} passes", ops.len(), current.len());
    match current.len() {
        0 => Operation::NoOp,
        1 => current.remove(0),
        _ => Operation::List(current),
    }
}

fn pass(ops: &[Operation]) -> Vec<Operation> {
    let mut flat = Vec::with_capacity(ops.len());
    for op in ops {
        flatten_into(op.simplify(), &mut flat);
    }
    consolidate(compose_neighbours(flat))
}

fn flatten_into(op: Operation, out: &mut Vec<Operation>) {
    match op {
        Operation::List(children) => {
            for child in children {
                flatten_into(child, out);
            }
        }
        Operation::NoOp => {}
        other => out.push(other),
    }
}

fn compose_neighbours(ops: Vec<Operation>) -> Vec<Operation> {
    let mut out: Vec<Operation> = Vec::with_capacity(ops.len());
    for op in ops {
        let composed = out
            .last()
            .and_then(|last| last.compose(&op))
            .filter(|c| !matches!(c, Operation::List(_)));
        match composed {
            Some(c) => {
                out.pop();
                let c = c.simplify();
                if !c.is_no_op() {
                    out.push(c);
                }
            }
            None => out.push(op),
        }
    }
    out
}

fn consolidate(ops: Vec<Operation>) -> Vec<Operation> {
    let mut out = Vec::with_capacity(ops.len());
    let mut run = Vec::new();
    for op in ops {
        if matches!(op, Operation::Select(_) | Operation::Splice(_)) {
            run.push(op);
        } else {
            flush(&mut run, &mut out);
            out.push(op);
        }
    }
    flush(&mut run, &mut out);
    out
}

fn flush(run: &mut Vec<Operation>, out: &mut Vec<Operation>) {
    let run = std::mem::take(run);
    let mixed = run.iter().any(|op| matches!(op, Operation::Splice(_)))
        && run.iter().any(|op| matches!(op, Operation::Select(_)));
    match fold_run(&run).filter(|_| mixed) {
        Some(folded) => out.extend(folded),
        None => out.extend(run),
    }
}

fn fold_run(run: &[Operation]) -> Option<Vec<Operation>> {
    let mut patch = Patch::default();
    let mut selections = SelectionUpdate::new();
    for op in run {
        match op {
            Operation::Splice(next) => {
                selections = adjust_selections_against_patch(&selections, next).ok()?;
                patch = patch.compose(next).ok()?;
            }
            Operation::Select(update) => {
                selections.extend(update.iter().map(|(id, range)| (id.clone(), *range)));
            }
            _ => return None,
        }
    }
    let mut folded = Vec::with_capacity(2);
    if !patch.is_empty() {
        folded.push(Operation::Splice(patch));
    }
    if !selections.is_empty() {
        folded.push(Operation::Select(selections));
    }
    Some(folded)
}

/// Inverses in reverse order, each computed against the document it saw.
pub(crate) fn invert(ops: &[Operation], doc: &Value) -> OtResult<Operation> {
    let mut doc = doc.clone();
    let mut inverses = Vec::with_capacity(ops.len());
    for op in ops {
        inverses.push(op.invert(&doc)?);
        doc = op.apply_value(&doc)?;
    }
    inverses.reverse();
    Ok(Operation::List(inverses))
}
