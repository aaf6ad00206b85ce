//! Rebase driver.
//!
//! For two operations `a` and `b` derived from the same document,
//! [`rebase_pair`] produces `(a', b')` such that `a` then `b'` and `b` then
//! `a'` leave the same document and the same Meta.
//!
//! Resolution order:
//!
//! 1. a NO_OP on either side passes both through;
//! 2. a handler registered for the tag pair;
//! 3. the mirrored handler, with operands and results swapped;
//! 4. LIST on either side is rebased element by element;
//! 5. operations touching disjoint children commute;
//! 6. what is still unresolved is a conflict: `None` when strict, otherwise
//!    settled by `settle`, which always produces a pair.

pub mod registry;

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde_json::Value;

use crate::codec;
use crate::ops::{child_value, copies, Operation};
use crate::pointer::Step;
use crate::stable;

/// How rebase treats conflicting edits.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RebaseMode<'a> {
    /// Conflicts yield `None`.
    #[default]
    Strict,
    /// Conflicts are broken deterministically.
    Conflictless,
    /// Conflictless, with the shared base document at the current position
    /// available to value-aware resolution.
    Document(&'a Value),
}

impl<'a> RebaseMode<'a> {
    pub fn is_conflictless(&self) -> bool {
        !matches!(self, RebaseMode::Strict)
    }

    pub fn document(&self) -> Option<&'a Value> {
        match *self {
            RebaseMode::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Mode for the child at `step`. The document narrows with it, or is
    /// dropped when the child is missing.
    pub fn at(&self, step: &Step) -> RebaseMode<'a> {
        match *self {
            RebaseMode::Document(doc) => {
                child_value(doc, step).map_or(RebaseMode::Conflictless, RebaseMode::Document)
            }
            mode => mode,
        }
    }

    /// Mode for an operation applied to every element, where no single
    /// document applies.
    pub fn elementwise(&self) -> RebaseMode<'a> {
        match *self {
            RebaseMode::Document(_) => RebaseMode::Conflictless,
            mode => mode,
        }
    }
}

pub fn rebase_pair(
    a: &Operation,
    b: &Operation,
    mode: RebaseMode<'_>,
) -> Option<(Operation, Operation)> {
    if a.is_no_op() || b.is_no_op() {
        return Some((a.clone(), b.clone()));
    }
    match resolve(a, b, mode) {
        Some(pair) => Some(pair),
        None => settle(a, b, mode),
    }
}

fn resolve(a: &Operation, b: &Operation, mode: RebaseMode<'_>) -> Option<(Operation, Operation)> {
    let (ta, tb) = (a.tag(), b.tag());
    if let Some(handler) = registry::lookup(ta, tb) {
        log::trace!("rebase {ta} against {tb}");
        return handler(a, b, mode);
    }
    if let Some(handler) = registry::lookup(tb, ta) {
        log::trace!("rebase {ta} against {tb} (mirrored)");
        return handler(b, a, mode).map(|(b2, a2)| (a2, b2));
    }
    if let Operation::List(ops) = a {
        return rebase_list(ops, b, mode);
    }
    if let Operation::List(ops) = b {
        return rebase_list(ops, a, mode).map(|(b2, a2)| (a2, b2));
    }
    disjoint(a, b).then(|| (a.clone(), b.clone()))
}

/// Last resort for a conflicting pair.
///
/// Strict mode gives up. Otherwise a SET overrides the other side, and the
/// remaining pairs are ordered by their canonical encoding, the greater one
/// applying last. With a document both sides become a SET of that
/// sequential result. Without one the greater side survives and the other
/// is dropped.
fn settle(a: &Operation, b: &Operation, mode: RebaseMode<'_>) -> Option<(Operation, Operation)> {
    let (ta, tb) = (a.tag(), b.tag());
    if !mode.is_conflictless() {
        log::debug!("unresolved conflict between {ta} and {tb}");
        return None;
    }
    match (a, b) {
        (Operation::Set(_), Operation::Set(_)) => {}
        (Operation::Set(_), _) => {
            log::debug!("{ta} conflicts with {tb}; SET wins");
            return Some((a.clone(), Operation::NoOp));
        }
        (_, Operation::Set(_)) => {
            log::debug!("{ta} conflicts with {tb}; SET wins");
            return Some((Operation::NoOp, b.clone()));
        }
        _ => {}
    }
    let a_last = match stable::compare(&codec::encode(a), &codec::encode(b)) {
        Ordering::Equal => return Some((Operation::NoOp, Operation::NoOp)),
        order => order == Ordering::Greater,
    };
    if let Some(doc) = mode.document() {
        let (first, second) = if a_last { (b, a) } else { (a, b) };
        if let Ok(value) = first.apply_value(doc).and_then(|mid| second.apply_value(&mid)) {
            log::debug!("{ta} conflicts with {tb}; both settle on {value}");
            return Some((Operation::Set(value.clone()), Operation::Set(value)));
        }
    }
    log::debug!("{ta} conflicts with {tb}; keeping {}", if a_last { ta } else { tb });
    Some(if a_last {
        (a.clone(), Operation::NoOp)
    } else {
        (Operation::NoOp, b.clone())
    })
}

/// Rebases each element of a LIST in turn, carrying `other` forward. The
/// document, when present, is advanced through the list as well.
fn rebase_list(
    ops: &[Operation],
    other: &Operation,
    mode: RebaseMode<'_>,
) -> Option<(Operation, Operation)> {
    let mut other = other.clone();
    let mut doc = mode.document().cloned();
    let mut rebased = Vec::with_capacity(ops.len());
    for op in ops {
        let step_mode = match &doc {
            Some(doc) => RebaseMode::Document(doc),
            None => mode.elementwise(),
        };
        let (op2, other2) = rebase_pair(op, &other, step_mode)?;
        doc = doc.and_then(|d| op.apply_value(&d).ok());
        rebased.push(op2);
        other = other2;
    }
    Some((Operation::List(rebased).simplify(), other))
}

/// Which children of the current value an operation may change.
enum Footprint {
    Nothing,
    Whole,
    Children(BTreeSet<String>),
}

fn footprint(op: &Operation) -> Footprint {
    match op {
        Operation::NoOp | Operation::Select(_) => Footprint::Nothing,
        Operation::AtIndex(ops) => Footprint::Children(ops.keys().map(usize::to_string).collect()),
        Operation::Apply(ops) => Footprint::Children(ops.keys().cloned().collect()),
        Operation::Put { key, .. } | Operation::Rem { key } => {
            Footprint::Children(BTreeSet::from([key.clone()]))
        }
        Operation::Copy(pairs) => match copies::top_components(pairs) {
            Some(components) => Footprint::Children(components.into_iter().collect()),
            None => Footprint::Whole,
        },
        Operation::List(ops) => {
            let mut all = BTreeSet::new();
            for op in ops {
                match footprint(op) {
                    Footprint::Nothing => {}
                    Footprint::Whole => return Footprint::Whole,
                    Footprint::Children(children) => all.extend(children),
                }
            }
            Footprint::Children(all)
        }
        Operation::Set(_) | Operation::Math(_) | Operation::Splice(_) | Operation::Map(_) => {
            Footprint::Whole
        }
    }
}

/// Whether `op` replaces, removes, or copies across the child at `key`.
fn replaces(op: &Operation, key: &str) -> bool {
    match op {
        Operation::Put { key: k, .. } | Operation::Rem { key: k } => k == key,
        Operation::Copy(pairs) => copies::crosses(pairs, key),
        Operation::List(ops) => ops.iter().any(|op| replaces(op, key)),
        _ => false,
    }
}

/// Whether the two operations change disjoint parts of the document.
/// Children both sides touch are compared again one level down.
pub(crate) fn disjoint(a: &Operation, b: &Operation) -> bool {
    match (footprint(a), footprint(b)) {
        (Footprint::Nothing, _) | (_, Footprint::Nothing) => true,
        (Footprint::Children(x), Footprint::Children(y)) => x.intersection(&y).all(|key| {
            !replaces(a, key)
                && !replaces(b, key)
                && disjoint(&a.drilldown(key.as_str()), &b.drilldown(key.as_str()))
        }),
        _ => false,
    }
}
