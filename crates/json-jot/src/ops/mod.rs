//! The operation tree.
//!
//! [`Operation`] is a closed sum over every variant. The per-family helpers
//! live in the submodules; this module holds the constructors and the
//! generic entry points that dispatch to them.

pub mod copies;
pub mod lists;
pub mod objects;
pub mod selection;
pub mod sequences;
pub mod values;

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

pub use copies::CopyPairs;
pub use values::{MathEdit, MathOp};

use crate::error::{OtError, OtResult};
use crate::meta::{Meta, SelectionUpdate};
use crate::pointer::Step;
use crate::range::Range;
use crate::rebase::{self, RebaseMode};
use crate::sequence::{Hunk, Patch};

/// Variant tag, as written in the `type` field of an encoded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpTag {
    NoOp,
    Set,
    Math,
    Splice,
    AtIndex,
    Map,
    Put,
    Rem,
    Apply,
    Copy,
    Select,
    List,
}

impl OpTag {
    pub const ALL: [OpTag; 12] = [
        OpTag::NoOp,
        OpTag::Set,
        OpTag::Math,
        OpTag::Splice,
        OpTag::AtIndex,
        OpTag::Map,
        OpTag::Put,
        OpTag::Rem,
        OpTag::Apply,
        OpTag::Copy,
        OpTag::Select,
        OpTag::List,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpTag::NoOp => "NO_OP",
            OpTag::Set => "SET",
            OpTag::Math => "MATH",
            OpTag::Splice => "SPLICE",
            OpTag::AtIndex => "ATINDEX",
            OpTag::Map => "MAP",
            OpTag::Put => "PUT",
            OpTag::Rem => "REM",
            OpTag::Apply => "APPLY",
            OpTag::Copy => "COPY",
            OpTag::Select => "SELECT",
            OpTag::List => "LIST",
        }
    }

    pub fn parse(name: &str) -> Option<OpTag> {
        OpTag::ALL.into_iter().find(|tag| tag.as_str() == name)
    }
}

impl fmt::Display for OpTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    NoOp,
    /// Replaces the whole value.
    Set(Value),
    /// In-place scalar transform.
    Math(MathEdit),
    /// Multi-hunk edit of a string or an array.
    Splice(Patch),
    /// Child operations at element indices.
    AtIndex(BTreeMap<usize, Operation>),
    /// One operation applied to every element.
    Map(Box<Operation>),
    Put { key: String, value: Value },
    Rem { key: String },
    /// Child operations at object keys.
    Apply(BTreeMap<String, Operation>),
    /// `(from, to)` JSON Pointer pairs, relative to the current position.
    Copy(CopyPairs),
    /// Cursor ranges merged into Meta at the current path.
    Select(SelectionUpdate),
    /// Children applied left to right.
    List(Vec<Operation>),
}

impl Operation {
    pub fn set(value: Value) -> Self {
        Operation::Set(value)
    }

    pub fn math(op: MathOp, operand: Value) -> OtResult<Self> {
        Ok(Operation::Math(MathEdit::new(op, operand)?))
    }

    pub fn splice(index: usize, removed: usize, inserted: Value) -> OtResult<Self> {
        Ok(Operation::Splice(Patch::single(index, removed, inserted)?))
    }

    pub fn splice_hunks(hunks: Vec<Hunk>) -> OtResult<Self> {
        Ok(Operation::Splice(Patch::new(hunks)?))
    }

    pub fn at_index(index: usize, op: Operation) -> Self {
        Operation::AtIndex(BTreeMap::from([(index, op)]))
    }

    pub fn at_indices(ops: BTreeMap<usize, Operation>) -> Self {
        Operation::AtIndex(ops)
    }

    pub fn map(op: Operation) -> Self {
        Operation::Map(Box::new(op))
    }

    pub fn put(key: impl Into<String>, value: Value) -> Self {
        Operation::Put { key: key.into(), value }
    }

    pub fn rem(key: impl Into<String>) -> Self {
        Operation::Rem { key: key.into() }
    }

    pub fn at_key(key: impl Into<String>, op: Operation) -> Self {
        Operation::Apply(BTreeMap::from([(key.into(), op)]))
    }

    pub fn at_keys(ops: BTreeMap<String, Operation>) -> Self {
        Operation::Apply(ops)
    }

    /// Validates every location as a JSON Pointer.
    pub fn copy(pairs: Vec<(String, String)>) -> OtResult<Self> {
        Ok(Operation::Copy(CopyPairs::new(pairs)?))
    }

    pub fn select(id: impl Into<String>, range: Option<Range>) -> Self {
        Operation::Select(SelectionUpdate::from([(id.into(), range)]))
    }

    pub fn select_many(selections: SelectionUpdate) -> Self {
        Operation::Select(selections)
    }

    pub fn list(ops: Vec<Operation>) -> Self {
        Operation::List(ops)
    }

    pub fn tag(&self) -> OpTag {
        match self {
            Operation::NoOp => OpTag::NoOp,
            Operation::Set(_) => OpTag::Set,
            Operation::Math(_) => OpTag::Math,
            Operation::Splice(_) => OpTag::Splice,
            Operation::AtIndex(_) => OpTag::AtIndex,
            Operation::Map(_) => OpTag::Map,
            Operation::Put { .. } => OpTag::Put,
            Operation::Rem { .. } => OpTag::Rem,
            Operation::Apply(_) => OpTag::Apply,
            Operation::Copy(_) => OpTag::Copy,
            Operation::Select(_) => OpTag::Select,
            Operation::List(_) => OpTag::List,
        }
    }

    pub fn is_no_op(&self) -> bool {
        matches!(self, Operation::NoOp)
    }

    /// Whether applying this operation can change Meta: SELECT writes
    /// selections and SPLICE moves them.
    pub fn affects_meta(&self) -> bool {
        match self {
            Operation::Select(_) | Operation::Splice(_) => true,
            Operation::AtIndex(ops) => ops.values().any(Operation::affects_meta),
            Operation::Apply(ops) => ops.values().any(Operation::affects_meta),
            Operation::Map(op) => op.affects_meta(),
            Operation::List(ops) => ops.iter().any(Operation::affects_meta),
            _ => false,
        }
    }

    /// Applies to `doc`, threading `meta`. Neither input is modified.
    pub fn apply(&self, doc: &Value, meta: &Meta) -> OtResult<(Value, Meta)> {
        let mut meta = meta.clone();
        let doc = self.apply_at(doc, &mut meta, "")?;
        Ok((doc, meta))
    }

    /// Applies to `doc`, discarding Meta effects.
    pub fn apply_value(&self, doc: &Value) -> OtResult<Value> {
        let mut scratch = Meta::new();
        self.apply_at(doc, &mut scratch, "")
    }

    pub(crate) fn apply_at(&self, doc: &Value, meta: &mut Meta, path: &str) -> OtResult<Value> {
        match self {
            Operation::NoOp => Ok(doc.clone()),
            Operation::Set(value) => Ok(value.clone()),
            Operation::Math(edit) => edit.apply(doc),
            Operation::Splice(patch) => sequences::apply_splice(patch, doc, meta, path),
            Operation::AtIndex(ops) => sequences::apply_at_index(ops, doc, meta, path),
            Operation::Map(op) => sequences::apply_map(op, doc, meta, path),
            Operation::Put { key, value } => objects::apply_put(key, value, doc),
            Operation::Rem { key } => objects::apply_rem(key, doc),
            Operation::Apply(ops) => objects::apply_at_keys(ops, doc, meta, path),
            Operation::Copy(pairs) => copies::apply_copy(pairs, doc),
            Operation::Select(update) => {
                meta.merge_selections(path, update);
                Ok(doc.clone())
            }
            Operation::List(ops) => ops
                .iter()
                .try_fold(doc.clone(), |doc, op| op.apply_at(&doc, meta, path)),
        }
    }

    /// One operation equivalent to `self` followed by `other`, if there is
    /// one. `None` means the pair has to stay sequenced.
    ///
    /// A SET followed by an operation that changes Meta (a SPLICE or a
    /// SELECT, possibly nested) is left sequenced rather than folded into
    /// `SET(other(value))`: the folded form would skip the selection moves
    /// and writes `other` makes when applied.
    pub fn compose(&self, other: &Operation) -> Option<Operation> {
        use Operation::*;
        match (self, other) {
            (NoOp, _) => Some(other.clone()),
            (_, NoOp) => Some(self.clone()),
            (Set(value), _) if !other.affects_meta() => other.apply_value(value).ok().map(Set),
            (_, Set(value)) if !self.affects_meta() => Some(Set(value.clone())),
            (Math(a), Math(b)) => values::compose_math(a, b),
            (Splice(_) | AtIndex(_) | Map(_), Splice(_) | AtIndex(_) | Map(_)) => {
                sequences::compose(self, other)
            }
            (Put { .. } | Rem { .. } | Apply(_), Put { .. } | Rem { .. } | Apply(_)) => {
                objects::compose(self, other)
            }
            (Select(a), Select(b)) => Some(selection::compose(a, b)),
            (List(ops), _) => Some(lists::concat(ops, std::slice::from_ref(other))),
            (_, List(ops)) => Some(lists::concat(std::slice::from_ref(self), ops)),
            _ => None,
        }
    }

    /// Rewrites into an equivalent, no more expensive form.
    pub fn simplify(&self) -> Operation {
        match self {
            Operation::Math(edit) if edit.is_identity() => Operation::NoOp,
            Operation::Splice(patch) if patch.is_empty() => Operation::NoOp,
            Operation::AtIndex(ops) => sequences::simplify_at_index(ops),
            Operation::Map(op) => match op.simplify() {
                Operation::NoOp => Operation::NoOp,
                child => Operation::map(child),
            },
            Operation::Apply(ops) => objects::simplify_at_keys(ops),
            Operation::Copy(pairs) if pairs.is_empty() => Operation::NoOp,
            Operation::Select(update) if update.is_empty() => Operation::NoOp,
            Operation::List(ops) => lists::simplify(ops),
            _ => self.clone(),
        }
    }

    /// The operation undoing this one, given the document it applies to.
    pub fn invert(&self, doc: &Value) -> OtResult<Operation> {
        match self {
            Operation::NoOp => Ok(Operation::NoOp),
            Operation::Set(_) => Ok(Operation::Set(doc.clone())),
            Operation::Math(edit) => values::invert_math(edit, doc),
            Operation::Splice(patch) => Ok(Operation::Splice(patch.invert(doc)?)),
            Operation::AtIndex(ops) => sequences::invert_at_index(ops, doc),
            Operation::Map(op) => sequences::invert_map(op, doc),
            Operation::Put { key, .. } => objects::invert_put(key, doc),
            Operation::Rem { key } => objects::invert_rem(key, doc),
            Operation::Apply(ops) => objects::invert_at_keys(ops, doc),
            Operation::Copy(pairs) => copies::invert_copy(pairs, doc),
            Operation::Select(_) => Err(OtError::NotImplemented("SELECT has no inverse".into())),
            Operation::List(ops) => lists::invert(ops, doc),
        }
    }

    /// `self` adjusted to apply after `other`, both derived from the same
    /// document. `None` signals an unresolved conflict.
    pub fn rebase(&self, other: &Operation, mode: RebaseMode<'_>) -> Option<Operation> {
        rebase::rebase_pair(self, other, mode).map(|(this, _)| this)
    }

    /// Both sides at once: `(self after other, other after self)`.
    pub fn rebase_pair(
        &self,
        other: &Operation,
        mode: RebaseMode<'_>,
    ) -> Option<(Operation, Operation)> {
        rebase::rebase_pair(self, other, mode)
    }

    /// The part of this operation affecting the child at `step`.
    pub fn drilldown(&self, step: impl Into<Step>) -> Operation {
        let step = step.into();
        match self {
            Operation::Set(value) => {
                child_value(value, &step).cloned().map_or(Operation::NoOp, Operation::Set)
            }
            Operation::AtIndex(ops) => index_of(&step)
                .and_then(|i| ops.get(&i))
                .cloned()
                .unwrap_or(Operation::NoOp),
            Operation::Map(op) if index_of(&step).is_some() => (**op).clone(),
            Operation::Put { key, value } if step.matches(key) => Operation::Set(value.clone()),
            Operation::Apply(ops) => ops
                .iter()
                .find(|(key, _)| step.matches(key))
                .map_or(Operation::NoOp, |(_, op)| op.clone()),
            Operation::Copy(pairs) => copies::drilldown(pairs, &step),
            Operation::List(ops) => {
                let parts = ops.iter().map(|op| op.drilldown(step.clone())).collect();
                Operation::List(parts).simplify()
            }
            _ => Operation::NoOp,
        }
    }
}

fn index_of(step: &Step) -> Option<usize> {
    match step {
        Step::Index(i) => Some(*i),
        Step::Key(k) => k.parse().ok(),
    }
}

pub(crate) fn child_value<'a>(value: &'a Value, step: &Step) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(&step.component()),
        Value::Array(items) => index_of(step).and_then(|i| items.get(i)),
        _ => None,
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::NoOp => write!(f, "<NO_OP>"),
            Operation::Set(value) => write!(f, "<SET {value}>"),
            Operation::Math(edit) => write!(f, "<MATH {}:{}>", edit.op().name(), edit.operand()),
            Operation::Splice(patch) => {
                write!(f, "<SPLICE ")?;
                for (i, hunk) in patch.hunks().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}x{} {}", hunk.index, hunk.removed, hunk.inserted)?;
                }
                write!(f, ">")
            }
            Operation::AtIndex(ops) => {
                write!(f, "<ATINDEX ")?;
                write_entries(f, ops.iter().map(|(i, op)| (i.to_string(), op)))?;
                write!(f, ">")
            }
            Operation::Map(op) => write!(f, "<MAP {op}>"),
            Operation::Put { key, value } => write!(f, "<PUT {key:?} {value}>"),
            Operation::Rem { key } => write!(f, "<REM {key:?}>"),
            Operation::Apply(ops) => {
                write!(f, "<APPLY ")?;
                write_entries(f, ops.iter().map(|(k, op)| (format!("{k:?}"), op)))?;
                write!(f, ">")
            }
            Operation::Copy(pairs) => {
                write!(f, "<COPY ")?;
                for (i, (from, to)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{from} => {to}")?;
                }
                write!(f, ">")
            }
            Operation::Select(update) => selection::inspect(f, update),
            Operation::List(ops) => {
                write!(f, "<LIST [")?;
                for (i, op) in ops.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{op}")?;
                }
                write!(f, "]>")
            }
        }
    }
}

fn write_entries<'a>(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = (String, &'a Operation)>,
) -> fmt::Result {
    for (i, (label, op)) in entries.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{label}: {op}")?;
    }
    Ok(())
}
