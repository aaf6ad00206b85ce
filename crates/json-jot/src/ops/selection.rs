//! SELECT helpers.
//!
//! SELECT never touches the document. Its payload is merged into
//! `meta.selections` at the path the operation is applied at.

use std::fmt;

use super::Operation;
use crate::error::OtResult;
use crate::meta::SelectionUpdate;
use crate::sequence::{adjust_selections_against_patch, Patch};

/// `first` then `second`: per session, the later entry wins.
pub(crate) fn compose(first: &SelectionUpdate, second: &SelectionUpdate) -> Operation {
    let mut merged = first.clone();
    merged.extend(second.iter().map(|(id, range)| (id.clone(), *range)));
    Operation::Select(merged)
}

/// The same update, as if it had been made after `patch`.
pub(crate) fn rebase_against_patch(
    update: &SelectionUpdate,
    patch: &Patch,
) -> OtResult<SelectionUpdate> {
    adjust_selections_against_patch(update, patch)
}

pub(crate) fn inspect(f: &mut fmt::Formatter<'_>, update: &SelectionUpdate) -> fmt::Result {
    write!(f, "<SELECT [")?;
    for (i, (id, range)) in update.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match range {
            Some(range) => write!(f, "{id}: {range}")?,
            None => write!(f, "{id}: NULL")?,
        }
    }
    write!(f, "]>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Meta;
    use crate::range::Range;
    use serde_json::json;

    fn r(start: usize, end: usize) -> Option<Range> {
        Some(Range::new(start, end).unwrap())
    }

    #[test]
    fn select_only_writes_meta() {
        let doc = json!("world");
        let op = Operation::select_many(SelectionUpdate::from([
            ("x".to_string(), r(1, 3)),
            ("y".to_string(), None),
        ]));
        let (out, meta) = op.apply(&doc, &Meta::new()).unwrap();
        assert_eq!(out, doc);
        assert_eq!(meta.selections[""].len(), 1);
        assert_eq!(meta.selections[""]["x"], Range::new(1, 3).unwrap());
    }

    #[test]
    fn null_removes_session() {
        let (_, meta) = Operation::select("x", r(0, 1)).apply(&json!(""), &Meta::new()).unwrap();
        let (_, meta) = Operation::select("x", None).apply(&json!(""), &meta).unwrap();
        assert!(meta.is_empty());
    }

    #[test]
    fn later_select_wins_per_session() {
        let a = Operation::select_many(SelectionUpdate::from([
            ("x".to_string(), r(0, 1)),
            ("y".to_string(), r(2, 2)),
        ]));
        let b = Operation::select("x", None);
        assert_eq!(
            a.compose(&b),
            Some(Operation::select_many(SelectionUpdate::from([
                ("x".to_string(), None),
                ("y".to_string(), r(2, 2)),
            ])))
        );
    }

    #[test]
    fn rebased_ranges_follow_patch() {
        let patch = Patch::single(0, 2, json!("abc")).unwrap();
        let update = SelectionUpdate::from([("x".to_string(), r(4, 6)), ("y".to_string(), None)]);
        let moved = rebase_against_patch(&update, &patch).unwrap();
        assert_eq!(moved["x"], r(5, 7));
        assert_eq!(moved["y"], None);
    }
}
