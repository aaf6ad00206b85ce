//! Pairwise rebase handlers, keyed by `(this, other)` tags.
//!
//! A handler receives `this`, `other` and the mode and returns
//! `(this', other')`. Only one orientation of each pair is registered; the
//! driver looks up the mirror and swaps operands and results.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use super::{disjoint, rebase_pair, RebaseMode};
use crate::codec;
use crate::ops::objects::{from_key_edits, key_edits, KeyEdit};
use crate::ops::{selection, sequences, values, OpTag, Operation};
use crate::pointer::Step;
use crate::sequence::rebase_patches;
use crate::stable;

/// `(this', other')`, or `None` when the pair conflicts.
pub type Rebased = Option<(Operation, Operation)>;

pub type Handler = fn(&Operation, &Operation, RebaseMode<'_>) -> Rebased;

type Table = HashMap<(OpTag, OpTag), Handler>;

fn table() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(|| {
        use OpTag::*;
        let entries: [((OpTag, OpTag), Handler); 17] = [
            ((Set, Set), set_set),
            ((Math, Math), math_math),
            ((Splice, Splice), splice_splice),
            ((Splice, AtIndex), splice_at_index),
            ((Splice, Map), splice_map),
            ((AtIndex, AtIndex), at_index_at_index),
            ((AtIndex, Map), at_index_map),
            ((Map, Map), map_map),
            ((Put, Put), keyed),
            ((Put, Rem), keyed),
            ((Put, Apply), keyed),
            ((Rem, Rem), keyed),
            ((Rem, Apply), keyed),
            ((Apply, Apply), keyed),
            ((Select, Select), select_select),
            ((Select, Splice), select_splice),
            ((Copy, Copy), copy_copy),
        ];
        entries.into_iter().collect()
    })
}

/// The handler registered for exactly `(this, other)`.
pub fn lookup(this: OpTag, other: OpTag) -> Option<Handler> {
    table().get(&(this, other)).copied()
}

/// `a` survives when its value is canonically no smaller than `b`'s.
fn a_wins(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    stable::compare(a, b) != Ordering::Less
}

fn set_set(a: &Operation, b: &Operation, mode: RebaseMode<'_>) -> Rebased {
    let (Operation::Set(x), Operation::Set(y)) = (a, b) else {
        return None;
    };
    if x == y {
        return Some((Operation::NoOp, Operation::NoOp));
    }
    if !mode.is_conflictless() {
        return None;
    }
    Some(if a_wins(x, y) {
        (a.clone(), Operation::NoOp)
    } else {
        (Operation::NoOp, b.clone())
    })
}

/// Non-commuting pairs are replayed in canonical order when a rewrite
/// exists that needs no document. Conflicts left over go to the driver,
/// which settles them on the document when there is one.
fn math_math(a: &Operation, b: &Operation, mode: RebaseMode<'_>) -> Rebased {
    let (Operation::Math(x), Operation::Math(y)) = (a, b) else {
        return None;
    };
    if values::commutes(x, y) {
        return Some((a.clone(), b.clone()));
    }
    if mode != RebaseMode::Conflictless {
        return None;
    }
    // `true` when `a` runs first.
    let orders = if a_wins(&codec::encode(a), &codec::encode(b)) {
        [(y, x, false), (x, y, true)]
    } else {
        [(x, y, true), (y, x, false)]
    };
    for (first, second, a_first) in orders {
        if let Some(replayed) = values::replay_under(first, second) {
            log::debug!("MATH {} replayed under {}", first.op().name(), second.op().name());
            let second = Operation::Math(second.clone());
            return Some(if a_first { (replayed, second) } else { (second, replayed) });
        }
    }
    None
}

fn splice_splice(a: &Operation, b: &Operation, mode: RebaseMode<'_>) -> Rebased {
    let (Operation::Splice(p), Operation::Splice(q)) = (a, b) else {
        return None;
    };
    let (p2, q2) = rebase_patches(p, q, mode.is_conflictless(), mode.document())?;
    Some((sequences::splice_or_noop(p2), sequences::splice_or_noop(q2)))
}

/// Indices shift with the splice. A child whose element was removed is a
/// conflict, dropped when conflictless.
fn splice_at_index(a: &Operation, b: &Operation, mode: RebaseMode<'_>) -> Rebased {
    let (Operation::Splice(p), Operation::AtIndex(ops)) = (a, b) else {
        return None;
    };
    let mut moved = BTreeMap::new();
    for (&i, op) in ops {
        match p.map_index(i) {
            Some(j) => {
                moved.insert(j, op.clone());
            }
            None if mode.is_conflictless() => log::debug!("dropping edit of removed element {i}"),
            None => return None,
        }
    }
    Some((a.clone(), Operation::AtIndex(moved).simplify()))
}

/// Elements the splice inserts are mapped too.
fn splice_map(a: &Operation, b: &Operation, _: RebaseMode<'_>) -> Rebased {
    let (Operation::Splice(p), Operation::Map(op)) = (a, b) else {
        return None;
    };
    let mapped = sequences::map_inserted_elements(p, op).ok()?;
    Some((Operation::Splice(mapped), b.clone()))
}

fn at_index_at_index(a: &Operation, b: &Operation, mode: RebaseMode<'_>) -> Rebased {
    let (Operation::AtIndex(x), Operation::AtIndex(y)) = (a, b) else {
        return None;
    };
    let (x2, y2) = rebase_children(x, y, |&i| Step::Index(i), mode)?;
    Some((Operation::AtIndex(x2).simplify(), Operation::AtIndex(y2).simplify()))
}

/// Commutes when every child leaves the mapped operation as it is.
fn at_index_map(a: &Operation, b: &Operation, mode: RebaseMode<'_>) -> Rebased {
    let (Operation::AtIndex(ops), Operation::Map(mapped)) = (a, b) else {
        return None;
    };
    let mut out = BTreeMap::new();
    for (&i, op) in ops {
        let (op2, mapped2) = rebase_pair(op, mapped, mode.at(&Step::Index(i)))?;
        if mapped2 != **mapped {
            return None;
        }
        out.insert(i, op2);
    }
    Some((Operation::AtIndex(out).simplify(), b.clone()))
}

fn map_map(a: &Operation, b: &Operation, mode: RebaseMode<'_>) -> Rebased {
    let (Operation::Map(x), Operation::Map(y)) = (a, b) else {
        return None;
    };
    let (x2, y2) = rebase_pair(x, y, mode.elementwise())?;
    Some((Operation::map(x2).simplify(), Operation::map(y2).simplify()))
}

/// PUT, REM and APPLY, paired key by key.
fn keyed(a: &Operation, b: &Operation, mode: RebaseMode<'_>) -> Rebased {
    let (ea, eb) = (key_edits(a)?, key_edits(b)?);
    let mut ra = BTreeMap::new();
    let mut rb = BTreeMap::new();
    for (key, edit) in &ea {
        let Some(other) = eb.get(key) else {
            ra.insert(key.clone(), edit.clone());
            continue;
        };
        let (x, y) = rebase_key_edit(key, edit, other, mode)?;
        if let Some(x) = x {
            ra.insert(key.clone(), x);
        }
        if let Some(y) = y {
            rb.insert(key.clone(), y);
        }
    }
    for (key, edit) in eb {
        if !ea.contains_key(&key) {
            rb.insert(key, edit);
        }
    }
    Some((from_key_edits(ra), from_key_edits(rb)))
}

type KeyPair = (Option<KeyEdit>, Option<KeyEdit>);

fn rebase_key_edit(key: &str, a: &KeyEdit, b: &KeyEdit, mode: RebaseMode<'_>) -> Option<KeyPair> {
    use KeyEdit::*;
    match (a, b) {
        (Apply(x), Apply(y)) => {
            let (x2, y2) = rebase_pair(x, y, mode.at(&Step::Key(key.to_string())))?;
            Some((Some(Apply(x2)), Some(Apply(y2))))
        }
        (Put(x), Put(y)) if x == y => Some((None, None)),
        (Rem, Rem) => Some((None, None)),
        _ if !mode.is_conflictless() => {
            log::debug!("conflicting edits of key {key:?}");
            None
        }
        (Put(x), Put(y)) => Some(if a_wins(x, y) {
            (Some(a.clone()), None)
        } else {
            (None, Some(b.clone()))
        }),
        // A PUT or REM replaces whatever the other side did to the key.
        (Put(_), _) | (Rem, Apply(_)) => Some((Some(a.clone()), None)),
        (_, Put(_)) | (Apply(_), Rem) => Some((None, Some(b.clone()))),
    }
}

/// Rebases children present on both sides; the rest pass through.
fn rebase_children<K: Ord + Clone>(
    x: &BTreeMap<K, Operation>,
    y: &BTreeMap<K, Operation>,
    step: impl Fn(&K) -> Step,
    mode: RebaseMode<'_>,
) -> Option<(BTreeMap<K, Operation>, BTreeMap<K, Operation>)> {
    let mut x2 = BTreeMap::new();
    let mut y2 = y.clone();
    for (k, op) in x {
        match y.get(k) {
            Some(other) => {
                let (a, b) = rebase_pair(op, other, mode.at(&step(k)))?;
                x2.insert(k.clone(), a);
                y2.insert(k.clone(), b);
            }
            None => {
                x2.insert(k.clone(), op.clone());
            }
        }
    }
    Some((x2, y2))
}

/// Selections only merge in `apply`; concurrent SELECTs commute.
fn select_select(a: &Operation, b: &Operation, _: RebaseMode<'_>) -> Rebased {
    Some((a.clone(), b.clone()))
}

/// The selection moves as if it had watched the splice happen.
fn select_splice(a: &Operation, b: &Operation, _: RebaseMode<'_>) -> Rebased {
    let (Operation::Select(update), Operation::Splice(patch)) = (a, b) else {
        return None;
    };
    let moved = selection::rebase_against_patch(update, patch).ok()?;
    Some((Operation::Select(moved), b.clone()))
}

fn copy_copy(a: &Operation, b: &Operation, _: RebaseMode<'_>) -> Rebased {
    if a == b {
        return Some((Operation::NoOp, Operation::NoOp));
    }
    disjoint(a, b).then(|| (a.clone(), b.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::MathOp;
    use crate::range::Range;
    use serde_json::{json, Value};

    fn converges(a: &Operation, b: &Operation, doc: &Value, mode: RebaseMode<'_>) -> Value {
        let (a2, b2) = rebase_pair(a, b, mode).expect("rebase succeeds");
        let (b3, a3) = rebase_pair(b, a, mode).expect("mirrored rebase succeeds");
        assert_eq!((&a2, &b2), (&a3, &b3), "rebase must not depend on argument order");
        let left = b2.apply_value(&a.apply_value(doc).unwrap()).unwrap();
        let right = a2.apply_value(&b.apply_value(doc).unwrap()).unwrap();
        assert_eq!(left, right);
        left
    }

    fn math(op: MathOp, operand: Value) -> Operation {
        Operation::math(op, operand).unwrap()
    }

    #[test]
    fn every_handler_is_registered_once() {
        for (this, other) in table().keys() {
            if this != other {
                assert!(lookup(*other, *this).is_none(), "{this}/{other} registered both ways");
            }
        }
    }

    #[test]
    fn set_against_set() {
        let a = Operation::set(json!("a"));
        let b = Operation::set(json!("b"));
        assert_eq!(rebase_pair(&a, &b, RebaseMode::Strict), None);
        assert_eq!(converges(&a, &b, &json!(null), RebaseMode::Conflictless), json!("b"));
        let cancelled = Some((Operation::NoOp, Operation::NoOp));
        assert_eq!(rebase_pair(&a, &a, RebaseMode::Strict), cancelled);
    }

    #[test]
    fn commuting_math_passes_through() {
        let a = math(MathOp::Add, json!(2));
        let b = math(MathOp::Add, json!(5));
        assert_eq!(converges(&a, &b, &json!(1), RebaseMode::Strict), json!(8));
        let rot = math(MathOp::Rot, json!([1, 3]));
        let rot2 = math(MathOp::Rot, json!([2, 3]));
        assert_eq!(converges(&rot, &rot2, &json!(0), RebaseMode::Strict), json!(0));
    }

    #[test]
    fn non_commuting_math() {
        let a = math(MathOp::Add, json!(2));
        let b = math(MathOp::Mult, json!(3));
        assert_eq!(rebase_pair(&a, &b, RebaseMode::Strict), None);
        // Only the add can be undone blindly, so the mult is replayed under it.
        let (a2, b2) = rebase_pair(&a, &b, RebaseMode::Conflictless).unwrap();
        assert_eq!(a2, a);
        assert!(matches!(b2, Operation::List(_)));
        for doc in [json!(1), json!(-4)] {
            let n = doc.as_i64().unwrap();
            let out = converges(&a, &b, &doc, RebaseMode::Conflictless);
            assert_eq!(out, json!(n * 3 + 2));
        }
        let doc = json!(1);
        let settled = converges(&a, &b, &doc, RebaseMode::Document(&doc));
        assert_eq!(settled, json!(9));
    }

    #[test]
    fn bitwise_masks_replay_in_canonical_order() {
        let and = math(MathOp::And, json!(0b1100));
        let or = math(MathOp::Or, json!(0b0011));
        for doc in [json!(0), json!(0b1010), json!(-1)] {
            let n = doc.as_i64().unwrap();
            // "and" sorts first, so the or applies last.
            let out = converges(&and, &or, &doc, RebaseMode::Conflictless);
            assert_eq!(out, json!((n & 0b1100) | 0b0011));
        }
    }

    #[test]
    fn at_index_follows_splice() {
        let splice = Operation::splice(0, 1, json!([7, 8])).unwrap();
        let edit = Operation::at_index(2, math(MathOp::Add, json!(1)));
        let doc = json!([1, 2, 3]);
        assert_eq!(converges(&splice, &edit, &doc, RebaseMode::Strict), json!([7, 8, 2, 4]));

        let removed = Operation::at_index(0, math(MathOp::Add, json!(1)));
        assert_eq!(rebase_pair(&splice, &removed, RebaseMode::Strict), None);
        let out = converges(&splice, &removed, &doc, RebaseMode::Conflictless);
        assert_eq!(out, json!([7, 8, 2, 3]));
    }

    #[test]
    fn map_reaches_inserted_elements() {
        let splice = Operation::splice(1, 0, json!([10])).unwrap();
        let map = Operation::map(math(MathOp::Mult, json!(2)));
        assert_eq!(converges(&splice, &map, &json!([1, 2]), RebaseMode::Strict), json!([2, 20, 4]));
    }

    #[test]
    fn at_index_against_map() {
        let edit = Operation::at_index(0, math(MathOp::Add, json!(1)));
        let add_all = Operation::map(math(MathOp::Add, json!(10)));
        assert_eq!(converges(&edit, &add_all, &json!([0, 0]), RebaseMode::Strict), json!([11, 10]));
        let double_all = Operation::map(math(MathOp::Mult, json!(2)));
        assert_eq!(rebase_pair(&edit, &double_all, RebaseMode::Strict), None);
    }

    #[test]
    fn nested_at_index_and_apply() {
        let a = Operation::at_index(0, Operation::at_key("n", math(MathOp::Add, json!(1))));
        let b = Operation::at_indices(BTreeMap::from([
            (0, Operation::at_key("m", Operation::set(json!(true)))),
            (1, Operation::rem("x")),
        ]));
        let doc = json!([{"n": 0, "m": false}, {"x": 1}]);
        assert_eq!(converges(&a, &b, &doc, RebaseMode::Strict), json!([{"n": 1, "m": true}, {}]));
    }

    #[test]
    fn key_edit_conflicts() {
        let doc = json!({"k": 1});
        let put = Operation::put("k", json!(5));
        let rem = Operation::rem("k");
        let bump = Operation::at_key("k", math(MathOp::Add, json!(1)));
        assert_eq!(rebase_pair(&put, &rem, RebaseMode::Strict), None);
        assert_eq!(converges(&put, &rem, &doc, RebaseMode::Conflictless), json!({"k": 5}));
        assert_eq!(converges(&rem, &bump, &doc, RebaseMode::Conflictless), json!({}));
        assert_eq!(converges(&bump, &put, &doc, RebaseMode::Conflictless), json!({"k": 5}));
        assert_eq!(converges(&rem, &rem, &doc, RebaseMode::Strict), json!({}));
        let other = Operation::put("j", json!(0));
        assert_eq!(converges(&rem, &other, &doc, RebaseMode::Strict), json!({"j": 0}));
    }

    #[test]
    fn selection_follows_splice() {
        let select = Operation::select("x", Some(Range::new(3, 4).unwrap()));
        let splice = Operation::splice(0, 1, json!("")).unwrap();
        let (select2, splice2) = rebase_pair(&select, &splice, RebaseMode::Strict).unwrap();
        assert_eq!(select2, Operation::select("x", Some(Range::new(2, 3).unwrap())));
        assert_eq!(splice2, splice);
        let (splice3, select3) = rebase_pair(&splice, &select, RebaseMode::Strict).unwrap();
        assert_eq!((splice3, select3), (splice, select2));
    }

    #[test]
    fn identical_copies_cancel() {
        let a = Operation::copy(vec![("/a".into(), "/b".into())]).unwrap();
        let cancelled = Some((Operation::NoOp, Operation::NoOp));
        assert_eq!(rebase_pair(&a, &a, RebaseMode::Strict), cancelled);
        let b = Operation::copy(vec![("/c".into(), "/d".into())]).unwrap();
        assert_eq!(rebase_pair(&a, &b, RebaseMode::Strict), Some((a.clone(), b.clone())));
        let c = Operation::copy(vec![("/b".into(), "/e".into())]).unwrap();
        assert_eq!(rebase_pair(&a, &c, RebaseMode::Strict), None);
    }
}
