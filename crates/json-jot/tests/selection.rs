mod common;

use common::{converge, converge_from, r, select, splice};
use json_jot::{Meta, Operation, RebaseMode, Replica};
use serde_json::json;

#[test]
fn key_scoped_select_lands_in_meta() {
    let doc = json!({"hello": "world"});
    let op = Operation::at_key("hello", Operation::select("x", Some(r(1, 3))));
    let (out, meta) = op.apply(&doc, &Meta::new()).unwrap();
    assert_eq!(out, doc);
    assert_eq!(
        serde_json::to_value(&meta).unwrap(),
        json!({"selections": {"/hello": {"x": {"start": 1, "end": 3}}}})
    );
}

#[test]
fn symmetric_rebase_with_shared_document() {
    let doc = json!("aaa bb ccc");
    let a = select(&[("a", Some(r(1, 2))), ("c", Some(r(8, 9)))]);
    let b = Operation::list(vec![splice(5, 0, "xxx"), select(&[("b", Some(r(8, 8)))])]);

    let (out, meta) = converge(&a, &b, &doc, RebaseMode::Document(&doc));
    assert_eq!(out, json!("aaa bxxxb ccc"));
    let ranges = &meta.selections[""];
    assert_eq!(ranges.len(), 3);
    assert_eq!(ranges["a"], r(1, 2));
    assert_eq!(ranges["b"], r(8, 8));
    assert_eq!(ranges["c"], r(11, 12));
}

#[test]
fn selection_rides_along_a_concurrent_delete() {
    let doc = json!({"body": "hello brave new world"});
    let cursor = Operation::at_key("body", select(&[("me", Some(r(12, 15)))]));
    let edit = Operation::at_key("body", splice(6, 6, ""));
    let (out, meta) = converge(&cursor, &edit, &doc, RebaseMode::Strict);
    assert_eq!(out, json!({"body": "hello new world"}));
    assert_eq!(meta.selections["/body"]["me"], r(6, 9));
}

#[test]
fn stored_ranges_follow_later_splices() {
    let mut replica = Replica::new(json!(["a", "b", "c", "d"]));
    replica.apply(&select(&[("x", Some(r(1, 3))), ("y", Some(r(3, 4)))])).unwrap();
    replica.apply(&Operation::splice(0, 2, json!([])).unwrap()).unwrap();
    assert_eq!(replica.document(), &json!(["c", "d"]));
    let ranges = &replica.meta().selections[""];
    assert_eq!(ranges["x"], r(0, 1));
    assert_eq!(ranges["y"], r(1, 2));
}

#[test]
fn null_range_removes_a_session() {
    let mut replica = Replica::new(json!("text"));
    replica.apply(&select(&[("x", Some(r(0, 1))), ("y", Some(r(2, 2)))])).unwrap();
    replica.apply(&select(&[("x", None)])).unwrap();
    let ranges = &replica.meta().selections[""];
    assert!(!ranges.contains_key("x"));
    assert_eq!(ranges["y"], r(2, 2));
}

#[test]
fn select_cannot_be_inverted() {
    let op = Operation::list(vec![splice(0, 0, "a"), select(&[("x", None)])]);
    assert!(op.invert(&json!("")).is_err());
}

/// Two carets on three lines: each writer types on a different line and
/// moves only their own caret.
fn lines_with_carets() -> (serde_json::Value, Meta) {
    let doc = json!("one \ntwo \nthree \n");
    let carets = select(&[("alice", Some(r(0, 0))), ("bob", Some(r(17, 17)))]);
    let (_, meta) = carets.apply(&doc, &Meta::new()).unwrap();
    (doc, meta)
}

fn assert_intentions_kept(alice: &Operation, bob: &Operation) {
    let (doc, meta) = lines_with_carets();

    let (alone, alice_meta) = alice.apply(&doc, &meta).unwrap();
    assert_eq!(alone, json!("one orange\ntwo \nthree \n"));
    assert_eq!(alice_meta.selections[""]["bob"], r(23, 23));
    let (alone, bob_meta) = bob.apply(&doc, &meta).unwrap();
    assert_eq!(alone, json!("one \ntwo bananas\nthree \n"));
    assert_eq!(bob_meta.selections[""]["alice"], r(0, 0));

    let (out, meta) = converge_from(alice, bob, &doc, &meta, RebaseMode::Document(&doc));
    assert_eq!(out, json!("one orange\ntwo bananas\nthree \n"));
    let ranges = &meta.selections[""];
    assert_eq!(ranges.len(), 2);
    assert_eq!(ranges["alice"], r(10, 10));
    assert_eq!(ranges["bob"], r(22, 22));
}

#[test]
fn rebase_keeps_each_writer_on_their_line() {
    let alice =
        Operation::list(vec![splice(4, 0, "orange"), select(&[("alice", Some(r(10, 10)))])])
            .simplify();
    let bob = Operation::list(vec![splice(9, 0, "bananas"), select(&[("bob", Some(r(16, 16)))])])
        .simplify();
    assert_intentions_kept(&alice, &bob);
}

#[test]
fn rebase_keeps_intentions_typed_one_key_at_a_time() {
    let typed = |id: &str, at: usize, text: &str| {
        let mut ops = vec![select(&[(id, Some(r(at, at)))])];
        for (i, c) in text.chars().enumerate() {
            ops.push(splice(at + i, 0, &c.to_string()));
            ops.push(select(&[(id, Some(r(at + i + 1, at + i + 1)))]));
        }
        Operation::list(ops).simplify()
    };
    let alice = typed("alice", 4, "orange");
    let bob = typed("bob", 9, "bananas");
    assert_eq!(
        alice,
        Operation::list(vec![splice(4, 0, "orange"), select(&[("alice", Some(r(10, 10)))])])
    );
    assert_intentions_kept(&alice, &bob);
}
