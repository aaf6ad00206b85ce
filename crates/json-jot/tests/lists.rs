mod common;

use common::{r, select, splice};
use json_jot::{Meta, Operation};
use serde_json::json;

fn keystrokes() -> Operation {
    Operation::list(vec![
        select(&[("a", Some(r(0, 5))), ("b", Some(r(20, 30))), ("c", Some(r(10, 10)))]),
        splice(10, 0, "h"),
        select(&[("c", Some(r(11, 11)))]),
        splice(11, 0, "i"),
        select(&[("c", Some(r(12, 12)))]),
        splice(12, 0, "!"),
        select(&[("c", Some(r(13, 13)))]),
    ])
}

#[test]
fn keystrokes_consolidate_into_one_splice_and_one_select() {
    let expected = Operation::list(vec![
        splice(10, 0, "hi!"),
        select(&[("a", Some(r(0, 5))), ("b", Some(r(23, 33))), ("c", Some(r(13, 13)))]),
    ]);
    assert_eq!(keystrokes().simplify(), expected);
}

#[test]
fn consolidated_list_applies_the_same() {
    let doc = json!("0123456789abcdefghijklmnopqrstuvwxyz");
    let op = keystrokes();
    let full = op.apply(&doc, &Meta::new()).unwrap();
    let simplified = op.simplify().apply(&doc, &Meta::new()).unwrap();
    assert_eq!(full, simplified);
    assert_eq!(full.0, json!("0123456789hi!abcdefghijklmnopqrstuvwxyz"));
    assert_eq!(full.1.selections[""]["b"], r(23, 33));
}

#[test]
fn consolidation_stays_inside_its_path() {
    let op = Operation::list(vec![
        Operation::at_key("t", splice(0, 0, "x")),
        Operation::at_key("t", select(&[("me", Some(r(1, 1)))])),
        Operation::at_key("u", splice(0, 0, "y")),
    ]);
    let once = op.simplify();
    assert_eq!(once.simplify(), once);
    let doc = json!({"t": "ab", "u": "cd"});
    assert_eq!(once.apply(&doc, &Meta::new()).unwrap(), op.apply(&doc, &Meta::new()).unwrap());
}

#[test]
fn nested_lists_flatten() {
    let op = Operation::list(vec![
        Operation::list(vec![splice(0, 0, "a"), Operation::NoOp]),
        Operation::list(vec![Operation::list(vec![splice(1, 0, "b")])]),
    ]);
    assert_eq!(op.simplify(), splice(0, 0, "ab"));
}

#[test]
fn backspaces_consolidate_into_one_splice_and_one_select() {
    let op = Operation::list(vec![
        select(&[("a", Some(r(10, 15)))]),
        select(&[("b", Some(r(30, 40)))]),
        select(&[("c", Some(r(20, 20)))]),
        splice(19, 1, ""),
        select(&[("c", Some(r(19, 19)))]),
        splice(18, 1, ""),
        select(&[("c", Some(r(18, 18)))]),
        splice(17, 1, ""),
        select(&[("c", Some(r(17, 17)))]),
    ]);
    let expected = Operation::list(vec![
        splice(17, 3, ""),
        select(&[("a", Some(r(10, 15))), ("b", Some(r(27, 37))), ("c", Some(r(17, 17)))]),
    ]);
    assert_eq!(op.simplify(), expected);

    let doc = json!("0123456789abcdefghijklmnopqrstuvwxyz0123456789");
    let full = op.apply(&doc, &Meta::new()).unwrap();
    assert_eq!(op.simplify().apply(&doc, &Meta::new()).unwrap(), full);
    assert_eq!(full.0, json!("0123456789abcdefgklmnopqrstuvwxyz0123456789"));
}

#[test]
fn multi_hunk_splice_keeps_its_hunks_when_consolidated() {
    let typed = || {
        Operation::list(vec![splice(20, 0, "h"), splice(22, 0, "i"), splice(24, 0, "!")])
            .simplify()
    };
    assert!(matches!(&typed(), Operation::Splice(patch) if patch.hunks().len() == 3));
    let op = Operation::list(vec![
        select(&[("a", Some(r(10, 15)))]),
        select(&[("b", Some(r(30, 40)))]),
        select(&[("c", Some(r(20, 20)))]),
        typed(),
        select(&[("c", Some(r(25, 25)))]),
    ]);
    let expected = Operation::list(vec![
        typed(),
        select(&[("a", Some(r(10, 15))), ("b", Some(r(33, 43))), ("c", Some(r(25, 25)))]),
    ]);
    assert_eq!(op.simplify(), expected);

    let doc = json!("0123456789abcdefghijklmnopqrstuvwxyz0123456789");
    let full = op.apply(&doc, &Meta::new()).unwrap();
    assert_eq!(op.simplify().apply(&doc, &Meta::new()).unwrap(), full);
    assert_eq!(full.1.selections[""]["b"], r(33, 43));
}
