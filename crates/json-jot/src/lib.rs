//! JSON operational transformation.
//!
//! Operations over `serde_json::Value` documents that can be applied,
//! composed, inverted, simplified and rebased against each other, so that
//! replicas editing the same document concurrently converge. Cursor and
//! selection ranges travel alongside the document in [`Meta`] and follow
//! every sequence edit.
//!
//! # Example
//!
//! ```
//! use json_jot::{Operation, RebaseMode};
//! use serde_json::json;
//!
//! let doc = json!({"title": "hello"});
//! let a = Operation::at_key("title", Operation::splice(0, 0, json!("oh, ")).unwrap());
//! let b = Operation::at_key("title", Operation::splice(5, 0, json!("!")).unwrap());
//!
//! let (a2, b2) = a.rebase_pair(&b, RebaseMode::Strict).unwrap();
//! let left = b2.apply_value(&a.apply_value(&doc).unwrap()).unwrap();
//! let right = a2.apply_value(&b.apply_value(&doc).unwrap()).unwrap();
//!
//! assert_eq!(left, right);
//! assert_eq!(left, json!({"title": "oh, hello!"}));
//! ```

pub mod codec;
pub mod error;
pub mod meta;
pub mod ops;
pub mod pointer;
pub mod range;
pub mod rebase;
pub mod replica;
pub mod sequence;
pub mod stable;

pub use codec::PROTOCOL_VERSION;
pub use error::{OtError, OtResult};
pub use meta::{Meta, SelectionSet, SelectionUpdate, SessionRanges};
pub use ops::{CopyPairs, MathEdit, MathOp, OpTag, Operation};
pub use pointer::Step;
pub use range::{adjust_range, Range};
pub use rebase::{rebase_pair, RebaseMode};
pub use replica::Replica;
pub use sequence::{
    adjust_range_against_patch, adjust_selections_against_patch, compose_hunks, rebase_patches,
    Hunk, Patch,
};
