//! A document and its Meta, advanced together.

use serde_json::Value;

use crate::error::OtResult;
use crate::meta::Meta;
use crate::ops::Operation;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replica {
    document: Value,
    meta: Meta,
}

impl Replica {
    pub fn new(document: Value) -> Self {
        Replica { document, meta: Meta::new() }
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Applies `op` to both the document and Meta. Nothing changes when it
    /// fails.
    pub fn apply(&mut self, op: &Operation) -> OtResult<()> {
        let (document, meta) = op.apply(&self.document, &self.meta)?;
        self.document = document;
        self.meta = meta;
        Ok(())
    }

    /// Applies each operation in turn, stopping at the first failure.
    pub fn apply_all<'a>(&mut self, ops: impl IntoIterator<Item = &'a Operation>) -> OtResult<()> {
        ops.into_iter().try_for_each(|op| self.apply(op))
    }
}
