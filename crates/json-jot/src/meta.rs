//! Side-channel state threaded alongside the document through `apply`.
//!
//! Meta is owned by the caller. Operations never store it and the codec
//! never transmits it; `apply` takes one value and returns the next.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::range::Range;

/// Session id → range, for one document path.
pub type SessionRanges = BTreeMap<String, Range>;

/// Session id → range or removal, as carried by SELECT.
pub type SelectionUpdate = BTreeMap<String, Option<Range>>;

/// JSON Pointer path → session ranges.
pub type SelectionSet = BTreeMap<String, SessionRanges>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selections: SelectionSet,
    /// Caller-owned keys, merged key by key.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty() && self.extra.is_empty()
    }

    pub fn selections_at(&self, path: &str) -> Option<&SessionRanges> {
        self.selections.get(path)
    }

    /// Merges a SELECT payload into the ranges stored at `path`.
    ///
    /// `None` removes the session. A path left without sessions is removed.
    pub fn merge_selections(&mut self, path: &str, update: &SelectionUpdate) {
        let mut at_path = self.selections.remove(path).unwrap_or_default();
        for (id, range) in update {
            match range {
                Some(range) => {
                    at_path.insert(id.clone(), *range);
                }
                None => {
                    at_path.remove(id);
                }
            }
        }
        if !at_path.is_empty() {
            self.selections.insert(path.to_string(), at_path);
        }
    }

    /// Replaces the ranges stored at `path`, dropping the path when empty.
    pub fn replace_selections(&mut self, path: &str, ranges: SessionRanges) {
        if ranges.is_empty() {
            self.selections.remove(path);
        } else {
            self.selections.insert(path.to_string(), ranges);
        }
    }
}
