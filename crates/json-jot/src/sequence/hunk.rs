//! Hunks, patches, and offset math over them.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{concat, is_seq, seq_len, slice};
use crate::error::{invalid, mismatch, OtError, OtResult};
use crate::range::{adjust_range, Range};

/// Replace `removed` elements at `index` with `inserted`.
#[derive(Debug, Clone, PartialEq)]
pub struct Hunk {
    pub(crate) index: usize,
    pub(crate) removed: usize,
    pub(crate) inserted: Value,
}

impl Hunk {
    /// `index + removed` must fit a signed 64-bit offset.
    pub fn new(index: usize, removed: usize, inserted: Value) -> OtResult<Self> {
        if !is_seq(&inserted) {
            return Err(invalid("splice value must be a string or an array"));
        }
        match index.checked_add(removed) {
            Some(end) if i64::try_from(end).is_ok() => Ok(Hunk { index, removed, inserted }),
            _ => Err(invalid("splice index and length are out of range")),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn removed(&self) -> usize {
        self.removed
    }

    pub fn inserted(&self) -> &Value {
        &self.inserted
    }

    pub fn end(&self) -> usize {
        self.index + self.removed
    }

    pub fn inserted_len(&self) -> usize {
        seq_len(&self.inserted).unwrap_or(0)
    }

    pub fn balance(&self) -> i64 {
        self.inserted_len() as i64 - self.removed as i64
    }

    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.inserted_len() == 0
    }

    pub fn is_insertion(&self) -> bool {
        self.removed == 0
    }

    pub(crate) fn shifted(&self, delta: i64) -> Hunk {
        Hunk {
            index: offset(self.index, delta),
            removed: self.removed,
            inserted: self.inserted.clone(),
        }
    }
}

pub(crate) fn offset(at: usize, delta: i64) -> usize {
    (at as i64 + delta).max(0) as usize
}

/// An ordered set of non-overlapping, non-touching hunks, all measured
/// against the same pre-edit sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Patch {
    hunks: Vec<Hunk>,
}

/// Where a position of the post-patch sequence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Inside the inserted content of hunk `hunk`, at `offset`.
    Inserted { hunk: usize, offset: usize },
    /// Untouched content at this pre-patch index.
    Original(usize),
}

impl Patch {
    /// Builds a canonical patch. Hunks must be sorted and must not overlap;
    /// touching hunks are merged and no-op hunks dropped.
    pub fn new(hunks: Vec<Hunk>) -> OtResult<Self> {
        let mut out: Vec<Hunk> = Vec::with_capacity(hunks.len());
        for hunk in hunks {
            if let Some(last) = out.last_mut() {
                if hunk.index < last.end() {
                    return Err(invalid("splice hunks must be sorted and must not overlap"));
                }
                if hunk.index == last.end() {
                    last.removed += hunk.removed;
                    last.inserted = concat([&last.inserted, &hunk.inserted])?;
                    continue;
                }
            }
            out.push(hunk);
        }
        out.retain(|h| !h.is_noop());
        Ok(Patch { hunks: out })
    }

    pub fn single(index: usize, removed: usize, inserted: Value) -> OtResult<Self> {
        Patch::new(vec![Hunk::new(index, removed, inserted)?])
    }

    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Applies every hunk to `seq`.
    pub fn apply(&self, seq: &Value) -> OtResult<Value> {
        let len = seq_len(seq).ok_or_else(|| mismatch("splice applies to strings and arrays"))?;
        let kind_ok = |v: &Value| match (seq, v) {
            (Value::String(_), Value::String(_)) | (Value::Array(_), Value::Array(_)) => true,
            _ => seq_len(v) == Some(0),
        };
        let mut parts: Vec<Value> = Vec::with_capacity(self.hunks.len() * 2 + 1);
        let mut cursor = 0;
        for hunk in &self.hunks {
            if hunk.end() > len {
                return Err(OtError::OutOfBounds);
            }
            if !kind_ok(&hunk.inserted) {
                return Err(mismatch("splice value does not match the sequence kind"));
            }
            parts.push(slice(seq, cursor, hunk.index));
            parts.push(hunk.inserted.clone());
            cursor = hunk.end();
        }
        parts.push(slice(seq, cursor, len));
        let out = concat(parts.iter())?;
        // An all-empty result must keep the sequence kind.
        Ok(match (seq, out) {
            (Value::Array(_), Value::String(s)) if s.is_empty() => Value::Array(Vec::new()),
            (_, out) => out,
        })
    }

    /// The patch that undoes this one, given the pre-patch sequence.
    pub fn invert(&self, seq: &Value) -> OtResult<Patch> {
        let len = seq_len(seq).ok_or_else(|| mismatch("splice applies to strings and arrays"))?;
        let mut delta = 0i64;
        let mut hunks = Vec::with_capacity(self.hunks.len());
        for hunk in &self.hunks {
            if hunk.end() > len {
                return Err(OtError::OutOfBounds);
            }
            hunks.push(Hunk {
                index: offset(hunk.index, delta),
                removed: hunk.inserted_len(),
                inserted: slice(seq, hunk.index, hunk.end()),
            });
            delta += hunk.balance();
        }
        Patch::new(hunks)
    }

    /// Folds one point edit, expressed against the post-patch sequence,
    /// into this patch.
    pub fn fold_edit(&self, edit: &Hunk) -> OtResult<Patch> {
        if edit.is_noop() {
            return Ok(self.clone());
        }
        let (e_start, e_end) = (edit.index, edit.end());

        let mut before = Vec::new();
        let mut touched: Vec<(usize, &Hunk)> = Vec::new();
        let mut after = Vec::new();
        let mut delta = 0i64;
        let mut delta_first = 0i64;
        for hunk in &self.hunks {
            let img_start = offset(hunk.index, delta);
            let img_end = img_start + hunk.inserted_len();
            if img_end < e_start {
                before.push(hunk.clone());
                delta += hunk.balance();
            } else if img_start > e_end {
                after.push(hunk.clone());
            } else {
                if touched.is_empty() {
                    delta_first = delta;
                }
                touched.push((img_start, hunk));
                delta += hunk.balance();
            }
        }

        let merged = match (touched.first(), touched.last()) {
            (Some(&(_, first)), Some(&(_, last))) => {
                let start = (first.index as i64).min(e_start as i64 - delta_first).max(0) as usize;
                let end = (last.end() as i64).max(e_end as i64 - delta).max(0) as usize;

                let mut parts: Vec<Value> = Vec::new();
                for &(img_start, hunk) in &touched {
                    let img_end = img_start + hunk.inserted_len();
                    if img_start < e_start {
                        parts.push(slice(&hunk.inserted, 0, img_end.min(e_start) - img_start));
                    }
                }
                parts.push(edit.inserted.clone());
                for &(img_start, hunk) in &touched {
                    let img_end = img_start + hunk.inserted_len();
                    if img_end > e_end {
                        let from = img_start.max(e_end) - img_start;
                        parts.push(slice(&hunk.inserted, from, img_end - img_start));
                    }
                }
                Hunk {
                    index: start,
                    removed: end - start,
                    inserted: concat(parts.iter())?,
                }
            }
            _ => edit.shifted(-delta),
        };

        let mut hunks = before;
        hunks.push(merged);
        hunks.extend(after);
        Patch::new(hunks)
    }

    /// `self` followed by `next`, as one patch.
    pub fn compose(&self, next: &Patch) -> OtResult<Patch> {
        // Right to left, each hunk of `next` is a valid sequential edit.
        next.hunks
            .iter()
            .rev()
            .try_fold(self.clone(), |acc, hunk| acc.fold_edit(hunk))
    }

    /// New index of the pre-patch element at `index`, `None` if removed.
    pub fn map_index(&self, index: usize) -> Option<usize> {
        let mut delta = 0i64;
        for hunk in &self.hunks {
            if hunk.index > index {
                break;
            }
            if index < hunk.end() {
                return None;
            }
            delta += hunk.balance();
        }
        Some(offset(index, delta))
    }

    /// Traces a post-patch position back through the hunks.
    pub fn origin(&self, index: usize) -> Origin {
        let mut delta = 0i64;
        for (i, hunk) in self.hunks.iter().enumerate() {
            let img_start = offset(hunk.index, delta);
            if index < img_start {
                break;
            }
            if index < img_start + hunk.inserted_len() {
                return Origin::Inserted { hunk: i, offset: index - img_start };
            }
            delta += hunk.balance();
        }
        Origin::Original(offset(index, -delta))
    }

    /// Same hunks, with `inserted` rewritten.
    pub(crate) fn map_inserted(
        &self,
        mut f: impl FnMut(usize, &Value) -> OtResult<Value>,
    ) -> OtResult<Patch> {
        let hunks = self
            .hunks
            .iter()
            .enumerate()
            .map(|(i, h)| {
                Ok(Hunk {
                    index: h.index,
                    removed: h.removed,
                    inserted: f(i, &h.inserted)?,
                })
            })
            .collect::<OtResult<Vec<_>>>()?;
        Patch::new(hunks)
    }
}

/// Folds point edits, in application order, into one canonical patch.
pub fn compose_hunks(edits: impl IntoIterator<Item = Hunk>) -> OtResult<Patch> {
    edits
        .into_iter()
        .try_fold(Patch::default(), |acc, edit| acc.fold_edit(&edit))
}

/// Adjusts `range` against every hunk in increasing index order.
pub fn adjust_range_against_patch(range: Range, patch: &Patch) -> OtResult<Range> {
    let mut range = range;
    let mut delta = 0i64;
    for hunk in patch.hunks() {
        range = adjust_range(range, offset(hunk.index, delta), hunk.removed, hunk.inserted_len())?;
        delta += hunk.balance();
    }
    Ok(range)
}

/// Something holding a range that can be moved by a patch.
pub trait RangeSlot: Sized {
    fn adjust(&self, patch: &Patch) -> OtResult<Self>;
}

impl RangeSlot for Range {
    fn adjust(&self, patch: &Patch) -> OtResult<Self> {
        adjust_range_against_patch(*self, patch)
    }
}

impl RangeSlot for Option<Range> {
    fn adjust(&self, patch: &Patch) -> OtResult<Self> {
        self.map(|r| adjust_range_against_patch(r, patch)).transpose()
    }
}

/// Adjusts every session's range at one path.
pub fn adjust_selections_against_patch<V: RangeSlot>(
    selections: &BTreeMap<String, V>,
    patch: &Patch,
) -> OtResult<BTreeMap<String, V>> {
    selections
        .iter()
        .map(|(id, slot)| Ok((id.clone(), slot.adjust(patch)?)))
        .collect()
}
