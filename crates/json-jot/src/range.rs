//! Offset intervals and their recomputation under a single point edit.
//!
//! A [`Range`] is a half-open interval `[start, end)` over a sequence,
//! measured in elements for arrays and in `char`s for strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{invalid, OtError, OtResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct Range {
    start: usize,
    end: usize,
}

#[derive(Deserialize)]
struct RawRange {
    start: Value,
    end: Value,
}

impl TryFrom<RawRange> for Range {
    type Error = OtError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Range::new(bound(&raw.start, "start")?, bound(&raw.end, "end")?)
    }
}

fn bound(v: &Value, name: &str) -> OtResult<usize> {
    v.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| invalid(format!("{name} must be a non-negative integer")))
}

impl Range {
    pub fn new(start: usize, end: usize) -> OtResult<Self> {
        if end < start {
            return Err(invalid("start must be smaller or equal to end"));
        }
        Ok(Range { start, end })
    }

    /// A collapsed range, i.e. a caret.
    pub fn caret(at: usize) -> Self {
        Range { start: at, end: at }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Decodes `{start, end}`, validating both bounds.
    pub fn from_json(v: &Value) -> OtResult<Self> {
        let obj = v
            .as_object()
            .ok_or_else(|| invalid("range must be null or an object with start and end"))?;
        let start = obj.get("start").ok_or_else(|| invalid("range is missing start"))?;
        let end = obj.get("end").ok_or_else(|| invalid("range is missing end"))?;
        Range::new(bound(start, "start")?, bound(end, "end")?)
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({ "start": self.start, "end": self.end })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Recomputes `range` after deleting `removed` elements at `index` of the
/// pre-edit sequence and inserting `inserted` elements in their place.
///
/// Cases are checked in order:
///
/// 1. edit at or past the end: unchanged;
/// 2. edit entirely before the start: shifted by the balance;
/// 3. edit eats the head: start moves past the insertion;
/// 4. edit eats the tail: end moves to the edit index, so content inserted
///    at the boundary is not part of the range;
/// 5. edit inside: end absorbs the balance;
/// 6. edit covers the range: collapses to the edit index.
pub fn adjust_range(
    range: Range,
    index: usize,
    removed: usize,
    inserted: usize,
) -> OtResult<Range> {
    let edit_start = index;
    let edit_end = index.checked_add(removed).ok_or(OtError::OutOfBounds)?;
    // Only called where `at >= removed`.
    let shift = |at: usize| (at - removed).checked_add(inserted).ok_or(OtError::OutOfBounds);

    if edit_start >= range.end {
        return Ok(range);
    }
    if edit_end <= range.start {
        return Ok(Range {
            start: shift(range.start)?,
            end: shift(range.end)?,
        });
    }
    if edit_start < range.start && edit_end > range.start && edit_end <= range.end {
        return Ok(Range {
            start: edit_start.checked_add(inserted).ok_or(OtError::OutOfBounds)?,
            end: shift(range.end)?,
        });
    }
    if edit_start >= range.start && edit_start < edit_end && edit_end > range.end {
        return Ok(Range {
            start: range.start,
            end: edit_start,
        });
    }
    if edit_start >= range.start && edit_end <= range.end {
        return Ok(Range {
            start: range.start,
            end: shift(range.end)?,
        });
    }
    if edit_start <= range.start && edit_end >= range.end {
        return Ok(Range::caret(edit_start));
    }
    Err(OtError::Internal(format!(
        "unhandled range adjustment of {range} by edit at {index} (-{removed} +{inserted})"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn r(start: usize, end: usize) -> Range {
        Range::new(start, end).unwrap()
    }

    #[test]
    fn left_insert_shifts_both_ends() {
        assert_eq!(adjust_range(r(2, 9), 1, 0, 5).unwrap(), r(7, 14));
    }

    #[test]
    fn covering_delete_collapses() {
        assert_eq!(adjust_range(r(2, 9), 2, 7, 0).unwrap(), r(2, 2));
        assert_eq!(adjust_range(r(2, 9), 1, 9, 0).unwrap(), r(1, 1));
    }

    #[test]
    fn tail_replacement_drops_boundary_insert() {
        assert_eq!(adjust_range(r(2, 9), 7, 3, 5).unwrap(), r(2, 7));
    }

    #[test]
    fn caret_is_pushed_by_insert_before_it_only() {
        assert_eq!(adjust_range(Range::caret(4), 4, 0, 3).unwrap(), Range::caret(4));
        assert_eq!(adjust_range(Range::caret(4), 3, 0, 3).unwrap(), Range::caret(7));
        assert_eq!(adjust_range(Range::caret(4), 2, 4, 0).unwrap(), Range::caret(2));
    }

    #[test]
    fn new_rejects_inverted_bounds() {
        assert!(matches!(Range::new(3, 1), Err(OtError::Validation(_))));
    }

    #[test]
    fn huge_edits_report_out_of_bounds() {
        assert_eq!(adjust_range(r(1, 5), usize::MAX, 1, 0), Err(OtError::OutOfBounds));
        assert_eq!(adjust_range(r(4, 5), 0, 1, usize::MAX), Err(OtError::OutOfBounds));
        assert_eq!(adjust_range(r(5, 9), 0, 3, 0).unwrap(), r(2, 6));
    }

    #[test]
    fn decode_validates_bounds() {
        assert_eq!(Range::from_json(&json!({"start": 1, "end": 3})).unwrap(), r(1, 3));
        assert!(Range::from_json(&json!({"start": -1, "end": 3})).is_err());
        assert!(Range::from_json(&json!({"start": 1.5, "end": 3})).is_err());
        assert!(Range::from_json(&json!({"start": 1})).is_err());
        assert!(serde_json::from_value::<Range>(json!({"start": 4, "end": 2})).is_err());
    }
}
