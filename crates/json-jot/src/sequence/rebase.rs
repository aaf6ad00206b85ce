//! Transforming two concurrent patches against each other.
//!
//! Both patches are measured against the same base sequence. The result is
//! `(a', b')` where `a'` applies after `b` and `b'` applies after `a`, and
//! both orders produce the same sequence.
//!
//! Hunks are swept in index order and grouped into clusters:
//!
//! * a lone hunk only shifts by the other side's balance so far;
//! * two insertions at the same index are a tie, ordered by the canonical
//!   encoding of what they insert;
//! * hunks whose spans overlap form one cluster spanning the union.
//!
//! Identical clusters cancel. Ties and overlaps are conflicts unless the
//! rebase is conflictless.

use std::cmp::Ordering;

use serde_json::Value;

use super::hunk::{offset, Hunk, Patch};
use super::{concat, seq_len, slice};
use crate::stable;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    A,
    B,
}

struct Cluster<'a> {
    start: usize,
    end: usize,
    members: Vec<(Side, &'a Hunk)>,
}

impl Cluster<'_> {
    fn side(&self, side: Side) -> impl Iterator<Item = &Hunk> + '_ {
        self.members.iter().filter(move |(s, _)| *s == side).map(|(_, h)| *h)
    }

    /// Length of the cluster span after `side`'s hunks are applied.
    fn image_len(&self, side: Side) -> usize {
        let (removed, inserted) = self
            .side(side)
            .fold((0, 0), |(r, i), h| (r + h.removed, i + h.inserted_len()));
        self.end - self.start - removed + inserted
    }

    fn is_tie(&self) -> bool {
        self.members.len() == 2 && self.members.iter().all(|(_, h)| h.is_insertion())
    }

    fn is_identical(&self) -> bool {
        match self.members.as_slice() {
            [(sa, a), (sb, b)] => sa != sb && a == b,
            _ => false,
        }
    }

    /// The span's content after `side`'s hunks, read from the base sequence.
    fn content(&self, side: Side, base: &Value) -> Option<Value> {
        let mut parts = Vec::new();
        let mut cursor = self.start;
        for hunk in self.side(side) {
            parts.push(slice(base, cursor, hunk.index));
            parts.push(hunk.inserted.clone());
            cursor = hunk.end();
        }
        parts.push(slice(base, cursor, self.end));
        concat(parts.iter()).ok()
    }
}

fn clusters<'a>(a: &'a Patch, b: &'a Patch) -> Vec<Cluster<'a>> {
    let mut all: Vec<(Side, &Hunk)> = a
        .hunks()
        .iter()
        .map(|h| (Side::A, h))
        .chain(b.hunks().iter().map(|h| (Side::B, h)))
        .collect();
    all.sort_by_key(|(_, h)| (h.index, h.end()));

    let mut out: Vec<Cluster> = Vec::new();
    for (side, hunk) in all {
        if let Some(last) = out.last_mut() {
            let overlaps = hunk.index < last.end;
            let ties = hunk.is_insertion()
                && last.members.len() == 1
                && last.members[0].0 != side
                && last.members[0].1.is_insertion()
                && last.start == hunk.index;
            if overlaps || ties {
                last.end = last.end.max(hunk.end());
                last.members.push((side, hunk));
                continue;
            }
        }
        out.push(Cluster {
            start: hunk.index,
            end: hunk.end(),
            members: vec![(side, hunk)],
        });
    }
    out
}

/// Which side's insertion goes first at a tie. Antisymmetric, so both
/// replicas agree no matter which side they rebase.
fn a_first(a: &Value, b: &Value) -> bool {
    stable::compare(a, b) != Ordering::Greater
}

/// Rebases `a` and `b` against each other.
///
/// `document` is the shared base sequence; when given, overlapping edits
/// are resolved by comparing the content each side produces.
pub fn rebase_patches(
    a: &Patch,
    b: &Patch,
    conflictless: bool,
    document: Option<&Value>,
) -> Option<(Patch, Patch)> {
    let mut a_out: Vec<Hunk> = Vec::new();
    let mut b_out: Vec<Hunk> = Vec::new();
    // Balance applied so far by each side, used to shift the other side.
    let mut delta_a = 0i64;
    let mut delta_b = 0i64;

    for cluster in clusters(a, b) {
        if let [(side, hunk)] = cluster.members.as_slice() {
            match side {
                Side::A => {
                    a_out.push(hunk.shifted(delta_b));
                    delta_a += hunk.balance();
                }
                Side::B => {
                    b_out.push(hunk.shifted(delta_a));
                    delta_b += hunk.balance();
                }
            }
            continue;
        }

        let len = (cluster.end - cluster.start) as i64;
        let (la, lb) = (cluster.image_len(Side::A), cluster.image_len(Side::B));

        if cluster.is_identical() {
            delta_a += la as i64 - len;
            delta_b += lb as i64 - len;
            continue;
        }
        if !conflictless {
            log::debug!("splice conflict on span {}..{}", cluster.start, cluster.end);
            return None;
        }

        if cluster.is_tie() {
            let ha = cluster.side(Side::A).next()?;
            let hb = cluster.side(Side::B).next()?;
            let at = cluster.start;
            if a_first(&ha.inserted, &hb.inserted) {
                a_out.push(Hunk {
                    index: offset(at, delta_b),
                    removed: 0,
                    inserted: ha.inserted.clone(),
                });
                b_out.push(Hunk {
                    index: offset(at, delta_a) + ha.inserted_len(),
                    removed: 0,
                    inserted: hb.inserted.clone(),
                });
            } else {
                a_out.push(Hunk {
                    index: offset(at, delta_b) + hb.inserted_len(),
                    removed: 0,
                    inserted: ha.inserted.clone(),
                });
                b_out.push(Hunk {
                    index: offset(at, delta_a),
                    removed: 0,
                    inserted: hb.inserted.clone(),
                });
            }
            delta_a += ha.balance();
            delta_b += hb.balance();
            continue;
        }

        let a_at = offset(cluster.start, delta_b);
        let b_at = offset(cluster.start, delta_a);
        let base = document.filter(|doc| seq_len(doc).is_some_and(|n| n >= cluster.end));
        match base {
            Some(base) => {
                let ca = cluster.content(Side::A, base)?;
                let cb = cluster.content(Side::B, base)?;
                match stable::compare(&ca, &cb) {
                    Ordering::Equal => {}
                    Ordering::Greater => {
                        a_out.push(Hunk { index: a_at, removed: lb, inserted: ca })
                    }
                    Ordering::Less => {
                        b_out.push(Hunk { index: b_at, removed: la, inserted: cb })
                    }
                }
            }
            None => {
                // Everything in the span is deleted by one side or the other;
                // what remains is every insertion, in position order.
                let mut inserts: Vec<(Side, &Hunk)> = cluster.members.clone();
                inserts.sort_by(|(sx, x), (sy, y)| {
                    x.index.cmp(&y.index).then_with(|| match (sx, sy) {
                        (Side::A, Side::B) if a_first(&x.inserted, &y.inserted) => Ordering::Less,
                        (Side::A, Side::B) => Ordering::Greater,
                        (Side::B, Side::A) if a_first(&y.inserted, &x.inserted) => {
                            Ordering::Greater
                        }
                        (Side::B, Side::A) => Ordering::Less,
                        _ => Ordering::Equal,
                    })
                });
                let merged = concat(inserts.iter().map(|(_, h)| &h.inserted)).ok()?;
                a_out.push(Hunk { index: a_at, removed: lb, inserted: merged.clone() });
                b_out.push(Hunk { index: b_at, removed: la, inserted: merged });
            }
        }
        delta_a += la as i64 - len;
        delta_b += lb as i64 - len;
    }

    Some((Patch::new(a_out).ok()?, Patch::new(b_out).ok()?))
}
