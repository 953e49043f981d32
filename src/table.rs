//! Sorted `(hash, docid)` tables — the dense storage unit of the index.

use crate::hamming;

/// One indexed pair. The hash is a (possibly permuted) signature; the docid
/// is opaque. Entries never change after insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub hash: u64,
    pub docid: u64,
}

/// An append-only table of entries, frozen into hash order by [`finish`].
///
/// During build the table is unordered; [`find`] is only meaningful after
/// `finish` has sorted it.
///
/// [`finish`]: PermTable::finish
/// [`find`]: PermTable::find
#[derive(Debug, Clone, Default)]
pub struct PermTable {
    entries: Vec<Entry>,
}

impl PermTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { entries: Vec::with_capacity(cap) }
    }

    #[inline]
    pub fn push(&mut self, hash: u64, docid: u64) {
        self.entries.push(Entry { hash, docid });
    }

    /// Sort ascending by hash. Ties sort by docid so a finished table has a
    /// single canonical layout.
    pub fn finish(&mut self) {
        self.entries.sort_unstable_by_key(|e| (e.hash, e.docid));
    }

    /// All docids whose hash matches `sig` on the `mask` prefix and lies
    /// within Hamming distance `d` of `sig`.
    ///
    /// Lower-bound binary search to the first entry with `hash >= sig & mask`,
    /// then a forward walk for as long as the masked prefix holds.
    pub fn find(&self, sig: u64, mask: u64, d: u32) -> Vec<u64> {
        let prefix = sig & mask;
        let start = self.entries.partition_point(|e| e.hash < prefix);

        let mut ids = Vec::new();
        for e in &self.entries[start..] {
            if e.hash & mask != prefix {
                break;
            }
            if hamming::distance(e.hash, sig) <= d {
                ids.push(e.docid);
            }
        }
        ids
    }

    /// Exact-match lookup: every docid stored under precisely `sig`.
    pub fn lookup(&self, sig: u64) -> Vec<u64> {
        self.find(sig, u64::MAX, 0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}
