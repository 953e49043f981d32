//! Prefix-bucketed store for small corpora at Hamming bound 3.
//!
//! Instead of 16 sorted tables, four arrays of 2^16 buckets: one array per
//! 16-bit rotation of the signature, addressed by its top 16 bits. With at
//! most 3 errors spread over four 16-bit blocks, at least one block is
//! error-free, so the query's bucket under that rotation holds every
//! candidate; the bucket is scanned with a full distance check and no
//! further prefix narrowing.

use hashbrown::HashSet;
use rayon::prelude::*;

use crate::hamming;
use crate::store::Store;
use crate::table::PermTable;

const ROTATIONS: usize = 4;
const BUCKETS: usize = 1 << 16;

/// The small-corpus k=3 layout.
pub struct SmallStore3 {
    /// `ROTATIONS * BUCKETS` tables, flat; rotation r owns the slice
    /// `[r * BUCKETS, (r + 1) * BUCKETS)`.
    buckets: Vec<PermTable>,
    entries: usize,
}

impl SmallStore3 {
    /// `hashes` is the expected corpus size. The hint cannot be spread
    /// meaningfully over 2^18 buckets, so it only documents intent; buckets
    /// grow from empty on first use.
    pub fn new(hashes: usize) -> Self {
        let _ = hashes;
        Self { buckets: vec![PermTable::new(); ROTATIONS * BUCKETS], entries: 0 }
    }

    #[inline]
    fn bucket_of(rotation: usize, sig: u64) -> usize {
        rotation * BUCKETS + (sig >> 48) as usize
    }
}

impl Store for SmallStore3 {
    fn add(&mut self, sig: u64, docid: u64) {
        let mut s = sig;
        for r in 0..ROTATIONS {
            self.buckets[Self::bucket_of(r, s)].push(s, docid);
            s = s.rotate_left(16);
        }
        self.entries += 1;
    }

    fn find(&self, sig: u64) -> Vec<u64> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        let mut q = sig;
        for r in 0..ROTATIONS {
            for e in self.buckets[Self::bucket_of(r, q)].entries() {
                if hamming::distance(e.hash, q) <= 3 && seen.insert(e.docid) {
                    ids.push(e.docid);
                }
            }
            q = q.rotate_left(16);
        }
        ids
    }

    fn finish(&mut self) {
        self.buckets
            .par_iter_mut()
            .filter(|b| !b.is_empty())
            .for_each(PermTable::finish);
    }

    fn len(&self) -> usize {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_found_under_every_rotation() {
        let mut s = SmallStore3::new(0);
        s.add(0xcafebabe12345678, 1);
        s.finish();
        assert_eq!(s.find(0xcafebabe12345678), vec![1]);
    }

    #[test]
    fn three_flips_in_one_block_still_found() {
        // All three errors inside the low 16-bit block: the bucket under
        // the rotation that promotes an untouched block must still match.
        let sig = 0x1111222233334444u64;
        let mut s = SmallStore3::new(0);
        s.add(sig, 9);
        s.finish();

        let q = sig ^ 0b1011;
        assert_eq!(s.find(q), vec![9]);
    }

    #[test]
    fn beyond_bound_is_not_returned() {
        let sig = 0x1111222233334444u64;
        let mut s = SmallStore3::new(0);
        s.add(sig, 9);
        s.finish();

        // 4 flips in one block: every rotation either misses the bucket or
        // fails the distance check.
        let q = sig ^ 0b1111;
        assert!(s.find(q).is_empty());
    }

    #[test]
    fn empty_store() {
        let mut s = SmallStore3::new(16);
        s.finish();
        assert!(s.find(0).is_empty());
        assert!(s.is_empty());
    }
}
