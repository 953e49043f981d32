//! Bounded-Hamming signature stores.
//!
//! Every variant implements the same small capability surface, [`Store`]:
//! append `(sig, docid)` pairs, freeze with `finish`, then answer
//! `find(sig)` with every docid whose signature lies within the schedule's
//! Hamming bound. Which variant a caller gets is a load-time configuration
//! decision; nothing about the variant leaks through the trait.

pub mod small;

use hashbrown::HashSet;
use rayon::prelude::*;

use crate::permute::Schedule;
use crate::table::PermTable;
use crate::zstore::ZTable;
use crate::{permute, Error, Result};

pub use small::SmallStore3;

// ============================================================================
// Store trait — the variant-erased capability surface
// ============================================================================

/// The contract between the index loader / HTTP surface and a store variant.
///
/// `add` is build-time only and single-threaded; `finish` freezes the store
/// (sorting its tables through the rayon pool, returning only when every
/// table is done); `find` is read-only and safe to call from any number of
/// threads afterwards.
pub trait Store: Send + Sync {
    fn add(&mut self, sig: u64, docid: u64);

    /// Every docid within the store's Hamming bound of `sig`. No duplicate
    /// docids; no guaranteed order; empty (not an error) on an empty store.
    fn find(&self, sig: u64) -> Vec<u64>;

    fn finish(&mut self);

    /// Number of `(sig, docid)` pairs added.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compressed-block decode failures swallowed on the query path.
    fn corrupt_blocks(&self) -> u64 {
        0
    }
}

// ============================================================================
// DenseStore — one (permuted hash, docid) table per permutation
// ============================================================================

/// Uncompressed store: each permutation owns a full [`PermTable`], so a
/// query resolves to docids without ever leaving the table.
pub struct DenseStore<S: Schedule> {
    tables: Vec<PermTable>,
    entries: usize,
    _schedule: std::marker::PhantomData<S>,
}

/// Dense store at Hamming bound 3 (16 tables).
pub type Store3 = DenseStore<permute::K3>;
/// Dense store at Hamming bound 6 (49 tables).
pub type Store6 = DenseStore<permute::K6>;

impl<S: Schedule> DenseStore<S> {
    /// `hashes` is the expected corpus size, used to preallocate each table.
    pub fn new(hashes: usize) -> Self {
        Self {
            tables: (0..S::TABLES).map(|_| PermTable::with_capacity(hashes)).collect(),
            entries: 0,
            _schedule: std::marker::PhantomData,
        }
    }
}

impl<S: Schedule> Store for DenseStore<S> {
    fn add(&mut self, sig: u64, docid: u64) {
        for p in S::permutations(sig) {
            self.tables[p.number].push(p.sig, docid);
        }
        self.entries += 1;
    }

    fn find(&self, sig: u64) -> Vec<u64> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for p in S::permutations(sig) {
            for docid in self.tables[p.number].find(p.sig, p.mask, S::MAX_DISTANCE) {
                if seen.insert(docid) {
                    ids.push(docid);
                }
            }
        }
        ids
    }

    fn finish(&mut self) {
        self.tables.par_iter_mut().for_each(PermTable::finish);
    }

    fn len(&self) -> usize {
        self.entries
    }
}

// ============================================================================
// CompressedStore — hash-only ZTables plus one docid-lookup table
// ============================================================================

/// Compressed store: each permutation keeps only its permuted hashes in a
/// [`ZTable`]; docids live in a single table keyed by the original
/// signature. A query therefore runs in two steps: collect matching
/// permuted hashes, unshuffle them back to original signatures, then
/// resolve those through the docid table.
pub struct CompressedStore<S: Schedule> {
    rhashes: Vec<ZTable>,
    docids: PermTable,
    _schedule: std::marker::PhantomData<S>,
}

/// Compressed store at Hamming bound 3.
pub type ZStore3 = CompressedStore<permute::K3>;
/// Compressed store at Hamming bound 6.
pub type ZStore6 = CompressedStore<permute::K6>;

impl<S: Schedule> CompressedStore<S> {
    pub fn new(hashes: usize) -> Self {
        Self {
            rhashes: (0..S::TABLES).map(|_| ZTable::with_capacity(hashes)).collect(),
            docids: PermTable::with_capacity(hashes),
            _schedule: std::marker::PhantomData,
        }
    }
}

impl<S: Schedule> Store for CompressedStore<S> {
    fn add(&mut self, sig: u64, docid: u64) {
        self.docids.push(sig, docid);
        for p in S::permutations(sig) {
            self.rhashes[p.number].add(p.sig);
        }
    }

    fn find(&self, sig: u64) -> Vec<u64> {
        if self.docids.is_empty() {
            return Vec::new();
        }

        let mut candidates = HashSet::new();
        for p in S::permutations(sig) {
            for hash in self.rhashes[p.number].find(p.sig, p.mask, S::MAX_DISTANCE) {
                candidates.insert(S::unshuffle(hash, p.number));
            }
        }

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for candidate in candidates {
            for docid in self.docids.lookup(candidate) {
                if seen.insert(docid) {
                    ids.push(docid);
                }
            }
        }
        ids
    }

    fn finish(&mut self) {
        let docids = &mut self.docids;
        let rhashes = &mut self.rhashes;
        rayon::join(
            || docids.finish(),
            || rhashes.par_iter_mut().for_each(ZTable::finish),
        );
    }

    fn len(&self) -> usize {
        self.docids.len()
    }

    fn corrupt_blocks(&self) -> u64 {
        self.rhashes.iter().map(ZTable::corrupt_blocks).sum()
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Pick the store variant for a configuration.
///
/// `size` is the Hamming bound (3 or 6), `small` selects the bucketed
/// small-corpus layout (bound 3 only), `compressed` selects the ZTable
/// variants, and `hashes` is the expected corpus size for preallocation.
pub fn for_config(size: u32, small: bool, compressed: bool, hashes: usize) -> Result<Box<dyn Store>> {
    match (size, small, compressed) {
        (3, true, false) => Ok(Box::new(SmallStore3::new(hashes))),
        (3, true, true) => {
            Err(Error::Config("small and compressed stores are mutually exclusive".into()))
        }
        (3, false, false) => Ok(Box::new(Store3::new(hashes))),
        (3, false, true) => Ok(Box::new(ZStore3::new(hashes))),
        (6, false, false) => Ok(Box::new(Store6::new(hashes))),
        (6, false, true) => Ok(Box::new(ZStore6::new(hashes))),
        (6, true, _) => Err(Error::Config("small store layout requires size 3".into())),
        (other, _, _) => Err(Error::StoreSize(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamming;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn flip_bits(rng: &mut StdRng, sig: u64, bits: u32) -> u64 {
        let mut q = sig;
        for _ in 0..bits {
            q ^= 1u64 << rng.gen_range(0..64u32);
        }
        q
    }

    fn recall_holds(store: &mut dyn Store, max_distance: u32) {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let planted = 0x0011223344556677u64;

        for i in 0..2_000u64 {
            store.add(rng.gen(), i);
        }
        store.add(planted, 0xdeadbeef);
        store.finish();

        for _ in 0..500 {
            let bits = rng.gen_range(0..=max_distance);
            let q = flip_bits(&mut rng, planted, bits);
            let found = store.find(q);
            assert!(
                found.contains(&0xdeadbeef),
                "query {q:#018x} at {bits} flips missed the planted docid"
            );
        }
    }

    #[test]
    fn dense3_recall() {
        recall_holds(&mut Store3::new(0), 3);
    }

    #[test]
    fn dense6_recall() {
        recall_holds(&mut Store6::new(0), 6);
    }

    #[test]
    fn compressed3_recall() {
        recall_holds(&mut ZStore3::new(0), 3);
    }

    #[test]
    fn compressed6_recall() {
        recall_holds(&mut ZStore6::new(0), 6);
    }

    #[test]
    fn small3_recall() {
        recall_holds(&mut SmallStore3::new(0), 3);
    }

    #[test]
    fn empty_store_finds_nothing() {
        let mut s = Store3::new(0);
        s.finish();
        assert!(s.find(0xdeadbeef).is_empty());

        let mut z = ZStore6::new(0);
        z.finish();
        assert!(z.find(0xdeadbeef).is_empty());
    }

    #[test]
    fn duplicate_inserts_yield_one_docid() {
        let mut s = Store3::new(0);
        s.add(42, 7);
        s.add(42, 7);
        s.finish();
        assert_eq!(s.find(42), vec![7]);

        let mut z = ZStore3::new(0);
        z.add(42, 7);
        z.add(42, 7);
        z.finish();
        assert_eq!(z.find(42), vec![7]);
    }

    #[test]
    fn soundness_within_bound() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut sigs = Vec::new();
        let mut s = ZStore6::new(0);
        for i in 0..3_000u64 {
            let sig = rng.gen();
            sigs.push(sig);
            s.add(sig, i);
        }
        s.finish();

        for _ in 0..50 {
            let q: u64 = rng.gen();
            for docid in s.find(q) {
                let sig = sigs[docid as usize];
                assert!(
                    hamming::distance(sig, q) <= 6,
                    "docid {docid} at distance {} exceeds the bound",
                    hamming::distance(sig, q)
                );
            }
        }
    }

    #[test]
    fn factory_rejects_bad_sizes_and_combos() {
        assert!(matches!(for_config(5, false, false, 0), Err(Error::StoreSize(5))));
        assert!(matches!(for_config(6, true, false, 0), Err(Error::Config(_))));
        assert!(matches!(for_config(3, true, true, 0), Err(Error::Config(_))));
        assert!(for_config(3, true, false, 0).is_ok());
        assert!(for_config(6, false, true, 0).is_ok());
    }
}
