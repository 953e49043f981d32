//! Fixed bit-permutation schedules for the permuted-table index.
//!
//! Each schedule rotates the 64-bit signature by a fixed block width and,
//! within each rotation, applies a family of block swaps that bring a
//! different group of bits into the searchable high position. Sorting one
//! table per permutation turns a bounded-Hamming query into a handful of
//! prefix-equality scans: any signature within distance k of the query has
//! at least one permutation under which its prefix matches exactly, and the
//! remaining bits are verified with a full distance check.
//!
//! The schedules are part of the index's in-memory shape — the same
//! permutation index must always move the same bits — so the block masks
//! below are fixed constants. Every permutation has an exact inverse,
//! [`Schedule::unshuffle`], which the compressed stores use to map matching
//! permuted hashes back to original signatures.

use smallvec::SmallVec;

/// Prefix mask for the k=3 schedule: 28 high bits.
pub const MASK3: u64 = 0xfffffff000000000;

/// k=6, 9-bit-rotation family, 8-bit block brought high: 17-bit prefix.
pub const MASK6_9_8: u64 = 0xffff800000000000;
/// k=6, 9-bit-rotation family, 7-bit block brought high: 16-bit prefix.
pub const MASK6_9_7: u64 = 0xffff000000000000;
/// k=6, 10-bit family, 8-bit block brought high: 18-bit prefix.
pub const MASK6_10_8: u64 = 0xffffc00000000000;
/// k=6, 10-bit family, 7-bit block brought high: 17-bit prefix.
pub const MASK6_10_7: u64 = 0xffff800000000000;

/// One permuted view of a signature: the permuted bits, the prefix mask the
/// owning table is searched under, and the table number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permutation {
    pub sig: u64,
    pub mask: u64,
    pub number: usize,
}

/// Per-query permutation list. k=3 fits inline; k=6 spills once per query.
pub type PermList = SmallVec<[Permutation; 16]>;

/// A fixed, reversible permutation schedule.
///
/// The two implementors, [`K3`] and [`K6`], are zero-sized: the schedule is
/// code, not data. Store types are generic over this trait so the k=3 and
/// k=6 variants share their table assembly and query fan-out.
pub trait Schedule: Send + Sync + 'static {
    /// Number of permuted tables.
    const TABLES: usize;
    /// Hamming bound the schedule guarantees recall for.
    const MAX_DISTANCE: u32;

    /// All permuted views of `sig`, one per table, in table order.
    fn permutations(sig: u64) -> PermList;

    /// Exact inverse of permutation `t`: `unshuffle(permutations(v)[t].sig, t) == v`.
    fn unshuffle(sig: u64, t: usize) -> u64;
}

// ============================================================================
// k = 3: 16 tables, 4 × 16-bit outer rotations, 12-bit inner block swaps
// ============================================================================

/// The 16-table schedule guaranteeing recall at Hamming distance ≤ 3.
pub struct K3;

impl Schedule for K3 {
    const TABLES: usize = 16;
    const MAX_DISTANCE: u32 = 3;

    fn permutations(mut sig: u64) -> PermList {
        let mut out = PermList::with_capacity(Self::TABLES);
        for _ in 0..4 {
            out.push(Permutation { sig, mask: MASK3, number: out.len() });

            let p = (sig & 0xffff000000ffffff)
                | ((sig & 0x0000fff000000000) >> 12)
                | ((sig & 0x0000000fff000000) << 12);
            out.push(Permutation { sig: p, mask: MASK3, number: out.len() });

            let p = (sig & 0xffff000fff000fff)
                | ((sig & 0x0000fff000000000) >> 24)
                | ((sig & 0x0000000000fff000) << 24);
            out.push(Permutation { sig: p, mask: MASK3, number: out.len() });

            let p = (sig & 0xffff000ffffff000)
                | ((sig & 0x0000fff000000000) >> 36)
                | ((sig & 0x0000000000000fff) << 36);
            out.push(Permutation { sig: p, mask: MASK3, number: out.len() });

            sig = sig.rotate_left(16);
        }
        out
    }

    fn unshuffle(sig: u64, t: usize) -> u64 {
        let shift = 12 * (t % 4) as u32;
        let m2: u64 = 0x0000fff000000000;
        let m3 = m2 >> shift;
        let m1 = !(m2 | m3);
        let sig = (sig & m1) | ((sig & m2) >> shift) | ((sig & m3) << shift);
        sig.rotate_right(16 * (t / 4) as u32)
    }
}

// ============================================================================
// k = 6: 49 tables, 6 × 9-bit outer rotations of 7 swaps, then a 7-swap
// 10-bit-prefix family on the fully rotated value
// ============================================================================

/// The 49-table schedule guaranteeing recall at Hamming distance ≤ 6.
pub struct K6;

impl Schedule for K6 {
    const TABLES: usize = 49;
    const MAX_DISTANCE: u32 = 6;

    fn permutations(mut sig: u64) -> PermList {
        let mut out = PermList::with_capacity(Self::TABLES);
        for _ in 0..6 {
            out.push(Permutation { sig, mask: MASK6_9_8, number: out.len() });

            let p = (sig & 0xff80007fffffffff)
                | ((sig & 0x007f800000000000) >> 8)
                | ((sig & 0x00007f8000000000) << 8);
            out.push(Permutation { sig: p, mask: MASK6_9_8, number: out.len() });

            let p = (sig & 0xff807f807fffffff)
                | ((sig & 0x007f800000000000) >> 16)
                | ((sig & 0x0000007f80000000) << 16);
            out.push(Permutation { sig: p, mask: MASK6_9_8, number: out.len() });

            let p = (sig & 0xff807fff807fffff)
                | ((sig & 0x007f800000000000) >> 24)
                | ((sig & 0x000000007f800000) << 24);
            out.push(Permutation { sig: p, mask: MASK6_9_8, number: out.len() });

            let p = (sig & 0xff807fffff807fff)
                | ((sig & 0x007f800000000000) >> 32)
                | ((sig & 0x00000000007f8000) << 32);
            out.push(Permutation { sig: p, mask: MASK6_9_8, number: out.len() });

            let p = (sig & 0xff807fffffff807f)
                | ((sig & 0x007f800000000000) >> 40)
                | ((sig & 0x0000000000007f80) << 40);
            out.push(Permutation { sig: p, mask: MASK6_9_8, number: out.len() });

            // 7-bit block: bit 55 stays put, the prefix narrows to 16 bits.
            let p = (sig & 0xff80ffffffffff80)
                | ((sig & 0x007f000000000000) >> 48)
                | ((sig & 0x000000000000007f) << 48);
            out.push(Permutation { sig: p, mask: MASK6_9_7, number: out.len() });

            sig = sig.rotate_left(9);
        }

        out.push(Permutation { sig, mask: MASK6_10_8, number: out.len() });

        let p = (sig & 0xffc0003fffffffff)
            | ((sig & 0x003fc00000000000) >> 8)
            | ((sig & 0x00003fc000000000) << 8);
        out.push(Permutation { sig: p, mask: MASK6_10_8, number: out.len() });

        let p = (sig & 0xffc03fc03fffffff)
            | ((sig & 0x003fc00000000000) >> 16)
            | ((sig & 0x0000003fc0000000) << 16);
        out.push(Permutation { sig: p, mask: MASK6_10_8, number: out.len() });

        let p = (sig & 0xffc03fffc03fffff)
            | ((sig & 0x003fc00000000000) >> 24)
            | ((sig & 0x000000003fc00000) << 24);
        out.push(Permutation { sig: p, mask: MASK6_10_8, number: out.len() });

        let p = (sig & 0xffc03fffffc03fff)
            | ((sig & 0x003fc00000000000) >> 32)
            | ((sig & 0x00000000003fc000) << 32);
        out.push(Permutation { sig: p, mask: MASK6_10_8, number: out.len() });

        let p = (sig & 0xffc07fffffffc07f)
            | ((sig & 0x003f800000000000) >> 40)
            | ((sig & 0x0000000000003f80) << 40);
        out.push(Permutation { sig: p, mask: MASK6_10_7, number: out.len() });

        let p = (sig & 0xffc07fffffffff80)
            | ((sig & 0x003f800000000000) >> 47)
            | ((sig & 0x000000000000007f) << 47);
        out.push(Permutation { sig: p, mask: MASK6_10_7, number: out.len() });

        out
    }

    fn unshuffle(sig: u64, t: usize) -> u64 {
        let t7 = t % 7;
        let mut shift = 8 * t7 as u32;

        let m2: u64 = if t < 42 {
            if t7 == 6 { 0x007f000000000000 } else { 0x007f800000000000 }
        } else if t7 >= 5 {
            if t7 == 6 {
                shift -= 1;
            }
            0x003f800000000000
        } else {
            0x003fc00000000000
        };

        let m3 = m2 >> shift;
        let m1 = !(m2 | m3);
        let sig = (sig & m1) | ((sig & m2) >> shift) | ((sig & m3) << shift);
        sig.rotate_right(9 * (t / 7) as u32)
    }
}
