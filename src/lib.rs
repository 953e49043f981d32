//! # simdex — Near-Duplicate Detection over SimHash Signatures
//!
//! An in-memory index answering two query kinds over a corpus of
//! `(docid, 64-bit SimHash signature)` pairs:
//!
//! 1. **Bounded Hamming search** — all docids within Hamming distance k
//!    (k ∈ {3, 6}) of a query signature, via the permuted-table scheme of
//!    Manku, Jain & Sarma, *Detecting Near-Duplicates for Web Crawling*.
//! 2. **k-nearest-neighbour search** — the k closest signatures by Hamming
//!    distance, via a vantage-point tree.
//!
//! ## Design Principles
//!
//! 1. **Build-once, read-many**: tables are append-only until `finish()`
//!    freezes them; queries run lock-free against an immutable snapshot
//! 2. **Trait-first**: [`store::Store`] is the contract between the HTTP
//!    surface and the index variants; callers never learn which one they got
//! 3. **Exact answers**: bounded-Hamming results are exact, never sampled
//! 4. **Availability over completeness**: a corrupt compressed block reduces
//!    recall for one prefix range instead of failing the query
//!
//! ## Index Variants
//!
//! | Variant | Tables | Layout |
//! |---------|--------|--------|
//! | `Store3` | 16 | dense `(permuted hash, docid)` tables |
//! | `Store6` | 49 | dense `(permuted hash, docid)` tables |
//! | `ZStore3` / `ZStore6` | 16 / 49 | Huffman-delta compressed hash blocks + one docid table |
//! | `SmallStore3` | 4 × 2^16 | prefix-bucketed, for small corpora |

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod hamming;
pub mod loader;
pub mod permute;
pub mod server;
pub mod store;
pub mod table;
pub mod vptree;
pub mod zstore;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::Config;
pub use loader::{Index, IndexHandle};
pub use store::Store;
pub use vptree::{Item, VpTree};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Block index beyond the compressed table's block count.
    #[error("block {0} out of range")]
    InvalidBlock(usize),

    /// Compressed bit stream ended mid-tuple.
    #[error("corrupt compressed block")]
    CorruptBlock,

    /// A query signature that is not 64 bits of hex.
    #[error("bad signature {0:?}")]
    ParseSignature(String),

    /// Store size outside the supported schedules.
    #[error("unknown store size {0} (expected 3 or 6)")]
    StoreSize(u32),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
