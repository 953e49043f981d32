//! Huffman-delta block-compressed sorted signature store.
//!
//! A [`ZTable`] holds a sorted, deduplicated sequence of 64-bit permuted
//! hashes packed into fixed 1024-byte blocks. Each block opens with one raw
//! 64-bit value; every further value is stored as the Huffman code of the
//! leading-zero count of its XOR against the previous value, followed by
//! the raw tail bits below the first differing bit. An EOF symbol closes
//! each block, zero-padded to the block boundary.
//!
//! Random access comes from `index`, the first value of every block: a
//! prefix query binary-searches `index`, decompresses the handful of
//! candidate blocks, and scans the transient sorted list exactly like a
//! dense table.

mod bits;
mod huffman;

use std::sync::atomic::{AtomicU64, Ordering};

use bits::{BitReader, BitWriter};
use huffman::{Codebook, EOF_SYMBOL};

use crate::hamming;
use crate::{Error, Result};

/// Compressed block size in bytes.
pub const BLOCK_SIZE: usize = 1024;
/// Compressed block size in bits.
pub const BLOCK_SIZE_BITS: usize = BLOCK_SIZE * 8;

/// A sorted u64 sequence, block-compressed after [`finish`].
///
/// Values accumulate unordered in `pending` during build; `finish` sorts,
/// deduplicates and packs them. Decode failures during [`find`] are
/// swallowed (the block contributes no matches) and counted; the typed
/// decode path is [`decompress_block`].
///
/// [`finish`]: ZTable::finish
/// [`find`]: ZTable::find
/// [`decompress_block`]: ZTable::decompress_block
#[derive(Debug, Default)]
pub struct ZTable {
    pending: Vec<u64>,
    bytes: Vec<u8>,
    index: Vec<u64>,
    book: Option<Codebook>,
    corrupt_blocks: AtomicU64,
}

impl ZTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { pending: Vec::with_capacity(cap), ..Self::default() }
    }

    #[inline]
    pub fn add(&mut self, sig: u64) {
        self.pending.push(sig);
    }

    /// Sort, deduplicate and compress. After this the table is read-only.
    pub fn finish(&mut self) {
        self.pending.sort_unstable();
        self.pending.dedup();
        self.compress();
    }

    /// Number of packed blocks.
    pub fn block_count(&self) -> usize {
        self.index.len()
    }

    /// Size of the packed byte buffer.
    pub fn compressed_len(&self) -> usize {
        self.bytes.len()
    }

    /// Decode failures swallowed by [`find`](ZTable::find) so far.
    pub fn corrupt_blocks(&self) -> u64 {
        self.corrupt_blocks.load(Ordering::Relaxed)
    }

    fn compress(&mut self) {
        let u = std::mem::take(&mut self.pending);
        if u.is_empty() {
            return;
        }

        let mut counts = [0u64; 64];
        for w in u.windows(2) {
            counts[(w[0] ^ w[1]).leading_zeros() as usize] += 1;
        }
        let book = Codebook::from_counts(&counts);
        let eofbits = book.symbol_len(EOF_SYMBOL);

        let mut w = BitWriter::new();
        let mut nbits = 0usize;
        let mut prev = 0u64;

        for &v in &u {
            // Start of a block: raw 64-bit seed, remembered in the index.
            if nbits == 0 {
                self.index.push(v);
                w.write_bits(v, 64);
                nbits = 64;
                prev = v;
                continue;
            }

            let xor = v ^ prev;
            if xor == 0 {
                // Non-adjacent duplicate; nothing to encode.
                continue;
            }
            let lz = xor.leading_zeros();
            let hlen = book.symbol_len(lz as u16);
            let rest = 64 - lz - 1;

            if nbits + hlen + rest as usize + eofbits < BLOCK_SIZE_BITS {
                book.encode(&mut w, lz as u16);
                w.write_bits(v, rest);
                nbits += hlen + rest as usize;
            } else {
                // Close this block and open the next with a raw seed. The
                // admission check above always leaves room for the EOF.
                debug_assert!(nbits + eofbits <= BLOCK_SIZE_BITS);
                book.encode(&mut w, EOF_SYMBOL);
                nbits += eofbits;
                while nbits < BLOCK_SIZE_BITS {
                    w.write_bit(false);
                    nbits += 1;
                }

                self.index.push(v);
                w.write_bits(v, 64);
                nbits = 64;
            }
            prev = v;
        }

        book.encode(&mut w, EOF_SYMBOL);
        w.pad_to_byte();

        self.bytes = w.into_bytes();
        self.book = Some(book);
    }

    /// All stored values matching `sig` on the `mask` prefix within Hamming
    /// distance `d`.
    ///
    /// Candidate blocks are the least block whose first value reaches the
    /// prefix, the block before it (its tail can still hold the prefix),
    /// and any following blocks that still open inside the prefix range.
    pub fn find(&self, sig: u64, mask: u64, d: u32) -> Vec<u64> {
        if self.index.is_empty() {
            return Vec::new();
        }

        let prefix = sig & mask;
        let start = self.index.partition_point(|&v| v < prefix);
        let first = start.saturating_sub(1);

        let mut out = Vec::new();
        for b in first..self.index.len() {
            if b > first && self.index[b] & mask != prefix {
                break;
            }
            match self.decompress_block(b) {
                Ok(vals) => {
                    let lo = vals.partition_point(|&v| v < prefix);
                    for &v in &vals[lo..] {
                        if v & mask != prefix {
                            break;
                        }
                        if hamming::distance(v, sig) <= d {
                            out.push(v);
                        }
                    }
                }
                Err(_) => {
                    // Availability first: the block contributes nothing.
                    self.corrupt_blocks.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        out
    }

    /// Decode one block back into its sorted values.
    ///
    /// This is the typed entry point for corruption: a block index past the
    /// end is [`Error::InvalidBlock`], a bit stream that ends mid-tuple is
    /// [`Error::CorruptBlock`].
    pub fn decompress_block(&self, block: usize) -> Result<Vec<u64>> {
        if block >= self.index.len() {
            return Err(Error::InvalidBlock(block));
        }
        let book = self.book.as_ref().ok_or(Error::InvalidBlock(block))?;

        let mut r = BitReader::new(&self.bytes[block * BLOCK_SIZE..]);
        let seed = r.read_bits(64).ok_or(Error::CorruptBlock)?;

        let mut out = vec![seed];
        let mut prev = seed;
        loop {
            let sym = book.decode(&mut r).ok_or(Error::CorruptBlock)?;
            if sym == EOF_SYMBOL {
                break;
            }
            let samebits = u32::from(sym);
            let rest = 64 - samebits - 1;
            let diffbits = r.read_bits(rest).ok_or(Error::CorruptBlock)?;

            let kept = if samebits == 0 { 0 } else { !0u64 << (64 - samebits) };
            let sig = (prev & kept) | (1u64 << rest) | diffbits;
            out.push(sig);
            prev = sig;
        }

        Ok(out)
    }
}
