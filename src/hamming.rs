//! 64-bit Hamming distance.

/// Number of bit positions at which `a` and `b` differ.
///
/// This is the metric everything else in the crate is built on: the
/// permuted tables verify candidates with it, and the VP-tree lifts it
/// to `f64` for its thresholds.
#[inline]
pub fn distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// [`distance`] as a float, for metric-space consumers.
#[inline]
pub fn distance_f64(a: u64, b: u64) -> f64 {
    f64::from(distance(a, b))
}
