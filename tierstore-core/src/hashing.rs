//! Hash spreading used for both segment selection and bucket selection.
//!
//! The spread function is the same bit-mixing used by Doug Lea's
//! `ConcurrentHashMap`: it takes a raw 32-bit hash and mixes high and low
//! bits together so that hashes differing only in their low bits (as
//! `HashMap`'s default hasher can produce for small integer keys) still
//! spread across segments, whose index is taken from the *high* bits.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Computes a raw 32-bit hash code for any `Hash` key, truncating the
/// 64-bit `DefaultHasher` output to its low 32 bits.
pub fn raw_hash<K: Hash + ?Sized>(key: &K) -> i32 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish() as i32
}

/// Spreads a raw hash so its bits are usable both for high-bit segment
/// selection and low-bit bucket selection. Must be applied bit-for-bit —
/// the formula is load-bearing for distribution across segments.
#[inline]
pub fn spread(h: i32) -> i32 {
    let mut h = h;
    h = h.wrapping_add((h << 15) ^ (0xffffcd7du32 as i32));
    h ^= ((h as u32) >> 10) as i32;
    h = h.wrapping_add(h << 3);
    h ^= ((h as u32) >> 6) as i32;
    h = h.wrapping_add((h << 2).wrapping_add(h << 14));
    h ^= ((h as u32) >> 16) as i32;
    h
}

/// Number of bits needed to index `num_segments`, i.e. `log2(num_segments)`.
/// `num_segments` must be a power of two. Computed in 32-bit space regardless
/// of the host's native word size, since it feeds `segment_index`, which
/// shifts a 32-bit spread hash.
pub fn segment_shift(num_segments: usize) -> u32 {
    debug_assert!(num_segments.is_power_of_two());
    ((num_segments - 1) as u32).leading_zeros()
}

/// Selects a segment index from a spread hash given the number of segment
/// index bits (`32 - segment_shift`). A single-segment store has
/// `segment_shift == 32`, which would overflow a 32-bit shift; that case
/// always selects segment 0, the only one there is.
#[inline]
pub fn segment_index(spread_hash: i32, segment_shift: u32) -> usize {
    if segment_shift >= 32 {
        0
    } else {
        ((spread_hash as u32) >> segment_shift) as usize
    }
}

/// Selects a bucket index within a segment's table from a spread hash.
/// `table_len` must be a power of two.
#[inline]
pub fn bucket_index(spread_hash: i32, table_len: usize) -> usize {
    debug_assert!(table_len.is_power_of_two());
    (spread_hash as u32 as usize) & (table_len - 1)
}
