//! Bit-packed storage for paletted sections.
//!
//! Values are laid out LSB-first across a sequence of 64-bit longs. A value
//! whose bits do not fit in the remainder of a long continues in the low
//! bits of the next one.

/// Bits needed to address `n` distinct values (`ceil(log2(n))`).
pub fn ceil_log2(n: usize) -> u8 {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as u8
    }
}

/// Number of longs holding `count` values of `bits` width.
pub fn longs_needed(count: usize, bits: u8) -> usize {
    (count * bits as usize).div_ceil(64)
}

/// Pack `values` at `bits` width. Bits above the width are discarded.
pub fn pack(values: &[u32], bits: u8) -> Vec<i64> {
    let bits = bits as usize;
    let mut longs = vec![0u64; longs_needed(values.len(), bits as u8)];
    if bits == 0 {
        return Vec::new();
    }
    let mask = (1u64 << bits) - 1;
    for (i, &value) in values.iter().enumerate() {
        let value = value as u64 & mask;
        let bit = i * bits;
        let index = bit / 64;
        let offset = bit % 64;
        longs[index] |= value << offset;
        if offset + bits > 64 {
            longs[index + 1] |= value >> (64 - offset);
        }
    }
    longs.into_iter().map(|l| l as i64).collect()
}

/// Unpack `count` values of `bits` width. The caller checks the long count
/// with [`longs_needed`] first.
pub fn unpack(longs: &[i64], bits: u8, count: usize) -> Vec<u32> {
    let bits = bits as usize;
    if bits == 0 {
        return vec![0; count];
    }
    let mask = (1u64 << bits) - 1;
    (0..count)
        .map(|i| {
            let bit = i * bits;
            let index = bit / 64;
            let offset = bit % 64;
            let mut value = longs[index] as u64 >> offset;
            if offset + bits > 64 {
                value |= (longs[index + 1] as u64) << (64 - offset);
            }
            (value & mask) as u32
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Padded layout (1.16+): no value spans two longs
// ---------------------------------------------------------------------------

/// Number of longs holding `count` values of `bits` width when the unused
/// top bits of every long are left as padding.
pub fn padded_longs_needed(count: usize, bits: u8) -> usize {
    if bits == 0 {
        return 0;
    }
    count.div_ceil(64 / bits as usize)
}

pub fn pack_padded(values: &[u32], bits: u8) -> Vec<i64> {
    if bits == 0 {
        return Vec::new();
    }
    let bits = bits as usize;
    let per_long = 64 / bits;
    let mask = (1u64 << bits) - 1;
    let mut longs = vec![0u64; values.len().div_ceil(per_long)];
    for (i, &value) in values.iter().enumerate() {
        longs[i / per_long] |= (value as u64 & mask) << ((i % per_long) * bits);
    }
    longs.into_iter().map(|l| l as i64).collect()
}

/// The caller checks the long count with [`padded_longs_needed`] first.
pub fn unpack_padded(longs: &[i64], bits: u8, count: usize) -> Vec<u32> {
    if bits == 0 {
        return vec![0; count];
    }
    let bits = bits as usize;
    let per_long = 64 / bits;
    let mask = (1u64 << bits) - 1;
    (0..count)
        .map(|i| ((longs[i / per_long] as u64 >> ((i % per_long) * bits)) & mask) as u32)
        .collect()
}
