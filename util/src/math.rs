const LOG2_TABLE_64: [u64; 64] = [
    63, 0, 58, 1, 59, 47, 53, 2, 60, 39, 48, 27, 54, 33, 42, 3, 61, 51, 37, 40, 49, 18, 28, 20, 55,
    30, 34, 11, 43, 14, 22, 4, 62, 57, 46, 52, 38, 26, 32, 41, 50, 36, 17, 19, 29, 10, 13, 21, 56,
    45, 25, 31, 35, 16, 9, 12, 44, 24, 15, 8, 23, 7, 6, 5,
];

/// Computes the base-2 logarithm of a 64-bit value using a DeBruijn-like algorithm, flooring the
/// result. Note that an input of zero will result in an output of `63` rather than an error.
///
/// # Examples
///
/// ```
/// # use qblocks_util::math::fast_log2_64;
/// for i in 0..64 {
///     assert_eq!(fast_log2_64(1 << i), i as u64);
/// }
///
/// assert_eq!(fast_log2_64(15), 3);
/// assert_eq!(fast_log2_64(17), 4);
/// assert_eq!(fast_log2_64(0), 63);
/// ```
#[inline]
pub const fn fast_log2_64(mut value: u64) -> u64 {
    value |= value >> 1;
    value |= value >> 2;
    value |= value >> 4;
    value |= value >> 8;
    value |= value >> 16;
    value |= value >> 32;

    LOG2_TABLE_64[((value - (value >> 1))
        .overflowing_mul(0x07EDD5E59A4E28C2u64)
        .0
        >> 58) as usize]
}

/// Computes the base-2 logarithm of a 64-bit value using a DeBruijn-like algorithm, ceiling the
/// result. Note that an input of zero will result in an output of `63` rather than an error.
///
/// # Examples
///
/// ```
/// # use qblocks_util::math::fast_ceil_log2_64;
/// assert_eq!(fast_ceil_log2_64(15), 4);
/// assert_eq!(fast_ceil_log2_64(16), 4);
/// assert_eq!(fast_ceil_log2_64(17), 5);
/// ```
#[inline]
pub const fn fast_ceil_log2_64(value: u64) -> u64 {
    fast_log2_64(value.overflowing_shl(1).0.overflowing_sub(1).0)
}

/// Returns the number of bits needed to give each of `count` values a distinct index. Counts of
/// zero and one both need no bits.
///
/// # Examples
///
/// ```
/// # use qblocks_util::math::bits_for_count;
/// assert_eq!(bits_for_count(0), 0);
/// assert_eq!(bits_for_count(3), 2);
/// assert_eq!(bits_for_count(256), 8);
/// ```
#[inline]
pub const fn bits_for_count(count: u64) -> u32 {
    if count <= 1 {
        0
    } else {
        fast_ceil_log2_64(count) as u32
    }
}

/// Returns the number of `u64` words needed to hold `entries` values of `bits` bits each when no
/// value may span two words.
///
/// # Examples
///
/// ```
/// # use qblocks_util::math::packed_word_count;
/// assert_eq!(packed_word_count(4096, 4), 256);
/// assert_eq!(packed_word_count(4096, 5), 342);
/// assert_eq!(packed_word_count(4096, 16), 1024);
/// ```
#[inline]
pub const fn packed_word_count(entries: usize, bits: u32) -> usize {
    let per_word = (64 / bits) as usize;
    (entries + per_word - 1) / per_word
}
