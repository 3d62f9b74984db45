use super::{pool::ArrayPool, pool::PooledArray, SECTION_VOLUME};
use crate::BlockError;
use qblocks_util::math::packed_word_count;

/// A fixed array of [`SECTION_VOLUME`] unsigned entries of equal width packed into `u64` words.
///
/// Entries never span two words: each word holds `64 / bits` entries starting from its least
/// significant bit, and any remaining high bits are unused.
#[derive(Clone, Debug)]
pub(crate) struct PackedArray {
    words: PooledArray<u64>,
    bits: u32,
    per_word: usize,
    mask: u64,
}

impl PackedArray {
    /// Creates an array of zeroed entries of the given width.
    pub(crate) fn new(pool: &ArrayPool<u64>, bits: u32) -> Self {
        assert!(
            (1 ..= 32).contains(&bits),
            "Entries must be between 1 and 32 bits wide, got {}",
            bits
        );

        PackedArray {
            words: pool.acquire(packed_word_count(SECTION_VOLUME, bits)),
            bits,
            per_word: 64 / bits as usize,
            mask: (1u64 << bits) - 1,
        }
    }

    /// Copies packed words produced elsewhere. Fails if the word count does not match the width.
    pub(crate) fn from_words(pool: &ArrayPool<u64>, bits: u32, words: &[u64]) -> Result<Self, BlockError> {
        let expected = packed_word_count(SECTION_VOLUME, bits);
        if words.len() != expected {
            return Err(BlockError::invalid(format!(
                "Expected {} words for {} bits per entry, got {}",
                expected,
                bits,
                words.len()
            )));
        }

        let mut array = Self::new(pool, bits);
        array.words.copy_from_slice(words);
        Ok(array)
    }

    #[inline]
    pub(crate) fn bits(&self) -> u32 {
        self.bits
    }

    /// The largest value an entry can hold.
    #[inline]
    pub(crate) fn max_value(&self) -> u32 {
        self.mask as u32
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, u32) {
        debug_assert!(index < SECTION_VOLUME);
        let word = index / self.per_word;
        let shift = (index - word * self.per_word) as u32 * self.bits;
        (word, shift)
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> u32 {
        let (word, shift) = self.locate(index);
        ((self.words[word] >> shift) & self.mask) as u32
    }

    #[inline]
    pub(crate) fn set(&mut self, index: usize, value: u32) {
        debug_assert!(
            value as u64 <= self.mask,
            "Entry {} does not fit in {} bits",
            value,
            self.bits
        );

        let (word, shift) = self.locate(index);
        let word = &mut self.words[word];
        // Clear the old entry before writing the new one
        *word &= !(self.mask << shift);
        *word |= (value as u64 & self.mask) << shift;
    }

    /// Iterates over every entry in index order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let per_word = self.per_word;
        let bits = self.bits;
        let mask = self.mask;

        self.words
            .iter()
            .flat_map(move |&word| (0 .. per_word).map(move |i| ((word >> (i as u32 * bits)) & mask) as u32))
            .take(SECTION_VOLUME)
    }

    /// Copies every entry into a new array of the given width, mapping each through `f`.
    pub(crate) fn remapped<F>(&self, pool: &ArrayPool<u64>, bits: u32, mut f: F) -> PackedArray
    where F: FnMut(u32) -> u32 {
        let mut remapped = PackedArray::new(pool, bits);
        for (index, entry) in self.iter().enumerate() {
            remapped.set(index, f(entry));
        }
        remapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_do_not_span_words() {
        let pool = ArrayPool::new();
        let mut array = PackedArray::new(&pool, 5);

        // Twelve 5-bit entries fit in a word
        assert_eq!(array.words.len(), 342);
        array.set(11, 0b11111);
        array.set(12, 0b10101);
        assert_eq!(array.words[0], 0b11111 << 55);
        assert_eq!(array.words[1], 0b10101);
        assert_eq!(array.get(11), 0b11111);
        assert_eq!(array.get(12), 0b10101);
        assert_eq!(array.get(13), 0);
    }

    #[test]
    fn overwrite_keeps_neighbours() {
        let pool = ArrayPool::new();
        let mut array = PackedArray::new(&pool, 4);

        array.set(0, 0xF);
        array.set(1, 0xA);
        array.set(2, 0xF);
        array.set(1, 0x3);

        assert_eq!(array.get(0), 0xF);
        assert_eq!(array.get(1), 0x3);
        assert_eq!(array.get(2), 0xF);
    }

    #[test]
    fn remap_widens() {
        let pool = ArrayPool::new();
        let mut array = PackedArray::new(&pool, 4);
        for i in 0 .. SECTION_VOLUME {
            array.set(i, (i % 16) as u32);
        }

        let widened = array.remapped(&pool, 13, |entry| entry * 500);
        assert_eq!(widened.bits(), 13);
        assert_eq!(widened.iter().count(), SECTION_VOLUME);
        for (i, entry) in widened.iter().enumerate() {
            assert_eq!(entry, (i % 16) as u32 * 500);
        }
    }

    #[test]
    fn word_count_checked() {
        let pool = ArrayPool::new();

        assert!(PackedArray::from_words(&pool, 4, &[0; 256]).is_ok());
        assert!(PackedArray::from_words(&pool, 4, &[0; 255]).is_err());
        assert!(PackedArray::from_words(&pool, 32, &[0; 2048]).is_ok());
    }
}
