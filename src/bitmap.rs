use crate::raw::MAX_KEYS;

const BITS_PER_WORD: usize = u32::BITS as usize;

/// One flag per key, used to remember which keys were already carried over during a page switch.
pub(crate) type KeyBitmap = Bitmap<{ MAX_KEYS.div_ceil(BITS_PER_WORD) }>;

/// Fixed size set of flags, all cleared on creation. Indexing past `WORDS * 32` panics.
#[derive(Clone, PartialEq)]
pub(crate) struct Bitmap<const WORDS: usize> {
    words: [u32; WORDS],
}

impl<const WORDS: usize> Bitmap<WORDS> {
    pub(crate) const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    pub(crate) fn set(&mut self, bit: usize) {
        let (idx, mask) = Self::locate(bit);
        self.words[idx] |= mask;
    }

    #[cfg(test)]
    pub(crate) fn clear(&mut self, bit: usize) {
        let (idx, mask) = Self::locate(bit);
        self.words[idx] &= !mask;
    }

    pub(crate) fn is_set(&self, bit: usize) -> bool {
        let (idx, mask) = Self::locate(bit);
        self.words[idx] & mask != 0
    }

    #[inline(always)]
    const fn locate(bit: usize) -> (usize, u32) {
        (bit / BITS_PER_WORD, 1 << (bit % BITS_PER_WORD))
    }
}
