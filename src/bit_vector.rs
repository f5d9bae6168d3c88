//! Plain word-packed bit vector.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};

use anyhow::{anyhow, Result};

use crate::broadword;
use crate::Serializable;

pub(crate) const WORD_LEN: usize = usize::BITS as usize;

/// Plain bit vector in a packed array of words.
///
/// This is the mutable building block underlying every compressed structure
/// in the crate; it is filled once during construction and read-only
/// afterwards.
///
/// # Examples
///
/// ```
/// use br_index::bit_vector::BitVector;
///
/// let bv = BitVector::from_bits([true, false, false, true]);
///
/// assert_eq!(bv.len(), 4);
/// assert_eq!(bv.get_bit(0), Some(true));
/// assert_eq!(bv.get_bit(1), Some(false));
/// assert_eq!(bv.get_bits(1, 3), Some(0b100));
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<usize>,
    len: usize,
}

impl BitVector {
    /// Creates an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty vector with space for at least `capa` bits.
    pub fn with_capacity(capa: usize) -> Self {
        Self {
            words: Vec::with_capacity(crate::utils::ceiled_divide(capa, WORD_LEN)),
            len: 0,
        }
    }

    /// Creates a vector of `len` unset bits.
    pub fn from_zeros(len: usize) -> Self {
        Self {
            words: vec![0; crate::utils::ceiled_divide(len, WORD_LEN)],
            len,
        }
    }

    /// Creates a new vector from input bit stream `bits`.
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let mut bv = Self::new();
        for b in bits {
            bv.push_bit(b);
        }
        bv
    }

    /// Appends `bit` at the end.
    #[inline(always)]
    pub fn push_bit(&mut self, bit: bool) {
        if self.len % WORD_LEN == 0 {
            self.words.push(0);
        }
        if bit {
            *self.words.last_mut().unwrap() |= 1 << (self.len % WORD_LEN);
        }
        self.len += 1;
    }

    /// Appends the lowest `len` bits of `bits` at the end.
    ///
    /// # Errors
    ///
    /// An error is returned if `64 < len` or `bits` does not fit in `len` bits.
    pub fn push_bits(&mut self, bits: usize, len: usize) -> Result<()> {
        if WORD_LEN < len {
            return Err(anyhow!("len must be no greater than {WORD_LEN}, but got {len}."));
        }
        if len < WORD_LEN && bits >> len != 0 {
            return Err(anyhow!("bits must fit in len={len} bits, but got {bits}."));
        }
        if len == 0 {
            return Ok(());
        }
        let pos_in_word = self.len % WORD_LEN;
        if pos_in_word == 0 {
            self.words.push(bits);
        } else {
            *self.words.last_mut().unwrap() |= bits << pos_in_word;
            if len > WORD_LEN - pos_in_word {
                self.words.push(bits >> (WORD_LEN - pos_in_word));
            }
        }
        self.len += len;
        Ok(())
    }

    /// Returns the `pos`-th bit, or [`None`] if out of bounds.
    #[inline(always)]
    pub fn get_bit(&self, pos: usize) -> Option<bool> {
        if pos < self.len {
            Some(self.words[pos / WORD_LEN] >> (pos % WORD_LEN) & 1 == 1)
        } else {
            None
        }
    }

    /// Sets the `pos`-th bit.
    ///
    /// # Errors
    ///
    /// An error is returned if `pos` is out of bounds.
    pub fn set_bit(&mut self, pos: usize, bit: bool) -> Result<()> {
        if self.len <= pos {
            return Err(anyhow!("pos must be no greater than self.len()={}, but got {pos}.", self.len));
        }
        let word = pos / WORD_LEN;
        let mask = 1 << (pos % WORD_LEN);
        if bit {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
        Ok(())
    }

    /// Returns the `len` bits starting at `pos`, or [`None`] if out of bounds.
    #[inline(always)]
    pub fn get_bits(&self, pos: usize, len: usize) -> Option<usize> {
        if WORD_LEN < len || self.len < pos + len {
            return None;
        }
        if len == 0 {
            return Some(0);
        }
        let (block, shift) = (pos / WORD_LEN, pos % WORD_LEN);
        let mask = if len < WORD_LEN { (1 << len) - 1 } else { usize::MAX };
        let bits = if shift + len <= WORD_LEN {
            self.words[block] >> shift & mask
        } else {
            (self.words[block] >> shift) | (self.words[block + 1] << (WORD_LEN - shift) & mask)
        };
        Some(bits)
    }

    /// Returns the number of bits stored.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the vector is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of words stored.
    #[inline(always)]
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// Returns the slice of internal words.
    #[inline(always)]
    pub fn words(&self) -> &[usize] {
        &self.words
    }

    /// Returns the number of set bits, by scanning.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|&w| broadword::popcount(w)).sum()
    }
}

impl Serializable for BitVector {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.words.serialize_into(&mut writer)?;
        mem += self.len.serialize_into(&mut writer)?;
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let words = Vec::<usize>::deserialize_from(&mut reader)?;
        let len = usize::deserialize_from(&mut reader)?;
        Ok(Self { words, len })
    }

    fn size_in_bytes(&self) -> usize {
        self.words.size_in_bytes() + self.len.size_in_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    #[test]
    fn test_push_get_bits() {
        let mut bv = BitVector::new();
        bv.push_bits(0b10110, 5).unwrap();
        bv.push_bits(0, 1).unwrap();
        bv.push_bits(0b1111_0000_1010, 12).unwrap();
        assert_eq!(bv.len(), 18);
        assert_eq!(bv.get_bits(0, 5), Some(0b10110));
        assert_eq!(bv.get_bits(5, 1), Some(0));
        assert_eq!(bv.get_bits(6, 12), Some(0b1111_0000_1010));
        assert_eq!(bv.get_bits(7, 12), None);
    }

    #[test]
    fn test_word_boundary() {
        let mut bv = BitVector::new();
        for _ in 0..5 {
            bv.push_bits(0x1fff_ffff_ffff_ffff, 61).unwrap();
        }
        for i in 0..5 {
            assert_eq!(bv.get_bits(i * 61, 61), Some(0x1fff_ffff_ffff_ffff));
        }
    }

    #[test]
    fn test_random_bits() {
        let mut rng = ChaChaRng::seed_from_u64(13);
        let bits: Vec<bool> = (0..1000).map(|_| rng.gen::<bool>()).collect();
        let bv = BitVector::from_bits(bits.iter().copied());
        assert_eq!(bv.len(), bits.len());
        for (i, &b) in bits.iter().enumerate() {
            assert_eq!(bv.get_bit(i), Some(b));
        }
        assert_eq!(bv.count_ones(), bits.iter().filter(|&&b| b).count());
    }

    #[test]
    fn test_set_bit() {
        let mut bv = BitVector::from_zeros(130);
        bv.set_bit(0, true).unwrap();
        bv.set_bit(64, true).unwrap();
        bv.set_bit(129, true).unwrap();
        assert!(bv.set_bit(130, true).is_err());
        assert_eq!(bv.count_ones(), 3);
        assert_eq!(bv.get_bit(64), Some(true));
        assert_eq!(bv.get_bit(65), Some(false));
    }

    #[test]
    fn test_serialize() {
        let mut bv = BitVector::new();
        bv.push_bits(0xdead_beef, 32).unwrap();
        let mut bytes = vec![];
        let size = bv.serialize_into(&mut bytes).unwrap();
        let other = BitVector::deserialize_from(&bytes[..]).unwrap();
        assert_eq!(bv, other);
        assert_eq!(size, bytes.len());
        assert_eq!(size, bv.size_in_bytes());
    }
}
