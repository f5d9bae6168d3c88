//! Bit vector with a sampled index for rank/select queries.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};

use anyhow::Result;

use crate::bit_vector::{BitVector, WORD_LEN};
use crate::broadword;
use crate::Serializable;

const BLOCK_WORDS: usize = 8;
const BLOCK_LEN: usize = BLOCK_WORDS * WORD_LEN;

/// Bit vector supporting `rank1`, `select1`, and `select0` through a sampled
/// block index.
///
/// The index stores one cumulative popcount per 512-bit block; queries
/// binary-search the samples and finish with word scans. The index is
/// rebuilt on deserialization rather than stored.
///
/// # Examples
///
/// ```
/// use br_index::rs_bit_vector::RsBitVector;
///
/// let bv = RsBitVector::from_bits([true, false, false, true]);
///
/// assert_eq!(bv.rank1(1), Some(1));
/// assert_eq!(bv.rank1(4), Some(2));
/// assert_eq!(bv.select1(1), Some(3));
/// assert_eq!(bv.select0(0), Some(1));
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RsBitVector {
    bv: BitVector,
    blocks: Vec<usize>,
    num_ones: usize,
}

impl RsBitVector {
    /// Builds the block index over `bv`.
    pub fn new(bv: BitVector) -> Self {
        let num_blocks = crate::utils::ceiled_divide(bv.num_words(), BLOCK_WORDS);
        let mut blocks = Vec::with_capacity(num_blocks + 1);
        let mut acc = 0;
        blocks.push(0);
        for b in 0..num_blocks {
            let beg = b * BLOCK_WORDS;
            let end = (beg + BLOCK_WORDS).min(bv.num_words());
            acc += bv.words()[beg..end].iter().map(|&w| broadword::popcount(w)).sum::<usize>();
            blocks.push(acc);
        }
        Self { bv, blocks, num_ones: acc }
    }

    /// Creates a new vector from input bit stream `bits`.
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        Self::new(BitVector::from_bits(bits))
    }

    /// Returns the number of bits stored.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.bv.len()
    }

    /// Checks if the vector is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.bv.is_empty()
    }

    /// Returns the number of bits set.
    #[inline(always)]
    pub const fn num_ones(&self) -> usize {
        self.num_ones
    }

    /// Returns the number of bits unset.
    #[inline(always)]
    pub const fn num_zeros(&self) -> usize {
        self.len() - self.num_ones
    }

    /// Returns the `pos`-th bit, or [`None`] if out of bounds.
    #[inline(always)]
    pub fn get_bit(&self, pos: usize) -> Option<bool> {
        self.bv.get_bit(pos)
    }

    /// Returns the number of ones in `[0, pos)`, or [`None`] if `self.len() < pos`.
    pub fn rank1(&self, pos: usize) -> Option<usize> {
        if self.len() < pos {
            return None;
        }
        let block = pos / BLOCK_LEN;
        let mut rank = self.blocks[block];
        let target_word = pos / WORD_LEN;
        for w in block * BLOCK_WORDS..target_word {
            rank += broadword::popcount(self.bv.words()[w]);
        }
        let rem = pos % WORD_LEN;
        if rem != 0 {
            rank += broadword::popcount(self.bv.words()[target_word] & ((1 << rem) - 1));
        }
        Some(rank)
    }

    /// Searches the position of the `k`-th set bit, or [`None`] if
    /// `self.num_ones() <= k`.
    pub fn select1(&self, k: usize) -> Option<usize> {
        if self.num_ones <= k {
            return None;
        }
        let block = self.blocks.partition_point(|&x| x <= k) - 1;
        let mut cur = self.blocks[block];
        let beg = block * BLOCK_WORDS;
        for w in beg..self.bv.num_words() {
            let word = self.bv.words()[w];
            let ones = broadword::popcount(word);
            if cur + ones > k {
                return Some(w * WORD_LEN + broadword::select_in_word(word, k - cur));
            }
            cur += ones;
        }
        unreachable!();
    }

    /// Searches the position of the `k`-th unset bit, or [`None`] if
    /// `self.num_zeros() <= k`.
    pub fn select0(&self, k: usize) -> Option<usize> {
        if self.num_zeros() <= k {
            return None;
        }
        // zeros before block b, counting only in-bounds bits of full blocks
        let zeros = |b: usize| b * BLOCK_LEN - self.blocks[b];
        let (mut lo, mut hi) = (0, self.blocks.len() - 1);
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            if zeros(mid) <= k {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        let mut cur = zeros(lo);
        let beg = lo * BLOCK_WORDS;
        for w in beg..self.bv.num_words() {
            let word = !self.bv.words()[w];
            let z = broadword::popcount(word);
            if cur + z > k {
                let pos = w * WORD_LEN + broadword::select_in_word(word, k - cur);
                debug_assert!(pos < self.len());
                return Some(pos);
            }
            cur += z;
        }
        unreachable!();
    }
}

impl Serializable for RsBitVector {
    fn serialize_into<W: Write>(&self, writer: W) -> Result<usize> {
        self.bv.serialize_into(writer)
    }

    fn deserialize_from<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::new(BitVector::deserialize_from(reader)?))
    }

    fn size_in_bytes(&self) -> usize {
        self.bv.size_in_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn gen_random_bits(len: usize, density: f64, seed: u64) -> Vec<bool> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen_bool(density)).collect()
    }

    fn test_against_naive(bits: &[bool]) {
        let bv = RsBitVector::from_bits(bits.iter().copied());
        let mut ones = 0;
        let mut zeros = 0;
        for (i, &b) in bits.iter().enumerate() {
            assert_eq!(bv.rank1(i), Some(ones));
            if b {
                assert_eq!(bv.select1(ones), Some(i));
                ones += 1;
            } else {
                assert_eq!(bv.select0(zeros), Some(i));
                zeros += 1;
            }
        }
        assert_eq!(bv.rank1(bits.len()), Some(ones));
        assert_eq!(bv.num_ones(), ones);
        assert_eq!(bv.select1(ones), None);
        assert_eq!(bv.select0(zeros), None);
    }

    #[test]
    fn test_tiny() {
        test_against_naive(&[true, false, false, true]);
        test_against_naive(&[false; 100]);
        test_against_naive(&[true; 100]);
    }

    #[test]
    fn test_random_densities() {
        for (seed, density) in [(7, 0.5), (8, 0.01), (9, 0.99)] {
            test_against_naive(&gen_random_bits(3000, density, seed));
        }
    }

    #[test]
    fn test_block_boundaries() {
        // lengths around the 512-bit block size
        for len in [511, 512, 513, 1024, 1025] {
            test_against_naive(&gen_random_bits(len, 0.3, len as u64));
        }
    }

    #[test]
    fn test_serialize() {
        let bv = RsBitVector::from_bits(gen_random_bits(1000, 0.5, 11));
        let mut bytes = vec![];
        let size = bv.serialize_into(&mut bytes).unwrap();
        let other = RsBitVector::deserialize_from(&bytes[..]).unwrap();
        assert_eq!(bv, other);
        assert_eq!(size, bytes.len());
        assert_eq!(size, bv.size_in_bytes());
    }
}
