//! Sparse bitvector in Elias-Fano form with rank/select/predecessor queries.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};

use anyhow::{anyhow, Result};

use crate::bit_vector::BitVector;
use crate::broadword;
use crate::rs_bit_vector::RsBitVector;
use crate::Serializable;

/// Monotone bitvector of length `universe` with `m` set bits, stored as an
/// Elias-Fano sequence of the set positions.
///
/// Beyond `rank` and `select`, this structure offers the circular
/// predecessor rank needed by the Phi/Phi^{-1} walks: the rank of the
/// largest set position *strictly below* a query, wrapping to the last set
/// bit when the query precedes every set position.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use br_index::sparse_bitvector::SparseBitVector;
///
/// let sbv = SparseBitVector::from_positions(10, &[2, 3, 7])?;
///
/// assert_eq!(sbv.universe(), 10);
/// assert_eq!(sbv.num_ones(), 3);
/// assert_eq!(sbv.select(1), Some(3));
/// assert_eq!(sbv.rank(4), Some(2));
/// assert_eq!(sbv.predecessor_rank_circular(4), 1);
/// assert_eq!(sbv.predecessor_rank_circular(1), 2); // wraps to the last set bit
/// # Ok(())
/// # }
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct SparseBitVector {
    high: RsBitVector,
    low: BitVector,
    low_len: usize,
    universe: usize,
    num_ones: usize,
}

impl SparseBitVector {
    /// Creates a new vector over `[0, universe)` whose set bits are the given
    /// strictly increasing `positions`.
    ///
    /// # Errors
    ///
    /// An error is returned if `positions` is empty, not strictly increasing,
    /// or contains a value out of the universe.
    pub fn from_positions(universe: usize, positions: &[usize]) -> Result<Self> {
        if positions.is_empty() {
            return Err(anyhow!("positions must contain one set bit at least."));
        }
        let num_ones = positions.len();
        let low_len = broadword::msb(universe / num_ones).unwrap_or(0);
        let mut high = BitVector::from_zeros((universe >> low_len) + num_ones + 1);
        let mut low = BitVector::with_capacity(num_ones * low_len);
        let mut prev = None;
        for (k, &x) in positions.iter().enumerate() {
            if universe <= x {
                return Err(anyhow!("positions must be in [0, {universe}), but got {x}."));
            }
            if prev.map_or(false, |p| p >= x) {
                return Err(anyhow!("positions must be strictly increasing."));
            }
            prev = Some(x);
            high.set_bit((x >> low_len) + k, true)?;
            low.push_bits(x & low_mask(low_len), low_len)?;
        }
        Ok(Self {
            high: RsBitVector::new(high),
            low,
            low_len,
            universe,
            num_ones,
        })
    }

    /// Creates a new vector from input bit stream `bits`.
    pub fn from_bits<I>(bits: I) -> Result<Self>
    where
        I: IntoIterator<Item = bool>,
    {
        let mut positions = vec![];
        let mut universe = 0;
        for (i, b) in bits.into_iter().enumerate() {
            if b {
                positions.push(i);
            }
            universe = i + 1;
        }
        Self::from_positions(universe, &positions)
    }

    /// Returns the length of the bitvector.
    #[inline(always)]
    pub const fn universe(&self) -> usize {
        self.universe
    }

    /// Returns the number of bits set.
    #[inline(always)]
    pub const fn num_ones(&self) -> usize {
        self.num_ones
    }

    /// Returns the position of the `k`-th set bit, or [`None`] if
    /// `self.num_ones() <= k`.
    pub fn select(&self, k: usize) -> Option<usize> {
        if self.num_ones <= k {
            return None;
        }
        let high_val = self.high.select1(k).unwrap();
        let low_val = self.low.get_bits(k * self.low_len, self.low_len).unwrap();
        Some(((high_val - k) << self.low_len) | low_val)
    }

    /// Returns the number of set bits in `[0, pos)`, or [`None`] if
    /// `self.universe() < pos`.
    pub fn rank(&self, pos: usize) -> Option<usize> {
        if self.universe < pos {
            return None;
        }
        if self.universe == pos {
            return Some(self.num_ones);
        }

        let h_rank = pos >> self.low_len;
        let mut h_pos = self.high.select0(h_rank).unwrap();
        let mut rank = h_pos - h_rank;
        let l_pos = pos & low_mask(self.low_len);

        while rank > 0
            && self.high.get_bit(h_pos - 1).unwrap()
            && self.low.get_bits((rank - 1) * self.low_len, self.low_len).unwrap() >= l_pos
        {
            rank -= 1;
            h_pos -= 1;
        }
        Some(rank)
    }

    /// Returns the rank of the largest set position strictly below `pos`, or
    /// `self.num_ones() - 1` (the last set bit) if no set position precedes
    /// `pos`.
    ///
    /// The caller must guarantee `pos < self.universe()`.
    pub fn predecessor_rank_circular(&self, pos: usize) -> usize {
        match self.rank(pos).unwrap() {
            0 => self.num_ones - 1,
            k => k - 1,
        }
    }
}

#[inline(always)]
const fn low_mask(low_len: usize) -> usize {
    if low_len == 0 {
        0
    } else {
        (1 << low_len) - 1
    }
}

impl Serializable for SparseBitVector {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.high.serialize_into(&mut writer)?;
        mem += self.low.serialize_into(&mut writer)?;
        mem += self.low_len.serialize_into(&mut writer)?;
        mem += self.universe.serialize_into(&mut writer)?;
        mem += self.num_ones.serialize_into(&mut writer)?;
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let high = RsBitVector::deserialize_from(&mut reader)?;
        let low = BitVector::deserialize_from(&mut reader)?;
        let low_len = usize::deserialize_from(&mut reader)?;
        let universe = usize::deserialize_from(&mut reader)?;
        let num_ones = usize::deserialize_from(&mut reader)?;
        Ok(Self {
            high,
            low,
            low_len,
            universe,
            num_ones,
        })
    }

    fn size_in_bytes(&self) -> usize {
        self.high.size_in_bytes()
            + self.low.size_in_bytes()
            + self.low_len.size_in_bytes()
            + self.universe.size_in_bytes()
            + self.num_ones.size_in_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn gen_random_positions(universe: usize, m: usize, seed: u64) -> Vec<usize> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let mut positions = vec![];
        while positions.len() < m {
            let x = rng.gen_range(0..universe);
            if let Err(i) = positions.binary_search(&x) {
                positions.insert(i, x);
            }
        }
        positions
    }

    fn test_against_naive(universe: usize, positions: &[usize]) {
        let sbv = SparseBitVector::from_positions(universe, positions).unwrap();
        assert_eq!(sbv.universe(), universe);
        assert_eq!(sbv.num_ones(), positions.len());

        for (k, &x) in positions.iter().enumerate() {
            assert_eq!(sbv.select(k), Some(x));
        }
        assert_eq!(sbv.select(positions.len()), None);

        for pos in 0..=universe {
            let naive = positions.iter().filter(|&&x| x < pos).count();
            assert_eq!(sbv.rank(pos), Some(naive));
            if pos < universe {
                let expected = if naive == 0 { positions.len() - 1 } else { naive - 1 };
                assert_eq!(sbv.predecessor_rank_circular(pos), expected);
            }
        }
        assert_eq!(sbv.rank(universe + 1), None);
    }

    #[test]
    fn test_tiny() {
        test_against_naive(10, &[2, 3, 7]);
        test_against_naive(1, &[0]);
        test_against_naive(100, &[99]);
        test_against_naive(8, &[0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_construction_errors() {
        assert!(SparseBitVector::from_positions(10, &[]).is_err());
        assert!(SparseBitVector::from_positions(10, &[3, 3]).is_err());
        assert!(SparseBitVector::from_positions(10, &[10]).is_err());
    }

    #[test]
    fn test_random_sparse() {
        test_against_naive(10000, &gen_random_positions(10000, 50, 4));
    }

    #[test]
    fn test_random_dense() {
        // half density, as in the permuted LCP encoding
        test_against_naive(2000, &gen_random_positions(2000, 1000, 5));
    }

    #[test]
    fn test_predecessor_wraparound() {
        let sbv = SparseBitVector::from_positions(100, &[10, 20, 99]).unwrap();
        assert_eq!(sbv.predecessor_rank_circular(5), 2);
        assert_eq!(sbv.predecessor_rank_circular(10), 2); // strictly-below semantics
        assert_eq!(sbv.predecessor_rank_circular(11), 0);
        assert_eq!(sbv.predecessor_rank_circular(99), 1);
    }

    #[test]
    fn test_serialize() {
        let sbv = SparseBitVector::from_positions(5000, &gen_random_positions(5000, 100, 6)).unwrap();
        let mut bytes = vec![];
        let size = sbv.serialize_into(&mut bytes).unwrap();
        let other = SparseBitVector::deserialize_from(&bytes[..]).unwrap();
        assert_eq!(sbv, other);
        assert_eq!(size, bytes.len());
        assert_eq!(size, sbv.size_in_bytes());
    }
}
