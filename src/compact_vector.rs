//! Packed integer vector in which each value takes a fixed number of bits.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};

use anyhow::{anyhow, Result};

use crate::bit_vector::BitVector;
use crate::utils;
use crate::Serializable;

/// Packed integer vector with a bit width chosen at construction.
///
/// Used for the run-boundary sample tables and permutation maps, where the
/// width is `ceil(log2 n)` for position values and `ceil(log2 r)` for run
/// indices. The width is serialized together with the payload.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use br_index::compact_vector::CompactVector;
///
/// let cv = CompactVector::from_slice_width(&[7, 2, 5], 3)?;
///
/// assert_eq!(cv.len(), 3);
/// assert_eq!(cv.width(), 3);
/// assert_eq!(cv.get_int(0), Some(7));
/// assert_eq!(cv.get_int(3), None);
/// # Ok(())
/// # }
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct CompactVector {
    chunks: BitVector,
    len: usize,
    width: usize,
}

impl CompactVector {
    /// Creates a new empty vector storing integers within `width` bits each.
    ///
    /// # Errors
    ///
    /// An error is returned if `width` is not in `1..=64`.
    pub fn new(width: usize) -> Result<Self> {
        if !(1..=64).contains(&width) {
            return Err(anyhow!("width must be in 1..=64, but got {width}."));
        }
        Ok(Self {
            chunks: BitVector::new(),
            len: 0,
            width,
        })
    }

    /// Creates a new empty vector with space reserved for `capa` integers.
    pub fn with_capacity(capa: usize, width: usize) -> Result<Self> {
        if !(1..=64).contains(&width) {
            return Err(anyhow!("width must be in 1..=64, but got {width}."));
        }
        Ok(Self {
            chunks: BitVector::with_capacity(capa * width),
            len: 0,
            width,
        })
    }

    /// Creates a new vector from `vals`, packing each value in `width` bits.
    ///
    /// # Errors
    ///
    /// An error is returned if `width` is out of `1..=64` or a value does not
    /// fit in `width` bits.
    pub fn from_slice_width(vals: &[usize], width: usize) -> Result<Self> {
        let mut cv = Self::with_capacity(vals.len(), width)?;
        for &x in vals {
            cv.push_int(x)?;
        }
        Ok(cv)
    }

    /// Creates a new vector from `vals`, fitting the width to the maximum value.
    pub fn from_slice(vals: &[usize]) -> Self {
        let max_int = vals.iter().copied().max().unwrap_or(0);
        // unwrap is safe: needed_bits is always in 1..=64
        Self::from_slice_width(vals, utils::needed_bits(max_int)).unwrap()
    }

    /// Appends `val` at the end.
    ///
    /// # Errors
    ///
    /// An error is returned if `val` does not fit in the width.
    pub fn push_int(&mut self, val: usize) -> Result<()> {
        if self.width < 64 && val >> self.width != 0 {
            return Err(anyhow!("val must fit in width={} bits, but got {val}.", self.width));
        }
        self.chunks.push_bits(val, self.width)?;
        self.len += 1;
        Ok(())
    }

    /// Returns the `pos`-th integer, or [`None`] if out of bounds.
    #[inline(always)]
    pub fn get_int(&self, pos: usize) -> Option<usize> {
        if pos < self.len {
            self.chunks.get_bits(pos * self.width, self.width)
        } else {
            None
        }
    }

    /// Returns the number of integers stored.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the vector is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of bits per integer.
    #[inline(always)]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Returns an iterator over the stored integers.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).map(move |i| self.get_int(i).unwrap())
    }

    /// Returns the number of leading values for which `pred` holds, assuming
    /// the values are partitioned by `pred` (all matching values first).
    pub fn partition_point<P>(&self, pred: P) -> usize
    where
        P: Fn(usize) -> bool,
    {
        let (mut lo, mut hi) = (0, self.len);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if pred(self.get_int(mid).unwrap()) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

impl Serializable for CompactVector {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.chunks.serialize_into(&mut writer)?;
        mem += self.len.serialize_into(&mut writer)?;
        mem += self.width.serialize_into(&mut writer)?;
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let chunks = BitVector::deserialize_from(&mut reader)?;
        let len = usize::deserialize_from(&mut reader)?;
        let width = usize::deserialize_from(&mut reader)?;
        Ok(Self { chunks, len, width })
    }

    fn size_in_bytes(&self) -> usize {
        self.chunks.size_in_bytes() + self.len.size_in_bytes() + self.width.size_in_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    #[test]
    fn test_basic() {
        let cv = CompactVector::from_slice(&[5, 256, 0]);
        assert_eq!(cv.len(), 3);
        assert_eq!(cv.width(), 9);
        assert_eq!(cv.get_int(0), Some(5));
        assert_eq!(cv.get_int(1), Some(256));
        assert_eq!(cv.get_int(2), Some(0));
        assert_eq!(cv.get_int(3), None);
    }

    #[test]
    fn test_width_errors() {
        assert!(CompactVector::new(0).is_err());
        assert!(CompactVector::new(65).is_err());
        assert!(CompactVector::from_slice_width(&[8], 3).is_err());
    }

    #[test]
    fn test_random_values() {
        let mut rng = ChaChaRng::seed_from_u64(17);
        for width in [1, 7, 33, 64] {
            let mask = if width < 64 { (1usize << width) - 1 } else { usize::MAX };
            let vals: Vec<usize> = (0..500).map(|_| rng.gen::<usize>() & mask).collect();
            let cv = CompactVector::from_slice_width(&vals, width).unwrap();
            for (i, &v) in vals.iter().enumerate() {
                assert_eq!(cv.get_int(i), Some(v));
            }
            assert_eq!(cv.iter().collect::<Vec<_>>(), vals);
        }
    }

    #[test]
    fn test_partition_point() {
        let cv = CompactVector::from_slice(&[1, 3, 5, 8, 9]);
        assert_eq!(cv.partition_point(|x| x < 5), 2);
        assert_eq!(cv.partition_point(|x| x < 1), 0);
        assert_eq!(cv.partition_point(|x| x < 100), 5);
    }

    #[test]
    fn test_serialize() {
        let cv = CompactVector::from_slice(&[334, 10, 9, 28]);
        let mut bytes = vec![];
        let size = cv.serialize_into(&mut bytes).unwrap();
        let other = CompactVector::deserialize_from(&bytes[..]).unwrap();
        assert_eq!(cv, other);
        assert_eq!(size, bytes.len());
        assert_eq!(size, cv.size_in_bytes());
    }
}
