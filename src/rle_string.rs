//! Run-length encoded string with per-character rank/select support.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};

use anyhow::{anyhow, Result};

use crate::compact_vector::CompactVector;
use crate::sparse_bitvector::SparseBitVector;
use crate::Serializable;

/// Run-length encoded byte string supporting `rank`/`select` restricted to a
/// character, plus access and run bookkeeping, in space proportional to the
/// number of runs.
///
/// The representation keeps one byte per run (the run head), a sparse
/// bitvector marking run-start positions (giving `run_of_position`), and for
/// each character `c` a pair of structures over the c-restricted domain: a
/// sparse bitvector with a set bit at the cumulative end of every c-run, and
/// the list of run indices whose head is `c`. Ranks over run heads reduce to
/// binary searches in those lists, so every operation is logarithmic.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use br_index::rle_string::RleString;
///
/// let rle = RleString::from_bytes(b"aabbbab")?;
///
/// assert_eq!(rle.len(), 7);
/// assert_eq!(rle.number_of_runs(), 4);
/// assert_eq!(rle.at(3), Some(b'b'));
/// assert_eq!(rle.run_of_position(3), Some(1));
/// assert_eq!(rle.rank(6, b'b'), Some(3));
/// assert_eq!(rle.select(2, b'a'), Some(5));
/// # Ok(())
/// # }
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RleString {
    heads: CompactVector,
    run_starts: SparseBitVector,
    per_char: Vec<Option<CharRuns>>,
    len: usize,
}

/// Per-character run structures, in the domain of that character's positions.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CharRuns {
    /// Set bit at the last c-domain position of every run of this character.
    ends: SparseBitVector,
    /// Indices of the runs whose head is this character, increasing.
    runs: CompactVector,
}

impl RleString {
    /// Builds the encoding of `bytes`.
    ///
    /// # Errors
    ///
    /// An error is returned if `bytes` is empty.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(anyhow!("bytes must not be empty."));
        }
        let len = bytes.len();

        let mut head_vals = vec![];
        let mut start_positions = vec![];
        let mut char_run_lens: Vec<Vec<usize>> = vec![vec![]; 256];
        let mut char_run_idxs: Vec<Vec<usize>> = vec![vec![]; 256];

        let mut i = 0;
        while i < len {
            let c = bytes[i];
            let start = i;
            while i < len && bytes[i] == c {
                i += 1;
            }
            char_run_lens[c as usize].push(i - start);
            char_run_idxs[c as usize].push(head_vals.len());
            head_vals.push(c as usize);
            start_positions.push(start);
        }

        let heads = CompactVector::from_slice_width(&head_vals, 8)?;
        let run_starts = SparseBitVector::from_positions(len, &start_positions)?;

        let mut per_char = Vec::with_capacity(256);
        for c in 0..256 {
            if char_run_lens[c].is_empty() {
                per_char.push(None);
                continue;
            }
            let mut ends = Vec::with_capacity(char_run_lens[c].len());
            let mut total = 0;
            for &l in &char_run_lens[c] {
                total += l;
                ends.push(total - 1);
            }
            per_char.push(Some(CharRuns {
                ends: SparseBitVector::from_positions(total, &ends)?,
                runs: CompactVector::from_slice(&char_run_idxs[c]),
            }));
        }

        Ok(Self {
            heads,
            run_starts,
            per_char,
            len,
        })
    }

    /// Returns the total length of the string.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the string is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of runs.
    #[inline(always)]
    pub fn number_of_runs(&self) -> usize {
        self.heads.len()
    }

    /// Returns the number of occurrences of `c` in the whole string.
    pub fn char_count(&self, c: u8) -> usize {
        self.per_char[c as usize].as_ref().map_or(0, |cr| cr.ends.universe())
    }

    /// Returns the byte at position `pos`, or [`None`] if out of bounds.
    pub fn at(&self, pos: usize) -> Option<u8> {
        let run = self.run_of_position(pos)?;
        Some(self.heads.get_int(run).unwrap() as u8)
    }

    /// Returns the index of the run containing position `pos`, or [`None`]
    /// if out of bounds.
    pub fn run_of_position(&self, pos: usize) -> Option<usize> {
        if pos < self.len {
            Some(self.run_starts.rank(pos + 1).unwrap() - 1)
        } else {
            None
        }
    }

    /// Returns the starting position of run `k`, or [`None`] if out of bounds.
    pub fn run_start(&self, k: usize) -> Option<usize> {
        self.run_starts.select(k)
    }

    /// Returns the number of occurrences of `c` in positions `[0, pos)`, or
    /// [`None`] if `self.len() < pos`.
    pub fn rank(&self, pos: usize, c: u8) -> Option<usize> {
        if self.len < pos {
            return None;
        }
        let cr = match &self.per_char[c as usize] {
            Some(cr) => cr,
            None => return Some(0),
        };
        if pos == self.len {
            return Some(cr.ends.universe());
        }
        let run = self.run_of_position(pos).unwrap();
        // number of c-runs among runs 0..run
        let j = cr.runs.partition_point(|v| v < run);
        let before = if j == 0 {
            0
        } else {
            cr.ends.select(j - 1).unwrap() + 1
        };
        if self.heads.get_int(run).unwrap() == c as usize {
            Some(before + (pos - self.run_starts.select(run).unwrap()))
        } else {
            Some(before)
        }
    }

    /// Returns the position of the `k`-th (0-origin) occurrence of `c`, or
    /// [`None`] if fewer than `k + 1` occurrences exist.
    pub fn select(&self, k: usize, c: u8) -> Option<usize> {
        let cr = self.per_char[c as usize].as_ref()?;
        if cr.ends.universe() <= k {
            return None;
        }
        // c-run containing the k-th c, in the c-restricted domain
        let j = cr.ends.rank(k).unwrap();
        let before = if j == 0 {
            0
        } else {
            cr.ends.select(j - 1).unwrap() + 1
        };
        let run = cr.runs.get_int(j).unwrap();
        Some(self.run_starts.select(run).unwrap() + (k - before))
    }

    /// Decodes the string back to plain bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        let r = self.number_of_runs();
        for k in 0..r {
            let head = self.heads.get_int(k).unwrap() as u8;
            let start = self.run_starts.select(k).unwrap();
            let end = if k + 1 < r {
                self.run_starts.select(k + 1).unwrap()
            } else {
                self.len
            };
            out.resize(out.len() + (end - start), head);
        }
        out
    }
}

impl Serializable for RleString {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.heads.serialize_into(&mut writer)?;
        mem += self.run_starts.serialize_into(&mut writer)?;
        for cr in &self.per_char {
            mem += cr.is_some().serialize_into(&mut writer)?;
            if let Some(cr) = cr {
                mem += cr.ends.serialize_into(&mut writer)?;
                mem += cr.runs.serialize_into(&mut writer)?;
            }
        }
        mem += self.len.serialize_into(&mut writer)?;
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let heads = CompactVector::deserialize_from(&mut reader)?;
        let run_starts = SparseBitVector::deserialize_from(&mut reader)?;
        let mut per_char = Vec::with_capacity(256);
        for _ in 0..256 {
            if bool::deserialize_from(&mut reader)? {
                let ends = SparseBitVector::deserialize_from(&mut reader)?;
                let runs = CompactVector::deserialize_from(&mut reader)?;
                per_char.push(Some(CharRuns { ends, runs }));
            } else {
                per_char.push(None);
            }
        }
        let len = usize::deserialize_from(&mut reader)?;
        Ok(Self {
            heads,
            run_starts,
            per_char,
            len,
        })
    }

    fn size_in_bytes(&self) -> usize {
        self.heads.size_in_bytes()
            + self.run_starts.size_in_bytes()
            + self
                .per_char
                .iter()
                .map(|cr| 1 + cr.as_ref().map_or(0, |cr| cr.ends.size_in_bytes() + cr.runs.size_in_bytes()))
                .sum::<usize>()
            + self.len.size_in_bytes()
    }
}
