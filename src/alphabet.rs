//! Alphabet remapping onto a compact internal domain.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};

use anyhow::{anyhow, Result};

use crate::Serializable;

/// Internal code of the text terminator. Byte values 0 and 1 are reserved
/// and must not appear in input texts.
pub const TERMINATOR: u8 = 1;

/// Bijection from the bytes occurring in a text onto the compact internal
/// alphabet {2, ..., sigma}, keeping the original byte order.
///
/// Code 1 is the terminator and code 0 marks bytes absent from the text, so
/// a remapped absent character immediately yields an empty range in the
/// index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphabetMap {
    remap: [u8; 256],
    remap_inv: [u8; 256],
    sigma: usize,
}

impl AlphabetMap {
    /// Scans `text` and assigns internal codes starting at 2 in increasing
    /// byte order.
    ///
    /// # Errors
    ///
    /// An error is returned if `text` is empty, contains a reserved byte
    /// (0 or 1), or holds too many distinct bytes to remap below 255.
    pub fn from_text(text: &[u8]) -> Result<Self> {
        if text.is_empty() {
            return Err(anyhow!("input text is empty."));
        }
        let mut freqs = [0usize; 256];
        let mut sigma = 1;
        for &b in text {
            if b < 2 {
                return Err(anyhow!("input text contains the reserved byte {b}."));
            }
            if freqs[b as usize] == 0 {
                sigma += 1;
                if sigma >= 255 {
                    return Err(anyhow!("alphabet cannot be remapped (overflow)."));
                }
            }
            freqs[b as usize] += 1;
        }

        let mut remap = [0u8; 256];
        let mut remap_inv = [0u8; 256];
        let mut new_c = 2u8;
        for c in 2..256 {
            if freqs[c] != 0 {
                remap[c] = new_c;
                remap_inv[new_c as usize] = c as u8;
                new_c += 1;
            }
        }
        Ok(Self {
            remap,
            remap_inv,
            sigma,
        })
    }

    /// Maps an original byte to its internal code, 0 if absent or reserved.
    #[inline(always)]
    pub fn map(&self, c: u8) -> u8 {
        self.remap[c as usize]
    }

    /// Maps an internal code back to the original byte.
    #[inline(always)]
    pub fn unmap(&self, c: u8) -> u8 {
        self.remap_inv[c as usize]
    }

    /// Returns the effective alphabet size (largest internal code).
    #[inline(always)]
    pub const fn sigma(&self) -> usize {
        self.sigma
    }

    /// Returns the original bytes present in the text, ascending.
    pub fn chars(&self) -> Vec<u8> {
        (2..=self.sigma).map(|c| self.remap_inv[c]).collect()
    }
}

impl Serializable for AlphabetMap {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.sigma.serialize_into(&mut writer)?;
        mem += self.remap.serialize_into(&mut writer)?;
        mem += self.remap_inv.serialize_into(&mut writer)?;
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let sigma = usize::deserialize_from(&mut reader)?;
        let remap = <[u8; 256]>::deserialize_from(&mut reader)?;
        let remap_inv = <[u8; 256]>::deserialize_from(&mut reader)?;
        Ok(Self {
            remap,
            remap_inv,
            sigma,
        })
    }

    fn size_in_bytes(&self) -> usize {
        self.sigma.size_in_bytes() + self.remap.size_in_bytes() + self.remap_inv.size_in_bytes()
    }
}
