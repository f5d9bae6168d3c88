//! Serialization framework for the index and its components.
//!
//! Every structure written to disk is self-delimiting: it prefixes its
//! payload with whatever metadata (lengths, bit widths) is needed to read it
//! back without external context. Integers are written in fixed-width
//! little-endian form; the on-disk format targets 64-bit hosts and is not
//! portable to other word sizes.
#![cfg(target_pointer_width = "64")]

use std::io::{Read, Write};

use anyhow::Result;

/// Trait to serialize/deserialize data structures.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use br_index::Serializable;
///
/// let mut bytes = vec![];
/// let size = 531usize.serialize_into(&mut bytes)?;
/// assert_eq!(usize::deserialize_from(&bytes[..])?, 531);
/// assert_eq!(size, bytes.len());
/// # Ok(())
/// # }
/// ```
pub trait Serializable: Sized {
    /// Serializes the data structure into the writer,
    /// returning the number of serialized bytes.
    fn serialize_into<W: Write>(&self, writer: W) -> Result<usize>;

    /// Deserializes the data structure from the reader.
    fn deserialize_from<R: Read>(reader: R) -> Result<Self>;

    /// Returns the number of bytes to serialize the data structure.
    fn size_in_bytes(&self) -> usize;
}

macro_rules! int_def {
    ($int:ident) => {
        impl Serializable for $int {
            fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
                writer.write_all(&self.to_le_bytes())?;
                Ok(std::mem::size_of::<Self>())
            }

            fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
                let mut buf = [0; std::mem::size_of::<Self>()];
                reader.read_exact(&mut buf)?;
                Ok(Self::from_le_bytes(buf))
            }

            fn size_in_bytes(&self) -> usize {
                std::mem::size_of::<Self>()
            }
        }
    };
}

int_def!(u8);
int_def!(u16);
int_def!(u32);
int_def!(u64);
int_def!(usize);

impl Serializable for bool {
    fn serialize_into<W: Write>(&self, writer: W) -> Result<usize> {
        (*self as u8).serialize_into(writer)
    }

    fn deserialize_from<R: Read>(reader: R) -> Result<Self> {
        u8::deserialize_from(reader).map(|x| x != 0)
    }

    fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<u8>()
    }
}

impl<T: Serializable> Serializable for Option<T> {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.is_some().serialize_into(&mut writer)?;
        if let Some(x) = self {
            mem += x.serialize_into(&mut writer)?;
        }
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        if bool::deserialize_from(&mut reader)? {
            Ok(Some(T::deserialize_from(&mut reader)?))
        } else {
            Ok(None)
        }
    }

    fn size_in_bytes(&self) -> usize {
        1 + self.as_ref().map_or(0, |x| x.size_in_bytes())
    }
}

impl<T: Serializable> Serializable for Vec<T> {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.len().serialize_into(&mut writer)?;
        for x in self {
            mem += x.serialize_into(&mut writer)?;
        }
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let len = usize::deserialize_from(&mut reader)?;
        let mut vec = Vec::with_capacity(len);
        for _ in 0..len {
            vec.push(T::deserialize_from(&mut reader)?);
        }
        Ok(vec)
    }

    fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<usize>() + self.iter().map(|x| x.size_in_bytes()).sum::<usize>()
    }
}

impl Serializable for [u8; 256] {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        writer.write_all(self)?;
        Ok(256)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0; 256];
        reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn size_in_bytes(&self) -> usize {
        256
    }
}
