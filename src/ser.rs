//! # Serialization
//!
//! Everything that ends up on the wire implements [`Serialize`]: packet bodies, whole packets
//! with their headers, and packet sequences.

use std::io;

use crate::errors::Result;

pub trait Serialize {
    /// Writes the encoded form to `writer`.
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()>;

    /// Exact number of bytes [`Serialize::to_writer`] produces.
    fn write_len(&self) -> usize;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.write_len());
        self.to_writer(&mut out)?;
        Ok(out)
    }
}

impl<T: Serialize + ?Sized> Serialize for &T {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        T::to_writer(self, writer)
    }

    fn write_len(&self) -> usize {
        T::write_len(self)
    }
}

/// Elements are written back to back.
impl<T: Serialize> Serialize for [T] {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.iter().try_for_each(|item| item.to_writer(writer))
    }

    fn write_len(&self) -> usize {
        self.iter().map(Serialize::write_len).sum()
    }
}

impl<T: Serialize> Serialize for Vec<T> {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.as_slice().to_writer(writer)
    }

    fn write_len(&self) -> usize {
        self.as_slice().write_len()
    }
}
