//! Reading primitives over [Buf], used by every packet body decoder.

use bytes::{Buf, Bytes};
use snafu::{Backtrace, Snafu};

/// Parsing errors
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{}: reading {:?}", context, typ))]
    TooShort {
        typ: Typ,
        context: &'static str,
        #[snafu(backtrace)]
        source: RemainingError,
    },
    #[snafu(display("expected {}, found {}", debug_bytes(expected), debug_bytes(&found[..])))]
    TagMismatch {
        expected: Vec<u8>,
        found: Bytes,
        context: &'static str,
        backtrace: Option<Backtrace>,
    },
}

impl Error {
    /// Returns true if the error indicates that the input was too short.
    pub fn is_incomplete(&self) -> bool {
        match self {
            Self::TooShort { .. } => true,
            Self::TagMismatch { .. } => false,
        }
    }
}

fn debug_bytes(b: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(b) {
        return s.to_string();
    }
    hex::encode(b)
}

#[derive(Debug, Snafu)]
#[snafu(display("needed {}, remaining {}", needed, remaining))]
pub struct RemainingError {
    pub needed: usize,
    pub remaining: usize,
    backtrace: Option<Backtrace>,
}

#[derive(Debug)]
pub enum Typ {
    U8,
    U16Be,
    U32Be,
    Array(usize),
    Take(usize),
    Tag(Vec<u8>),
}

pub trait BufParsing: Buf + Sized {
    fn read_u8(&mut self) -> Result<u8, Error> {
        self.ensure_remaining(1)
            .map_err(|e| too_short(Typ::U8, "read_u8", e))?;
        Ok(self.get_u8())
    }

    fn read_be_u16(&mut self) -> Result<u16, Error> {
        self.ensure_remaining(2)
            .map_err(|e| too_short(Typ::U16Be, "read_be_u16", e))?;
        Ok(self.get_u16())
    }

    fn read_be_u32(&mut self) -> Result<u32, Error> {
        self.ensure_remaining(4)
            .map_err(|e| too_short(Typ::U32Be, "read_be_u32", e))?;
        Ok(self.get_u32())
    }

    fn read_array<const C: usize>(&mut self) -> Result<[u8; C], Error> {
        self.ensure_remaining(C)
            .map_err(|e| too_short(Typ::Array(C), "read_array", e))?;
        let mut arr = [0u8; C];
        self.copy_to_slice(&mut arr);
        Ok(arr)
    }

    fn read_take(&mut self, size: usize) -> Result<Bytes, Error> {
        self.ensure_remaining(size)
            .map_err(|e| too_short(Typ::Take(size), "read_take", e))?;
        Ok(self.copy_to_bytes(size))
    }

    /// Consumes `tag` from the front of the buffer, failing if the bytes differ.
    fn read_tag(&mut self, tag: &[u8]) -> Result<(), Error> {
        let found = self
            .ensure_remaining(tag.len())
            .map_err(|e| too_short(Typ::Tag(tag.to_vec()), "read_tag", e))
            .map(|_| self.copy_to_bytes(tag.len()))?;
        if found.as_ref() != tag {
            return Err(Error::TagMismatch {
                expected: tag.to_vec(),
                found,
                context: "read_tag",
                backtrace: snafu::GenerateImplicitData::generate(),
            });
        }
        Ok(())
    }

    fn rest(&mut self) -> Bytes {
        let len = self.remaining();
        self.copy_to_bytes(len)
    }

    fn ensure_remaining(&self, size: usize) -> Result<(), RemainingError> {
        if self.remaining() < size {
            return Err(RemainingError {
                needed: size,
                remaining: self.remaining(),
                backtrace: snafu::GenerateImplicitData::generate(),
            });
        }

        Ok(())
    }
}

impl<B: Buf> BufParsing for B {}

fn too_short(typ: Typ, context: &'static str, source: RemainingError) -> Error {
    Error::TooShort {
        typ,
        context,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_reads() {
        let mut buf = Bytes::from_static(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
        assert_eq!(buf.read_u8().unwrap(), 0x01);
        assert_eq!(buf.read_be_u16().unwrap(), 0x0203);
        assert_eq!(buf.read_be_u32().unwrap(), 0x04050607);
        assert!(buf.read_u8().unwrap_err().is_incomplete());
    }

    #[test]
    fn test_take_past_end() {
        let mut buf = Bytes::from_static(b"abc");
        let err = buf.read_take(4).unwrap_err();
        match err {
            Error::TooShort { source, .. } => {
                assert_eq!(source.needed, 4);
                assert_eq!(source.remaining, 3);
            }
            e => panic!("unexpected error {e:?}"),
        }
        assert_eq!(buf.read_array::<3>().unwrap(), *b"abc");
    }

    #[test]
    fn test_read_tag() {
        let mut buf = Bytes::from_static(b"\xd3\x14rest");
        buf.read_tag(&[0xd3, 0x14]).unwrap();
        assert_eq!(buf.rest(), Bytes::from_static(b"rest"));

        let mut buf = Bytes::from_static(b"xy");
        assert!(!buf.read_tag(b"ab").unwrap_err().is_incomplete());
    }
}
