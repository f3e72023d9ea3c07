use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};
use num_bigint::BigUint;

use crate::errors::{Error, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// Largest MPI we accept, in bits.
const MAX_EXTERN_MPI_BITS: u16 = 16384;

/// A multi-precision integer: a big-endian byte string without leading zeros.
///
/// On the wire it is prefixed by its length in bits, as a 2-byte big-endian number.
#[derive(Default, Clone, PartialEq, Eq, derive_more::Debug)]
pub struct MpiBytes(#[debug("{}", hex::encode(_0))] Bytes);

impl MpiBytes {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses a length-prefixed MPI.
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let len_bits = i.read_be_u16()?;

        if len_bits > MAX_EXTERN_MPI_BITS {
            return Err(Error::InvalidInput);
        }

        let len_bytes = (len_bits + 7) >> 3;
        let n = i.read_take(usize::from(len_bytes))?;
        let n_stripped = strip_leading_zeros(&n);
        let n_stripped = n.slice_ref(n_stripped);

        Ok(MpiBytes(n_stripped))
    }

    /// Wraps `raw`, which carries no length prefix. Leading zeros are removed.
    pub fn from_slice(raw: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(strip_leading_zeros(raw)))
    }

    /// Number of significant bits.
    pub fn bits(&self) -> usize {
        bit_size(&self.0)
    }
}

#[inline]
fn bit_size(val: &[u8]) -> usize {
    match val.first() {
        None => 0,
        Some(first) => (val.len() * 8) - first.leading_zeros() as usize,
    }
}

#[inline]
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    bytes
        .iter()
        .position(|b| b != &0)
        .map_or(&[], |offset| &bytes[offset..])
}

impl AsRef<[u8]> for MpiBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Serialize for MpiBytes {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        let size: u16 = self.bits().try_into()?;
        w.write_u16::<BigEndian>(size)?;
        w.write_all(&self.0)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + self.0.len()
    }
}

impl From<BigUint> for MpiBytes {
    fn from(other: BigUint) -> Self {
        (&other).into()
    }
}

impl From<&BigUint> for MpiBytes {
    fn from(other: &BigUint) -> Self {
        MpiBytes::from_slice(&other.to_bytes_be())
    }
}

impl From<&MpiBytes> for BigUint {
    fn from(other: &MpiBytes) -> Self {
        BigUint::from_bytes_be(other.as_ref())
    }
}

impl From<MpiBytes> for BigUint {
    fn from(other: MpiBytes) -> Self {
        (&other).into()
    }
}
