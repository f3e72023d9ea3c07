use std::io;

use bytes::Buf;

use crate::errors::{ensure_eq, Result};
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// Modification Detection Code Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.14>
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct ModDetectionCode {
    /// 20 byte SHA1 hash of the preceding plaintext data.
    #[debug("{}", hex::encode(hash))]
    hash: [u8; 20],
}

impl ModDetectionCode {
    pub fn new(hash: [u8; 20]) -> Self {
        ModDetectionCode { hash }
    }

    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        ensure_eq!(i.remaining(), 20, "invalid mdc length");
        let hash = i.read_array::<20>()?;

        Ok(ModDetectionCode { hash })
    }

    pub fn hash(&self) -> &[u8; 20] {
        &self.hash
    }
}

impl Serialize for ModDetectionCode {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.hash[..])?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        20
    }
}

impl PacketTrait for ModDetectionCode {
    fn tag(&self) -> Tag {
        Tag::ModDetectionCode
    }
}
