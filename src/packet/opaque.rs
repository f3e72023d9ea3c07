use std::io;

use bytes::Bytes;

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::Tag;

/// A packet we keep as raw bytes: experimental and unknown tags, or known
/// tags whose body uses a version or algorithm we do not decode.
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct OpaquePacket {
    tag: Tag,
    #[debug("{}", hex::encode(body))]
    body: Bytes,
}

impl OpaquePacket {
    pub fn new(tag: Tag, body: Bytes) -> Self {
        OpaquePacket { tag, body }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Serialize for OpaquePacket {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.body)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.body.len()
    }
}

impl PacketTrait for OpaquePacket {
    fn tag(&self) -> Tag {
        self.tag
    }
}
