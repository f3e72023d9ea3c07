use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// User Attribute Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.12>
///
/// Attribute subpackets (images) are not decoded.
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct UserAttribute {
    #[debug("{}", hex::encode(data))]
    data: Bytes,
}

impl UserAttribute {
    pub fn from_buf<B: Buf>(mut i: B) -> Self {
        UserAttribute { data: i.rest() }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Serialize for UserAttribute {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}

impl PacketTrait for UserAttribute {
    fn tag(&self) -> Tag {
        Tag::UserAttribute
    }
}
