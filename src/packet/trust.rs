use std::io;

use bytes::{Buf, Bytes};
use log::debug;

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// Trust Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.10>
///
/// The contents are implementation specific, so they are kept as raw bytes.
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct Trust {
    #[debug("{}", hex::encode(data))]
    data: Bytes,
}

impl Trust {
    pub fn from_buf<B: Buf>(mut i: B) -> Self {
        debug!("trust packet detected");
        Trust { data: i.rest() }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Serialize for Trust {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}

impl PacketTrait for Trust {
    fn tag(&self) -> Tag {
        Tag::Trust
    }
}
