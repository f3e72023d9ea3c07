use std::io;

use bytes::{Buf, Bytes};
use log::warn;

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// PGP as UTF-8 octets.
const PGP: [u8; 3] = [0x50, 0x47, 0x50];

/// Marker Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.8>
///
/// The body is kept as found, even when it is not the expected `PGP`.
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct Marker {
    #[debug("{}", hex::encode(data))]
    data: Bytes,
}

impl Default for Marker {
    fn default() -> Self {
        Marker {
            data: Bytes::from_static(&PGP),
        }
    }
}

impl Marker {
    pub fn from_buf<B: Buf>(mut i: B) -> Self {
        let data = i.rest();
        if data[..] != PGP[..] {
            warn!("unexpected marker packet body {}", hex::encode(&data));
        }
        Marker { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Serialize for Marker {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}

impl PacketTrait for Marker {
    fn tag(&self) -> Tag {
        Tag::Marker
    }
}
