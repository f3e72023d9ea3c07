use byteorder::{BigEndian, WriteBytesExt};
use bytes::Buf;
use log::debug;

use crate::errors::{bail, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, PacketLength, Tag};

/// Represents a packet header.
///
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-4.2>
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    version: PacketHeaderVersion,
    tag: Tag,
    length: PacketLength,
}

impl PacketHeader {
    /// Parse a single packet header from the given buffer.
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let header = i.read_u8()?;

        match header & 0b1100_0000 {
            0b1100_0000 => {
                // new format: tag in bits 0-5
                let tag = Tag::from(header & 0b0011_1111);
                let length = PacketLength::from_buf(&mut i)?;
                Ok(PacketHeader {
                    version: PacketHeaderVersion::New,
                    tag,
                    length,
                })
            }
            0b1000_0000 => {
                // old format: tag in bits 2-5, length type in bits 0-1
                let tag = Tag::from((header >> 2) & 0b0000_1111);
                let length = match header & 0b0000_0011 {
                    0 => PacketLength::Fixed(i.read_u8()?.into()),
                    1 => PacketLength::Fixed(i.read_be_u16()?.into()),
                    2 => PacketLength::Fixed(i.read_be_u32()?),
                    _ => PacketLength::Indeterminate,
                };
                Ok(PacketHeader {
                    version: PacketHeaderVersion::Old,
                    tag,
                    length,
                })
            }
            _ => {
                bail!("invalid packet header {:#010b}", header);
            }
        }
    }

    /// Creates a `New` style header with a five octet length.
    pub fn new_fixed(tag: Tag, length: u32) -> Self {
        PacketHeader {
            version: PacketHeaderVersion::New,
            tag,
            length: PacketLength::Fixed(length),
        }
    }

    pub const fn version(&self) -> PacketHeaderVersion {
        self.version
    }

    pub fn packet_length(&self) -> PacketLength {
        self.length
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }
}

/// Headers are always written in the new format. Fixed lengths use the five octet form.
impl Serialize for PacketHeader {
    fn to_writer<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
        debug!("writing packet header {:?}", self);

        writer.write_u8(self.tag.encode())?;
        match self.length {
            PacketLength::Fixed(len) => {
                writer.write_u8(0xFF)?;
                writer.write_u32::<BigEndian>(len)?;
            }
            PacketLength::Partial(len) => {
                if len.count_ones() != 1 || len > 1 << 30 {
                    bail!("invalid partial length {}", len);
                }
                writer.write_u8(224 + len.trailing_zeros() as u8)?;
            }
            PacketLength::Indeterminate => {
                bail!("indeterminate lengths can not be written in new style headers");
            }
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        match self.length {
            PacketLength::Fixed(_) => 6,
            _ => 2,
        }
    }
}
