use bytes::{Buf, Bytes, BytesMut};
use derive_builder::Builder;
use log::{debug, warn};

use crate::errors::{Error, Result};
use crate::packet::{Packet, PacketHeader};
use crate::parsing::BufParsing;
use crate::types::PacketLength;

/// Options for [`PacketParser`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Builder)]
#[builder(default, build_fn(error = "Error"))]
pub struct ParserOptions {
    /// Return an error for malformed data, instead of stopping silently.
    pub strict: bool,
}

/// Parses a stream of packets from an in memory buffer.
///
/// In the default permissive mode, parsing stops at the first malformed packet
/// and everything parsed before it is kept.
#[derive(Debug)]
pub struct PacketParser {
    inner: Bytes,
    opts: ParserOptions,
    done: bool,
}

impl PacketParser {
    pub fn new(inner: Bytes) -> Self {
        Self::with_options(inner, ParserOptions::default())
    }

    pub fn with_options(inner: Bytes, opts: ParserOptions) -> Self {
        PacketParser {
            inner,
            opts,
            done: false,
        }
    }

    fn next_packet(&mut self) -> Result<Packet> {
        let header = PacketHeader::from_buf(&mut self.inner)?;
        debug!("found header: {:?}", header);

        let body = match header.packet_length() {
            PacketLength::Fixed(len) => self.inner.read_take(len as usize)?,
            PacketLength::Indeterminate => self.inner.rest(),
            PacketLength::Partial(len) => self.read_partial(len)?,
        };

        Packet::from_body(header.tag(), body)
    }

    /// Collects the chunks of a packet using partial body lengths.
    ///
    /// Every chunk after the first starts with a bare length, the last one with a fixed length.
    fn read_partial(&mut self, first: u32) -> Result<Bytes> {
        let mut body = BytesMut::new();
        let mut len = first;
        loop {
            body.extend_from_slice(&self.inner.read_take(len as usize)?);
            match PacketLength::from_buf(&mut self.inner)? {
                PacketLength::Partial(l) => len = l,
                PacketLength::Fixed(l) => {
                    body.extend_from_slice(&self.inner.read_take(l as usize)?);
                    break;
                }
                PacketLength::Indeterminate => {
                    // never produced by new style length octets
                    return Err(Error::InvalidInput);
                }
            }
        }

        Ok(body.freeze())
    }
}

impl Iterator for PacketParser {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || !self.inner.has_remaining() {
            return None;
        }

        match self.next_packet() {
            Ok(packet) => Some(Ok(packet)),
            Err(err) => {
                self.done = true;
                if self.opts.strict {
                    Some(Err(err))
                } else {
                    warn!(
                        "stopping to parse packets, {} bytes left: {}",
                        self.inner.remaining(),
                        err
                    );
                    None
                }
            }
        }
    }
}
