use std::collections::BTreeMap;
use std::io;
use std::ops::Index;

use bytes::Bytes;
use log::debug;

use crate::armor::{self, ArmorOptions, BlockType, Headers};
use crate::errors::Result;
use crate::packet::{AnyKey, Packet, PacketParser, ParserOptions, Signature};
use crate::ser::Serialize;
use crate::types::{KeyDetails, KeyId, Timestamp};

/// Maximum number of nested compressed data layers unwrapped when grouping signatures.
pub const MAX_COMPRESSION_DEPTH: usize = 16;

/// An ordered sequence of packets.
///
/// Key rings, signed documents and encrypted messages all share this shape. Parsing is
/// permissive by default: trailing data that does not form a packet is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    packets: Vec<Packet>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses all packets in `input`, stopping silently at malformed data.
    pub fn from_bytes(input: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(input, ParserOptions::default())
    }

    pub fn from_bytes_with_options(input: &[u8], opts: ParserOptions) -> Result<Self> {
        let packets = PacketParser::with_options(Bytes::copy_from_slice(input), opts)
            .collect::<Result<Vec<_>>>()?;
        debug!("parsed {} packets", packets.len());

        Ok(Message { packets })
    }

    /// Parses an armored message. The checksum is not validated.
    pub fn from_armor(input: &str) -> Result<(Self, Headers)> {
        Self::from_armor_with_options(input, ArmorOptions::default(), ParserOptions::default())
    }

    pub fn from_armor_with_options(
        input: &str,
        armor_opts: ArmorOptions,
        parser_opts: ParserOptions,
    ) -> Result<(Self, Headers)> {
        let block = armor::decode(input.as_bytes(), armor_opts)?;
        debug!("dearmored {} ({} bytes)", block.typ, block.data.len());
        let msg = Self::from_bytes_with_options(&block.data, parser_opts)?;

        Ok((msg, block.headers))
    }

    /// Armors the serialized packets as a block of type `typ`.
    pub fn to_armored_string(
        &self,
        typ: BlockType,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<String> {
        let mut out = Vec::new();
        armor::write(self, typ, &mut out, headers, true)?;
        Ok(String::from_utf8(out).map_err(|e| e.utf8_error())?)
    }

    pub fn push(&mut self, packet: impl Into<Packet>) {
        self.packets.push(packet.into());
    }

    pub fn get(&self, index: usize) -> Option<&Packet> {
        self.packets.get(index)
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Packet> {
        self.packets.iter()
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn into_packets(self) -> Vec<Packet> {
        self.packets
    }

    /// If the message starts with compressed data, the message contained in it.
    pub fn decompressed(&self) -> Result<Option<Message>> {
        match self.packets.first() {
            Some(Packet::CompressedData(data)) => {
                let inner = data.decompress()?;
                Ok(Some(Message::from_bytes(&inner)?))
            }
            _ => Ok(None),
        }
    }

    /// All key packets, primary keys and subkeys.
    pub fn keys(&self) -> impl Iterator<Item = AnyKey<'_>> {
        self.packets.iter().filter_map(Packet::as_key)
    }

    /// Finds a key by a case insensitive suffix of its hex fingerprint.
    ///
    /// `None` or an empty id selects the first key packet.
    pub fn find_key(&self, id: Option<&str>) -> Option<AnyKey<'_>> {
        let id = id.unwrap_or_default();
        self.keys()
            .find(|key| id.is_empty() || key.fingerprint().matches_hex_suffix(id))
    }

    /// Signatures made by the key with id `key_id` that follow that key packet.
    ///
    /// Packets between the key and its first self signature are skipped, the scan ends
    /// at the first non signature packet after that.
    pub fn self_signatures(&self, key_id: &KeyId) -> Vec<&Signature> {
        let Some(start) = self
            .packets
            .iter()
            .position(|p| p.as_key().is_some_and(|k| &k.key_id() == key_id))
        else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for packet in &self.packets[start + 1..] {
            match packet {
                Packet::Signature(sig) if is_issued_by(sig, key_id) => found.push(sig),
                Packet::Signature(_) => {}
                _ if !found.is_empty() => break,
                _ => {}
            }
        }
        found
    }

    /// When the key with id `key_id` expires, based on its first self signature that
    /// carries a key expiration time. `None` if it does not expire or is not found.
    pub fn key_expiration(&self, key_id: &KeyId) -> Option<Timestamp> {
        let key = self.keys().find(|k| &k.key_id() == key_id)?;
        let secs = self
            .self_signatures(key_id)
            .into_iter()
            .find_map(Signature::key_expiration_time)?;
        if secs == 0 {
            return None;
        }
        Some(key.created_at().saturating_add(secs))
    }
}

fn is_issued_by(sig: &Signature, key_id: &KeyId) -> bool {
    sig.issuers().contains(key_id)
        || sig
            .embedded_signature()
            .is_some_and(|embedded| embedded.issuers().contains(key_id))
}

impl Serialize for Message {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.packets.to_writer(writer)
    }

    fn write_len(&self) -> usize {
        self.packets.write_len()
    }
}

impl Index<usize> for Message {
    type Output = Packet;

    fn index(&self, index: usize) -> &Packet {
        &self.packets[index]
    }
}

impl IntoIterator for Message {
    type Item = Packet;
    type IntoIter = std::vec::IntoIter<Packet>;

    fn into_iter(self) -> Self::IntoIter {
        self.packets.into_iter()
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Packet;
    type IntoIter = std::slice::Iter<'a, Packet>;

    fn into_iter(self) -> Self::IntoIter {
        self.packets.iter()
    }
}

impl FromIterator<Packet> for Message {
    fn from_iter<I: IntoIterator<Item = Packet>>(iter: I) -> Self {
        Message {
            packets: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Packet>> for Message {
    fn from(packets: Vec<Packet>) -> Self {
        Message { packets }
    }
}
