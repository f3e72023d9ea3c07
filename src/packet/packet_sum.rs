use std::io;

use bytes::Bytes;
use log::debug;

use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::packet::{
    CompressedData, LiteralData, Marker, ModDetectionCode, OnePassSignature, OpaquePacket,
    PacketHeader, PublicKey, PublicKeyEncryptedSessionKey, PublicSubkey, SecretKey, SecretSubkey,
    Signature, SymEncryptedData, SymEncryptedProtectedData, SymKeyEncryptedSessionKey, Trust,
    UserAttribute, UserId,
};
use crate::ser::Serialize;
use crate::types::{Fingerprint, KeyDetails, KeyVersion, PublicParams, Tag, Timestamp};

/// Represents a Packet. A packet is the record structure used to encode a chunk of data in OpenPGP.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-4>
#[derive(Debug, PartialEq, Eq, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum Packet {
    CompressedData(CompressedData),
    PublicKey(PublicKey),
    PublicSubkey(PublicSubkey),
    SecretKey(SecretKey),
    SecretSubkey(SecretSubkey),
    LiteralData(LiteralData),
    Marker(Marker),
    ModDetectionCode(ModDetectionCode),
    OnePassSignature(OnePassSignature),
    PublicKeyEncryptedSessionKey(PublicKeyEncryptedSessionKey),
    Signature(Signature),
    SymEncryptedData(SymEncryptedData),
    SymEncryptedProtectedData(SymEncryptedProtectedData),
    SymKeyEncryptedSessionKey(SymKeyEncryptedSessionKey),
    Trust(Trust),
    UserAttribute(UserAttribute),
    UserId(UserId),
    /// Experimental and unknown tags, and bodies using versions or algorithms we do not decode.
    Other(OpaquePacket),
}

crate::util::impl_try_from_into!(
    Packet,
    CompressedData => CompressedData,
    PublicKey => PublicKey,
    PublicSubkey => PublicSubkey,
    SecretKey => SecretKey,
    SecretSubkey => SecretSubkey,
    LiteralData => LiteralData,
    Marker => Marker,
    ModDetectionCode => ModDetectionCode,
    OnePassSignature => OnePassSignature,
    PublicKeyEncryptedSessionKey => PublicKeyEncryptedSessionKey,
    Signature => Signature,
    SymEncryptedData => SymEncryptedData,
    SymEncryptedProtectedData => SymEncryptedProtectedData,
    SymKeyEncryptedSessionKey => SymKeyEncryptedSessionKey,
    Trust => Trust,
    UserAttribute => UserAttribute,
    UserId => UserId,
    Other => OpaquePacket
);

impl Packet {
    /// Decodes a fully assembled packet body.
    ///
    /// Bodies that use a version or algorithm we do not support are kept as [`OpaquePacket`].
    pub fn from_body(tag: Tag, body: Bytes) -> Result<Self> {
        match Self::decode_body(tag, body.clone()) {
            Ok(packet) => Ok(packet),
            Err(Error::Unsupported { message }) => {
                debug!("keeping {:?} packet opaque: {}", tag, message);
                Ok(Packet::Other(OpaquePacket::new(tag, body)))
            }
            Err(err) => Err(Error::InvalidPacketContent {
                tag,
                source: Box::new(err),
            }),
        }
    }

    fn decode_body(tag: Tag, mut body: Bytes) -> Result<Self> {
        let packet = match tag {
            Tag::PublicKeyEncryptedSessionKey => {
                PublicKeyEncryptedSessionKey::try_from_buf(&mut body)?.into()
            }
            Tag::Signature => Signature::try_from_buf(&mut body)?.into(),
            Tag::SymKeyEncryptedSessionKey => {
                SymKeyEncryptedSessionKey::try_from_buf(&mut body)?.into()
            }
            Tag::OnePassSignature => OnePassSignature::try_from_buf(&mut body)?.into(),
            Tag::SecretKey => SecretKey::try_from_buf(&mut body)?.into(),
            Tag::PublicKey => PublicKey::try_from_buf(&mut body)?.into(),
            Tag::SecretSubkey => SecretSubkey::try_from_buf(&mut body)?.into(),
            Tag::CompressedData => CompressedData::try_from_buf(&mut body)?.into(),
            Tag::SymEncryptedData => SymEncryptedData::from_buf(&mut body).into(),
            Tag::Marker => Marker::from_buf(&mut body).into(),
            Tag::LiteralData => LiteralData::try_from_buf(&mut body)?.into(),
            Tag::Trust => Trust::from_buf(&mut body).into(),
            Tag::UserId => UserId::from_buf(&mut body).into(),
            Tag::PublicSubkey => PublicSubkey::try_from_buf(&mut body)?.into(),
            Tag::UserAttribute => UserAttribute::from_buf(&mut body).into(),
            Tag::SymEncryptedProtectedData => {
                SymEncryptedProtectedData::try_from_buf(&mut body)?.into()
            }
            Tag::ModDetectionCode => ModDetectionCode::try_from_buf(&mut body)?.into(),
            Tag::Other(_) => OpaquePacket::new(tag, body).into(),
        };

        Ok(packet)
    }

    /// Returns a view of the packet as a key, if it is one of the four key packets.
    pub fn as_key(&self) -> Option<AnyKey<'_>> {
        match self {
            Self::PublicKey(k) => Some(AnyKey::PublicKey(k)),
            Self::PublicSubkey(k) => Some(AnyKey::PublicSubkey(k)),
            Self::SecretKey(k) => Some(AnyKey::SecretKey(k)),
            Self::SecretSubkey(k) => Some(AnyKey::SecretSubkey(k)),
            _ => None,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self, Self::PublicKey(_) | Self::SecretKey(_))
    }

    pub fn is_subkey(&self) -> bool {
        matches!(self, Self::PublicSubkey(_) | Self::SecretSubkey(_))
    }
}

/// Borrowed view of any of the four key packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyKey<'a> {
    PublicKey(&'a PublicKey),
    PublicSubkey(&'a PublicSubkey),
    SecretKey(&'a SecretKey),
    SecretSubkey(&'a SecretSubkey),
}

impl<'a> AnyKey<'a> {
    fn details(&self) -> &'a dyn KeyDetails {
        match *self {
            AnyKey::PublicKey(k) => k,
            AnyKey::PublicSubkey(k) => k,
            AnyKey::SecretKey(k) => k,
            AnyKey::SecretSubkey(k) => k,
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, AnyKey::SecretKey(_) | AnyKey::SecretSubkey(_))
    }

    pub fn secret(&self) -> Option<&'a SecretKey> {
        match *self {
            AnyKey::SecretKey(k) => Some(k),
            _ => None,
        }
    }

    pub fn secret_subkey(&self) -> Option<&'a SecretSubkey> {
        match *self {
            AnyKey::SecretSubkey(k) => Some(k),
            _ => None,
        }
    }
}

impl KeyDetails for AnyKey<'_> {
    fn version(&self) -> KeyVersion {
        self.details().version()
    }

    fn created_at(&self) -> Timestamp {
        self.details().created_at()
    }

    fn algorithm(&self) -> PublicKeyAlgorithm {
        self.details().algorithm()
    }

    fn public_params(&self) -> &PublicParams {
        self.details().public_params()
    }

    fn fingerprint(&self) -> Fingerprint {
        self.details().fingerprint()
    }

    fn fingerprint_material(&self) -> Result<Vec<u8>> {
        self.details().fingerprint_material()
    }
}

impl Serialize for Packet {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Self::CompressedData(p) => p.to_writer_with_header(writer),
            Self::PublicKey(p) => p.to_writer_with_header(writer),
            Self::PublicSubkey(p) => p.to_writer_with_header(writer),
            Self::SecretKey(p) => p.to_writer_with_header(writer),
            Self::SecretSubkey(p) => p.to_writer_with_header(writer),
            Self::LiteralData(p) => p.to_writer_with_header(writer),
            Self::Marker(p) => p.to_writer_with_header(writer),
            Self::ModDetectionCode(p) => p.to_writer_with_header(writer),
            Self::OnePassSignature(p) => p.to_writer_with_header(writer),
            Self::PublicKeyEncryptedSessionKey(p) => p.to_writer_with_header(writer),
            Self::Signature(p) => p.to_writer_with_header(writer),
            Self::SymEncryptedData(p) => p.to_writer_with_header(writer),
            Self::SymEncryptedProtectedData(p) => p.to_writer_with_header(writer),
            Self::SymKeyEncryptedSessionKey(p) => p.to_writer_with_header(writer),
            Self::Trust(p) => p.to_writer_with_header(writer),
            Self::UserAttribute(p) => p.to_writer_with_header(writer),
            Self::UserId(p) => p.to_writer_with_header(writer),
            Self::Other(p) => p.to_writer_with_header(writer),
        }
    }

    fn write_len(&self) -> usize {
        match self {
            Self::CompressedData(p) => p.write_len_with_header(),
            Self::PublicKey(p) => p.write_len_with_header(),
            Self::PublicSubkey(p) => p.write_len_with_header(),
            Self::SecretKey(p) => p.write_len_with_header(),
            Self::SecretSubkey(p) => p.write_len_with_header(),
            Self::LiteralData(p) => p.write_len_with_header(),
            Self::Marker(p) => p.write_len_with_header(),
            Self::ModDetectionCode(p) => p.write_len_with_header(),
            Self::OnePassSignature(p) => p.write_len_with_header(),
            Self::PublicKeyEncryptedSessionKey(p) => p.write_len_with_header(),
            Self::Signature(p) => p.write_len_with_header(),
            Self::SymEncryptedData(p) => p.write_len_with_header(),
            Self::SymEncryptedProtectedData(p) => p.write_len_with_header(),
            Self::SymKeyEncryptedSessionKey(p) => p.write_len_with_header(),
            Self::Trust(p) => p.write_len_with_header(),
            Self::UserAttribute(p) => p.write_len_with_header(),
            Self::UserId(p) => p.write_len_with_header(),
            Self::Other(p) => p.write_len_with_header(),
        }
    }
}

pub trait PacketTrait: Serialize {
    fn tag(&self) -> Tag;

    /// Write this packet including the packet header.
    ///
    /// The header is always a new style header with a five octet length.
    fn to_writer_with_header<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let len = self.write_len().try_into()?;
        PacketHeader::new_fixed(self.tag(), len).to_writer(writer)?;
        self.to_writer(writer)?;

        Ok(())
    }

    /// Length in bytes used when calling `to_writer_with_header`.
    fn write_len_with_header(&self) -> usize {
        6 + self.write_len()
    }
}

impl PacketTrait for Packet {
    fn tag(&self) -> Tag {
        match self {
            Self::CompressedData(p) => p.tag(),
            Self::PublicKey(p) => p.tag(),
            Self::PublicSubkey(p) => p.tag(),
            Self::SecretKey(p) => p.tag(),
            Self::SecretSubkey(p) => p.tag(),
            Self::LiteralData(p) => p.tag(),
            Self::Marker(p) => p.tag(),
            Self::ModDetectionCode(p) => p.tag(),
            Self::OnePassSignature(p) => p.tag(),
            Self::PublicKeyEncryptedSessionKey(p) => p.tag(),
            Self::Signature(p) => p.tag(),
            Self::SymEncryptedData(p) => p.tag(),
            Self::SymEncryptedProtectedData(p) => p.tag(),
            Self::SymKeyEncryptedSessionKey(p) => p.tag(),
            Self::Trust(p) => p.tag(),
            Self::UserAttribute(p) => p.tag(),
            Self::UserId(p) => p.tag(),
            Self::Other(p) => p.tag(),
        }
    }
}

impl<'a, T: 'a + PacketTrait> PacketTrait for &'a T {
    fn tag(&self) -> Tag {
        (*self).tag()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::crypto::hash::HashAlgorithm;
    use crate::packet::{PacketParser, SignatureType};
    use crate::types::KeyId;

    /// Writes `packet` with its header and parses it back.
    fn reparse(packet: &Packet) -> Packet {
        let bytes = packet.to_bytes().unwrap();
        let mut parser = PacketParser::new(Bytes::from(bytes));
        let back = parser.next().unwrap().unwrap();
        assert!(parser.next().is_none());
        back
    }

    #[test]
    fn test_unknown_tag_is_opaque() {
        let p = Packet::from_body(Tag::Other(61), Bytes::from_static(b"\x01\x02\x03")).unwrap();
        let Packet::Other(ref opaque) = p else {
            panic!("expected opaque packet");
        };
        assert_eq!(opaque.body(), b"\x01\x02\x03");
        assert_eq!(p.to_bytes().unwrap(), b"\xfd\xff\x00\x00\x00\x03\x01\x02\x03");
    }

    #[test]
    fn test_unsupported_version_is_opaque() {
        // a v5 one pass signature
        let p = Packet::from_body(Tag::OnePassSignature, Bytes::from_static(&[5, 0, 8, 1])).unwrap();
        assert_eq!(p.tag(), Tag::OnePassSignature);
        assert!(matches!(p, Packet::Other(_)));
    }

    #[test]
    fn test_malformed_body_errors() {
        let err = Packet::from_body(Tag::ModDetectionCode, Bytes::from_static(&[1, 2])).unwrap_err();
        assert!(matches!(err, Error::InvalidPacketContent { tag: Tag::ModDetectionCode, .. }));
    }

    #[test]
    fn test_try_from() {
        let p: Packet = UserId::new("me").into();
        let id: UserId = p.try_into().unwrap();
        assert_eq!(id.as_str(), Some("me"));

        let p: Packet = Marker::default().into();
        assert!(UserId::try_from(p).is_err());
    }

    proptest! {
        #[test]
        fn marker_roundtrip(data in proptest::collection::vec(any::<u8>(), 1..16)) {
            let p = Packet::from(Marker::from_buf(&data[..]));
            prop_assert_eq!(reparse(&p), p);
        }

        #[test]
        fn trust_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let p = Packet::from(Trust::from_buf(&data[..]));
            prop_assert_eq!(reparse(&p), p);
        }

        #[test]
        fn user_attribute_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let p = Packet::from(UserAttribute::from_buf(&data[..]));
            prop_assert_eq!(reparse(&p), p);
        }

        #[test]
        fn mdc_roundtrip(hash: [u8; 20]) {
            let p = Packet::from(ModDetectionCode::new(hash));
            prop_assert_eq!(reparse(&p), p);
        }

        #[test]
        fn one_pass_signature_roundtrip(typ: u8, hash: u8, alg: u8, key_id: [u8; 8], last: u8) {
            let mut ops = OnePassSignature::new(
                SignatureType::from(typ),
                HashAlgorithm::from(hash),
                PublicKeyAlgorithm::from(alg),
                KeyId::from(key_id),
            );
            ops.last = last;
            let p = Packet::from(ops);
            prop_assert_eq!(reparse(&p), p);
        }
    }
}
