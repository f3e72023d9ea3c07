use bytes::{Buf, Bytes};
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, KeyId, Timestamp};

use super::{Notation, RevocationCode, RevocationKey, Signature};

/// Available signature subpacket types, without the critical bit.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.3.1>
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SubpacketType {
    SignatureCreationTime = 2,
    SignatureExpirationTime = 3,
    ExportableCertification = 4,
    TrustSignature = 5,
    RegularExpression = 6,
    Revocable = 7,
    KeyExpirationTime = 9,
    PreferredSymmetricAlgorithms = 11,
    RevocationKey = 12,
    Issuer = 16,
    Notation = 20,
    PreferredHashAlgorithms = 21,
    PreferredCompressionAlgorithms = 22,
    KeyServerPreferences = 23,
    PreferredKeyServer = 24,
    PrimaryUserId = 25,
    PolicyURI = 26,
    KeyFlags = 27,
    SignersUserID = 28,
    RevocationReason = 29,
    Features = 30,
    SignatureTarget = 31,
    EmbeddedSignature = 32,

    #[num_enum(catch_all)]
    Other(u8),
}

impl SubpacketType {
    /// The type octet, with the critical bit set if requested.
    pub fn as_u8(self, is_critical: bool) -> u8 {
        let raw: u8 = self.into();
        if is_critical {
            raw | 0b1000_0000
        } else {
            raw
        }
    }

    #[inline]
    pub fn from_u8(n: u8) -> (Self, bool) {
        let is_critical = (n >> 7) == 1;
        (Self::from(n & 0b0111_1111), is_critical)
    }

    /// Private or experimental range (100 to 110).
    pub fn is_experimental(self) -> bool {
        matches!(self, SubpacketType::Other(100..=110))
    }
}

/// Encoding of a subpacket length.
///
/// Parsed subpackets keep the form they were read with, so that the hashed area
/// is written back byte for byte.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum SubpacketLength {
    /// One octet, less than `192`.
    One(#[cfg_attr(test, proptest(strategy = "0u8..=191"))] u8),
    /// Two octets, `192` to `8383`.
    Two(#[cfg_attr(test, proptest(strategy = "192u16..=8383"))] u16),
    /// `0xFF` followed by four octets, any value.
    Five(u32),
}

impl SubpacketLength {
    pub(crate) fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let olen = i.read_u8()?;
        let len = match olen {
            0..=191 => Self::One(olen),
            192..=254 => {
                let a = i.read_u8()?;
                let l = ((olen as u16 - 192) << 8) + 192 + a as u16;
                Self::Two(l)
            }
            255 => Self::Five(i.read_be_u32()?),
        };
        Ok(len)
    }

    /// The minimal encoding of `len`.
    pub(crate) fn encode(len: u32) -> Self {
        match len {
            0..=191 => Self::One(len as u8),
            192..=8383 => Self::Two(len as u16),
            _ => Self::Five(len),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::One(l) => *l as usize,
            Self::Two(l) => *l as usize,
            Self::Five(l) => *l as usize,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Subpacket {
    pub is_critical: bool,
    pub data: SubpacketData,
    pub len: SubpacketLength,
}

impl Subpacket {
    /// Construct a new regular subpacket.
    pub fn regular(data: SubpacketData) -> Result<Self> {
        Self::new(false, data)
    }

    /// Construct a new critical subpacket.
    pub fn critical(data: SubpacketData) -> Result<Self> {
        Self::new(true, data)
    }

    fn new(is_critical: bool, data: SubpacketData) -> Result<Self> {
        let raw_len = (data.write_len() + 1).try_into()?;
        Ok(Subpacket {
            is_critical,
            data,
            len: SubpacketLength::encode(raw_len),
        })
    }

    pub fn typ(&self) -> SubpacketType {
        self.data.typ()
    }
}

/// Decoded subpacket bodies.
///
/// Bodies that do not decode, or that would not be written back identically, are
/// kept as [`SubpacketData::Other`].
#[derive(derive_more::Debug, PartialEq, Eq, Clone)]
pub enum SubpacketData {
    /// The time the signature was made.
    SignatureCreationTime(Timestamp),
    /// Seconds after creation in which the signature expires, `0` for never.
    SignatureExpirationTime(u32),
    /// Seconds after the key creation in which the key expires, `0` for never.
    KeyExpirationTime(u32),
    /// The key id of the key issuing the signature.
    Issuer(KeyId),
    PreferredSymmetricAlgorithms(Vec<SymmetricKeyAlgorithm>),
    PreferredHashAlgorithms(Vec<HashAlgorithm>),
    PreferredCompressionAlgorithms(Vec<CompressionAlgorithm>),
    KeyServerPreferences(#[debug("{}", hex::encode(_0))] Bytes),
    KeyFlags(#[debug("{}", hex::encode(_0))] Bytes),
    Features(#[debug("{}", hex::encode(_0))] Bytes),
    RevocationReason(RevocationCode, Bytes),
    IsPrimary(bool),
    Revocable(bool),
    EmbeddedSignature(Box<Signature>),
    PreferredKeyServer(Bytes),
    Notation(Notation),
    RevocationKey(RevocationKey),
    SignersUserID(Bytes),
    PolicyURI(Bytes),
    /// Depth and trust amount.
    TrustSignature(u8, u8),
    RegularExpression(Bytes),
    ExportableCertification(bool),
    SignatureTarget(
        PublicKeyAlgorithm,
        HashAlgorithm,
        #[debug("{}", hex::encode(_2))] Bytes,
    ),
    Other(u8, #[debug("{}", hex::encode(_1))] Bytes),
}

impl SubpacketData {
    pub fn typ(&self) -> SubpacketType {
        match self {
            Self::SignatureCreationTime(_) => SubpacketType::SignatureCreationTime,
            Self::SignatureExpirationTime(_) => SubpacketType::SignatureExpirationTime,
            Self::KeyExpirationTime(_) => SubpacketType::KeyExpirationTime,
            Self::Issuer(_) => SubpacketType::Issuer,
            Self::PreferredSymmetricAlgorithms(_) => SubpacketType::PreferredSymmetricAlgorithms,
            Self::PreferredHashAlgorithms(_) => SubpacketType::PreferredHashAlgorithms,
            Self::PreferredCompressionAlgorithms(_) => {
                SubpacketType::PreferredCompressionAlgorithms
            }
            Self::KeyServerPreferences(_) => SubpacketType::KeyServerPreferences,
            Self::KeyFlags(_) => SubpacketType::KeyFlags,
            Self::Features(_) => SubpacketType::Features,
            Self::RevocationReason(..) => SubpacketType::RevocationReason,
            Self::IsPrimary(_) => SubpacketType::PrimaryUserId,
            Self::Revocable(_) => SubpacketType::Revocable,
            Self::EmbeddedSignature(_) => SubpacketType::EmbeddedSignature,
            Self::PreferredKeyServer(_) => SubpacketType::PreferredKeyServer,
            Self::Notation(_) => SubpacketType::Notation,
            Self::RevocationKey(_) => SubpacketType::RevocationKey,
            Self::SignersUserID(_) => SubpacketType::SignersUserID,
            Self::PolicyURI(_) => SubpacketType::PolicyURI,
            Self::TrustSignature(..) => SubpacketType::TrustSignature,
            Self::RegularExpression(_) => SubpacketType::RegularExpression,
            Self::ExportableCertification(_) => SubpacketType::ExportableCertification,
            Self::SignatureTarget(..) => SubpacketType::SignatureTarget,
            Self::Other(n, _) => SubpacketType::from(*n),
        }
    }
}
