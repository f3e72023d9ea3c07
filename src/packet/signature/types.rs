use num_enum::{FromPrimitive, IntoPrimitive};

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::packet::signature::SignatureConfig;
use crate::packet::{PacketTrait, Subpacket, SubpacketData};
use crate::types::{CompressionAlgorithm, KeyId, MpiBytes, Tag, Timestamp};

/// Signature Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.2>
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct Signature {
    pub config: SignatureConfig,
    /// Left 16 bits of the signed hash value.
    #[debug("{}", hex::encode(signed_hash_value))]
    pub signed_hash_value: [u8; 2],
    /// The signature values, one MPI for RSA.
    pub signature: Vec<MpiBytes>,
}

impl Signature {
    pub fn from_config(
        config: SignatureConfig,
        signed_hash_value: [u8; 2],
        signature: Vec<MpiBytes>,
    ) -> Self {
        Signature {
            config,
            signed_hash_value,
            signature,
        }
    }

    pub fn version(&self) -> SignatureVersion {
        self.config.version
    }

    /// Returns what kind of signature this is.
    pub fn typ(&self) -> SignatureType {
        self.config.typ
    }

    pub fn hash_alg(&self) -> HashAlgorithm {
        self.config.hash_alg
    }

    pub fn pub_alg(&self) -> PublicKeyAlgorithm {
        self.config.pub_alg
    }

    /// Name of the public key algorithm, as used in signer and verifier tables.
    pub fn key_algorithm_name(&self) -> String {
        self.config.pub_alg.to_string()
    }

    /// Name of the hash algorithm, as used in signer and verifier tables.
    pub fn hash_algorithm_name(&self) -> String {
        self.config.hash_alg.to_string()
    }

    /// The bytes appended to the signed material before hashing.
    ///
    /// Computed from the current hashed subpackets on every call.
    pub fn trailer(&self) -> Result<Vec<u8>> {
        self.config.trailer()
    }

    pub fn is_certification(&self) -> bool {
        self.config.is_certification()
    }

    fn subpackets(&self) -> impl Iterator<Item = &Subpacket> {
        self.config.subpackets()
    }

    fn find<'a, T, F>(&'a self, f: F) -> Option<T>
    where
        F: Fn(&'a SubpacketData) -> Option<T>,
    {
        self.subpackets().find_map(|p| f(&p.data))
    }

    pub fn created(&self) -> Option<Timestamp> {
        self.config.created()
    }

    /// The issuer, either from the v3 header or the first issuer subpacket.
    pub fn issuer(&self) -> Option<KeyId> {
        self.config.issuer()
    }

    /// The issuer of this signature or of an embedded back signature.
    pub fn issuers(&self) -> Vec<KeyId> {
        let mut ids: Vec<KeyId> = self.issuer().into_iter().collect();
        if let Some(embedded) = self.embedded_signature() {
            ids.extend(embedded.issuer());
        }
        ids
    }

    /// Seconds after the key creation time in which the key expires.
    pub fn key_expiration_time(&self) -> Option<u32> {
        self.find(|d| match d {
            SubpacketData::KeyExpirationTime(secs) => Some(*secs),
            _ => None,
        })
    }

    /// Seconds after the signature creation time in which the signature expires.
    pub fn signature_expiration_time(&self) -> Option<u32> {
        self.find(|d| match d {
            SubpacketData::SignatureExpirationTime(secs) => Some(*secs),
            _ => None,
        })
    }

    pub fn key_flags(&self) -> KeyFlags {
        self.find(|d| match d {
            SubpacketData::KeyFlags(flags) => Some(KeyFlags::from(&flags[..])),
            _ => None,
        })
        .unwrap_or_default()
    }

    pub fn preferred_symmetric_algs(&self) -> &[SymmetricKeyAlgorithm] {
        self.find(|d| match d {
            SubpacketData::PreferredSymmetricAlgorithms(algs) => Some(&algs[..]),
            _ => None,
        })
        .unwrap_or(&[][..])
    }

    pub fn preferred_hash_algs(&self) -> &[HashAlgorithm] {
        self.find(|d| match d {
            SubpacketData::PreferredHashAlgorithms(algs) => Some(&algs[..]),
            _ => None,
        })
        .unwrap_or(&[][..])
    }

    pub fn preferred_compression_algs(&self) -> &[CompressionAlgorithm] {
        self.find(|d| match d {
            SubpacketData::PreferredCompressionAlgorithms(algs) => Some(&algs[..]),
            _ => None,
        })
        .unwrap_or(&[][..])
    }

    pub fn key_server_prefs(&self) -> &[u8] {
        self.find(|d| match d {
            SubpacketData::KeyServerPreferences(prefs) => Some(&prefs[..]),
            _ => None,
        })
        .unwrap_or(&[][..])
    }

    pub fn features(&self) -> &[u8] {
        self.find(|d| match d {
            SubpacketData::Features(features) => Some(&features[..]),
            _ => None,
        })
        .unwrap_or(&[][..])
    }

    pub fn revocation_reason(&self) -> Option<(RevocationCode, &[u8])> {
        self.find(|d| match d {
            SubpacketData::RevocationReason(code, reason) => Some((*code, &reason[..])),
            _ => None,
        })
    }

    pub fn is_primary(&self) -> bool {
        self.find(|d| match d {
            SubpacketData::IsPrimary(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(false)
    }

    pub fn is_revocable(&self) -> bool {
        self.find(|d| match d {
            SubpacketData::Revocable(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(true)
    }

    pub fn exportable_certification(&self) -> bool {
        self.find(|d| match d {
            SubpacketData::ExportableCertification(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(true)
    }

    pub fn embedded_signature(&self) -> Option<&Signature> {
        self.find(|d| match d {
            SubpacketData::EmbeddedSignature(sig) => Some(&**sig),
            _ => None,
        })
    }

    pub fn preferred_key_server(&self) -> Option<&[u8]> {
        self.find(|d| match d {
            SubpacketData::PreferredKeyServer(server) => Some(&server[..]),
            _ => None,
        })
    }

    pub fn policy_uri(&self) -> Option<&[u8]> {
        self.find(|d| match d {
            SubpacketData::PolicyURI(uri) => Some(&uri[..]),
            _ => None,
        })
    }

    pub fn signers_userid(&self) -> Option<&[u8]> {
        self.find(|d| match d {
            SubpacketData::SignersUserID(id) => Some(&id[..]),
            _ => None,
        })
    }

    /// Depth and amount of a trust signature.
    pub fn trust_signature(&self) -> Option<(u8, u8)> {
        self.find(|d| match d {
            SubpacketData::TrustSignature(depth, value) => Some((*depth, *value)),
            _ => None,
        })
    }

    pub fn regular_expression(&self) -> Option<&[u8]> {
        self.find(|d| match d {
            SubpacketData::RegularExpression(re) => Some(&re[..]),
            _ => None,
        })
    }

    pub fn revocation_key(&self) -> Option<&RevocationKey> {
        self.find(|d| match d {
            SubpacketData::RevocationKey(key) => Some(key),
            _ => None,
        })
    }

    pub fn notations(&self) -> Vec<&Notation> {
        self.subpackets()
            .filter_map(|p| match &p.data {
                SubpacketData::Notation(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive, IntoPrimitive)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum SignatureVersion {
    /// Deprecated
    V2 = 2,
    V3 = 3,
    V4 = 4,

    #[num_enum(catch_all)]
    #[cfg_attr(test, proptest(skip))]
    Other(u8),
}

impl Default for SignatureVersion {
    fn default() -> Self {
        Self::V4
    }
}

/// Signature types.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.1>
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum SignatureType {
    /// Signature of a binary document.
    Binary = 0x00,
    /// Signature of a canonical text document, with `<CR><LF>` line endings.
    Text = 0x01,
    /// Signature of only its own subpacket contents.
    Standalone = 0x02,
    /// Generic certification of a User ID and Public-Key packet.
    CertGeneric = 0x10,
    /// Persona certification of a User ID and Public-Key packet.
    CertPersona = 0x11,
    /// Casual certification of a User ID and Public-Key packet.
    CertCasual = 0x12,
    /// Positive certification of a User ID and Public-Key packet.
    CertPositive = 0x13,
    /// The top-level key owns the subkey.
    SubkeyBinding = 0x18,
    /// The signing subkey is owned by the primary key.
    KeyBinding = 0x19,
    /// Signature directly on a key.
    Key = 0x1F,
    KeyRevocation = 0x20,
    SubkeyRevocation = 0x28,
    /// Revokes an earlier certification or direct key signature.
    CertRevocation = 0x30,
    Timestamp = 0x40,
    /// Signature over some other signature packet(s).
    ThirdParty = 0x50,

    #[num_enum(catch_all)]
    #[cfg_attr(test, proptest(skip))]
    Other(u8),
}

/// Key flags, the first octet of the key flags subpacket.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.3.21>
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct KeyFlags(u8);

impl KeyFlags {
    const CERTIFY: u8 = 0x01;
    const SIGN: u8 = 0x02;
    const ENCRYPT_COMMS: u8 = 0x04;
    const ENCRYPT_STORAGE: u8 = 0x08;
    const SHARED: u8 = 0x10;
    const AUTHENTICATION: u8 = 0x20;
    const GROUP: u8 = 0x80;

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn certify(self) -> bool {
        self.0 & Self::CERTIFY != 0
    }

    pub fn sign(self) -> bool {
        self.0 & Self::SIGN != 0
    }

    pub fn encrypt_comms(self) -> bool {
        self.0 & Self::ENCRYPT_COMMS != 0
    }

    pub fn encrypt_storage(self) -> bool {
        self.0 & Self::ENCRYPT_STORAGE != 0
    }

    pub fn shared(self) -> bool {
        self.0 & Self::SHARED != 0
    }

    pub fn authentication(self) -> bool {
        self.0 & Self::AUTHENTICATION != 0
    }

    pub fn group(self) -> bool {
        self.0 & Self::GROUP != 0
    }

    pub fn set_certify(&mut self, val: bool) {
        self.set(Self::CERTIFY, val);
    }

    pub fn set_sign(&mut self, val: bool) {
        self.set(Self::SIGN, val);
    }

    pub fn set_encrypt_comms(&mut self, val: bool) {
        self.set(Self::ENCRYPT_COMMS, val);
    }

    pub fn set_encrypt_storage(&mut self, val: bool) {
        self.set(Self::ENCRYPT_STORAGE, val);
    }

    fn set(&mut self, bit: u8, val: bool) {
        if val {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

impl From<&[u8]> for KeyFlags {
    fn from(other: &[u8]) -> Self {
        KeyFlags(other.first().copied().unwrap_or_default())
    }
}

impl From<KeyFlags> for Vec<u8> {
    fn from(flags: KeyFlags) -> Self {
        vec![flags.0]
    }
}

/// Notation data: flags, name and value.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Notation {
    pub flags: [u8; 4],
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

impl Notation {
    pub fn is_human_readable(&self) -> bool {
        self.flags[0] & 0x80 != 0
    }
}

/// A key that is allowed to revoke the issuing key.
#[derive(derive_more::Debug, PartialEq, Eq, Clone)]
pub struct RevocationKey {
    /// 0x80 must be set, 0x40 marks the information as sensitive.
    pub class: u8,
    pub algorithm: PublicKeyAlgorithm,
    #[debug("{}", hex::encode(fingerprint))]
    pub fingerprint: [u8; 20],
}

/// Codes for revocation reasons.
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum RevocationCode {
    /// No reason specified (key revocations or cert revocations)
    NoReason = 0,
    /// Key is superseded (key revocations)
    KeySuperseded = 1,
    /// Key material has been compromised (key revocations)
    KeyCompromised = 2,
    /// Key is retired and no longer used (key revocations)
    KeyRetired = 3,
    /// User ID information is no longer valid (cert revocations)
    CertUserIdInvalid = 32,

    #[num_enum(catch_all)]
    Other(u8),
}

impl PacketTrait for Signature {
    fn tag(&self) -> Tag {
        Tag::Signature
    }
}
