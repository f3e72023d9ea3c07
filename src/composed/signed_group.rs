use byteorder::{BigEndian, WriteBytesExt};
use log::debug;

use crate::composed::{Message, MAX_COMPRESSION_DEPTH};
use crate::errors::{bail, format_err, Result};
use crate::normalize_lines::normalize_crlf;
use crate::packet::{
    AnyKey, LiteralData, Packet, PacketTrait, Signature, SignatureType, SignatureVersion, UserId,
    VerifierTable,
};
use crate::types::KeyDetails;

/// Signatures together with the packets they cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedGroup {
    /// Signatures directly on a primary key, e.g. key revocations.
    Key {
        key: Packet,
        signatures: Vec<Signature>,
    },
    /// Certifications of a user id.
    KeyUserId {
        key: Packet,
        user_id: UserId,
        signatures: Vec<Signature>,
    },
    /// Subkey bindings and revocations.
    KeySubkey {
        key: Packet,
        subkey: Packet,
        signatures: Vec<Signature>,
    },
    /// A signed document.
    Literal {
        literal: LiteralData,
        signatures: Vec<Signature>,
    },
}

impl SignedGroup {
    pub fn signatures(&self) -> &[Signature] {
        match self {
            Self::Key { signatures, .. }
            | Self::KeyUserId { signatures, .. }
            | Self::KeySubkey { signatures, .. }
            | Self::Literal { signatures, .. } => signatures,
        }
    }

    fn signatures_mut(&mut self) -> &mut Vec<Signature> {
        match self {
            Self::Key { signatures, .. }
            | Self::KeyUserId { signatures, .. }
            | Self::KeySubkey { signatures, .. }
            | Self::Literal { signatures, .. } => signatures,
        }
    }

    /// The primary key of key groups.
    pub fn key(&self) -> Option<AnyKey<'_>> {
        match self {
            Self::Key { key, .. } | Self::KeyUserId { key, .. } | Self::KeySubkey { key, .. } => {
                key.as_key()
            }
            Self::Literal { .. } => None,
        }
    }

    /// Reconstructs the bytes `signature` covers, without its trailer.
    pub fn signed_material(&self, signature: &Signature) -> Result<Vec<u8>> {
        self.material_for(signature.typ(), signature.version())
    }

    pub(super) fn material_for(
        &self,
        typ: SignatureType,
        version: SignatureVersion,
    ) -> Result<Vec<u8>> {
        match self {
            Self::Literal { literal, .. } => Ok(literal_material(literal, typ)),
            Self::Key { key, .. } => key_material(key),
            Self::KeyUserId { key, user_id, .. } => {
                let mut material = key_material(key)?;
                let id = user_id.id();
                // v3 signatures hash the bare user id
                if version == SignatureVersion::V4 {
                    material.push(0xB4);
                    material.write_u32::<BigEndian>(id.len().try_into()?)?;
                }
                material.extend_from_slice(id);
                Ok(material)
            }
            Self::KeySubkey { key, subkey, .. } => {
                let mut material = key_material(key)?;
                material.extend_from_slice(&key_material(subkey)?);
                Ok(material)
            }
        }
    }

    /// Checks a single signature against the material of this group.
    ///
    /// Missing verifiers and malformed groups count as not verified.
    pub fn verify_one(&self, signature: &Signature, verifiers: &VerifierTable<'_>) -> bool {
        match self.signed_material(signature) {
            Ok(material) => verifiers.verify(&material, signature),
            Err(err) => {
                debug!("cannot reconstruct signed material: {}", err);
                false
            }
        }
    }
}

/// Text signatures cover the data with `\r\n` line endings, all others the raw data.
pub(super) fn literal_material(literal: &LiteralData, typ: SignatureType) -> Vec<u8> {
    if typ == SignatureType::Text {
        normalize_crlf(literal.data())
    } else {
        literal.data().to_vec()
    }
}

fn key_material(packet: &Packet) -> Result<Vec<u8>> {
    packet
        .as_key()
        .ok_or_else(|| format_err!("not a key packet: {:?}", packet.tag()))?
        .fingerprint_material()
}

/// The scanning state of [`Message::signatures`].
#[derive(Default)]
struct GroupBuilder<'a> {
    primary: Option<&'a Packet>,
    open: Option<Open<'a>>,
    pending: Vec<Signature>,
    groups: Vec<SignedGroup>,
}

enum Open<'a> {
    Key,
    UserId(&'a UserId),
    Subkey(&'a Packet),
}

impl<'a> GroupBuilder<'a> {
    fn start(&mut self, open: Open<'a>) {
        self.flush();
        self.open = Some(open);
    }

    /// Emits the open group. Without a primary key nothing is emitted.
    fn flush(&mut self) {
        let signatures = std::mem::take(&mut self.pending);
        let (Some(primary), Some(open)) = (self.primary, self.open.take()) else {
            return;
        };
        let key = primary.clone();

        self.groups.push(match open {
            Open::Key => SignedGroup::Key { key, signatures },
            Open::UserId(user_id) => SignedGroup::KeyUserId {
                key,
                user_id: user_id.clone(),
                signatures,
            },
            Open::Subkey(subkey) => SignedGroup::KeySubkey {
                key,
                subkey: subkey.clone(),
                signatures,
            },
        });
    }

    fn finish(mut self) -> Vec<SignedGroup> {
        self.flush();
        self.groups
    }
}

impl Message {
    /// Groups the signatures of this message with the packets they cover.
    ///
    /// A message starting with compressed data is grouped by its contents. A message
    /// with literal data yields a single group holding every signature.
    ///
    /// Fails on more than [`MAX_COMPRESSION_DEPTH`] nested compressed layers.
    pub fn signatures(&self) -> Result<Vec<SignedGroup>> {
        let mut inner: Option<Message> = None;
        for _ in 0..=MAX_COMPRESSION_DEPTH {
            let msg = inner.as_ref().unwrap_or(self);
            match msg.decompressed()? {
                Some(next) => inner = Some(next),
                None => return Ok(msg.group_signatures()),
            }
        }

        bail!("more than {} nested compressed layers", MAX_COMPRESSION_DEPTH)
    }

    fn group_signatures(&self) -> Vec<SignedGroup> {
        let mut builder = GroupBuilder::default();
        for packet in self.iter() {
            match packet {
                Packet::LiteralData(literal) => {
                    let signatures = self
                        .iter()
                        .filter_map(|p| match p {
                            Packet::Signature(sig) => Some(sig.clone()),
                            _ => None,
                        })
                        .collect();
                    return vec![SignedGroup::Literal {
                        literal: literal.clone(),
                        signatures,
                    }];
                }
                Packet::PublicKey(_) | Packet::SecretKey(_) => {
                    builder.flush();
                    builder.primary = Some(packet);
                    builder.open = Some(Open::Key);
                }
                Packet::PublicSubkey(_) | Packet::SecretSubkey(_) => {
                    builder.start(Open::Subkey(packet))
                }
                Packet::UserId(user_id) => builder.start(Open::UserId(user_id)),
                Packet::Signature(sig) => builder.pending.push(sig.clone()),
                _ => {}
            }
        }

        builder.finish()
    }

    /// Every group with only the signatures that verify.
    pub fn verified_signatures(&self, verifiers: &VerifierTable<'_>) -> Result<Vec<SignedGroup>> {
        let mut groups = self.signatures()?;
        for group in &mut groups {
            let verified = group
                .signatures()
                .iter()
                .filter(|sig| group.verify_one(sig, verifiers))
                .cloned()
                .collect();
            *group.signatures_mut() = verified;
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::hash::HashAlgorithm;
    use crate::crypto::public_key::PublicKeyAlgorithm;
    use crate::packet::{CompressedData, SecretKey, SecretSubkey, SignatureConfig};
    use crate::types::{CompressionAlgorithm, MpiBytes, Timestamp};

    fn sig(typ: SignatureType, marker: u8) -> Signature {
        let config = SignatureConfig::new_v4(
            typ,
            PublicKeyAlgorithm::RSA,
            HashAlgorithm::Sha256,
            vec![],
            vec![],
        );
        Signature::from_config(config, [marker, 0], vec![MpiBytes::from_slice(&[marker])])
    }

    fn keys() -> (Packet, Packet, Packet) {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let created = Timestamp::from_secs(1_000);
        let primary = SecretKey::generate_rsa(&mut rng, 512, created).unwrap();
        let sub1 = SecretSubkey::generate_rsa(&mut rng, 512, created).unwrap();
        let sub2 = SecretSubkey::generate_rsa(&mut rng, 512, created).unwrap();
        (
            primary.public_key().into(),
            sub1.public_key().into(),
            sub2.public_key().into(),
        )
    }

    #[test]
    fn test_key_ring_groups() {
        let (primary, sub1, sub2) = keys();
        let msg: Message = vec![
            primary.clone(),
            Packet::from(sig(SignatureType::KeyRevocation, 1)),
            Packet::from(UserId::new("a")),
            Packet::from(sig(SignatureType::CertPositive, 2)),
            Packet::from(sig(SignatureType::CertGeneric, 3)),
            sub1.clone(),
            Packet::from(sig(SignatureType::SubkeyBinding, 4)),
            sub2.clone(),
            Packet::from(sig(SignatureType::SubkeyBinding, 5)),
        ]
        .into();

        let groups = msg.signatures().unwrap();
        assert_eq!(groups.len(), 4);

        assert!(matches!(&groups[0], SignedGroup::Key { key, signatures }
            if key == &primary && signatures.len() == 1));
        assert!(matches!(&groups[1], SignedGroup::KeyUserId { user_id, signatures, .. }
            if user_id.id() == b"a" && signatures.len() == 2));
        assert!(matches!(&groups[2], SignedGroup::KeySubkey { key, subkey, .. }
            if key == &primary && subkey == &sub1));
        // a subkey after a subkey stays bound to the primary key
        assert!(matches!(&groups[3], SignedGroup::KeySubkey { key, subkey, signatures }
            if key == &primary && subkey == &sub2 && signatures[0].signed_hash_value == [5, 0]));
    }

    #[test]
    fn test_orphans_form_no_group() {
        let (primary, sub1, _) = keys();
        let msg: Message = vec![
            Packet::from(UserId::new("orphan")),
            Packet::from(sig(SignatureType::CertPositive, 1)),
            sub1,
            Packet::from(sig(SignatureType::SubkeyBinding, 2)),
            primary,
        ]
        .into();

        let groups = msg.signatures().unwrap();
        assert_eq!(groups.len(), 1);
        assert!(matches!(&groups[0], SignedGroup::Key { signatures, .. } if signatures.is_empty()));
    }

    #[test]
    fn test_literal_collects_all_signatures() {
        let (primary, ..) = keys();
        let msg: Message = vec![
            Packet::from(sig(SignatureType::Binary, 1)),
            primary,
            Packet::from(LiteralData::from_bytes(b"doc")),
            Packet::from(sig(SignatureType::Binary, 2)),
        ]
        .into();

        let groups = msg.signatures().unwrap();
        assert_eq!(groups.len(), 1);
        let SignedGroup::Literal { literal, signatures } = &groups[0] else {
            panic!("expected literal group");
        };
        assert_eq!(literal.data(), b"doc");
        assert_eq!(signatures.len(), 2);
    }

    #[test]
    fn test_compressed_is_grouped_by_contents() {
        let inner = vec![
            Packet::from(sig(SignatureType::Binary, 1)),
            Packet::from(LiteralData::from_bytes(b"zipped")),
        ];
        let compressed = CompressedData::from_message(CompressionAlgorithm::ZLIB, &inner).unwrap();
        let msg: Message = vec![Packet::from(compressed)].into();

        let groups = msg.signatures().unwrap();
        assert!(matches!(&groups[..], [SignedGroup::Literal { literal, signatures }]
            if literal.data() == b"zipped" && signatures.len() == 1));
    }

    fn nested(layers: usize) -> Message {
        let mut packets = vec![Packet::from(LiteralData::from_bytes(b"deep"))];
        for _ in 0..layers {
            let c = CompressedData::from_message(CompressionAlgorithm::Uncompressed, &packets)
                .unwrap();
            packets = vec![c.into()];
        }
        packets.into()
    }

    #[test]
    fn test_compression_depth_limit() {
        let groups = nested(MAX_COMPRESSION_DEPTH).signatures().unwrap();
        assert!(matches!(&groups[..], [SignedGroup::Literal { literal, .. }]
            if literal.data() == b"deep"));

        assert!(nested(MAX_COMPRESSION_DEPTH + 1).signatures().is_err());
        // no stack exhaustion on deep nesting
        assert!(nested(2000).signatures().is_err());
    }

    #[test]
    fn test_userid_material() {
        let (primary, ..) = keys();
        let group = SignedGroup::KeyUserId {
            key: primary.clone(),
            user_id: UserId::new("abc"),
            signatures: vec![],
        };
        let material = group
            .signed_material(&sig(SignatureType::CertPositive, 0))
            .unwrap();
        let key_material = primary.as_key().unwrap().fingerprint_material().unwrap();

        assert_eq!(&material[..key_material.len()], &key_material[..]);
        assert_eq!(
            &material[key_material.len()..],
            &[0xB4, 0, 0, 0, 3, b'a', b'b', b'c']
        );
    }

    #[test]
    fn test_text_material_is_crlf() {
        let group = SignedGroup::Literal {
            literal: LiteralData::from_bytes(b"a\nb"),
            signatures: vec![],
        };
        assert_eq!(
            group.signed_material(&sig(SignatureType::Text, 0)).unwrap(),
            b"a\r\nb"
        );
        assert_eq!(
            group.signed_material(&sig(SignatureType::Binary, 0)).unwrap(),
            b"a\nb"
        );
    }

    #[test]
    fn test_missing_verifier_is_not_verified() {
        let group = SignedGroup::Literal {
            literal: LiteralData::from_bytes(b"x"),
            signatures: vec![sig(SignatureType::Binary, 0)],
        };
        assert!(!group.verify_one(&group.signatures()[0], &VerifierTable::new()));
    }
}
