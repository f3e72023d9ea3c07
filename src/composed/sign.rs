use bytes::Bytes;
use derive_builder::Builder;
use log::debug;

use crate::composed::signed_group::literal_material;
use crate::composed::{Message, SignedGroup};
use crate::crypto::hash::HashAlgorithm;
use crate::errors::{bail, Error, Result};
use crate::packet::{
    DataMode, KeyFlags, Packet, Signature, SignatureConfig, SignatureType,
    SignatureVersion, SignerTable, Subpacket, SubpacketData,
};
use crate::types::{KeyDetails, KeyId, Timestamp};

/// Options for creating signatures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(default, build_fn(error = "Error"))]
pub struct SignOptions {
    /// Defaults to SHA256.
    pub hash_alg: HashAlgorithm,
    /// The issuer written into the signature. Derived from the key fingerprint if unset.
    #[builder(setter(strip_option))]
    pub key_id: Option<KeyId>,
    /// Signature creation time, the current time if unset.
    #[builder(setter(strip_option))]
    pub created: Option<Timestamp>,
    /// Normalize literal data as for cleartext signatures before signing.
    pub clearsign: bool,
}

impl SignOptions {
    fn issuer(&self, key: &impl KeyDetails) -> KeyId {
        self.key_id.unwrap_or_else(|| key.key_id())
    }

    fn created(&self) -> Timestamp {
        self.created.unwrap_or_else(Timestamp::now)
    }
}

/// Signs `material` as a v4 signature of type `typ` with creation time and issuer.
pub(super) fn sign_material(
    material: &[u8],
    typ: SignatureType,
    key: &impl KeyDetails,
    signers: &SignerTable<'_>,
    opts: &SignOptions,
    extra_hashed: Vec<Subpacket>,
) -> Result<Signature> {
    let mut hashed = vec![
        Subpacket::regular(SubpacketData::SignatureCreationTime(opts.created()))?,
        Subpacket::regular(SubpacketData::Issuer(opts.issuer(key)))?,
    ];
    hashed.extend(extra_hashed);

    SignatureConfig::new_v4(typ, key.algorithm(), opts.hash_alg, hashed, vec![])
        .sign_data(material, signers)
}

impl Message {
    /// Signs the literal data of this message.
    ///
    /// Returns a new message holding the signature followed by the literal data. In
    /// clearsign mode the literal data is normalized first and signed as text.
    pub fn sign(
        &self,
        signers: &SignerTable<'_>,
        key: &impl KeyDetails,
        opts: &SignOptions,
    ) -> Result<Message> {
        let Some(SignedGroup::Literal { mut literal, .. }) = self.signatures()?.into_iter().next()
        else {
            bail!("message holds no literal data to sign");
        };
        if opts.clearsign {
            literal.normalize_for_clearsign();
        }
        let typ = match literal.mode() {
            DataMode::Text | DataMode::Utf8 => SignatureType::Text,
            DataMode::Binary | DataMode::Other(_) => SignatureType::Binary,
        };
        debug!("signing literal data as {:?}", typ);

        let material = literal_material(&literal, typ);
        let signature = sign_material(&material, typ, key, signers, opts, vec![])?;

        Ok(vec![Packet::from(signature), Packet::from(literal)].into())
    }

    /// Certifies the first user id of the first primary key.
    ///
    /// An existing signature on that user id is signed again in place with its own
    /// configuration. Otherwise a positive certification with key flags for certifying and
    /// signing is inserted after the user id.
    pub fn sign_key_userid(
        &self,
        signers: &SignerTable<'_>,
        key: &impl KeyDetails,
        opts: &SignOptions,
    ) -> Result<Message> {
        let Some(primary_pos) = self.iter().position(Packet::is_primary_key) else {
            bail!("message holds no primary key");
        };
        let Some(user_id_pos) = self
            .iter()
            .skip(primary_pos + 1)
            .position(|p| matches!(p, Packet::UserId(_)))
            .map(|i| i + primary_pos + 1)
        else {
            bail!("message holds no user id after the primary key");
        };
        let Packet::UserId(user_id) = &self[user_id_pos] else {
            bail!("expected user id packet");
        };
        let group = SignedGroup::KeyUserId {
            key: self[primary_pos].clone(),
            user_id: user_id.clone(),
            signatures: Vec::new(),
        };

        let existing = self
            .iter()
            .enumerate()
            .skip(user_id_pos + 1)
            .take_while(|(_, p)| matches!(p, Packet::Signature(_)))
            .find_map(|(i, p)| match p {
                Packet::Signature(sig) => Some((i, sig)),
                _ => None,
            });

        let mut packets = self.packets().to_vec();
        match existing {
            Some((pos, old)) => {
                debug!("re-signing certification at packet {}", pos);
                let material = group.material_for(old.typ(), old.version())?;
                let signature = old.config.clone().sign_data(&material, signers)?;
                packets[pos] = signature.into();
            }
            None => {
                let mut flags = KeyFlags::default();
                flags.set_certify(true);
                flags.set_sign(true);
                let flags = SubpacketData::KeyFlags(Bytes::from(Vec::from(flags)));

                let typ = SignatureType::CertPositive;
                let material = group.material_for(typ, SignatureVersion::V4)?;
                let signature = sign_material(
                    &material,
                    typ,
                    key,
                    signers,
                    opts,
                    vec![Subpacket::regular(flags)?],
                )?;
                packets.insert(user_id_pos + 1, signature.into());
            }
        }

        Ok(packets.into())
    }
}
