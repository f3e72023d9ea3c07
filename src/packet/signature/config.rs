use byteorder::{BigEndian, WriteBytesExt};
use derive_builder::Builder;
use log::debug;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{bail, ensure, unsupported_err, Error, Result};
use crate::packet::signature::SignerTable;
use crate::packet::{Signature, SignatureType, SignatureVersion, Subpacket, SubpacketData};
use crate::ser::Serialize;
use crate::types::{KeyId, Timestamp};

/// Everything about a signature except the signature values themselves.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(error = "Error"))]
pub struct SignatureConfig {
    #[builder(default)]
    pub version: SignatureVersion,
    pub typ: SignatureType,
    pub pub_alg: PublicKeyAlgorithm,
    #[builder(default)]
    pub hash_alg: HashAlgorithm,

    #[builder(default)]
    pub hashed_subpackets: Vec<Subpacket>,
    #[builder(default)]
    pub unhashed_subpackets: Vec<Subpacket>,

    // only set on V2 and V3 signatures
    #[builder(default)]
    pub created: Option<Timestamp>,
    #[builder(default)]
    pub issuer: Option<KeyId>,
}

impl SignatureConfig {
    pub fn new_v4(
        typ: SignatureType,
        pub_alg: PublicKeyAlgorithm,
        hash_alg: HashAlgorithm,
        hashed_subpackets: Vec<Subpacket>,
        unhashed_subpackets: Vec<Subpacket>,
    ) -> Self {
        SignatureConfig {
            version: SignatureVersion::V4,
            typ,
            pub_alg,
            hash_alg,
            hashed_subpackets,
            unhashed_subpackets,
            created: None,
            issuer: None,
        }
    }

    /// Signs `material` with the signer registered for this key and hash algorithm.
    ///
    /// The signer receives `material || trailer`.
    pub fn sign_data(self, material: &[u8], signers: &SignerTable<'_>) -> Result<Signature> {
        let key_alg = self.pub_alg.to_string();
        let hash_alg = self.hash_alg.to_string();
        let Some(signer) = signers.get(&key_alg, &hash_alg) else {
            unsupported_err!("no signer for {} with {}", key_alg, hash_alg);
        };
        debug!("signing {} bytes as {:?}", material.len(), self.typ);

        let mut input = Vec::with_capacity(material.len() + 32);
        input.extend_from_slice(material);
        input.extend_from_slice(&self.trailer()?);

        let signed_hash_value = left_16(self.hash_alg, &input)?;
        let signature = signer.sign(&input)?;

        Ok(Signature::from_config(self, signed_hash_value, signature))
    }

    /// The bytes hashed after the signed material.
    ///
    /// For v4 this is the version, type, algorithms and hashed subpacket area, followed by
    /// `0x04 0xFF` and the length of that prefix. Always computed from the current subpackets.
    pub fn trailer(&self) -> Result<Vec<u8>> {
        match self.version {
            SignatureVersion::V2 | SignatureVersion::V3 => {
                let Some(created) = self.created else {
                    bail!("v3 signature without creation time");
                };
                let mut res = Vec::with_capacity(5);
                res.push(self.typ.into());
                created.to_writer(&mut res)?;
                Ok(res)
            }
            SignatureVersion::V4 => {
                let hashed_len: u16 = self.hashed_subpackets.write_len().try_into()?;
                let mut res = vec![
                    self.version.into(),
                    self.typ.into(),
                    self.pub_alg.into(),
                    self.hash_alg.into(),
                ];
                res.write_u16::<BigEndian>(hashed_len)?;
                self.hashed_subpackets.to_writer(&mut res)?;

                let len: u32 = res.len().try_into()?;
                res.extend_from_slice(&[0x04, 0xFF]);
                res.write_u32::<BigEndian>(len)?;
                Ok(res)
            }
            SignatureVersion::Other(v) => unsupported_err!("signature version {}", v),
        }
    }

    /// Returns an iterator over all subpackets of this signature.
    pub fn subpackets(&self) -> impl Iterator<Item = &Subpacket> {
        self.hashed_subpackets
            .iter()
            .chain(self.unhashed_subpackets.iter())
    }

    /// Returns if the signature certifies a user id.
    pub fn is_certification(&self) -> bool {
        matches!(
            self.typ,
            SignatureType::CertGeneric
                | SignatureType::CertPersona
                | SignatureType::CertCasual
                | SignatureType::CertPositive
                | SignatureType::CertRevocation
        )
    }

    pub fn created(&self) -> Option<Timestamp> {
        if self.created.is_some() {
            return self.created;
        }

        self.subpackets().find_map(|p| match p.data {
            SubpacketData::SignatureCreationTime(d) => Some(d),
            _ => None,
        })
    }

    pub fn issuer(&self) -> Option<KeyId> {
        if self.issuer.is_some() {
            return self.issuer;
        }

        self.subpackets().find_map(|p| match p.data {
            SubpacketData::Issuer(id) => Some(id),
            _ => None,
        })
    }
}

fn left_16(hash_alg: HashAlgorithm, input: &[u8]) -> Result<[u8; 2]> {
    let digest = hash_alg.digest(input)?;
    ensure!(digest.len() >= 2, "digest too short");
    Ok([digest[0], digest[1]])
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::types::MpiBytes;

    fn config() -> SignatureConfig {
        SignatureConfigBuilder::default()
            .typ(SignatureType::Binary)
            .pub_alg(PublicKeyAlgorithm::RSA)
            .hashed_subpackets(vec![Subpacket::regular(SubpacketData::SignatureCreationTime(
                Timestamp::from_secs(0x5a00_0000),
            ))
            .unwrap()])
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let config = config();
        assert_eq!(config.version, SignatureVersion::V4);
        assert_eq!(config.hash_alg, HashAlgorithm::Sha256);
        assert!(config.unhashed_subpackets.is_empty());

        let err = SignatureConfigBuilder::default()
            .typ(SignatureType::Binary)
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_v4_trailer() {
        let config = config();
        assert_eq!(
            config.trailer().unwrap(),
            hex!("04 00 01 08 0006 05 02 5a000000 04ff 0000000c")
        );
    }

    #[test]
    fn test_trailer_follows_subpackets() {
        let mut config = config();
        let before = config.trailer().unwrap();
        config.hashed_subpackets.push(
            Subpacket::regular(SubpacketData::Issuer(KeyId::from([7u8; 8]))).unwrap(),
        );
        let after = config.trailer().unwrap();
        assert_ne!(before, after);
        assert_eq!(after.len(), before.len() + 10);
    }

    #[test]
    fn test_sign_data() {
        let mut signers = SignerTable::new();
        signers.insert("RSA", "SHA256", |data: &[u8]| -> Result<Vec<MpiBytes>> {
            assert!(data.starts_with(b"payload"));
            Ok(vec![MpiBytes::from_slice(&[0x42])])
        });

        let sig = config().sign_data(b"payload", &signers).unwrap();
        let mut input = b"payload".to_vec();
        input.extend(sig.trailer().unwrap());
        let digest = HashAlgorithm::Sha256.digest(&input).unwrap();
        assert_eq!(sig.signed_hash_value, [digest[0], digest[1]]);
        assert_eq!(sig.signature, vec![MpiBytes::from_slice(&[0x42])]);

        let mut config = config();
        config.hash_alg = HashAlgorithm::Sha1;
        let err = config.sign_data(b"payload", &signers).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
