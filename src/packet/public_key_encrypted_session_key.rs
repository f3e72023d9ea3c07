use std::io;

use bytes::{Buf, Bytes};
use log::debug;
use rand::{CryptoRng, Rng};
use ::rsa::RsaPrivateKey;
use zeroize::Zeroizing;

use crate::crypto::checksum;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::rsa;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{unsupported_err, Error, Result};
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{KeyDetails, KeyId, MpiBytes, Tag};

/// Algorithm specific encrypted session key values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PkeskValues {
    /// `m^e mod n`
    Rsa { mpi: MpiBytes },
    /// `g^k mod p` and `m * y^k mod p`
    Elgamal { first: MpiBytes, second: MpiBytes },
    Other { data: Bytes },
}

/// Public-Key Encrypted Session Key Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.1>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyEncryptedSessionKey {
    id: KeyId,
    pub_alg: PublicKeyAlgorithm,
    values: PkeskValues,
}

impl PublicKeyEncryptedSessionKey {
    /// Parses a `PublicKeyEncryptedSessionKey` packet body. Only version 3 is known.
    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        if version != 3 {
            unsupported_err!("public key encrypted session key version {}", version);
        }
        let id = KeyId::from(i.read_array::<8>()?);
        let pub_alg = PublicKeyAlgorithm::from(i.read_u8()?);

        let values = match pub_alg {
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign => {
                PkeskValues::Rsa {
                    mpi: MpiBytes::from_buf(&mut i)?,
                }
            }
            PublicKeyAlgorithm::Elgamal => {
                let first = MpiBytes::from_buf(&mut i)?;
                let second = MpiBytes::from_buf(&mut i)?;
                PkeskValues::Elgamal { first, second }
            }
            _ => PkeskValues::Other { data: i.rest() },
        };

        Ok(PublicKeyEncryptedSessionKey {
            id,
            pub_alg,
            values,
        })
    }

    /// Encrypts `session_key` for `alg` to the given public key. Only RSA keys are supported.
    pub fn from_session_key<R: CryptoRng + Rng, K: KeyDetails>(
        rng: &mut R,
        session_key: &[u8],
        alg: SymmetricKeyAlgorithm,
        key: &K,
    ) -> Result<Self> {
        if !key.algorithm().is_rsa() {
            unsupported_err!("session key encryption to {:?} keys", key.algorithm());
        }
        let public = rsa::public_key(key.public_params())?;

        let sum = checksum::calculate_simple(session_key);
        let mut block = Zeroizing::new(Vec::with_capacity(session_key.len() + 3));
        block.push(alg.into());
        block.extend_from_slice(session_key);
        block.extend_from_slice(&sum.to_be_bytes());

        let mpi = rsa::encrypt(rng, &public, &block)?;

        Ok(PublicKeyEncryptedSessionKey {
            id: key.key_id(),
            pub_alg: key.algorithm(),
            values: PkeskValues::Rsa { mpi },
        })
    }

    /// Hides the recipient by replacing the key id with the wildcard id.
    pub fn into_wildcard(mut self) -> Self {
        self.id = KeyId::WILDCARD;
        self
    }

    pub fn id(&self) -> &KeyId {
        &self.id
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.pub_alg
    }

    pub fn values(&self) -> &PkeskValues {
        &self.values
    }

    /// Whether this packet may have been made for a key with the id `key_id`.
    pub fn matches(&self, key_id: &KeyId) -> bool {
        self.id.is_wildcard() || &self.id == key_id
    }

    /// Recovers the session key and its algorithm with an RSA private key.
    ///
    /// The decrypted block is `algorithm ‖ key ‖ checksum`. Anything that does not
    /// match that layout is an integrity failure, so the caller can try the next candidate.
    pub fn decrypt_rsa(
        &self,
        key: &RsaPrivateKey,
    ) -> Result<(SymmetricKeyAlgorithm, Zeroizing<Vec<u8>>)> {
        let PkeskValues::Rsa { ref mpi } = self.values else {
            unsupported_err!("RSA decryption of {:?} session keys", self.pub_alg);
        };

        let block = rsa::decrypt(key, mpi).map_err(|err| {
            debug!("RSA session key decryption failed: {}", err);
            Error::IntegrityFailure {
                reason: "session key decryption",
            }
        })?;

        if block.len() < 3 {
            return Err(Error::IntegrityFailure {
                reason: "session key block too short",
            });
        }
        let (body, sum) = block.split_at(block.len() - 2);
        let alg = SymmetricKeyAlgorithm::from(body[0]);
        let session_key = &body[1..];
        checksum::simple([sum[0], sum[1]], session_key)?;

        if !alg.is_supported() || alg.key_size() != session_key.len() {
            debug!("session key does not fit {:?}", alg);
            return Err(Error::IntegrityFailure {
                reason: "session key does not match its algorithm",
            });
        }

        Ok((alg, Zeroizing::new(session_key.to_vec())))
    }
}

impl Serialize for PublicKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[3])?;
        writer.write_all(self.id.as_ref())?;
        writer.write_all(&[self.pub_alg.into()])?;
        match &self.values {
            PkeskValues::Rsa { mpi } => mpi.to_writer(writer)?,
            PkeskValues::Elgamal { first, second } => {
                first.to_writer(writer)?;
                second.to_writer(writer)?;
            }
            PkeskValues::Other { data } => writer.write_all(data)?,
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        let values = match &self.values {
            PkeskValues::Rsa { mpi } => mpi.write_len(),
            PkeskValues::Elgamal { first, second } => first.write_len() + second.write_len(),
            PkeskValues::Other { data } => data.len(),
        };
        1 + 8 + 1 + values
    }
}

impl PacketTrait for PublicKeyEncryptedSessionKey {
    fn tag(&self) -> Tag {
        Tag::PublicKeyEncryptedSessionKey
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::packet::{PublicKey, SecretKey};
    use crate::types::{KeyVersion, SecretParams, Timestamp};

    fn key_pair(rng: &mut ChaCha8Rng) -> (PublicKey, RsaPrivateKey) {
        let (public, secret) = rsa::generate_key(rng, 1024).unwrap();
        let private = rsa::private_key(&public, &secret).unwrap();
        let key = SecretKey::new(
            PublicKey::new(
                KeyVersion::V4,
                PublicKeyAlgorithm::RSA,
                Timestamp::from_secs(1_500_000_000),
                None,
                public,
            )
            .unwrap(),
            SecretParams::Plain(secret),
        );
        (key.public_key(), private)
    }

    #[test]
    fn test_rsa_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let (public, private) = key_pair(&mut rng);
        let alg = SymmetricKeyAlgorithm::AES128;
        let session_key = alg.new_session_key(&mut rng);

        let pkesk =
            PublicKeyEncryptedSessionKey::from_session_key(&mut rng, &session_key, alg, &public)
                .unwrap();
        assert_eq!(pkesk.id(), &public.key_id());

        let bytes = pkesk.to_bytes().unwrap();
        assert_eq!(bytes.len(), pkesk.write_len());
        let back = PublicKeyEncryptedSessionKey::try_from_buf(&bytes[..]).unwrap();
        assert_eq!(back, pkesk);

        let (got_alg, got_key) = back.decrypt_rsa(&private).unwrap();
        assert_eq!(got_alg, alg);
        assert_eq!(&got_key[..], &session_key[..]);
    }

    #[test]
    fn test_wrong_key() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let (public, _) = key_pair(&mut rng);
        let (other_public, other_private) = key_pair(&mut rng);

        let alg = SymmetricKeyAlgorithm::AES256;
        let session_key = alg.new_session_key(&mut rng);
        let pkesk =
            PublicKeyEncryptedSessionKey::from_session_key(&mut rng, &session_key, alg, &public)
                .unwrap();

        assert!(!pkesk.matches(&other_public.key_id()));
        assert!(pkesk.clone().into_wildcard().matches(&other_public.key_id()));
        assert!(pkesk.decrypt_rsa(&other_private).unwrap_err().is_integrity_failure());
    }

    #[test]
    fn test_parse_elgamal() {
        let body = hex!("03 0102030405060708 10 0008 ff 0009 01ff");
        let pkesk = PublicKeyEncryptedSessionKey::try_from_buf(&body[..]).unwrap();
        assert_eq!(pkesk.algorithm(), PublicKeyAlgorithm::Elgamal);
        assert!(matches!(pkesk.values(), PkeskValues::Elgamal { .. }));
        assert_eq!(pkesk.to_bytes().unwrap(), body);
    }

    #[test]
    fn test_unknown_version() {
        let err = PublicKeyEncryptedSessionKey::try_from_buf(&[2u8; 12][..]).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
