use std::io;

use bytes::Buf;
use log::debug;
use rand::{CryptoRng, Rng};

use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::rsa;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{bail, unsupported_err, Error, Result};
use crate::packet::{PacketTrait, PublicKey, PublicSubkey};
use crate::ser::Serialize;
use crate::types::{
    Fingerprint, KeyDetails, KeyVersion, PlainSecretParams, PublicParams, S2kParams,
    SecretParams, StringToKey, Tag, Timestamp,
};

macro_rules! impl_secret_key {
    ($name:ident, $public:ident, $tag:expr) => {
        #[derive(Debug, PartialEq, Eq, Clone)]
        pub struct $name {
            details: $public,
            secret: SecretParams,
        }

        impl $name {
            pub fn new(details: $public, secret: SecretParams) -> Self {
                Self { details, secret }
            }

            /// Parses a secret key packet body: the public part followed by the secret part.
            pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
                let details = $public::try_from_buf(&mut i)?;
                if let PublicParams::Unknown { .. } = details.public_params() {
                    unsupported_err!("secret keys of algorithm {:?}", details.algorithm());
                }
                let secret = SecretParams::try_from_buf(details.algorithm(), &mut i)?;

                Ok(Self { details, secret })
            }

            /// Generates a fresh RSA key with cleartext secret material.
            pub fn generate_rsa<R: Rng + CryptoRng>(
                rng: &mut R,
                bit_size: usize,
                created_at: Timestamp,
            ) -> Result<Self> {
                let (public, secret) = rsa::generate_key(rng, bit_size)?;
                let details = $public::new(
                    KeyVersion::V4,
                    PublicKeyAlgorithm::RSA,
                    created_at,
                    None,
                    public,
                )?;

                Ok(Self::new(details, SecretParams::Plain(secret)))
            }

            /// The public part of this key.
            pub fn public_key(&self) -> $public {
                self.details.clone()
            }

            pub fn secret_params(&self) -> &SecretParams {
                &self.secret
            }

            pub fn is_encrypted(&self) -> bool {
                self.secret.is_encrypted()
            }

            /// Decrypts the secret material with `passphrase`.
            ///
            /// Fails with [`Error::AlreadyUnencrypted`] for cleartext keys.
            pub fn decrypt(&self, passphrase: &[u8]) -> Result<PlainSecretParams> {
                match self.secret {
                    SecretParams::Plain(_) => Err(Error::AlreadyUnencrypted),
                    SecretParams::Encrypted(ref enc) => {
                        enc.decrypt(passphrase, self.details.algorithm())
                    }
                }
            }

            /// Returns the cleartext secret material, decrypting it if needed.
            pub fn unlock(&self, passphrase: Option<&[u8]>) -> Result<PlainSecretParams> {
                match (&self.secret, passphrase) {
                    (SecretParams::Plain(plain), _) => Ok(plain.clone()),
                    (SecretParams::Encrypted(_), Some(pw)) => self.decrypt(pw),
                    (SecretParams::Encrypted(_), None) => {
                        Err(Error::MissingKey)
                    }
                }
            }

            /// Protects the secret material with `passphrase`.
            ///
            /// `usage` is 254 (SHA-1 checksum) or 255 (two octet checksum).
            pub fn encrypt<R: CryptoRng + Rng>(
                &mut self,
                rng: R,
                passphrase: &[u8],
                sym_alg: SymmetricKeyAlgorithm,
                s2k: StringToKey,
                usage: u8,
            ) -> Result<()> {
                let SecretParams::Plain(ref plain) = self.secret else {
                    bail!("secret key is already encrypted");
                };
                let params = match usage {
                    254 => S2kParams::Cfb { sym_alg, s2k },
                    255 => S2kParams::MalleableCfb { sym_alg, s2k },
                    _ => bail!("invalid s2k usage for encryption: {}", usage),
                };
                debug!("protecting secret key with {:?}", sym_alg);

                let enc = plain.encrypt(rng, passphrase, params)?;
                self.secret = SecretParams::Encrypted(enc);
                Ok(())
            }
        }

        impl KeyDetails for $name {
            fn version(&self) -> KeyVersion {
                self.details.version()
            }

            fn created_at(&self) -> Timestamp {
                self.details.created_at()
            }

            fn algorithm(&self) -> PublicKeyAlgorithm {
                self.details.algorithm()
            }

            fn public_params(&self) -> &PublicParams {
                self.details.public_params()
            }

            fn fingerprint(&self) -> Fingerprint {
                self.details.fingerprint()
            }

            fn fingerprint_material(&self) -> Result<Vec<u8>> {
                self.details.fingerprint_material()
            }
        }

        impl Serialize for $name {
            fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
                self.details.to_writer(writer)?;
                self.secret.to_writer(writer)?;
                Ok(())
            }

            fn write_len(&self) -> usize {
                self.details.write_len() + self.secret.write_len()
            }
        }

        impl PacketTrait for $name {
            fn tag(&self) -> Tag {
                $tag
            }
        }
    };
}

impl_secret_key!(SecretKey, PublicKey, Tag::SecretKey);
impl_secret_key!(SecretSubkey, PublicSubkey, Tag::SecretSubkey);

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    #[test]
    fn test_generate_and_parse() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let key = SecretKey::generate_rsa(&mut rng, 1024, Timestamp::from_secs(1_600_000_000))
            .unwrap();
        assert!(!key.is_encrypted());

        let bytes = key.to_bytes().unwrap();
        assert_eq!(bytes.len(), key.write_len());
        let back = SecretKey::try_from_buf(&bytes[..]).unwrap();
        assert_eq!(back, key);
        assert_eq!(back.fingerprint(), key.public_key().fingerprint());
        assert!(matches!(back.decrypt(b"pw"), Err(Error::AlreadyUnencrypted)));
    }

    #[test]
    fn test_encrypt_decrypt() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut key =
            SecretSubkey::generate_rsa(&mut rng, 1024, Timestamp::from_secs(1)).unwrap();
        let SecretParams::Plain(plain) = key.secret_params().clone() else {
            panic!("fresh key must be plain");
        };

        for usage in [254, 255] {
            let mut locked = key.clone();
            let s2k = StringToKey::new_iterated(&mut rng, HashAlgorithm::Sha256, 0x40);
            locked
                .encrypt(&mut rng, b"test", SymmetricKeyAlgorithm::AES256, s2k, usage)
                .unwrap();
            assert!(locked.is_encrypted());
            assert_eq!(locked.secret_params().s2k_usage(), usage);

            let bytes = locked.to_bytes().unwrap();
            let parsed = SecretSubkey::try_from_buf(&bytes[..]).unwrap();
            assert_eq!(parsed.decrypt(b"test").unwrap(), plain);
            assert_eq!(parsed.unlock(Some(b"test")).unwrap(), plain);
            assert!(parsed.decrypt(b"nope").is_err());
            assert!(matches!(parsed.unlock(None), Err(Error::MissingKey)));
        }

        let s2k = StringToKey::new_iterated(&mut rng, HashAlgorithm::Sha256, 0x40);
        assert!(key
            .encrypt(&mut rng, b"x", SymmetricKeyAlgorithm::AES128, s2k, 3)
            .is_err());
    }
}
