//! Algorithm specific key material.

use std::io;

use byteorder::WriteBytesExt;
use bytes::{Buf, Bytes};
use log::warn;
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::crypto::{checksum, public_key::PublicKeyAlgorithm};
use crate::errors::{bail, Error, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{MpiBytes, S2kParams};

/// Public key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicParams {
    Rsa {
        n: MpiBytes,
        e: MpiBytes,
    },
    Elgamal {
        p: MpiBytes,
        g: MpiBytes,
        y: MpiBytes,
    },
    Dsa {
        p: MpiBytes,
        q: MpiBytes,
        g: MpiBytes,
        y: MpiBytes,
    },
    /// Material of algorithms we do not decode, kept as found.
    Unknown { data: Bytes },
}

impl PublicParams {
    /// Parses the material for `alg`. Unknown algorithms consume the rest of the buffer.
    pub fn try_from_buf<B: Buf>(alg: PublicKeyAlgorithm, mut i: B) -> Result<Self> {
        let params = match alg {
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign => {
                let n = MpiBytes::from_buf(&mut i)?;
                let e = MpiBytes::from_buf(&mut i)?;
                PublicParams::Rsa { n, e }
            }
            PublicKeyAlgorithm::Elgamal => {
                let p = MpiBytes::from_buf(&mut i)?;
                let g = MpiBytes::from_buf(&mut i)?;
                let y = MpiBytes::from_buf(&mut i)?;
                PublicParams::Elgamal { p, g, y }
            }
            PublicKeyAlgorithm::DSA => {
                let p = MpiBytes::from_buf(&mut i)?;
                let q = MpiBytes::from_buf(&mut i)?;
                let g = MpiBytes::from_buf(&mut i)?;
                let y = MpiBytes::from_buf(&mut i)?;
                PublicParams::Dsa { p, q, g, y }
            }
            _ => PublicParams::Unknown { data: i.rest() },
        };
        Ok(params)
    }

    pub(crate) fn mpis(&self) -> Vec<&MpiBytes> {
        match self {
            PublicParams::Rsa { n, e } => vec![n, e],
            PublicParams::Elgamal { p, g, y } => vec![p, g, y],
            PublicParams::Dsa { p, q, g, y } => vec![p, q, g, y],
            PublicParams::Unknown { .. } => Vec::new(),
        }
    }
}

impl Serialize for PublicParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PublicParams::Unknown { data } => writer.write_all(data)?,
            _ => self.mpis().to_writer(writer)?,
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            PublicParams::Unknown { data } => data.len(),
            _ => self.mpis().write_len(),
        }
    }
}

/// Cleartext secret key material.
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub enum PlainSecretParams {
    Rsa {
        #[debug("..")]
        d: MpiBytes,
        #[debug("..")]
        p: MpiBytes,
        #[debug("..")]
        q: MpiBytes,
        /// `p^-1 mod q`
        #[debug("..")]
        u: MpiBytes,
    },
    Elgamal {
        #[debug("..")]
        x: MpiBytes,
    },
    Dsa {
        #[debug("..")]
        x: MpiBytes,
    },
    /// Secret part of an algorithm we do not decode, including its checksum.
    Unknown {
        #[debug("..")]
        data: Bytes,
    },
}

impl PlainSecretParams {
    pub fn try_from_buf<B: Buf>(alg: PublicKeyAlgorithm, mut i: B) -> Result<Self> {
        let params = match alg {
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign => {
                let d = MpiBytes::from_buf(&mut i)?;
                let p = MpiBytes::from_buf(&mut i)?;
                let q = MpiBytes::from_buf(&mut i)?;
                let u = MpiBytes::from_buf(&mut i)?;
                PlainSecretParams::Rsa { d, p, q, u }
            }
            PublicKeyAlgorithm::Elgamal => PlainSecretParams::Elgamal {
                x: MpiBytes::from_buf(&mut i)?,
            },
            PublicKeyAlgorithm::DSA => PlainSecretParams::Dsa {
                x: MpiBytes::from_buf(&mut i)?,
            },
            _ => PlainSecretParams::Unknown { data: i.rest() },
        };
        Ok(params)
    }

    fn mpis(&self) -> Vec<&MpiBytes> {
        match self {
            PlainSecretParams::Rsa { d, p, q, u } => vec![d, p, q, u],
            PlainSecretParams::Elgamal { x } | PlainSecretParams::Dsa { x } => vec![x],
            PlainSecretParams::Unknown { .. } => Vec::new(),
        }
    }

    /// Two octet checksum over the serialized material.
    pub fn checksum_simple(&self) -> Result<[u8; 2]> {
        let raw = Zeroizing::new(self.to_bytes()?);
        Ok(checksum::calculate_simple(&raw).to_be_bytes())
    }

    /// Encrypts the material with a key derived from `passphrase`.
    pub fn encrypt<R: CryptoRng + Rng>(
        &self,
        mut rng: R,
        passphrase: &[u8],
        params: S2kParams,
    ) -> Result<EncryptedSecretParams> {
        let (Some(sym_alg), Some(s2k)) = (params.sym_alg(), params.string_to_key()) else {
            bail!("can not encrypt with usage {}", params.usage());
        };
        if let PlainSecretParams::Unknown { .. } = self {
            bail!("can not encrypt key material of unknown algorithms");
        }

        let key = s2k.derive_key(passphrase, sym_alg.key_size())?;
        let bs = sym_alg.block_size();

        let mut buf = Zeroizing::new(vec![0u8; bs]);
        rng.fill_bytes(&mut buf[..]);
        self.to_writer(&mut *buf)?;
        match params {
            S2kParams::Cfb { .. } => {
                let hash = checksum::calculate_sha1(&buf[bs..]);
                buf.extend_from_slice(&hash);
            }
            _ => {
                let sum = checksum::calculate_simple(&buf[bs..]);
                buf.extend_from_slice(&sum.to_be_bytes());
            }
        }

        let iv = vec![0u8; bs];
        sym_alg.encrypt_with_iv_regular(&key, &iv, &mut buf)?;

        Ok(EncryptedSecretParams {
            params,
            data: Bytes::copy_from_slice(&buf),
        })
    }
}

impl Serialize for PlainSecretParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PlainSecretParams::Unknown { data } => writer.write_all(data)?,
            _ => self.mpis().to_writer(writer)?,
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            PlainSecretParams::Unknown { data } => data.len(),
            _ => self.mpis().write_len(),
        }
    }
}

/// Passphrase protected secret key material.
///
/// `data` holds the IV block followed by the ciphertext, exactly as stored in the packet.
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct EncryptedSecretParams {
    params: S2kParams,
    #[debug("{}", hex::encode(data))]
    data: Bytes,
}

impl EncryptedSecretParams {
    pub fn new(params: S2kParams, data: Bytes) -> Self {
        Self { params, data }
    }

    pub fn params(&self) -> &S2kParams {
        &self.params
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decrypts the material. A wrong passphrase shows up as an integrity failure.
    ///
    /// Running CFB with an all zero IV over the IV block and the ciphertext, then
    /// dropping the first block, is the same as running it over the ciphertext with the stored IV.
    pub fn decrypt(&self, passphrase: &[u8], alg: PublicKeyAlgorithm) -> Result<PlainSecretParams> {
        let (Some(sym_alg), Some(s2k)) = (self.params.sym_alg(), self.params.string_to_key())
        else {
            return Err(Error::AlreadyUnencrypted);
        };

        let key = s2k.derive_key(passphrase, sym_alg.key_size())?;
        let bs = sym_alg.block_size();
        let checksum_len = match self.params {
            S2kParams::Cfb { .. } => 20,
            _ => 2,
        };
        if self.data.len() < bs + checksum_len {
            return Err(Error::IntegrityFailure {
                reason: "encrypted key material too short",
            });
        }

        let mut buf = Zeroizing::new(self.data.to_vec());
        let iv = vec![0u8; bs];
        sym_alg.decrypt_with_iv_regular(&key, &iv, &mut buf)?;

        let (material, sum) = buf[bs..].split_at(buf.len() - bs - checksum_len);
        match self.params {
            S2kParams::Cfb { .. } => checksum::sha1(sum, material)?,
            _ => checksum::simple([sum[0], sum[1]], material)?,
        }

        PlainSecretParams::try_from_buf(alg, material)
    }
}

/// Secret part of a secret key packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretParams {
    Plain(PlainSecretParams),
    Encrypted(EncryptedSecretParams),
}

impl SecretParams {
    /// Parses everything following the public key material.
    pub fn try_from_buf<B: Buf>(alg: PublicKeyAlgorithm, mut i: B) -> Result<Self> {
        let params = S2kParams::try_from_buf(&mut i)?;
        if params != S2kParams::Unprotected {
            return Ok(SecretParams::Encrypted(EncryptedSecretParams {
                params,
                data: i.rest(),
            }));
        }

        let plain = PlainSecretParams::try_from_buf(alg, &mut i)?;
        if !matches!(plain, PlainSecretParams::Unknown { .. }) {
            let sum = i.read_array::<2>()?;
            if let Err(err) = checksum::simple(sum, &plain.to_bytes()?) {
                warn!("ignoring secret key checksum mismatch: {}", err);
            }
        }

        Ok(SecretParams::Plain(plain))
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, SecretParams::Encrypted(_))
    }

    pub fn s2k_usage(&self) -> u8 {
        match self {
            SecretParams::Plain(_) => 0,
            SecretParams::Encrypted(enc) => enc.params.usage(),
        }
    }
}

impl Serialize for SecretParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            SecretParams::Plain(plain) => {
                writer.write_u8(0)?;
                plain.to_writer(writer)?;
                if !matches!(plain, PlainSecretParams::Unknown { .. }) {
                    writer.write_all(&plain.checksum_simple()?)?;
                }
            }
            SecretParams::Encrypted(enc) => {
                enc.params.to_writer(writer)?;
                writer.write_all(&enc.data)?;
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            SecretParams::Plain(plain @ PlainSecretParams::Unknown { .. }) => 1 + plain.write_len(),
            SecretParams::Plain(plain) => 1 + plain.write_len() + 2,
            SecretParams::Encrypted(enc) => enc.params.write_len() + enc.data.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::{hash::HashAlgorithm, sym::SymmetricKeyAlgorithm};
    use crate::types::{StringToKey, DEFAULT_ITER_COUNT};

    fn rsa_secret() -> PlainSecretParams {
        PlainSecretParams::Rsa {
            d: MpiBytes::from_slice(&[0x12, 0x34, 0x56]),
            p: MpiBytes::from_slice(&[0x0b]),
            q: MpiBytes::from_slice(&[0x0d]),
            u: MpiBytes::from_slice(&[0x06]),
        }
    }

    #[test]
    fn test_public_params_unknown() {
        let raw = [0x01, 0x02, 0x03];
        let params = PublicParams::try_from_buf(PublicKeyAlgorithm::ECDSA, &raw[..]).unwrap();
        assert_eq!(params.to_bytes().unwrap(), raw.to_vec());
    }

    #[test]
    fn test_plain_roundtrip_with_checksum() {
        let params = SecretParams::Plain(rsa_secret());
        let bytes = params.to_bytes().unwrap();
        assert_eq!(bytes.len(), params.write_len());
        assert_eq!(bytes[0], 0);

        let back = SecretParams::try_from_buf(PublicKeyAlgorithm::RSA, &bytes[..]).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_encrypt_decrypt() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for usage in [254u8, 255] {
            let s2k = StringToKey::new_iterated(&mut rng, HashAlgorithm::Sha256, DEFAULT_ITER_COUNT);
            let params = if usage == 254 {
                S2kParams::Cfb {
                    sym_alg: SymmetricKeyAlgorithm::AES128,
                    s2k,
                }
            } else {
                S2kParams::MalleableCfb {
                    sym_alg: SymmetricKeyAlgorithm::CAST5,
                    s2k,
                }
            };

            let enc = rsa_secret().encrypt(&mut rng, b"hunter2", params).unwrap();
            let wrapped = SecretParams::Encrypted(enc.clone());
            let bytes = wrapped.to_bytes().unwrap();
            assert_eq!(bytes[0], usage);

            let parsed = SecretParams::try_from_buf(PublicKeyAlgorithm::RSA, &bytes[..]).unwrap();
            assert_eq!(parsed, wrapped);

            let plain = enc.decrypt(b"hunter2", PublicKeyAlgorithm::RSA).unwrap();
            assert_eq!(plain, rsa_secret());

            let err = enc.decrypt(b"wrong", PublicKeyAlgorithm::RSA).unwrap_err();
            assert!(err.is_integrity_failure() || matches!(err, Error::PacketParsing { .. }));
        }
    }

    #[test]
    fn test_decrypt_unprotected() {
        let enc = EncryptedSecretParams::new(S2kParams::Unprotected, Bytes::new());
        assert!(matches!(
            enc.decrypt(b"x", PublicKeyAlgorithm::RSA),
            Err(Error::AlreadyUnencrypted)
        ));
    }
}
