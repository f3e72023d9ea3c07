use std::io;

use byteorder::WriteBytesExt;
use bytes::Buf;
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::crypto::{hash::HashAlgorithm, sym::SymmetricKeyAlgorithm};
use crate::errors::{ensure, unsupported_err, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;

const EXPBIAS: u32 = 6;

/// Coded iteration count used for new session keys and protected secret keys (65536 octets).
pub const DEFAULT_ITER_COUNT: u8 = 0x60;

/// String-to-key specifier.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-3.7>
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringToKey {
    Simple {
        hash_alg: HashAlgorithm,
    },
    Salted {
        hash_alg: HashAlgorithm,
        salt: [u8; 8],
    },
    IteratedAndSalted {
        hash_alg: HashAlgorithm,
        salt: [u8; 8],
        /// Coded count, see [`decode_count`].
        count: u8,
    },
}

/// Converts a coded count into the number of octets to hash.
pub fn decode_count(c: u8) -> u32 {
    (16u32 + u32::from(c & 15)) << (u32::from(c >> 4) + EXPBIAS)
}

/// Smallest coded count whose decoded value is at least `count`, saturating at `255`.
pub fn encode_count(count: u32) -> u8 {
    (0..=u8::MAX)
        .find(|c| decode_count(*c) >= count)
        .unwrap_or(u8::MAX)
}

impl StringToKey {
    /// Iterated and salted S2K with a fresh random salt.
    pub fn new_iterated<R: CryptoRng + Rng>(mut rng: R, hash_alg: HashAlgorithm, count: u8) -> Self {
        let mut salt = [0u8; 8];
        rng.fill_bytes(&mut salt);
        StringToKey::IteratedAndSalted {
            hash_alg,
            salt,
            count,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Self::Simple { .. } => 0,
            Self::Salted { .. } => 1,
            Self::IteratedAndSalted { .. } => 3,
        }
    }

    pub fn hash_alg(&self) -> HashAlgorithm {
        match self {
            Self::Simple { hash_alg }
            | Self::Salted { hash_alg, .. }
            | Self::IteratedAndSalted { hash_alg, .. } => *hash_alg,
        }
    }

    pub fn salt(&self) -> Option<&[u8; 8]> {
        match self {
            Self::Simple { .. } => None,
            Self::Salted { salt, .. } | Self::IteratedAndSalted { salt, .. } => Some(salt),
        }
    }

    /// Number of octets fed to the hash per round, if iterated.
    pub fn count(&self) -> Option<u32> {
        match self {
            Self::IteratedAndSalted { count, .. } => Some(decode_count(*count)),
            _ => None,
        }
    }

    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let typ = i.read_u8()?;
        let hash_alg = HashAlgorithm::from(i.read_u8()?);
        match typ {
            0 => Ok(Self::Simple { hash_alg }),
            1 => {
                let salt = i.read_array::<8>()?;
                Ok(Self::Salted { hash_alg, salt })
            }
            3 => {
                let salt = i.read_array::<8>()?;
                let count = i.read_u8()?;
                Ok(Self::IteratedAndSalted {
                    hash_alg,
                    salt,
                    count,
                })
            }
            _ => unsupported_err!("string to key type {}", typ),
        }
    }

    /// Derives a key of `key_size` octets from `passphrase`.
    ///
    /// When one digest is too short, further rounds run with 1, 2, ... zero octets
    /// hashed in front of the input, and their outputs are concatenated.
    pub fn derive_key(&self, passphrase: &[u8], key_size: usize) -> Result<Zeroizing<Vec<u8>>> {
        let hash_alg = self.hash_alg();
        let digest_size = match hash_alg.digest_size() {
            Some(size) => size,
            None => unsupported_err!("hash {:?} for string to key", hash_alg),
        };
        ensure!(key_size > 0, "key size must not be zero");

        let mut input = Zeroizing::new(Vec::with_capacity(8 + passphrase.len()));
        if let Some(salt) = self.salt() {
            input.extend_from_slice(salt);
        }
        input.extend_from_slice(passphrase);

        let total = match self.count() {
            Some(count) => (count as usize).max(input.len()),
            None => input.len(),
        };

        let rounds = key_size.div_ceil(digest_size);
        let mut key = Zeroizing::new(Vec::with_capacity(rounds * digest_size));

        for round in 0..rounds {
            let mut hasher = hash_alg.new_hasher()?;
            hasher.update(&vec![0u8; round]);

            let mut remaining = total;
            while remaining > 0 {
                let n = remaining.min(input.len());
                hasher.update(&input[..n]);
                remaining -= n;
            }

            key.extend_from_slice(&hasher.finalize());
        }

        key.truncate(key_size);
        Ok(key)
    }
}

impl Serialize for StringToKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.id())?;
        writer.write_u8(self.hash_alg().into())?;

        if let Some(salt) = self.salt() {
            writer.write_all(salt)?;
        }

        if let Self::IteratedAndSalted { count, .. } = self {
            writer.write_u8(*count)?;
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            Self::Simple { .. } => 2,
            Self::Salted { .. } => 10,
            Self::IteratedAndSalted { .. } => 11,
        }
    }
}

/// How the secret part of a key is protected, as announced by the s2k usage octet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S2kParams {
    /// Usage `0`: cleartext key material.
    Unprotected,
    /// Usage is a symmetric algorithm id, the key is MD5 of the passphrase. Two octet checksum.
    LegacyCfb { sym_alg: SymmetricKeyAlgorithm },
    /// Usage `254`: SHA-1 checksum inside the encrypted data.
    Cfb {
        sym_alg: SymmetricKeyAlgorithm,
        s2k: StringToKey,
    },
    /// Usage `255`: two octet checksum inside the encrypted data.
    MalleableCfb {
        sym_alg: SymmetricKeyAlgorithm,
        s2k: StringToKey,
    },
}

impl S2kParams {
    pub fn usage(&self) -> u8 {
        match self {
            Self::Unprotected => 0,
            Self::LegacyCfb { sym_alg } => (*sym_alg).into(),
            Self::Cfb { .. } => 254,
            Self::MalleableCfb { .. } => 255,
        }
    }

    pub fn sym_alg(&self) -> Option<SymmetricKeyAlgorithm> {
        match self {
            Self::Unprotected => None,
            Self::LegacyCfb { sym_alg }
            | Self::Cfb { sym_alg, .. }
            | Self::MalleableCfb { sym_alg, .. } => Some(*sym_alg),
        }
    }

    /// The specifier used to turn the passphrase into a key.
    pub fn string_to_key(&self) -> Option<StringToKey> {
        match self {
            Self::Unprotected => None,
            Self::LegacyCfb { .. } => Some(StringToKey::Simple {
                hash_alg: HashAlgorithm::Md5,
            }),
            Self::Cfb { s2k, .. } | Self::MalleableCfb { s2k, .. } => Some(s2k.clone()),
        }
    }

    /// Reads the usage octet and, for 254 and 255, the algorithm and specifier following it.
    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let usage = i.read_u8()?;
        let params = match usage {
            0 => Self::Unprotected,
            254 | 255 => {
                let sym_alg = SymmetricKeyAlgorithm::from(i.read_u8()?);
                let s2k = StringToKey::try_from_buf(&mut i)?;
                if usage == 254 {
                    Self::Cfb { sym_alg, s2k }
                } else {
                    Self::MalleableCfb { sym_alg, s2k }
                }
            }
            alg => Self::LegacyCfb {
                sym_alg: SymmetricKeyAlgorithm::from(alg),
            },
        };
        Ok(params)
    }
}

impl Serialize for S2kParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.usage())?;
        match self {
            Self::Cfb { sym_alg, s2k } | Self::MalleableCfb { sym_alg, s2k } => {
                writer.write_u8((*sym_alg).into())?;
                s2k.to_writer(writer)?;
            }
            Self::Unprotected | Self::LegacyCfb { .. } => {}
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            Self::Cfb { s2k, .. } | Self::MalleableCfb { s2k, .. } => 2 + s2k.write_len(),
            Self::Unprotected | Self::LegacyCfb { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_count_codec() {
        assert_eq!(decode_count(0), 1024);
        assert_eq!(decode_count(96), 65536);
        assert_eq!(decode_count(255), 65_011_712);
        assert_eq!(encode_count(65536), 96);
        assert_eq!(encode_count(0), 0);
        assert_eq!(encode_count(u32::MAX), 255);
        assert_eq!(decode_count(DEFAULT_ITER_COUNT), 65536);
    }

    proptest! {
        #[test]
        fn count_codec_minimal(n in 0u32..=65_011_712) {
            let c = encode_count(n);
            prop_assert!(decode_count(c) >= n);
            if c > 0 {
                prop_assert!(decode_count(c - 1) < n);
            }
        }
    }

    #[test]
    fn test_simple_derive() {
        let s2k = StringToKey::Simple {
            hash_alg: HashAlgorithm::Md5,
        };
        let key = s2k.derive_key(b"secret", 16).unwrap();
        assert_eq!(key.as_slice(), &HashAlgorithm::Md5.digest(b"secret").unwrap()[..]);

        // second round is prefixed with one zero octet
        let key = s2k.derive_key(b"secret", 24).unwrap();
        let round2 = HashAlgorithm::Md5.digest(b"\x00secret").unwrap();
        assert_eq!(&key[16..], &round2[..8]);
    }

    #[test]
    fn test_iterated_derive() {
        let salt = *b"saltsalt";
        let s2k = StringToKey::IteratedAndSalted {
            hash_alg: HashAlgorithm::Sha1,
            salt,
            count: 0,
        };
        let mut input = Vec::new();
        while input.len() < 1024 {
            input.extend_from_slice(b"saltsaltpw");
        }
        input.truncate(1024);
        let key = s2k.derive_key(b"pw", 16).unwrap();
        assert_eq!(key.as_slice(), &HashAlgorithm::Sha1.digest(&input).unwrap()[..16]);
    }

    #[test]
    fn test_iterated_short_count() {
        // a count below the input length still hashes the whole input once
        let passphrase = vec![b'x'; 2000];
        let iterated = StringToKey::IteratedAndSalted {
            hash_alg: HashAlgorithm::Sha256,
            salt: [1; 8],
            count: 0,
        };
        let salted = StringToKey::Salted {
            hash_alg: HashAlgorithm::Sha256,
            salt: [1; 8],
        };
        assert_eq!(
            iterated.derive_key(&passphrase, 32).unwrap(),
            salted.derive_key(&passphrase, 32).unwrap()
        );
    }

    #[test]
    fn test_s2k_wire() {
        let s2k = StringToKey::new_iterated(
            ChaCha8Rng::seed_from_u64(3),
            HashAlgorithm::Sha256,
            DEFAULT_ITER_COUNT,
        );
        let bytes = s2k.to_bytes().unwrap();
        assert_eq!(bytes.len(), 11);
        assert_eq!(&bytes[..2], &[3, 8]);
        assert_eq!(StringToKey::try_from_buf(&bytes[..]).unwrap(), s2k);

        assert!(StringToKey::try_from_buf(&[2u8, 8][..]).is_err());
    }

    #[test]
    fn test_usage_octet() {
        let legacy = S2kParams::try_from_buf(&[3u8][..]).unwrap();
        assert_eq!(
            legacy,
            S2kParams::LegacyCfb {
                sym_alg: SymmetricKeyAlgorithm::CAST5
            }
        );
        assert_eq!(legacy.to_bytes().unwrap(), vec![3]);

        let raw = [254u8, 9, 0, 2];
        let cfb = S2kParams::try_from_buf(&raw[..]).unwrap();
        assert_eq!(cfb.sym_alg(), Some(SymmetricKeyAlgorithm::AES256));
        assert_eq!(cfb.to_bytes().unwrap(), raw.to_vec());
    }
}
