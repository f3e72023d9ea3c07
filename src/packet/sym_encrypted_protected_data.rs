use std::io;

use bytes::{Buf, Bytes};
use rand::{CryptoRng, Rng};

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{unsupported_err, Result};
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// Symmetrically Encrypted Integrity Protected Data Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.13>
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct SymEncryptedProtectedData {
    #[debug("{}", hex::encode(data))]
    data: Bytes,
}

impl SymEncryptedProtectedData {
    /// Parses a `SymEncryptedProtectedData` packet body. Only version 1 is known.
    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        if version != 1 {
            unsupported_err!("integrity protected data version {}", version);
        }

        Ok(SymEncryptedProtectedData { data: i.rest() })
    }

    /// Encrypts `plaintext` (a serialized packet stream), appending a modification detection code.
    pub fn encrypt<R: CryptoRng + Rng>(
        rng: R,
        alg: SymmetricKeyAlgorithm,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<Self> {
        let data = alg.encrypt_protected(rng, key, plaintext)?;
        Ok(SymEncryptedProtectedData { data: data.into() })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decrypts and checks the quick check and the modification detection code.
    pub fn decrypt(&self, alg: SymmetricKeyAlgorithm, key: &[u8]) -> Result<Vec<u8>> {
        alg.decrypt_protected(key, &self.data)
    }
}

impl Serialize for SymEncryptedProtectedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[0x01])?;
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + self.data.len()
    }
}

impl PacketTrait for SymEncryptedProtectedData {
    fn tag(&self) -> Tag {
        Tag::SymEncryptedProtectedData
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let alg = SymmetricKeyAlgorithm::AES256;
        let key = alg.new_session_key(&mut rng);

        let packet =
            SymEncryptedProtectedData::encrypt(&mut rng, alg, &key, b"hello\n").unwrap();
        let bytes = packet.to_bytes().unwrap();
        assert_eq!(bytes[0], 1);
        let back = SymEncryptedProtectedData::try_from_buf(&bytes[..]).unwrap();
        assert_eq!(back.decrypt(alg, &key).unwrap(), b"hello\n");
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let alg = SymmetricKeyAlgorithm::AES128;
        let key = alg.new_session_key(&mut rng);
        let other = alg.new_session_key(&mut rng);

        let packet = SymEncryptedProtectedData::encrypt(&mut rng, alg, &key, b"data").unwrap();
        let err = packet.decrypt(alg, &other).unwrap_err();
        assert!(matches!(err, Error::IntegrityFailure { .. }));
    }

    #[test]
    fn test_unknown_version() {
        let err = SymEncryptedProtectedData::try_from_buf(&[2u8, 0, 0][..]).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
