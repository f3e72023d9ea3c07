use std::io;

use bytes::{Buf, Bytes};
use rand::{CryptoRng, Rng};

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// Symmetrically Encrypted Data Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.7>
///
/// Carries no integrity protection beyond the quick check of the random prefix.
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct SymEncryptedData {
    #[debug("{}", hex::encode(data))]
    data: Bytes,
}

impl SymEncryptedData {
    pub fn from_buf<B: Buf>(mut i: B) -> Self {
        SymEncryptedData { data: i.rest() }
    }

    /// Encrypts `plaintext` (a serialized packet stream) with OpenPGP CFB.
    pub fn encrypt<R: CryptoRng + Rng>(
        rng: R,
        alg: SymmetricKeyAlgorithm,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<Self> {
        let data = alg.encrypt(rng, key, plaintext)?;
        Ok(SymEncryptedData { data: data.into() })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decrypts the contents. Fails if the quick check of the prefix does not match.
    pub fn decrypt(&self, alg: SymmetricKeyAlgorithm, key: &[u8]) -> Result<Vec<u8>> {
        alg.decrypt(key, &self.data)
    }
}

impl Serialize for SymEncryptedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}

impl PacketTrait for SymEncryptedData {
    fn tag(&self) -> Tag {
        Tag::SymEncryptedData
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let alg = SymmetricKeyAlgorithm::AES128;
        let key = alg.new_session_key(&mut rng);

        let packet = SymEncryptedData::encrypt(&mut rng, alg, &key, b"secret stuff").unwrap();
        assert_eq!(packet.data().len(), alg.block_size() + 2 + 12);
        assert_eq!(packet.decrypt(alg, &key).unwrap(), b"secret stuff");

        let bytes = packet.to_bytes().unwrap();
        assert_eq!(SymEncryptedData::from_buf(&bytes[..]), packet);
    }
}
