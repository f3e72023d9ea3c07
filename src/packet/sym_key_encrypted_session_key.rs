use std::io;

use bytes::{Buf, Bytes};
use log::debug;
use zeroize::Zeroizing;

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{unsupported_err, Error, Result};
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{StringToKey, Tag};

/// Symmetric-Key Encrypted Session Key Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.3>
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct SymKeyEncryptedSessionKey {
    sym_algorithm: SymmetricKeyAlgorithm,
    s2k: StringToKey,
    #[debug("{:?}", encrypted_key.as_ref().map(hex::encode))]
    encrypted_key: Option<Bytes>,
}

impl SymKeyEncryptedSessionKey {
    /// Parses a `SymKeyEncryptedSessionKey` packet body. Only version 4 is known.
    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        if version != 4 {
            unsupported_err!("sym key encrypted session key version {}", version);
        }
        let sym_algorithm = SymmetricKeyAlgorithm::from(i.read_u8()?);
        let s2k = StringToKey::try_from_buf(&mut i)?;
        let encrypted_key = if i.has_remaining() {
            Some(i.rest())
        } else {
            None
        };

        Ok(SymKeyEncryptedSessionKey {
            sym_algorithm,
            s2k,
            encrypted_key,
        })
    }

    /// The session key is the key derived from the passphrase itself.
    pub fn new_without_key(sym_algorithm: SymmetricKeyAlgorithm, s2k: StringToKey) -> Self {
        SymKeyEncryptedSessionKey {
            sym_algorithm,
            s2k,
            encrypted_key: None,
        }
    }

    /// Encrypts `session_key` for `session_alg` with a key derived from `passphrase`.
    ///
    /// The derived key is used with `sym_algorithm` in CFB mode with an all zero IV.
    pub fn encrypt(
        passphrase: &[u8],
        session_key: &[u8],
        session_alg: SymmetricKeyAlgorithm,
        s2k: StringToKey,
        sym_algorithm: SymmetricKeyAlgorithm,
    ) -> Result<Self> {
        let key = s2k.derive_key(passphrase, sym_algorithm.key_size())?;

        let mut data = Vec::with_capacity(1 + session_key.len());
        data.push(session_alg.into());
        data.extend_from_slice(session_key);
        let iv = vec![0u8; sym_algorithm.block_size()];
        sym_algorithm.encrypt_with_iv_regular(&key, &iv, &mut data)?;

        Ok(SymKeyEncryptedSessionKey {
            sym_algorithm,
            s2k,
            encrypted_key: Some(data.into()),
        })
    }

    pub fn sym_algorithm(&self) -> SymmetricKeyAlgorithm {
        self.sym_algorithm
    }

    pub fn s2k(&self) -> &StringToKey {
        &self.s2k
    }

    pub fn encrypted_key(&self) -> Option<&[u8]> {
        self.encrypted_key.as_deref()
    }

    /// Recovers the session key and its algorithm.
    ///
    /// A wrong passphrase shows up as an unknown algorithm or a session key of the wrong
    /// size, both reported as integrity failures. Without an encrypted key, the derived
    /// key is returned as is and a wrong passphrase is only noticed later.
    pub fn decrypt(&self, passphrase: &[u8]) -> Result<(SymmetricKeyAlgorithm, Zeroizing<Vec<u8>>)> {
        let key = self
            .s2k
            .derive_key(passphrase, self.sym_algorithm.key_size())?;

        let Some(ref encrypted_key) = self.encrypted_key else {
            return Ok((self.sym_algorithm, key));
        };

        let mut data = Zeroizing::new(encrypted_key.to_vec());
        let iv = vec![0u8; self.sym_algorithm.block_size()];
        self.sym_algorithm
            .decrypt_with_iv_regular(&key, &iv, &mut data)?;

        let Some((&alg, session_key)) = data.split_first() else {
            return Err(Error::IntegrityFailure {
                reason: "empty session key",
            });
        };
        let alg = SymmetricKeyAlgorithm::from(alg);
        if !alg.is_supported() || alg.key_size() != session_key.len() {
            debug!("rejecting session key candidate for {:?}", alg);
            return Err(Error::IntegrityFailure {
                reason: "session key does not match its algorithm",
            });
        }

        Ok((alg, Zeroizing::new(session_key.to_vec())))
    }
}

impl Serialize for SymKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[0x04, self.sym_algorithm.into()])?;
        self.s2k.to_writer(writer)?;
        if let Some(ref key) = self.encrypted_key {
            writer.write_all(key)?;
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + self.s2k.write_len() + self.encrypted_key.as_ref().map_or(0, |k| k.len())
    }
}

impl PacketTrait for SymKeyEncryptedSessionKey {
    fn tag(&self) -> Tag {
        Tag::SymKeyEncryptedSessionKey
    }
}
