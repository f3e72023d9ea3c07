use log::{debug, warn};
use rand::{CryptoRng, Rng};

use crate::composed::Message;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{ensure, format_err, Error, Result};
use crate::packet::{
    Packet, PublicKeyEncryptedSessionKey, SymEncryptedProtectedData, SymKeyEncryptedSessionKey,
};
use crate::ser::Serialize;
use crate::types::{KeyDetails, StringToKey, DEFAULT_ITER_COUNT};

impl Message {
    /// Encrypts this message with a fresh session key.
    ///
    /// The result holds one session key packet per recipient and per passphrase, followed
    /// by the integrity protected data.
    pub fn encrypt<R: CryptoRng + Rng, K: KeyDetails>(
        &self,
        rng: &mut R,
        alg: SymmetricKeyAlgorithm,
        recipients: &[K],
        passphrases: &[&[u8]],
    ) -> Result<Message> {
        ensure!(
            !recipients.is_empty() || !passphrases.is_empty(),
            "encryption needs a recipient or a passphrase"
        );
        ensure!(alg.is_supported(), "unsupported symmetric algorithm {:?}", alg);

        let session_key = alg.new_session_key(&mut *rng);
        let mut out = Message::new();

        for key in recipients {
            debug!("encrypting session key to {}", key.key_id().to_hex());
            out.push(PublicKeyEncryptedSessionKey::from_session_key(
                &mut *rng,
                &session_key,
                alg,
                key,
            )?);
        }
        for passphrase in passphrases {
            let s2k =
                StringToKey::new_iterated(&mut *rng, HashAlgorithm::Sha256, DEFAULT_ITER_COUNT);
            out.push(SymKeyEncryptedSessionKey::encrypt(
                passphrase,
                &session_key,
                alg,
                s2k,
                alg,
            )?);
        }

        let plaintext = self.to_bytes()?;
        out.push(SymEncryptedProtectedData::encrypt(
            &mut *rng,
            alg,
            &session_key,
            &plaintext,
        )?);

        Ok(out)
    }

    /// Decrypts the first encrypted data packet with a known session key.
    pub fn decrypt_with_session_key(
        &self,
        alg: SymmetricKeyAlgorithm,
        session_key: &[u8],
    ) -> Result<Message> {
        let plaintext = self
            .iter()
            .find_map(|packet| match packet {
                Packet::SymEncryptedProtectedData(data) => Some(data.decrypt(alg, session_key)),
                Packet::SymEncryptedData(data) => Some(data.decrypt(alg, session_key)),
                _ => None,
            })
            .ok_or_else(|| format_err!("message holds no encrypted data"))??;

        Message::from_bytes(&plaintext)
    }

    /// Decrypts with a passphrase, trying every passphrase protected session key.
    ///
    /// A wrong passphrase fails with an integrity error.
    pub fn decrypt_with_password(&self, passphrase: &[u8]) -> Result<Message> {
        let mut last_err = None;
        for packet in self.iter() {
            let Packet::SymKeyEncryptedSessionKey(skesk) = packet else {
                continue;
            };
            let res = skesk
                .decrypt(passphrase)
                .and_then(|(alg, key)| self.decrypt_with_session_key(alg, &key));
            match res {
                Ok(msg) => return Ok(msg),
                Err(err) => {
                    warn!("session key candidate rejected: {}", err);
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or(Error::MissingKey))
    }
}

/// Tries `candidates` in order, returning the first session key that decrypts the message.
pub(super) fn first_decrypting<I>(msg: &Message, candidates: I) -> Option<Message>
where
    I: IntoIterator<Item = Result<(SymmetricKeyAlgorithm, zeroize::Zeroizing<Vec<u8>>)>>,
{
    for candidate in candidates {
        match candidate.and_then(|(alg, key)| msg.decrypt_with_session_key(alg, &key)) {
            Ok(inner) => return Some(inner),
            Err(err) => warn!("session key candidate rejected: {}", err),
        }
    }
    None
}
