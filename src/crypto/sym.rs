use aes::{Aes128, Aes192, Aes256};
use blowfish::Blowfish;
use cast5::Cast5;
use cfb_mode::{
    cipher::{AsyncStreamCipher, KeyIvInit},
    Decryptor, Encryptor,
};
use cipher::{BlockCipher, BlockEncryptMut};
use des::TdesEde3;
use log::debug;
use num_enum::{FromPrimitive, IntoPrimitive};
use rand::{CryptoRng, Rng};
use sha1::{Digest, Sha1};
use twofish::Twofish;
use zeroize::Zeroizing;

use crate::errors::{bail, unsupported_err, Error, Result};

/// Modification detection code trailer: tag octet, length octet and the SHA-1 digest.
const MDC_LEN: usize = 22;
const MDC_HEADER: [u8; 2] = [0xD3, 0x14];

#[derive(Debug, Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

fn cfb<C>(direction: Direction, key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()>
where
    C: BlockEncryptMut + BlockCipher,
    Encryptor<C>: KeyIvInit,
    Decryptor<C>: KeyIvInit,
{
    match direction {
        Direction::Encrypt => Encryptor::<C>::new_from_slices(key, iv)?.encrypt(data),
        Direction::Decrypt => Decryptor::<C>::new_from_slices(key, iv)?.decrypt(data),
    }
    Ok(())
}

/// Available symmetric key algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-9.2>
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum SymmetricKeyAlgorithm {
    /// Plaintext or unencrypted data
    #[cfg_attr(test, proptest(skip))]
    Plaintext = 0,
    /// IDEA, recognized but not supported
    #[cfg_attr(test, proptest(skip))]
    IDEA = 1,
    /// Triple-DES
    TripleDES = 2,
    /// CAST5
    CAST5 = 3,
    /// Blowfish
    Blowfish = 4,
    // 5 & 6 are reserved for DES/SK
    /// AES with 128-bit key
    AES128 = 7,
    /// AES with 192-bit key
    AES192 = 8,
    /// AES with 256-bit key
    AES256 = 9,
    /// Twofish with 256-bit key
    Twofish = 10,

    #[num_enum(catch_all)]
    #[cfg_attr(test, proptest(skip))]
    Other(u8),
}

impl Default for SymmetricKeyAlgorithm {
    fn default() -> Self {
        Self::AES128
    }
}

impl zeroize::DefaultIsZeroes for SymmetricKeyAlgorithm {}

impl SymmetricKeyAlgorithm {
    /// The size of a single block in bytes.
    pub fn block_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA
            | SymmetricKeyAlgorithm::TripleDES
            | SymmetricKeyAlgorithm::CAST5
            | SymmetricKeyAlgorithm::Blowfish => 8,
            SymmetricKeyAlgorithm::AES128
            | SymmetricKeyAlgorithm::AES192
            | SymmetricKeyAlgorithm::AES256
            | SymmetricKeyAlgorithm::Twofish => 16,
            SymmetricKeyAlgorithm::Other(_) => 0,
        }
    }

    /// The size of the key in bytes.
    pub const fn key_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA => 16,
            SymmetricKeyAlgorithm::TripleDES => 24,
            SymmetricKeyAlgorithm::CAST5 => 16,
            SymmetricKeyAlgorithm::Blowfish => 16,
            SymmetricKeyAlgorithm::AES128 => 16,
            SymmetricKeyAlgorithm::AES192 => 24,
            SymmetricKeyAlgorithm::AES256 => 32,
            SymmetricKeyAlgorithm::Twofish => 32,
            SymmetricKeyAlgorithm::Other(_) => 0,
        }
    }

    /// Returns true for ciphers this crate can run.
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            SymmetricKeyAlgorithm::Plaintext
                | SymmetricKeyAlgorithm::IDEA
                | SymmetricKeyAlgorithm::Other(_)
        )
    }

    fn apply(self, direction: Direction, key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
        match self {
            SymmetricKeyAlgorithm::Plaintext => {
                bail!("'Plaintext' is not a legal cipher for encrypted data")
            }
            SymmetricKeyAlgorithm::IDEA => unsupported_err!("IDEA is not supported"),
            SymmetricKeyAlgorithm::TripleDES => cfb::<TdesEde3>(direction, key, iv, data),
            SymmetricKeyAlgorithm::CAST5 => cfb::<Cast5>(direction, key, iv, data),
            SymmetricKeyAlgorithm::Blowfish => cfb::<Blowfish>(direction, key, iv, data),
            SymmetricKeyAlgorithm::AES128 => cfb::<Aes128>(direction, key, iv, data),
            SymmetricKeyAlgorithm::AES192 => cfb::<Aes192>(direction, key, iv, data),
            SymmetricKeyAlgorithm::AES256 => cfb::<Aes256>(direction, key, iv, data),
            SymmetricKeyAlgorithm::Twofish => cfb::<Twofish>(direction, key, iv, data),
            SymmetricKeyAlgorithm::Other(id) => {
                unsupported_err!("SymmetricKeyAlgorithm {} is unsupported", id)
            }
        }
    }

    /// Decrypt the data using CFB mode, without padding. Overwrites the input.
    /// This is regular CFB, not OpenPGP CFB.
    pub fn decrypt_with_iv_regular(self, key: &[u8], iv: &[u8], ciphertext: &mut [u8]) -> Result<()> {
        self.apply(Direction::Decrypt, key, iv, ciphertext)
    }

    /// Encrypt the data using CFB mode, without padding. Overwrites the input.
    /// This is regular CFB, not OpenPGP CFB.
    pub fn encrypt_with_iv_regular(self, key: &[u8], iv: &[u8], plaintext: &mut [u8]) -> Result<()> {
        self.apply(Direction::Encrypt, key, iv, plaintext)
    }

    /// Builds the random prefix: one block of random data followed by a repeat of its last two octets.
    fn prefix<R: CryptoRng + Rng>(self, mut rng: R) -> Vec<u8> {
        let bs = self.block_size();
        let mut prefix = vec![0u8; bs + 2];
        rng.fill_bytes(&mut prefix[..bs]);
        prefix[bs] = prefix[bs - 2];
        prefix[bs + 1] = prefix[bs - 1];
        prefix
    }

    fn check_quick(self, prefix: &[u8]) -> Result<()> {
        let bs = self.block_size();
        if prefix[bs - 2..bs] != prefix[bs..bs + 2] {
            return Err(Error::IntegrityFailure {
                reason: "cfb quick check",
            });
        }
        Ok(())
    }

    /// Encrypts in OpenPGP CFB mode, as used by Symmetrically Encrypted Data packets.
    ///
    /// Uses an all zero IV, and resynchronizes the cipher after the `BS + 2` prefix octets.
    pub fn encrypt<R: CryptoRng + Rng>(self, rng: R, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        debug!("encrypt unprotected");
        ensure_supported(self)?;

        let bs = self.block_size();
        let mut ciphertext = self.prefix(rng);
        let iv = vec![0u8; bs];
        self.encrypt_with_iv_regular(key, &iv, &mut ciphertext)?;

        // resync
        let mut data = plaintext.to_vec();
        let iv = ciphertext[2..bs + 2].to_vec();
        self.encrypt_with_iv_regular(key, &iv, &mut data)?;
        ciphertext.extend_from_slice(&data);

        Ok(ciphertext)
    }

    /// Reverses [`Self::encrypt`]. Fails with an integrity error if the quick check does not match.
    pub fn decrypt(self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        debug!("decrypt unprotected");
        ensure_supported(self)?;

        let bs = self.block_size();
        if ciphertext.len() < bs + 2 {
            return Err(Error::IntegrityFailure {
                reason: "ciphertext shorter than prefix",
            });
        }

        let iv = vec![0u8; bs];
        let mut prefix = ciphertext[..bs + 2].to_vec();
        self.decrypt_with_iv_regular(key, &iv, &mut prefix)?;
        self.check_quick(&prefix)?;

        let iv = &ciphertext[2..bs + 2];
        let mut data = ciphertext[bs + 2..].to_vec();
        self.decrypt_with_iv_regular(key, iv, &mut data)?;

        Ok(data)
    }

    /// Encrypts for a Symmetrically Encrypted Integrity Protected Data packet.
    ///
    /// The plaintext is framed as prefix, data and modification detection code,
    /// then encrypted in regular CFB mode with an all zero IV.
    pub fn encrypt_protected<R: CryptoRng + Rng>(
        self,
        rng: R,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        debug!("protected encrypt");
        ensure_supported(self)?;

        let mut buf = self.prefix(rng);
        buf.reserve(plaintext.len() + MDC_LEN);
        buf.extend_from_slice(plaintext);
        buf.extend_from_slice(&MDC_HEADER);
        let checksum = Sha1::digest(&buf);
        buf.extend_from_slice(&checksum);

        let iv = vec![0u8; self.block_size()];
        self.encrypt_with_iv_regular(key, &iv, &mut buf)?;

        Ok(buf)
    }

    /// Reverses [`Self::encrypt_protected`], checking the quick check and the modification detection code.
    pub fn decrypt_protected(self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        debug!("protected decrypt");
        ensure_supported(self)?;

        let bs = self.block_size();
        if ciphertext.len() < bs + 2 + MDC_LEN {
            return Err(Error::IntegrityFailure {
                reason: "ciphertext shorter than prefix and mdc",
            });
        }

        let mut buf = ciphertext.to_vec();
        let iv = vec![0u8; bs];
        self.decrypt_with_iv_regular(key, &iv, &mut buf)?;
        self.check_quick(&buf[..bs + 2])?;

        let mdc_start = buf.len() - MDC_LEN;
        let (covered, mdc) = buf.split_at(mdc_start + 2);
        if covered[mdc_start..] != MDC_HEADER || Sha1::digest(covered)[..] != mdc[..] {
            return Err(Error::IntegrityFailure {
                reason: "modification detection code",
            });
        }

        Ok(buf[bs + 2..mdc_start].to_vec())
    }

    /// Generate a new session key.
    pub fn new_session_key<R: Rng + CryptoRng>(self, mut rng: R) -> Zeroizing<Vec<u8>> {
        let mut session_key = Zeroizing::new(vec![0u8; self.key_size()]);
        rng.fill_bytes(&mut session_key);
        session_key
    }
}

fn ensure_supported(alg: SymmetricKeyAlgorithm) -> Result<()> {
    if !alg.is_supported() {
        unsupported_err!("symmetric algorithm {:?}", alg);
    }
    Ok(())
}
