use std::rc::Rc;

use bytes::Bytes;
use log::{debug, warn};
use rand::{CryptoRng, Rng};
use ::rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::composed::encrypt::first_decrypting;
use crate::composed::sign::sign_material;
use crate::composed::{CleartextSignedMessage, Message, SignOptions, SignedGroup};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::rsa;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{bail, ensure_eq, format_err, Error, Result};
use crate::packet::{
    AnyKey, KeyFlags, Packet, PublicKeyEncryptedSessionKey, SecretKey, SecretSubkey, Signature,
    SignatureType, SignatureVersion, SignerTable, Subpacket, SubpacketData, UserId,
    VerifierTable,
};
use crate::types::{
    KeyDetails, KeyId, MpiBytes, PlainSecretParams, StringToKey, Timestamp, DEFAULT_ITER_COUNT,
};

/// Hash algorithms registered in the signer and verifier tables.
const HASHES: [HashAlgorithm; 7] = [
    HashAlgorithm::Md5,
    HashAlgorithm::Sha1,
    HashAlgorithm::Ripemd160,
    HashAlgorithm::Sha256,
    HashAlgorithm::Sha384,
    HashAlgorithm::Sha512,
    HashAlgorithm::Sha224,
];

/// RSA keys held in a key message, with the passphrase protecting their secret parts.
#[derive(Debug, Clone)]
pub struct RsaKeys {
    keys: Message,
    passphrase: Option<Zeroizing<Vec<u8>>>,
}

impl RsaKeys {
    pub fn new(keys: Message) -> Self {
        RsaKeys {
            keys,
            passphrase: None,
        }
    }

    /// Sets the passphrase used to unlock protected secret keys.
    pub fn with_passphrase(mut self, passphrase: &[u8]) -> Self {
        self.passphrase = Some(Zeroizing::new(passphrase.to_vec()));
        self
    }

    /// Generates a primary key certified for `user_id` and an encryption subkey bound to it.
    pub fn generate<R: CryptoRng + Rng>(rng: &mut R, bit_size: usize, user_id: &str) -> Result<Self> {
        let created = Timestamp::now();
        let primary = SecretKey::generate_rsa(rng, bit_size, created)?;
        let subkey = SecretSubkey::generate_rsa(rng, bit_size, created)?;
        debug!("generated key {}", primary.fingerprint());

        let keys: Message = vec![Packet::from(primary), Packet::from(UserId::new(user_id))].into();
        let this = RsaKeys::new(keys);
        let opts = SignOptions {
            created: Some(created),
            ..Default::default()
        };
        let mut keys = this.sign_key_userid(&this.keys, None, &opts)?;

        // subkey binding, flagged for encryption
        let primary = this.find_secret(None)?;
        let signers = this.signer_table(primary)?;
        let group = SignedGroup::KeySubkey {
            key: this.keys[0].clone(),
            subkey: subkey.clone().into(),
            signatures: Vec::new(),
        };
        let mut flags = KeyFlags::default();
        flags.set_encrypt_comms(true);
        flags.set_encrypt_storage(true);
        let flags = SubpacketData::KeyFlags(Bytes::from(Vec::from(flags)));
        let typ = SignatureType::SubkeyBinding;
        let material = group.material_for(typ, SignatureVersion::V4)?;
        let binding = sign_material(
            &material,
            typ,
            &primary,
            &signers,
            &opts,
            vec![Subpacket::regular(flags)?],
        )?;

        keys.push(subkey);
        keys.push(binding);
        Ok(RsaKeys::new(keys))
    }

    pub fn keys(&self) -> &Message {
        &self.keys
    }

    /// The key message with every secret key replaced by its public part.
    pub fn public_keys(&self) -> Message {
        self.keys
            .iter()
            .map(|packet| match packet {
                Packet::SecretKey(k) => Packet::from(k.public_key()),
                Packet::SecretSubkey(k) => Packet::from(k.public_key()),
                other => other.clone(),
            })
            .collect()
    }

    /// Protects all secret keys with `passphrase`, using an iterated and salted SHA256 S2K
    /// and a SHA-1 checksum.
    pub fn protect<R: CryptoRng + Rng>(
        &mut self,
        rng: &mut R,
        passphrase: &[u8],
        alg: SymmetricKeyAlgorithm,
    ) -> Result<()> {
        let mut packets = Vec::with_capacity(self.keys.len());
        for packet in self.keys.iter() {
            let mut packet = packet.clone();
            match packet {
                Packet::SecretKey(ref mut key) => {
                    let s2k =
                        StringToKey::new_iterated(&mut *rng, HashAlgorithm::Sha256, DEFAULT_ITER_COUNT);
                    key.encrypt(&mut *rng, passphrase, alg, s2k, 254)?;
                }
                Packet::SecretSubkey(ref mut key) => {
                    let s2k =
                        StringToKey::new_iterated(&mut *rng, HashAlgorithm::Sha256, DEFAULT_ITER_COUNT);
                    key.encrypt(&mut *rng, passphrase, alg, s2k, 254)?;
                }
                _ => {}
            }
            packets.push(packet);
        }
        self.keys = packets.into();
        self.passphrase = Some(Zeroizing::new(passphrase.to_vec()));
        Ok(())
    }

    fn secret_keys(&self) -> impl Iterator<Item = AnyKey<'_>> {
        self.keys
            .keys()
            .filter(|k| k.is_secret() && k.algorithm().is_rsa())
    }

    /// The first secret RSA key whose fingerprint ends in `id`, any secret key for `None`.
    fn find_secret(&self, id: Option<&str>) -> Result<AnyKey<'_>> {
        let id = id.unwrap_or_default();
        self.secret_keys()
            .find(|k| k.fingerprint().matches_hex_suffix(id))
            .ok_or(Error::MissingKey)
    }

    fn private_key(&self, key: AnyKey<'_>) -> Result<RsaPrivateKey> {
        let passphrase = self.passphrase.as_deref().map(|p| &p[..]);
        let plain: PlainSecretParams = match (key.secret(), key.secret_subkey()) {
            (Some(k), _) => k.unlock(passphrase)?,
            (_, Some(k)) => k.unlock(passphrase)?,
            _ => return Err(Error::MissingKey),
        };
        rsa::private_key(key.public_params(), &plain)
    }

    fn signer_table(&self, key: AnyKey<'_>) -> Result<SignerTable<'static>> {
        let private = Rc::new(self.private_key(key)?);
        let mut table = SignerTable::new();
        for hash in HASHES {
            let private = private.clone();
            table.insert(
                "RSA",
                &hash.to_string(),
                move |data: &[u8]| -> Result<Vec<MpiBytes>> {
                    let digest = hash.digest(data)?;
                    Ok(vec![rsa::sign(&private, hash, &digest)?])
                },
            );
        }
        Ok(table)
    }

    /// A signer table for the secret key selected by a fingerprint suffix.
    pub fn signers(&self, id: Option<&str>) -> Result<SignerTable<'static>> {
        self.signer_table(self.find_secret(id)?)
    }

    /// A verifier table that accepts signatures from any RSA key in this set.
    ///
    /// Signatures naming issuers are only checked against keys with those ids.
    pub fn verifiers(&self) -> VerifierTable<'static> {
        let public: Vec<(KeyId, RsaPublicKey)> = self
            .keys
            .keys()
            .filter(|k| k.algorithm().is_rsa())
            .filter_map(|k| match rsa::public_key(k.public_params()) {
                Ok(public) => Some((k.key_id(), public)),
                Err(err) => {
                    warn!("skipping key {}: {}", k.key_id().to_hex(), err);
                    None
                }
            })
            .collect();
        let public = Rc::new(public);

        let mut table = VerifierTable::new();
        for hash in HASHES {
            let public = public.clone();
            table.insert(
                "RSA",
                &hash.to_string(),
                move |data: &[u8], sig: &Signature| verify_with(&public, data, sig),
            );
        }
        table
    }

    /// The groups of `message` with only the signatures made by these keys.
    pub fn verify(&self, message: &Message) -> Result<Vec<SignedGroup>> {
        message.verified_signatures(&self.verifiers())
    }

    /// Signs the literal data of `message` with the secret key selected by `id`.
    pub fn sign(&self, message: &Message, id: Option<&str>, opts: &SignOptions) -> Result<Message> {
        let key = self.find_secret(id)?;
        message.sign(&self.signer_table(key)?, &key, opts)
    }

    /// Certifies the first user id in `message` with the secret key selected by `id`.
    pub fn sign_key_userid(
        &self,
        message: &Message,
        id: Option<&str>,
        opts: &SignOptions,
    ) -> Result<Message> {
        let key = self.find_secret(id)?;
        message.sign_key_userid(&self.signer_table(key)?, &key, opts)
    }

    /// Produces a cleartext signed message over `text`.
    pub fn clearsign(
        &self,
        text: &str,
        id: Option<&str>,
        opts: &SignOptions,
    ) -> Result<CleartextSignedMessage> {
        let key = self.find_secret(id)?;
        CleartextSignedMessage::sign(text, &self.signer_table(key)?, &key, opts)
    }

    /// Decrypts `message` with the first secret key a session key packet was made for.
    ///
    /// Wildcard session key packets are tried with every key. Returns `None` if no key
    /// recovers a working session key.
    pub fn decrypt(&self, message: &Message) -> Option<Message> {
        let candidates = pkesks(message).flat_map(|pkesk| {
            self.secret_keys()
                .filter(move |key| pkesk.matches(&key.key_id()))
                .map(move |key| self.session_key(pkesk, key))
        });
        first_decrypting(message, candidates)
    }

    /// Decrypts `message` with the secret key whose fingerprint ends in `id`, trying it on
    /// every session key packet regardless of the key id it names.
    pub fn decrypt_with_key(&self, message: &Message, id: &str) -> Option<Message> {
        let key = self.find_secret(Some(id)).ok()?;
        let candidates = pkesks(message).map(|pkesk| self.session_key(pkesk, key));
        first_decrypting(message, candidates)
    }

    fn session_key(
        &self,
        pkesk: &PublicKeyEncryptedSessionKey,
        key: AnyKey<'_>,
    ) -> Result<(SymmetricKeyAlgorithm, Zeroizing<Vec<u8>>)> {
        debug!("trying key {}", key.key_id().to_hex());
        pkesk.decrypt_rsa(&self.private_key(key)?)
    }
}

fn pkesks(message: &Message) -> impl Iterator<Item = &PublicKeyEncryptedSessionKey> {
    message.iter().filter_map(|packet| match packet {
        Packet::PublicKeyEncryptedSessionKey(pkesk) => Some(pkesk),
        _ => None,
    })
}

fn verify_with(keys: &[(KeyId, RsaPublicKey)], data: &[u8], sig: &Signature) -> Result<()> {
    let digest = sig.hash_alg().digest(data)?;
    ensure_eq!(
        &digest[..2],
        &sig.signed_hash_value[..],
        "signed hash value mismatch"
    );
    let Some(value) = sig.signature.first() else {
        bail!("signature without values");
    };

    let issuers = sig.issuers();
    let verified = keys
        .iter()
        .filter(|(id, _)| issuers.is_empty() || issuers.contains(id))
        .any(|(_, key)| rsa::verify(key, sig.hash_alg(), &digest, value.as_ref()).is_ok());
    if verified {
        Ok(())
    } else {
        Err(format_err!("no key verifies the signature"))
    }
}
