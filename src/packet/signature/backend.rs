//! Pluggable signing and verification.
//!
//! Callers register one callback per `(key algorithm, hash algorithm)` pair, using the
//! display names of [`PublicKeyAlgorithm`](crate::crypto::public_key::PublicKeyAlgorithm)
//! and [`HashAlgorithm`](crate::crypto::hash::HashAlgorithm), e.g. `("RSA", "SHA256")`.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::errors::Result;
use crate::packet::Signature;
use crate::types::MpiBytes;

/// Produces the signature values over `data`, which already includes the trailer.
pub trait Signer {
    fn sign(&self, data: &[u8]) -> Result<Vec<MpiBytes>>;
}

impl<F> Signer for F
where
    F: Fn(&[u8]) -> Result<Vec<MpiBytes>>,
{
    fn sign(&self, data: &[u8]) -> Result<Vec<MpiBytes>> {
        self(data)
    }
}

/// Checks `signature` over `data`, which already includes the trailer.
pub trait Verifier {
    fn verify(&self, data: &[u8], signature: &Signature) -> Result<()>;
}

impl<F> Verifier for F
where
    F: Fn(&[u8], &Signature) -> Result<()>,
{
    fn verify(&self, data: &[u8], signature: &Signature) -> Result<()> {
        self(data, signature)
    }
}

type AlgorithmPair = (String, String);

fn pair(key_alg: &str, hash_alg: &str) -> AlgorithmPair {
    (key_alg.to_uppercase(), hash_alg.to_uppercase())
}

#[derive(Default)]
pub struct SignerTable<'a> {
    signers: HashMap<AlgorithmPair, Box<dyn Signer + 'a>>,
}

impl<'a> SignerTable<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key_alg: &str, hash_alg: &str, signer: impl Signer + 'a) {
        self.signers.insert(pair(key_alg, hash_alg), Box::new(signer));
    }

    pub fn get(&self, key_alg: &str, hash_alg: &str) -> Option<&(dyn Signer + 'a)> {
        self.signers.get(&pair(key_alg, hash_alg)).map(|s| s.as_ref())
    }
}

impl fmt::Debug for SignerTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.signers.keys()).finish()
    }
}

#[derive(Default)]
pub struct VerifierTable<'a> {
    verifiers: HashMap<AlgorithmPair, Box<dyn Verifier + 'a>>,
}

impl<'a> VerifierTable<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key_alg: &str, hash_alg: &str, verifier: impl Verifier + 'a) {
        self.verifiers
            .insert(pair(key_alg, hash_alg), Box::new(verifier));
    }

    pub fn get(&self, key_alg: &str, hash_alg: &str) -> Option<&(dyn Verifier + 'a)> {
        self.verifiers
            .get(&pair(key_alg, hash_alg))
            .map(|v| v.as_ref())
    }

    /// Verifies `signature` over `material`.
    ///
    /// A missing verifier for the algorithm pair counts as not verified.
    pub fn verify(&self, material: &[u8], signature: &Signature) -> bool {
        let key_alg = signature.key_algorithm_name();
        let hash_alg = signature.hash_algorithm_name();
        let Some(verifier) = self.get(&key_alg, &hash_alg) else {
            debug!("no verifier for {} with {}", key_alg, hash_alg);
            return false;
        };

        let trailer = match signature.trailer() {
            Ok(trailer) => trailer,
            Err(err) => {
                debug!("no trailer: {}", err);
                return false;
            }
        };
        let mut input = Vec::with_capacity(material.len() + trailer.len());
        input.extend_from_slice(material);
        input.extend_from_slice(&trailer);

        match verifier.verify(&input, signature) {
            Ok(()) => true,
            Err(err) => {
                debug!("signature did not verify: {}", err);
                false
            }
        }
    }
}

impl fmt::Debug for VerifierTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.verifiers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_key::PublicKeyAlgorithm;
    use crate::errors::format_err;
    use crate::packet::{SignatureConfig, SignatureType};

    fn signature() -> Signature {
        let config = SignatureConfig::new_v4(
            SignatureType::Binary,
            PublicKeyAlgorithm::RSA,
            Default::default(),
            Vec::new(),
            Vec::new(),
        );
        Signature::from_config(config, [0, 0], vec![MpiBytes::from_slice(&[1])])
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut table = SignerTable::new();
        table.insert("rsa", "sha256", |_: &[u8]| -> Result<Vec<MpiBytes>> { Ok(vec![]) });
        assert!(table.get("RSA", "SHA256").is_some());
        assert!(table.get("RSA", "SHA1").is_none());
    }

    #[test]
    fn test_verify() {
        let sig = signature();
        let mut table = VerifierTable::new();
        assert!(!table.verify(b"data", &sig));

        let trailer = sig.trailer().unwrap();
        table.insert("RSA", "SHA256", move |data: &[u8], _: &Signature| -> Result<()> {
            if data.starts_with(b"data") && data.ends_with(&trailer) {
                Ok(())
            } else {
                Err(format_err!("mismatch"))
            }
        });
        assert!(table.verify(b"data", &sig));
        assert!(!table.verify(b"other", &sig));
    }
}
