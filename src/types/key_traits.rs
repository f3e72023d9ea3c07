use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::types::{Fingerprint, KeyId, KeyVersion, PublicParams, Timestamp};

/// Metadata of a key packet
pub trait KeyDetails: std::fmt::Debug {
    /// Returns the [`KeyVersion`] of this key.
    fn version(&self) -> KeyVersion;

    fn created_at(&self) -> Timestamp;

    /// Returns the algorithm for this key.
    fn algorithm(&self) -> PublicKeyAlgorithm;

    /// Returns the parameters for the public portion of this key.
    fn public_params(&self) -> &PublicParams;

    /// Returns the [`Fingerprint`] for this key.
    fn fingerprint(&self) -> Fingerprint;

    /// Returns the [`KeyId`] for this key, the last eight bytes of the fingerprint.
    fn key_id(&self) -> KeyId {
        self.fingerprint().key_id()
    }

    /// The bytes this key contributes to a key signature: `0x99`, a two octet length and the
    /// public key packet body.
    fn fingerprint_material(&self) -> Result<Vec<u8>>;
}

impl<T: KeyDetails> KeyDetails for &T {
    fn version(&self) -> KeyVersion {
        (*self).version()
    }

    fn created_at(&self) -> Timestamp {
        (*self).created_at()
    }

    fn algorithm(&self) -> PublicKeyAlgorithm {
        (*self).algorithm()
    }

    fn public_params(&self) -> &PublicParams {
        (*self).public_params()
    }

    fn fingerprint(&self) -> Fingerprint {
        (*self).fingerprint()
    }

    fn key_id(&self) -> KeyId {
        (*self).key_id()
    }

    fn fingerprint_material(&self) -> Result<Vec<u8>> {
        (*self).fingerprint_material()
    }
}
