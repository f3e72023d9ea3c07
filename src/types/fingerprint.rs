use std::fmt;

use crate::errors::{unsupported_err, Error, Result};
use crate::types::{KeyId, KeyVersion};

/// Key fingerprint: MD5 for v2/v3 keys, SHA-1 for v4 keys.
#[derive(Clone, Eq, PartialEq, Hash, derive_more::Debug)]
pub enum Fingerprint {
    #[debug("{}", hex::encode(_0))]
    V3([u8; 16]),
    #[debug("{}", hex::encode(_0))]
    V4([u8; 20]),
}

impl Fingerprint {
    pub fn new(version: KeyVersion, fp: &[u8]) -> Result<Self> {
        let fp = match version {
            KeyVersion::V2 | KeyVersion::V3 => {
                Fingerprint::V3(fp.try_into().map_err(|_| Error::InvalidInput)?)
            }
            KeyVersion::V4 => Fingerprint::V4(fp.try_into().map_err(|_| Error::InvalidInput)?),
            KeyVersion::Other(v) => unsupported_err!("fingerprint for key version {}", v),
        };

        Ok(fp)
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::V3(fp) => &fp[..],
            Self::V4(fp) => &fp[..],
        }
    }

    /// The last eight bytes of the fingerprint.
    pub fn key_id(&self) -> KeyId {
        let bytes = self.as_bytes();
        let mut id = [0u8; 8];
        id.copy_from_slice(&bytes[bytes.len() - 8..]);
        id.into()
    }

    /// Upper case hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.as_bytes())
    }

    /// Case insensitive suffix match against the hex form. An empty needle matches.
    pub fn matches_hex_suffix(&self, needle: &str) -> bool {
        self.to_hex().ends_with(&needle.to_ascii_uppercase())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_and_suffix() {
        let raw: Vec<u8> = (1..=20).collect();
        let fp = Fingerprint::new(KeyVersion::V4, &raw).unwrap();
        assert_eq!(fp.key_id().as_ref(), &raw[12..]);
        assert!(fp.matches_hex_suffix(""));
        assert!(fp.matches_hex_suffix("4"));
        assert!(fp.matches_hex_suffix("0f1011121314"));
        assert!(fp.matches_hex_suffix(&fp.to_hex()));
        assert!(!fp.matches_hex_suffix("15"));
    }

    #[test]
    fn test_wrong_length() {
        assert!(Fingerprint::new(KeyVersion::V4, &[0u8; 16]).is_err());
        assert!(Fingerprint::new(KeyVersion::V3, &[0u8; 16]).is_ok());
        assert!(Fingerprint::new(KeyVersion::Other(9), &[0u8; 20]).is_err());
    }
}
