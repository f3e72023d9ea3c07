use std::fmt;

use crate::errors::{Error, Result};

/// Eight-byte key id: the low 64 bits of a key's fingerprint.
#[derive(Clone, Copy, Eq, PartialEq, Hash, derive_more::Debug)]
#[debug("KeyId({})", hex::encode(_0))]
pub struct KeyId([u8; 8]);

impl AsRef<[u8]> for KeyId {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl From<[u8; 8]> for KeyId {
    fn from(value: [u8; 8]) -> Self {
        KeyId(value)
    }
}

impl KeyId {
    /// The all-zero key id, used by senders that hide the recipient.
    pub const WILDCARD: KeyId = KeyId([0u8; 8]);

    pub fn from_slice(input: &[u8]) -> Result<KeyId> {
        let r: [u8; 8] = input.try_into().map_err(|_| Error::InvalidInput)?;
        Ok(KeyId(r))
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == [0u8; 8]
    }

    /// Upper case hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id() {
        let id = KeyId::from_slice(&[0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04]).unwrap();
        assert_eq!(id.to_string(), "DEADBEEF01020304");
        assert!(!id.is_wildcard());
        assert!(KeyId::WILDCARD.is_wildcard());
        assert!(KeyId::from_slice(&[1, 2, 3]).is_err());
    }
}
