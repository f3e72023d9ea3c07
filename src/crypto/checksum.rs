use sha1::{Digest, Sha1};

use crate::errors::{Error, Result};

/// Two octet checksum: sum of all octets mod 65536.
#[inline]
pub fn calculate_simple(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, v| acc.wrapping_add(u16::from(*v)))
}

/// Checks the two octet checksum `actual` against `data`.
#[inline]
pub fn simple(actual: [u8; 2], data: &[u8]) -> Result<()> {
    if u16::from_be_bytes(actual) != calculate_simple(data) {
        return Err(Error::IntegrityFailure {
            reason: "simple checksum",
        });
    }

    Ok(())
}

/// SHA-1 checksum over `data`.
#[inline]
pub fn calculate_sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

/// Checks the SHA-1 checksum `hash` against `data`.
#[inline]
pub fn sha1(hash: &[u8], data: &[u8]) -> Result<()> {
    if hash != calculate_sha1(data) {
        return Err(Error::IntegrityFailure {
            reason: "SHA1 checksum",
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple() {
        assert_eq!(calculate_simple(&[]), 0);
        assert_eq!(calculate_simple(&[0xff; 258]), (0xff * 258 % 65536) as u16);
        simple([0x00, 0x06], &[1, 2, 3]).unwrap();
        assert!(simple([0x00, 0x07], &[1, 2, 3])
            .unwrap_err()
            .is_integrity_failure());
    }

    #[test]
    fn test_sha1() {
        let data = b"abc";
        sha1(&calculate_sha1(data), data).unwrap();
        assert!(sha1(&[0u8; 20], data).unwrap_err().is_integrity_failure());
    }
}
