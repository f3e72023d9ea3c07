use std::io;

use bytes::Buf;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{unsupported_err, Result};
use crate::packet::{PacketTrait, SignatureType};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{KeyId, Tag};

/// One-Pass Signature Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.4>
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OnePassSignature {
    pub typ: SignatureType,
    pub hash_algorithm: HashAlgorithm,
    pub pub_algorithm: PublicKeyAlgorithm,
    pub key_id: KeyId,
    /// Zero if the next packet is another one-pass signature over the same data.
    pub last: u8,
}

impl OnePassSignature {
    pub fn new(
        typ: SignatureType,
        hash_algorithm: HashAlgorithm,
        pub_algorithm: PublicKeyAlgorithm,
        key_id: KeyId,
    ) -> Self {
        OnePassSignature {
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last: 1,
        }
    }

    /// Parses a `OnePassSignature` packet body. Only version 3 is known.
    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        if version != 3 {
            unsupported_err!("one pass signature version {}", version);
        }
        let typ = SignatureType::from(i.read_u8()?);
        let hash_algorithm = HashAlgorithm::from(i.read_u8()?);
        let pub_algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
        let key_id = KeyId::from(i.read_array::<8>()?);
        let last = i.read_u8()?;

        Ok(OnePassSignature {
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last,
        })
    }

    pub fn is_nested(&self) -> bool {
        self.last == 0
    }
}

impl Serialize for OnePassSignature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[
            3,
            self.typ.into(),
            self.hash_algorithm.into(),
            self.pub_algorithm.into(),
        ])?;
        writer.write_all(self.key_id.as_ref())?;
        writer.write_all(&[self.last])?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        4 + 8 + 1
    }
}

impl PacketTrait for OnePassSignature {
    fn tag(&self) -> Tag {
        Tag::OnePassSignature
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_parse_and_write() {
        let body = hex!("03 00 08 01 0102030405060708 01");
        let ops = OnePassSignature::try_from_buf(&body[..]).unwrap();
        assert_eq!(ops.typ, SignatureType::Binary);
        assert_eq!(ops.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(ops.pub_algorithm, PublicKeyAlgorithm::RSA);
        assert!(!ops.is_nested());
        assert_eq!(ops.to_bytes().unwrap(), body);
    }

    #[test]
    fn test_truncated() {
        assert!(OnePassSignature::try_from_buf(&hex!("03 00 08 01 0102")[..]).is_err());
    }
}
