use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use crate::errors::{bail, Result};
use crate::packet::signature::types::*;
use crate::packet::signature::{Subpacket, SubpacketData, SubpacketLength};
use crate::ser::Serialize;

impl Serialize for SubpacketLength {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Self::One(l) => writer.write_u8(*l)?,
            Self::Two(l) => {
                let l = l - 192;
                writer.write_u8(((l >> 8) + 192) as u8)?;
                writer.write_u8((l & 0xFF) as u8)?;
            }
            Self::Five(l) => {
                writer.write_u8(0xFF)?;
                writer.write_u32::<BigEndian>(*l)?;
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Two(_) => 2,
            Self::Five(_) => 5,
        }
    }
}

impl Subpacket {
    /// The length to write: the stored form, unless it no longer matches the body.
    fn effective_len(&self) -> SubpacketLength {
        let needed = self.data.write_len() + 1;
        if self.len.len() == needed {
            self.len
        } else {
            SubpacketLength::encode(needed as u32)
        }
    }
}

impl Serialize for Subpacket {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.effective_len().to_writer(writer)?;
        writer.write_u8(self.typ().as_u8(self.is_critical))?;
        self.data.to_writer(writer)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        self.effective_len().write_len() + 1 + self.data.write_len()
    }
}

impl Serialize for SubpacketData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            SubpacketData::SignatureCreationTime(t) => t.to_writer(writer)?,
            SubpacketData::SignatureExpirationTime(secs)
            | SubpacketData::KeyExpirationTime(secs) => {
                writer.write_u32::<BigEndian>(*secs)?;
            }
            SubpacketData::Issuer(id) => writer.write_all(id.as_ref())?,
            SubpacketData::PreferredSymmetricAlgorithms(algs) => {
                writer.write_all(&algs.iter().map(|&a| u8::from(a)).collect::<Vec<_>>())?;
            }
            SubpacketData::PreferredHashAlgorithms(algs) => {
                writer.write_all(&algs.iter().map(|&a| u8::from(a)).collect::<Vec<_>>())?;
            }
            SubpacketData::PreferredCompressionAlgorithms(algs) => {
                writer.write_all(&algs.iter().map(|&a| u8::from(a)).collect::<Vec<_>>())?;
            }
            SubpacketData::KeyServerPreferences(data)
            | SubpacketData::KeyFlags(data)
            | SubpacketData::Features(data)
            | SubpacketData::PreferredKeyServer(data)
            | SubpacketData::SignersUserID(data)
            | SubpacketData::PolicyURI(data)
            | SubpacketData::RegularExpression(data)
            | SubpacketData::Other(_, data) => writer.write_all(data)?,
            SubpacketData::RevocationReason(code, reason) => {
                writer.write_u8((*code).into())?;
                writer.write_all(reason)?;
            }
            SubpacketData::IsPrimary(v)
            | SubpacketData::Revocable(v)
            | SubpacketData::ExportableCertification(v) => writer.write_u8(u8::from(*v))?,
            SubpacketData::EmbeddedSignature(sig) => sig.to_writer(writer)?,
            SubpacketData::Notation(n) => {
                writer.write_all(&n.flags)?;
                writer.write_u16::<BigEndian>(n.name.len().try_into()?)?;
                writer.write_u16::<BigEndian>(n.value.len().try_into()?)?;
                writer.write_all(&n.name)?;
                writer.write_all(&n.value)?;
            }
            SubpacketData::RevocationKey(key) => {
                writer.write_u8(key.class)?;
                writer.write_u8(key.algorithm.into())?;
                writer.write_all(&key.fingerprint)?;
            }
            SubpacketData::TrustSignature(depth, value) => {
                writer.write_u8(*depth)?;
                writer.write_u8(*value)?;
            }
            SubpacketData::SignatureTarget(pub_alg, hash_alg, hash) => {
                writer.write_u8((*pub_alg).into())?;
                writer.write_u8((*hash_alg).into())?;
                writer.write_all(hash)?;
            }
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            SubpacketData::SignatureCreationTime(_)
            | SubpacketData::SignatureExpirationTime(_)
            | SubpacketData::KeyExpirationTime(_) => 4,
            SubpacketData::Issuer(_) => 8,
            SubpacketData::PreferredSymmetricAlgorithms(algs) => algs.len(),
            SubpacketData::PreferredHashAlgorithms(algs) => algs.len(),
            SubpacketData::PreferredCompressionAlgorithms(algs) => algs.len(),
            SubpacketData::KeyServerPreferences(data)
            | SubpacketData::KeyFlags(data)
            | SubpacketData::Features(data)
            | SubpacketData::PreferredKeyServer(data)
            | SubpacketData::SignersUserID(data)
            | SubpacketData::PolicyURI(data)
            | SubpacketData::RegularExpression(data)
            | SubpacketData::Other(_, data) => data.len(),
            SubpacketData::RevocationReason(_, reason) => 1 + reason.len(),
            SubpacketData::IsPrimary(_)
            | SubpacketData::Revocable(_)
            | SubpacketData::ExportableCertification(_) => 1,
            SubpacketData::EmbeddedSignature(sig) => sig.write_len(),
            SubpacketData::Notation(n) => 4 + 2 + 2 + n.name.len() + n.value.len(),
            SubpacketData::RevocationKey(_) => 1 + 1 + 20,
            SubpacketData::TrustSignature(..) => 2,
            SubpacketData::SignatureTarget(_, _, hash) => 2 + hash.len(),
        }
    }
}

impl Signature {
    /// Serializes a v2 or v3 signature.
    fn to_writer_v3<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let (Some(created), Some(issuer)) = (self.config.created, self.config.issuer) else {
            bail!("v3 signature needs a creation time and an issuer");
        };

        writer.write_u8(self.config.version.into())?;
        // length of the hashed material, always 5
        writer.write_u8(0x05)?;
        writer.write_u8(self.config.typ.into())?;
        created.to_writer(writer)?;
        writer.write_all(issuer.as_ref())?;
        writer.write_u8(self.config.pub_alg.into())?;
        writer.write_u8(self.config.hash_alg.into())?;

        writer.write_all(&self.signed_hash_value)?;
        self.signature.to_writer(writer)?;

        Ok(())
    }

    /// Serializes a v4 signature.
    fn to_writer_v4<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.config.version.into())?;
        writer.write_u8(self.config.typ.into())?;
        writer.write_u8(self.config.pub_alg.into())?;
        writer.write_u8(self.config.hash_alg.into())?;

        // hashed subpackets
        let hashed_len: u16 = self.config.hashed_subpackets.write_len().try_into()?;
        writer.write_u16::<BigEndian>(hashed_len)?;
        self.config.hashed_subpackets.to_writer(writer)?;

        // unhashed subpackets
        let unhashed_len: u16 = self.config.unhashed_subpackets.write_len().try_into()?;
        writer.write_u16::<BigEndian>(unhashed_len)?;
        self.config.unhashed_subpackets.to_writer(writer)?;

        writer.write_all(&self.signed_hash_value)?;
        self.signature.to_writer(writer)?;

        Ok(())
    }
}

impl Serialize for Signature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self.config.version {
            SignatureVersion::V2 | SignatureVersion::V3 => self.to_writer_v3(writer),
            SignatureVersion::V4 => self.to_writer_v4(writer),
            SignatureVersion::Other(v) => bail!("can not write signature version {}", v),
        }
    }

    fn write_len(&self) -> usize {
        let sig_len = self.signature.write_len();
        match self.config.version {
            SignatureVersion::V2 | SignatureVersion::V3 => 1 + 1 + 5 + 8 + 2 + 2 + sig_len,
            _ => {
                4 + 2
                    + self.config.hashed_subpackets.write_len()
                    + 2
                    + self.config.unhashed_subpackets.write_len()
                    + 2
                    + sig_len
            }
        }
    }
}
