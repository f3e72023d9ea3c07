use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Buf;
use md5::Md5;
use sha1::{Digest, Sha1};

use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{unsupported_err, Result};
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{Fingerprint, KeyDetails, KeyVersion, PublicParams, Tag, Timestamp};

/// Fields shared by all key packets.
///
/// The fingerprint is derived from the other fields. It is computed on construction and
/// recomputed by every setter.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PubKeyInner {
    version: KeyVersion,
    algorithm: PublicKeyAlgorithm,
    created_at: Timestamp,
    /// Days of validity, only present in v2 and v3 keys.
    expiration: Option<u16>,
    public_params: PublicParams,
    fingerprint: Fingerprint,
}

impl PubKeyInner {
    pub fn new(
        version: KeyVersion,
        algorithm: PublicKeyAlgorithm,
        created_at: Timestamp,
        expiration: Option<u16>,
        public_params: PublicParams,
    ) -> Result<Self> {
        let expiration = match version {
            KeyVersion::V2 | KeyVersion::V3 => Some(expiration.unwrap_or(0)),
            KeyVersion::V4 => None,
            KeyVersion::Other(v) => unsupported_err!("key version {}", v),
        };
        let fingerprint =
            compute_fingerprint(version, algorithm, created_at, expiration, &public_params)?;

        Ok(PubKeyInner {
            version,
            algorithm,
            created_at,
            expiration,
            public_params,
            fingerprint,
        })
    }

    /// Parses the public part of a key packet body, leaving anything after it in `i`.
    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = KeyVersion::from(i.read_u8()?);
        let (created_at, expiration) = match version {
            KeyVersion::V2 | KeyVersion::V3 => {
                let created_at = Timestamp::from_secs(i.read_be_u32()?);
                (created_at, Some(i.read_be_u16()?))
            }
            KeyVersion::V4 => (Timestamp::from_secs(i.read_be_u32()?), None),
            KeyVersion::Other(v) => unsupported_err!("key version {}", v),
        };
        let algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
        let public_params = PublicParams::try_from_buf(algorithm, &mut i)?;

        Self::new(version, algorithm, created_at, expiration, public_params)
    }

    pub fn expiration(&self) -> Option<u16> {
        self.expiration
    }

    pub fn set_created_at(&mut self, created_at: Timestamp) -> Result<()> {
        self.fingerprint = compute_fingerprint(
            self.version,
            self.algorithm,
            created_at,
            self.expiration,
            &self.public_params,
        )?;
        self.created_at = created_at;
        Ok(())
    }

    pub fn set_public_params(&mut self, public_params: PublicParams) -> Result<()> {
        self.fingerprint = compute_fingerprint(
            self.version,
            self.algorithm,
            self.created_at,
            self.expiration,
            &public_params,
        )?;
        self.public_params = public_params;
        Ok(())
    }
}

fn write_body<W: io::Write>(
    writer: &mut W,
    version: KeyVersion,
    algorithm: PublicKeyAlgorithm,
    created_at: Timestamp,
    expiration: Option<u16>,
    public_params: &PublicParams,
) -> Result<()> {
    writer.write_u8(version.into())?;
    created_at.to_writer(writer)?;
    if let Some(days) = expiration {
        writer.write_u16::<BigEndian>(days)?;
    }
    writer.write_u8(algorithm.into())?;
    public_params.to_writer(writer)?;

    Ok(())
}

/// `0x99 ‖ u16 length ‖ body`, the form a key takes in key signatures and v4 fingerprints.
fn fingerprint_material(
    version: KeyVersion,
    algorithm: PublicKeyAlgorithm,
    created_at: Timestamp,
    expiration: Option<u16>,
    public_params: &PublicParams,
) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    write_body(&mut body, version, algorithm, created_at, expiration, public_params)?;

    let mut out = Vec::with_capacity(body.len() + 3);
    out.write_u8(0x99)?;
    out.write_u16::<BigEndian>(body.len().try_into()?)?;
    out.extend_from_slice(&body);
    Ok(out)
}

fn compute_fingerprint(
    version: KeyVersion,
    algorithm: PublicKeyAlgorithm,
    created_at: Timestamp,
    expiration: Option<u16>,
    public_params: &PublicParams,
) -> Result<Fingerprint> {
    match version {
        KeyVersion::V2 | KeyVersion::V3 => {
            // MD5 over the key material without the MPI length prefixes
            let mut h = Md5::new();
            match public_params {
                PublicParams::Unknown { data } => h.update(data),
                _ => {
                    for mpi in public_params.mpis() {
                        h.update(mpi.as_ref());
                    }
                }
            }
            Fingerprint::new(version, &h.finalize())
        }
        KeyVersion::V4 => {
            let material =
                fingerprint_material(version, algorithm, created_at, expiration, public_params)?;
            Fingerprint::new(version, &Sha1::digest(&material))
        }
        KeyVersion::Other(v) => unsupported_err!("fingerprint for key version {}", v),
    }
}

impl KeyDetails for PubKeyInner {
    fn version(&self) -> KeyVersion {
        self.version
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    fn public_params(&self) -> &PublicParams {
        &self.public_params
    }

    fn fingerprint(&self) -> Fingerprint {
        self.fingerprint.clone()
    }

    fn fingerprint_material(&self) -> Result<Vec<u8>> {
        fingerprint_material(
            self.version,
            self.algorithm,
            self.created_at,
            self.expiration,
            &self.public_params,
        )
    }
}

impl Serialize for PubKeyInner {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        write_body(
            writer,
            self.version,
            self.algorithm,
            self.created_at,
            self.expiration,
            &self.public_params,
        )
    }

    fn write_len(&self) -> usize {
        let expiration = if self.expiration.is_some() { 2 } else { 0 };
        1 + 4 + expiration + 1 + self.public_params.write_len()
    }
}

macro_rules! impl_public_key {
    ($name:ident, $tag:expr) => {
        #[derive(Debug, PartialEq, Eq, Clone)]
        pub struct $name(PubKeyInner);

        impl $name {
            /// Creates a key packet from its parts, computing the fingerprint.
            pub fn new(
                version: KeyVersion,
                algorithm: PublicKeyAlgorithm,
                created_at: Timestamp,
                expiration: Option<u16>,
                public_params: PublicParams,
            ) -> Result<Self> {
                PubKeyInner::new(version, algorithm, created_at, expiration, public_params)
                    .map(Self)
            }

            pub fn try_from_buf<B: Buf>(i: B) -> Result<Self> {
                PubKeyInner::try_from_buf(i).map(Self)
            }

            pub fn inner(&self) -> &PubKeyInner {
                &self.0
            }

            pub fn expiration(&self) -> Option<u16> {
                self.0.expiration()
            }

            pub fn set_created_at(&mut self, created_at: Timestamp) -> Result<()> {
                self.0.set_created_at(created_at)
            }

            pub fn set_public_params(&mut self, public_params: PublicParams) -> Result<()> {
                self.0.set_public_params(public_params)
            }
        }

        impl From<PubKeyInner> for $name {
            fn from(inner: PubKeyInner) -> Self {
                Self(inner)
            }
        }

        impl KeyDetails for $name {
            fn version(&self) -> KeyVersion {
                self.0.version()
            }

            fn created_at(&self) -> Timestamp {
                self.0.created_at()
            }

            fn algorithm(&self) -> PublicKeyAlgorithm {
                self.0.algorithm()
            }

            fn public_params(&self) -> &PublicParams {
                self.0.public_params()
            }

            fn fingerprint(&self) -> Fingerprint {
                self.0.fingerprint()
            }

            fn fingerprint_material(&self) -> Result<Vec<u8>> {
                self.0.fingerprint_material()
            }
        }

        impl Serialize for $name {
            fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
                self.0.to_writer(writer)
            }

            fn write_len(&self) -> usize {
                self.0.write_len()
            }
        }

        impl PacketTrait for $name {
            fn tag(&self) -> Tag {
                $tag
            }
        }
    };
}

impl_public_key!(PublicKey, Tag::PublicKey);
impl_public_key!(PublicSubkey, Tag::PublicSubkey);

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::types::MpiBytes;

    fn params() -> PublicParams {
        PublicParams::Rsa {
            n: MpiBytes::from_slice(&hex!("c1d2e3f4a5b6c7d8e9f0112233445566")),
            e: MpiBytes::from_slice(&[0x01, 0x00, 0x01]),
        }
    }

    #[test]
    fn test_v4_fingerprint() {
        let key = PublicKey::new(
            KeyVersion::V4,
            PublicKeyAlgorithm::RSA,
            Timestamp::from_secs(0x5a00_0000),
            None,
            params(),
        )
        .unwrap();

        let material = key.fingerprint_material().unwrap();
        assert_eq!(&material[..3], &[0x99, 0x00, 0x1d]);
        assert_eq!(&material[3..], &key.to_bytes().unwrap()[..]);

        let expected = Sha1::digest(&material);
        assert_eq!(key.fingerprint().as_bytes(), &expected[..]);
        assert_eq!(key.fingerprint().len(), 20);
        assert_eq!(key.key_id().as_ref(), &expected[12..]);

        let again = PublicKey::new(
            KeyVersion::V4,
            PublicKeyAlgorithm::RSA,
            Timestamp::from_secs(0x5a00_0000),
            None,
            params(),
        )
        .unwrap();
        assert_eq!(again.fingerprint(), key.fingerprint());
    }

    #[test]
    fn test_setters_recompute_fingerprint() {
        let mut key = PublicKey::new(
            KeyVersion::V4,
            PublicKeyAlgorithm::RSA,
            Timestamp::from_secs(1),
            None,
            params(),
        )
        .unwrap();
        let before = key.fingerprint();

        key.set_created_at(Timestamp::from_secs(2)).unwrap();
        assert_ne!(key.fingerprint(), before);
        assert_eq!(key.created_at(), Timestamp::from_secs(2));

        key.set_created_at(Timestamp::from_secs(1)).unwrap();
        assert_eq!(key.fingerprint(), before);
    }

    #[test]
    fn test_v3_fingerprint() {
        let key = PublicKey::new(
            KeyVersion::V3,
            PublicKeyAlgorithm::RSA,
            Timestamp::from_secs(1),
            Some(30),
            params(),
        )
        .unwrap();

        let mut h = Md5::new();
        h.update(hex!("c1d2e3f4a5b6c7d8e9f0112233445566"));
        h.update([0x01, 0x00, 0x01]);
        assert_eq!(key.fingerprint().as_bytes(), &h.finalize()[..]);

        // the creation time is not part of a v3 fingerprint
        let mut later = key.clone();
        later.set_created_at(Timestamp::from_secs(99)).unwrap();
        assert_eq!(later.fingerprint(), key.fingerprint());
    }

    #[test]
    fn test_parse_roundtrip() {
        for (version, expiration) in [(KeyVersion::V3, Some(7)), (KeyVersion::V4, None)] {
            let key = PublicSubkey::new(
                version,
                PublicKeyAlgorithm::RSA,
                Timestamp::from_secs(1_234_567),
                expiration,
                params(),
            )
            .unwrap();
            let bytes = key.to_bytes().unwrap();
            assert_eq!(bytes.len(), key.write_len());

            let back = PublicSubkey::try_from_buf(&bytes[..]).unwrap();
            assert_eq!(back, key);
            assert_eq!(back.expiration(), expiration);
        }
    }

    #[test]
    fn test_unknown_version() {
        let err = PublicKey::try_from_buf(&hex!("05 00000001 01")[..]).unwrap_err();
        assert!(matches!(err, crate::errors::Error::Unsupported { .. }));
    }
}
