use std::io::{self, Read, Write};

use bytes::{Buf, Bytes};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use log::debug;

use crate::errors::{bail, unsupported_err, Result};
use crate::packet::{Packet, PacketTrait};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, Tag};

/// Upper bound on the decompressed size of a single compressed data packet.
pub const MAX_DECOMPRESSED_LEN: usize = 256 * 1024 * 1024;

/// Compressed Data Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.6>
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct CompressedData {
    compression_algorithm: CompressionAlgorithm,
    #[debug("{}", hex::encode(compressed_data))]
    compressed_data: Bytes,
}

impl CompressedData {
    /// Parses a `CompressedData` packet body.
    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let alg = CompressionAlgorithm::from(i.read_u8()?);
        if let CompressionAlgorithm::Other(n) = alg {
            unsupported_err!("compression algorithm {}", n);
        }

        Ok(CompressedData {
            compression_algorithm: alg,
            compressed_data: i.rest(),
        })
    }

    /// Wraps already compressed bytes.
    pub fn from_compressed(alg: CompressionAlgorithm, data: &[u8]) -> Self {
        CompressedData {
            compression_algorithm: alg,
            compressed_data: Bytes::copy_from_slice(data),
        }
    }

    /// Serializes and compresses `packets`.
    pub fn from_message(alg: CompressionAlgorithm, packets: &[Packet]) -> Result<Self> {
        let raw = packets.to_bytes()?;
        let raw_len = raw.len();
        let compressed = match alg {
            CompressionAlgorithm::Uncompressed => raw,
            CompressionAlgorithm::ZIP => {
                let mut enc = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
                enc.write_all(&raw)?;
                enc.finish()?
            }
            CompressionAlgorithm::ZLIB => {
                let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                enc.write_all(&raw)?;
                enc.finish()?
            }
            #[cfg(feature = "bzip2")]
            CompressionAlgorithm::BZip2 => {
                let mut enc =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                enc.write_all(&raw)?;
                enc.finish()?
            }
            _ => unsupported_err!("compression with {:?}", alg),
        };
        debug!("compressed {} to {} bytes", raw_len, compressed.len());

        Ok(Self::from_compressed(alg, &compressed))
    }

    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.compression_algorithm
    }

    pub fn compressed_data(&self) -> &[u8] {
        &self.compressed_data
    }

    /// Decompresses the contents, which are themselves a packet stream.
    ///
    /// Fails if the output exceeds [`MAX_DECOMPRESSED_LEN`].
    pub fn decompress(&self) -> Result<Vec<u8>> {
        self.decompress_with_limit(MAX_DECOMPRESSED_LEN)
    }

    /// Like [`CompressedData::decompress`], failing once more than `limit` bytes come out.
    pub fn decompress_with_limit(&self, limit: usize) -> Result<Vec<u8>> {
        let input = &self.compressed_data[..];
        let cap = (limit as u64).saturating_add(1);
        let mut out = Vec::new();
        match self.compression_algorithm {
            CompressionAlgorithm::Uncompressed => {
                Read::take(input, cap).read_to_end(&mut out)?;
            }
            CompressionAlgorithm::ZIP => {
                DeflateDecoder::new(input).take(cap).read_to_end(&mut out)?;
            }
            CompressionAlgorithm::ZLIB => {
                ZlibDecoder::new(input).take(cap).read_to_end(&mut out)?;
            }
            #[cfg(feature = "bzip2")]
            CompressionAlgorithm::BZip2 => {
                bzip2::read::BzDecoder::new(input)
                    .take(cap)
                    .read_to_end(&mut out)?;
            }
            alg => unsupported_err!("decompression with {:?}", alg),
        }
        if out.len() > limit {
            bail!("decompressed data exceeds {} bytes", limit);
        }

        Ok(out)
    }
}

impl Serialize for CompressedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.compression_algorithm.into()])?;
        writer.write_all(&self.compressed_data)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + self.compressed_data.len()
    }
}

impl PacketTrait for CompressedData {
    fn tag(&self) -> Tag {
        Tag::CompressedData
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{DataMode, LiteralData, UserId};
    use crate::types::Timestamp;

    fn packets() -> Vec<Packet> {
        vec![
            LiteralData::new(
                DataMode::Binary,
                b"data",
                Timestamp::from_secs(1),
                b"hello hello hello hello",
            )
            .into(),
            UserId::new("me").into(),
        ]
    }

    #[test]
    fn test_compress_roundtrip() {
        let raw = packets().to_bytes().unwrap();
        let mut algs = vec![
            CompressionAlgorithm::Uncompressed,
            CompressionAlgorithm::ZIP,
            CompressionAlgorithm::ZLIB,
        ];
        if cfg!(feature = "bzip2") {
            algs.push(CompressionAlgorithm::BZip2);
        }
        for alg in algs {
            let c = CompressedData::from_message(alg, &packets()).unwrap();
            assert_eq!(c.algorithm(), alg);
            assert_eq!(c.decompress().unwrap(), raw, "{:?}", alg);

            let bytes = c.to_bytes().unwrap();
            let back = CompressedData::try_from_buf(&bytes[..]).unwrap();
            assert_eq!(back, c);
        }
    }

    #[test]
    fn test_unknown_algorithm() {
        let err = CompressedData::try_from_buf(&[42u8, 1, 2][..]).unwrap_err();
        assert!(matches!(err, crate::errors::Error::Unsupported { .. }));
    }

    #[test]
    fn test_decompress_limit() {
        let big = LiteralData::from_bytes(&[0u8; 100_000]);
        let raw_len = Packet::from(big.clone()).to_bytes().unwrap().len();
        for alg in [CompressionAlgorithm::Uncompressed, CompressionAlgorithm::ZLIB] {
            let c = CompressedData::from_message(alg, &[big.clone().into()]).unwrap();
            assert_eq!(c.decompress_with_limit(raw_len).unwrap().len(), raw_len);

            let err = c.decompress_with_limit(raw_len - 1).unwrap_err();
            assert!(matches!(err, crate::errors::Error::Message { .. }), "{:?}", alg);
        }
    }

    #[test]
    fn test_corrupt_stream() {
        let c = CompressedData::from_compressed(CompressionAlgorithm::ZLIB, b"\x00\x01garbage");
        assert!(c.decompress().is_err());
    }
}
