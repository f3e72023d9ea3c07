//! # Armor module
//!
//! ASCII armor, the radix-64 text encoding of OpenPGP data.
//! Ref: <https://tools.ietf.org/html/rfc4880.html#section-6>

use derive_builder::Builder;

use crate::errors::Error;

mod reader;
mod writer;

pub use self::reader::*;
pub use self::writer::*;

/// Options for decoding armored data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Builder)]
#[builder(default, build_fn(error = "Error"))]
pub struct ArmorOptions {
    /// Reject blocks whose checksum line does not match the decoded data.
    ///
    /// Off by default, a wrong or missing checksum is only logged.
    pub verify_checksum: bool,
}

/// OpenPGP CRC24 of `data`.
///
/// Initial value `0xB704CE`, generator `0x1864CFB`, processed MSB first.
pub fn crc24(data: &[u8]) -> u32 {
    crc24::hash_raw(data) & 0x00FF_FFFF
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_crc24_empty() {
        assert_eq!(crc24(b""), 0xB704CE);
    }

    #[test]
    fn test_crc24_check_value() {
        assert_eq!(crc24(b"123456789"), 0x21CF02);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn armor_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            for typ in [BlockType::Message, BlockType::PublicKey, BlockType::Signature] {
                let text = enarmor(&data, typ, None)?;
                let back = unarmor(&text, typ);
                prop_assert_eq!(back.as_deref(), Some(&data[..]));

                let opts = ArmorOptionsBuilder::default().verify_checksum(true).build()?;
                let block = decode(text.as_bytes(), opts)?;
                prop_assert_eq!(block.typ, typ);
                prop_assert_eq!(block.data, data.clone());
            }
        }
    }
}
