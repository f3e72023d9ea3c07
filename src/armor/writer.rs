use std::collections::BTreeMap;
use std::io::Write;

use base64::engine::{general_purpose, Engine as _};

use crate::armor::{crc24, BlockType};
use crate::errors::Result;
use crate::ser::Serialize;

/// Base64 characters per armored line.
const LINE_LENGTH: usize = 76;

/// Writes `source` as an armor block of type `typ`.
pub fn write(
    source: &impl Serialize,
    typ: BlockType,
    writer: &mut impl Write,
    headers: Option<&BTreeMap<String, String>>,
    include_checksum: bool,
) -> Result<()> {
    let data = source.to_bytes()?;

    // write armor header
    writeln!(writer, "-----BEGIN {typ}-----")?;

    // write armor headers
    if let Some(headers) = headers {
        for (key, value) in headers.iter() {
            writeln!(writer, "{key}: {value}")?;
        }
    }
    writer.write_all(&b"\n"[..])?;

    // write body
    let encoded = general_purpose::STANDARD.encode(&data);
    for line in encoded.as_bytes().chunks(LINE_LENGTH) {
        writer.write_all(line)?;
        writer.write_all(&b"\n"[..])?;
    }

    // write crc
    if include_checksum {
        let crc = crc24(&data);
        let crc_buf = [(crc >> 16) as u8, (crc >> 8) as u8, crc as u8];
        writeln!(writer, "={}", general_purpose::STANDARD.encode(crc_buf))?;
    }

    // write footer
    writeln!(writer, "-----END {typ}-----")?;

    Ok(())
}

/// Unframed bytes, written as they are.
struct Raw<'a>(&'a [u8]);

impl Serialize for Raw<'_> {
    fn to_writer<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.0)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.0.len()
    }
}

/// Armors `data`, including the checksum line.
pub fn enarmor(
    data: &[u8],
    typ: BlockType,
    headers: Option<&BTreeMap<String, String>>,
) -> Result<String> {
    let mut out = Vec::new();
    write(&Raw(data), typ, &mut out, headers, true)?;
    Ok(String::from_utf8(out).map_err(|e| e.utf8_error())?)
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::*;

    #[test]
    fn writes_no_doubleline() {
        let rng = &mut XorShiftRng::seed_from_u64(0);

        for i in 2..512 {
            let buf: Vec<u8> = (0..i).map(|_| rng.gen()).collect();
            let text = enarmor(&buf, BlockType::Message, None).unwrap();
            let lines = text.lines().collect::<Vec<_>>();

            assert_eq!(lines[0], "-----BEGIN PGP MESSAGE-----");
            assert_eq!(lines[1], "");
            assert!(
                !lines[lines.len() - 3].is_empty(),
                "last line must not be empty"
            );
            assert_eq!(
                lines[lines.len() - 2].len(),
                5,
                "invalid checksum line: '{}'",
                lines[lines.len() - 2]
            );
            assert_eq!(lines[lines.len() - 1], "-----END PGP MESSAGE-----");
            for line in &lines[2..lines.len() - 2] {
                assert!(line.len() <= LINE_LENGTH);
            }
        }
    }

    #[test]
    fn writes_no_checksum() {
        let mut dest = Vec::new();
        write(&Raw(b"hello"), BlockType::Signature, &mut dest, None, false).unwrap();

        assert_eq!(
            std::str::from_utf8(&dest).unwrap(),
            "-----BEGIN PGP SIGNATURE-----\n\naGVsbG8=\n-----END PGP SIGNATURE-----\n"
        );
    }

    #[test]
    fn writes_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("Comment".to_string(), "test".to_string());
        let text = enarmor(b"hi", BlockType::PublicKey, Some(&headers)).unwrap();
        assert!(text.starts_with("-----BEGIN PGP PUBLIC KEY BLOCK-----\nComment: test\n\naGk=\n="));
    }
}
