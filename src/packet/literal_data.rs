use std::io;

use bytes::{Buf, Bytes};
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::errors::Result;
use crate::normalize_lines::{normalize_crlf, strip_trailing_whitespace};
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{Tag, Timestamp};
use crate::util::write_short_string;

/// Literal Data Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.9>
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct LiteralData {
    mode: DataMode,
    #[debug("{:?}", String::from_utf8_lossy(file_name))]
    file_name: Bytes,
    created: Timestamp,
    #[debug("{}", hex::encode(data))]
    data: Bytes,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DataMode {
    Binary = b'b',
    Text = b't',
    Utf8 = b'u',

    #[num_enum(catch_all)]
    Other(u8),
}

impl LiteralData {
    /// Binary literal data named `data`, created now.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::new(DataMode::Binary, b"data", Timestamp::now(), data)
    }

    pub fn new(mode: DataMode, file_name: &[u8], created: Timestamp, data: &[u8]) -> Self {
        LiteralData {
            mode,
            file_name: Bytes::copy_from_slice(file_name),
            created,
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Parses a `LiteralData` packet body.
    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let mode = DataMode::from(i.read_u8()?);
        let name_len = i.read_u8()?;
        let file_name = i.read_take(name_len.into())?;
        let created = Timestamp::from_secs(i.read_be_u32()?);
        let data = i.rest();

        Ok(LiteralData {
            mode,
            file_name,
            created,
            data,
        })
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.mode, DataMode::Binary)
    }

    pub fn file_name(&self) -> &[u8] {
        &self.file_name
    }

    pub fn created(&self) -> Timestamp {
        self.created
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The data as text, if it is valid UTF-8.
    pub fn to_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// The bytes a signature over this packet covers.
    ///
    /// Text data uses `\r\n` line endings. In clearsign mode all data is treated as text
    /// and trailing spaces and tabs are removed from every line.
    pub fn signed_material(&self, clearsign: bool) -> Vec<u8> {
        if clearsign {
            return strip_trailing_whitespace(&normalize_crlf(&self.data));
        }
        match self.mode {
            DataMode::Text | DataMode::Utf8 => normalize_crlf(&self.data),
            _ => self.data.to_vec(),
        }
    }

    /// Rewrites the data to its clearsign form, switching binary data to UTF-8 text.
    pub fn normalize_for_clearsign(&mut self) {
        if self.is_binary() {
            self.mode = DataMode::Utf8;
        }
        self.data = self.signed_material(true).into();
    }
}

impl Serialize for LiteralData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.mode.into()])?;
        write_short_string(writer, &self.file_name)?;
        self.created.to_writer(writer)?;
        writer.write_all(&self.data)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + 1 + self.file_name.len() + 4 + self.data.len()
    }
}

impl PacketTrait for LiteralData {
    fn tag(&self) -> Tag {
        Tag::LiteralData
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_parse() {
        let body = hex!("74 07 66 6f 6f 2e 74 78 74 5a 00 00 00 68 69 0a");
        let lit = LiteralData::try_from_buf(&body[..]).unwrap();
        assert_eq!(lit.mode(), DataMode::Text);
        assert_eq!(lit.file_name(), b"foo.txt");
        assert_eq!(lit.created(), Timestamp::from_secs(0x5a00_0000));
        assert_eq!(lit.to_text(), Some("hi\n"));
        assert_eq!(lit.to_bytes().unwrap(), body);
    }

    #[test]
    fn test_short_body() {
        // name length runs past the end
        assert!(LiteralData::try_from_buf(&hex!("62 09 61")[..]).is_err());
    }

    #[test]
    fn test_defaults() {
        let lit = LiteralData::from_bytes(b"This is text.");
        assert!(lit.is_binary());
        assert_eq!(lit.file_name(), b"data");
        assert_eq!(lit.data(), b"This is text.");
        assert_eq!(lit.write_len(), lit.to_bytes().unwrap().len());
    }

    #[test]
    fn test_signed_material() {
        let data = b"This \nis\r\na\t\ntest.";
        let lit = LiteralData::new(DataMode::Binary, b"", Timestamp::from_secs(0), data);
        assert_eq!(lit.signed_material(false), data);
        assert_eq!(lit.signed_material(true), b"This\r\nis\r\na\r\ntest.");

        let text = LiteralData::new(DataMode::Text, b"", Timestamp::from_secs(0), data);
        assert_eq!(text.signed_material(false), b"This \r\nis\r\na\t\r\ntest.");
    }

    #[test]
    fn test_normalize_for_clearsign() {
        let mut lit = LiteralData::from_bytes(b"a  \nb");
        lit.normalize_for_clearsign();
        assert_eq!(lit.mode(), DataMode::Utf8);
        assert_eq!(lit.data(), b"a\r\nb");
    }
}
