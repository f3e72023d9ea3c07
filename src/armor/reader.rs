use std::collections::BTreeMap;
use std::{fmt, str};

use base64::engine::{general_purpose::STANDARD, Engine as _};
use log::{debug, warn};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1, take_while_m_n},
    character::complete::{digit1, line_ending, not_line_ending, space0},
    combinator::{map, map_opt, map_res, opt, value, verify},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};

use crate::armor::{crc24, ArmorOptions};
use crate::errors::{Error, Result};

/// Armor block types.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum BlockType {
    PublicKey,
    PrivateKey,
    Message,
    MultiPartMessage(usize, usize),
    Signature,
    // gnupg extension
    File,
    /// Cleartext signed message framework
    CleartextMessage,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::PublicKey => f.write_str("PGP PUBLIC KEY BLOCK"),
            BlockType::PrivateKey => f.write_str("PGP PRIVATE KEY BLOCK"),
            BlockType::MultiPartMessage(x, y) => write!(f, "PGP MESSAGE, PART {x}/{y}"),
            BlockType::Message => f.write_str("PGP MESSAGE"),
            BlockType::Signature => f.write_str("PGP SIGNATURE"),
            BlockType::File => f.write_str("PGP ARMORED FILE"),
            BlockType::CleartextMessage => f.write_str("PGP SIGNED MESSAGE"),
        }
    }
}

/// Armor Headers. Repeated keys keep all their values in order.
pub type Headers = BTreeMap<String, Vec<String>>;

/// A decoded armor block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dearmored {
    pub typ: BlockType,
    pub headers: Headers,
    /// The checksum found in the armor, if any.
    pub checksum: Option<u32>,
    pub data: Vec<u8>,
}

/// Parses a single ascii armor header separator.
fn armor_header_sep(i: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(&b"-----"[..])(i)
}

fn parse_digit(x: &[u8]) -> Result<usize> {
    let s = str::from_utf8(x)?;
    s.parse().map_err(|_| Error::InvalidInput)
}

/// Parses the type inside of an ascii armor header.
fn armor_header_type(i: &[u8]) -> IResult<&[u8], BlockType> {
    alt((
        value(BlockType::PublicKey, tag("PGP PUBLIC KEY BLOCK")),
        value(BlockType::PrivateKey, tag("PGP PRIVATE KEY BLOCK")),
        map(
            preceded(
                tag("PGP MESSAGE, PART "),
                pair(
                    map_res(digit1, parse_digit),
                    opt(preceded(tag("/"), map_res(digit1, parse_digit))),
                ),
            ),
            |(x, y)| BlockType::MultiPartMessage(x, y.unwrap_or(0)),
        ),
        value(BlockType::Message, tag("PGP MESSAGE")),
        value(BlockType::Signature, tag("PGP SIGNATURE")),
        value(BlockType::File, tag("PGP ARMORED FILE")),
        value(BlockType::CleartextMessage, tag("PGP SIGNED MESSAGE")),
    ))
    .parse(i)
}

/// Parses a single armor header line.
pub(crate) fn armor_header_line(i: &[u8]) -> IResult<&[u8], BlockType> {
    delimited(
        pair(armor_header_sep, tag(&b"BEGIN "[..])),
        armor_header_type,
        pair(armor_header_sep, pair(space0, line_ending)),
    )
    .parse(i)
}

/// Parses a single armor footer line.
fn armor_footer_line(i: &[u8]) -> IResult<&[u8], BlockType> {
    delimited(
        pair(armor_header_sep, tag(&b"END "[..])),
        armor_header_type,
        pair(armor_header_sep, opt(pair(space0, line_ending))),
    )
    .parse(i)
}

/// Splits a header line at the first `": "`. A line ending in `:` is a key without a value.
fn split_header(line: &str) -> Option<(&str, &str)> {
    if let Some((k, v)) = line.split_once(": ") {
        return (!k.is_empty()).then_some((k, v.trim_end()));
    }
    line.trim_end()
        .strip_suffix(':')
        .filter(|k| !k.is_empty() && !k.contains(' '))
        .map(|k| (k, ""))
}

/// Parses a single `key: value` header line.
fn key_value_pair(i: &[u8]) -> IResult<&[u8], (&str, &str)> {
    map_opt(
        terminated(map_res(not_line_ending, str::from_utf8), line_ending),
        split_header,
    )
    .parse(i)
}

/// Parses the full armor header.
pub(crate) fn armor_headers(i: &[u8]) -> IResult<&[u8], Headers> {
    map(many0(key_value_pair), |pairs| {
        let mut out = Headers::new();
        for (k, v) in pairs {
            out.entry(k.to_string()).or_default().push(v.to_string());
        }
        out
    })
    .parse(i)
}

fn is_base64_token(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'+' || c == b'/' || c == b'='
}

/// A line of the armored body. Unlike the checksum line it never starts with `=`.
fn body_line(i: &[u8]) -> IResult<&[u8], &[u8]> {
    terminated(
        verify(take_while1(is_base64_token), |s: &[u8]| s[0] != b'='),
        pair(space0, line_ending),
    )
    .parse(i)
}

fn checksum_line(i: &[u8]) -> IResult<&[u8], &[u8]> {
    delimited(
        tag(&b"="[..]),
        take_while_m_n(4, 4, is_base64_token),
        pair(space0, line_ending),
    )
    .parse(i)
}

type RawBlock<'a> = (BlockType, Headers, Vec<&'a [u8]>, Option<&'a [u8]>, BlockType);

/// Everything from the first `-----BEGIN ` up to and including the footer line.
fn armor_block(i: &[u8]) -> IResult<&[u8], RawBlock<'_>> {
    let (i, _) = take_until(&b"-----BEGIN "[..])(i)?;
    let (i, typ) = armor_header_line(i)?;
    let (i, headers) = armor_headers(i)?;
    // a blank line ends the headers
    let (i, _) = pair(space0, line_ending).parse(i)?;
    let (i, lines) = many0(body_line).parse(i)?;
    let (i, checksum) = opt(checksum_line).parse(i)?;
    let (i, footer) = armor_footer_line(i)?;

    Ok((i, (typ, headers, lines, checksum, footer)))
}

/// Reads the 24 bit checksum from its base64 form.
fn read_checksum(input: &[u8]) -> Result<u32> {
    let raw = STANDARD.decode(input)?;
    let [a, b, c] = raw[..] else {
        return Err(Error::InvalidChecksum);
    };
    Ok(u32::from_be_bytes([0, a, b, c]))
}

/// Decodes the first armor block found in `input`, along with the unparsed rest of the input.
pub fn decode_partial(input: &[u8], opts: ArmorOptions) -> Result<(Dearmored, &[u8])> {
    let (rest, (typ, headers, lines, checksum, footer)) = armor_block(input).map_err(|err| {
        let kind = match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => Some(e.code),
            nom::Err::Incomplete(_) => None,
        };
        debug!("armor parsing failed: {:?}", kind);
        Error::InvalidArmorWrappers
    })?;

    if typ != footer {
        debug!("armor header {} does not match footer {}", typ, footer);
        return Err(Error::InvalidArmorWrappers);
    }

    let data = STANDARD.decode(lines.concat())?;
    let checksum = checksum.map(read_checksum).transpose()?;

    let actual = crc24(&data);
    match checksum {
        Some(expected) if expected != actual => {
            if opts.verify_checksum {
                return Err(Error::InvalidChecksum);
            }
            warn!(
                "ignoring armor checksum mismatch: expected {:06x}, got {:06x}",
                expected, actual
            );
        }
        None if opts.verify_checksum => return Err(Error::InvalidChecksum),
        _ => {}
    }

    Ok((
        Dearmored {
            typ,
            headers,
            checksum,
            data,
        },
        rest,
    ))
}

/// Decodes the first armor block found in `input`. Text around the block is ignored.
pub fn decode(input: &[u8], opts: ArmorOptions) -> Result<Dearmored> {
    decode_partial(input, opts).map(|(block, _)| block)
}

/// Extracts the payload of the first armor block of type `typ`.
///
/// Returns `None` if there is no such block, it is malformed, or it has no checksum line.
/// The checksum value itself is not verified.
pub fn unarmor(text: &str, typ: BlockType) -> Option<Vec<u8>> {
    let marker = format!("-----BEGIN {typ}-----");
    let start = text.find(&marker)?;

    match decode(&text.as_bytes()[start..], ArmorOptions::default()) {
        Ok(block) if block.typ == typ && block.checksum.is_none() => {
            debug!("{} block without checksum line", typ);
            None
        }
        Ok(block) if block.typ == typ => Some(block.data),
        Ok(block) => {
            debug!("expected {} block, found {}", typ, block.typ);
            None
        }
        Err(err) => {
            debug!("failed to unarmor {}: {}", typ, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armor::ArmorOptionsBuilder;

    fn strict() -> ArmorOptions {
        ArmorOptionsBuilder::default()
            .verify_checksum(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_armor_header_line() {
        assert_eq!(
            armor_header_line(&b"-----BEGIN PGP MESSAGE-----\n"[..]).unwrap(),
            (&b""[..], BlockType::Message)
        );

        assert_eq!(
            armor_header_line(&b"-----BEGIN PGP MESSAGE, PART 3/14-----\n"[..]).unwrap(),
            (&b""[..], BlockType::MultiPartMessage(3, 14))
        );

        assert_eq!(
            armor_header_line(&b"-----BEGIN PGP MESSAGE, PART 14-----\r\n"[..]).unwrap(),
            (&b""[..], BlockType::MultiPartMessage(14, 0))
        );
    }

    #[test]
    fn test_armor_headers() {
        let mut map = Headers::new();
        map.insert("Version".to_string(), vec!["12".to_string()]);
        map.insert("special-stuff".to_string(), vec!["cool12.0".to_string()]);
        map.insert("some:colon".to_string(), vec!["with:me".to_string()]);
        map.insert("Empty".to_string(), vec![String::new()]);

        assert_eq!(
            armor_headers(
                &b"Version: 12\r\nspecial-stuff: cool12.0\r\nsome:colon: with:me\nEmpty:\n\nbody"[..]
            )
            .unwrap(),
            (&b"\nbody"[..], map)
        );
    }

    #[test]
    fn test_repeated_headers() {
        let (_, headers) = armor_headers(&b"Comment: a\nComment: b\n"[..]).unwrap();
        assert_eq!(headers["Comment"], vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_parse_armor_small() {
        let mut map = Headers::new();
        map.insert("Version".to_string(), vec!["GnuPG v1".to_string()]);

        let text = "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\
Version: GnuPG v1\n\
\n\
mQGiBEig\n\
-----END PGP PUBLIC KEY BLOCK-----\n";
        let block = decode(text.as_bytes(), ArmorOptions::default()).unwrap();

        assert_eq!(block.typ, BlockType::PublicKey);
        assert_eq!(block.headers, map);
        assert_eq!(block.checksum, None);
        assert_eq!(block.data, STANDARD.decode("mQGiBEig").unwrap());

        // a missing checksum is an error when checking
        assert!(matches!(
            decode(text.as_bytes(), strict()),
            Err(Error::InvalidChecksum)
        ));
    }

    #[test]
    fn test_parse_armor_full() {
        let text = "garbage before\n-----BEGIN PGP PUBLIC KEY BLOCK-----\nVersion: GnuPG v1\n\nmQGiBEigu7MRBAD7gZJzevtYLB3c1pE7uMwu+zHzGGJDrEyEaz0lYTAaJ2YXmJ1+\nIvmvBI/iMrRqpFLR35uUcz2UHgJtIP+xenCF4WIhHv5wg3XvBvTgG/ooZaj1gtez\nmiXV2bXTlEMxSqsZKvkieQRrMv3eV2VYhgaPvp8xJhl+xs8eVhlrmMv94wCgzWUw\nBrOICLPF5lANocvkqGNO3UUEAMH7GguhvXNlIUncqOpHC0N4FGPirPh/6nYxa9iZ\nkQEEg6mB6wPkaHZ5ddpagzFC6AncoOrhX5HPin9T6+cPhdIIQMogJOqDZ4xsAYCY\nKwjkoLQjfMdS5CYrMihFm4guNMKpWPfCe/T4TU7tFmTug8nnAIPFh2BNm8/EqHpg\njR4JA/9wJMxv+2eFuFGeLtiPjo+o2+AfIxTTEIlWyNkO+a9KkzmPY/JP4OyVGKjM\nV+aO0vZ6FamdlrXAaAPm1ULmY5pC15P/hNr0YAbN28Y8cwNGuuKGbiYvYD35KKhs\n5c5/pfMy0rgDElhFTGd4rpZdkHei3lwF5cyV0htv5s2lwGJKnrQnQW5kcm9pZCBT\nZWN1cml0eSA8c2VjdXJpdHlAYW5kcm9pZC5jb20+iGAEExECACAFAkigu7MCGwMG\nCwkIBwMCBBUCCAMEFgIDAQIeAQIXgAAKCRBzHmufAFQPw547AKDIDW3mDx+84xk1\nEfzH/uNQQLYBBgCeMabHPlx+2+IGnfPsQ8UsxMPLFnO5BA0ESKC72BAQALKb8W8l\nU3Xs+lbquuVEA5x+mNnJriRnq1q1ZA8J43z0lCqT6n+q/nICuE/SjGxfp+8G/K3/\nLrIfBWLLQHZMQyk/1Eild/ZoRxNAbjTGiQY6HWrZOd+Z2fWiSN03nSSpWImPbua3\n6LwSRRZNmZ77tdY0hI9TqJzqax1WQWk7IxfWubNTbNsPiktm/d6C2P04OkKOAmr8\nQCqKLLCO578zYLTgraL6F4g2YVurGgAB1KFSX2F8fh6Igr+pIW/ytoS9n2H+uecR\nl+2RB6Pq7MahwZvPPeMavwUMPQpOI6Or3pYZTzp/IJWNyL6MOBzV5q4gkD0xYtEq\nIhr1hX1IdiGdOA4oH1Rk1K/XIPwLelQdYp3ftiReh4/Gb3kfKCxpmMXL1f/ndx6N\nzIiqweDU5mZBpXBsBzFZfUDALL4VGqpc2eEltkVtD0RuQI2YaImBjOPsHI4StN5t\n2OspWke4xJGf0PqRVjTDJmtUrIJX4X5Fh8M85unHYYIpBCaDbM/7/xIaNQbQfdeO\n6yqGrj/0WAjL34wbo4D12BiPeoUTreD60aNwmpu5z1NRPS2Wn+6kTIHGhf47wGTZ\nv9OFYWhgSs3INpna4VA4E8SpOWPd8LFYLs9clAlaUhqJyLJ3JlmXmhGnWM41z+p9\nRA8UQXhvQcvYJSR77SC4O503wdVKJ07OH6WbAAMFD/4yjBZ+X7QBIKTLHXAIQBjB\n526iOhmfxyIgmX4vWcggJFZrBxPFulkGJj65Mwr9AwZeIceukKQUGcf2LpEoIdZY\ndP8gEshRDZQ1Y3GDD9ukChRDoK9kFIxnYmH8euU/TwTPtAEEDASfwEZnM5DcJQOA\nQ6G3GVKr/8uwmT5hUn5sR2L9vmrjw1nPkfZeDQNBmeTI8A+byosp6Nxl8thJIGNt\n8UTa02+g/nbf+ODRrEf3xeeFUNb14kTqULNT/hTj8/6xDwxwaF2ms60kYxA/EXDB\n21jqmhnfUwjSa++R38Qig9tGwOo83Z7uNCqtU3caFW1P55iD/Sju/ZecHVSgfq6j\n2H7mNWfvB9ILkS7w1w/InjEA7LpY9jtmPKDIYYQ7YGZuxFwOxtw69ulkS6ddc1Pt\nAQ5oe0d59rBicE8R7rBCxwzMihG5ctJ+a+t4/MHqi6jy/WI9OK+SwWmCeT1nVy6F\nNZ00QOPe89DFBCqhj4qSGfjOtCEKAM7SOhkyEYJ8jk5KrsLOcWPOM9i3uus1RquG\nXJ2Cljt6zJYtEnpkjrw+Ge0SBDNEMGZEBLbEZKECtNJ2NBrMRKYeAseCGNQ+uJOz\n8vL7ztUKoi1SbFGuHkv5N2NmPq42QrN8dftW01DceGDnJ1KHRvCUbpPcyQYFhRFb\nnxd3tMIEGO83iEmozvJfB4hJBBgRAgAJBQJIoLvYAhsMAAoJEHMea58AVA/D6ewA\nninKQSW+oL4z28F3T0GHag38WeWyAJ45d7dx4z0GxhTm2b9DclLombY+nw==\n=XyBX\n-----END PGP PUBLIC KEY BLOCK-----\n";
        let block = decode(text.as_bytes(), strict()).unwrap();

        assert_eq!(block.typ, BlockType::PublicKey);
        assert_eq!(block.headers["Version"], vec!["GnuPG v1".to_string()]);
        assert_eq!(block.data.len(), 1675);
        assert_eq!(block.checksum, Some(crc24(&block.data)));
        assert_eq!(unarmor(text, BlockType::PublicKey), Some(block.data));
        assert_eq!(unarmor(text, BlockType::Message), None);
    }

    #[test]
    fn test_checksum_mismatch() {
        let text = "-----BEGIN PGP MESSAGE-----\n\naGVsbG8=\n=AAAA\n-----END PGP MESSAGE-----\n";

        let block = decode(text.as_bytes(), ArmorOptions::default()).unwrap();
        assert_eq!(block.data, b"hello");
        assert_eq!(block.checksum, Some(0));

        assert!(matches!(
            decode(text.as_bytes(), strict()),
            Err(Error::InvalidChecksum)
        ));
    }

    #[test]
    fn test_mismatched_wrappers() {
        let text = "-----BEGIN PGP MESSAGE-----\n\naGVsbG8=\n-----END PGP SIGNATURE-----\n";
        assert!(matches!(
            decode(text.as_bytes(), ArmorOptions::default()),
            Err(Error::InvalidArmorWrappers)
        ));
        assert_eq!(unarmor(text, BlockType::Message), None);
    }

    #[test]
    fn test_missing_blank_line() {
        let text = "-----BEGIN PGP MESSAGE-----\naGVsbG8=\n-----END PGP MESSAGE-----\n";
        assert_eq!(unarmor(text, BlockType::Message), None);
    }

    #[test]
    fn test_unarmor_requires_checksum_line() {
        let text = "-----BEGIN PGP MESSAGE-----\n\naGVsbG8=\n-----END PGP MESSAGE-----\n";
        assert_eq!(unarmor(text, BlockType::Message), None);
        // decoding stays permissive
        assert_eq!(
            decode(text.as_bytes(), ArmorOptions::default()).unwrap().data,
            b"hello"
        );

        let text = "-----BEGIN PGP MESSAGE-----\n\naGVsbG8=\n=AAAA\n-----END PGP MESSAGE-----\n";
        assert_eq!(unarmor(text, BlockType::Message), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_decode_partial_rest() {
        let text = "-----BEGIN PGP SIGNATURE-----\n\naGk=\n-----END PGP SIGNATURE-----\ntrailer";
        let (block, rest) = decode_partial(text.as_bytes(), ArmorOptions::default()).unwrap();
        assert_eq!(block.data, b"hi");
        assert_eq!(rest, b"trailer");
    }
}
