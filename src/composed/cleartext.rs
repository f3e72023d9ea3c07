//! Cleartext Signature Framework
//!
//! Ref <https://tools.ietf.org/html/rfc4880.html#section-7>

use std::collections::BTreeSet;

use log::debug;
use nom::bytes::complete::take_until;
use nom::character::complete::{line_ending, space0};
use nom::sequence::pair;
use nom::{IResult, Parser};

use crate::armor::{self, armor_header_line, armor_headers, ArmorOptions, BlockType, Headers};
use crate::composed::sign::sign_material;
use crate::composed::{Message, SignOptions};
use crate::crypto::hash::HashAlgorithm;
use crate::errors::{bail, ensure_eq, Error, Result};
use crate::normalize_lines::{normalize_crlf, strip_trailing_whitespace};
use crate::packet::{Packet, Signature, SignatureType, SignerTable, VerifierTable};
use crate::types::KeyDetails;

const HEADER_LINE: &str = "-----BEGIN PGP SIGNED MESSAGE-----";

/// A cleartext signed message: readable text followed by an armored signature block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleartextSignedMessage {
    /// The dash escaped text, as it appears in the framework.
    csf_encoded_text: String,
    /// Values of the `Hash` armor headers.
    hashes: Vec<HashAlgorithm>,
    signatures: Vec<Signature>,
}

impl CleartextSignedMessage {
    /// Signs `text` as a text signature over its normalized form.
    pub fn sign(
        text: &str,
        signers: &SignerTable<'_>,
        key: &impl KeyDetails,
        opts: &SignOptions,
    ) -> Result<Self> {
        let material = normalize(text.as_bytes());
        let signature = sign_material(&material, SignatureType::Text, key, signers, opts, vec![])?;

        Ok(Self {
            csf_encoded_text: dash_escape(text),
            hashes: vec![signature.hash_alg()],
            signatures: vec![signature],
        })
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn hashes(&self) -> &[HashAlgorithm] {
        &self.hashes
    }

    /// The dash escaped text.
    pub fn text(&self) -> &str {
        &self.csf_encoded_text
    }

    /// The text as it was signed: `\r\n` line endings without trailing whitespace.
    pub fn signed_text(&self) -> String {
        let unescaped = dash_unescape(&self.csf_encoded_text);
        String::from_utf8_lossy(&normalize(unescaped.as_bytes())).into_owned()
    }

    /// The signatures that verify over the signed text.
    pub fn verify(&self, verifiers: &VerifierTable<'_>) -> Vec<&Signature> {
        let material = self.signed_text();
        self.signatures
            .iter()
            .filter(|sig| verifiers.verify(material.as_bytes(), sig))
            .collect()
    }

    /// Parses the framework from text. Text before the header line is ignored.
    pub fn from_armor(input: &str) -> Result<Self> {
        Self::from_armor_with_options(input, ArmorOptions::default())
    }

    pub fn from_armor_with_options(input: &str, opts: ArmorOptions) -> Result<Self> {
        let (rest, (headers, body)) =
            cleartext_frame(input.as_bytes()).map_err(|_| Error::InvalidArmorWrappers)?;
        let hashes = validate_headers(headers)?;
        debug!("cleartext hashes: {:?}", hashes);
        let body = std::str::from_utf8(body)?;
        let csf_encoded_text = body.strip_suffix('\r').unwrap_or(body).to_string();

        let (block, _) = armor::decode_partial(rest, opts)?;
        ensure_eq!(block.typ, BlockType::Signature, "expected a signature block");

        let signatures = Message::from_bytes(&block.data)?
            .into_iter()
            .filter_map(|packet| match packet {
                Packet::Signature(sig) => Some(sig),
                _ => None,
            })
            .collect::<Vec<_>>();
        if signatures.is_empty() {
            bail!("cleartext message without signatures");
        }

        Ok(Self {
            csf_encoded_text,
            hashes,
            signatures,
        })
    }

    pub fn to_armored_writer(&self, writer: &mut impl std::io::Write) -> Result<()> {
        writeln!(writer, "{HEADER_LINE}")?;
        let names: BTreeSet<String> = self.hashes.iter().map(|h| h.to_string()).collect();
        if !names.is_empty() {
            let names: Vec<String> = names.into_iter().collect();
            writeln!(writer, "Hash: {}", names.join(","))?;
        }
        writeln!(writer)?;

        writer.write_all(self.csf_encoded_text.as_bytes())?;
        writeln!(writer)?;

        let packets: Message = self.signatures.iter().cloned().map(Packet::from).collect();
        armor::write(&packets, BlockType::Signature, writer, None, true)
    }

    pub fn to_armored_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.to_armored_writer(&mut buf)?;
        Ok(String::from_utf8(buf).map_err(|e| e.utf8_error())?)
    }
}

fn normalize(text: &[u8]) -> Vec<u8> {
    strip_trailing_whitespace(&normalize_crlf(text))
}

fn validate_headers(headers: Headers) -> Result<Vec<HashAlgorithm>> {
    let mut hashes = Vec::new();
    for (name, values) in headers {
        ensure_eq!(name, "Hash", "unexpected cleartext header");
        for value in values {
            for name in value.split(',') {
                hashes.push(name.trim().parse()?);
            }
        }
    }
    Ok(hashes)
}

/// Lines starting with `-` are prefixed with `- `.
fn dash_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if line.starts_with('-') {
            out += "- ";
        }
        out += line;
    }
    out
}

fn dash_unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        out += line.strip_prefix("- ").unwrap_or(line);
    }
    out
}

/// Header line, hash headers, blank line and the text up to the signature block.
///
/// The line break in front of the signature block belongs to the framework.
fn cleartext_frame(i: &[u8]) -> IResult<&[u8], (Headers, &[u8])> {
    let (i, _) = take_until(HEADER_LINE.as_bytes())(i)?;
    let (i, _) = armor_header_line(i)?;
    let (i, headers) = armor_headers(i)?;
    let (i, _) = pair(space0, line_ending).parse(i)?;
    let (i, body) = take_until(&b"\n-----BEGIN "[..])(i)?;
    let (i, _) = line_ending(i)?;

    Ok((i, (headers, body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_key::PublicKeyAlgorithm;
    use crate::packet::PublicKey;
    use crate::types::{KeyVersion, MpiBytes, PublicParams, Timestamp};

    fn tables() -> (SignerTable<'static>, VerifierTable<'static>) {
        let mut signers = SignerTable::new();
        signers.insert("RSA", "SHA256", |data: &[u8]| -> Result<Vec<MpiBytes>> {
            Ok(vec![MpiBytes::from_slice(&HashAlgorithm::Sha256.digest(data)?)])
        });
        let mut verifiers = VerifierTable::new();
        verifiers.insert("RSA", "SHA256", |data: &[u8], sig: &Signature| -> Result<()> {
            let expected = HashAlgorithm::Sha256.digest(data)?;
            ensure_eq!(sig.signature, vec![MpiBytes::from_slice(&expected)]);
            Ok(())
        });
        (signers, verifiers)
    }

    fn key() -> PublicKey {
        let params = PublicParams::Rsa {
            n: MpiBytes::from_slice(&[0xA5; 64]),
            e: MpiBytes::from_slice(&[3]),
        };
        PublicKey::new(
            KeyVersion::V4,
            PublicKeyAlgorithm::RSA,
            Timestamp::from_secs(1),
            None,
            params,
        )
        .unwrap()
    }

    #[test]
    fn test_dash_escape() {
        let input = "-hello\n--world\nthis is\n- fine\n";
        let escaped = dash_escape(input);
        assert_eq!(escaped, "- -hello\n- --world\nthis is\n- - fine\n");
        assert_eq!(dash_unescape(&escaped), input);
    }

    #[test]
    fn test_signed_text_normalized() {
        let (signers, verifiers) = tables();
        let msg = CleartextSignedMessage::sign(
            "This \nis\t\na\ntest.",
            &signers,
            &key(),
            &SignOptions::default(),
        )
        .unwrap();

        assert_eq!(msg.signed_text(), "This\r\nis\r\na\r\ntest.");
        assert_eq!(msg.signatures()[0].typ(), SignatureType::Text);
        assert_eq!(msg.verify(&verifiers).len(), 1);
    }

    #[test]
    fn test_armor_roundtrip() {
        let (signers, verifiers) = tables();
        let text = "- dashed\nplain  \n-----\n";
        let msg =
            CleartextSignedMessage::sign(text, &signers, &key(), &SignOptions::default()).unwrap();

        let armored = msg.to_armored_string().unwrap();
        assert!(armored.starts_with(
            "-----BEGIN PGP SIGNED MESSAGE-----\nHash: SHA256\n\n- - dashed\nplain  \n- -----\n\n"
        ));
        assert!(armored.contains("-----BEGIN PGP SIGNATURE-----"));

        let back = CleartextSignedMessage::from_armor(&armored).unwrap();
        assert_eq!(back, msg);
        assert_eq!(back.verify(&verifiers).len(), 1);
    }

    #[test]
    fn test_signature_block_holds_framed_packets() {
        let (signers, _) = tables();
        let msg =
            CleartextSignedMessage::sign("framed", &signers, &key(), &SignOptions::default())
                .unwrap();
        let armored = msg.to_armored_string().unwrap();

        let block = armor::unarmor(&armored, BlockType::Signature).unwrap();
        // new format header for tag 2
        assert_eq!(block[0], 0xC2);
        let packets = Message::from_bytes(&block).unwrap();
        assert_eq!(packets.len(), 1);
        assert!(matches!(&packets[0], Packet::Signature(sig) if *sig == msg.signatures()[0]));
    }

    #[test]
    fn test_tampered_text_fails() {
        let (signers, verifiers) = tables();
        let msg =
            CleartextSignedMessage::sign("hello", &signers, &key(), &SignOptions::default())
                .unwrap();
        let armored = msg.to_armored_string().unwrap().replace("hello", "hellO");

        let back = CleartextSignedMessage::from_armor(&armored).unwrap();
        assert!(back.verify(&verifiers).is_empty());
    }

    #[test]
    fn test_rejects_unknown_headers() {
        let input = "-----BEGIN PGP SIGNED MESSAGE-----\nComment: x\n\nhi\n-----BEGIN PGP SIGNATURE-----\n\n-----END PGP SIGNATURE-----\n";
        assert!(CleartextSignedMessage::from_armor(input).is_err());
    }
}
