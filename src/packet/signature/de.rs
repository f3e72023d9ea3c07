use bytes::{Buf, Bytes};
use log::{debug, warn};

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{bail, ensure_eq, unsupported_err, Result};
use crate::packet::signature::types::*;
use crate::packet::signature::{
    SignatureConfig, Subpacket, SubpacketData, SubpacketLength, SubpacketType,
};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, KeyId, MpiBytes, Timestamp};

impl Signature {
    /// Parses a `Signature` packet body.
    ///
    /// Versions other than 2, 3 and 4 are reported as unsupported.
    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = SignatureVersion::from(i.read_u8()?);
        match version {
            SignatureVersion::V2 | SignatureVersion::V3 => v3_parser(version, i),
            SignatureVersion::V4 => v4_parser(version, i),
            SignatureVersion::Other(v) => unsupported_err!("signature version {}", v),
        }
    }
}

/// Parse a v2 or v3 signature packet
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.2>
fn v3_parser<B: Buf>(version: SignatureVersion, mut i: B) -> Result<Signature> {
    // One-octet length of following hashed material. MUST be 5.
    let hashed_len = i.read_u8()?;
    ensure_eq!(hashed_len, 5, "invalid v3 hashed length");
    let typ = SignatureType::from(i.read_u8()?);
    let created = Timestamp::from_secs(i.read_be_u32()?);
    let issuer = KeyId::from(i.read_array::<8>()?);
    let pub_alg = PublicKeyAlgorithm::from(i.read_u8()?);
    let hash_alg = HashAlgorithm::from(i.read_u8()?);
    // Two-octet field holding left 16 bits of signed hash value.
    let signed_hash_value = i.read_array::<2>()?;
    let signature = actual_signature(&mut i)?;

    let config = SignatureConfig {
        version,
        typ,
        pub_alg,
        hash_alg,
        hashed_subpackets: Vec::new(),
        unhashed_subpackets: Vec::new(),
        created: Some(created),
        issuer: Some(issuer),
    };

    Ok(Signature::from_config(config, signed_hash_value, signature))
}

/// Parse a v4 signature packet
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.3>
fn v4_parser<B: Buf>(version: SignatureVersion, mut i: B) -> Result<Signature> {
    let typ = SignatureType::from(i.read_u8()?);
    let pub_alg = PublicKeyAlgorithm::from(i.read_u8()?);
    let hash_alg = HashAlgorithm::from(i.read_u8()?);

    let hsub_len = i.read_be_u16()?;
    let hsub_raw = i.read_take(hsub_len.into())?;
    let hashed_subpackets = subpackets(hsub_raw)?;

    let usub_len = i.read_be_u16()?;
    let usub_raw = i.read_take(usub_len.into())?;
    let unhashed_subpackets = subpackets(usub_raw)?;

    let signed_hash_value = i.read_array::<2>()?;
    let signature = actual_signature(&mut i)?;

    let config = SignatureConfig {
        version,
        typ,
        pub_alg,
        hash_alg,
        hashed_subpackets,
        unhashed_subpackets,
        created: None,
        issuer: None,
    };

    Ok(Signature::from_config(config, signed_hash_value, signature))
}

/// One or more MPIs, until the end of the body.
fn actual_signature<B: Buf>(mut i: B) -> Result<Vec<MpiBytes>> {
    let mut values = Vec::new();
    while i.has_remaining() {
        values.push(MpiBytes::from_buf(&mut i)?);
    }

    Ok(values)
}

fn subpackets<B: Buf>(mut i: B) -> Result<Vec<Subpacket>> {
    let mut packets = Vec::new();
    while i.has_remaining() {
        // the subpacket length (1, 2, or 5 octets)
        let len = SubpacketLength::from_buf(&mut i)?;
        let len_usize = len.len();
        if len_usize == 0 {
            // a zero length has no room for the type octet
            bail!("empty subpacket");
        }
        let typ_raw = i.read_u8()?;
        let body = i.read_take(len_usize - 1)?;
        let (typ, is_critical) = SubpacketType::from_u8(typ_raw);

        packets.push(Subpacket {
            is_critical,
            data: subpacket(typ, body),
            len,
        });
    }

    Ok(packets)
}

/// Decodes a subpacket body, keeping the raw bytes if the typed form would not
/// serialize back to exactly the same bytes.
fn subpacket(typ: SubpacketType, body: Bytes) -> SubpacketData {
    debug!("parsing subpacket: {:?} {}", typ, hex::encode(&body));

    let raw = u8::from(typ);
    match typed_subpacket(typ, body.clone()) {
        Ok(data) => {
            if data.to_bytes().ok().as_deref() == Some(&body[..]) {
                data
            } else {
                debug!("keeping non canonical subpacket {:?} raw", typ);
                SubpacketData::Other(raw, body)
            }
        }
        Err(err) => {
            warn!("invalid subpacket: {:?} {:?}", typ, err);
            SubpacketData::Other(raw, body)
        }
    }
}

fn typed_subpacket(typ: SubpacketType, mut body: Bytes) -> Result<SubpacketData> {
    let data = match typ {
        SubpacketType::SignatureCreationTime => {
            SubpacketData::SignatureCreationTime(Timestamp::from_secs(body.read_be_u32()?))
        }
        SubpacketType::SignatureExpirationTime => {
            SubpacketData::SignatureExpirationTime(body.read_be_u32()?)
        }
        SubpacketType::ExportableCertification => {
            SubpacketData::ExportableCertification(body.read_u8()? == 1)
        }
        SubpacketType::TrustSignature => {
            let depth = body.read_u8()?;
            let value = body.read_u8()?;
            SubpacketData::TrustSignature(depth, value)
        }
        SubpacketType::RegularExpression => SubpacketData::RegularExpression(body.rest()),
        SubpacketType::Revocable => SubpacketData::Revocable(body.read_u8()? == 1),
        SubpacketType::KeyExpirationTime => SubpacketData::KeyExpirationTime(body.read_be_u32()?),
        SubpacketType::PreferredSymmetricAlgorithms => SubpacketData::PreferredSymmetricAlgorithms(
            body.rest().iter().map(|&b| SymmetricKeyAlgorithm::from(b)).collect(),
        ),
        SubpacketType::RevocationKey => {
            let class = body.read_u8()?;
            let algorithm = PublicKeyAlgorithm::from(body.read_u8()?);
            let fingerprint = body.read_array::<20>()?;
            SubpacketData::RevocationKey(RevocationKey {
                class,
                algorithm,
                fingerprint,
            })
        }
        SubpacketType::Issuer => SubpacketData::Issuer(KeyId::from(body.read_array::<8>()?)),
        SubpacketType::Notation => {
            let flags = body.read_array::<4>()?;
            let name_len = body.read_be_u16()?;
            let value_len = body.read_be_u16()?;
            let name = body.read_take(name_len.into())?.to_vec();
            let value = body.read_take(value_len.into())?.to_vec();
            SubpacketData::Notation(Notation { flags, name, value })
        }
        SubpacketType::PreferredHashAlgorithms => SubpacketData::PreferredHashAlgorithms(
            body.rest().iter().map(|&b| HashAlgorithm::from(b)).collect(),
        ),
        SubpacketType::PreferredCompressionAlgorithms => {
            SubpacketData::PreferredCompressionAlgorithms(
                body.rest().iter().map(|&b| CompressionAlgorithm::from(b)).collect(),
            )
        }
        SubpacketType::KeyServerPreferences => SubpacketData::KeyServerPreferences(body.rest()),
        SubpacketType::PreferredKeyServer => SubpacketData::PreferredKeyServer(body.rest()),
        SubpacketType::PrimaryUserId => SubpacketData::IsPrimary(body.read_u8()? == 1),
        SubpacketType::PolicyURI => SubpacketData::PolicyURI(body.rest()),
        SubpacketType::KeyFlags => SubpacketData::KeyFlags(body.rest()),
        SubpacketType::SignersUserID => SubpacketData::SignersUserID(body.rest()),
        SubpacketType::RevocationReason => {
            let code = RevocationCode::from(body.read_u8()?);
            SubpacketData::RevocationReason(code, body.rest())
        }
        SubpacketType::Features => SubpacketData::Features(body.rest()),
        SubpacketType::SignatureTarget => {
            let pub_alg = PublicKeyAlgorithm::from(body.read_u8()?);
            let hash_alg = HashAlgorithm::from(body.read_u8()?);
            SubpacketData::SignatureTarget(pub_alg, hash_alg, body.rest())
        }
        SubpacketType::EmbeddedSignature => {
            SubpacketData::EmbeddedSignature(Box::new(Signature::try_from_buf(&mut body)?))
        }
        SubpacketType::Other(n) => SubpacketData::Other(n, body.rest()),
    };

    Ok(data)
}
