use hex_literal::hex;
use pgp_message::armor::{crc24, enarmor, unarmor};
use pgp_message::crypto::public_key::PublicKeyAlgorithm;
use pgp_message::packet::{LiteralData, Packet, PublicKey, UserId};
use pgp_message::ser::Serialize;
use pgp_message::types::{
    decode_count, encode_count, KeyDetails, KeyVersion, MpiBytes, PublicParams, Timestamp,
};
use pgp_message::{BlockType, Message, ParserOptionsBuilder, RsaKeys, SignOptions};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn rsa_params() -> PublicParams {
    PublicParams::Rsa {
        n: MpiBytes::from_slice(&[0xC3; 64]),
        e: MpiBytes::from_slice(&[1, 0, 1]),
    }
}

fn rsa_key(version: KeyVersion, created: u32) -> PublicKey {
    PublicKey::new(
        version,
        PublicKeyAlgorithm::RSA,
        Timestamp::from_secs(created),
        None,
        rsa_params(),
    )
    .unwrap()
}

#[test]
fn fingerprint_v4_is_stable() {
    let key = rsa_key(KeyVersion::V4, 1_000_000_000);
    assert_eq!(
        key.fingerprint().as_bytes(),
        hex!("1dbb7ae3f75da633b9518c908145ff4549da7dff")
    );
    assert_eq!(key.fingerprint(), rsa_key(KeyVersion::V4, 1_000_000_000).fingerprint());
    assert_eq!(key.key_id().to_hex(), "8145FF4549DA7DFF");

    // the creation time is part of the fingerprint
    assert_ne!(key.fingerprint(), rsa_key(KeyVersion::V4, 1_000_000_001).fingerprint());

    // and survives serialization
    let parsed = Message::from_bytes(&Packet::from(key.clone()).to_bytes().unwrap()).unwrap();
    assert_eq!(parsed.keys().next().unwrap().fingerprint(), key.fingerprint());
}

#[test]
fn fingerprint_v3_is_md5() {
    let key = rsa_key(KeyVersion::V3, 1_000_000_000);
    assert_eq!(key.fingerprint().len(), 16);
    assert_eq!(
        key.fingerprint().as_bytes(),
        hex!("f5b2004f93aef837816b6618e2106028")
    );
}

#[test]
fn crc24_of_empty_input() {
    assert_eq!(crc24(b""), 0xB704CE);
}

#[test]
fn key_ring_roundtrip() {
    let _ = pretty_env_logger::try_init();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let keys = RsaKeys::generate(&mut rng, 1024, "Alice <alice@example.com>").unwrap();

    for ring in [keys.keys().clone(), keys.public_keys()] {
        let bytes = ring.to_bytes().unwrap();
        let parsed = Message::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, ring);
        assert_eq!(parsed.to_bytes().unwrap(), bytes);

        let armored = ring.to_armored_string(BlockType::PublicKey, None).unwrap();
        let (from_armor, _headers) = Message::from_armor(&armored).unwrap();
        assert_eq!(from_armor, ring);
    }
}

#[test]
fn signed_message_roundtrip() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let keys = RsaKeys::generate(&mut rng, 1024, "Alice").unwrap();
    let msg: Message = vec![
        Packet::from(UserId::new("not signed")),
        Packet::from(LiteralData::from_bytes(b"payload")),
    ]
    .into();
    let signed = keys.sign(&msg, None, &SignOptions::default()).unwrap();

    let parsed = Message::from_bytes(&signed.to_bytes().unwrap()).unwrap();
    assert_eq!(parsed, signed);
}

#[test]
fn junk_after_packets() {
    let mut bytes = Packet::from(UserId::new("a")).to_bytes().unwrap();
    // new format user id header claiming more bytes than present
    bytes.extend_from_slice(&[0xCD, 0x10, b'x']);

    let permissive = Message::from_bytes(&bytes).unwrap();
    assert_eq!(permissive.len(), 1);

    let strict = ParserOptionsBuilder::default().strict(true).build().unwrap();
    assert!(Message::from_bytes_with_options(&bytes, strict).is_err());
}

proptest! {
    #[test]
    fn armor_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let text = enarmor(&data, BlockType::Message, None).unwrap();
        prop_assert_eq!(unarmor(&text, BlockType::Message), Some(data));
    }

    #[test]
    fn s2k_count_is_minimal(count in 1024u32..=decode_count(255)) {
        let coded = encode_count(count);
        prop_assert!(decode_count(coded) >= count);
        if coded > 0 {
            prop_assert!(decode_count(coded - 1) < count);
        }
    }
}
