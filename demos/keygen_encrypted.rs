//! Generates a key and protects its secret parts with a passphrase.
//!
//! $ cargo run --example keygen_encrypted -- "passphrase" > key.priv
use pgp_message::crypto::sym::SymmetricKeyAlgorithm;
use pgp_message::{BlockType, Message, RsaKeys};
use rand::thread_rng;

fn main() {
    let passphrase = std::env::args().nth(1).expect("usage: keygen_encrypted <passphrase>");
    let mut rng = thread_rng();

    let mut keys = RsaKeys::generate(&mut rng, 2048, "Me <me@example.com>").expect("generate");
    keys.protect(&mut rng, passphrase.as_bytes(), SymmetricKeyAlgorithm::AES256)
        .expect("protect");

    let armored = keys
        .keys()
        .to_armored_string(BlockType::PrivateKey, None)
        .expect("armor");

    // the protected key only signs with the passphrase
    let (parsed, _headers) = Message::from_armor(&armored).expect("parse");
    let locked = RsaKeys::new(parsed.clone());
    assert!(locked.signers(None).is_err());
    let unlocked = RsaKeys::new(parsed).with_passphrase(passphrase.as_bytes());
    assert!(unlocked.signers(None).is_ok());

    println!("{armored}");
}
