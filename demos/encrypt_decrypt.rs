//! Encrypts a message to a freshly generated key and to a passphrase, then decrypts it both
//! ways.
use pgp_message::crypto::sym::SymmetricKeyAlgorithm;
use pgp_message::packet::{LiteralData, Packet};
use pgp_message::{Message, RsaKeys};
use rand::thread_rng;

fn main() {
    let mut rng = thread_rng();
    let keys = RsaKeys::generate(&mut rng, 2048, "Me <me@example.com>").expect("generate");

    // the encryption subkey is the last key in the set
    let public = keys.public_keys();
    let recipient = public.keys().last().expect("subkey");

    let msg: Message = vec![Packet::from(LiteralData::from_bytes(b"Secret message"))].into();
    let encrypted = msg
        .encrypt(
            &mut rng,
            SymmetricKeyAlgorithm::AES256,
            &[recipient],
            &[b"passphrase".as_slice()],
        )
        .expect("encrypt");

    let by_key = keys.decrypt(&encrypted).expect("decrypt with key");
    let by_passphrase = encrypted
        .decrypt_with_password(b"passphrase")
        .expect("decrypt with passphrase");
    assert_eq!(by_key, by_passphrase);

    if let Some(Packet::LiteralData(literal)) = by_key.get(0) {
        println!("{}", String::from_utf8_lossy(literal.data()));
    }
}
