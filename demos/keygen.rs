//! Generates a 2048 bit RSA key with an encryption subkey and writes the private and public
//! key blocks to `key.priv` and `key.pub`.
use std::fs;

use pgp_message::{BlockType, RsaKeys};
use rand::thread_rng;

fn main() {
    let user_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Me <me@example.com>".to_string());

    let keys = RsaKeys::generate(&mut thread_rng(), 2048, &user_id).expect("generate");

    let private = keys
        .keys()
        .to_armored_string(BlockType::PrivateKey, None)
        .expect("armor");
    let public = keys
        .public_keys()
        .to_armored_string(BlockType::PublicKey, None)
        .expect("armor");

    fs::write("key.priv", private).expect("write key.priv");
    fs::write("key.pub", &public).expect("write key.pub");
    println!("{public}");
}
