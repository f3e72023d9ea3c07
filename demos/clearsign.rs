//! Clearsigns text read from stdin and checks the result can be read back.
//!
//! $ echo "hello" | cargo run --example clearsign
use std::io::Read;

use pgp_message::{CleartextSignedMessage, RsaKeys, SignOptions};
use rand::thread_rng;

fn main() {
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text).expect("read stdin");

    let keys = RsaKeys::generate(&mut thread_rng(), 2048, "Me <me@example.com>").expect("generate");
    let signed = keys
        .clearsign(&text, None, &SignOptions::default())
        .expect("clearsign");
    let armored = signed.to_armored_string().expect("armor");

    let parsed = CleartextSignedMessage::from_armor(&armored).expect("parse");
    assert_eq!(parsed.verify(&keys.verifiers()).len(), 1);

    print!("{armored}");
}
