//! Verifies an armored signed message against the keys in `key.pub`.
//!
//! $ cargo run --example verify -- document.asc
use std::fs;

use pgp_message::{Message, RsaKeys};

fn main() {
    let path = std::env::args().nth(1).expect("usage: verify <file>");

    let armored = fs::read_to_string("key.pub").expect("read key.pub");
    let (keys, _headers) = Message::from_armor(&armored).expect("parse key");
    let keys = RsaKeys::new(keys);

    let (msg, _headers) =
        Message::from_armor(&fs::read_to_string(&path).expect("read input")).expect("parse");

    let mut good = 0;
    for group in keys.verify(&msg).expect("group signatures") {
        for sig in group.signatures() {
            let issuer = sig.issuer().map(|id| id.to_hex()).unwrap_or_default();
            println!("good {:?} signature by {issuer}", sig.typ());
            good += 1;
        }
    }
    if good == 0 {
        eprintln!("no valid signature");
        std::process::exit(1);
    }
}
