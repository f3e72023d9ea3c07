//! Signs a file with the private key in `key.priv` and prints the armored signed message.
//!
//! $ cargo run --example sign -- document.txt > document.asc
use std::fs;

use pgp_message::packet::{DataMode, LiteralData, Packet};
use pgp_message::types::Timestamp;
use pgp_message::{BlockType, Message, RsaKeys, SignOptions};

fn main() {
    let path = std::env::args().nth(1).expect("usage: sign <file>");
    let data = fs::read(&path).expect("read input");

    let armored = fs::read_to_string("key.priv").expect("read key.priv");
    let (keys, _headers) = Message::from_armor(&armored).expect("parse key");
    let keys = RsaKeys::new(keys);

    let literal = LiteralData::new(DataMode::Binary, path.as_bytes(), Timestamp::now(), &data);
    let msg: Message = vec![Packet::from(literal)].into();
    let signed = keys.sign(&msg, None, &SignOptions::default()).expect("sign");

    println!(
        "{}",
        signed
            .to_armored_string(BlockType::Message, None)
            .expect("armor")
    );
}
