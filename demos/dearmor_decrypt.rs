//! Decrypts an armored message with the private key in `key.priv`.
//!
//! $ cargo run --example dearmor_decrypt -- message.asc [passphrase]
use std::fs;

use pgp_message::packet::Packet;
use pgp_message::{Message, RsaKeys};

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args.next().expect("usage: dearmor_decrypt <file> [passphrase]");
    let passphrase = args.next();

    let armored = fs::read_to_string("key.priv").expect("read key.priv");
    let (keys, _headers) = Message::from_armor(&armored).expect("parse key");
    let mut keys = RsaKeys::new(keys);
    if let Some(passphrase) = &passphrase {
        keys = keys.with_passphrase(passphrase.as_bytes());
    }

    let (msg, headers) =
        Message::from_armor(&fs::read_to_string(&path).expect("read input")).expect("parse");
    for (name, values) in &headers {
        eprintln!("{name}: {}", values.join(", "));
    }

    let Some(plain) = keys.decrypt(&msg) else {
        eprintln!("no key decrypts this message");
        std::process::exit(1);
    };
    let plain = plain.decompressed().expect("decompress").unwrap_or(plain);
    for packet in plain {
        if let Packet::LiteralData(literal) = packet {
            println!("{}", String::from_utf8_lossy(literal.data()));
        }
    }
}
