//! # pgp-message
//!
//! Reading and writing OpenPGP messages as described in [RFC 4880].
//!
//! The crate covers the packet codec ([`packet`]), ASCII armor ([`armor`]), and the
//! protocols built on top of packet sequences in [`composed`]: grouping and verifying
//! signatures, signing literal data and user ids, cleartext signatures, and encryption with
//! session keys protected by passphrases or RSA keys.
//!
//! Signing and verification go through [`SignerTable`] and [`VerifierTable`], which map
//! `(key algorithm, hash algorithm)` names to callbacks. [`RsaKeys`] provides tables backed by
//! the RSA keys in a key message.
//!
//! ```rust
//! use pgp_message::{Message, RsaKeys, SignOptions};
//! use pgp_message::packet::{LiteralData, Packet};
//! use rand::SeedableRng;
//!
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
//! let keys = RsaKeys::generate(&mut rng, 1024, "Me <me@example.com>").unwrap();
//!
//! let msg: Message = vec![Packet::from(LiteralData::from_bytes(b"This is text."))].into();
//! let signed = keys.sign(&msg, None, &SignOptions::default()).unwrap();
//!
//! let groups = keys.verify(&signed).unwrap();
//! assert_eq!(groups[0].signatures().len(), 1);
//! ```
//!
//! [RFC 4880]: https://tools.ietf.org/html/rfc4880

#![forbid(unsafe_code)]

pub(crate) mod util;

pub mod armor;
pub mod composed;
pub mod crypto;
pub mod errors;
pub mod normalize_lines;
pub mod packet;
pub mod parsing;
pub mod ser;
pub mod types;

pub use self::armor::{ArmorOptions, ArmorOptionsBuilder, BlockType};
pub use self::composed::*;
pub use self::packet::{
    Packet, PacketParser, ParserOptions, ParserOptionsBuilder, Signature, SignerTable,
    VerifierTable,
};
