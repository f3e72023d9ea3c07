//! Handle OpenPGP objects that are composed of multiple packets.
//!
//! A [`Message`] is a plain ordered sequence of packets, as found in key rings, signed
//! documents and encrypted messages. On top of it this module groups signatures with the
//! packets they cover, signs and verifies through caller supplied [`SignerTable`]s and
//! [`VerifierTable`]s, and encrypts and decrypts with session keys.
//!
//! [`RsaKeys`] wires all of that to RSA keys stored in a message.
//!
//! See <https://tools.ietf.org/html/rfc4880.html#section-11>
//!
//! [`SignerTable`]: crate::packet::SignerTable
//! [`VerifierTable`]: crate::packet::VerifierTable

mod cleartext;
mod encrypt;
mod message;
mod rsa_keys;
mod sign;
mod signed_group;

pub use self::{
    cleartext::CleartextSignedMessage,
    message::{Message, MAX_COMPRESSION_DEPTH},
    rsa_keys::RsaKeys,
    sign::{SignOptions, SignOptionsBuilder},
    signed_group::SignedGroup,
};
