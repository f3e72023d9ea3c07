//! # Packet module
//!
//! Handles everything in relationship to packets.

mod header;
mod many;
mod packet_sum;

mod compressed_data;
mod key;
mod literal_data;
mod marker;
mod mod_detection_code;
mod one_pass_signature;
mod opaque;
mod public_key_encrypted_session_key;
mod signature;
mod sym_encrypted_data;
mod sym_encrypted_protected_data;
mod sym_key_encrypted_session_key;
mod trust;
mod user_attribute;
mod user_id;

pub use self::{
    compressed_data::*, header::PacketHeader, key::*, literal_data::*, many::*, marker::*,
    mod_detection_code::*, one_pass_signature::*, opaque::*, packet_sum::*,
    public_key_encrypted_session_key::*, signature::*, sym_encrypted_data::*,
    sym_encrypted_protected_data::*, sym_key_encrypted_session_key::*, trust::*,
    user_attribute::*, user_id::*,
};
