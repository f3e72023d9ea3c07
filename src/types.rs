mod compression;
mod fingerprint;
mod key_id;
mod key_traits;
mod mpi;
mod packet;
mod params;
mod s2k;
mod timestamp;

pub use self::{
    compression::CompressionAlgorithm,
    fingerprint::Fingerprint,
    key_id::KeyId,
    key_traits::KeyDetails,
    mpi::MpiBytes,
    packet::*,
    params::*,
    s2k::{decode_count, encode_count, S2kParams, StringToKey, DEFAULT_ITER_COUNT},
    timestamp::{Timestamp, TimestampError},
};
