//! # mazewire-wire
//!
//! Wire format for the mazewire admin API.
//!
//! This crate provides:
//! - A schema-less [`Value`] tree carried as MessagePack
//! - The timestamp extension type (tag `0x05`, 12 bytes)
//! - An extension table consulted by the codec
//! - The `{body, warn}` response envelope
//! - Byte-to-text encoders (base-32, hex) for query strings

pub mod codec;
pub mod envelope;
pub mod error;
pub mod ext;
pub mod textenc;
pub mod value;

pub use codec::MsgpackCodec;
pub use envelope::Envelope;
pub use error::WireError;
pub use ext::{pack_timestamp, unpack_timestamp, Extension, ExtensionTable, TimestampExt};
pub use textenc::{encode_base32, encode_hex, QueryEncoding};
pub use value::Value;

/// Content type of MessagePack request bodies.
pub const CONTENT_TYPE_MSGPACK: &str = "application/x-msgpack";

/// Extension type tag of timestamps.
pub const TIMESTAMP_EXT_TAG: i8 = 0x05;

/// Encoded length of a timestamp extension: 8 bytes of seconds, 4 bytes of nanoseconds.
pub const TIMESTAMP_EXT_LEN: usize = 12;
