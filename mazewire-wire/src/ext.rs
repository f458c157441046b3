//! Extension types and the timestamp extension.
//!
//! The server encodes `time.Time` as extension type `0x05` with a 12-byte
//! payload: seconds since the Unix epoch as a big-endian `i64` in bytes 0..8,
//! followed by nanoseconds as a big-endian `u32` in bytes 8..12. Encoding
//! rounds up to whole seconds and leaves the nanosecond field zero.

use crate::error::WireError;
use crate::value::Value;
use crate::{TIMESTAMP_EXT_LEN, TIMESTAMP_EXT_TAG};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Byte offset of the seconds field, used for both packing and unpacking.
pub const TIMESTAMP_SECONDS_OFFSET: usize = 0;

/// An application-defined extension type.
pub trait Extension: Send + Sync {
    /// Extension type tag on the wire.
    fn tag(&self) -> i8;

    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Returns the payload for `value`, or `None` if this extension does not
    /// handle values of that shape.
    fn pack(&self, value: &Value) -> Option<Result<Vec<u8>, WireError>>;

    /// Rebuilds a value from an extension payload carrying this tag.
    fn unpack(&self, data: &[u8]) -> Result<Value, WireError>;
}

/// Packs an instant into the 12-byte timestamp payload.
pub fn pack_timestamp(instant: &DateTime<Utc>) -> [u8; TIMESTAMP_EXT_LEN] {
    let millis = instant.timestamp_millis();
    // ceil(millis / 1000), correct for negative instants too.
    let seconds = millis.div_euclid(1000) + i64::from(millis.rem_euclid(1000) != 0);

    let mut buf = [0u8; TIMESTAMP_EXT_LEN];
    buf[TIMESTAMP_SECONDS_OFFSET..TIMESTAMP_SECONDS_OFFSET + 8]
        .copy_from_slice(&seconds.to_be_bytes());
    buf
}

/// Unpacks a timestamp payload.
///
/// Fails if fewer than 12 bytes are supplied; the nanosecond field is ignored.
pub fn unpack_timestamp(data: &[u8]) -> Result<DateTime<Utc>, WireError> {
    if data.len() < TIMESTAMP_EXT_LEN {
        return Err(WireError::TimestampTooShort {
            expected: TIMESTAMP_EXT_LEN,
            actual: data.len(),
        });
    }

    let mut secs = [0u8; 8];
    secs.copy_from_slice(&data[TIMESTAMP_SECONDS_OFFSET..TIMESTAMP_SECONDS_OFFSET + 8]);
    let seconds = i64::from_be_bytes(secs);

    seconds
        .checked_mul(1000)
        .and_then(DateTime::from_timestamp_millis)
        .ok_or(WireError::TimestampOutOfRange(seconds))
}

/// The timestamp extension (tag `0x05`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampExt;

impl Extension for TimestampExt {
    fn tag(&self) -> i8 {
        TIMESTAMP_EXT_TAG
    }

    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn pack(&self, value: &Value) -> Option<Result<Vec<u8>, WireError>> {
        match value {
            Value::Timestamp(t) => Some(Ok(pack_timestamp(t).to_vec())),
            _ => None,
        }
    }

    fn unpack(&self, data: &[u8]) -> Result<Value, WireError> {
        unpack_timestamp(data).map(Value::Timestamp)
    }
}

/// Registered extensions, keyed by tag.
#[derive(Clone, Default)]
pub struct ExtensionTable {
    entries: BTreeMap<i8, Arc<dyn Extension>>,
}

impl ExtensionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extension, replacing any earlier one with the same tag.
    pub fn register<E: Extension + 'static>(&mut self, ext: E) {
        self.entries.insert(ext.tag(), Arc::new(ext));
    }

    /// Returns the extension registered for `tag`.
    pub fn get(&self, tag: i8) -> Option<&dyn Extension> {
        self.entries.get(&tag).map(|e| e.as_ref())
    }

    /// Finds an extension that packs `value` and returns its tag and payload.
    pub fn pack(&self, value: &Value) -> Option<Result<(i8, Vec<u8>), WireError>> {
        self.entries
            .values()
            .find_map(|ext| ext.pack(value).map(|r| r.map(|data| (ext.tag(), data))))
    }

    /// Unpacks an extension payload, or keeps it raw if the tag is unknown.
    pub fn unpack(&self, tag: i8, data: Vec<u8>) -> Result<Value, WireError> {
        match self.entries.get(&tag) {
            Some(ext) => ext.unpack(&data),
            None => Ok(Value::Ext(tag, data)),
        }
    }

    /// Returns the registered tags in ascending order.
    pub fn tags(&self) -> Vec<i8> {
        self.entries.keys().copied().collect()
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no extension is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ExtensionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(tag, ext)| (tag, ext.name())))
            .finish()
    }
}
