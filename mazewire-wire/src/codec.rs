//! MessagePack codec with an extension table.

use crate::envelope::Envelope;
use crate::error::WireError;
use crate::ext::{Extension, ExtensionTable, TimestampExt};
use crate::value::Value;
use rmpv::Value as Raw;

/// Encodes and decodes [`Value`]s as MessagePack.
///
/// `MsgpackCodec::new()` registers the timestamp extension; use
/// [`MsgpackCodec::bare`] for a codec without any extensions.
#[derive(Debug, Clone)]
pub struct MsgpackCodec {
    extensions: ExtensionTable,
}

impl MsgpackCodec {
    /// Creates a codec with the timestamp extension registered.
    pub fn new() -> Self {
        let mut codec = Self::bare();
        codec.register(TimestampExt);
        codec
    }

    /// Creates a codec with an empty extension table.
    pub fn bare() -> Self {
        Self {
            extensions: ExtensionTable::new(),
        }
    }

    /// Registers an extension type.
    pub fn register<E: Extension + 'static>(&mut self, ext: E) {
        self.extensions.register(ext);
    }

    /// Returns the extension table.
    pub fn extensions(&self) -> &ExtensionTable {
        &self.extensions
    }

    /// Encodes a value.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, WireError> {
        let raw = self.raw_from_value(value)?;
        let mut buf = Vec::with_capacity(64);
        rmpv::encode::write_value(&mut buf, &raw).map_err(|e| WireError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes exactly one value; trailing bytes are an error.
    pub fn decode(&self, data: &[u8]) -> Result<Value, WireError> {
        let mut rest = data;
        let raw = rmpv::decode::read_value(&mut rest).map_err(|e| WireError::Decode(e.to_string()))?;
        if !rest.is_empty() {
            return Err(WireError::TrailingData(rest.len()));
        }
        self.value_from_raw(raw)
    }

    /// Decodes a response envelope.
    pub fn decode_envelope(&self, data: &[u8]) -> Result<Envelope, WireError> {
        Envelope::from_value(self.decode(data)?)
    }

    /// Encodes a response envelope.
    pub fn encode_envelope(&self, envelope: &Envelope) -> Result<Vec<u8>, WireError> {
        self.encode(&envelope.to_value())
    }

    fn raw_from_value(&self, value: &Value) -> Result<Raw, WireError> {
        Ok(match value {
            Value::Nil => Raw::Nil,
            Value::Bool(b) => Raw::Boolean(*b),
            Value::Int(n) => Raw::from(*n),
            Value::UInt(n) => Raw::from(*n),
            Value::Float(f) => Raw::F64(*f),
            Value::String(s) => Raw::from(s.as_str()),
            Value::Binary(b) => Raw::Binary(b.clone()),
            Value::Array(items) => Raw::Array(
                items
                    .iter()
                    .map(|item| self.raw_from_value(item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(m) => Raw::Map(
                m.iter()
                    .map(|(k, v)| Ok((Raw::from(k.as_str()), self.raw_from_value(v)?)))
                    .collect::<Result<_, WireError>>()?,
            ),
            Value::Timestamp(_) => match self.extensions.pack(value) {
                Some(packed) => {
                    let (tag, data) = packed?;
                    Raw::Ext(tag, data)
                }
                None => return Err(WireError::NoPacker(value.kind())),
            },
            Value::Ext(tag, data) => Raw::Ext(*tag, data.clone()),
        })
    }

    fn value_from_raw(&self, raw: Raw) -> Result<Value, WireError> {
        Ok(match raw {
            Raw::Nil => Value::Nil,
            Raw::Boolean(b) => Value::Bool(b),
            Raw::Integer(i) => match (i.as_i64(), i.as_u64()) {
                (Some(n), _) => Value::Int(n),
                (None, Some(n)) => Value::UInt(n),
                (None, None) => return Err(WireError::Decode(format!("bad integer: {:?}", i))),
            },
            Raw::F32(f) => Value::Float(f64::from(f)),
            Raw::F64(f) => Value::Float(f),
            Raw::String(s) => Value::String(s.into_str().ok_or(WireError::InvalidUtf8)?),
            Raw::Binary(b) => Value::Binary(b),
            Raw::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.value_from_raw(item))
                    .collect::<Result<_, _>>()?,
            ),
            Raw::Map(pairs) => Value::Map(
                pairs
                    .into_iter()
                    .map(|(k, v)| {
                        let key = match k {
                            Raw::String(s) => s.into_str().ok_or(WireError::InvalidUtf8)?,
                            other => return Err(WireError::NonStringKey(other.to_string())),
                        };
                        Ok((key, self.value_from_raw(v)?))
                    })
                    .collect::<Result<_, WireError>>()?,
            ),
            Raw::Ext(tag, data) => self.extensions.unpack(tag, data)?,
        })
    }
}

impl Default for MsgpackCodec {
    fn default() -> Self {
        Self::new()
    }
}
