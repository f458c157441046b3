//! Wire error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire values.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("msgpack encode error: {0}")]
    Encode(String),

    #[error("msgpack decode error: {0}")]
    Decode(String),

    #[error("trailing data after value: {0} bytes")]
    TrailingData(usize),

    #[error("msgp-date: got a length less than {expected} for timestamp data ({actual} bytes)")]
    TimestampTooShort { expected: usize, actual: usize },

    #[error("timestamp out of range: {0} seconds")]
    TimestampOutOfRange(i64),

    #[error("no extension registered to pack {0}")]
    NoPacker(&'static str),

    #[error("map key is not a string: {0}")]
    NonStringKey(String),

    #[error("invalid UTF-8 in string value")]
    InvalidUtf8,

    #[error("malformed envelope: {0}")]
    Envelope(String),
}

impl WireError {
    /// Returns whether this error came from reading data rather than writing it.
    pub fn is_decode(&self) -> bool {
        !matches!(self, WireError::Encode(_) | WireError::NoPacker(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_classification() {
        assert!(WireError::Decode("eof".into()).is_decode());
        assert!(WireError::TimestampTooShort {
            expected: 12,
            actual: 11
        }
        .is_decode());
        assert!(!WireError::Encode("io".into()).is_decode());
        assert!(!WireError::NoPacker("timestamp").is_decode());
    }

    #[test]
    fn test_short_timestamp_message() {
        let err = WireError::TimestampTooShort {
            expected: 12,
            actual: 3,
        };
        assert!(err.to_string().contains("less than 12"));
    }
}
