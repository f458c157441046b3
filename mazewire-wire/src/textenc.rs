//! Byte-to-text encoders for carrying binary payloads in URLs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Encodes bytes as unpadded RFC 4648 base-32 (`A-Z`, `2-7`).
///
/// The output has `ceil(8 * len / 5)` characters; a trailing group of fewer
/// than five bits is zero-filled on the right.
pub fn encode_base32(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut value: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data {
        // At most 4 bits survive each round, so 12 bits is plenty.
        value = ((value << 8) | u32::from(byte)) & 0xFFF;
        bits += 8;
        while bits >= 5 {
            out.push(BASE32_ALPHABET[((value >> (bits - 5)) & 31) as usize] as char);
            bits -= 5;
        }
    }

    if bits > 0 {
        out.push(BASE32_ALPHABET[((value << (5 - bits)) & 31) as usize] as char);
    }

    out
}

/// Encodes bytes as lowercase hex, two digits per byte.
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Text encoding used for the `data` query parameter of read-style requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryEncoding {
    /// Lowercase hex; what the mazewire server decodes.
    #[default]
    Hex,
    /// Unpadded base-32; 20% shorter URLs.
    Base32,
}

impl QueryEncoding {
    /// Encodes bytes with this encoding.
    pub fn encode(&self, data: &[u8]) -> String {
        match self {
            QueryEncoding::Hex => encode_hex(data),
            QueryEncoding::Base32 => encode_base32(data),
        }
    }
}

impl fmt::Display for QueryEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryEncoding::Hex => write!(f, "hex"),
            QueryEncoding::Base32 => write!(f, "base32"),
        }
    }
}

impl FromStr for QueryEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hex" => Ok(QueryEncoding::Hex),
            "base32" | "base-32" => Ok(QueryEncoding::Base32),
            other => Err(format!("unknown query encoding: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_known_values() {
        assert_eq!(encode_hex(&[]), "");
        assert_eq!(encode_hex(&[0x05]), "05");
        assert_eq!(encode_hex(&[0xFF, 0x00]), "ff00");
        assert_eq!(encode_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
    }

    #[test]
    fn test_base32_known_values() {
        assert_eq!(encode_base32(&[]), "");
        assert_eq!(encode_base32(&[0, 0, 0, 0, 0]), "AAAAAAAA");
        // RFC 4648 test vectors, padding stripped.
        assert_eq!(encode_base32(b"f"), "MY");
        assert_eq!(encode_base32(b"fo"), "MZXQ");
        assert_eq!(encode_base32(b"foo"), "MZXW6");
        assert_eq!(encode_base32(b"foob"), "MZXW6YQ");
        assert_eq!(encode_base32(b"fooba"), "MZXW6YTB");
        assert_eq!(encode_base32(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn test_base32_all_ones() {
        assert_eq!(encode_base32(&[0xFF; 5]), "77777777");
        assert_eq!(encode_base32(&[0xFF]), "74");
    }

    #[test]
    fn test_query_encoding_dispatch() {
        assert_eq!(QueryEncoding::Hex.encode(b"foo"), "666f6f");
        assert_eq!(QueryEncoding::Base32.encode(b"foo"), "MZXW6");
        assert_eq!(QueryEncoding::default(), QueryEncoding::Hex);
    }

    #[test]
    fn test_query_encoding_parse() {
        assert_eq!("HEX".parse::<QueryEncoding>().unwrap(), QueryEncoding::Hex);
        assert_eq!(
            "base32".parse::<QueryEncoding>().unwrap(),
            QueryEncoding::Base32
        );
        assert!("base64".parse::<QueryEncoding>().is_err());
        assert_eq!(QueryEncoding::Base32.to_string(), "base32");
    }
}
