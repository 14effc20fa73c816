//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 milliseconds)
//!
//! The canonical encoding matters wherever bytes are signed or compared:
//! a session challenge must serialize to identical bytes on the client
//! that signs it and on every key server that re-verifies it.

use ciborium::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;

/// Encode any serializable value to canonical CBOR bytes.
///
/// The value is first serialized to a CBOR tree, then re-encoded with
/// sorted map keys and smallest-width integers.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    let mut plain = Vec::new();
    ciborium::into_writer(value, &mut plain)
        .map_err(|e| CoreError::EncodingError(e.to_string()))?;

    let tree: Value = ciborium::from_reader(plain.as_slice())
        .map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let mut buf = Vec::new();
    encode_value_to(&mut buf, &tree)?;
    Ok(buf)
}

/// Decode a value from CBOR bytes (canonical or not).
pub fn from_cbor_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CoreError> {
    ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(i) => {
            encode_integer(buf, *i);
            Ok(())
        }
        Value::Bytes(b) => {
            encode_bytes(buf, b);
            Ok(())
        }
        Value::Text(s) => {
            encode_text(buf, s);
            Ok(())
        }
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => {
            buf.push(if *b { 0xf5 } else { 0xf4 });
            Ok(())
        }
        Value::Null => {
            buf.push(0xf6);
            Ok(())
        }
        Value::Float(_) => Err(CoreError::EncodingError(
            "floats not supported in canonical encoding".into(),
        )),
        _ => Err(CoreError::EncodingError(
            "unsupported CBOR value type".into(),
        )),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        // Major type 0: unsigned integer
        encode_uint(buf, 0, n as u64);
    } else {
        // Major type 1: negative integer
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<(), CoreError> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CoreError> {
    // Encode all keys first to sort by encoded bytes
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        key_value_pairs.push((key_buf, v));
    }

    // Sort by encoded key bytes (lexicographic)
    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    // Write map header
    encode_uint(buf, 5, key_value_pairs.len() as u64);

    // Write sorted key-value pairs
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        owner: [u8; 4],
        expires_at: i64,
        label: Option<String>,
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let sample = Sample {
            owner: [1, 2, 3, 4],
            expires_at: 1736870400000,
            label: Some("publish".to_string()),
        };

        let bytes1 = to_canonical_bytes(&sample).unwrap();
        let bytes2 = to_canonical_bytes(&sample).unwrap();
        assert_eq!(bytes1, bytes2);
    }

    #[test]
    fn test_canonical_roundtrip() {
        let sample = Sample {
            owner: [9, 8, 7, 6],
            expires_at: -5,
            label: None,
        };

        let bytes = to_canonical_bytes(&sample).unwrap();
        let decoded: Sample = from_cbor_bytes(&bytes).unwrap();
        assert_eq!(sample, decoded);
    }

    #[test]
    fn test_integer_encoding() {
        // Test smallest encoding for various integer sizes
        let mut buf = Vec::new();

        // 0-23: single byte
        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        // 24-255: two bytes
        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 255);
        assert_eq!(buf, vec![0x18, 255]);

        // 256-65535: three bytes
        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 65535);
        assert_eq!(buf, vec![0x19, 0xff, 0xff]);
    }

    #[test]
    fn test_map_key_ordering() {
        // Ensure integer keys are sorted correctly
        let mut buf = Vec::new();
        let entries = vec![
            (Value::Integer(8.into()), Value::Integer(80.into())),
            (Value::Integer(0.into()), Value::Integer(0.into())),
            (Value::Integer(5.into()), Value::Integer(50.into())),
        ];
        encode_map_canonical(&mut buf, &entries).unwrap();

        // Map header (3 entries)
        assert_eq!(buf[0], 0xa3);
        // Keys should be in order: 0, 5, 8
        assert_eq!(buf[1], 0x00); // key 0
        assert_eq!(buf[2], 0x00); // value 0
        assert_eq!(buf[3], 0x05); // key 5
        assert_eq!(buf[4], 0x18); // value 50 (>23)
        assert_eq!(buf[5], 50);
        assert_eq!(buf[6], 0x08); // key 8
        assert_eq!(buf[7], 0x18); // value 80 (>23)
        assert_eq!(buf[8], 80);
    }

    #[test]
    fn test_float_rejected() {
        let result = to_canonical_bytes(&1.5f64);
        assert!(result.is_err());
    }
}
