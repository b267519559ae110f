//! Attribute value codecs
//!
//! A codec converts between the raw value bytes of a type-length-value record
//! and a typed [`AttributeValue`]. The [`Dictionary`](crate::Dictionary) binds a
//! codec to every registered attribute type; unregistered types fall back to
//! [`UnknownCodec`], which keeps the bytes as opaque octets.
//!
//! Codecs may also implement [`AttributeTransformer`] so that callers can build
//! attributes from convenient literals (`"10.0.0.1"` for an address, `"3600"`
//! for an integer) and have them normalized before encoding.

use crate::attributes::AttributeValue;
use chrono::{DateTime, Utc};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use thiserror::Error;

/// Maximum number of value bytes in one attribute (255 minus type and length)
pub const MAX_VALUE_LENGTH: usize = 253;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("{codec}: expected {expected} bytes, got {actual}")]
    Format {
        codec: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("value too long: {0} bytes (max {MAX_VALUE_LENGTH})")]
    TooLong(usize),
    #[error("{codec} codec cannot encode a {value} value")]
    Mismatch {
        codec: &'static str,
        value: &'static str,
    },
    #[error("{codec} codec cannot transform value: {reason}")]
    Transform { codec: &'static str, reason: String },
    #[error("timestamp {0} does not fit in 32 bits")]
    OutOfRange(i64),
}

/// Converts attribute values to and from their wire representation
pub trait AttributeCodec: Send + Sync + fmt::Debug {
    /// Codec name as used in dictionary files
    fn name(&self) -> &'static str;

    fn decode(&self, raw: &[u8]) -> Result<AttributeValue, CodecError>;

    fn encode(&self, value: &AttributeValue) -> Result<Vec<u8>, CodecError>;

    /// Optional capability to normalize caller-supplied values
    fn transformer(&self) -> Option<&dyn AttributeTransformer> {
        None
    }
}

/// Normalizes a caller-supplied value into the codec's canonical shape
pub trait AttributeTransformer {
    fn transform(&self, value: AttributeValue) -> Result<AttributeValue, CodecError>;
}

/// Codec handle shared between dictionary entries
pub type SharedCodec = Arc<dyn AttributeCodec>;

/// Dictionary file datatypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    String,
    Integer,
    IpAddr,
    Octets,
    Date,
}

impl DataType {
    /// Parse a dictionary datatype keyword (case-insensitive)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "string" => Some(DataType::String),
            "integer" => Some(DataType::Integer),
            "ipaddr" => Some(DataType::IpAddr),
            "octets" => Some(DataType::Octets),
            "date" => Some(DataType::Date),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::IpAddr => "ipaddr",
            DataType::Octets => "octets",
            DataType::Date => "date",
        }
    }

    /// Built-in codec for this datatype
    pub fn codec(self) -> SharedCodec {
        match self {
            DataType::String => string(),
            DataType::Integer => integer(),
            DataType::IpAddr => address(),
            DataType::Octets => octets(),
            DataType::Date => time(),
        }
    }
}

pub fn string() -> SharedCodec {
    Arc::new(StringCodec)
}

pub fn integer() -> SharedCodec {
    Arc::new(IntegerCodec)
}

pub fn address() -> SharedCodec {
    Arc::new(AddressCodec)
}

pub fn time() -> SharedCodec {
    Arc::new(TimeCodec)
}

pub fn octets() -> SharedCodec {
    Arc::new(OctetsCodec)
}

pub fn unknown() -> SharedCodec {
    Arc::new(UnknownCodec)
}

fn check_length(len: usize) -> Result<(), CodecError> {
    if len > MAX_VALUE_LENGTH {
        return Err(CodecError::TooLong(len));
    }
    Ok(())
}

fn fixed<const N: usize>(codec: &'static str, raw: &[u8]) -> Result<[u8; N], CodecError> {
    raw.try_into().map_err(|_| CodecError::Format {
        codec,
        expected: N,
        actual: raw.len(),
    })
}

fn opaque_bytes(codec: &'static str, value: &AttributeValue) -> Result<Vec<u8>, CodecError> {
    let bytes = value.as_bytes().ok_or(CodecError::Mismatch {
        codec,
        value: value.kind(),
    })?;
    check_length(bytes.len())?;
    Ok(bytes.to_vec())
}

/// Text attributes; non-UTF-8 payloads decode as octets
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl AttributeCodec for StringCodec {
    fn name(&self) -> &'static str {
        "string"
    }

    fn decode(&self, raw: &[u8]) -> Result<AttributeValue, CodecError> {
        check_length(raw.len())?;
        Ok(match String::from_utf8(raw.to_vec()) {
            Ok(s) => AttributeValue::String(s),
            Err(e) => AttributeValue::Octets(e.into_bytes()),
        })
    }

    fn encode(&self, value: &AttributeValue) -> Result<Vec<u8>, CodecError> {
        opaque_bytes(self.name(), value)
    }

    fn transformer(&self) -> Option<&dyn AttributeTransformer> {
        Some(self)
    }
}

impl AttributeTransformer for StringCodec {
    fn transform(&self, value: AttributeValue) -> Result<AttributeValue, CodecError> {
        let len = match &value {
            AttributeValue::String(s) => s.len(),
            AttributeValue::Octets(b) => b.len(),
            other => {
                return Err(CodecError::Transform {
                    codec: self.name(),
                    reason: format!("expected text, got {}", other.kind()),
                })
            }
        };
        check_length(len)?;
        Ok(value)
    }
}

/// Big-endian 32-bit unsigned integers
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerCodec;

impl AttributeCodec for IntegerCodec {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn decode(&self, raw: &[u8]) -> Result<AttributeValue, CodecError> {
        let bytes = fixed::<4>(self.name(), raw)?;
        Ok(AttributeValue::Integer(u32::from_be_bytes(bytes)))
    }

    fn encode(&self, value: &AttributeValue) -> Result<Vec<u8>, CodecError> {
        match value {
            AttributeValue::Integer(n) => Ok(n.to_be_bytes().to_vec()),
            other => Err(CodecError::Mismatch {
                codec: self.name(),
                value: other.kind(),
            }),
        }
    }

    fn transformer(&self) -> Option<&dyn AttributeTransformer> {
        Some(self)
    }
}

impl AttributeTransformer for IntegerCodec {
    fn transform(&self, value: AttributeValue) -> Result<AttributeValue, CodecError> {
        match value {
            AttributeValue::Integer(_) => Ok(value),
            AttributeValue::String(s) => s.trim().parse::<u32>().map(AttributeValue::Integer).map_err(|e| {
                CodecError::Transform {
                    codec: self.name(),
                    reason: format!("{:?}: {}", s, e),
                }
            }),
            other => Err(CodecError::Transform {
                codec: self.name(),
                reason: format!("expected integer, got {}", other.kind()),
            }),
        }
    }
}

/// 4-byte IPv4 addresses
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressCodec;

impl AttributeCodec for AddressCodec {
    fn name(&self) -> &'static str {
        "ipaddr"
    }

    fn decode(&self, raw: &[u8]) -> Result<AttributeValue, CodecError> {
        let octets = fixed::<4>(self.name(), raw)?;
        Ok(AttributeValue::Address(Ipv4Addr::from(octets)))
    }

    fn encode(&self, value: &AttributeValue) -> Result<Vec<u8>, CodecError> {
        match value {
            AttributeValue::Address(addr) => Ok(addr.octets().to_vec()),
            other => Err(CodecError::Mismatch {
                codec: self.name(),
                value: other.kind(),
            }),
        }
    }

    fn transformer(&self) -> Option<&dyn AttributeTransformer> {
        Some(self)
    }
}

impl AttributeTransformer for AddressCodec {
    fn transform(&self, value: AttributeValue) -> Result<AttributeValue, CodecError> {
        match value {
            AttributeValue::Address(_) => Ok(value),
            AttributeValue::String(s) => s.trim().parse::<Ipv4Addr>().map(AttributeValue::Address).map_err(|e| {
                CodecError::Transform {
                    codec: self.name(),
                    reason: format!("{:?}: {}", s, e),
                }
            }),
            AttributeValue::Octets(bytes) => self.decode(&bytes),
            other => Err(CodecError::Transform {
                codec: self.name(),
                reason: format!("expected IPv4 address, got {}", other.kind()),
            }),
        }
    }
}

/// Big-endian 32-bit Unix timestamps
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeCodec;

impl TimeCodec {
    fn from_secs(&self, secs: i64) -> Result<AttributeValue, CodecError> {
        if u32::try_from(secs).is_err() {
            return Err(CodecError::OutOfRange(secs));
        }
        DateTime::<Utc>::from_timestamp(secs, 0)
            .map(AttributeValue::Time)
            .ok_or(CodecError::OutOfRange(secs))
    }
}

impl AttributeCodec for TimeCodec {
    fn name(&self) -> &'static str {
        "date"
    }

    fn decode(&self, raw: &[u8]) -> Result<AttributeValue, CodecError> {
        let bytes = fixed::<4>(self.name(), raw)?;
        self.from_secs(i64::from(u32::from_be_bytes(bytes)))
    }

    fn encode(&self, value: &AttributeValue) -> Result<Vec<u8>, CodecError> {
        match value {
            AttributeValue::Time(t) => {
                let secs = t.timestamp();
                let secs = u32::try_from(secs).map_err(|_| CodecError::OutOfRange(secs))?;
                Ok(secs.to_be_bytes().to_vec())
            }
            other => Err(CodecError::Mismatch {
                codec: self.name(),
                value: other.kind(),
            }),
        }
    }

    fn transformer(&self) -> Option<&dyn AttributeTransformer> {
        Some(self)
    }
}

impl AttributeTransformer for TimeCodec {
    fn transform(&self, value: AttributeValue) -> Result<AttributeValue, CodecError> {
        match value {
            AttributeValue::Time(t) => self.from_secs(t.timestamp()),
            AttributeValue::Integer(secs) => self.from_secs(i64::from(secs)),
            AttributeValue::String(s) => {
                let s = s.trim();
                if let Ok(secs) = s.parse::<i64>() {
                    return self.from_secs(secs);
                }
                DateTime::parse_from_rfc3339(s)
                    .map_err(|e| CodecError::Transform {
                        codec: self.name(),
                        reason: format!("{:?}: {}", s, e),
                    })
                    .and_then(|t| self.from_secs(t.timestamp()))
            }
            other => Err(CodecError::Transform {
                codec: self.name(),
                reason: format!("expected timestamp, got {}", other.kind()),
            }),
        }
    }
}

/// Opaque bytes registered under the `octets` datatype
#[derive(Debug, Clone, Copy, Default)]
pub struct OctetsCodec;

impl AttributeCodec for OctetsCodec {
    fn name(&self) -> &'static str {
        "octets"
    }

    fn decode(&self, raw: &[u8]) -> Result<AttributeValue, CodecError> {
        check_length(raw.len())?;
        Ok(AttributeValue::Octets(raw.to_vec()))
    }

    fn encode(&self, value: &AttributeValue) -> Result<Vec<u8>, CodecError> {
        opaque_bytes(self.name(), value)
    }
}

/// Fallback for attribute types missing from the dictionary
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownCodec;

impl AttributeCodec for UnknownCodec {
    fn name(&self) -> &'static str {
        "unknown"
    }

    fn decode(&self, raw: &[u8]) -> Result<AttributeValue, CodecError> {
        check_length(raw.len())?;
        Ok(AttributeValue::Octets(raw.to_vec()))
    }

    fn encode(&self, value: &AttributeValue) -> Result<Vec<u8>, CodecError> {
        opaque_bytes(self.name(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_codec_falls_back_to_octets() {
        let value = StringCodec.decode(&[0xff, 0xfe]).unwrap();
        assert_eq!(value, AttributeValue::Octets(vec![0xff, 0xfe]));

        let value = StringCodec.decode(b"alice").unwrap();
        assert_eq!(value, AttributeValue::String("alice".to_string()));
    }

    #[test]
    fn test_string_codec_rejects_long_values() {
        let value = AttributeValue::String("x".repeat(254));
        assert_eq!(StringCodec.encode(&value), Err(CodecError::TooLong(254)));
    }

    #[test]
    fn test_integer_codec_length_contract() {
        assert_eq!(
            IntegerCodec.decode(&[0, 0, 1]),
            Err(CodecError::Format {
                codec: "integer",
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(
            IntegerCodec.decode(&[0, 0, 0x0e, 0x10]).unwrap(),
            AttributeValue::Integer(3600)
        );
        assert_eq!(
            IntegerCodec.encode(&AttributeValue::Integer(3600)).unwrap(),
            vec![0, 0, 0x0e, 0x10]
        );
    }

    #[test]
    fn test_integer_codec_rejects_text() {
        let err = IntegerCodec
            .encode(&AttributeValue::String("3600".into()))
            .unwrap_err();
        assert!(matches!(err, CodecError::Mismatch { .. }));
    }

    #[test]
    fn test_transformers_normalize_literals() {
        assert_eq!(
            IntegerCodec
                .transform(AttributeValue::String(" 42 ".into()))
                .unwrap(),
            AttributeValue::Integer(42)
        );
        assert_eq!(
            AddressCodec
                .transform(AttributeValue::String("192.168.1.10".into()))
                .unwrap(),
            AttributeValue::Address(Ipv4Addr::new(192, 168, 1, 10))
        );
        let t = TimeCodec
            .transform(AttributeValue::Integer(1_700_000_000))
            .unwrap();
        assert_eq!(t.as_time().unwrap().timestamp(), 1_700_000_000);
        assert!(IntegerCodec
            .transform(AttributeValue::String("abc".into()))
            .is_err());
    }

    #[test]
    fn test_time_codec_roundtrip() {
        let raw = 1_234_567_890u32.to_be_bytes();
        let value = TimeCodec.decode(&raw).unwrap();
        assert_eq!(TimeCodec.encode(&value).unwrap(), raw.to_vec());
    }

    #[test]
    fn test_time_codec_rejects_pre_epoch() {
        let before_epoch = DateTime::<Utc>::from_timestamp(-1, 0).unwrap();
        assert_eq!(
            TimeCodec.encode(&AttributeValue::Time(before_epoch)),
            Err(CodecError::OutOfRange(-1))
        );
    }

    #[test]
    fn test_unknown_codec_is_opaque() {
        let codec = unknown();
        assert!(codec.transformer().is_none());
        assert_eq!(
            codec.decode(&[1, 2, 3]).unwrap(),
            AttributeValue::Octets(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_datatype_keywords() {
        assert_eq!(DataType::from_keyword("IPADDR"), Some(DataType::IpAddr));
        assert_eq!(DataType::from_keyword("date").map(|d| d.codec().name()), Some("date"));
        assert_eq!(DataType::from_keyword("ipv6addr"), None);
    }
}
