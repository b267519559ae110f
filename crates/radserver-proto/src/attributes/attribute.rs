use super::AttributeValue;
use crate::codec::{AttributeCodec, MAX_VALUE_LENGTH};
use crate::packet::PacketError;
use chrono::{DateTime, Utc};
use std::net::Ipv4Addr;

/// RADIUS Attribute structure as defined in RFC 2865 Section 5
///
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |    Length     |  Value ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The value is held decoded; the wire bytes are produced by the codec the
/// packet's dictionary binds to `attr_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute type (1 byte)
    pub attr_type: u8,
    /// Decoded attribute value
    pub value: AttributeValue,
}

impl Attribute {
    /// Minimum attribute length (type + length fields = 2 bytes)
    pub const MIN_LENGTH: usize = 2;
    /// Maximum attribute length (255 bytes including type and length)
    pub const MAX_LENGTH: usize = 255;

    pub fn new(attr_type: u8, value: impl Into<AttributeValue>) -> Self {
        Attribute {
            attr_type,
            value: value.into(),
        }
    }

    /// Create a string attribute
    pub fn string(attr_type: u8, value: impl Into<String>) -> Self {
        Self::new(attr_type, AttributeValue::String(value.into()))
    }

    /// Create an opaque octets attribute
    pub fn octets(attr_type: u8, value: impl Into<Vec<u8>>) -> Self {
        Self::new(attr_type, AttributeValue::Octets(value.into()))
    }

    /// Create an integer attribute (32-bit big-endian on the wire)
    pub fn integer(attr_type: u8, value: u32) -> Self {
        Self::new(attr_type, AttributeValue::Integer(value))
    }

    /// Create an IPv4 address attribute
    pub fn address(attr_type: u8, value: Ipv4Addr) -> Self {
        Self::new(attr_type, AttributeValue::Address(value))
    }

    /// Create a timestamp attribute
    pub fn time(attr_type: u8, value: DateTime<Utc>) -> Self {
        Self::new(attr_type, AttributeValue::Time(value))
    }

    /// Append the type-length-value record to `buffer`
    pub(crate) fn encode_into(
        &self,
        codec: &dyn AttributeCodec,
        buffer: &mut Vec<u8>,
    ) -> Result<(), PacketError> {
        let value = codec.encode(&self.value).map_err(|source| PacketError::Codec {
            attr_type: self.attr_type,
            source,
        })?;

        if value.len() > MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeTooLong {
                attr_type: self.attr_type,
                len: value.len(),
            });
        }

        buffer.push(self.attr_type);
        buffer.push((Self::MIN_LENGTH + value.len()) as u8);
        buffer.extend_from_slice(&value);
        Ok(())
    }
}
