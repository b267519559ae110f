use chrono::{DateTime, Utc};
use std::fmt;
use std::net::Ipv4Addr;

/// Decoded value of a RADIUS attribute
///
/// The shape depends on the codec that produced it: text attributes decode to
/// [`AttributeValue::String`], 32-bit counters and enumerations to
/// [`AttributeValue::Integer`], and so on. Values whose codec is unknown (or
/// whose bytes did not fit the codec's contract) are kept as
/// [`AttributeValue::Octets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// UTF-8 text
    String(String),
    /// Opaque bytes
    Octets(Vec<u8>),
    /// 32-bit unsigned integer
    Integer(u32),
    /// IPv4 address
    Address(Ipv4Addr),
    /// Seconds since the Unix epoch
    Time(DateTime<Utc>),
}

impl AttributeValue {
    /// Short name of the value's shape, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::String(_) => "string",
            AttributeValue::Octets(_) => "octets",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Address(_) => "ipaddr",
            AttributeValue::Time(_) => "date",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of a string or octets value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::String(s) => Some(s.as_bytes()),
            AttributeValue::Octets(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u32> {
        match self {
            AttributeValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Ipv4Addr> {
        match self {
            AttributeValue::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            AttributeValue::Time(t) => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Octets(bytes) => {
                f.write_str("0x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            AttributeValue::Integer(n) => write!(f, "{}", n),
            AttributeValue::Address(addr) => write!(f, "{}", addr),
            AttributeValue::Time(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%SZ")),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Octets(value)
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(value: &[u8]) -> Self {
        AttributeValue::Octets(value.to_vec())
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<Ipv4Addr> for AttributeValue {
    fn from(value: Ipv4Addr) -> Self {
        AttributeValue::Address(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::Time(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octets_display_is_hex() {
        let value = AttributeValue::Octets(vec![0x00, 0xab, 0x10]);
        assert_eq!(value.to_string(), "0x00ab10");
    }

    #[test]
    fn test_accessors_match_shape() {
        let value = AttributeValue::from("alice");
        assert_eq!(value.as_str(), Some("alice"));
        assert_eq!(value.as_bytes(), Some(&b"alice"[..]));
        assert_eq!(value.as_integer(), None);

        let value = AttributeValue::from(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(value.as_address(), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(value.kind(), "ipaddr");
    }
}
