use super::Code;
use crate::attributes::{Attribute, AttributeType, AttributeValue};
use crate::auth::{self, AUTHENTICATOR_LENGTH};
use crate::codec::CodecError;
use crate::dictionary::{Dictionary, DictionaryError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("Malformed packet: {0}")]
    Malformed(String),
    #[error("Invalid packet code: {0}")]
    InvalidCode(u8),
    #[error("Accounting-Request authenticator does not match the shared secret")]
    AuthenticatorMismatch,
    #[error("Packet too large: {0} bytes")]
    TooLarge(usize),
    #[error("Attribute {attr_type} value too long: {len} bytes")]
    AttributeTooLong { attr_type: u8, len: usize },
    #[error("Attribute {attr_type}: {source}")]
    Codec {
        attr_type: u8,
        #[source]
        source: CodecError,
    },
}

/// An attribute whose value the dictionary codec could not decode
///
/// The attribute itself is still present in [`Packet::attributes`] at `index`,
/// holding the raw bytes as [`AttributeValue::Octets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeWarning {
    pub index: usize,
    pub attr_type: u8,
    pub error: CodecError,
}

/// RADIUS Packet structure as defined in RFC 2865 Section 3
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Code      |  Identifier   |            Length             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// |                         Authenticator                         |
/// |                                                               |
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Attributes ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-
/// ```
///
/// Besides the wire fields a packet carries the shared secret and the
/// dictionary it was decoded with; neither is transmitted. A response built
/// with [`Packet::response`] keeps the request's authenticator in
/// `authenticator`, and [`Packet::encode`] replaces it with the computed
/// Response Authenticator on the wire.
#[derive(Clone)]
pub struct Packet {
    /// Packet type (1 byte)
    pub code: Code,
    /// Packet identifier for matching requests/responses (1 byte)
    pub identifier: u8,
    /// Request Authenticator (16 bytes)
    pub authenticator: [u8; AUTHENTICATOR_LENGTH],
    /// Shared secret bound to this exchange
    pub secret: Vec<u8>,
    pub dictionary: Arc<Dictionary>,
    /// Attributes in wire order
    pub attributes: Vec<Attribute>,
    /// Attributes kept undecoded while parsing
    pub warnings: Vec<AttributeWarning>,
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("code", &self.code)
            .field("identifier", &self.identifier)
            .field("authenticator", &self.authenticator)
            .field("secret", &"<redacted>")
            .field("attributes", &self.attributes)
            .field("warnings", &self.warnings)
            .finish()
    }
}

impl Packet {
    /// Minimum RADIUS packet size (20 bytes: 1 code + 1 id + 2 length + 16 authenticator)
    pub const MIN_PACKET_SIZE: usize = 20;
    /// Maximum RADIUS packet size (4096 bytes as per RFC 2865)
    pub const MAX_PACKET_SIZE: usize = 4096;

    /// Create a request with a fresh random authenticator
    pub fn new(
        code: Code,
        identifier: u8,
        secret: impl Into<Vec<u8>>,
        dictionary: Arc<Dictionary>,
    ) -> Self {
        Packet {
            code,
            identifier,
            authenticator: auth::generate_request_authenticator(),
            secret: secret.into(),
            dictionary,
            attributes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Create an empty reply to this packet
    ///
    /// The reply shares identifier, authenticator, secret and dictionary with
    /// the request.
    pub fn response(&self, code: Code) -> Packet {
        Packet {
            code,
            identifier: self.identifier,
            authenticator: self.authenticator,
            secret: self.secret.clone(),
            dictionary: Arc::clone(&self.dictionary),
            attributes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Decode a received datagram
    ///
    /// Accounting-Request authenticators are checked against `secret`;
    /// Access-Request authenticators are random and taken as received.
    pub fn parse(
        data: &[u8],
        secret: &[u8],
        dictionary: Arc<Dictionary>,
    ) -> Result<Self, PacketError> {
        if data.len() < Self::MIN_PACKET_SIZE {
            return Err(PacketError::Malformed(format!(
                "{} bytes is shorter than the header",
                data.len()
            )));
        }
        if data.len() > Self::MAX_PACKET_SIZE {
            return Err(PacketError::Malformed(format!(
                "{} bytes exceeds the maximum packet size",
                data.len()
            )));
        }

        let code = Code::from_u8(data[0]).ok_or(PacketError::InvalidCode(data[0]))?;
        let identifier = data[1];

        let length = usize::from(u16::from_be_bytes([data[2], data[3]]));
        if length != data.len() {
            return Err(PacketError::Malformed(format!(
                "length field {} does not match {} bytes received",
                length,
                data.len()
            )));
        }

        let mut authenticator = [0u8; AUTHENTICATOR_LENGTH];
        authenticator.copy_from_slice(&data[4..Self::MIN_PACKET_SIZE]);

        let mut attributes = Vec::new();
        let mut warnings = Vec::new();
        let mut rest = &data[Self::MIN_PACKET_SIZE..];

        while !rest.is_empty() {
            if rest.len() < Attribute::MIN_LENGTH {
                return Err(PacketError::Malformed("truncated attribute header".to_string()));
            }
            let attr_type = rest[0];
            let attr_len = usize::from(rest[1]);
            if attr_len < Attribute::MIN_LENGTH || attr_len > rest.len() {
                return Err(PacketError::Malformed(format!(
                    "attribute {} has invalid length {}",
                    attr_type, attr_len
                )));
            }

            let raw = &rest[Attribute::MIN_LENGTH..attr_len];
            let value = match dictionary.codec(attr_type).decode(raw) {
                Ok(value) => value,
                Err(error) => {
                    warnings.push(AttributeWarning {
                        index: attributes.len(),
                        attr_type,
                        error,
                    });
                    AttributeValue::Octets(raw.to_vec())
                }
            };
            attributes.push(Attribute { attr_type, value });
            rest = &rest[attr_len..];
        }

        if code == Code::AccountingRequest
            && auth::calculate_accounting_request_authenticator(data, secret) != authenticator
        {
            return Err(PacketError::AuthenticatorMismatch);
        }

        Ok(Packet {
            code,
            identifier,
            authenticator,
            secret: secret.to_vec(),
            dictionary,
            attributes,
            warnings,
        })
    }

    /// Encode packet to bytes
    ///
    /// The authenticator written depends on the code: replies get the
    /// Response Authenticator computed over `self.authenticator`,
    /// Accounting-Request gets the RFC 2866 digest, and other requests keep
    /// `self.authenticator` unchanged.
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut buffer = Vec::with_capacity(Self::MIN_PACKET_SIZE);
        buffer.push(self.code.as_u8());
        buffer.push(self.identifier);
        // Length is filled in once the attributes are written
        buffer.extend_from_slice(&[0, 0]);
        buffer.extend_from_slice(&self.authenticator);

        for attr in &self.attributes {
            let codec = self.dictionary.codec(attr.attr_type);
            attr.encode_into(codec.as_ref(), &mut buffer)?;
        }

        let total_length = buffer.len();
        if total_length > Self::MAX_PACKET_SIZE {
            return Err(PacketError::TooLarge(total_length));
        }
        buffer[2..4].copy_from_slice(&(total_length as u16).to_be_bytes());

        let authenticator = if self.code.is_response() {
            Some(auth::calculate_response_authenticator(
                &buffer,
                &self.authenticator,
                &self.secret,
            ))
        } else if self.code == Code::AccountingRequest {
            Some(auth::calculate_accounting_request_authenticator(
                &buffer,
                &self.secret,
            ))
        } else {
            None
        };
        if let Some(authenticator) = authenticator {
            buffer[4..Self::MIN_PACKET_SIZE].copy_from_slice(&authenticator);
        }

        Ok(buffer)
    }

    pub fn add(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Append an attribute built by name through the packet's dictionary
    pub fn add_attr(
        &mut self,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<(), DictionaryError> {
        let attribute = self.dictionary.attr(name, value)?;
        self.attributes.push(attribute);
        Ok(())
    }

    /// Find first attribute by type
    pub fn get(&self, attr_type: u8) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.attr_type == attr_type)
    }

    /// Find all attributes by type
    pub fn get_all(&self, attr_type: u8) -> Vec<&Attribute> {
        self.attributes
            .iter()
            .filter(|a| a.attr_type == attr_type)
            .collect()
    }

    /// Value of the first attribute registered as `name` in the dictionary
    pub fn value(&self, name: &str) -> Option<&AttributeValue> {
        let attr_type = self.dictionary.type_of(name)?;
        self.get(attr_type).map(|attr| &attr.value)
    }

    /// Extract PAP credentials from an Access-Request
    ///
    /// Returns the User-Name and the de-obfuscated User-Password, or `None`
    /// when either attribute is missing or the password is malformed.
    pub fn pap(&self) -> Option<(String, String)> {
        let username = self.get(AttributeType::UserName.as_u8())?.value.as_bytes()?;
        let username = String::from_utf8(username.to_vec()).ok()?;

        let encrypted = self.get(AttributeType::UserPassword.as_u8())?.value.as_bytes()?;
        let password =
            auth::decrypt_user_password(encrypted, &self.secret, &self.authenticator).ok()?;
        let password = String::from_utf8(password).ok()?;

        Some((username, password))
    }
}
