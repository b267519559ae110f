//! RADIUS Protocol Implementation
//!
//! This crate provides the protocol layer of the RADIUS protocol as defined in
//! RFC 2865 and RFC 2866.
//!
//! # Features
//!
//! - Packet encoding and decoding
//! - Vendor-aware attribute dictionary, loadable from dictionary files
//! - Pluggable attribute codecs (string, integer, ipaddr, octets, date)
//! - Request/Response and Accounting-Request Authenticator calculation
//! - MD5-based User-Password obfuscation
//!
//! # Example
//!
//! ```rust
//! use radserver_proto::auth::encrypt_user_password;
//! use radserver_proto::{Code, Dictionary, Packet};
//! use std::sync::Arc;
//!
//! let dict = Arc::new(Dictionary::builtin());
//!
//! // Create an Access-Request packet
//! let mut packet = Packet::new(Code::AccessRequest, 1, "secret", Arc::clone(&dict));
//! packet.add_attr("User-Name", "alice").unwrap();
//!
//! // Add encrypted User-Password
//! let encrypted = encrypt_user_password("password", b"secret", &packet.authenticator).unwrap();
//! packet.add_attr("User-Password", encrypted).unwrap();
//!
//! // Encode to bytes and decode on the other side
//! let bytes = packet.encode().unwrap();
//! let received = Packet::parse(&bytes, b"secret", dict).unwrap();
//! assert_eq!(
//!     received.pap(),
//!     Some(("alice".to_string(), "password".to_string()))
//! );
//! ```

pub mod attributes;
pub mod auth;
pub mod codec;
pub mod dictionary;
pub mod packet;

pub use attributes::{Attribute, AttributeType, AttributeValue};
pub use auth::{
    calculate_accounting_request_authenticator, calculate_response_authenticator,
    decrypt_user_password, encrypt_user_password, generate_request_authenticator,
    verify_response_authenticator, PasswordError,
};
pub use codec::{AttributeCodec, AttributeTransformer, CodecError, DataType, SharedCodec};
pub use dictionary::{DictEntry, Dictionary, DictionaryError, LoadWarning, DEFAULT_VENDOR};
pub use packet::{AttributeWarning, Code, Packet, PacketError};
