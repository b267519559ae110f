//! Attribute dictionary
//!
//! Maps attribute names and numeric types to codecs, partitioned into vendor
//! namespaces. The `default` namespace always exists and holds the standard
//! attributes; further namespaces are created by [`Dictionary::register_vendor`]
//! (or `VENDOR` lines in a dictionary file).
//!
//! A dictionary has a *current vendor* cursor. Registration and the unscoped
//! lookups ([`Dictionary::name`], [`Dictionary::type_of`], [`Dictionary::codec`],
//! [`Dictionary::attr`]) operate on the current namespace; the `vendor_*`
//! lookups take the namespace explicitly. The cursor only moves through
//! [`Dictionary::switch_vendor`] and [`Dictionary::end_vendor`]; the file
//! loader tracks `BEGIN-VENDOR` blocks on its own and never moves it.
//!
//! # Example
//!
//! ```rust
//! use radserver_proto::{codec, Dictionary};
//!
//! let dict = Dictionary::builtin();
//! assert_eq!(dict.type_of("User-Name"), Some(1));
//!
//! dict.register("Example-Counter", 200, codec::integer()).unwrap();
//! let attr = dict.attr("Example-Counter", "42").unwrap();
//! assert_eq!(attr.value.as_integer(), Some(42));
//! ```

mod loader;

pub use loader::LoadWarning;

use crate::attributes::{Attribute, AttributeType, AttributeValue};
use crate::codec::{self, CodecError, SharedCodec};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::debug;

/// Name of the namespace holding the standard attributes
pub const DEFAULT_VENDOR: &str = "default";

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("attribute type {attr_type} already registered in vendor {vendor} (registering {name})")]
    DuplicateAttribute {
        vendor: String,
        attr_type: u8,
        name: String,
    },
    #[error("attribute {0:?} is not registered")]
    UnknownAttribute(String),
    #[error("vendor {0:?} is not registered")]
    UnknownVendor(String),
    #[error("invalid vendor id {id:?} for vendor {vendor}: must be a positive integer")]
    UnknownVendorId { vendor: String, id: String },
    #[error("attribute {name}: {source}")]
    Codec {
        name: String,
        #[source]
        source: CodecError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A registered attribute
#[derive(Debug, Clone)]
pub struct DictEntry {
    pub attr_type: u8,
    pub name: String,
    pub codec: SharedCodec,
}

struct VendorSpace {
    id: u32,
    by_type: Vec<Option<Arc<DictEntry>>>,
    by_name: HashMap<String, Arc<DictEntry>>,
}

impl VendorSpace {
    fn new(id: u32) -> Self {
        VendorSpace {
            id,
            by_type: vec![None; 256],
            by_name: HashMap::new(),
        }
    }

    fn entry_by_type(&self, attr_type: u8) -> Option<&Arc<DictEntry>> {
        self.by_type[usize::from(attr_type)].as_ref()
    }
}

struct Inner {
    vendors: HashMap<String, VendorSpace>,
    current: String,
}

impl Inner {
    fn space(&self, vendor: &str) -> Option<&VendorSpace> {
        self.vendors.get(vendor)
    }

    fn current_space(&self) -> Option<&VendorSpace> {
        self.vendors.get(&self.current)
    }
}

/// Registry of attribute names, types and codecs
///
/// Internally synchronized: share it behind an [`Arc`] between the server and
/// every packet it decodes.
pub struct Dictionary {
    inner: RwLock<Inner>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        let mut vendors: Vec<(&str, u32, usize)> = inner
            .vendors
            .iter()
            .map(|(name, space)| (name.as_str(), space.id, space.by_name.len()))
            .collect();
        vendors.sort_unstable();
        f.debug_struct("Dictionary")
            .field("current", &inner.current)
            .field("vendors", &vendors)
            .finish()
    }
}

impl Dictionary {
    /// Create an empty dictionary with only the `default` namespace
    pub fn new() -> Self {
        let mut vendors = HashMap::new();
        vendors.insert(DEFAULT_VENDOR.to_string(), VendorSpace::new(0));
        Dictionary {
            inner: RwLock::new(Inner {
                vendors,
                current: DEFAULT_VENDOR.to_string(),
            }),
        }
    }

    /// Create a dictionary holding the RFC 2865 / RFC 2866 attributes
    pub fn builtin() -> Self {
        let dict = Self::new();
        for attr_type in AttributeType::ALL {
            dict.must_register(
                attr_type.name(),
                attr_type.as_u8(),
                attr_type.data_type().codec(),
            );
        }
        dict
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a vendor namespace
    ///
    /// Registering a name that is already known is a no-op. The current vendor
    /// is not changed; use [`Dictionary::switch_vendor`].
    pub fn register_vendor(&self, name: &str, id: i64) -> Result<(), DictionaryError> {
        let id = u32::try_from(id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| DictionaryError::UnknownVendorId {
                vendor: name.to_string(),
                id: id.to_string(),
            })?;

        let mut inner = self.write();
        if inner.vendors.contains_key(name) {
            return Ok(());
        }
        inner.vendors.insert(name.to_string(), VendorSpace::new(id));
        debug!(vendor = name, vendor_id = id, "Registered vendor");
        Ok(())
    }

    /// Make `name` the current vendor; unknown names leave the cursor alone
    pub fn switch_vendor(&self, name: &str) -> bool {
        let mut inner = self.write();
        if !inner.vendors.contains_key(name) {
            debug!(vendor = name, "Ignoring switch to unknown vendor");
            return false;
        }
        inner.current = name.to_string();
        true
    }

    /// Switch back to the `default` namespace
    pub fn end_vendor(&self) {
        self.write().current = DEFAULT_VENDOR.to_string();
    }

    pub fn current_vendor(&self) -> String {
        self.read().current.clone()
    }

    /// Numeric id of a vendor (0 for `default`)
    pub fn vendor_id(&self, name: &str) -> Option<u32> {
        self.read().space(name).map(|space| space.id)
    }

    /// Register `codec` for attribute `name` / `attr_type` in the current
    /// vendor namespace
    ///
    /// Fails without modifying the dictionary if the type is already taken.
    /// A name may be re-registered under a different type; the name lookup
    /// then resolves to the newest entry.
    pub fn register(
        &self,
        name: &str,
        attr_type: u8,
        codec: SharedCodec,
    ) -> Result<(), DictionaryError> {
        let vendor = self.current_vendor();
        self.register_in(&vendor, name, attr_type, codec)
    }

    /// [`Dictionary::register`] into an explicit vendor namespace
    ///
    /// Leaves the current vendor cursor untouched.
    pub fn register_in(
        &self,
        vendor: &str,
        name: &str,
        attr_type: u8,
        codec: SharedCodec,
    ) -> Result<(), DictionaryError> {
        let mut inner = self.write();
        let space = inner
            .vendors
            .get_mut(vendor)
            .ok_or_else(|| DictionaryError::UnknownVendor(vendor.to_string()))?;

        if space.entry_by_type(attr_type).is_some() {
            return Err(DictionaryError::DuplicateAttribute {
                vendor: vendor.to_string(),
                attr_type,
                name: name.to_string(),
            });
        }

        let entry = Arc::new(DictEntry {
            attr_type,
            name: name.to_string(),
            codec,
        });
        space.by_type[usize::from(attr_type)] = Some(Arc::clone(&entry));
        space.by_name.insert(name.to_string(), entry);
        Ok(())
    }

    /// [`Dictionary::register`] for callers that know the type is free
    ///
    /// # Panics
    ///
    /// Panics if the type is already registered in the current namespace.
    pub fn must_register(&self, name: &str, attr_type: u8, codec: SharedCodec) {
        if let Err(e) = self.register(name, attr_type, codec) {
            panic!("{}", e);
        }
    }

    /// Build an attribute by name from the current vendor namespace
    ///
    /// When the attribute's codec is a transformer the value is normalized
    /// first, so `attr("Session-Timeout", "3600")` yields an integer value.
    pub fn attr(
        &self,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<Attribute, DictionaryError> {
        let entry = self
            .read()
            .current_space()
            .and_then(|space| space.by_name.get(name).cloned())
            .ok_or_else(|| DictionaryError::UnknownAttribute(name.to_string()))?;

        let mut value = value.into();
        if let Some(transformer) = entry.codec.transformer() {
            value = transformer
                .transform(value)
                .map_err(|source| DictionaryError::Codec {
                    name: name.to_string(),
                    source,
                })?;
        }

        Ok(Attribute {
            attr_type: entry.attr_type,
            value,
        })
    }

    /// [`Dictionary::attr`] for callers that know the name and value are valid
    ///
    /// # Panics
    ///
    /// Panics if the name is unknown or the value cannot be transformed.
    pub fn must_attr(&self, name: &str, value: impl Into<AttributeValue>) -> Attribute {
        match self.attr(name, value) {
            Ok(attr) => attr,
            Err(e) => panic!("{}", e),
        }
    }

    /// Registered name of `attr_type` in the current namespace
    pub fn name(&self, attr_type: u8) -> Option<String> {
        self.read()
            .current_space()
            .and_then(|space| space.entry_by_type(attr_type))
            .map(|entry| entry.name.clone())
    }

    /// Registered type of `name` in the current namespace
    pub fn type_of(&self, name: &str) -> Option<u8> {
        self.read()
            .current_space()
            .and_then(|space| space.by_name.get(name))
            .map(|entry| entry.attr_type)
    }

    /// Codec for `attr_type` in the current namespace, or the unknown codec
    pub fn codec(&self, attr_type: u8) -> SharedCodec {
        self.read()
            .current_space()
            .and_then(|space| space.entry_by_type(attr_type))
            .map(|entry| Arc::clone(&entry.codec))
            .unwrap_or_else(codec::unknown)
    }

    pub fn vendor_name(&self, vendor: &str, attr_type: u8) -> Option<String> {
        self.read()
            .space(vendor)
            .and_then(|space| space.entry_by_type(attr_type))
            .map(|entry| entry.name.clone())
    }

    pub fn vendor_type(&self, vendor: &str, name: &str) -> Option<u8> {
        self.read()
            .space(vendor)
            .and_then(|space| space.by_name.get(name))
            .map(|entry| entry.attr_type)
    }

    pub fn vendor_codec(&self, vendor: &str, attr_type: u8) -> SharedCodec {
        self.read()
            .space(vendor)
            .and_then(|space| space.entry_by_type(attr_type))
            .map(|entry| Arc::clone(&entry.codec))
            .unwrap_or_else(codec::unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_builtin_has_standard_attributes() {
        let dict = Dictionary::builtin();
        assert_eq!(dict.type_of("User-Name"), Some(1));
        assert_eq!(dict.name(4).as_deref(), Some("NAS-IP-Address"));
        assert_eq!(dict.codec(4).name(), "ipaddr");
        assert_eq!(dict.type_of("Acct-Status-Type"), Some(40));
        assert_eq!(dict.current_vendor(), DEFAULT_VENDOR);
        assert_eq!(dict.vendor_id(DEFAULT_VENDOR), Some(0));
    }

    #[test]
    fn test_unregistered_type_uses_unknown_codec() {
        let dict = Dictionary::builtin();
        assert_eq!(dict.codec(17).name(), "unknown");
        assert_eq!(dict.name(17), None);
    }

    #[test]
    fn test_duplicate_type_keeps_first_registration() {
        let dict = Dictionary::new();
        dict.register("First", 200, codec::string()).unwrap();

        let err = dict.register("Second", 200, codec::integer()).unwrap_err();
        assert!(matches!(
            err,
            DictionaryError::DuplicateAttribute { attr_type: 200, .. }
        ));

        assert_eq!(dict.name(200).as_deref(), Some("First"));
        assert_eq!(dict.codec(200).name(), "string");
        assert_eq!(dict.type_of("Second"), None);
    }

    #[test]
    fn test_same_name_with_new_type_is_allowed() {
        let dict = Dictionary::new();
        dict.register("Alias", 200, codec::string()).unwrap();
        dict.register("Alias", 201, codec::string()).unwrap();
        assert_eq!(dict.type_of("Alias"), Some(201));
        assert_eq!(dict.name(200).as_deref(), Some("Alias"));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_must_register_panics_on_duplicate() {
        let dict = Dictionary::builtin();
        dict.must_register("Another-User-Name", 1, codec::string());
    }

    #[test]
    fn test_register_vendor_requires_positive_id() {
        let dict = Dictionary::new();
        assert!(matches!(
            dict.register_vendor("Broken", 0),
            Err(DictionaryError::UnknownVendorId { .. })
        ));
        assert!(dict.register_vendor("Broken", -5).is_err());
        assert_eq!(dict.vendor_id("Broken"), None);
    }

    #[test]
    fn test_register_vendor_is_idempotent() {
        let dict = Dictionary::new();
        dict.register_vendor("Acme", 9000).unwrap();
        dict.register_vendor("Acme", 1234).unwrap();
        assert_eq!(dict.vendor_id("Acme"), Some(9000));
        assert_eq!(dict.current_vendor(), DEFAULT_VENDOR);
    }

    #[test]
    fn test_vendor_namespaces_are_independent() {
        let dict = Dictionary::builtin();
        dict.register_vendor("Acme", 9000).unwrap();

        assert!(dict.switch_vendor("Acme"));
        dict.register("Acme-Token", 1, codec::string()).unwrap();
        assert_eq!(dict.type_of("Acme-Token"), Some(1));
        assert_eq!(dict.type_of("User-Name"), None);
        dict.end_vendor();

        assert_eq!(dict.type_of("User-Name"), Some(1));
        assert_eq!(dict.type_of("Acme-Token"), None);
        assert_eq!(dict.vendor_type("Acme", "Acme-Token"), Some(1));
        assert_eq!(dict.vendor_name("Acme", 1).as_deref(), Some("Acme-Token"));
        assert_eq!(dict.vendor_codec("Acme", 2).name(), "unknown");
    }

    #[test]
    fn test_switch_to_unknown_vendor_is_noop() {
        let dict = Dictionary::new();
        assert!(!dict.switch_vendor("Nobody"));
        assert_eq!(dict.current_vendor(), DEFAULT_VENDOR);
    }

    #[test]
    fn test_attr_applies_transformer() {
        let dict = Dictionary::builtin();
        let attr = dict.attr("Session-Timeout", "3600").unwrap();
        assert_eq!(attr.attr_type, 27);
        assert_eq!(attr.value, AttributeValue::Integer(3600));

        let attr = dict.attr("Framed-IP-Address", "10.1.2.3").unwrap();
        assert_eq!(attr.value.as_address(), Some(Ipv4Addr::new(10, 1, 2, 3)));
    }

    #[test]
    fn test_attr_without_transformer_stores_value() {
        let dict = Dictionary::builtin();
        let attr = dict.attr("Class", vec![1u8, 2, 3]).unwrap();
        assert_eq!(attr.value, AttributeValue::Octets(vec![1, 2, 3]));
    }

    #[test]
    fn test_attr_errors() {
        let dict = Dictionary::builtin();
        assert!(matches!(
            dict.attr("No-Such-Attribute", "x"),
            Err(DictionaryError::UnknownAttribute(_))
        ));
        assert!(matches!(
            dict.attr("NAS-Port", "not a number"),
            Err(DictionaryError::Codec { .. })
        ));
    }

    #[test]
    fn test_register_in_leaves_cursor_alone() {
        let dict = Dictionary::builtin();
        dict.register_vendor("Acme", 9000).unwrap();
        dict.register_in("Acme", "Acme-Token", 1, codec::string())
            .unwrap();

        assert_eq!(dict.current_vendor(), DEFAULT_VENDOR);
        assert_eq!(dict.vendor_type("Acme", "Acme-Token"), Some(1));
        assert_eq!(dict.type_of("User-Name"), Some(1));
        assert!(matches!(
            dict.register_in("Nobody", "X", 1, codec::string()),
            Err(DictionaryError::UnknownVendor(_))
        ));
    }
}
