//! Dictionary files loaded from disk and used to decode packets

use radserver_proto::{AttributeValue, Code, Dictionary, DictionaryError, Packet, DEFAULT_VENDOR};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_dictionary(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write dictionary");
    file
}

#[test]
fn test_vendor_dictionary_file() {
    let file = write_dictionary(
        "# Example vendor dictionary\n\
         ATTRIBUTE User-Name 1 string\n\
         VENDOR Acme 9000\n\
         BEGIN-VENDOR Acme\n\
         ATTRIBUTE Acme-Token 1 string\n\
         END-VENDOR Acme\n",
    );

    let dict = Dictionary::new();
    let warnings = dict.load_file(file.path()).expect("Failed to load dictionary");
    assert!(warnings.is_empty());

    assert_eq!(dict.current_vendor(), DEFAULT_VENDOR);
    assert_eq!(dict.type_of("User-Name"), Some(1));
    assert_eq!(dict.vendor_type("Acme", "Acme-Token"), Some(1));
    assert_eq!(dict.vendor_id("Acme"), Some(9000));
}

#[test]
fn test_site_dictionary_extends_builtin() {
    let file = write_dictionary(
        "ATTRIBUTE Site-Quota 200 integer\n\
         ATTRIBUTE Site-Gateway 201 ipaddr\n\
         ATTRIBUTE Site-Expiry 202 date\n\
         FLAGS ignored\n",
    );

    let dict = Dictionary::builtin();
    let warnings = dict.load_file(file.path()).expect("Failed to load dictionary");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].line, 4);

    let dict = Arc::new(dict);
    let mut packet = Packet::new(Code::AccessRequest, 17, "secret", Arc::clone(&dict));
    packet.add_attr("User-Name", "carol").expect("Failed to add User-Name");
    packet.add_attr("Site-Quota", "1024").expect("Failed to add Site-Quota");
    packet
        .add_attr("Site-Gateway", "10.20.30.40")
        .expect("Failed to add Site-Gateway");
    packet
        .add_attr("Site-Expiry", "2030-01-01T00:00:00Z")
        .expect("Failed to add Site-Expiry");

    let encoded = packet.encode().expect("Failed to encode packet");
    let decoded = Packet::parse(&encoded, b"secret", dict).expect("Failed to parse packet");

    assert_eq!(decoded.value("Site-Quota"), Some(&AttributeValue::Integer(1024)));
    assert_eq!(
        decoded.value("Site-Gateway").map(|v| v.to_string()).as_deref(),
        Some("10.20.30.40")
    );
    assert_eq!(
        decoded.value("Site-Expiry").map(|v| v.to_string()).as_deref(),
        Some("2030-01-01T00:00:00Z")
    );
}

#[test]
fn test_conflicting_dictionary_file_is_rejected() {
    let file = write_dictionary("ATTRIBUTE My-Name 1 string\n");

    let dict = Dictionary::builtin();
    let err = dict.load_file(file.path()).unwrap_err();
    assert!(matches!(
        err,
        DictionaryError::DuplicateAttribute { attr_type: 1, .. }
    ));
    assert_eq!(dict.name(1).as_deref(), Some("User-Name"));
}
