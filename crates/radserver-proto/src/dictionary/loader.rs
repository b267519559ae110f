//! Dictionary text format
//!
//! ```text
//! ATTRIBUTE <name> <type 0-255> <string|integer|ipaddr|octets|date>
//! VENDOR <name> <positive-id>
//! BEGIN-VENDOR <name>
//! END-VENDOR <name>
//! ```
//!
//! Keywords are case-insensitive and fields are separated by any run of
//! whitespace. Loading is tolerant: a line that cannot be understood is
//! skipped and reported as a [`LoadWarning`]. Only two conditions abort a
//! load: a `VENDOR` line whose id is not a positive integer, and an
//! `ATTRIBUTE` whose type is already registered in the same vendor namespace.

use super::{Dictionary, DictionaryError, DEFAULT_VENDOR};
use crate::codec::DataType;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// A dictionary line that was skipped during loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// 1-based line number
    pub line: usize,
    /// The trimmed line as read
    pub content: String,
    pub reason: String,
}

enum Directive<'a> {
    Attribute {
        name: &'a str,
        attr_type: u8,
        data_type: DataType,
    },
    Vendor {
        name: &'a str,
        id: &'a str,
    },
    BeginVendor(&'a str),
    EndVendor,
}

fn parse_directive<'a>(fields: &[&'a str]) -> Result<Directive<'a>, String> {
    let keyword = fields[0].to_ascii_uppercase();
    match keyword.as_str() {
        "ATTRIBUTE" => {
            if fields.len() < 4 {
                return Err("expected ATTRIBUTE <name> <type> <datatype>".to_string());
            }
            let attr_type = fields[2]
                .parse::<u32>()
                .map_err(|_| format!("invalid attribute type {:?}", fields[2]))?;
            let attr_type = u8::try_from(attr_type)
                .map_err(|_| format!("attribute type {} out of range 0-255", attr_type))?;
            let data_type = DataType::from_keyword(fields[3])
                .ok_or_else(|| format!("unsupported datatype {:?}", fields[3]))?;
            Ok(Directive::Attribute {
                name: fields[1],
                attr_type,
                data_type,
            })
        }
        "VENDOR" => {
            if fields.len() < 3 {
                return Err("expected VENDOR <name> <id>".to_string());
            }
            Ok(Directive::Vendor {
                name: fields[1],
                id: fields[2],
            })
        }
        "BEGIN-VENDOR" => {
            if fields.len() < 2 {
                return Err("expected BEGIN-VENDOR <name>".to_string());
            }
            Ok(Directive::BeginVendor(fields[1]))
        }
        "END-VENDOR" => Ok(Directive::EndVendor),
        _ => Err(format!("unrecognized directive {:?}", fields[0])),
    }
}

impl Dictionary {
    /// Load a dictionary file, see [`Dictionary::load`]
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<LoadWarning>, DictionaryError> {
        let file = File::open(path)?;
        self.load(BufReader::new(file))
    }

    /// Load dictionary directives from text
    pub fn load_str(&self, text: &str) -> Result<Vec<LoadWarning>, DictionaryError> {
        self.load(text.as_bytes())
    }

    /// Load dictionary directives line by line
    ///
    /// Returns the lines that were skipped. `BEGIN-VENDOR` blocks are tracked
    /// by the loader itself, so the dictionary's current vendor is the same
    /// after the call as before, whether the load succeeds or not. A block
    /// still open at the end of input is reported as a warning. Redefining an
    /// attribute with the same name, type and datatype is a no-op, so files
    /// that repeat the standard attributes can be layered over
    /// [`Dictionary::builtin`].
    pub fn load<R: BufRead>(&self, reader: R) -> Result<Vec<LoadWarning>, DictionaryError> {
        let mut warnings = Vec::new();
        let mut vendor = DEFAULT_VENDOR.to_string();
        let mut open_block: Option<LoadWarning> = None;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() || fields[0].starts_with('#') {
                continue;
            }

            let skip = |reason: String| LoadWarning {
                line: index + 1,
                content: line.to_string(),
                reason,
            };

            match parse_directive(&fields) {
                Ok(Directive::Attribute {
                    name,
                    attr_type,
                    data_type,
                }) => {
                    let same_name =
                        self.vendor_name(&vendor, attr_type).as_deref() == Some(name);
                    let same_codec =
                        self.vendor_codec(&vendor, attr_type).name() == data_type.keyword();
                    if same_name && same_codec {
                        debug!(vendor = %vendor, attr_type, name, "Attribute already registered");
                        continue;
                    }
                    self.register_in(&vendor, name, attr_type, data_type.codec())?;
                }
                Ok(Directive::Vendor { name, id }) => {
                    let parsed = id.parse::<i64>().map_err(|_| DictionaryError::UnknownVendorId {
                        vendor: name.to_string(),
                        id: id.to_string(),
                    })?;
                    self.register_vendor(name, parsed)?;
                }
                Ok(Directive::BeginVendor(name)) => {
                    if self.vendor_id(name).is_some() {
                        vendor = name.to_string();
                        open_block = Some(skip(format!("BEGIN-VENDOR {} is never closed", name)));
                    } else {
                        warnings.push(skip(format!("unknown vendor {:?}", name)));
                    }
                }
                Ok(Directive::EndVendor) => {
                    vendor = DEFAULT_VENDOR.to_string();
                    open_block = None;
                }
                Err(reason) => warnings.push(skip(reason)),
            }
        }

        warnings.extend(open_block);

        for warning in &warnings {
            warn!(
                line = warning.line,
                content = %warning.content,
                reason = %warning.reason,
                "Ignoring dictionary line"
            );
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;
    use crate::codec;

    const ACME: &str = "\
ATTRIBUTE User-Name 1 string
VENDOR Acme 9000
BEGIN-VENDOR Acme
ATTRIBUTE Acme-Token 1 string
END-VENDOR Acme
";

    #[test]
    fn test_vendor_scoped_types_do_not_collide() {
        let dict = Dictionary::new();
        let warnings = dict.load_str(ACME).unwrap();
        assert!(warnings.is_empty());

        assert_eq!(dict.current_vendor(), DEFAULT_VENDOR);
        assert_eq!(dict.type_of("User-Name"), Some(1));
        assert_eq!(dict.vendor_type("Acme", "Acme-Token"), Some(1));
        assert_eq!(dict.vendor_type(DEFAULT_VENDOR, "Acme-Token"), None);
        assert_eq!(dict.vendor_id("Acme"), Some(9000));
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let dict = Dictionary::new();
        let warnings = dict
            .load_str("attribute   Session-Timeout\t27   INTEGER\n")
            .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(dict.codec(27).name(), "integer");
    }

    #[test]
    fn test_malformed_lines_are_reported_not_fatal() {
        let dict = Dictionary::new();
        let text = "\
# comment line

ATTRIBUTE Too-Big 300 string
ATTRIBUTE Negative -1 string
ATTRIBUTE Short 5
ATTRIBUTE Weird 6 ipv6prefix
VALUE Service-Type Login-User 1
BEGIN-VENDOR Nobody
ATTRIBUTE Good 7 octets
";
        let warnings = dict.load_str(text).unwrap();
        let lines: Vec<usize> = warnings.iter().map(|w| w.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6, 7, 8]);
        assert!(warnings[0].reason.contains("out of range"));

        assert_eq!(dict.type_of("Good"), Some(7));
        assert_eq!(dict.type_of("Too-Big"), None);
    }

    #[test]
    fn test_non_positive_vendor_id_is_fatal() {
        let dict = Dictionary::new();
        let err = dict.load_str("VENDOR Broken 0\n").unwrap_err();
        assert!(matches!(err, DictionaryError::UnknownVendorId { .. }));

        let err = dict.load_str("VENDOR Broken abc\n").unwrap_err();
        assert!(matches!(err, DictionaryError::UnknownVendorId { .. }));
    }

    #[test]
    fn test_duplicate_attribute_is_fatal() {
        let dict = Dictionary::new();
        let err = dict
            .load_str("ATTRIBUTE A 10 string\nATTRIBUTE B 10 integer\n")
            .unwrap_err();
        assert!(matches!(
            err,
            DictionaryError::DuplicateAttribute { attr_type: 10, .. }
        ));
        assert_eq!(dict.name(10).as_deref(), Some("A"));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let dict = Dictionary::new();
        let warnings = dict
            .load_str("ATTRIBUTE User-Password 2 octets encrypt=1\n")
            .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(dict.type_of("User-Password"), Some(2));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dict = Dictionary::new();
        let err = dict
            .load_file("/nonexistent/radserver/dictionary")
            .unwrap_err();
        assert!(matches!(err, DictionaryError::Io(_)));
    }

    #[test]
    fn test_unterminated_vendor_block_does_not_leak() {
        let dict = Dictionary::builtin();
        let warnings = dict
            .load_str("VENDOR Acme 9000\nBEGIN-VENDOR Acme\nATTRIBUTE Acme-Token 1 string\n")
            .unwrap();

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 2);
        assert!(warnings[0].reason.contains("never closed"));

        assert_eq!(dict.current_vendor(), DEFAULT_VENDOR);
        assert_eq!(dict.vendor_type("Acme", "Acme-Token"), Some(1));
        assert!(dict.attr("Reply-Message", "hello").is_ok());

        let raw = [0, 0, 14, 16];
        assert_eq!(
            dict.codec(27).decode(&raw).unwrap(),
            AttributeValue::Integer(3600)
        );
    }

    #[test]
    fn test_failed_load_inside_vendor_block_keeps_default() {
        let dict = Dictionary::builtin();
        let err = dict
            .load_str(
                "VENDOR Acme 9000\nBEGIN-VENDOR Acme\nATTRIBUTE A 5 string\nATTRIBUTE B 5 integer\n",
            )
            .unwrap_err();
        assert!(matches!(err, DictionaryError::DuplicateAttribute { .. }));

        assert_eq!(dict.current_vendor(), DEFAULT_VENDOR);
        assert_eq!(dict.type_of("Session-Timeout"), Some(27));
    }

    #[test]
    fn test_load_does_not_move_programmatic_cursor() {
        let dict = Dictionary::new();
        dict.register_vendor("Acme", 9000).unwrap();
        assert!(dict.switch_vendor("Acme"));

        dict.load_str("ATTRIBUTE Plain 10 string\n").unwrap();
        assert_eq!(dict.current_vendor(), "Acme");
        assert_eq!(dict.vendor_type(DEFAULT_VENDOR, "Plain"), Some(10));
    }

    #[test]
    fn test_identical_redefinition_is_noop() {
        let dict = Dictionary::builtin();
        let warnings = dict
            .load_str("ATTRIBUTE User-Name 1 string\nATTRIBUTE Session-Timeout 27 integer\n")
            .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(dict.codec(1).name(), "string");

        // A different datatype for the same type is still a conflict
        let err = dict.load_str("ATTRIBUTE User-Name 1 octets\n").unwrap_err();
        assert!(matches!(
            err,
            DictionaryError::DuplicateAttribute { attr_type: 1, .. }
        ));
        assert_eq!(codec::string().name(), dict.codec(1).name());
    }
}
