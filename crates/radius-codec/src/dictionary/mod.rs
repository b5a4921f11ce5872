//! RADIUS attribute dictionary
//!
//! A [`Dictionary`] maps attribute codes (optionally scoped to a vendor) to
//! typed [`AttributeType`] definitions, and vendor ids to vendor names. It is
//! built once, usually by the [`DictionaryParser`], and then shared read-only
//! behind an `Arc` by every packet that needs to interpret attributes.

pub mod parser;

pub use parser::{DictionaryParser, EmbeddedResolver, FileResolver, ResourceResolver};

use crate::attributes::codes::VENDOR_SPECIFIC;
use crate::attributes::AttributeValue;
use crate::packet::PacketError;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Duplicate attribute code {code} (vendor {vendor_id:?})")]
    DuplicateCode { vendor_id: Option<u32>, code: u8 },
    #[error("Duplicate attribute name: {0}")]
    DuplicateName(String),
    #[error("Duplicate vendor id {0}")]
    DuplicateVendor(u32),
    #[error("Unknown attribute type: {0}")]
    UnknownAttribute(String),
    #[error("{directive} expects {expected} tokens, got {found}")]
    MissingToken {
        directive: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Invalid number '{token}': {source}")]
    InvalidNumber {
        token: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Cannot open dictionary resource '{resource}': {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },
}

/// Wire representation of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// UTF-8 text, variable length
    String,
    /// 32-bit big-endian unsigned integer; also used for `date` (seconds since epoch)
    Integer,
    /// 4-byte IPv4 address
    Ipv4Addr,
    /// 16-byte IPv6 address
    Ipv6Addr,
    /// RFC 3162 prefix: reserved byte, prefix length, truncated prefix
    Ipv6Prefix,
    /// Opaque bytes
    Octets,
    /// Container of vendor sub-attributes (standard code 26 only)
    VendorSpecific,
}

impl ValueKind {
    /// Map a dictionary type keyword to a value kind.
    ///
    /// Matching is case-insensitive; unrecognised keywords (including
    /// `octets`) fall back to [`ValueKind::Octets`].
    pub fn from_type_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "string" => ValueKind::String,
            "integer" | "date" => ValueKind::Integer,
            "ipaddr" => ValueKind::Ipv4Addr,
            "ipv6addr" => ValueKind::Ipv6Addr,
            "ipv6prefix" => ValueKind::Ipv6Prefix,
            _ => ValueKind::Octets,
        }
    }
}

/// A named, typed attribute definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    /// Attribute code (sub-type code for vendor attributes)
    pub code: u8,
    /// Owning vendor, `None` for the standard RADIUS space
    pub vendor_id: Option<u32>,
    /// Attribute name, e.g. `User-Name`
    pub name: String,
    /// How the value bytes are interpreted
    pub kind: ValueKind,
    enum_values: BTreeMap<u32, String>,
}

impl AttributeType {
    pub fn new(code: u8, name: impl Into<String>, kind: ValueKind) -> Self {
        AttributeType {
            code,
            vendor_id: None,
            name: name.into(),
            kind,
            enum_values: BTreeMap::new(),
        }
    }

    pub fn vendor(vendor_id: u32, code: u8, name: impl Into<String>, kind: ValueKind) -> Self {
        AttributeType {
            vendor_id: Some(vendor_id),
            ..Self::new(code, name, kind)
        }
    }

    /// Enumeration label for an integer value
    pub fn enum_name(&self, value: u32) -> Option<&str> {
        self.enum_values.get(&value).map(String::as_str)
    }

    /// Integer value for an enumeration label
    pub fn enum_value(&self, name: &str) -> Option<u32> {
        self.enum_values
            .iter()
            .find(|(_, label)| label.as_str() == name)
            .map(|(value, _)| *value)
    }

    pub fn enum_values(&self) -> impl Iterator<Item = (u32, &str)> {
        self.enum_values.iter().map(|(v, n)| (*v, n.as_str()))
    }

    /// Render raw value bytes as text, using enumeration labels for integers
    pub fn format_value(&self, bytes: &[u8]) -> String {
        match self.kind.decode(bytes) {
            Ok(AttributeValue::Integer(v)) => match self.enum_name(v) {
                Some(label) => label.to_string(),
                None => v.to_string(),
            },
            Ok(value) => value.to_string(),
            Err(_) => AttributeValue::Octets(bytes.to_vec()).to_string(),
        }
    }

    /// Parse text into raw value bytes, accepting enumeration labels for integers
    pub fn parse_value(&self, text: &str) -> Result<Vec<u8>, PacketError> {
        if self.kind == ValueKind::Integer {
            if let Some(value) = self.enum_value(text) {
                return Ok(value.to_be_bytes().to_vec());
            }
        }
        self.kind.parse(text)
    }
}

/// Registry of attribute types and vendors
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    types: Vec<AttributeType>,
    by_code: HashMap<(Option<u32>, u8), usize>,
    by_name: HashMap<String, usize>,
    vendors: HashMap<u32, String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute type.
    ///
    /// Standard code 26 is always stored as [`ValueKind::VendorSpecific`],
    /// whatever kind the caller declared.
    pub fn add_attribute_type(&mut self, mut attr: AttributeType) -> Result<(), DictionaryError> {
        if attr.vendor_id.is_none()
            && attr.code == VENDOR_SPECIFIC
            && attr.kind != ValueKind::VendorSpecific
        {
            debug!(name = %attr.name, "Forcing vendor-specific kind for code 26");
            attr.kind = ValueKind::VendorSpecific;
        }

        let key = (attr.vendor_id, attr.code);
        if self.by_code.contains_key(&key) {
            return Err(DictionaryError::DuplicateCode {
                vendor_id: attr.vendor_id,
                code: attr.code,
            });
        }
        if self.by_name.contains_key(&attr.name) {
            return Err(DictionaryError::DuplicateName(attr.name));
        }

        let index = self.types.len();
        self.by_code.insert(key, index);
        self.by_name.insert(attr.name.clone(), index);
        self.types.push(attr);
        Ok(())
    }

    /// Attach an enumeration label to a named attribute type
    pub fn add_enumeration_value(
        &mut self,
        type_name: &str,
        value: u32,
        label: impl Into<String>,
    ) -> Result<(), DictionaryError> {
        let index = *self
            .by_name
            .get(type_name)
            .ok_or_else(|| DictionaryError::UnknownAttribute(type_name.to_string()))?;
        self.types[index].enum_values.insert(value, label.into());
        Ok(())
    }

    pub fn add_vendor(&mut self, vendor_id: u32, name: impl Into<String>) -> Result<(), DictionaryError> {
        let name = name.into();
        match self.vendors.get(&vendor_id) {
            Some(existing) if *existing != name => Err(DictionaryError::DuplicateVendor(vendor_id)),
            _ => {
                self.vendors.insert(vendor_id, name);
                Ok(())
            }
        }
    }

    pub fn attribute_type(&self, vendor_id: Option<u32>, code: u8) -> Option<&AttributeType> {
        self.by_code
            .get(&(vendor_id, code))
            .map(|&index| &self.types[index])
    }

    pub fn attribute_type_by_name(&self, name: &str) -> Option<&AttributeType> {
        self.by_name.get(name).map(|&index| &self.types[index])
    }

    pub fn vendor_name(&self, vendor_id: u32) -> Option<&str> {
        self.vendors.get(&vendor_id).map(String::as_str)
    }

    pub fn vendor_id(&self, name: &str) -> Option<u32> {
        self.vendors
            .iter()
            .find(|(_, vendor)| vendor.as_str() == name)
            .map(|(id, _)| *id)
    }

    /// Number of registered attribute types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Name of the entry resource of the built-in dictionary
pub const DEFAULT_DICTIONARY: &str = "radius.dict";

static DEFAULT: LazyLock<Arc<Dictionary>> = LazyLock::new(|| {
    let parser = DictionaryParser::new(EmbeddedResolver::builtin());
    match parser.parse(DEFAULT_DICTIONARY) {
        Ok(dictionary) => Arc::new(dictionary),
        Err(e) => {
            error!(error = %e, "Failed to load built-in dictionary");
            Arc::new(Dictionary::new())
        }
    }
});

/// Shared instance of the built-in dictionary, parsed on first use
pub fn default_dictionary() -> Arc<Dictionary> {
    Arc::clone(&DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_mapping() {
        assert_eq!(ValueKind::from_type_name("STRING"), ValueKind::String);
        assert_eq!(ValueKind::from_type_name("date"), ValueKind::Integer);
        assert_eq!(ValueKind::from_type_name("ipaddr"), ValueKind::Ipv4Addr);
        assert_eq!(ValueKind::from_type_name("IPv6Addr"), ValueKind::Ipv6Addr);
        assert_eq!(ValueKind::from_type_name("ipv6prefix"), ValueKind::Ipv6Prefix);
        assert_eq!(ValueKind::from_type_name("octets"), ValueKind::Octets);
        assert_eq!(ValueKind::from_type_name("abinary"), ValueKind::Octets);
    }

    #[test]
    fn test_lookup_by_code_and_name() {
        let mut dict = Dictionary::new();
        dict.add_attribute_type(AttributeType::new(1, "User-Name", ValueKind::String))
            .unwrap();
        dict.add_attribute_type(AttributeType::vendor(9, 1, "Cisco-AVPair", ValueKind::String))
            .unwrap();

        assert_eq!(dict.attribute_type(None, 1).unwrap().name, "User-Name");
        assert_eq!(dict.attribute_type(Some(9), 1).unwrap().name, "Cisco-AVPair");
        assert!(dict.attribute_type(Some(10), 1).is_none());
        assert_eq!(dict.attribute_type_by_name("Cisco-AVPair").unwrap().vendor_id, Some(9));
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut dict = Dictionary::new();
        dict.add_attribute_type(AttributeType::new(1, "User-Name", ValueKind::String))
            .unwrap();

        assert!(matches!(
            dict.add_attribute_type(AttributeType::new(1, "Other", ValueKind::String)),
            Err(DictionaryError::DuplicateCode { code: 1, .. })
        ));
        assert!(matches!(
            dict.add_attribute_type(AttributeType::new(2, "User-Name", ValueKind::String)),
            Err(DictionaryError::DuplicateName(_))
        ));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_vendor_specific_code_is_reserved() {
        let mut dict = Dictionary::new();
        dict.add_attribute_type(AttributeType::new(26, "Vendor-Specific", ValueKind::Octets))
            .unwrap();
        assert_eq!(dict.attribute_type(None, 26).unwrap().kind, ValueKind::VendorSpecific);
    }

    #[test]
    fn test_enumeration_values() {
        let mut dict = Dictionary::new();
        dict.add_attribute_type(AttributeType::new(6, "Service-Type", ValueKind::Integer))
            .unwrap();
        dict.add_enumeration_value("Service-Type", 2, "Framed-User").unwrap();
        assert!(dict.add_enumeration_value("Nope", 1, "X").is_err());

        let attr = dict.attribute_type_by_name("Service-Type").unwrap();
        assert_eq!(attr.enum_name(2), Some("Framed-User"));
        assert_eq!(attr.enum_value("Framed-User"), Some(2));
        assert_eq!(attr.format_value(&[0, 0, 0, 2]), "Framed-User");
        assert_eq!(attr.format_value(&[0, 0, 0, 9]), "9");
        assert_eq!(attr.parse_value("Framed-User").unwrap(), vec![0, 0, 0, 2]);
    }

    #[test]
    fn test_vendors() {
        let mut dict = Dictionary::new();
        dict.add_vendor(311, "Microsoft").unwrap();
        dict.add_vendor(311, "Microsoft").unwrap();
        assert!(dict.add_vendor(311, "Other").is_err());
        assert_eq!(dict.vendor_name(311), Some("Microsoft"));
        assert_eq!(dict.vendor_id("Microsoft"), Some(311));
    }

    #[test]
    fn test_default_dictionary() {
        let dict = default_dictionary();
        assert_eq!(dict.attribute_type(None, 1).unwrap().name, "User-Name");
        assert_eq!(dict.attribute_type(None, 26).unwrap().kind, ValueKind::VendorSpecific);
        assert_eq!(
            dict.attribute_type_by_name("Framed-IPv6-Prefix").unwrap().kind,
            ValueKind::Ipv6Prefix
        );
        // pulled in through $INCLUDE
        assert_eq!(dict.vendor_name(311), Some("Microsoft"));
        assert!(dict.attribute_type_by_name("WISPr-Location-Name").is_some());
    }
}
