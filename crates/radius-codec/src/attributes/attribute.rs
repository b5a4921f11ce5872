use super::AttributeValue;
use super::codes::VENDOR_SPECIFIC;
use crate::dictionary::{AttributeType, Dictionary};
use crate::packet::PacketError;
use std::net::{Ipv4Addr, Ipv6Addr};

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
/// Vendor sub-attributes use the same layout inside a Vendor-Specific
/// container and carry their vendor id in `vendor_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadiusAttribute {
    /// Vendor owning this attribute, `None` for standard attributes
    pub vendor_id: Option<u32>,
    /// Attribute type (1 byte)
    pub attr_type: u8,
    /// Raw attribute value
    pub value: Vec<u8>,
}

impl RadiusAttribute {
    /// Type and length fields
    pub const HEADER_LENGTH: usize = 2;
    /// Maximum attribute length (255 bytes including type and length)
    pub const MAX_LENGTH: usize = 255;

    pub fn new(attr_type: u8, value: impl Into<Vec<u8>>) -> Self {
        RadiusAttribute {
            vendor_id: None,
            attr_type,
            value: value.into(),
        }
    }

    /// Create a vendor sub-attribute
    pub fn vendor(vendor_id: u32, attr_type: u8, value: impl Into<Vec<u8>>) -> Self {
        RadiusAttribute {
            vendor_id: Some(vendor_id),
            ..Self::new(attr_type, value)
        }
    }

    /// Create a string attribute
    pub fn string(attr_type: u8, value: &str) -> Self {
        Self::new(attr_type, value.as_bytes())
    }

    /// Create an integer attribute (32-bit big-endian)
    pub fn integer(attr_type: u8, value: u32) -> Self {
        Self::new(attr_type, value.to_be_bytes())
    }

    pub fn ipv4(attr_type: u8, addr: Ipv4Addr) -> Self {
        Self::new(attr_type, addr.octets())
    }

    pub fn ipv6(attr_type: u8, addr: Ipv6Addr) -> Self {
        Self::new(attr_type, addr.octets())
    }

    /// Get the encoded length of this attribute
    pub fn encoded_length(&self) -> usize {
        Self::HEADER_LENGTH + self.value.len()
    }

    /// Append the type/length/value triple to `buffer`
    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), PacketError> {
        let length = self.encoded_length();
        if length > Self::MAX_LENGTH {
            return Err(PacketError::AttributeTooLong {
                attr_type: self.attr_type,
                length,
            });
        }

        buffer.push(self.attr_type);
        buffer.push(length as u8);
        buffer.extend_from_slice(&self.value);
        Ok(())
    }

    /// Dictionary definition of this attribute, if known
    pub fn attribute_type<'a>(&self, dictionary: &'a Dictionary) -> Option<&'a AttributeType> {
        dictionary.attribute_type(self.vendor_id, self.attr_type)
    }

    /// Typed view of the value; unknown attributes decode as octets
    pub fn value_in(&self, dictionary: &Dictionary) -> Result<AttributeValue, PacketError> {
        match self.attribute_type(dictionary) {
            Some(t) => t.kind.decode(&self.value),
            None => Ok(AttributeValue::Octets(self.value.clone())),
        }
    }

    /// Try to interpret value as a string
    pub fn as_string(&self) -> Result<String, PacketError> {
        String::from_utf8(self.value.clone())
            .map_err(|e| PacketError::InvalidValue(format!("Invalid UTF-8 string: {}", e)))
    }

    /// Try to interpret value as an integer (32-bit big-endian)
    pub fn as_integer(&self) -> Result<u32, PacketError> {
        let bytes: [u8; 4] = self.value.as_slice().try_into().map_err(|_| {
            PacketError::InvalidValue(format!(
                "Expected 4 bytes for integer, got {}",
                self.value.len()
            ))
        })?;
        Ok(u32::from_be_bytes(bytes))
    }
}

/// Vendor-Specific attribute (type 26) holding vendor sub-attributes
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Type (26)    |  Length       |            Vendor-Id
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///      Vendor-Id (cont)           | Vendor type   | Vendor length |  ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorSpecific {
    pub vendor_id: u32,
    pub attributes: Vec<RadiusAttribute>,
}

impl VendorSpecific {
    /// Type, length and vendor id fields
    pub const HEADER_LENGTH: usize = 6;

    pub fn new(vendor_id: u32) -> Self {
        VendorSpecific {
            vendor_id,
            attributes: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, mut attribute: RadiusAttribute) {
        attribute.vendor_id = Some(self.vendor_id);
        self.attributes.push(attribute);
    }

    pub fn encoded_length(&self) -> usize {
        Self::HEADER_LENGTH
            + self
                .attributes
                .iter()
                .map(RadiusAttribute::encoded_length)
                .sum::<usize>()
    }

    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), PacketError> {
        let length = self.encoded_length();
        if length > RadiusAttribute::MAX_LENGTH {
            return Err(PacketError::AttributeTooLong {
                attr_type: VENDOR_SPECIFIC,
                length,
            });
        }

        buffer.push(VENDOR_SPECIFIC);
        buffer.push(length as u8);
        buffer.extend_from_slice(&self.vendor_id.to_be_bytes());
        for attr in &self.attributes {
            attr.encode_into(buffer)?;
        }
        Ok(())
    }

    fn decode_value(value: &[u8]) -> Result<Self, PacketError> {
        let Some((id, mut rest)) = value.split_first_chunk::<4>() else {
            return Err(PacketError::MalformedAttribute(format!(
                "Vendor-Specific attribute too short: {} bytes",
                value.len()
            )));
        };

        let vendor_id = u32::from_be_bytes(*id);
        let mut attributes = Vec::new();
        while !rest.is_empty() {
            let (attr_type, sub_value, remaining) = split_tlv(rest)?;
            attributes.push(RadiusAttribute::vendor(vendor_id, attr_type, sub_value));
            rest = remaining;
        }

        Ok(VendorSpecific {
            vendor_id,
            attributes,
        })
    }
}

/// An attribute as it appears in a packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Standard(RadiusAttribute),
    VendorSpecific(VendorSpecific),
}

impl Attribute {
    pub fn encoded_length(&self) -> usize {
        match self {
            Attribute::Standard(attr) => attr.encoded_length(),
            Attribute::VendorSpecific(vsa) => vsa.encoded_length(),
        }
    }

    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), PacketError> {
        match self {
            Attribute::Standard(attr) => attr.encode_into(buffer),
            Attribute::VendorSpecific(vsa) => vsa.encode_into(buffer),
        }
    }

    /// Wire type code
    pub fn attr_type(&self) -> u8 {
        match self {
            Attribute::Standard(attr) => attr.attr_type,
            Attribute::VendorSpecific(_) => VENDOR_SPECIFIC,
        }
    }
}

impl From<RadiusAttribute> for Attribute {
    fn from(attr: RadiusAttribute) -> Self {
        match attr.vendor_id {
            Some(vendor_id) => Attribute::VendorSpecific(VendorSpecific {
                vendor_id,
                attributes: vec![attr],
            }),
            None => Attribute::Standard(attr),
        }
    }
}

impl From<VendorSpecific> for Attribute {
    fn from(vsa: VendorSpecific) -> Self {
        Attribute::VendorSpecific(vsa)
    }
}

/// Split one type/length/value triple off the front of `data`
fn split_tlv(data: &[u8]) -> Result<(u8, &[u8], &[u8]), PacketError> {
    if data.len() < RadiusAttribute::HEADER_LENGTH {
        return Err(PacketError::MalformedAttribute(format!(
            "Attribute data too short: {} bytes",
            data.len()
        )));
    }

    let length = data[1] as usize;
    if length < RadiusAttribute::HEADER_LENGTH {
        return Err(PacketError::MalformedAttribute(format!(
            "Invalid attribute length: {}",
            length
        )));
    }
    if data.len() < length {
        return Err(PacketError::MalformedAttribute(format!(
            "Insufficient data for attribute {}: expected {}, got {}",
            data[0],
            length,
            data.len()
        )));
    }

    Ok((data[0], &data[2..length], &data[length..]))
}

/// Decode a back-to-back attribute list
///
/// Any attribute whose length runs past the buffer fails the whole list.
pub fn decode_attributes(data: &[u8]) -> Result<Vec<Attribute>, PacketError> {
    let mut attributes = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        let (attr_type, value, remaining) = split_tlv(rest)?;
        let attr = if attr_type == VENDOR_SPECIFIC {
            Attribute::VendorSpecific(VendorSpecific::decode_value(value)?)
        } else {
            Attribute::Standard(RadiusAttribute::new(attr_type, value))
        };
        attributes.push(attr);
        rest = remaining;
    }

    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(attr: &Attribute) -> Vec<u8> {
        let mut buffer = Vec::new();
        attr.encode_into(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_string_attribute() {
        let attr = RadiusAttribute::string(1, "testuser");
        assert_eq!(attr.attr_type, 1);
        assert_eq!(attr.as_string().unwrap(), "testuser");
        assert_eq!(attr.encoded_length(), 10);
    }

    #[test]
    fn test_integer_attribute() {
        let attr = RadiusAttribute::integer(6, 1234);
        assert_eq!(attr.as_integer().unwrap(), 1234);
        assert!(RadiusAttribute::new(6, vec![1, 2]).as_integer().is_err());
    }

    #[test]
    fn test_wire_layout() {
        let bytes = encode(&RadiusAttribute::string(1, "bob").into());
        assert_eq!(bytes, vec![1, 5, b'b', b'o', b'b']);
    }

    #[test]
    fn test_vendor_specific_layout() {
        let mut vsa = VendorSpecific::new(14122);
        vsa.add_attribute(RadiusAttribute::string(2, "lobby"));
        vsa.add_attribute(RadiusAttribute::integer(7, 1000));

        let bytes = encode(&vsa.clone().into());
        assert_eq!(bytes[0], 26);
        assert_eq!(bytes[1] as usize, bytes.len());
        assert_eq!(&bytes[2..6], &14122u32.to_be_bytes());
        assert_eq!(&bytes[6..9], &[2, 7, b'l']);

        let decoded = decode_attributes(&bytes).unwrap();
        assert_eq!(decoded, vec![Attribute::VendorSpecific(vsa)]);
    }

    #[test]
    fn test_vendor_attribute_conversion() {
        let attr: Attribute = RadiusAttribute::vendor(9, 1, "shell:priv-lvl=15").into();
        match attr {
            Attribute::VendorSpecific(vsa) => {
                assert_eq!(vsa.vendor_id, 9);
                assert_eq!(vsa.attributes.len(), 1);
            }
            other => panic!("expected vendor-specific, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_too_long() {
        let attr: Attribute = RadiusAttribute::new(33, vec![0u8; 254]).into();
        let mut buffer = Vec::new();
        assert!(matches!(
            attr.encode_into(&mut buffer),
            Err(PacketError::AttributeTooLong { attr_type: 33, length: 256 })
        ));

        let max: Attribute = RadiusAttribute::new(33, vec![0u8; 253]).into();
        assert_eq!(encode(&max).len(), 255);
    }

    #[test]
    fn test_truncated_attribute_fails() {
        // declares 10 bytes, only 4 present
        assert!(decode_attributes(&[1, 10, b'a', b'b']).is_err());
        assert!(decode_attributes(&[1]).is_err());
        assert!(decode_attributes(&[1, 1, 0]).is_err());
        // vendor id cut short
        assert!(decode_attributes(&[26, 5, 0, 0, 1]).is_err());
        // sub-attribute overruns its container
        assert!(decode_attributes(&[26, 9, 0, 0, 0, 9, 1, 5, b'x']).is_err());
    }

    #[test]
    fn test_typed_view() {
        let dict = crate::dictionary::default_dictionary();
        let attr = RadiusAttribute::ipv4(4, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(
            attr.value_in(&dict).unwrap(),
            AttributeValue::Ipv4(Ipv4Addr::new(192, 168, 1, 1))
        );
        let unknown = RadiusAttribute::new(250, vec![1, 2]);
        assert_eq!(unknown.value_in(&dict).unwrap(), AttributeValue::Octets(vec![1, 2]));
    }
}
