use super::Code;
use crate::attributes::{Attribute, RadiusAttribute, VendorSpecific};
use crate::auth::calculate_response_authenticator;
use crate::dictionary::{Dictionary, ValueKind};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("Invalid packet length: {0}")]
    InvalidLength(usize),
    #[error("Packet too long: {0} bytes (maximum is 4096)")]
    PacketTooLong(usize),
    #[error("Attribute {attr_type} too long: {length} bytes (maximum is 255)")]
    AttributeTooLong { attr_type: u8, length: usize },
    #[error("Malformed attribute: {0}")]
    MalformedAttribute(String),
    #[error("Invalid attribute value: {0}")]
    InvalidValue(String),
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),
    #[error("Packet has no authenticator")]
    MissingAuthenticator,
    #[error("User-Password too long: {0} bytes (maximum is 128)")]
    PasswordTooLong(usize),
    #[error("Invalid User-Password: {0}")]
    InvalidPassword(String),
    #[error("Response identifier {response} does not match request identifier {request}")]
    IdentifierMismatch { request: u8, response: u8 },
    #[error("Authenticator mismatch in {0}")]
    AuthenticatorMismatch(&'static str),
}

impl PacketError {
    /// True when the packet was well formed but failed a shared-secret check
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            PacketError::AuthenticatorMismatch(_) | PacketError::IdentifierMismatch { .. }
        )
    }
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
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Attributes ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-
/// ```
///
/// The authenticator stays `None` until the packet has been encoded for
/// sending or was read off the wire. Encoding never mutates a packet; it
/// returns a new one carrying the computed authenticator.
#[derive(Debug, Clone)]
pub struct RadiusPacket {
    dictionary: Arc<Dictionary>,
    code: Code,
    identifier: u8,
    authenticator: Option<[u8; 16]>,
    attributes: Vec<Attribute>,
}

impl RadiusPacket {
    /// Code, identifier, length and authenticator
    pub const HEADER_LENGTH: usize = 20;
    /// Maximum RADIUS packet size (4096 bytes as per RFC 2865)
    pub const MAX_PACKET_SIZE: usize = 4096;

    pub fn new(dictionary: Arc<Dictionary>, code: Code, identifier: u8) -> Self {
        Self::with_attributes(dictionary, code, identifier, None, Vec::new())
    }

    pub fn with_attributes(
        dictionary: Arc<Dictionary>,
        code: Code,
        identifier: u8,
        authenticator: Option<[u8; 16]>,
        attributes: Vec<Attribute>,
    ) -> Self {
        RadiusPacket {
            dictionary,
            code,
            identifier,
            authenticator,
            attributes,
        }
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    pub fn authenticator(&self) -> Option<&[u8; 16]> {
        self.authenticator.as_ref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub(crate) fn with_authenticator(mut self, authenticator: [u8; 16]) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Append an attribute
    ///
    /// Vendor attributes join the last Vendor-Specific container of their
    /// vendor while it has room, otherwise a new container is started.
    pub fn add_attribute(&mut self, attribute: RadiusAttribute) {
        let Some(vendor_id) = attribute.vendor_id else {
            self.attributes.push(Attribute::Standard(attribute));
            return;
        };

        let needed = attribute.encoded_length();
        let container = self.attributes.iter_mut().rev().find_map(|attr| match attr {
            Attribute::VendorSpecific(vsa)
                if vsa.vendor_id == vendor_id
                    && vsa.encoded_length() + needed <= RadiusAttribute::MAX_LENGTH =>
            {
                Some(vsa)
            }
            _ => None,
        });

        match container {
            Some(vsa) => vsa.add_attribute(attribute),
            None => self.attributes.push(attribute.into()),
        }
    }

    /// Append a prebuilt Vendor-Specific container as-is
    pub fn add_vendor_specific(&mut self, vsa: VendorSpecific) {
        self.attributes.push(Attribute::VendorSpecific(vsa));
    }

    /// Append an attribute by dictionary name and textual value
    pub fn add_attribute_value(&mut self, name: &str, value: &str) -> Result<(), PacketError> {
        let attr_type = self
            .dictionary
            .attribute_type_by_name(name)
            .ok_or_else(|| PacketError::UnknownAttribute(name.to_string()))?;
        if attr_type.kind == ValueKind::VendorSpecific {
            return Err(PacketError::InvalidValue(format!(
                "{} must be built from vendor sub-attributes",
                name
            )));
        }

        let attribute = RadiusAttribute {
            vendor_id: attr_type.vendor_id,
            attr_type: attr_type.code,
            value: attr_type.parse_value(value)?,
        };
        self.add_attribute(attribute);
        Ok(())
    }

    /// Remove every top-level attribute with the given type code
    pub fn remove_attributes(&mut self, attr_type: u8) {
        self.attributes.retain(|attr| attr.attr_type() != attr_type);
    }

    /// First standard attribute with the given type code
    pub fn attribute(&self, attr_type: u8) -> Option<&RadiusAttribute> {
        self.attributes_of_type(attr_type).next()
    }

    /// Standard attributes with the given type code, in packet order
    pub fn attributes_of_type(&self, attr_type: u8) -> impl Iterator<Item = &RadiusAttribute> {
        self.attributes.iter().filter_map(move |attr| match attr {
            Attribute::Standard(a) if a.attr_type == attr_type => Some(a),
            _ => None,
        })
    }

    /// Sub-attributes of every Vendor-Specific container for `vendor_id`
    pub fn vendor_attributes(&self, vendor_id: u32) -> impl Iterator<Item = &RadiusAttribute> {
        self.attributes
            .iter()
            .filter_map(move |attr| match attr {
                Attribute::VendorSpecific(vsa) if vsa.vendor_id == vendor_id => {
                    Some(vsa.attributes.iter())
                }
                _ => None,
            })
            .flatten()
    }

    /// First attribute matching a vendor (or `None` for standard) and type code
    pub fn find_attribute(&self, vendor_id: Option<u32>, attr_type: u8) -> Option<&RadiusAttribute> {
        match vendor_id {
            None => self.attribute(attr_type),
            Some(vendor_id) => self
                .vendor_attributes(vendor_id)
                .find(|attr| attr.attr_type == attr_type),
        }
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&RadiusAttribute> {
        let attr_type = self.dictionary.attribute_type_by_name(name)?;
        self.find_attribute(attr_type.vendor_id, attr_type.code)
    }

    /// Textual value of the first attribute with the given dictionary name
    pub fn attribute_value(&self, name: &str) -> Option<String> {
        let attr_type = self.dictionary.attribute_type_by_name(name)?;
        self.find_attribute(attr_type.vendor_id, attr_type.code)
            .map(|attr| attr_type.format_value(&attr.value))
    }

    /// Size of the packet on the wire
    pub fn encoded_length(&self) -> usize {
        Self::HEADER_LENGTH
            + self
                .attributes
                .iter()
                .map(Attribute::encoded_length)
                .sum::<usize>()
    }

    /// Serialize header and attributes around the given authenticator
    pub(crate) fn frame(&self, authenticator: &[u8; 16]) -> Result<Vec<u8>, PacketError> {
        let total_length = self.encoded_length();
        if total_length > Self::MAX_PACKET_SIZE {
            return Err(PacketError::PacketTooLong(total_length));
        }

        let mut buffer = Vec::with_capacity(total_length);
        buffer.push(self.code.as_u8());
        buffer.push(self.identifier);
        buffer.extend_from_slice(&(total_length as u16).to_be_bytes());
        buffer.extend_from_slice(authenticator);
        for attr in &self.attributes {
            attr.encode_into(&mut buffer)?;
        }

        Ok(buffer)
    }

    /// Encode packet to bytes
    ///
    /// The packet must already carry its authenticator.
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let authenticator = self
            .authenticator
            .as_ref()
            .ok_or(PacketError::MissingAuthenticator)?;
        self.frame(authenticator)
    }

    /// Copy of this packet carrying a fresh random authenticator when it has none
    pub(crate) fn encode_request(&self) -> Result<Self, PacketError> {
        let authenticator = self
            .authenticator
            .unwrap_or_else(crate::auth::generate_request_authenticator);
        let packet = self.clone().with_authenticator(authenticator);
        packet.frame(&authenticator)?;
        Ok(packet)
    }

    /// Copy of this packet carrying the Response Authenticator (RFC 2865 Section 3)
    pub fn encode_response(
        &self,
        secret: &[u8],
        request_authenticator: &[u8; 16],
    ) -> Result<Self, PacketError> {
        let bytes = self.frame(&[0u8; 16])?;
        let authenticator = calculate_response_authenticator(
            &bytes[..4],
            request_authenticator,
            &bytes[Self::HEADER_LENGTH..],
            secret,
        );
        Ok(self.clone().with_authenticator(authenticator))
    }
}
