//! Typed attribute values
//!
//! Conversions between raw attribute bytes and their typed form are pure
//! functions of the [`ValueKind`] recorded in the dictionary.

use crate::dictionary::ValueKind;
use crate::packet::PacketError;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Decoded attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Integer(u32),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Ipv6Prefix { prefix: Ipv6Addr, length: u8 },
    Octets(Vec<u8>),
}

impl AttributeValue {
    /// Wire encoding of the value (without the attribute header)
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            AttributeValue::String(s) => s.as_bytes().to_vec(),
            AttributeValue::Integer(v) => v.to_be_bytes().to_vec(),
            AttributeValue::Ipv4(addr) => addr.octets().to_vec(),
            AttributeValue::Ipv6(addr) => addr.octets().to_vec(),
            AttributeValue::Ipv6Prefix { prefix, length } => {
                let significant = (*length as usize).div_ceil(8);
                let mut bytes = Vec::with_capacity(2 + significant);
                bytes.push(0);
                bytes.push(*length);
                bytes.extend_from_slice(&prefix.octets()[..significant]);
                bytes
            }
            AttributeValue::Octets(bytes) => bytes.clone(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{}", s),
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Ipv4(addr) => write!(f, "{}", addr),
            AttributeValue::Ipv6(addr) => write!(f, "{}", addr),
            AttributeValue::Ipv6Prefix { prefix, length } => write!(f, "{}/{}", prefix, length),
            AttributeValue::Octets(bytes) => {
                write!(f, "0x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N], PacketError> {
    bytes.try_into().map_err(|_| {
        PacketError::InvalidValue(format!("Expected {} bytes for {}, got {}", N, what, bytes.len()))
    })
}

fn parse_hex(text: &str) -> Result<Vec<u8>, PacketError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if !digits.is_ascii() || digits.len() % 2 != 0 {
        return Err(PacketError::InvalidValue(format!("Invalid hex value: {}", text)));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| PacketError::InvalidValue(format!("Invalid hex value: {}", text)))
        })
        .collect()
}

impl ValueKind {
    /// Interpret raw attribute bytes
    pub fn decode(self, bytes: &[u8]) -> Result<AttributeValue, PacketError> {
        match self {
            ValueKind::String => String::from_utf8(bytes.to_vec())
                .map(AttributeValue::String)
                .map_err(|e| PacketError::InvalidValue(format!("Invalid UTF-8 string: {}", e))),
            ValueKind::Integer => Ok(AttributeValue::Integer(u32::from_be_bytes(fixed(
                bytes, "integer",
            )?))),
            ValueKind::Ipv4Addr => Ok(AttributeValue::Ipv4(Ipv4Addr::from(fixed::<4>(bytes, "IPv4")?))),
            ValueKind::Ipv6Addr => Ok(AttributeValue::Ipv6(Ipv6Addr::from(fixed::<16>(bytes, "IPv6")?))),
            ValueKind::Ipv6Prefix => {
                if !(2..=18).contains(&bytes.len()) {
                    return Err(PacketError::InvalidValue(format!(
                        "Invalid IPv6 prefix length: {} bytes",
                        bytes.len()
                    )));
                }
                let length = bytes[1];
                if length > 128 {
                    return Err(PacketError::InvalidValue(format!(
                        "IPv6 prefix length {} exceeds 128",
                        length
                    )));
                }
                let mut octets = [0u8; 16];
                octets[..bytes.len() - 2].copy_from_slice(&bytes[2..]);
                Ok(AttributeValue::Ipv6Prefix {
                    prefix: Ipv6Addr::from(octets),
                    length,
                })
            }
            ValueKind::Octets | ValueKind::VendorSpecific => Ok(AttributeValue::Octets(bytes.to_vec())),
        }
    }

    /// Parse the textual form of a value into raw attribute bytes
    pub fn parse(self, text: &str) -> Result<Vec<u8>, PacketError> {
        let invalid = |what: &str| PacketError::InvalidValue(format!("Invalid {}: {}", what, text));
        let value = match self {
            ValueKind::String => AttributeValue::String(text.to_string()),
            ValueKind::Integer => AttributeValue::Integer(text.parse().map_err(|_| invalid("integer"))?),
            ValueKind::Ipv4Addr => AttributeValue::Ipv4(text.parse().map_err(|_| invalid("IPv4 address"))?),
            ValueKind::Ipv6Addr => AttributeValue::Ipv6(text.parse().map_err(|_| invalid("IPv6 address"))?),
            ValueKind::Ipv6Prefix => {
                let (addr, len) = text.split_once('/').ok_or_else(|| invalid("IPv6 prefix"))?;
                let length: u8 = len.parse().map_err(|_| invalid("IPv6 prefix"))?;
                if length > 128 {
                    return Err(invalid("IPv6 prefix"));
                }
                AttributeValue::Ipv6Prefix {
                    prefix: addr.parse().map_err(|_| invalid("IPv6 prefix"))?,
                    length,
                }
            }
            ValueKind::Octets | ValueKind::VendorSpecific => AttributeValue::Octets(parse_hex(text)?),
        };
        Ok(value.to_bytes())
    }
}
