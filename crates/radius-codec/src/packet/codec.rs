//! Datagram encoding and decoding
//!
//! Requests are decoded with only the shared secret. Responses are
//! decoded against the request they answer, so a forged or misrouted
//! response is rejected before any attribute is looked at.

use super::{AccessRequest, AccountingRequest, Code, PacketError, RadiusPacket};
use crate::attributes::{Attribute, decode_attributes};
use crate::auth::{
    authenticators_match, calculate_accounting_request_authenticator,
    calculate_response_authenticator,
};
use crate::dictionary::Dictionary;
use std::sync::Arc;
use tracing::trace;

/// A packet, specialised by code where the encoding rules differ
#[derive(Debug, Clone)]
pub enum Packet {
    AccessRequest(AccessRequest),
    AccountingRequest(AccountingRequest),
    Generic(RadiusPacket),
}

impl Packet {
    pub fn base(&self) -> &RadiusPacket {
        match self {
            Packet::AccessRequest(req) => req.packet(),
            Packet::AccountingRequest(req) => req.packet(),
            Packet::Generic(packet) => packet,
        }
    }

    pub fn base_mut(&mut self) -> &mut RadiusPacket {
        match self {
            Packet::AccessRequest(req) => req.packet_mut(),
            Packet::AccountingRequest(req) => req.packet_mut(),
            Packet::Generic(packet) => packet,
        }
    }

    pub fn into_base(self) -> RadiusPacket {
        match self {
            Packet::AccessRequest(req) => req.into_packet(),
            Packet::AccountingRequest(req) => req.into_packet(),
            Packet::Generic(packet) => packet,
        }
    }

    pub fn code(&self) -> Code {
        self.base().code()
    }

    pub fn identifier(&self) -> u8 {
        self.base().identifier()
    }

    pub fn authenticator(&self) -> Option<&[u8; 16]> {
        self.base().authenticator()
    }

    pub fn attributes(&self) -> &[Attribute] {
        self.base().attributes()
    }

    pub fn as_access_request(&self) -> Option<&AccessRequest> {
        match self {
            Packet::AccessRequest(req) => Some(req),
            _ => None,
        }
    }

    pub fn as_accounting_request(&self) -> Option<&AccountingRequest> {
        match self {
            Packet::AccountingRequest(req) => Some(req),
            _ => None,
        }
    }

    /// Copy of this packet with its request authenticator and hidden attributes filled in
    pub fn encode_request(&self, secret: &[u8]) -> Result<Packet, PacketError> {
        Ok(match self {
            Packet::AccessRequest(req) => Packet::AccessRequest(req.encode_request(secret)?),
            Packet::AccountingRequest(req) => {
                Packet::AccountingRequest(req.encode_request(secret)?)
            }
            Packet::Generic(packet) => Packet::Generic(packet.encode_request()?),
        })
    }

    /// Copy of this packet signed as a response to `request_authenticator`
    pub fn encode_response(
        &self,
        secret: &[u8],
        request_authenticator: &[u8; 16],
    ) -> Result<Packet, PacketError> {
        Ok(Packet::Generic(
            self.base().encode_response(secret, request_authenticator)?,
        ))
    }
}

impl From<AccessRequest> for Packet {
    fn from(req: AccessRequest) -> Self {
        Packet::AccessRequest(req)
    }
}

impl From<AccountingRequest> for Packet {
    fn from(req: AccountingRequest) -> Self {
        Packet::AccountingRequest(req)
    }
}

impl From<RadiusPacket> for Packet {
    fn from(packet: RadiusPacket) -> Self {
        create_from_base(packet)
    }
}

fn create_from_base(packet: RadiusPacket) -> Packet {
    match packet.code() {
        Code::AccessRequest => Packet::AccessRequest(AccessRequest::from_packet(packet)),
        Code::AccountingRequest => Packet::AccountingRequest(AccountingRequest::from_packet(packet)),
        _ => Packet::Generic(packet),
    }
}

/// Build the variant matching `code`
///
/// Codes without special handling (including CoA and Disconnect) become
/// [`Packet::Generic`].
pub fn create_radius_packet(
    dictionary: Arc<Dictionary>,
    code: u8,
    identifier: u8,
    authenticator: Option<[u8; 16]>,
    attributes: Vec<Attribute>,
) -> Packet {
    create_from_base(RadiusPacket::with_attributes(
        dictionary,
        Code::from_u8(code),
        identifier,
        authenticator,
        attributes,
    ))
}

/// Encode a packet that already carries its authenticator
pub fn to_datagram(packet: &Packet) -> Result<Vec<u8>, PacketError> {
    packet.base().encode()
}

struct Frame<'a> {
    code: u8,
    identifier: u8,
    authenticator: [u8; 16],
    attributes: Vec<Attribute>,
    bytes: &'a [u8],
}

impl Frame<'_> {
    fn header(&self) -> &[u8] {
        &self.bytes[..4]
    }

    fn attribute_bytes(&self) -> &[u8] {
        &self.bytes[RadiusPacket::HEADER_LENGTH..]
    }

    fn into_packet(self, dictionary: &Arc<Dictionary>) -> Packet {
        create_radius_packet(
            Arc::clone(dictionary),
            self.code,
            self.identifier,
            Some(self.authenticator),
            self.attributes,
        )
    }
}

/// Validate the header and split out the attribute list
///
/// Bytes past the declared length are ignored (RFC 2865 Section 3).
fn read_frame(data: &[u8]) -> Result<Frame<'_>, PacketError> {
    if data.len() < RadiusPacket::HEADER_LENGTH {
        return Err(PacketError::InvalidLength(data.len()));
    }

    let length = u16::from_be_bytes([data[2], data[3]]) as usize;
    if !(RadiusPacket::HEADER_LENGTH..=RadiusPacket::MAX_PACKET_SIZE).contains(&length) {
        return Err(PacketError::InvalidLength(length));
    }
    if data.len() < length {
        return Err(PacketError::InvalidLength(data.len()));
    }

    let bytes = &data[..length];
    let mut authenticator = [0u8; 16];
    authenticator.copy_from_slice(&bytes[4..RadiusPacket::HEADER_LENGTH]);
    let attributes = decode_attributes(&bytes[RadiusPacket::HEADER_LENGTH..])?;

    Ok(Frame {
        code: bytes[0],
        identifier: bytes[1],
        authenticator,
        attributes,
        bytes,
    })
}

/// Decode a request received from a client
///
/// Access-Request passwords are recovered with `secret`; Accounting-Request
/// authenticators are verified against it.
pub fn from_request_datagram(
    dictionary: &Arc<Dictionary>,
    data: &[u8],
    secret: &[u8],
) -> Result<Packet, PacketError> {
    let frame = read_frame(data)?;

    if frame.code == Code::AccountingRequest.as_u8() {
        let expected =
            calculate_accounting_request_authenticator(frame.header(), frame.attribute_bytes(), secret);
        if !authenticators_match(&expected, &frame.authenticator) {
            return Err(PacketError::AuthenticatorMismatch("Accounting-Request"));
        }
    }

    let mut packet = frame.into_packet(dictionary);
    if let Packet::AccessRequest(req) = &mut packet {
        req.decode_request_attributes(secret)?;
    }

    trace!(
        code = %packet.code(),
        identifier = packet.identifier(),
        attributes = packet.attributes().len(),
        "Decoded request datagram"
    );
    Ok(packet)
}

/// Decode a response to `request`, verifying identifier and authenticator
pub fn from_response_datagram(
    dictionary: &Arc<Dictionary>,
    data: &[u8],
    secret: &[u8],
    request: &Packet,
) -> Result<Packet, PacketError> {
    let frame = read_frame(data)?;

    if frame.identifier != request.identifier() {
        return Err(PacketError::IdentifierMismatch {
            request: request.identifier(),
            response: frame.identifier,
        });
    }

    let request_authenticator = request
        .authenticator()
        .ok_or(PacketError::MissingAuthenticator)?;
    let expected = calculate_response_authenticator(
        frame.header(),
        request_authenticator,
        frame.attribute_bytes(),
        secret,
    );
    if !authenticators_match(&expected, &frame.authenticator) {
        return Err(PacketError::AuthenticatorMismatch("response"));
    }

    let packet = frame.into_packet(dictionary);
    trace!(
        code = %packet.code(),
        identifier = packet.identifier(),
        "Decoded response datagram"
    );
    Ok(packet)
}
