//! Request packet variants with their own encode/decode behaviour
//!
//! Access-Request hides the User-Password (or computes a CHAP response)
//! against the Request Authenticator. Accounting-Request carries a
//! deterministic authenticator derived from the shared secret (RFC 2866
//! Section 3).

use super::{Code, PacketError, RadiusPacket};
use crate::attributes::RadiusAttribute;
use crate::attributes::codes::{
    ACCT_STATUS_TYPE, CHAP_CHALLENGE, CHAP_PASSWORD, USER_NAME, USER_PASSWORD,
};
use crate::auth::{
    authenticators_match, calculate_accounting_request_authenticator, compute_chap_response,
    decrypt_user_password, encrypt_user_password, generate_request_authenticator,
};
use crate::dictionary::Dictionary;
use std::borrow::Cow;
use std::sync::Arc;

/// How an Access-Request carries the user's password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthProtocol {
    /// User-Password hidden with the shared secret (RFC 2865 Section 5.2)
    #[default]
    Pap,
    /// CHAP-Password and CHAP-Challenge (RFC 2865 Section 5.3)
    Chap,
}

/// CHAP-Password contents plus the challenge it answers
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChapResponse {
    ident: u8,
    response: [u8; 16],
    challenge: Vec<u8>,
}

impl ChapResponse {
    fn from_attribute(value: &[u8], challenge: Vec<u8>) -> Result<Self, PacketError> {
        let Some((&ident, response)) = value.split_first() else {
            return Err(PacketError::MalformedAttribute(
                "CHAP-Password is empty".to_string(),
            ));
        };
        let response: [u8; 16] = response.try_into().map_err(|_| {
            PacketError::MalformedAttribute(format!(
                "CHAP-Password must be 17 bytes, got {}",
                value.len()
            ))
        })?;
        Ok(ChapResponse {
            ident,
            response,
            challenge,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(17);
        bytes.push(self.ident);
        bytes.extend_from_slice(&self.response);
        bytes
    }
}

/// Access-Request (code 1)
///
/// The plaintext password lives beside the packet and is only written into
/// the attribute list when the request is encoded for sending.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    packet: RadiusPacket,
    protocol: AuthProtocol,
    password: Option<Vec<u8>>,
    chap: Option<ChapResponse>,
}

impl AccessRequest {
    pub fn new(dictionary: Arc<Dictionary>, identifier: u8, user_name: &str, password: &str) -> Self {
        let mut packet = RadiusPacket::new(dictionary, Code::AccessRequest, identifier);
        packet.add_attribute(RadiusAttribute::string(USER_NAME, user_name));
        AccessRequest {
            packet,
            protocol: AuthProtocol::Pap,
            password: Some(password.as_bytes().to_vec()),
            chap: None,
        }
    }

    pub(crate) fn from_packet(packet: RadiusPacket) -> Self {
        AccessRequest {
            packet,
            protocol: AuthProtocol::Pap,
            password: None,
            chap: None,
        }
    }

    pub fn with_protocol(mut self, protocol: AuthProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn packet(&self) -> &RadiusPacket {
        &self.packet
    }

    pub fn packet_mut(&mut self) -> &mut RadiusPacket {
        &mut self.packet
    }

    pub fn into_packet(self) -> RadiusPacket {
        self.packet
    }

    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    pub fn user_name(&self) -> Option<String> {
        self.packet
            .attribute(USER_NAME)
            .and_then(|attr| attr.as_string().ok())
    }

    /// Plaintext password bytes, known for locally built requests and decoded PAP requests
    pub fn user_password_bytes(&self) -> Option<&[u8]> {
        self.password.as_deref()
    }

    /// Plaintext password as text; invalid UTF-8 is replaced
    pub fn user_password(&self) -> Option<Cow<'_, str>> {
        self.password.as_deref().map(String::from_utf8_lossy)
    }

    pub fn set_user_password(&mut self, password: impl AsRef<[u8]>) {
        self.password = Some(password.as_ref().to_vec());
    }

    /// Check a candidate password against whatever credentials the request carries
    pub fn verify_password(&self, candidate: impl AsRef<[u8]>) -> bool {
        let candidate = candidate.as_ref();
        match (&self.chap, &self.password) {
            (Some(chap), _) => {
                let expected = compute_chap_response(chap.ident, candidate, &chap.challenge);
                authenticators_match(&expected, &chap.response)
            }
            (None, Some(password)) => password.as_slice() == candidate,
            (None, None) => false,
        }
    }

    /// Copy of this request ready for the wire
    pub(crate) fn encode_request(&self, secret: &[u8]) -> Result<Self, PacketError> {
        let authenticator = self
            .packet
            .authenticator()
            .copied()
            .unwrap_or_else(generate_request_authenticator);
        let mut packet = self.packet.clone();
        let mut chap = self.chap.clone();

        if let Some(password) = &self.password {
            packet.remove_attributes(USER_PASSWORD);
            packet.remove_attributes(CHAP_PASSWORD);
            packet.remove_attributes(CHAP_CHALLENGE);

            match self.protocol {
                AuthProtocol::Pap => {
                    let hidden = encrypt_user_password(password, secret, &authenticator)?;
                    packet.add_attribute(RadiusAttribute::new(USER_PASSWORD, hidden));
                    chap = None;
                }
                AuthProtocol::Chap => {
                    let challenge = generate_request_authenticator().to_vec();
                    let ident: u8 = rand::random();
                    let response = ChapResponse {
                        ident,
                        response: compute_chap_response(ident, password, &challenge),
                        challenge,
                    };
                    packet.add_attribute(RadiusAttribute::new(CHAP_PASSWORD, response.to_bytes()));
                    packet.add_attribute(RadiusAttribute::new(
                        CHAP_CHALLENGE,
                        response.challenge.clone(),
                    ));
                    chap = Some(response);
                }
            }
        }

        let packet = packet.with_authenticator(authenticator);
        packet.frame(&authenticator)?;
        Ok(AccessRequest {
            packet,
            protocol: self.protocol,
            password: self.password.clone(),
            chap,
        })
    }

    /// Recover credentials from a request read off the wire
    pub(crate) fn decode_request_attributes(&mut self, secret: &[u8]) -> Result<(), PacketError> {
        let authenticator = *self
            .packet
            .authenticator()
            .ok_or(PacketError::MissingAuthenticator)?;

        if let Some(attr) = self.packet.attribute(USER_PASSWORD) {
            self.password = Some(decrypt_user_password(&attr.value, secret, &authenticator)?);
            self.protocol = AuthProtocol::Pap;
        } else if let Some(attr) = self.packet.attribute(CHAP_PASSWORD) {
            // RFC 2865 5.3: without CHAP-Challenge the Request Authenticator is the challenge
            let challenge = self
                .packet
                .attribute(CHAP_CHALLENGE)
                .map(|c| c.value.clone())
                .unwrap_or_else(|| authenticator.to_vec());
            self.chap = Some(ChapResponse::from_attribute(&attr.value, challenge)?);
            self.protocol = AuthProtocol::Chap;
        }

        Ok(())
    }
}

/// Accounting Status-Type values (RFC 2866 Section 5.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AcctStatusType {
    Start = 1,
    Stop = 2,
    InterimUpdate = 3,
    AccountingOn = 7,
    AccountingOff = 8,
}

impl AcctStatusType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(AcctStatusType::Start),
            2 => Some(AcctStatusType::Stop),
            3 => Some(AcctStatusType::InterimUpdate),
            7 => Some(AcctStatusType::AccountingOn),
            8 => Some(AcctStatusType::AccountingOff),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Accounting-Request (code 4)
#[derive(Debug, Clone)]
pub struct AccountingRequest {
    packet: RadiusPacket,
}

impl AccountingRequest {
    pub fn new(
        dictionary: Arc<Dictionary>,
        identifier: u8,
        user_name: &str,
        status: AcctStatusType,
    ) -> Self {
        let mut packet = RadiusPacket::new(dictionary, Code::AccountingRequest, identifier);
        packet.add_attribute(RadiusAttribute::string(USER_NAME, user_name));
        packet.add_attribute(RadiusAttribute::integer(ACCT_STATUS_TYPE, status.as_u32()));
        AccountingRequest { packet }
    }

    pub(crate) fn from_packet(packet: RadiusPacket) -> Self {
        AccountingRequest { packet }
    }

    pub fn packet(&self) -> &RadiusPacket {
        &self.packet
    }

    pub fn packet_mut(&mut self) -> &mut RadiusPacket {
        &mut self.packet
    }

    pub fn into_packet(self) -> RadiusPacket {
        self.packet
    }

    pub fn user_name(&self) -> Option<String> {
        self.packet
            .attribute(USER_NAME)
            .and_then(|attr| attr.as_string().ok())
    }

    pub fn status_type(&self) -> Option<AcctStatusType> {
        self.packet
            .attribute(ACCT_STATUS_TYPE)
            .and_then(|attr| attr.as_integer().ok())
            .and_then(AcctStatusType::from_u32)
    }

    /// Copy of this request carrying the RFC 2866 Request Authenticator
    pub(crate) fn encode_request(&self, secret: &[u8]) -> Result<Self, PacketError> {
        let bytes = self.packet.frame(&[0u8; 16])?;
        let authenticator = calculate_accounting_request_authenticator(
            &bytes[..4],
            &bytes[RadiusPacket::HEADER_LENGTH..],
            secret,
        );
        Ok(AccountingRequest {
            packet: self.packet.clone().with_authenticator(authenticator),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::default_dictionary;

    #[test]
    fn test_pap_request_hides_password() {
        let request = AccessRequest::new(default_dictionary(), 1, "alice", "password");
        assert!(request.packet().attribute(USER_PASSWORD).is_none());

        let encoded = request.encode_request(b"secret").unwrap();
        let hidden = encoded.packet().attribute(USER_PASSWORD).unwrap();
        assert_eq!(hidden.value.len(), 16);
        assert_ne!(&hidden.value[..8], b"password");
        assert!(encoded.packet().authenticator().is_some());
        assert!(request.packet().authenticator().is_none());
    }

    #[test]
    fn test_chap_request_verifies() {
        let request = AccessRequest::new(default_dictionary(), 1, "bob", "hunter2")
            .with_protocol(AuthProtocol::Chap);
        let encoded = request.encode_request(b"secret").unwrap();
        assert!(encoded.packet().attribute(USER_PASSWORD).is_none());
        assert_eq!(encoded.packet().attribute(CHAP_PASSWORD).unwrap().value.len(), 17);

        let mut decoded = AccessRequest::from_packet(encoded.packet().clone());
        decoded.decode_request_attributes(b"secret").unwrap();
        assert_eq!(decoded.protocol(), AuthProtocol::Chap);
        assert!(decoded.user_password().is_none());
        assert!(decoded.verify_password("hunter2"));
        assert!(!decoded.verify_password("hunter3"));
    }

    #[test]
    fn test_chap_without_challenge_uses_authenticator() {
        let authenticator = [5u8; 16];
        let mut chap_password = vec![7u8];
        chap_password.extend_from_slice(&compute_chap_response(7, b"pw", &authenticator));

        let mut packet = RadiusPacket::new(default_dictionary(), Code::AccessRequest, 3);
        packet.add_attribute(RadiusAttribute::new(CHAP_PASSWORD, chap_password));
        let mut request = AccessRequest::from_packet(packet.with_authenticator(authenticator));
        request.decode_request_attributes(b"secret").unwrap();
        assert!(request.verify_password("pw"));
    }

    #[test]
    fn test_malformed_chap_password() {
        let mut packet = RadiusPacket::new(default_dictionary(), Code::AccessRequest, 3);
        packet.add_attribute(RadiusAttribute::new(CHAP_PASSWORD, vec![1u8; 10]));
        let mut request = AccessRequest::from_packet(packet.with_authenticator([0; 16]));
        assert!(matches!(
            request.decode_request_attributes(b"secret"),
            Err(PacketError::MalformedAttribute(_))
        ));
    }

    #[test]
    fn test_non_utf8_password_is_recovered_as_bytes() {
        let mut request = AccessRequest::new(default_dictionary(), 2, "carol", "");
        request.set_user_password([0xff, 0xfe, 0x41]);
        let encoded = request.encode_request(b"secret").unwrap();

        let mut decoded = AccessRequest::from_packet(encoded.packet().clone());
        decoded.decode_request_attributes(b"secret").unwrap();
        assert_eq!(decoded.user_password_bytes(), Some(&[0xff, 0xfe, 0x41][..]));
        assert_eq!(decoded.user_password().as_deref(), Some("\u{fffd}\u{fffd}A"));
        assert!(decoded.verify_password([0xff, 0xfe, 0x41]));
        assert!(!decoded.verify_password("A"));
    }

    #[test]
    fn test_accounting_authenticator_is_deterministic() {
        let request = AccountingRequest::new(default_dictionary(), 9, "alice", AcctStatusType::Start);
        let first = request.encode_request(b"secret").unwrap();
        let second = request.encode_request(b"secret").unwrap();
        let other = request.encode_request(b"other").unwrap();

        assert_eq!(first.packet().authenticator(), second.packet().authenticator());
        assert_ne!(first.packet().authenticator(), other.packet().authenticator());
        assert_eq!(first.status_type(), Some(AcctStatusType::Start));
        assert_eq!(first.user_name().as_deref(), Some("alice"));
    }
}
