//! RADIUS Packet Codec
//!
//! Dictionary-driven encoding and decoding of RADIUS packets as defined in
//! RFC 2865 and RFC 2866.
//!
//! # Features
//!
//! - Attribute dictionaries loaded from FreeRADIUS-style files with `$INCLUDE`
//! - Vendor-Specific attributes grouped per vendor
//! - User-Password hiding, CHAP, and Request/Response Authenticators
//! - Access-Request and Accounting-Request specific encoding rules
//! - A lock-free packet identifier allocator
//!
//! # Example
//!
//! ```rust
//! use radius_codec::{AccessRequest, Packet, default_dictionary, next_packet_id, to_datagram};
//!
//! let request = AccessRequest::new(default_dictionary(), next_packet_id(), "alice", "password");
//! let encoded = Packet::from(request).encode_request(b"secret").unwrap();
//! let bytes = to_datagram(&encoded).unwrap();
//! assert_eq!(bytes[0], 1);
//! ```

pub mod attributes;
pub mod auth;
pub mod dictionary;
pub mod packet;

pub use attributes::{Attribute, AttributeValue, RadiusAttribute, VendorSpecific, decode_attributes};
pub use auth::{
    calculate_accounting_request_authenticator, calculate_response_authenticator,
    compute_chap_response, decrypt_user_password, encrypt_user_password,
    generate_request_authenticator, verify_response_authenticator,
};
pub use dictionary::{
    AttributeType, Dictionary, DictionaryError, DictionaryParser, EmbeddedResolver, FileResolver,
    ResourceResolver, ValueKind, default_dictionary,
};
pub use packet::{
    AccessRequest, AccountingRequest, AcctStatusType, AuthProtocol, Code, Packet, PacketError,
    PacketIdAllocator, RadiusPacket, create_radius_packet, from_request_datagram,
    from_response_datagram, next_packet_id, to_datagram,
};
