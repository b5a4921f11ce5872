pub mod code;
pub mod codec;
pub mod id;
pub mod packet;
pub mod request;

pub use code::Code;
pub use codec::{
    Packet, create_radius_packet, from_request_datagram, from_response_datagram, to_datagram,
};
pub use id::{PacketIdAllocator, next_packet_id};
pub use packet::{PacketError, RadiusPacket};
pub use request::{AccessRequest, AccountingRequest, AcctStatusType, AuthProtocol};
