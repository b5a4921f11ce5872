use radius_codec::attributes::codes::{NAS_IP_ADDRESS, REPLY_MESSAGE};
use radius_codec::{
    AccessRequest, Code, Packet, RadiusAttribute, default_dictionary, from_response_datagram,
    next_packet_id, to_datagram,
};
use std::net::{Ipv4Addr, UdpSocket};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: {} <username> <password> <secret> [server_addr]", args[0]);
        eprintln!("Example: {} admin admin123 testing123 127.0.0.1:1812", args[0]);
        std::process::exit(1);
    }

    let username = &args[1];
    let password = &args[2];
    let secret = args[3].as_bytes();
    let server_addr = args.get(4).map(|s| s.as_str()).unwrap_or("127.0.0.1:1812");

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(server_addr)?;
    socket.set_read_timeout(Some(Duration::from_secs(5)))?;

    let dictionary = default_dictionary();
    let mut request = AccessRequest::new(dictionary.clone(), next_packet_id(), username, password);
    request
        .packet_mut()
        .add_attribute(RadiusAttribute::ipv4(NAS_IP_ADDRESS, Ipv4Addr::LOCALHOST));
    let request = Packet::from(request).encode_request(secret)?;

    let request_data = to_datagram(&request)?;
    println!("Sending Access-Request ({} bytes) to {}", request_data.len(), server_addr);
    socket.send(&request_data)?;

    let mut buffer = vec![0u8; 4096];
    let len = socket.recv(&mut buffer)?;
    let response = from_response_datagram(&dictionary, &buffer[..len], secret, &request)?;

    match response.code() {
        Code::AccessAccept => println!("Authentication successful (Access-Accept)"),
        Code::AccessReject => println!("Authentication failed (Access-Reject)"),
        other => println!("Unexpected response: {}", other),
    }
    for attr in response.base().attributes_of_type(REPLY_MESSAGE) {
        if let Ok(msg) = attr.as_string() {
            println!("  Message: {}", msg);
        }
    }
    println!("  Identifier: {}", response.identifier());
    println!("  Attributes: {}", response.attributes().len());

    Ok(())
}
