use crate::config::Config;
use crate::dedup::Deduplicator;
use crate::error::ServerError;
use crate::handler::RequestHandler;
use radius_codec::{
    Dictionary, PacketError, RadiusPacket, default_dictionary, from_request_datagram, to_datagram,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// RADIUS Server configuration
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Shared secret used when no client list is configured
    pub secret: Vec<u8>,
    pub dictionary: Arc<Dictionary>,
    /// Request handler, already wrapped for duplicate suppression
    pub handler: Arc<dyn RequestHandler>,
    /// Optional full configuration with client validation
    pub config: Option<Arc<Config>>,
}

impl ServerConfig {
    /// Default dictionary and the default dedup window
    pub fn new(
        bind_addr: SocketAddr,
        secret: impl Into<Vec<u8>>,
        handler: Arc<dyn RequestHandler>,
    ) -> Self {
        ServerConfig {
            bind_addr,
            secret: secret.into(),
            dictionary: default_dictionary(),
            handler: Arc::new(Deduplicator::new(handler)),
            config: None,
        }
    }

    pub fn from_config(config: Config, handler: Arc<dyn RequestHandler>) -> Result<Self, ServerError> {
        let bind_addr = config.socket_addr()?;
        let dictionary = config.load_dictionary()?;
        let handler = Arc::new(Deduplicator::with_timeout(handler, config.dedup_timeout()));

        Ok(ServerConfig {
            bind_addr,
            secret: config.secret.clone().into_bytes(),
            dictionary,
            handler,
            config: Some(Arc::new(config)),
        })
    }

    /// Shared secret for a source address, `None` when the client is not authorized
    fn secret_for_client(&self, source_ip: IpAddr) -> Option<&[u8]> {
        match &self.config {
            Some(config) => config.secret_for_client(source_ip),
            None => Some(self.secret.as_slice()),
        }
    }
}

/// RADIUS Server
pub struct RadiusServer {
    config: Arc<ServerConfig>,
    socket: Arc<UdpSocket>,
}

impl RadiusServer {
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        info!("RADIUS server listening on {}", config.bind_addr);

        Ok(RadiusServer {
            config: Arc::new(config),
            socket: Arc::new(socket),
        })
    }

    /// Get the local address the server is listening on
    ///
    /// This is useful for testing when binding to port 0 (OS-assigned port)
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.socket.local_addr().map_err(ServerError::from)
    }

    /// Start the server and handle incoming requests
    pub async fn run(&self) -> Result<(), ServerError> {
        let mut buf = vec![0u8; RadiusPacket::MAX_PACKET_SIZE];

        loop {
            let (len, addr) = self.socket.recv_from(&mut buf).await?;
            let data = buf[..len].to_vec();

            let config = Arc::clone(&self.config);
            let socket = Arc::clone(&self.socket);

            tokio::spawn(async move {
                if let Err(e) = Self::handle_request(data, addr, config, socket).await {
                    debug!("Error handling request from {}: {}", addr, e);
                }
            });
        }
    }

    async fn handle_request(
        data: Vec<u8>,
        addr: SocketAddr,
        config: Arc<ServerConfig>,
        socket: Arc<UdpSocket>,
    ) -> Result<(), ServerError> {
        // RFC 2865 Section 3: silently drop requests from unknown clients
        let Some(secret) = config.secret_for_client(addr.ip()) else {
            let request_id = data.get(1).copied().unwrap_or(0);
            warn!(
                client_ip = %addr.ip(),
                request_id = request_id,
                "Rejected request from unauthorized client"
            );
            return Err(ServerError::InvalidClient);
        };

        let request = match from_request_datagram(&config.dictionary, &data, secret) {
            Ok(request) => request,
            Err(e) => {
                if e.is_authentication_failure() {
                    warn!(client_addr = %addr, error = %e, "Dropping request with bad authenticator");
                } else {
                    debug!(client_addr = %addr, error = %e, "Dropping malformed request");
                }
                return Err(e.into());
            }
        };

        debug!(
            packet_type = %request.code(),
            client_addr = %addr,
            request_id = request.identifier(),
            "Received RADIUS packet"
        );

        let Some(response) = config
            .handler
            .handle(&*socket, &request, addr, secret)
            .await?
        else {
            return Ok(());
        };

        let request_authenticator = request
            .authenticator()
            .ok_or(PacketError::MissingAuthenticator)?;
        let response = response.encode_response(secret, request_authenticator)?;
        let response_data = to_datagram(&response)?;
        socket.send_to(&response_data, addr).await?;

        debug!(
            response_type = %response.code(),
            client_addr = %addr,
            request_id = response.identifier(),
            "Sent RADIUS response"
        );

        Ok(())
    }
}
