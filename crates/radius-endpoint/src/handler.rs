use crate::error::HandlerError;
use crate::transport::Transport;
use async_trait::async_trait;
use radius_codec::attributes::codes::{PROXY_STATE, REPLY_MESSAGE};
use radius_codec::{AccessRequest, AccountingRequest, Code, Packet, RadiusAttribute, RadiusPacket};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request handler trait
///
/// `request` has already been decoded with `secret`. The returned packet is
/// the un-signed response; `Ok(None)` means nothing is sent back.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(
        &self,
        transport: &dyn Transport,
        request: &Packet,
        remote: SocketAddr,
        secret: &[u8],
    ) -> Result<Option<Packet>, HandlerError>;
}

#[async_trait]
impl<T: RequestHandler + ?Sized> RequestHandler for Arc<T> {
    async fn handle(
        &self,
        transport: &dyn Transport,
        request: &Packet,
        remote: SocketAddr,
        secret: &[u8],
    ) -> Result<Option<Packet>, HandlerError> {
        (**self).handle(transport, request, remote, secret).await
    }
}

/// Start a response to `request`, carrying over its Proxy-State attributes
/// (RFC 2865 Section 5.33)
pub fn response_to(request: &Packet, code: Code) -> RadiusPacket {
    let base = request.base();
    let mut response = RadiusPacket::new(Arc::clone(base.dictionary()), code, base.identifier());
    for attr in base.attributes_of_type(PROXY_STATE) {
        response.add_attribute(attr.clone());
    }
    response
}

#[derive(Debug, Clone)]
struct UserEntry {
    password: String,
    reply_attributes: Vec<(String, String)>,
}

/// Simple in-memory authentication handler
///
/// Access-Request is answered with Access-Accept or Access-Reject (PAP or
/// CHAP), Accounting-Request with Accounting-Response. Other codes get no
/// response.
#[derive(Debug, Clone, Default)]
pub struct SimpleAuthHandler {
    users: HashMap<String, UserEntry>,
}

impl SimpleAuthHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.users.insert(
            username.into(),
            UserEntry {
                password: password.into(),
                reply_attributes: Vec::new(),
            },
        );
    }

    /// Add an attribute (by dictionary name) to every Access-Accept for `username`
    pub fn add_reply_attribute(
        &mut self,
        username: &str,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        match self.users.get_mut(username) {
            Some(user) => {
                user.reply_attributes.push((name.into(), value.into()));
                true
            }
            None => false,
        }
    }

    fn handle_access_request(
        &self,
        request: &Packet,
        access: &AccessRequest,
        remote: SocketAddr,
    ) -> Result<Packet, HandlerError> {
        let username = access
            .user_name()
            .ok_or(HandlerError::MissingAttribute("User-Name"))?;

        let user = self
            .users
            .get(&username)
            .filter(|user| access.verify_password(&user.password));

        let Some(user) = user else {
            warn!(
                username = %username,
                client_addr = %remote,
                request_id = request.identifier(),
                protocol = ?access.protocol(),
                "Authentication failed"
            );
            let mut response = response_to(request, Code::AccessReject);
            response.add_attribute(RadiusAttribute::string(REPLY_MESSAGE, "Authentication failed"));
            return Ok(Packet::from(response));
        };

        info!(
            username = %username,
            client_addr = %remote,
            request_id = request.identifier(),
            protocol = ?access.protocol(),
            "Authentication successful"
        );
        let mut response = response_to(request, Code::AccessAccept);
        for (name, value) in &user.reply_attributes {
            if let Err(e) = response.add_attribute_value(name, value) {
                warn!(username = %username, attribute = %name, error = %e, "Skipping reply attribute");
            }
        }
        Ok(Packet::from(response))
    }

    fn handle_accounting_request(
        &self,
        request: &Packet,
        accounting: &AccountingRequest,
        remote: SocketAddr,
    ) -> Packet {
        let username = accounting.user_name();
        info!(
            username = username.as_deref().unwrap_or("-"),
            status = ?accounting.status_type(),
            client_addr = %remote,
            request_id = request.identifier(),
            "Accounting request received"
        );
        Packet::from(response_to(request, Code::AccountingResponse))
    }
}

#[async_trait]
impl RequestHandler for SimpleAuthHandler {
    async fn handle(
        &self,
        _transport: &dyn Transport,
        request: &Packet,
        remote: SocketAddr,
        _secret: &[u8],
    ) -> Result<Option<Packet>, HandlerError> {
        match request {
            Packet::AccessRequest(access) => {
                self.handle_access_request(request, access, remote).map(Some)
            }
            Packet::AccountingRequest(accounting) => {
                Ok(Some(self.handle_accounting_request(request, accounting, remote)))
            }
            Packet::Generic(_) => {
                debug!(packet_type = %request.code(), client_addr = %remote, "Unsupported packet type");
                Ok(None)
            }
        }
    }
}
