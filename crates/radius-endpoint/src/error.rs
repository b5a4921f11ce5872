use crate::config::ConfigError;
use radius_codec::PacketError;
use thiserror::Error;

/// Failure inside a request handler
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing attribute: {0}")]
    MissingAttribute(&'static str),
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid client")]
    InvalidClient,
}
