//! Deduplicating RADIUS Endpoint
//!
//! A UDP RADIUS endpoint built on `radius-codec`. Every request passes
//! through a [`Deduplicator`] so retransmissions of a request that is still
//! being handled (or was handled recently) are dropped instead of being
//! processed twice.
//!
//! # Example
//!
//! ```rust,no_run
//! use radius_endpoint::{RadiusServer, ServerConfig, SimpleAuthHandler};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut handler = SimpleAuthHandler::new();
//!     handler.add_user("alice", "password");
//!
//!     let config = ServerConfig::new("0.0.0.0:1812".parse()?, b"secret", Arc::new(handler));
//!     let server = RadiusServer::new(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod handler;
pub mod server;
pub mod timer;
pub mod transport;

pub use config::{Client, Config, ConfigError, User};
pub use dedup::{DEFAULT_DEDUP_TIMEOUT, Deduplicator, EntryState, Outcome, RequestKey};
pub use error::{HandlerError, ServerError};
pub use handler::{RequestHandler, SimpleAuthHandler, response_to};
pub use server::{RadiusServer, ServerConfig};
pub use timer::{Timer, TimerTask, TokioTimer};
pub use transport::Transport;
