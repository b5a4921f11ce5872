use crate::dedup::DEFAULT_DEDUP_TIMEOUT;
use ipnetwork::IpNetwork;
use radius_codec::{Dictionary, DictionaryError, DictionaryParser, FileResolver, default_dictionary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// True when the config file itself does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password: String,
    /// Attributes added to Access-Accept, keyed by dictionary name
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Client IP address or network (supports CIDR notation)
    pub address: String,
    pub secret: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Client {
    /// Parse the client address as an IP network
    pub fn parse_network(&self) -> Result<IpNetwork, ConfigError> {
        if let Ok(network) = self.address.parse::<IpNetwork>() {
            return Ok(network);
        }
        if let Ok(ip) = self.address.parse::<IpAddr>() {
            return Ok(IpNetwork::from(ip));
        }

        Err(ConfigError::Invalid(format!(
            "Invalid client address: {}",
            self.address
        )))
    }

    pub fn matches(&self, source_ip: IpAddr) -> Result<bool, ConfigError> {
        Ok(self.parse_network()?.contains(source_ip))
    }
}

/// Endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Shared secret used when no client list is configured
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Authorized clients; when non-empty, requests from other addresses are dropped
    #[serde(default)]
    pub clients: Vec<Client>,

    #[serde(default)]
    pub users: Vec<User>,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Seconds a request is remembered for duplicate detection (default: 30)
    #[serde(default = "default_dedup_timeout_secs")]
    pub dedup_timeout_secs: u64,

    /// Dictionary file to load instead of the built-in one
    #[serde(default)]
    pub dictionary_path: Option<String>,
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    1812
}

fn default_secret() -> String {
    "testing123".to_string()
}

fn default_dedup_timeout_secs() -> u64 {
    DEFAULT_DEDUP_TIMEOUT.as_secs()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            secret: default_secret(),
            clients: vec![],
            users: vec![],
            log_level: None,
            dedup_timeout_secs: default_dedup_timeout_secs(),
            dictionary_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr: IpAddr = self.listen_address.parse().map_err(|_| {
            ConfigError::Invalid(format!("Invalid IP address: {}", self.listen_address))
        })?;
        Ok(SocketAddr::new(addr, self.listen_port))
    }

    pub fn dedup_timeout(&self) -> Duration {
        Duration::from_secs(self.dedup_timeout_secs)
    }

    /// Returns the first enabled client that matches the source IP
    pub fn find_client(&self, source_ip: IpAddr) -> Option<&Client> {
        self.clients
            .iter()
            .filter(|client| client.enabled)
            .find(|client| matches!(client.matches(source_ip), Ok(true)))
    }

    /// Shared secret for a source IP, or `None` if the client is not authorized
    pub fn secret_for_client(&self, source_ip: IpAddr) -> Option<&[u8]> {
        if self.clients.is_empty() {
            return Some(self.secret.as_bytes());
        }
        self.find_client(source_ip)
            .map(|client| client.secret.as_bytes())
    }

    /// The configured dictionary file, or the built-in dictionary
    pub fn load_dictionary(&self) -> Result<Arc<Dictionary>, ConfigError> {
        match &self.dictionary_path {
            Some(path) => Ok(Arc::new(DictionaryParser::new(FileResolver).parse(path)?)),
            None => Ok(default_dictionary()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.listen_port == 0 {
            return Err(ConfigError::Invalid("Port cannot be 0".to_string()));
        }
        if self.secret.is_empty() {
            return Err(ConfigError::Invalid("Secret cannot be empty".to_string()));
        }
        if self.dedup_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "Dedup timeout must be at least 1 second".to_string(),
            ));
        }

        for client in &self.clients {
            if client.secret.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Client {} has empty secret",
                    client.address
                )));
            }
            client.parse_network()?;
        }

        for user in &self.users {
            if user.username.is_empty() {
                return Err(ConfigError::Invalid("User has empty username".to_string()));
            }
        }

        Ok(())
    }

    /// Create an example configuration file
    pub fn example() -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert("Service-Type".to_string(), "Framed-User".to_string());
        attributes.insert("Session-Timeout".to_string(), "3600".to_string());

        Config {
            listen_address: "0.0.0.0".to_string(),
            listen_port: 1812,
            secret: "testing123".to_string(),
            clients: vec![
                Client {
                    address: "192.168.1.0/24".to_string(),
                    secret: "client_secret_1".to_string(),
                    name: Some("Internal Network".to_string()),
                    enabled: true,
                },
                Client {
                    address: "127.0.0.1".to_string(),
                    secret: "testing123".to_string(),
                    name: Some("Localhost".to_string()),
                    enabled: true,
                },
            ],
            users: vec![
                User {
                    username: "admin".to_string(),
                    password: "admin123".to_string(),
                    attributes,
                },
                User {
                    username: "user1".to_string(),
                    password: "password1".to_string(),
                    attributes: BTreeMap::new(),
                },
            ],
            log_level: Some("info".to_string()),
            dedup_timeout_secs: 30,
            dictionary_path: None,
        }
    }
}
