use crate::handler::Handler;
use crate::server::{Network, ServerConfig};
use ipnetwork::IpNetwork;
use radserver_proto::{Dictionary, DictionaryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password: String,
    /// Reply-Message sent with Access-Accept
    #[serde(default)]
    pub reply_message: Option<String>,
    /// Extra Access-Accept attributes by dictionary name, e.g.
    /// `{"Session-Timeout": "3600"}`
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Client IP address or network (CIDR notation)
    pub address: String,
    /// Shared secret for this client
    pub secret: String,
    /// Optional client name/description
    #[serde(default)]
    pub name: Option<String>,
    /// Enable/disable this client
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Client {
    /// Parse the client address as an IP network
    pub fn parse_network(&self) -> Result<IpNetwork, ConfigError> {
        // Try to parse as CIDR notation first
        if let Ok(network) = self.address.parse::<IpNetwork>() {
            return Ok(network);
        }

        // Single address becomes a /32 (IPv4) or /128 (IPv6) network
        if let Ok(ip) = self.address.parse::<IpAddr>() {
            return Ok(IpNetwork::from(ip));
        }

        Err(ConfigError::Invalid(format!(
            "Invalid client address: {}",
            self.address
        )))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server listen address
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Authentication port
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,

    /// Accounting port (0 disables the accounting server)
    #[serde(default = "default_acct_port")]
    pub acct_port: u16,

    /// Address family: "udp", "udp4" or "udp6"
    #[serde(default = "default_network")]
    pub network: String,

    /// Default shared secret (used when no clients are configured)
    #[serde(default = "default_secret")]
    pub secret: String,

    /// List of authorized clients
    #[serde(default)]
    pub clients: Vec<Client>,

    /// List of users for authentication
    #[serde(default)]
    pub users: Vec<User>,

    /// Additional dictionary file loaded on top of the built-in attributes
    ///
    /// Lines repeating a built-in attribute with the same name, type and
    /// datatype are accepted; giving a built-in type a different name or
    /// datatype fails the load.
    #[serde(default)]
    pub dictionary_path: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Maximum number of concurrently handled requests per server
    #[serde(default)]
    pub max_in_flight: Option<usize>,
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_auth_port() -> u16 {
    1812 // Standard RADIUS authentication port
}

fn default_acct_port() -> u16 {
    1813 // Standard RADIUS accounting port
}

fn default_network() -> String {
    "udp".to_string()
}

fn default_secret() -> String {
    "testing123".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_address: default_listen_address(),
            auth_port: default_auth_port(),
            acct_port: default_acct_port(),
            network: default_network(),
            secret: default_secret(),
            clients: vec![],
            users: vec![],
            dictionary_path: None,
            log_level: None,
            max_in_flight: None,
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

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn listen_ip(&self) -> Result<IpAddr, ConfigError> {
        self.listen_address.parse().map_err(|_| {
            ConfigError::Invalid(format!("Invalid listen address: {}", self.listen_address))
        })
    }

    /// Socket address of the authentication server
    pub fn auth_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.listen_ip()?, self.auth_port))
    }

    /// Socket address of the accounting server, `None` when disabled
    pub fn acct_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        if self.acct_port == 0 {
            return Ok(None);
        }
        Ok(Some(SocketAddr::new(self.listen_ip()?, self.acct_port)))
    }

    pub fn network(&self) -> Result<Network, ConfigError> {
        self.network
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("Invalid network: {}", self.network)))
    }

    /// Built-in dictionary extended with `dictionary_path`, if set
    pub fn load_dictionary(&self) -> Result<Arc<Dictionary>, ConfigError> {
        let dictionary = Dictionary::builtin();
        if let Some(ref path) = self.dictionary_path {
            let warnings = dictionary.load_file(path)?;
            info!(
                path = %path,
                skipped_lines = warnings.len(),
                "Loaded dictionary file"
            );
        }
        Ok(Arc::new(dictionary))
    }

    /// Server configuration for one listen address
    ///
    /// Disabled clients are left out.
    pub fn server_config(
        &self,
        addr: SocketAddr,
        dictionary: Arc<Dictionary>,
        handler: Arc<dyn Handler>,
    ) -> Result<ServerConfig, ConfigError> {
        let clients = self
            .clients
            .iter()
            .filter(|client| client.enabled)
            .map(|client| (client.address.clone(), client.secret.clone().into_bytes()))
            .collect();

        Ok(ServerConfig {
            addr: addr.to_string(),
            network: self.network()?,
            secret: self.secret.clone().into_bytes(),
            clients,
            dictionary,
            handler: Some(handler),
            max_in_flight: self.max_in_flight,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_ip()?;
        self.network()?;

        // Validate ports
        if self.auth_port == 0 {
            return Err(ConfigError::Invalid("Authentication port cannot be 0".to_string()));
        }
        if self.acct_port == self.auth_port {
            return Err(ConfigError::Invalid(format!(
                "Accounting port {} is the authentication port",
                self.acct_port
            )));
        }

        // Validate secret is not empty
        if self.secret.is_empty() {
            return Err(ConfigError::Invalid("Secret cannot be empty".to_string()));
        }

        if self.max_in_flight == Some(0) {
            return Err(ConfigError::Invalid("max_in_flight cannot be 0".to_string()));
        }

        // Validate clients
        for client in &self.clients {
            if client.secret.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Client {} has empty secret",
                    client.address
                )));
            }
            // Validate that address can be parsed
            client.parse_network()?;
        }

        // Validate users
        for user in &self.users {
            if user.username.is_empty() {
                return Err(ConfigError::Invalid("User has empty username".to_string()));
            }
        }

        Ok(())
    }

    /// Create an example configuration file
    pub fn example() -> Self {
        Config {
            listen_address: "0.0.0.0".to_string(),
            auth_port: 1812,
            acct_port: 1813,
            network: "udp".to_string(),
            secret: "testing123".to_string(),
            clients: vec![
                Client {
                    address: "192.168.1.0/24".to_string(),
                    secret: "client_secret_1".to_string(),
                    name: Some("Internal Network".to_string()),
                    enabled: true,
                },
                Client {
                    address: "10.0.0.1".to_string(),
                    secret: "client_secret_2".to_string(),
                    name: Some("VPN Gateway".to_string()),
                    enabled: true,
                },
            ],
            users: vec![
                User {
                    username: "admin".to_string(),
                    password: "admin123".to_string(),
                    reply_message: Some("Welcome, admin".to_string()),
                    attributes: BTreeMap::from([(
                        "Session-Timeout".to_string(),
                        "3600".to_string(),
                    )]),
                },
                User {
                    username: "user1".to_string(),
                    password: "password1".to_string(),
                    reply_message: None,
                    attributes: BTreeMap::new(),
                },
            ],
            dictionary_path: None,
            log_level: Some("info".to_string()),
            max_in_flight: Some(1024),
        }
    }
}
