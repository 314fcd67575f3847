use crate::error::{BlockchainError, Result};
use crate::network::node::DEFAULT_PROTOCOL;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

const NODE_HOSTNAME_KEY: &str = "NODE_HOSTNAME";
const NODE_PORT_KEY: &str = "NODE_PORT";
const NODE_NAME_KEY: &str = "NODE_NAME";
const BOOTSTRAP_HOST_KEY: &str = "BOOTSTRAP_HOST";
const BOOTSTRAP_PORT_KEY: &str = "BOOTSTRAP_PORT";
const MINING_DIFFICULTY_KEY: &str = "MINING_DIFFICULTY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub hostname: String,
    pub port: u16,
    pub name: String,
    pub protocol: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        NodeSettings {
            hostname: "localhost".to_string(),
            port: 8000,
            name: "node".to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub bootstrap_host: String,
    pub bootstrap_port: u16,
    pub peer_timeout_ms: u64,
    pub max_status_polls: usize,
    pub max_outbound_requests: usize,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        NetworkSettings {
            bootstrap_host: "localhost".to_string(),
            bootstrap_port: 8000,
            peer_timeout_ms: 5000,
            max_status_polls: 10,
            max_outbound_requests: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningSettings {
    pub difficulty: usize,
    pub incentive: f64,
}

impl Default for MiningSettings {
    fn default() -> Self {
        MiningSettings {
            difficulty: 4,
            incentive: 1.0,
        }
    }
}

/// Node configuration: built-in defaults, then an optional TOML file, then
/// environment variables. Command line flags are applied last by the binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeSettings,
    pub network: NetworkSettings,
    pub mining: MiningSettings,
}

fn parse_override<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| BlockchainError::Config(format!("{key} has an invalid value: {value}")))
}

impl Config {
    // An explicit path must exist; without one, config.toml is read only if present
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("reading {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(hostname) = lookup(NODE_HOSTNAME_KEY) {
            self.node.hostname = hostname;
        }
        if let Some(port) = lookup(NODE_PORT_KEY) {
            self.node.port = parse_override(NODE_PORT_KEY, &port)?;
        }
        if let Some(name) = lookup(NODE_NAME_KEY) {
            self.node.name = name;
        }
        if let Some(host) = lookup(BOOTSTRAP_HOST_KEY) {
            self.network.bootstrap_host = host;
        }
        if let Some(port) = lookup(BOOTSTRAP_PORT_KEY) {
            self.network.bootstrap_port = parse_override(BOOTSTRAP_PORT_KEY, &port)?;
        }
        if let Some(difficulty) = lookup(MINING_DIFFICULTY_KEY) {
            self.mining.difficulty = parse_override(MINING_DIFFICULTY_KEY, &difficulty)?;
        }
        Ok(())
    }

    /// The node listening on the bootstrap port starts the network.
    pub fn is_bootstrap(&self) -> bool {
        self.node.port == self.network.bootstrap_port
    }

    pub fn bootstrap_address(&self) -> String {
        format!(
            "{}{}:{}",
            self.node.protocol, self.network.bootstrap_host, self.network.bootstrap_port
        )
    }

    pub fn node_address(&self) -> String {
        format!(
            "{}{}:{}",
            self.node.protocol, self.node.hostname, self.node.port
        )
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.network.peer_timeout_ms)
    }
}
