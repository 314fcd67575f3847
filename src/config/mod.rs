//! Configuration management
//!
//! Node identity, bootstrap location, peer timeouts and mining settings,
//! read from defaults, a TOML file and the environment.

pub mod settings;

pub use settings::{Config, MiningSettings, NetworkSettings, NodeSettings, DEFAULT_CONFIG_FILE};
