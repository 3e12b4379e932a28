mod address;
pub mod model;

use crate::error::ConfigError;
use crate::template::TemplateSet;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

pub use address::{parse_address, ServerAddress};
pub use model::{BridgeConfig, NetworkConfig, ReconnectConfig};

/// A configuration that passed every startup check, with its templates
/// compiled and addresses resolved. Read-only from here on.
pub struct ValidatedConfig {
    pub config: Arc<BridgeConfig>,
    pub templates: Arc<TemplateSet>,
    /// One per network, in configuration order.
    pub addresses: Vec<ServerAddress>,
}

/// Read, parse and validate the configuration at `path`. Files ending in
/// `.toml` are read as TOML, anything else as JSON.
pub fn load_config(path: &Path) -> Result<ValidatedConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let config: BridgeConfig = if is_toml {
        toml::from_str(&contents).with_context(|| "Failed to parse config file")?
    } else {
        serde_json::from_str(&contents).with_context(|| "Failed to parse config file")?
    };

    validate(config).with_context(|| format!("Invalid configuration in {}", path.display()))
}

pub fn validate(config: BridgeConfig) -> Result<ValidatedConfig, ConfigError> {
    if config.nicks.is_empty() {
        return Err(ConfigError::NoNicks);
    }
    if let Some(index) = config.nicks.iter().position(|n| n.trim().is_empty()) {
        return Err(ConfigError::EmptyNick(index));
    }
    if config.networks.is_empty() {
        return Err(ConfigError::NoNetworks);
    }
    if config.queue_capacity == 0 {
        return Err(ConfigError::ZeroQueueCapacity);
    }

    let mut names = HashSet::new();
    let mut addresses = Vec::with_capacity(config.networks.len());
    for (index, network) in config.networks.iter().enumerate() {
        if network.name.trim().is_empty() {
            return Err(ConfigError::EmptyNetworkName(index));
        }
        if !names.insert(network.name.as_str()) {
            return Err(ConfigError::DuplicateNetwork(network.name.clone()));
        }
        if network.channel.trim().is_empty() {
            return Err(ConfigError::EmptyChannel(network.name.clone()));
        }
        let mut address = parse_address(&network.address).ok_or_else(|| ConfigError::BadAddress {
            name: network.name.clone(),
            address: network.address.clone(),
        })?;
        if let Some(tls) = network.tls {
            address.tls = tls;
        }
        addresses.push(address);
    }

    let templates = TemplateSet::compile(&config.templates, &config.timestamp_format)?;

    Ok(ValidatedConfig {
        config: Arc::new(config),
        templates: Arc::new(templates),
        addresses,
    })
}
