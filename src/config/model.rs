//! Configuration data model.
//!
//! All structs derive `Deserialize` so the same model can be read from JSON or
//! TOML. Key names accept both the lower-case spelling and the capitalised one
//! older bridge configs used (`Nicks`, `Networks`, ...).

use serde::Deserialize;
use std::collections::HashMap;

/// Root bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Candidate nicks, tried in order whenever the current one is taken.
    #[serde(alias = "Nicks")]
    pub nicks: Vec<String>,
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(default, alias = "Realname")]
    pub realname: Option<String>,
    #[serde(alias = "Networks", alias = "servers", alias = "Servers")]
    pub networks: Vec<NetworkConfig>,
    /// Event codes eligible for relaying (`PRIVMSG`, `TOPIC`, `332`, ...).
    #[serde(default, alias = "Forward")]
    pub forward: Vec<String>,
    /// Event code to format string. Must contain `default`.
    #[serde(alias = "Templates")]
    pub templates: HashMap<String, String>,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl BridgeConfig {
    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.username)
    }

    /// Whether events with this code are relayed. Codes compare
    /// case-insensitively so `privmsg` and `PRIVMSG` are equivalent.
    pub fn forwards(&self, event_code: &str) -> bool {
        self.forward.iter().any(|c| c.eq_ignore_ascii_case(event_code))
    }
}

/// One IRC network and the single channel the bridge joins there.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Unique label, used for echo suppression and log prefixes.
    #[serde(alias = "Name")]
    pub name: String,
    /// `host`, `host:port` or `host:+port` (TLS).
    #[serde(alias = "Address")]
    pub address: String,
    #[serde(alias = "Channel")]
    pub channel: String,
    /// Overrides the TLS choice derived from the address.
    #[serde(default)]
    pub tls: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Restart policy for a network whose connection fails.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay_secs: default_base_delay(),
            max_delay_secs: default_max_delay(),
            max_failures: default_max_failures(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_timestamp_format() -> String {
    "%H:%M:%S".to_string()
}
fn default_queue_capacity() -> usize {
    64
}
fn default_base_delay() -> u64 {
    2
}
fn default_max_delay() -> u64 {
    60
}
fn default_max_failures() -> u32 {
    10
}
