//! Error taxonomy for the relay.
//!
//! Configuration and template problems are detected before any connection is
//! made. Runtime failures are returned as [`RelayError`] values to the
//! per-network supervisor, which decides between retrying and exiting.

use thiserror::Error;

/// A format string that can never render.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template '{key}': unterminated '{{{{' at byte {offset}")]
    Unterminated { key: String, offset: usize },
    #[error("template '{key}': placeholder '{placeholder}' must start with '.'")]
    MissingDot { key: String, placeholder: String },
    #[error("template '{key}': empty placeholder")]
    EmptyField { key: String },
    #[error("template '{key}': unknown field '{field}'")]
    UnknownField { key: String, field: String },
    #[error("template '{key}': invalid argument index in '{field}'")]
    BadIndex { key: String, field: String },
}

/// A compiled template asked for something the message does not carry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("template '{key}' references argument {index} but the {code} event has {available}")]
    MissingArgument {
        key: String,
        code: String,
        index: usize,
        available: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one nick must be configured")]
    NoNicks,
    #[error("nick #{0} is empty")]
    EmptyNick(usize),
    #[error("no networks configured")]
    NoNetworks,
    #[error("network #{0} has an empty name")]
    EmptyNetworkName(usize),
    #[error("network '{0}' is configured more than once")]
    DuplicateNetwork(String),
    #[error("network '{0}' has no channel")]
    EmptyChannel(String),
    #[error("network '{name}': invalid address '{address}'")]
    BadAddress { name: String, address: String },
    #[error("no 'default' template configured")]
    MissingDefaultTemplate,
    #[error("queue_capacity must be at least 1")]
    ZeroQueueCapacity,
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Failure of one network's connection actor.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("[{network}] connection failed: {source}")]
    Connect {
        network: String,
        #[source]
        source: irc::error::Error,
    },
    #[error("[{network}] protocol error: {source}")]
    Protocol {
        network: String,
        #[source]
        source: irc::error::Error,
    },
    #[error("[{network}] connection closed by server")]
    Disconnected { network: String },
    #[error("[{network}] {source}")]
    Render {
        network: String,
        #[source]
        source: RenderError,
    },
    #[error("relay hub is no longer running")]
    HubClosed,
}

impl RelayError {
    /// Fatal errors terminate the whole process; everything else is a
    /// candidate for a supervised restart.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::Render { .. } | RelayError::HubClosed)
    }
}
