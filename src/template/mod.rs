//! Event-to-text templating.
//!
//! Every configured format string is compiled once at startup into a
//! [`CompiledTemplate`]. Lookups fall back to the mandatory `default` entry,
//! so every event code always has something to render with.

pub mod parser;

use crate::bridge::message::Message;
use crate::error::{ConfigError, RenderError};
use std::collections::HashMap;

pub use parser::CompiledTemplate;

pub const DEFAULT_KEY: &str = "default";

/// All compiled templates, shared read-only by every actor.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    by_code: HashMap<String, CompiledTemplate>,
    default: CompiledTemplate,
    timestamp_format: String,
}

impl TemplateSet {
    /// Compile every entry of `definitions`. Fails on the first malformed
    /// template or when no `default` entry exists.
    pub fn compile(
        definitions: &HashMap<String, String>,
        timestamp_format: &str,
    ) -> Result<Self, ConfigError> {
        let mut by_code = HashMap::new();
        let mut default = None;

        for (key, source) in definitions {
            let tmpl = CompiledTemplate::compile(key, source)?;
            if key == DEFAULT_KEY {
                default = Some(tmpl);
            } else {
                by_code.insert(key.to_ascii_uppercase(), tmpl);
            }
        }

        Ok(Self {
            by_code,
            default: default.ok_or(ConfigError::MissingDefaultTemplate)?,
            timestamp_format: timestamp_format.to_string(),
        })
    }

    /// The template for `event_code`, or `default` when none is configured.
    pub fn resolve(&self, event_code: &str) -> &CompiledTemplate {
        self.by_code
            .get(&event_code.to_ascii_uppercase())
            .unwrap_or(&self.default)
    }

    pub fn render(&self, template: &CompiledTemplate, message: &Message) -> Result<String, RenderError> {
        template.render(message, &self.timestamp_format)
    }

    /// Resolve and render in one step.
    pub fn format(&self, message: &Message) -> Result<String, RenderError> {
        self.render(self.resolve(&message.event_code), message)
    }
}
