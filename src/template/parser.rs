//! Format string parser and renderer.
//!
//! A format string is literal text with `{{ .field }}` placeholders. Field
//! names are case-insensitive, so `{{.Nick}}` and `{{.nick}}` are the same.

use crate::bridge::message::Message;
use crate::error::{RenderError, TemplateError};

/// A message field a placeholder can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Network,
    EventCode,
    Nick,
    Body,
    Channel,
    Time,
    Source,
    User,
    Host,
    /// All protocol parameters joined by spaces.
    Args,
    /// One protocol parameter, zero-based.
    Arg(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A parsed format string, ready to render any number of messages.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    key: String,
    segments: Vec<Segment>,
}

impl CompiledTemplate {
    /// Parse `source`. `key` names the template in error messages.
    pub fn compile(key: &str, source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after_open = &rest[start + 2..];
            let end = after_open.find("}}").ok_or_else(|| TemplateError::Unterminated {
                key: key.to_string(),
                offset: offset + start,
            })?;
            let field = parse_field(key, after_open[..end].trim())?;
            segments.push(Segment::Field(field));

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            key: key.to_string(),
            segments,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Substitute every placeholder with the message's value.
    /// `timestamp_format` is the chrono format used for `{{.time}}`.
    pub fn render(&self, message: &Message, timestamp_format: &str) -> Result<String, RenderError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => self.render_field(*field, message, timestamp_format, &mut out)?,
            }
        }
        Ok(out)
    }

    fn render_field(
        &self,
        field: Field,
        message: &Message,
        timestamp_format: &str,
        out: &mut String,
    ) -> Result<(), RenderError> {
        match field {
            Field::Network => out.push_str(&message.network),
            Field::EventCode => out.push_str(&message.event_code),
            Field::Nick => out.push_str(&message.nick),
            Field::Body => out.push_str(&message.body),
            Field::Channel => out.push_str(message.channel.as_deref().unwrap_or("")),
            Field::Time => out.push_str(&message.received_at.format(timestamp_format).to_string()),
            Field::Source => out.push_str(message.raw.source()),
            Field::User => out.push_str(message.raw.user()),
            Field::Host => out.push_str(message.raw.host()),
            Field::Args => out.push_str(&message.raw.args().join(" ")),
            Field::Arg(index) => {
                let arg = message.raw.arg(index).ok_or_else(|| RenderError::MissingArgument {
                    key: self.key.clone(),
                    code: message.event_code.clone(),
                    index,
                    available: message.raw.args().len(),
                })?;
                out.push_str(arg);
            }
        }
        Ok(())
    }
}

fn parse_field(key: &str, placeholder: &str) -> Result<Field, TemplateError> {
    let name = placeholder.strip_prefix('.').ok_or_else(|| TemplateError::MissingDot {
        key: key.to_string(),
        placeholder: placeholder.to_string(),
    })?;
    if name.is_empty() {
        return Err(TemplateError::EmptyField { key: key.to_string() });
    }

    let lower = name.to_ascii_lowercase();
    if let Some(index) = lower
        .strip_prefix("args.")
        .or_else(|| lower.strip_prefix("arguments."))
    {
        return index.parse().map(Field::Arg).map_err(|_| TemplateError::BadIndex {
            key: key.to_string(),
            field: name.to_string(),
        });
    }

    let field = match lower.as_str() {
        "network" => Field::Network,
        "eventcode" | "code" => Field::EventCode,
        "nick" => Field::Nick,
        "body" | "message" => Field::Body,
        "channel" => Field::Channel,
        "time" => Field::Time,
        "source" => Field::Source,
        "user" => Field::User,
        "host" => Field::Host,
        "args" | "arguments" => Field::Args,
        _ => {
            return Err(TemplateError::UnknownField {
                key: key.to_string(),
                field: name.to_string(),
            })
        }
    };
    Ok(field)
}
