//! The relay's unit of work.
//!
//! A [`Message`] is built once by the actor that observed the protocol event
//! and is then shared, read-only, by the hub and every other actor.

use chrono::{DateTime, Local};
use irc::client::prelude::Prefix;
use std::sync::Arc;

/// Messages travel the bus behind an `Arc`; every actor sees the same value.
pub type SharedMessage = Arc<Message>;

#[derive(Debug, Clone)]
pub struct Message {
    /// Origin network name, as in `NetworkConfig::name`.
    pub network: String,
    /// Protocol classification, e.g. `PRIVMSG` or `332`.
    pub event_code: String,
    /// Originating user. Empty for server-originated events.
    pub nick: String,
    /// Last protocol parameter (message text, topic, part reason, ...).
    pub body: String,
    pub channel: Option<String>,
    pub received_at: DateTime<Local>,
    pub raw: RawEvent,
}

/// The few protocol-level details templates may reach into.
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    source: String,
    user: String,
    host: String,
    args: Vec<String>,
}

impl RawEvent {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

impl Message {
    /// Translate a protocol event observed on `network`.
    pub fn from_irc(network: &str, event_code: &str, event: &irc::proto::Message) -> Self {
        let (_, args, has_trailing) = split_command(&event.command);

        let (nick, user, host) = match &event.prefix {
            Some(Prefix::Nickname(nick, user, host)) => (nick.clone(), user.clone(), host.clone()),
            Some(Prefix::ServerName(_)) | None => (String::new(), String::new(), String::new()),
        };
        let source = event.prefix.as_ref().map(|p| p.to_string()).unwrap_or_default();

        // The last parameter is free text unless it is the only one and bare.
        let targets = match args.split_last() {
            Some((_, rest)) if has_trailing || !rest.is_empty() => rest,
            _ => &args[..],
        };
        let channel = targets.iter().find(|a| is_channel(a)).cloned();
        let body = args.last().cloned().unwrap_or_default();

        Self {
            network: network.to_string(),
            event_code: event_code.to_string(),
            nick,
            body,
            channel,
            received_at: Local::now(),
            raw: RawEvent {
                source,
                user,
                host,
                args,
            },
        }
    }
}

/// The event code of a protocol message: the command verb, or the
/// three-digit numeric for server replies.
pub fn event_code(event: &irc::proto::Message) -> String {
    split_command(&event.command).0
}

/// Split a command into its verb and parameter list, honouring the trailing
/// `:` parameter. The flag reports whether that trailing form was used.
fn split_command(command: &irc::proto::Command) -> (String, Vec<String>, bool) {
    let line = String::from(command);
    let (head, trailing) = match line.find(" :") {
        Some(pos) => (&line[..pos], Some(&line[pos + 2..])),
        None => (line.as_str(), None),
    };

    let mut words = head.split(' ').filter(|w| !w.is_empty());
    let code = words.next().unwrap_or_default().to_ascii_uppercase();
    let mut args: Vec<String> = words.map(str::to_string).collect();
    if let Some(trailing) = trailing {
        args.push(trailing.to_string());
    }
    (code, args, trailing.is_some())
}

fn is_channel(name: &str) -> bool {
    name.starts_with(['#', '&', '+', '!'])
}
