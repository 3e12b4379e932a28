//! Connection actor logic.
//!
//! Translation only: protocol events become [`Action`]s and relayed
//! messages become outbound text. Nothing here touches a socket, which keeps
//! both echo guards testable without a server.

use crate::bridge::action::Action;
use crate::bridge::message::{self, Message};
use crate::bridge::nick::NickNegotiator;
use crate::config::{BridgeConfig, NetworkConfig};
use crate::error::RenderError;
use crate::template::TemplateSet;
use irc::client::prelude::{Command, Response};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TOPIC_CODE: &str = "TOPIC";

/// Inbound half of an actor: protocol events to bus messages.
pub struct NetworkActor {
    network: NetworkConfig,
    bridge: Arc<BridgeConfig>,
    templates: Arc<TemplateSet>,
    nick: NickNegotiator,
    current_nick: String,
    registered: bool,
}

impl NetworkActor {
    pub fn new(network: NetworkConfig, bridge: Arc<BridgeConfig>, templates: Arc<TemplateSet>) -> Self {
        let nick = NickNegotiator::new(bridge.nicks.iter().cloned().collect());
        let current_nick = nick.current().to_string();
        Self {
            network,
            bridge,
            templates,
            nick,
            current_nick,
            registered: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.network.name
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn bridge(&self) -> &BridgeConfig {
        &self.bridge
    }

    /// True once the server has welcomed us on the current connection.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Prepare for a new connection attempt. Returns the nick to register
    /// with and the fallbacks the client should try on collisions.
    pub fn begin_connection(&mut self) -> (String, Vec<String>) {
        self.registered = false;
        self.current_nick = self.nick.current().to_string();
        (self.current_nick.clone(), self.nick.upcoming())
    }

    /// Every fallback was rejected; the next attempt starts one step further.
    pub fn nicks_exhausted(&mut self) {
        let next = self.nick.next_nick();
        warn!(network = %self.network.name, next, "all nicks in use, will retry");
    }

    pub fn outbound(&self) -> OutboundRelay {
        OutboundRelay {
            network: self.network.name.clone(),
            channel: self.network.channel.clone(),
            templates: Arc::clone(&self.templates),
        }
    }

    /// React to one protocol event.
    pub fn handle_event(&mut self, event: &irc::proto::Message) -> Result<Vec<Action>, RenderError> {
        let mut actions = Vec::new();

        let code = message::event_code(event);
        if self.bridge.forwards(&code) {
            if let Some(msg) = self.relayable(&code, event)? {
                actions.push(Action::Publish(Arc::new(msg)));
            }
        }

        match &event.command {
            Command::Response(Response::RPL_WELCOME, args) => {
                if let Some(nick) = args.first() {
                    self.nick.sync_to(nick);
                    self.current_nick = nick.clone();
                }
                self.registered = true;
                info!(network = %self.network.name, nick = %self.current_nick, channel = %self.network.channel, "registered, joining");
                actions.push(Action::Join {
                    channel: self.network.channel.clone(),
                });
            }
            Command::Response(Response::ERR_NICKNAMEINUSE | Response::ERR_ERRONEOUSNICKNAME, _)
                if !self.registered =>
            {
                // The client resends NICK from the same rotation; keep in step.
                let next = self.nick.next_nick().to_string();
                info!(network = %self.network.name, rejected = %self.current_nick, next = %next, "nick refused");
                self.current_nick = next;
            }
            Command::NICK(new_nick) if self.is_self(event) => {
                info!(network = %self.network.name, from = %self.current_nick, to = %new_nick, "nick changed");
                self.current_nick = new_nick.clone();
            }
            _ => {}
        }

        Ok(actions)
    }

    fn is_self(&self, event: &irc::proto::Message) -> bool {
        event
            .source_nickname()
            .is_some_and(|nick| nick.eq_ignore_ascii_case(&self.current_nick))
    }

    fn relayable(&self, code: &str, event: &irc::proto::Message) -> Result<Option<Message>, RenderError> {
        if self.is_self(event) {
            debug!(network = %self.network.name, code, "ignoring own event");
            return Ok(None);
        }

        let msg = Message::from_irc(&self.network.name, code, event);
        let template = self.templates.resolve(code);
        let text = self.templates.render(template, &msg)?;
        info!(network = %self.network.name, template = template.key(), "{}", text);
        Ok(Some(msg))
    }
}

/// Outbound half of an actor: bus messages to channel text.
#[derive(Clone)]
pub struct OutboundRelay {
    network: String,
    channel: String,
    templates: Arc<TemplateSet>,
}

impl OutboundRelay {
    /// Format a relayed message for this network's channel. Messages that
    /// originated here produce nothing.
    pub fn handle_relayed(&self, msg: &Message) -> Result<Vec<Action>, RenderError> {
        if msg.network == self.network {
            return Ok(Vec::new());
        }

        // CTCP framing from another network must not be replayed here.
        let text = self.templates.format(msg)?.replace('\x01', "");

        if msg.event_code.eq_ignore_ascii_case(TOPIC_CODE) {
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(vec![Action::SetTopic {
                channel: self.channel.clone(),
                text: format!("{} (set by {})", text, msg.nick),
            }]);
        }

        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Action::SendMessage {
                channel: self.channel.clone(),
                text: line.to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconnectConfig;
    use std::collections::HashMap;

    fn bridge_config(nicks: &[&str], forward: &[&str], templates: &[(&str, &str)]) -> BridgeConfig {
        BridgeConfig {
            nicks: nicks.iter().map(|n| n.to_string()).collect(),
            username: "relay".into(),
            realname: None,
            networks: vec![network("X", "#a"), network("Y", "#b")],
            forward: forward.iter().map(|f| f.to_string()).collect(),
            templates: templates
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            timestamp_format: "%H:%M".into(),
            queue_capacity: 8,
            reconnect: ReconnectConfig::default(),
        }
    }

    fn network(name: &str, channel: &str) -> NetworkConfig {
        NetworkConfig {
            name: name.into(),
            address: "irc.example.org:6667".into(),
            channel: channel.into(),
            tls: None,
            password: None,
            accept_invalid_certs: false,
        }
    }

    fn actor(name: &str, nicks: &[&str]) -> NetworkActor {
        let bridge = bridge_config(
            nicks,
            &["PRIVMSG", "TOPIC", "NICK"],
            &[("default", "[{{.network}}] <{{.nick}}> {{.body}}"), ("TOPIC", "{{.body}}")],
        );
        let templates = TemplateSet::compile(&bridge.templates, &bridge.timestamp_format).unwrap();
        let network = bridge.networks.iter().find(|n| n.name == name).unwrap().clone();
        NetworkActor::new(network, Arc::new(bridge), Arc::new(templates))
    }

    fn event(line: &str) -> irc::proto::Message {
        line.parse().unwrap()
    }

    fn published(actions: &[Action]) -> Vec<&Message> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Publish(m) => Some(m.as_ref()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_welcome_joins_configured_channel() {
        let mut x = actor("X", &["relay", "relay_"]);
        let actions = x.handle_event(&event(":srv.example 001 relay_ :Welcome")).unwrap();
        assert!(matches!(&actions[..], [Action::Join { channel }] if channel == "#a"));
        assert_eq!(x.current_nick, "relay_");
        assert!(x.is_registered());
    }

    #[test]
    fn test_forwarded_event_is_published_with_origin() {
        let mut x = actor("X", &["relay"]);
        let actions = x.handle_event(&event(":alice!a@h PRIVMSG #a :hi")).unwrap();
        let msgs = published(&actions);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].network, "X");
        assert_eq!(msgs[0].event_code, "PRIVMSG");
        assert_eq!(msgs[0].nick, "alice");
        assert_eq!(msgs[0].body, "hi");
    }

    #[test]
    fn test_unforwarded_event_is_ignored() {
        let mut x = actor("X", &["relay"]);
        assert!(x.handle_event(&event(":alice!a@h NOTICE #a :psst")).unwrap().is_empty());
    }

    #[test]
    fn test_own_event_is_never_published() {
        let mut x = actor("X", &["relay"]);
        assert!(x.handle_event(&event(":relay!r@h PRIVMSG #a :hi")).unwrap().is_empty());
        assert!(x.handle_event(&event(":RELAY!r@h PRIVMSG #a :hi")).unwrap().is_empty());
    }

    #[test]
    fn test_nick_collisions_cycle_through_candidates() {
        let mut x = actor("X", &["a", "b", "c"]);
        let (nick, fallbacks) = x.begin_connection();
        assert_eq!(nick, "a");
        assert_eq!(fallbacks, ["b", "c", "a"]);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let actions = x
                .handle_event(&event(":srv.example 433 * a :Nickname is already in use"))
                .unwrap();
            assert!(actions.is_empty());
            seen.push(x.current_nick.to_string());
        }
        assert_eq!(seen, ["b", "c", "a"]);
    }

    #[test]
    fn test_erroneous_nick_advances_like_a_collision() {
        let mut x = actor("X", &["a", "b", "c"]);
        x.begin_connection();
        x.handle_event(&event(":srv.example 432 * a :Erroneous Nickname")).unwrap();
        assert_eq!(x.current_nick, "b");

        x.handle_event(&event(":srv.example 001 b :Welcome")).unwrap();
        let (nick, fallbacks) = x.begin_connection();
        assert_eq!(nick, "b");
        assert_eq!(fallbacks, ["c", "a", "b"]);
    }

    #[test]
    fn test_welcome_moves_cursor_to_registered_nick() {
        let mut x = actor("X", &["a", "b", "c"]);
        x.begin_connection();
        x.handle_event(&event(":srv.example 001 c :Welcome")).unwrap();
        x.nicks_exhausted();
        let (nick, _) = x.begin_connection();
        assert_eq!(nick, "a");
    }

    #[test]
    fn test_self_echo_guard_follows_nick_changes() {
        let mut x = actor("X", &["a", "b"]);
        x.handle_event(&event(":srv.example 433 * a :Nickname is already in use")).unwrap();
        assert!(x.handle_event(&event(":b!r@h PRIVMSG #a :hi")).unwrap().is_empty());

        // Our own NICK change is not relayed, but it moves the guard.
        assert!(x.handle_event(&event(":b!r@h NICK renamed")).unwrap().is_empty());
        assert_eq!(x.current_nick, "renamed");
        assert!(x.handle_event(&event(":renamed!r@h PRIVMSG #a :hi")).unwrap().is_empty());
        assert_eq!(published(&x.handle_event(&event(":b!r@h PRIVMSG #a :hi")).unwrap()).len(), 1);
    }

    #[test]
    fn test_exhausted_nicks_advance_next_attempt() {
        let mut x = actor("X", &["a", "b"]);
        x.nicks_exhausted();
        let (nick, fallbacks) = x.begin_connection();
        assert_eq!(nick, "b");
        assert_eq!(fallbacks, ["a", "b"]);
    }

    #[test]
    fn test_outbound_skips_own_network() {
        let mut x = actor("X", &["relay"]);
        let actions = x.handle_event(&event(":alice!a@h PRIVMSG #a :hi")).unwrap();
        let msg = published(&actions)[0];
        assert!(x.outbound().handle_relayed(msg).unwrap().is_empty());

        let y = actor("Y", &["relay"]);
        let sent = y.outbound().handle_relayed(msg).unwrap();
        assert!(matches!(
            &sent[..],
            [Action::SendMessage { channel, text }] if channel == "#b" && text == "[X] <alice> hi"
        ));
    }

    #[test]
    fn test_outbound_topic_is_a_topic_command() {
        let mut x = actor("X", &["relay"]);
        let actions = x.handle_event(&event(":alice!a@h TOPIC #a :release on friday")).unwrap();
        let msg = published(&actions)[0];
        let y = actor("Y", &["relay"]);
        let sent = y.outbound().handle_relayed(msg).unwrap();
        assert!(matches!(
            &sent[..],
            [Action::SetTopic { channel, text }]
                if channel == "#b" && text == "release on friday (set by alice)"
        ));
    }

    #[test]
    fn test_outbound_strips_ctcp_and_skips_empty_text() {
        let mut x = actor("X", &["relay"]);
        let actions = x.handle_event(&event(":alice!a@h PRIVMSG #a :\x01ACTION waves\x01")).unwrap();
        let msg = published(&actions)[0];
        let y = actor("Y", &["relay"]);
        let sent = y.outbound().handle_relayed(msg).unwrap();
        assert!(matches!(
            &sent[..],
            [Action::SendMessage { text, .. }] if text == "[X] <alice> ACTION waves"
        ));

        let topic = x.handle_event(&event(":alice!a@h TOPIC #a :")).unwrap();
        assert!(y.outbound().handle_relayed(published(&topic)[0]).unwrap().is_empty());
    }
}
