//! The relay bus: one actor per network, one hub fanning messages out
//! between them.
//!
//! Data flows protocol event → actor (filter, tag) → hub → every actor's
//! queue → actor (drop own messages, format) → protocol send.

pub mod action;
pub mod actor;
pub mod hub;
pub mod message;
pub mod nick;
pub mod supervisor;

use crate::config::ValidatedConfig;
use actor::NetworkActor;
use anyhow::{bail, Result};
use hub::Hub;
use std::sync::Arc;
use supervisor::Supervisor;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Start every network and the hub, then run until a fatal error or until
/// every network has been given up on.
pub async fn run(validated: ValidatedConfig) -> Result<()> {
    let ValidatedConfig {
        config,
        templates,
        addresses,
    } = validated;

    let (mut hub, handle) = Hub::new(config.queue_capacity);
    let mut supervisors = JoinSet::new();

    for (network, address) in config.networks.iter().zip(addresses) {
        let outlet = hub.subscribe(&network.name);
        let actor = NetworkActor::new(network.clone(), Arc::clone(&config), Arc::clone(&templates));
        let supervisor = Supervisor::new(actor, address, outlet, handle.clone(), config.reconnect.clone());
        let name = network.name.clone();
        supervisors.spawn(async move { (name, supervisor.run().await) });
    }
    drop(handle);

    tokio::spawn(hub.run());
    info!(networks = config.networks.len(), "relay started");

    while let Some(joined) = supervisors.join_next().await {
        match joined {
            Ok((_, Err(err))) => return Err(err.into()),
            Ok((name, Ok(()))) => error!(network = %name, "network stopped"),
            Err(join_err) => bail!("network task failed: {join_err}"),
        }
    }

    bail!("every network has stopped")
}

#[cfg(test)]
mod tests {
    //! End-to-end runs of the bus with parsed protocol lines standing in for
    //! live connections.

    use super::action::Action;
    use super::actor::{NetworkActor, OutboundRelay};
    use super::hub::{Hub, HubHandle};
    use super::message::SharedMessage;
    use crate::config::{self, ValidatedConfig};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const CONFIG: &str = r##"{
        "nicks": ["relay"],
        "username": "relay",
        "networks": [
            { "name": "X", "address": "irc.x.example:6667", "channel": "#a" },
            { "name": "Y", "address": "irc.y.example:6667", "channel": "#b" }
        ],
        "forward": ["PRIVMSG"],
        "templates": { "default": "[{{.network}}] <{{.nick}}> {{.body}}" }
    }"##;

    struct Node {
        actor: NetworkActor,
        outbound: OutboundRelay,
        queue: mpsc::Receiver<SharedMessage>,
    }

    fn bus() -> (Vec<Node>, HubHandle) {
        let ValidatedConfig { config, templates, .. } =
            config::validate(serde_json::from_str(CONFIG).unwrap()).unwrap();
        let (mut hub, handle) = Hub::new(8);
        let nodes = config
            .networks
            .iter()
            .map(|network| {
                let queue = hub.subscribe(&network.name);
                let actor = NetworkActor::new(network.clone(), Arc::clone(&config), Arc::clone(&templates));
                let outbound = actor.outbound();
                Node { actor, outbound, queue }
            })
            .collect();
        tokio::spawn(hub.run());
        (nodes, handle)
    }

    /// Feed one protocol line to a node and publish whatever it produces.
    async fn observe(node: &mut Node, hub: &HubHandle, line: &str) -> usize {
        let mut published = 0;
        for action in node.actor.handle_event(&line.parse().unwrap()).unwrap() {
            if let Action::Publish(msg) = action {
                hub.publish(msg).await.unwrap();
                published += 1;
            }
        }
        published
    }

    /// Everything a node would send after consuming its next queued message.
    async fn deliver_next(node: &mut Node) -> Vec<Action> {
        let msg = timeout(Duration::from_secs(1), node.queue.recv())
            .await
            .expect("delivery timed out")
            .expect("hub stopped");
        node.outbound.handle_relayed(&msg).unwrap()
    }

    #[tokio::test]
    async fn test_message_reaches_other_network_only() {
        let (mut nodes, hub) = bus();
        assert_eq!(observe(&mut nodes[0], &hub, ":alice!a@h PRIVMSG #a :hi").await, 1);

        let on_x = deliver_next(&mut nodes[0]).await;
        assert!(on_x.is_empty());

        let on_y = deliver_next(&mut nodes[1]).await;
        assert!(matches!(
            &on_y[..],
            [Action::SendMessage { channel, text }] if channel == "#b" && text == "[X] <alice> hi"
        ));
    }

    #[tokio::test]
    async fn test_own_message_is_never_published() {
        let (mut nodes, hub) = bus();
        assert_eq!(observe(&mut nodes[0], &hub, ":relay!r@h PRIVMSG #a :hi").await, 0);
        assert!(timeout(Duration::from_millis(100), nodes[1].queue.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_both_directions_keep_order() {
        let (mut nodes, hub) = bus();
        observe(&mut nodes[0], &hub, ":alice!a@h PRIVMSG #a :one").await;
        observe(&mut nodes[1], &hub, ":bob!b@h PRIVMSG #b :two").await;
        observe(&mut nodes[0], &hub, ":alice!a@h PRIVMSG #a :three").await;

        let mut sent_on_x = Vec::new();
        let mut sent_on_y = Vec::new();
        for _ in 0..3 {
            sent_on_x.extend(deliver_next(&mut nodes[0]).await);
            sent_on_y.extend(deliver_next(&mut nodes[1]).await);
        }

        let texts = |actions: &[Action]| -> Vec<String> {
            actions
                .iter()
                .filter_map(|a| match a {
                    Action::SendMessage { text, .. } => Some(text.clone()),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(texts(&sent_on_x[..]), ["[Y] <bob> two"]);
        assert_eq!(texts(&sent_on_y[..]), ["[X] <alice> one", "[X] <alice> three"]);
    }
}
