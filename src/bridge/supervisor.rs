//! Per-network supervision.
//!
//! A [`Supervisor`] owns one network's actor and its hub queue for the life of
//! the process. Each connection is a session; when a session ends the
//! supervisor either restarts it after a backoff, gives up on that network
//! alone, or reports a fatal error that ends the whole bridge.

use crate::bridge::action::Action;
use crate::bridge::actor::{NetworkActor, OutboundRelay};
use crate::bridge::hub::HubHandle;
use crate::bridge::message::SharedMessage;
use crate::config::{ReconnectConfig, ServerAddress};
use crate::error::RelayError;
use crate::irc::connection::{self, IrcConnection, Registration};
use futures::StreamExt;
use irc::client::prelude::Command;
use rand::RngExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// How a session ended, beyond the error itself.
enum SessionEnd {
    Failed(RelayError),
    /// Every candidate nick was rejected during registration.
    NicksExhausted,
}

pub struct Supervisor {
    actor: NetworkActor,
    address: ServerAddress,
    outlet: mpsc::Receiver<SharedMessage>,
    hub: HubHandle,
    policy: ReconnectConfig,
}

impl Supervisor {
    pub fn new(
        actor: NetworkActor,
        address: ServerAddress,
        outlet: mpsc::Receiver<SharedMessage>,
        hub: HubHandle,
        policy: ReconnectConfig,
    ) -> Self {
        Self {
            actor,
            address,
            outlet,
            hub,
            policy,
        }
    }

    /// Keep the network connected. Returns `Ok` if the supervisor gave up on
    /// this network, `Err` for conditions that must end the process.
    pub async fn run(mut self) -> Result<(), RelayError> {
        let mut failures: u32 = 0;

        loop {
            let end = self.run_session().await;
            if self.actor.is_registered() {
                failures = 0;
            }

            let err = match end {
                SessionEnd::NicksExhausted => {
                    self.actor.nicks_exhausted();
                    let delay = Duration::from_secs(self.policy.base_delay_secs);
                    self.drain_for(delay).await?;
                    continue;
                }
                SessionEnd::Failed(err) => err,
            };

            if err.is_fatal() || !self.policy.enabled {
                return Err(err);
            }

            failures += 1;
            if failures >= self.policy.max_failures {
                error!(network = %self.actor.name(), failures, "giving up on network: {err}");
                return Ok(());
            }

            let delay = backoff_delay(&self.policy, failures, rand::rng().random_range(0.0..=0.25));
            warn!(network = %self.actor.name(), attempt = failures, ?delay, "{err}; reconnecting");
            self.drain_for(delay).await?;
        }
    }

    async fn run_session(&mut self) -> SessionEnd {
        let Supervisor {
            actor,
            address,
            outlet,
            hub,
            ..
        } = self;

        let (nickname, alt_nicks) = actor.begin_connection();
        let network = actor.name().to_string();
        info!(
            network = %network,
            host = %address.host,
            port = address.port,
            tls = address.tls,
            channel = %actor.network().channel,
            nick = %nickname,
            "connecting"
        );

        let registration = Registration {
            nickname,
            alt_nicks,
            username: &actor.bridge().username,
            realname: actor.bridge().realname(),
        };
        let conn = match connection::connect(actor.network(), address, registration).await {
            Ok(conn) => conn,
            Err(source) => return SessionEnd::Failed(RelayError::Connect { network, source }),
        };

        let IrcConnection { sender, mut stream } = conn;
        let outbound = actor.outbound();

        // Inbound and outbound progress independently: a publish waiting on
        // the hub never stops this actor from draining its own queue.
        let inbound = async {
            while let Some(event) = stream.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(irc::error::Error::NoUsableNick) => return SessionEnd::NicksExhausted,
                    Err(source) => {
                        return SessionEnd::Failed(RelayError::Protocol {
                            network: network.clone(),
                            source,
                        })
                    }
                };
                let actions = match actor.handle_event(&event) {
                    Ok(actions) => actions,
                    Err(source) => {
                        return SessionEnd::Failed(RelayError::Render {
                            network: network.clone(),
                            source,
                        })
                    }
                };
                for action in actions {
                    if let Err(err) = perform(&network, &sender, hub, action).await {
                        return SessionEnd::Failed(err);
                    }
                }
            }
            SessionEnd::Failed(RelayError::Disconnected {
                network: network.clone(),
            })
        };

        let relay = relay_outbound(&network, &outbound, &sender, outlet);

        tokio::select! {
            end = inbound => end,
            err = relay => SessionEnd::Failed(err),
        }
    }

    /// Wait out a backoff, consuming whatever the hub delivers meanwhile so
    /// this network never stalls the bus while it is down.
    async fn drain_for(&mut self, delay: Duration) -> Result<(), RelayError> {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                message = self.outlet.recv() => match message {
                    Some(message) => debug!(
                        network = %self.actor.name(),
                        from = %message.network,
                        code = %message.event_code,
                        "not connected, dropping relayed message"
                    ),
                    None => return Err(RelayError::HubClosed),
                },
            }
        }
    }
}

/// Consume relayed messages and emit them on this connection. Only returns
/// on failure.
async fn relay_outbound(
    network: &str,
    outbound: &OutboundRelay,
    sender: &irc::client::Sender,
    outlet: &mut mpsc::Receiver<SharedMessage>,
) -> RelayError {
    while let Some(message) = outlet.recv().await {
        let actions = match outbound.handle_relayed(&message) {
            Ok(actions) => actions,
            Err(source) => {
                return RelayError::Render {
                    network: network.to_string(),
                    source,
                }
            }
        };
        for action in actions {
            info!(network, from = %message.network, code = %message.event_code, "relaying");
            if let Err(source) = send(sender, action) {
                return RelayError::Protocol {
                    network: network.to_string(),
                    source,
                };
            }
        }
    }
    RelayError::HubClosed
}

async fn perform(
    network: &str,
    sender: &irc::client::Sender,
    hub: &HubHandle,
    action: Action,
) -> Result<(), RelayError> {
    match action {
        Action::Publish(message) => hub.publish(message).await,
        action => send(sender, action).map_err(|source| RelayError::Protocol {
            network: network.to_string(),
            source,
        }),
    }
}

fn send(sender: &irc::client::Sender, action: Action) -> irc::error::Result<()> {
    match action {
        Action::Join { channel } => sender.send_join(&channel),
        Action::SendMessage { channel, text } => sender.send_privmsg(&channel, &text),
        Action::SetTopic { channel, text } => sender.send(Command::TOPIC(channel, Some(text))),
        // Publishing is handled by the session, never by the connection.
        Action::Publish(_) => Ok(()),
    }
}

/// `base * 2^(failures-1)`, capped at the configured maximum, stretched by
/// `jitter` (a fraction in `0.0..=1.0`).
fn backoff_delay(policy: &ReconnectConfig, failures: u32, jitter: f64) -> Duration {
    let exp = failures.saturating_sub(1).min(16);
    let secs = policy
        .base_delay_secs
        .saturating_mul(1u64 << exp)
        .min(policy.max_delay_secs);
    Duration::try_from_secs_f64(secs as f64 * (1.0 + jitter)).unwrap_or(Duration::MAX)
}
