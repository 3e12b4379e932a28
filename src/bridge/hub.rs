//! Relay hub: the single fan-out point of the bus.
//!
//! Actors publish into one shared inbound queue. A single loop takes each
//! message in arrival order and hands it to every actor's queue, in
//! configuration order, so all actors observe the same total order.
//!
//! Hand-off awaits queue capacity. A stalled actor therefore holds up
//! delivery to every actor after it until it catches up; messages are never
//! dropped to avoid that.

use crate::bridge::message::SharedMessage;
use crate::error::RelayError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Publishing side of the hub, one clone per actor.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<SharedMessage>,
}

impl HubHandle {
    pub async fn publish(&self, message: SharedMessage) -> Result<(), RelayError> {
        self.tx.send(message).await.map_err(|_| RelayError::HubClosed)
    }
}

struct Outlet {
    network: String,
    tx: mpsc::Sender<SharedMessage>,
    closed: bool,
}

pub struct Hub {
    inbound: mpsc::Receiver<SharedMessage>,
    outlets: Vec<Outlet>,
    capacity: usize,
}

impl Hub {
    /// `capacity` bounds the inbound queue and every actor queue.
    pub fn new(capacity: usize) -> (Self, HubHandle) {
        let (tx, inbound) = mpsc::channel(capacity);
        let hub = Self {
            inbound,
            outlets: Vec::new(),
            capacity,
        };
        (hub, HubHandle { tx })
    }

    /// Register an actor's queue. Delivery follows registration order.
    pub fn subscribe(&mut self, network: &str) -> mpsc::Receiver<SharedMessage> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.outlets.push(Outlet {
            network: network.to_string(),
            tx,
            closed: false,
        });
        rx
    }

    /// Broadcast until every [`HubHandle`] has been dropped.
    pub async fn run(mut self) {
        while let Some(message) = self.inbound.recv().await {
            debug!(network = %message.network, code = %message.event_code, "broadcasting");
            for outlet in self.outlets.iter_mut().filter(|o| !o.closed) {
                if outlet.tx.send(message.clone()).await.is_err() {
                    warn!(network = %outlet.network, "actor queue closed, no longer delivering to it");
                    outlet.closed = true;
                }
            }
        }
        debug!("hub inbound queue closed");
    }
}
