//! In-process loopback transport
//!
//! [`MemoryBroker`] stands in for the amplifier's broker: it decides whether
//! to accept a session, injects inbound messages and records what the
//! session published. Used by tests and `--dry-run`.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::transport::{Connector, EventSource, TransportClient, TransportEvent, TransportPair};
use crate::types::Qos;
use crate::{BridgeError, Result};

#[derive(Default)]
struct BrokerState {
    sender: Option<mpsc::UnboundedSender<TransportEvent>>,
    reject_with: Option<String>,
    published: Vec<(String, Bytes)>,
    subscriptions: Vec<(String, Qos)>,
    sessions_opened: usize,
    disconnects: usize,
}

/// Shared handle to the loopback broker. Cheap to clone.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next sessions with `reason`.
    pub fn reject_with(&self, reason: impl Into<String>) {
        self.state.lock().reject_with = Some(reason.into());
    }

    /// Deliver an inbound message to the open session.
    ///
    /// Returns `false` if no session is open.
    pub fn inject(&self, topic: &str, payload: impl Into<Bytes>) -> bool {
        self.inject_event(TransportEvent::Message { topic: topic.to_string(), payload: payload.into() })
    }

    /// Deliver any transport event to the open session.
    pub fn inject_event(&self, event: TransportEvent) -> bool {
        match &self.state.lock().sender {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Everything the session has published, in order.
    pub fn published(&self) -> Vec<(String, Bytes)> {
        self.state.lock().published.clone()
    }

    /// Payloads published to `topic`.
    pub fn published_to(&self, topic: &str) -> Vec<Bytes> {
        self.state
            .lock()
            .published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<(String, Qos)> {
        self.state.lock().subscriptions.clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.lock().sessions_opened
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector { broker: self.clone() }
    }
}

/// Connector that opens sessions on a [`MemoryBroker`].
#[derive(Clone)]
pub struct MemoryConnector {
    broker: MemoryBroker,
}

impl Connector for MemoryConnector {
    fn open(&self, host: &str) -> Result<TransportPair> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let first = match self.broker.state.lock().reject_with.clone() {
            Some(reason) => TransportEvent::Rejected(reason),
            None => TransportEvent::Accepted,
        };
        // the receiver is alive, so this cannot fail
        let _ = sender.send(first);

        {
            let mut state = self.broker.state.lock();
            state.sender = Some(sender);
            state.sessions_opened += 1;
        }
        debug!(host, "Memory session opened");

        Ok(TransportPair {
            client: Arc::new(MemoryClient { broker: self.broker.clone() }),
            events: Box::new(MemoryEvents { receiver }),
        })
    }
}

struct MemoryClient {
    broker: MemoryBroker,
}

impl TransportClient for MemoryClient {
    fn publish(&self, topic: &str, payload: Bytes, _qos: Qos) -> Result<()> {
        let mut state = self.broker.state.lock();
        if state.sender.is_none() {
            return Err(BridgeError::connection_failed(format!("publish {topic}: session closed")));
        }
        state.published.push((topic.to_string(), payload));
        Ok(())
    }

    fn subscribe(&self, filter: &str, qos: Qos) -> Result<()> {
        self.broker.state.lock().subscriptions.push((filter.to_string(), qos));
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        let mut state = self.broker.state.lock();
        state.disconnects += 1;
        if let Some(sender) = state.sender.take() {
            let _ = sender.send(TransportEvent::Closed);
        }
        Ok(())
    }
}

struct MemoryEvents {
    receiver: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait::async_trait]
impl EventSource for MemoryEvents {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.receiver.recv().await
    }
}
