//! Transport trait for publish/subscribe sessions
//!
//! A transport is opened by a [`Connector`] and split into two halves:
//! the [`EventSource`], owned by the background event pump, and the
//! [`TransportClient`], shared with the command loop. Client calls never
//! block on the network; they queue the request for the transport's own
//! event loop.

use bytes::Bytes;
use std::sync::Arc;

use crate::Result;
use crate::types::Qos;

/// Everything the session needs to know about the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The broker accepted the session
    Accepted,
    /// The broker refused the session
    Rejected(String),
    /// An inbound publish
    Message { topic: String, payload: Bytes },
    /// The session ended (either side)
    Closed,
    /// Network or protocol failure; the transport will not recover
    Error(String),
}

/// Inbound half of a transport.
#[async_trait::async_trait]
pub trait EventSource: Send + 'static {
    /// Wait for the next event.
    ///
    /// Returns:
    /// - `Some(event)` - a lifecycle event or inbound message
    /// - `None` - the transport is finished and will produce nothing more
    async fn next_event(&mut self) -> Option<TransportEvent>;
}

/// Outbound half of a transport.
pub trait TransportClient: Send + Sync + 'static {
    fn publish(&self, topic: &str, payload: Bytes, qos: Qos) -> Result<()>;

    fn subscribe(&self, filter: &str, qos: Qos) -> Result<()>;

    /// Ask the broker to end the session; completion is reported as
    /// [`TransportEvent::Closed`] on the event source.
    fn disconnect(&self) -> Result<()>;
}

/// Both halves of an opened transport.
pub struct TransportPair {
    pub client: Arc<dyn TransportClient>,
    pub events: Box<dyn EventSource>,
}

/// Factory for transports; one call per session.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, host: &str) -> Result<TransportPair>;
}
