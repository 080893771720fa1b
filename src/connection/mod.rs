//! Publish/subscribe session with the amplifier
//!
//! A [`Connection`] owns at most one active session. Connecting spawns a
//! background thread that runs the transport; everything it receives, and
//! everything it successfully publishes, is appended to a shared inbox that
//! the caller empties with [`Connection::drain`]. Lifecycle changes show up
//! in the same inbox as status records on the reserved `mqtt` topic.
//!
//! ```rust
//! use f1stream::connection::Connection;
//! use f1stream::transports::MemoryBroker;
//!
//! # fn main() -> f1stream::Result<()> {
//! let broker = MemoryBroker::new();
//! let mut connection = Connection::new(broker.connector());
//! connection.connect("loopback")?;
//! connection.publish("action/sampling/stop", "")?;
//! let records = connection.drain()?;
//! connection.disconnect();
//! # let _ = records;
//! # Ok(())
//! # }
//! ```

mod inbox;
mod session;


use bytes::Bytes;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transport::Connector;
use crate::types::{MessageRecord, Qos};
use crate::{BridgeError, Result};
use inbox::Inbox;
use session::Command;

/// How long a disconnect waits for the transport to confirm the close.
const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle of the background session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SessionState {
    #[default]
    Disconnected = 0,
    /// Transport opened, waiting for the broker
    Connecting = 1,
    Connected = 2,
    /// Disconnect requested
    Closing = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Connecting,
            2 => SessionState::Connected,
            3 => SessionState::Closing,
            _ => SessionState::Disconnected,
        }
    }
}

/// Anything the bridge can publish commands through.
pub trait Publisher {
    fn publish(&self, topic: &str, payload: Bytes) -> Result<()>;
}

/// Handle to a running session.
struct ActiveSession {
    commands: mpsc::UnboundedSender<Command>,
    inbox: Arc<Inbox>,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

/// Publish/subscribe session owned by the caller.
pub struct Connection {
    connector: Box<dyn Connector>,
    session: Option<ActiveSession>,
    close_grace: Duration,
}

impl Connection {
    pub fn new(connector: impl Connector) -> Self {
        Self { connector: Box::new(connector), session: None, close_grace: DEFAULT_CLOSE_GRACE }
    }

    /// Bound on how long [`disconnect`](Self::disconnect) waits for the broker.
    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Open a session to `host` and start the background thread.
    ///
    /// Any session already open is disconnected first. Returns once the
    /// thread is running; acceptance or refusal by the broker arrives later
    /// as a status record.
    pub fn connect(&mut self, host: &str) -> Result<()> {
        self.disconnect();

        info!(host, "Connecting");
        let transport = self.connector.open(host)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BridgeError::connection_failed_with_source("session runtime", Box::new(e)))?;

        let inbox = Arc::new(Inbox::default());
        inbox.set_state(SessionState::Connecting);
        let (commands, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let thread = {
            let inbox = Arc::clone(&inbox);
            let requeue = commands.clone();
            let cancel = cancel.clone();
            let grace = self.close_grace;
            std::thread::Builder::new()
                .name("f1stream-session".to_string())
                .spawn(move || {
                    runtime.block_on(session::run_session(
                        transport, receiver, requeue, inbox, cancel, grace,
                    ));
                })
                .map_err(|e| BridgeError::connection_failed_with_source("session thread", Box::new(e)))?
        };

        self.session = Some(ActiveSession { commands, inbox, cancel, thread: Some(thread) });
        Ok(())
    }

    /// Stop the session and join its thread.
    ///
    /// Safe to call at any time, including when never connected. Once this
    /// returns no further record is appended.
    pub fn disconnect(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.inbox.set_state(SessionState::Closing);
        if session.commands.send(Command::Disconnect).is_err() {
            session.cancel.cancel();
        }

        if let Some(thread) = session.thread.take() {
            if thread.join().is_err() {
                warn!("Session thread panicked");
            }
        }
        session.inbox.set_state(SessionState::Disconnected);
        debug!("Disconnected");
    }

    /// Queue a publish with at-least-once delivery.
    ///
    /// The record shows up in the inbox once the transport has accepted it;
    /// transport failures arrive as status records.
    pub fn publish(&self, topic: &str, payload: impl Into<Bytes>) -> Result<()> {
        let session = self.session.as_ref().ok_or(BridgeError::NotConnected)?;
        session
            .commands
            .send(Command::Publish {
                topic: topic.to_string(),
                payload: payload.into(),
                qos: Qos::AtLeastOnce,
            })
            .map_err(|_| BridgeError::connection_failed("session thread has stopped"))
    }

    /// Take every record appended since the previous drain, in arrival order.
    pub fn drain(&self) -> Result<Vec<MessageRecord>> {
        let session = self.session.as_ref().ok_or(BridgeError::NotConnected)?;
        Ok(session.inbox.drain())
    }

    pub fn state(&self) -> SessionState {
        self.session.as_ref().map_or(SessionState::Disconnected, |s| s.inbox.state())
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }
}

impl Publisher for Connection {
    fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        Connection::publish(self, topic, payload)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("state", &self.state()).finish_non_exhaustive()
    }
}
