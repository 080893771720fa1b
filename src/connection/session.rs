//! Background session: event pump and command loop
//!
//! Runs on its own thread inside a current-thread runtime. The pump turns
//! transport events into inbox records; the command loop executes publish,
//! subscribe and disconnect requests queued by the caller. Neither ever
//! waits on the other.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SessionState;
use super::inbox::Inbox;
use crate::transport::{EventSource, TransportClient, TransportEvent, TransportPair};
use crate::types::{MessageRecord, Qos, topics};

/// Requests from the caller thread to the session.
#[derive(Debug)]
pub(crate) enum Command {
    Publish { topic: String, payload: Bytes, qos: Qos },
    Subscribe { filter: String, qos: Qos },
    Disconnect,
}

pub(crate) async fn run_session(
    transport: TransportPair,
    commands: mpsc::UnboundedReceiver<Command>,
    requeue: mpsc::UnboundedSender<Command>,
    inbox: Arc<Inbox>,
    cancel: CancellationToken,
    close_grace: Duration,
) {
    let TransportPair { client, events } = transport;

    let mut pump =
        tokio::spawn(pump_events(events, requeue, Arc::clone(&inbox), cancel.clone()));

    run_commands(client, commands, Arc::clone(&inbox), cancel.clone()).await;

    // let the transport report the close before tearing it down
    if tokio::time::timeout(close_grace, &mut pump).await.is_err() {
        debug!("Transport did not close within {:?}, cancelling", close_grace);
        cancel.cancel();
        let _ = pump.await;
    }

    inbox.set_state(SessionState::Disconnected);
    info!("Session ended");
}

async fn pump_events(
    mut events: Box<dyn EventSource>,
    requeue: mpsc::UnboundedSender<Command>,
    inbox: Arc<Inbox>,
    cancel: CancellationToken,
) {
    let mut received = 0u64;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Event pump cancelled");
                break;
            }
            event = events.next_event() => event,
        };

        match event {
            Some(TransportEvent::Message { topic, payload }) => {
                received += 1;
                inbox.push(MessageRecord::received(topic, payload));
            }
            Some(TransportEvent::Accepted) => {
                info!("Broker accepted the session");
                inbox.set_state(SessionState::Connected);
                inbox.push(MessageRecord::status("Connection accepted"));
                for command in initial_commands() {
                    let _ = requeue.send(command);
                }
            }
            Some(TransportEvent::Rejected(reason)) => {
                warn!("Broker rejected the session: {}", reason);
                inbox.push(MessageRecord::status(&reason));
                break;
            }
            Some(TransportEvent::Closed) => {
                info!("Session closed");
                inbox.push(MessageRecord::status("Connection lost"));
                break;
            }
            Some(TransportEvent::Error(error)) => {
                warn!("Transport error: {}", error);
                inbox.push(MessageRecord::status(&error));
                break;
            }
            None => {
                inbox.push(MessageRecord::status("Connection lost"));
                break;
            }
        }
    }

    // no reconnect: the session stays down until the caller connects again
    if inbox.state() != SessionState::Closing {
        inbox.set_state(SessionState::Disconnected);
    }
    debug!(received, "Event pump stopped");
}

/// Put the amplifier in a known idle state and subscribe to its topics.
fn initial_commands() -> Vec<Command> {
    let idle = [topics::IMPEDANCE_STOP, topics::SAMPLING_STOP].into_iter().map(|topic| {
        Command::Publish {
            topic: topic.to_string(),
            payload: Bytes::from_static(b"1"),
            qos: Qos::AtLeastOnce,
        }
    });
    let subscriptions = topics::SUBSCRIPTIONS
        .iter()
        .map(|(filter, qos)| Command::Subscribe { filter: filter.to_string(), qos: *qos });
    idle.chain(subscriptions).collect()
}

async fn run_commands(
    client: Arc<dyn TransportClient>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    inbox: Arc<Inbox>,
    cancel: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            _ = cancel.cancelled() => break,
            command = commands.recv() => command,
        };

        match command {
            Some(Command::Publish { topic, payload, qos }) => {
                match client.publish(&topic, payload.clone(), qos) {
                    Ok(()) => inbox.push(MessageRecord::sent(topic, payload)),
                    Err(e) => {
                        warn!("{}", e);
                        inbox.push(MessageRecord::status(&e.to_string()));
                    }
                }
            }
            Some(Command::Subscribe { filter, qos }) => {
                if let Err(e) = client.subscribe(&filter, qos) {
                    warn!("{}", e);
                    inbox.push(MessageRecord::status(&e.to_string()));
                } else {
                    debug!(filter = %filter, ?qos, "Subscribed");
                }
            }
            Some(Command::Disconnect) => {
                if let Err(e) = client.disconnect() {
                    debug!("Disconnect request failed: {}", e);
                }
                break;
            }
            None => break,
        }
    }
}
