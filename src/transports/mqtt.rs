//! MQTT transport over `rumqttc`

use bytes::Bytes;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, QoS,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::transport::{Connector, EventSource, TransportClient, TransportEvent, TransportPair};
use crate::types::Qos;
use crate::{BridgeError, Result};

/// The amplifier publishes sample blocks well above rumqttc's default limit.
const MAX_PACKET_SIZE: usize = 1024 * 1024;

/// Connection parameters for the amplifier's broker.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    /// Requests queued between the client and the event loop
    pub request_capacity: usize,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            port: 1883,
            client_id: "f1stream".to_string(),
            keep_alive: Duration::from_secs(5),
            request_capacity: 64,
        }
    }
}

/// Opens clean MQTT sessions with fixed settings.
#[derive(Debug, Clone, Default)]
pub struct MqttConnector {
    settings: MqttSettings,
}

impl MqttConnector {
    pub fn new(settings: MqttSettings) -> Self {
        Self { settings }
    }
}

impl Connector for MqttConnector {
    fn open(&self, host: &str) -> Result<TransportPair> {
        let settings = &self.settings;
        info!(host, port = settings.port, client_id = %settings.client_id, "Opening MQTT session");

        let mut options = MqttOptions::new(settings.client_id.clone(), host, settings.port);
        options
            .set_keep_alive(settings.keep_alive)
            .set_clean_session(true)
            .set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

        let (client, eventloop) = AsyncClient::new(options, settings.request_capacity);

        Ok(TransportPair {
            client: Arc::new(MqttClient { client }),
            events: Box::new(MqttEvents { eventloop, finished: false }),
        })
    }
}

impl From<Qos> for QoS {
    fn from(qos: Qos) -> Self {
        match qos {
            Qos::AtMostOnce => QoS::AtMostOnce,
            Qos::AtLeastOnce => QoS::AtLeastOnce,
        }
    }
}

struct MqttClient {
    client: AsyncClient,
}

impl TransportClient for MqttClient {
    fn publish(&self, topic: &str, payload: Bytes, qos: Qos) -> Result<()> {
        self.client
            .try_publish(topic, qos.into(), false, payload.to_vec())
            .map_err(|e| BridgeError::connection_failed_with_source(format!("publish {topic}"), Box::new(e)))
    }

    fn subscribe(&self, filter: &str, qos: Qos) -> Result<()> {
        self.client
            .try_subscribe(filter, qos.into())
            .map_err(|e| BridgeError::connection_failed_with_source(format!("subscribe {filter}"), Box::new(e)))
    }

    fn disconnect(&self) -> Result<()> {
        self.client
            .try_disconnect()
            .map_err(|e| BridgeError::connection_failed_with_source("disconnect", Box::new(e)))
    }
}

struct MqttEvents {
    eventloop: EventLoop,
    /// Set after a terminal event; the event loop is never polled again
    /// because polling would reconnect.
    finished: bool,
}

#[async_trait::async_trait]
impl EventSource for MqttEvents {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        while !self.finished {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    debug!(session_present = ack.session_present, "CONNACK");
                    return Some(match ack.code {
                        ConnectReturnCode::Success => TransportEvent::Accepted,
                        code => {
                            self.finished = true;
                            TransportEvent::Rejected(describe_return_code(code).to_string())
                        }
                    });
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Some(TransportEvent::Message {
                        topic: publish.topic,
                        payload: publish.payload,
                    });
                }
                Ok(Event::Incoming(Packet::Disconnect))
                | Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    self.finished = true;
                    return Some(TransportEvent::Closed);
                }
                Ok(other) => trace!(?other, "MQTT event"),
                Err(ConnectionError::ConnectionRefused(code)) => {
                    self.finished = true;
                    return Some(TransportEvent::Rejected(describe_return_code(code).to_string()));
                }
                Err(e) => {
                    self.finished = true;
                    return Some(TransportEvent::Error(e.to_string()));
                }
            }
        }
        None
    }
}

fn describe_return_code(code: ConnectReturnCode) -> &'static str {
    match code {
        ConnectReturnCode::Success => "Connection accepted",
        ConnectReturnCode::RefusedProtocolVersion => "Connection refused: unacceptable protocol version",
        ConnectReturnCode::BadClientId => "Connection refused: identifier rejected",
        ConnectReturnCode::ServiceUnavailable => "Connection refused: server unavailable",
        ConnectReturnCode::BadUserNamePassword => "Connection refused: bad user name or password",
        ConnectReturnCode::NotAuthorized => "Connection refused: not authorized",
    }
}
