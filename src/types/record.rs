//! Message records exchanged between the background session and the caller

use bytes::Bytes;
use std::time::SystemTime;

use super::topics;

/// Whether a record was received from the broker or published by us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Sent,
    Received,
}

/// One unit of traffic on the publish/subscribe session.
///
/// Records are immutable once built. Within one drained batch they are in
/// receipt order, with connection lifecycle events interleaved under the
/// reserved [`topics::STATUS`] topic.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub direction: Direction,
    pub topic: String,
    /// Raw payload bytes (zero-copy via `Bytes`)
    pub payload: Bytes,
    pub timestamp: SystemTime,
}

impl MessageRecord {
    pub fn new(direction: Direction, topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            direction,
            topic: topic.into(),
            payload: payload.into(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn received(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self::new(Direction::Received, topic, payload)
    }

    pub fn sent(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self::new(Direction::Sent, topic, payload)
    }

    /// Synthesize a lifecycle record under the reserved status topic.
    ///
    /// The payload is a JSON string literal so status records parse like
    /// every other text telemetry message.
    pub fn status(text: &str) -> Self {
        let payload = serde_json::Value::String(text.to_string()).to_string();
        Self::received(topics::STATUS, payload)
    }

    /// Payload as UTF-8 text, if it is valid text.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    pub fn is_topic(&self, topic: &str) -> bool {
        self.topic == topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_records_are_quoted_json() {
        let record = MessageRecord::status("Connection lost");
        assert_eq!(record.direction, Direction::Received);
        assert_eq!(record.topic, topics::STATUS);
        assert_eq!(record.payload_str(), Some("\"Connection lost\""));

        let quoted = MessageRecord::status("say \"hi\"");
        let parsed: String = serde_json::from_slice(&quoted.payload).unwrap();
        assert_eq!(parsed, "say \"hi\"");
    }

    #[test]
    fn binary_payload_is_not_text() {
        let record = MessageRecord::received(topics::DATA_SAMPLES, vec![0xff, 0xfe, 0x00]);
        assert!(record.payload_str().is_none());
        assert!(record.is_topic(topics::DATA_SAMPLES));
    }
}
