//! Out-of-band marker events and their alignment to sample positions

use serde_json::Value;
use tracing::debug;

use crate::{BridgeError, Result};

/// The most recent marker event and whether it has been emitted yet.
///
/// A new `data/event` message replaces any pending event. Once the
/// reconstructor reaches the event's position the value is emitted on that
/// one sample and never again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventState {
    pub pending_value: f32,
    pub pending_position: u32,
    pub delivered: bool,
}

impl Default for EventState {
    fn default() -> Self {
        Self { pending_value: 0.0, pending_position: 0, delivered: true }
    }
}

impl EventState {
    /// Apply a `data/event` JSON payload.
    ///
    /// Unsigned `kind` sets the event value; unsigned `lower` sets the sample
    /// position and arms the event. Other fields and non-integer values are
    /// ignored.
    pub fn apply(&mut self, payload: &[u8]) -> Result<()> {
        let message: Value = serde_json::from_slice(payload)?;
        let object = message
            .as_object()
            .ok_or_else(|| BridgeError::parse_error("data/event", "expected a JSON object"))?;

        if let Some(kind) = object.get("kind").and_then(Value::as_u64) {
            self.pending_value = kind as f32;
        }
        if let Some(lower) = object.get("lower").and_then(Value::as_u64) {
            self.pending_position = u32::try_from(lower).unwrap_or(u32::MAX);
            self.delivered = false;
        }

        debug!(
            value = self.pending_value,
            position = self.pending_position,
            armed = !self.delivered,
            "Event updated"
        );
        Ok(())
    }

    /// Event slot value for the sample at `position`.
    pub fn resolve(&mut self, position: u32) -> f32 {
        if !self.delivered && position >= self.pending_position {
            self.delivered = true;
            self.pending_value
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_fires_once_at_its_position() {
        let mut events = EventState::default();
        events.apply(br#"{"kind": 7, "lower": 3}"#).unwrap();

        let slots: Vec<f32> = (0..6).map(|p| events.resolve(p)).collect();
        assert_eq!(slots, vec![0.0, 0.0, 0.0, 7.0, 0.0, 0.0]);
    }

    #[test]
    fn late_event_lands_on_next_sample() {
        let mut events = EventState::default();
        events.apply(br#"{"kind": 2, "lower": 10}"#).unwrap();
        assert_eq!(events.resolve(15), 2.0);
        assert_eq!(events.resolve(16), 0.0);
    }

    #[test]
    fn idle_state_emits_nothing() {
        let mut events = EventState::default();
        assert_eq!(events.resolve(0), 0.0);
        assert_eq!(events.resolve(u32::MAX), 0.0);
    }

    #[test]
    fn non_integer_fields_are_ignored() {
        let mut events = EventState::default();
        events.apply(br#"{"kind": 1.5, "lower": -4, "upper": 9}"#).unwrap();
        assert!(events.delivered);
        assert_eq!(events.pending_value, 0.0);
    }

    #[test]
    fn new_event_rearms_after_delivery() {
        let mut events = EventState::default();
        events.apply(br#"{"kind": 1, "lower": 0}"#).unwrap();
        assert_eq!(events.resolve(0), 1.0);
        events.apply(br#"{"kind": 4, "lower": 2}"#).unwrap();
        assert_eq!(events.resolve(1), 0.0);
        assert_eq!(events.resolve(2), 4.0);
    }

    #[test]
    fn malformed_payloads_are_errors() {
        let mut events = EventState::default();
        assert!(events.apply(b"not json").is_err());
        assert!(events.apply(b"[1, 2]").is_err());
        assert_eq!(events, EventState::default());
    }
}
