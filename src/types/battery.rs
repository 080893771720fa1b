//! Battery telemetry side channel

use tracing::warn;

use super::topics;

/// Latest amplifier battery readings. Last write wins, no history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatteryStatus {
    pub charge_percent: Option<i32>,
    pub voltage: Option<f32>,
    pub critical: bool,
}

impl BatteryStatus {
    /// Apply a battery topic update. Returns `false` if the topic is not a battery topic.
    ///
    /// Unparsable values are logged and leave the previous reading in place.
    pub fn apply(&mut self, topic: &str, payload: &str) -> bool {
        let payload = payload.trim();
        match topic {
            topics::BATTERY_CHARGE => match payload.parse::<i32>() {
                Ok(charge) => self.charge_percent = Some(charge),
                Err(e) => warn!(payload, "Ignoring battery charge update: {}", e),
            },
            topics::BATTERY_VOLTAGE => match payload.parse::<f32>() {
                Ok(voltage) => self.voltage = Some(voltage),
                Err(e) => warn!(payload, "Ignoring battery voltage update: {}", e),
            },
            topics::BATTERY_CRITICAL => self.critical = payload == "true",
            _ => return false,
        }
        true
    }
}

impl std::fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.voltage {
            Some(v) => write!(f, "{v}V")?,
            None => f.write_str("?V")?,
        }
        match self.charge_percent {
            Some(c) => write!(f, " ({c}%)")?,
            None => f.write_str(" (?%)")?,
        }
        f.write_str(if self.critical { " !critical!" } else { " OK" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_overwrite_previous_values() {
        let mut battery = BatteryStatus::default();
        assert!(battery.apply(topics::BATTERY_CHARGE, "80"));
        assert!(battery.apply(topics::BATTERY_CHARGE, "79"));
        assert!(battery.apply(topics::BATTERY_VOLTAGE, "3.91"));
        assert_eq!(battery.charge_percent, Some(79));
        assert_eq!(battery.voltage, Some(3.91));
        assert!(!battery.critical);

        assert!(battery.apply(topics::BATTERY_CRITICAL, "true"));
        assert!(battery.critical);
        assert!(battery.apply(topics::BATTERY_CRITICAL, "false"));
        assert!(!battery.critical);
    }

    #[test]
    fn garbage_keeps_last_reading() {
        let mut battery = BatteryStatus::default();
        battery.apply(topics::BATTERY_VOLTAGE, "3.7");
        battery.apply(topics::BATTERY_VOLTAGE, "n/a");
        assert_eq!(battery.voltage, Some(3.7));
    }

    #[test]
    fn other_topics_are_not_consumed() {
        let mut battery = BatteryStatus::default();
        assert!(!battery.apply(topics::DATA_EVENT, "{}"));
        assert_eq!(battery, BatteryStatus::default());
    }

    #[test]
    fn display_reports_critical() {
        let battery = BatteryStatus { charge_percent: Some(5), voltage: Some(3.2), critical: true };
        assert_eq!(battery.to_string(), "3.2V (5%) !critical!");
    }
}
