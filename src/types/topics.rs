//! Topic names used by the amplifier's publish/subscribe protocol

/// Device description, JSON. May carry `scale_to_uV`.
pub const DEVICE_INFO: &str = "state/device/info";
/// Packed binary sample records.
pub const DATA_SAMPLES: &str = "data/samples";
/// Marker events, JSON with `kind` and `lower`.
pub const DATA_EVENT: &str = "data/event";
pub const BATTERY_CHARGE: &str = "state/battery/amp/charge";
pub const BATTERY_VOLTAGE: &str = "state/battery/amp/voltage";
pub const BATTERY_CRITICAL: &str = "state/battery/amp/critical";

pub const SAMPLING_START: &str = "action/sampling/start";
pub const SAMPLING_STOP: &str = "action/sampling/stop";
pub const IMPEDANCE_STOP: &str = "action/impedance/stop";

/// Reserved topic for synthesized connection lifecycle records.
pub const STATUS: &str = "mqtt";

/// Subscription filters issued once the broker accepts the session.
pub const SUBSCRIPTIONS: [(&str, Qos); 3] =
    [("state/#", Qos::AtLeastOnce), ("error", Qos::AtLeastOnce), ("data/#", Qos::AtMostOnce)];

/// Delivery guarantee requested for a publish or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
}
