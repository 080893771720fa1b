//! Transport implementations

pub mod memory;
pub mod mqtt;

pub use memory::{MemoryBroker, MemoryConnector};
pub use mqtt::{MqttConnector, MqttSettings};
