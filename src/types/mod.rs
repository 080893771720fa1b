//! Core data types shared by the session, the codec and the reconstructor.
//!
//! - [`MessageRecord`] is one unit of traffic drained from the session inbox
//! - [`OutputSample`] is one reconstructed multichannel sample
//! - [`BatteryStatus`] holds the last battery readings reported by the amplifier
//! - [`topics`] names every topic the bridge reads or writes

mod battery;
mod record;
mod sample;
pub mod topics;

pub use battery::BatteryStatus;
pub use record::{Direction, MessageRecord};
pub use sample::OutputSample;
pub use topics::Qos;
