//! Bridge from an F1 EEG amplifier's MQTT telemetry to a multichannel sample stream.
//!
//! The amplifier publishes packed binary sample blocks, marker events and
//! battery readings over a publish/subscribe session. This crate reassembles
//! the blocks into one evenly time-stamped sample stream with an event slot
//! and a running index slot per sample.
//!
//! # Features
//!
//! - **Background session**: the transport runs on its own thread; the caller drains an inbox
//! - **Run merging**: index-contiguous sample blocks are decoded as one run
//! - **Event alignment**: marker events land on exactly one sample
//! - **Pluggable output**: any [`SampleSink`]; an LSL outlet with the `lsl` feature
//!
//! # Example (loopback)
//!
//! ```rust,no_run
//! use f1stream::{Bridge, Connection, Montage, TracingSink};
//! use f1stream::transports::MemoryBroker;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> f1stream::Result<()> {
//!     let broker = MemoryBroker::new();
//!     let mut connection = Connection::new(broker.connector());
//!     connection.connect("loopback")?;
//!
//!     let mut bridge = Bridge::new(Montage::by_id(1)?, TracingSink::new());
//!     let shutdown = CancellationToken::new();
//!     bridge.run(&mut connection, shutdown).await
//! }
//! ```

// Core types and error handling
pub mod codec;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Session and transports
pub mod connection;
pub mod transport;
pub mod transports;

// Stream reconstruction
pub mod bridge;
pub mod config;
pub mod montage;
pub mod sink;
pub mod stream;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use bridge::{Bridge, BridgeStats};
pub use config::{BridgeConfig, BridgeTiming};
pub use connection::{Connection, Publisher, SessionState};
pub use montage::Montage;
pub use sink::{SampleSink, TracingSink};
pub use stream::{Reconstructor, StreamState};

#[cfg(feature = "lsl")]
pub use sink::LslSink;
