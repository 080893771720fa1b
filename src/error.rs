//! Error types for the amplifier bridge.
//!
//! All errors implement the `std::error::Error` trait and carry enough
//! context to be logged and skipped. Nothing in the streaming core is fatal:
//! the bridge reports an anomaly and keeps streaming.
//!
//! ## Error Categories
//!
//! - **Session Errors**: using a session that was never connected, or a broker failure
//! - **Decode Errors**: malformed or degenerate sample payloads
//! - **Channel Mismatch**: a run whose channel count differs from the montage
//! - **Parse Errors**: JSON or scalar telemetry that cannot be read
//! - **Configuration Errors**: invalid settings or unknown montage IDs
//! - **Sink Errors**: the downstream stream endpoint refused a sample
//!
//! ## Recovery
//!
//! ```rust
//! use f1stream::BridgeError;
//!
//! let error = BridgeError::connection_failed("broker refused the session");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Not connected")]
    NotConnected,

    #[error("Connection to amplifier failed: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Sample decode error in {context}: {details}")]
    Decode { context: String, details: String },

    #[error("Channel count mismatch: configured {expected}, run carries {found}")]
    ChannelMismatch { expected: usize, found: usize },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Sample sink error: {reason}")]
    Sink {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BridgeError {
    /// Returns whether this error is potentially recoverable by the operator restarting
    /// the session.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::NotConnected => true,
            BridgeError::Connection { .. } => true,
            BridgeError::Sink { .. } => true,
            BridgeError::Decode { .. } => false,
            BridgeError::ChannelMismatch { .. } => false,
            BridgeError::Parse { .. } => false,
            BridgeError::Config { .. } => false,
            BridgeError::File { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::NotConnected => vec![
                "Call connect() before publishing or draining",
                "Check the session state before use",
            ],
            BridgeError::Connection { .. } => vec![
                "Ensure the amplifier is powered on and in range",
                "Check that the host is reachable on the MQTT port",
                "Restart the bridge to open a fresh session",
            ],
            BridgeError::Decode { .. } => vec![
                "Check amplifier firmware compatibility",
                "Verify the sample payload layout",
            ],
            BridgeError::ChannelMismatch { .. } => vec![
                "Select the montage that matches the amplifier configuration",
                "Restart sampling after changing the montage",
            ],
            BridgeError::Parse { .. } => vec![
                "Check the telemetry message format",
                "Verify source data integrity",
            ],
            BridgeError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Use one of the listed montage IDs",
            ],
            BridgeError::Sink { .. } => vec![
                "Check that the streaming layer is installed",
                "Verify the stream name is not already in use",
            ],
            BridgeError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        BridgeError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for sample decode errors.
    pub fn decode_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        BridgeError::Decode { context: context.into(), details: details.into() }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        BridgeError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(reason: impl Into<String>) -> Self {
        BridgeError::Config { reason: reason.into() }
    }

    /// Helper constructor for sink errors.
    pub fn sink_error(reason: impl Into<String>) -> Self {
        BridgeError::Sink { reason: reason.into(), source: None }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        BridgeError::File { path, source }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Parse { context: "JSON".to_string(), details: err.to_string() }
    }
}

impl From<serde_yaml_ng::Error> for BridgeError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        BridgeError::Config { reason: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_carry_their_context(
                reason in ".*",
                details in ".*",
                expected in 1usize..64,
                found in 1usize..64,
            ) {
                let connection_msg = BridgeError::connection_failed(reason.clone()).to_string();
                prop_assert!(connection_msg.contains(&reason));

                let decode_msg = BridgeError::decode_error("data/samples", details.clone()).to_string();
                prop_assert!(decode_msg.contains(&details));
                prop_assert!(decode_msg.contains("data/samples"));

                let mismatch_msg = BridgeError::ChannelMismatch { expected, found }.to_string();
                prop_assert!(mismatch_msg.contains(&expected.to_string()));
                prop_assert!(mismatch_msg.contains(&found.to_string()));
            }

            #[test]
            fn io_errors_convert_to_file_errors(reason in ".*") {
                let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, reason.clone());
                let converted: BridgeError = io_err.into();
                match converted {
                    BridgeError::File { source, .. } => {
                        prop_assert_eq!(source.to_string(), reason);
                    }
                    _ => prop_assert!(false, "Expected File error from io::Error conversion"),
                }
            }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<BridgeError>();

        let error = BridgeError::NotConnected;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(BridgeError::NotConnected.is_retryable());
        assert!(BridgeError::connection_failed("refused").is_retryable());
        assert!(!BridgeError::decode_error("payload", "short").is_retryable());
        assert!(!BridgeError::ChannelMismatch { expected: 2, found: 3 }.is_retryable());
    }

    #[test]
    fn every_variant_has_suggestions() {
        let errors = [
            BridgeError::NotConnected,
            BridgeError::connection_failed("x"),
            BridgeError::decode_error("x", "y"),
            BridgeError::ChannelMismatch { expected: 2, found: 23 },
            BridgeError::parse_error("x", "y"),
            BridgeError::config_error("x"),
            BridgeError::sink_error("x"),
            BridgeError::file_error(PathBuf::from("/x"), std::io::Error::other("gone")),
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "{error} has no suggestions");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn source_chain_is_preserved() {
        let inner: Box<dyn std::error::Error + Send + Sync> =
            Box::new(std::io::Error::other("socket reset"));
        let error = BridgeError::connection_failed_with_source("transport", inner);
        let source = std::error::Error::source(&error).expect("source should be present");
        assert!(source.to_string().contains("socket reset"));
    }

    #[test]
    fn json_errors_convert_to_parse_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(BridgeError::from(err), BridgeError::Parse { .. }));
    }
}
