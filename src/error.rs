//! Error types for streaming session control.
//!
//! The session paths themselves (begin, end, renewal) never fail: unknown
//! peers, dropped commands and sink hiccups are policy outcomes that get
//! logged. Errors surface only at the edges of the crate, where the
//! controller talks to configuration files, transports, event sources and
//! counter sinks.
//!
//! ## Error Categories
//!
//! - **Configuration Errors**: Invalid renewal policy or unreadable config files
//! - **Transport Errors**: A command could not be written to the peer link
//! - **Sink Errors**: The downstream counter consumer rejected an update
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use orbstream::StreamingError;
//!
//! let error = StreamingError::transport_failed("radio link dropped");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for streaming operations.
pub type Result<T, E = StreamingError> = std::result::Result<T, E>;

/// Main error type for streaming operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamingError {
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Config file error: {path}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {details}")]
    ConfigParse {
        details: String,
        #[source]
        source: Option<serde_yaml_ng::Error>,
    },

    #[error("Transport failed to deliver command: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Counter sink rejected update: {reason}")]
    Sink { reason: String },
}

impl StreamingError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamingError::Transport { .. } => true,
            StreamingError::Sink { .. } => true,
            StreamingError::Config { .. } => false,
            StreamingError::ConfigFile { .. } => false,
            StreamingError::ConfigParse { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamingError::Config { .. } => vec![
                "Keep the renewal threshold below the renewal batch size",
                "Keep the renewal batch size within one byte (1..=255)",
            ],
            StreamingError::ConfigFile { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            StreamingError::ConfigParse { .. } => vec![
                "Check the YAML syntax",
                "Compare field names against BridgeConfig",
            ],
            StreamingError::Transport { .. } => vec![
                "Check the peer is still connected",
                "Move the host closer to the robot",
                "Re-enable streaming once the link recovers",
            ],
            StreamingError::Sink { .. } => vec![
                "Check the downstream consumer is still running",
                "Drop counter updates if the consumer cannot keep up",
            ],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        StreamingError::Config { reason: reason.into() }
    }

    /// Helper constructor for config file errors with path context.
    pub fn config_file_error(path: PathBuf, source: std::io::Error) -> Self {
        StreamingError::ConfigFile { path, source }
    }

    /// Helper constructor for transport errors.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        StreamingError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamingError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for counter sink errors.
    pub fn sink_rejected(reason: impl Into<String>) -> Self {
        StreamingError::Sink { reason: reason.into() }
    }
}

impl From<serde_yaml_ng::Error> for StreamingError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        StreamingError::ConfigParse { details: err.to_string(), source: Some(err) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(reason in "[a-zA-Z0-9 ]+") {
            let transport = StreamingError::transport_failed(reason.clone());
            let config = StreamingError::invalid_config(reason.clone());
            let sink = StreamingError::sink_rejected(reason.clone());

            prop_assert!(transport.to_string().contains(&reason));
            prop_assert!(config.to_string().contains(&reason));
            prop_assert!(sink.to_string().contains(&reason));
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<StreamingError>();

        let error = StreamingError::transport_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(StreamingError::transport_failed("lost").is_retryable());
        assert!(StreamingError::sink_rejected("busy").is_retryable());
        assert!(!StreamingError::invalid_config("bad").is_retryable());

        for suggestion in StreamingError::transport_failed("lost").recovery_suggestions() {
            assert!(suggestion.len() > 5);
        }
    }

    #[test]
    fn transport_source_is_chained() {
        let io = std::io::Error::other("radio busy");
        let error = StreamingError::transport_failed_with_source("write failed", Box::new(io));

        let source = std::error::Error::source(&error).expect("source should be kept");
        assert_eq!(source.to_string(), "radio busy");
    }

    #[test]
    fn yaml_errors_convert_to_parse_errors() {
        let yaml_err = serde_yaml_ng::from_str::<u32>("not: [a number").unwrap_err();
        let error: StreamingError = yaml_err.into();
        assert!(matches!(error, StreamingError::ConfigParse { source: Some(_), .. }));
    }
}
