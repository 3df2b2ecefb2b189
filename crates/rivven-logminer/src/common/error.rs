//! Error types for log mining operations
//!
//! Includes error classification for retry decisions and alerting. The
//! advancer relies on [`CdcError::is_retriable`] to decide between backing
//! off and surfacing a fatal error.

use crate::common::resilience::RetriableErrorType;
use crate::logminer::Scn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error categories for metrics and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Catalog/engine unavailable (connection, privileges)
    Database,
    /// Log window errors (gaps, inconsistent catalog, registration)
    Window,
    /// Configuration errors (invalid settings)
    Configuration,
    /// Network errors (timeouts)
    Network,
    /// Serialization errors (offset records)
    Serialization,
    /// Other/unknown errors
    Other,
}

/// Log mining errors
#[derive(Error, Debug)]
pub enum CdcError {
    /// Segment catalog could not be queried
    #[error("Log catalog unavailable: {0}")]
    SourceUnavailable(String),

    /// Resolved window has a hole; history in this range cannot be recovered
    #[error("Capture gap: no log segment covers SCN range [{from}, {to})")]
    WindowGap { from: Scn, to: Scn },

    /// The mining engine rejected a segment
    #[error("Failed to register log segment '{segment}': {reason}")]
    RegistrationFailed { segment: String, reason: String },

    /// The catalog contradicts itself in a way the tie-break cannot settle
    #[error("Catalog inconsistency: {0}")]
    CatalogInconsistency(String),

    /// Mining engine error while starting, reading or ending a pass
    #[error("Mining error: {0}")]
    Mining(String),

    /// Unparseable SCN
    #[error("Invalid SCN: {0}")]
    InvalidScn(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CdcError {
    /// Create a source unavailable error
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create a window gap error for the missing range `[from, to)`
    pub fn window_gap(from: Scn, to: Scn) -> Self {
        Self::WindowGap { from, to }
    }

    /// Create a registration failure for a segment
    pub fn registration_failed(segment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RegistrationFailed {
            segment: segment.into(),
            reason: reason.into(),
        }
    }

    /// Create a catalog inconsistency error
    pub fn catalog_inconsistency(msg: impl Into<String>) -> Self {
        Self::CatalogInconsistency(msg.into())
    }

    /// Create a mining error
    pub fn mining(msg: impl Into<String>) -> Self {
        Self::Mining(msg.into())
    }

    /// Create an invalid SCN error
    pub fn invalid_scn(msg: impl Into<String>) -> Self {
        Self::InvalidScn(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Check if this error is a capture gap.
    pub fn is_gap(&self) -> bool {
        matches!(self, Self::WindowGap { .. })
    }

    /// Check if this error is retriable.
    ///
    /// Retriable errors restart the whole cycle from `clear()`. A capture gap
    /// is never retriable: retrying would either fail again or, worse,
    /// succeed after the catalog forgot the missing range.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::SourceUnavailable(_) => true,
            Self::RegistrationFailed { .. } => true,
            Self::CatalogInconsistency(_) => true,
            Self::Mining(_) => true,
            Self::Timeout(_) => true,

            Self::Io(e) => {
                use std::io::ErrorKind;
                matches!(
                    e.kind(),
                    ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionAborted
                        | ErrorKind::TimedOut
                        | ErrorKind::Interrupted
                )
            }

            Self::WindowGap { .. }
            | Self::InvalidScn(_)
            | Self::Config(_)
            | Self::Serialization(_)
            | Self::Json(_)
            | Self::InvalidState(_)
            | Self::Other(_) => false,
        }
    }

    /// Get the retriable error type, if applicable.
    pub fn retriable_error_type(&self) -> Option<RetriableErrorType> {
        match self {
            Self::SourceUnavailable(_) => Some(RetriableErrorType::SourceUnavailable),
            Self::RegistrationFailed { .. } => Some(RetriableErrorType::SegmentPurged),
            Self::CatalogInconsistency(_) => Some(RetriableErrorType::CatalogInFlux),
            Self::Timeout(_) => Some(RetriableErrorType::Timeout),
            _ if self.is_retriable() => Some(RetriableErrorType::TemporaryFailure),
            _ => None,
        }
    }

    /// Get the error category for metrics and alerting.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SourceUnavailable(_) => ErrorCategory::Database,
            Self::Mining(_) => ErrorCategory::Database,
            Self::WindowGap { .. } => ErrorCategory::Window,
            Self::RegistrationFailed { .. } => ErrorCategory::Window,
            Self::CatalogInconsistency(_) => ErrorCategory::Window,
            Self::InvalidScn(_) => ErrorCategory::Configuration,
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Timeout(_) => ErrorCategory::Network,
            Self::Io(_) => ErrorCategory::Network,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Json(_) => ErrorCategory::Serialization,
            Self::InvalidState(_) => ErrorCategory::Other,
            Self::Other(_) => ErrorCategory::Other,
        }
    }

    /// Get a metric-safe error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::WindowGap { .. } => "window_gap",
            Self::RegistrationFailed { .. } => "registration_failed",
            Self::CatalogInconsistency(_) => "catalog_inconsistency",
            Self::Mining(_) => "mining_error",
            Self::InvalidScn(_) => "invalid_scn",
            Self::Config(_) => "config_error",
            Self::Timeout(_) => "timeout",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
            Self::Json(_) => "json_error",
            Self::InvalidState(_) => "invalid_state",
            Self::Other(_) => "unknown",
        }
    }
}

/// Result type for log mining operations
pub type Result<T> = std::result::Result<T, CdcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CdcError::window_gap(Scn::from(100u64), Scn::from(200u64));
        assert_eq!(
            err.to_string(),
            "Capture gap: no log segment covers SCN range [100, 200)"
        );

        let err = CdcError::registration_failed("/u01/arch/1_42.arc", "ORA-01291");
        assert!(err.to_string().contains("1_42.arc"));
        assert!(err.to_string().contains("ORA-01291"));
    }

    #[test]
    fn test_error_is_retriable() {
        assert!(CdcError::source_unavailable("connection lost").is_retriable());
        assert!(CdcError::registration_failed("x", "purged").is_retriable());
        assert!(CdcError::timeout("read").is_retriable());
        assert!(CdcError::mining("ORA-01013").is_retriable());

        assert!(!CdcError::window_gap(Scn::from(1u64), Scn::from(2u64)).is_retriable());
        assert!(!CdcError::config("bad config").is_retriable());
        assert!(!CdcError::other("unknown").is_retriable());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            CdcError::source_unavailable("x").category(),
            ErrorCategory::Database
        );
        assert_eq!(
            CdcError::window_gap(Scn::from(1u64), Scn::from(2u64)).category(),
            ErrorCategory::Window
        );
        assert_eq!(
            CdcError::config("x").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(CdcError::timeout("x").category(), ErrorCategory::Network);
    }

    #[test]
    fn test_error_retriable_type() {
        assert_eq!(
            CdcError::source_unavailable("x").retriable_error_type(),
            Some(RetriableErrorType::SourceUnavailable)
        );
        assert_eq!(
            CdcError::registration_failed("x", "y").retriable_error_type(),
            Some(RetriableErrorType::SegmentPurged)
        );
        assert_eq!(
            CdcError::mining("x").retriable_error_type(),
            Some(RetriableErrorType::TemporaryFailure)
        );
        assert_eq!(
            CdcError::window_gap(Scn::from(1u64), Scn::from(2u64)).retriable_error_type(),
            None
        );
    }

    #[test]
    fn test_error_code() {
        assert_eq!(
            CdcError::window_gap(Scn::from(1u64), Scn::from(2u64)).error_code(),
            "window_gap"
        );
        assert_eq!(CdcError::timeout("x").error_code(), "timeout");
        assert_eq!(CdcError::config("x").error_code(), "config_error");
    }
}
