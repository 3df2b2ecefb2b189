//! Oracle error classification
//!
//! Driver errors arrive as message text carrying an `ORA-nnnnn` code. The code
//! decides whether a cycle is retried, and how.
//!
//! A driver-backed [`MiningEngine`](super::MiningEngine) or
//! [`LogCatalog`](super::LogCatalog) passes its driver messages through
//! [`OracleError::from_message`] and converts the result into a
//! [`CdcError`]. [`MemoryMiningEngine`](super::MemoryMiningEngine) reports its
//! injected failures the same way.

use crate::common::CdcError;
use thiserror::Error;

/// Oracle-specific LogMiner errors
#[derive(Error, Debug)]
pub enum OracleError {
    /// Connection lost or instance not open
    #[error("Oracle connection error (ORA-{code:05}): {message}")]
    Connection { code: u32, message: String },

    /// Missing grants on the catalog views or `DBMS_LOGMNR`
    #[error("Insufficient privileges (ORA-{code:05}): {message}. Grant LOGMINING and SELECT on V_$LOG, V_$LOGFILE, V_$ARCHIVED_LOG, V_$DATABASE")]
    InsufficientPrivileges { code: u32, message: String },

    /// Log file cannot be opened (purged, moved, or overwritten)
    #[error("Log file '{file}' unavailable (ORA-{code:05}): {message}")]
    MissingLogFile {
        code: u32,
        file: String,
        message: String,
    },

    /// Log file already registered with the session
    #[error("Log file '{0}' is already registered (ORA-01289)")]
    DuplicateLogFile(String),

    /// Mining pass started without any registered file
    #[error("No log file registered (ORA-01292)")]
    NoLogFileRegistered,

    /// No LogMiner session to read from or end
    #[error("No active LogMiner session (ORA-{code:05})")]
    NoActiveSession { code: u32 },

    /// Statement cancelled, usually by a client-side timeout
    #[error("Operation cancelled (ORA-01013): {0}")]
    Cancelled(String),

    /// Any other failure
    #[error("Oracle error: {0}")]
    Query(String),
}

impl OracleError {
    /// Classify a driver message. `file` names the log file the statement
    /// referred to, if any.
    pub fn from_message(message: &str, file: Option<&str>) -> Self {
        let Some(code) = ora_code(message) else {
            return Self::Query(message.to_string());
        };
        let message = message.to_string();
        match code {
            // end-of-file on channel, not connected, lost contact, listener,
            // service unknown, connect timeout, init/shutdown in progress
            3113 | 3114 | 3135 | 12541 | 12514 | 12170 | 1033 | 1034 | 1089 => {
                Self::Connection { code, message }
            }
            1031 | 942 | 1435 => Self::InsufficientPrivileges { code, message },
            // missing log file, cannot open, cannot identify/lock
            1291 | 308 | 1284 | 313 | 312 => Self::MissingLogFile {
                code,
                file: file.unwrap_or("unknown").to_string(),
                message,
            },
            1289 => Self::DuplicateLogFile(file.unwrap_or("unknown").to_string()),
            1292 => Self::NoLogFileRegistered,
            1306 | 1307 => Self::NoActiveSession { code },
            1013 => Self::Cancelled(message),
            _ => Self::Query(message),
        }
    }
}

/// Extract the first `ORA-nnnnn` code from a message.
pub fn ora_code(message: &str) -> Option<u32> {
    let start = message.find("ORA-")? + 4;
    let digits: String = message[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

impl From<OracleError> for CdcError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Connection { .. } => CdcError::source_unavailable(err.to_string()),
            OracleError::InsufficientPrivileges { .. } => CdcError::config(err.to_string()),
            OracleError::MissingLogFile { file, message, .. } => {
                CdcError::registration_failed(file, message)
            }
            OracleError::DuplicateLogFile(file) => {
                CdcError::registration_failed(file, "already registered")
            }
            OracleError::Cancelled(msg) => CdcError::timeout(msg),
            OracleError::NoLogFileRegistered
            | OracleError::NoActiveSession { .. }
            | OracleError::Query(_) => {
                CdcError::mining(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ora_code_parsing() {
        assert_eq!(
            ora_code("ORA-03113: end-of-file on communication channel"),
            Some(3113)
        );
        assert_eq!(ora_code("java.sql.SQLException: ORA-01291: missing log file"), Some(1291));
        assert_eq!(ora_code("ORA-: garbage"), None);
        assert_eq!(ora_code("no code here"), None);
    }

    #[test]
    fn test_connection_loss_is_retriable() {
        let err = OracleError::from_message("ORA-03113: end-of-file on communication channel", None);
        assert!(matches!(err, OracleError::Connection { code: 3113, .. }));

        let cdc: CdcError = err.into();
        assert!(matches!(cdc, CdcError::SourceUnavailable(_)));
        assert!(cdc.is_retriable());
    }

    #[test]
    fn test_missing_log_file_names_the_file() {
        let err = OracleError::from_message(
            "ORA-01291: missing log file",
            Some("/u01/arch/1_42_1122.arc"),
        );
        let cdc: CdcError = err.into();
        match cdc {
            CdcError::RegistrationFailed { segment, reason } => {
                assert_eq!(segment, "/u01/arch/1_42_1122.arc");
                assert!(reason.contains("ORA-01291"));
            }
            other => panic!("expected registration failure, got {other:?}"),
        }
    }

    #[test]
    fn test_privileges_are_fatal() {
        let err = OracleError::from_message("ORA-01031: insufficient privileges", None);
        assert!(err.to_string().contains("LOGMINING"));

        let cdc: CdcError = err.into();
        assert!(matches!(cdc, CdcError::Config(_)));
        assert!(!cdc.is_retriable());
    }

    #[test]
    fn test_cancel_maps_to_timeout() {
        let cdc: CdcError =
            OracleError::from_message("ORA-01013: user requested cancel of current operation", None)
                .into();
        assert!(matches!(cdc, CdcError::Timeout(_)));
    }

    #[test]
    fn test_unknown_code_is_mining_error() {
        let cdc: CdcError = OracleError::from_message("ORA-00600: internal error code", None).into();
        assert!(matches!(cdc, CdcError::Mining(_)));
        assert!(cdc.is_retriable());
    }

    #[test]
    fn test_no_active_session() {
        let err = OracleError::from_message(
            "ORA-01307: no LogMiner session is currently active",
            None,
        );
        assert!(matches!(err, OracleError::NoActiveSession { code: 1307 }));
        assert!(matches!(CdcError::from(err), CdcError::Mining(_)));
    }
}
