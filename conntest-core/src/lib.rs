//! Core connection-attempt and classification engine for conntest.
//!
//! This crate provides everything the `dbconn-test` and `ldapconn-test`
//! binaries share: the properties-file loader, the database and directory
//! connectors, the outcome classifier, and the reporter.
//!
//! # Security Guarantees
//! - Passwords and directory credentials are held in `Zeroizing` containers
//! - Connection URLs are redacted before they are logged or reported
//! - Exactly one connection attempt is made per run; nothing is retried
//!
//! # Architecture
//! A run is a straight pipeline:
//! load config → connect → (search) → read metadata → close → classify → report.
//! Every stage returns values; only the binaries turn the final
//! [`Classification`] into a process exit code.

pub mod adapters;
pub mod error;
pub mod logging;
pub mod outcome;
pub mod properties;
pub mod report;
pub mod security;

// Re-export commonly used types
pub use adapters::{
    Connector, DatabaseConnector, DirectoryConnector, Probe, Session, run_attempt, run_probe,
};
pub use error::{ConntestError, Result};
pub use logging::init_logging;
pub use outcome::{
    Classification, ConnectionMetadata, DatabaseFailure, DatabaseMetadata, DirectoryFailure,
    FailureCause, Kind, RawError, classify,
};
pub use properties::ConnectionConfig;
pub use report::{ReportStyle, write_report};
pub use security::Credentials;
