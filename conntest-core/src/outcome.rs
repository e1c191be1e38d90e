//! Attempt results and their classification into exit codes.
//!
//! A run produces exactly one `Result<ConnectionMetadata, RawError>`, and
//! [`classify`] turns it into exactly one [`Classification`]. The mapping is a
//! pure function so that every branch of the exit-code table can be tested
//! without spawning processes or reaching a server.
//!
//! | kind                    | exit | source                                   |
//! |-------------------------|------|------------------------------------------|
//! | `Ok`                    | 0    | connected (and searched, for LDAP)       |
//! | `ConnectionError`       | 1    | any database or directory failure        |
//! | `UnknownError`          | 1    | directory run, failure of no known kind  |
//! | `ConfigError`           | 2    | properties file missing or unreadable    |
//! | `InternalInconsistency` | 2    | a result the probe can never produce     |

use crate::adapters::Probe;
use crate::properties::ConfigFileError;
use std::fmt;
use thiserror::Error;

/// Prefix of every directory failure message.
pub const DIRECTORY_FAILURE_PREFIX: &str = "Connection failure! ";

/// Message of the internal-inconsistency classification.
pub const UNKNOWN_STATE_MESSAGE: &str = "Unknown state!";

/// Raw failure of a run, before classification.
#[derive(Debug, Error)]
pub enum RawError {
    /// The properties file could not be read
    #[error(transparent)]
    Io(#[from] ConfigFileError),

    /// Checked failure from the database driver
    #[error(transparent)]
    Database(#[from] DatabaseFailure),

    /// Checked failure from the directory protocol layer
    #[error(transparent)]
    Directory(#[from] DirectoryFailure),

    /// Failure that belongs to none of the categories above
    #[error("{0}")]
    Other(String),
}

impl RawError {
    /// Creates an unrecognized failure
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// One link of a database failure chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureCause {
    /// Human-readable message
    pub message: String,
    /// SQLSTATE (or vendor) code, when this cause carries one
    pub sql_state: Option<String>,
}

impl FailureCause {
    /// Creates a cause
    pub fn new(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self {
            message: message.into(),
            sql_state,
        }
    }
}

/// Database failure with its full cause chain, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseFailure {
    causes: Vec<FailureCause>,
}

impl DatabaseFailure {
    /// Creates a failure with a single cause
    pub fn new(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self {
            causes: vec![FailureCause::new(message, sql_state)],
        }
    }

    /// Builds a failure by walking `error` and its `source()` chain.
    ///
    /// `state_of` extracts a state code from any link that is itself a
    /// driver-level failure.
    pub fn from_error_chain<F>(error: &(dyn std::error::Error + 'static), state_of: F) -> Self
    where
        F: Fn(&(dyn std::error::Error + 'static)) -> Option<String>,
    {
        let mut causes = Vec::new();
        let mut current = Some(error);
        while let Some(link) = current {
            causes.push(FailureCause::new(link.to_string(), state_of(link)));
            current = link.source();
        }
        Self { causes }
    }

    /// Appends a further cause to the chain
    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_cause(mut self, cause: FailureCause) -> Self {
        self.causes.push(cause);
        self
    }

    /// All causes, outermost first
    pub fn causes(&self) -> &[FailureCause] {
        &self.causes
    }

    /// Renders one line per cause, each followed by a `SQLSTATE:` line when
    /// that cause carries a code.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.causes.len());
        for cause in &self.causes {
            lines.push(cause.message.clone());
            if let Some(state) = &cause.sql_state {
                lines.push(format!("SQLSTATE: {}", state));
            }
        }
        lines.join("\n")
    }
}

impl fmt::Display for DatabaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.causes.first() {
            Some(cause) => f.write_str(&cause.message),
            None => f.write_str("database failure"),
        }
    }
}

impl std::error::Error for DatabaseFailure {}

/// Directory protocol failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DirectoryFailure {
    /// Human-readable message
    pub message: String,
    /// LDAP result code, when the server sent one
    pub result_code: Option<u32>,
}

impl DirectoryFailure {
    /// Creates a failure without a result code
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            result_code: None,
        }
    }

    /// Creates a failure carrying an LDAP result code
    pub fn with_code(message: impl Into<String>, result_code: u32) -> Self {
        Self {
            message: message.into(),
            result_code: Some(result_code),
        }
    }
}

/// Metadata read from a database connection while it was open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseMetadata {
    /// Server product, e.g. `PostgreSQL` or `MariaDB`
    pub product_name: String,
    /// Server version as the server reports it
    pub product_version: String,
    /// Connection URL, credentials redacted
    pub url: String,
    /// User the server resolved the session to; SQLite has none
    pub username: Option<String>,
    /// Client driver that made the connection
    pub driver_name: String,
    /// Version of the client driver
    pub driver_version: String,
}

/// What a successful attempt learned about its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMetadata {
    /// Database connection details
    Database(DatabaseMetadata),
    /// Directory session; only whether the search ran
    Directory {
        /// The bounded search returned without error
        search_executed: bool,
    },
}

/// Classified outcome kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Connected successfully
    Ok,
    /// The properties file is missing or unreadable
    ConfigError,
    /// The target rejected or could not complete the attempt
    ConnectionError,
    /// Directory failure of no recognized kind
    UnknownError,
    /// A state the connectors can never produce
    InternalInconsistency,
}

impl Kind {
    /// Process exit code for this kind
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::ConnectionError | Self::UnknownError => 1,
            Self::ConfigError | Self::InternalInconsistency => 2,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::ConfigError => "config-error",
            Self::ConnectionError => "connection-error",
            Self::UnknownError => "unknown-error",
            Self::InternalInconsistency => "internal-inconsistency",
        };
        f.write_str(name)
    }
}

/// The single terminal artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    kind: Kind,
    message: Option<String>,
    metadata: Option<ConnectionMetadata>,
}

impl Classification {
    fn failure(kind: Kind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            metadata: None,
        }
    }

    fn ok(metadata: ConnectionMetadata) -> Self {
        Self {
            kind: Kind::Ok,
            message: None,
            metadata: Some(metadata),
        }
    }

    fn internal_inconsistency(detail: Option<&str>) -> Self {
        let message = match detail {
            Some(detail) => format!("{} {}", UNKNOWN_STATE_MESSAGE, detail),
            None => UNKNOWN_STATE_MESSAGE.to_string(),
        };
        Self::failure(Kind::InternalInconsistency, message)
    }

    /// Classified kind
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Process exit code (0, 1 or 2)
    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }

    /// Failure message; `None` on success
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Metadata attached on success
    pub fn metadata(&self) -> Option<&ConnectionMetadata> {
        self.metadata.as_ref()
    }

    /// Returns true for `Kind::Ok`
    pub fn is_success(&self) -> bool {
        self.kind == Kind::Ok
    }
}

/// Classifies the result of one run of `probe`.
///
/// Precedence: configuration I/O failures, then protocol failures, then
/// unrecognized failures, then success. Results the probe cannot produce
/// (metadata of the other protocol, or an untyped failure from the database
/// probe, which has no catch-all kind) become `InternalInconsistency`.
pub fn classify(probe: Probe, attempt: Result<ConnectionMetadata, RawError>) -> Classification {
    match attempt {
        Err(RawError::Io(error)) => Classification::failure(Kind::ConfigError, error.to_string()),
        Err(RawError::Database(failure)) => {
            Classification::failure(Kind::ConnectionError, failure.render())
        }
        Err(RawError::Directory(failure)) => {
            if let Some(code) = failure.result_code {
                tracing::debug!("Directory server returned result code {}", code);
            }
            Classification::failure(
                Kind::ConnectionError,
                format!("{}{}", DIRECTORY_FAILURE_PREFIX, failure),
            )
        }
        Err(RawError::Other(message)) => match probe {
            Probe::Directory => Classification::failure(Kind::UnknownError, message),
            Probe::Database => Classification::internal_inconsistency(Some(message.as_str())),
        },
        Ok(metadata) => match (probe, &metadata) {
            (Probe::Database, ConnectionMetadata::Database(_))
            | (Probe::Directory, ConnectionMetadata::Directory { .. }) => {
                Classification::ok(metadata)
            }
            _ => Classification::internal_inconsistency(None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    fn config_missing() -> RawError {
        RawError::Io(ConfigFileError {
            path: PathBuf::from("jdbc_test.properties"),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        })
    }

    fn database_metadata() -> ConnectionMetadata {
        ConnectionMetadata::Database(DatabaseMetadata {
            product_name: "PostgreSQL".to_string(),
            product_version: "16.2".to_string(),
            url: "jdbc:postgresql://localhost:5432/app".to_string(),
            username: Some("app".to_string()),
            driver_name: "sqlx-postgres".to_string(),
            driver_version: "0.8".to_string(),
        })
    }

    #[test]
    fn test_exit_codes_per_kind() {
        assert_eq!(Kind::Ok.exit_code(), 0);
        assert_eq!(Kind::ConnectionError.exit_code(), 1);
        assert_eq!(Kind::UnknownError.exit_code(), 1);
        assert_eq!(Kind::ConfigError.exit_code(), 2);
        assert_eq!(Kind::InternalInconsistency.exit_code(), 2);
    }

    #[test]
    fn test_config_error_for_both_probes() {
        for probe in [Probe::Database, Probe::Directory] {
            let classification = classify(probe, Err(config_missing()));
            assert_eq!(classification.kind(), Kind::ConfigError);
            assert_eq!(classification.exit_code(), 2);
            assert_eq!(
                classification.message(),
                Some("jdbc_test.properties: No such file or directory")
            );
            assert!(classification.metadata().is_none());
        }
    }

    #[test]
    fn test_database_failure_enumerates_every_cause() {
        let failure = DatabaseFailure::new("error communicating with database", None)
            .with_cause(FailureCause::new("Network is unreachable", None))
            .with_cause(FailureCause::new(
                "connection timed out",
                Some("08006".to_string()),
            ));

        let classification = classify(Probe::Database, Err(failure.into()));
        assert_eq!(classification.kind(), Kind::ConnectionError);
        assert_eq!(classification.exit_code(), 1);

        let message = classification.message().unwrap();
        let lines: Vec<&str> = message.lines().collect();
        assert_eq!(
            lines,
            vec![
                "error communicating with database",
                "Network is unreachable",
                "connection timed out",
                "SQLSTATE: 08006",
            ]
        );
    }

    #[test]
    fn test_database_failure_state_line_follows_its_own_cause() {
        let failure = DatabaseFailure::new(
            "password authentication failed for user \"app\"",
            Some("28P01".to_string()),
        );
        let message = failure.render();
        assert_eq!(
            message,
            "password authentication failed for user \"app\"\nSQLSTATE: 28P01"
        );
    }

    #[test]
    fn test_from_error_chain_walks_sources() {
        #[derive(Debug, Error)]
        #[error("outer")]
        struct Outer(#[source] io::Error);

        let error = Outer(io::Error::new(io::ErrorKind::TimedOut, "inner timeout"));
        let failure = DatabaseFailure::from_error_chain(&error, |link| {
            link.downcast_ref::<Outer>().map(|_| "08001".to_string())
        });

        assert_eq!(
            failure.causes(),
            &[
                FailureCause::new("outer", Some("08001".to_string())),
                FailureCause::new("inner timeout", None),
            ]
        );
    }

    #[test]
    fn test_directory_failure_has_fixed_prefix() {
        let failure = DirectoryFailure::with_code("invalidCredentials", 49);
        let classification = classify(Probe::Directory, Err(failure.into()));

        assert_eq!(classification.kind(), Kind::ConnectionError);
        assert_eq!(classification.exit_code(), 1);
        assert_eq!(
            classification.message(),
            Some("Connection failure! invalidCredentials")
        );
    }

    #[test]
    fn test_directory_unrecognized_failure_is_unknown_error() {
        let classification = classify(
            Probe::Directory,
            Err(RawError::other("search base is not set")),
        );
        assert_eq!(classification.kind(), Kind::UnknownError);
        assert_eq!(classification.exit_code(), 1);
        assert_eq!(classification.message(), Some("search base is not set"));
    }

    #[test]
    fn test_database_has_no_catch_all_kind() {
        let classification = classify(Probe::Database, Err(RawError::other("boom")));
        assert_eq!(classification.kind(), Kind::InternalInconsistency);
        assert_eq!(classification.exit_code(), 2);
        assert!(classification.message().unwrap().starts_with(UNKNOWN_STATE_MESSAGE));
        assert!(classification.message().unwrap().contains("boom"));
    }

    #[test]
    fn test_success_attaches_metadata() {
        let classification = classify(Probe::Database, Ok(database_metadata()));
        assert!(classification.is_success());
        assert_eq!(classification.exit_code(), 0);
        assert_eq!(classification.message(), None);
        assert_eq!(classification.metadata(), Some(&database_metadata()));

        let classification = classify(
            Probe::Directory,
            Ok(ConnectionMetadata::Directory {
                search_executed: true,
            }),
        );
        assert!(classification.is_success());
    }

    #[test]
    fn test_metadata_of_other_protocol_is_unknown_state() {
        let classification = classify(Probe::Directory, Ok(database_metadata()));
        assert_eq!(classification.kind(), Kind::InternalInconsistency);
        assert_eq!(classification.exit_code(), 2);
        assert_eq!(classification.message(), Some(UNKNOWN_STATE_MESSAGE));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let first = classify(Probe::Database, Err(config_missing()));
        let second = classify(Probe::Database, Err(config_missing()));
        assert_eq!(first, second);
    }
}
