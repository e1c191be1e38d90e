//! Connector traits and the single-attempt pipeline.
//!
//! Each protocol family implements [`Connector`] (open one session from a
//! loaded [`ConnectionConfig`]) and [`Session`] (prove the session is usable,
//! then close it). The pipeline in [`run_attempt`] owns the session from
//! connect until close:
//!
//! ```text
//! connect ──ok──▶ describe ──ok──▶ close ──▶ Ok(metadata)
//!    │                │
//!    └──err──▶ Err    └──err──▶ Err (session dropped, not closed)
//! ```
//!
//! There is no retry edge anywhere. A connector returns either a session or a
//! failure, so a run can never end with neither.
//!
//! # Module Structure
//! - `database`: JDBC-style URLs over the sqlx drivers
//! - `directory`: LDAP over ldap3

use crate::outcome::{Classification, ConnectionMetadata, RawError, classify};
use crate::properties::ConnectionConfig;
use async_trait::async_trait;
use std::path::Path;

pub mod database;
pub mod directory;

pub use database::DatabaseConnector;
pub use directory::DirectoryConnector;

/// Protocol family probed by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    /// Relational database through a driver URL
    Database,
    /// Directory service over LDAP
    Directory,
}

impl Probe {
    /// Properties file used when none is given on the command line.
    pub const fn default_properties_file(self) -> &'static str {
        match self {
            Self::Database => "jdbc_test.properties",
            Self::Directory => "ldap_test.properties",
        }
    }
}

impl std::fmt::Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => f.write_str("database"),
            Self::Directory => f.write_str("directory"),
        }
    }
}

/// Opens one session for a protocol family.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open session type
    type Session: Session;

    /// Protocol family this connector serves.
    fn probe(&self) -> Probe;

    /// Performs the single connection attempt.
    ///
    /// Absent configuration keys are handed to the protocol layer as absent;
    /// whether that is fatal is the protocol's decision.
    ///
    /// # Errors
    /// Returns the raw protocol failure, unclassified.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Self::Session, RawError>;
}

/// An open connection or directory context, exclusively owned by the run.
#[async_trait]
pub trait Session: Send + Sized {
    /// Proves the session is usable and reads what the report needs.
    ///
    /// # Errors
    /// Returns the raw protocol failure, unclassified.
    async fn describe(&mut self) -> Result<ConnectionMetadata, RawError>;

    /// Closes the session.
    ///
    /// # Errors
    /// Returns the raw protocol failure of the close itself.
    async fn close(self) -> Result<(), RawError>;
}

/// Runs connect → describe → close with one owner for the session.
///
/// A failed close after a successful describe is logged and does not change
/// the outcome: the target already proved reachable and usable.
///
/// # Errors
/// Returns the first raw failure of connect or describe.
pub async fn run_attempt<C>(
    connector: &C,
    config: &ConnectionConfig,
) -> Result<ConnectionMetadata, RawError>
where
    C: Connector + ?Sized,
{
    let mut session = connector.connect(config).await?;
    tracing::debug!("{} session opened", connector.probe());

    let metadata = session.describe().await?;

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close {} session: {}", connector.probe(), e);
    } else {
        tracing::debug!("{} session closed", connector.probe());
    }

    Ok(metadata)
}

/// Runs a whole probe: load the properties file, let `prepare` adjust the
/// loaded config, attempt the connection, and classify the result.
///
/// Exactly one [`Classification`] comes out of every call.
pub async fn run_probe<C, F>(connector: &C, properties: &Path, prepare: F) -> Classification
where
    C: Connector + ?Sized,
    F: FnOnce(ConnectionConfig) -> ConnectionConfig + Send,
{
    tracing::info!(
        "Testing {} connectivity using {}",
        connector.probe(),
        properties.display()
    );

    let attempt = match ConnectionConfig::load(properties).await {
        Ok(config) => run_attempt(connector, &prepare(config)).await,
        Err(e) => {
            if e.is_not_found() {
                tracing::debug!("Properties file {} does not exist", properties.display());
            }
            Err(e.into())
        }
    };

    let classification = classify(connector.probe(), attempt);
    tracing::info!(
        "Classified {} probe as {} (exit code {})",
        connector.probe(),
        classification.kind(),
        classification.exit_code()
    );
    classification
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{DatabaseMetadata, DirectoryFailure, Kind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted connector recording how the pipeline drives its session.
    struct ScriptedConnector {
        connect_ok: bool,
        describe_ok: bool,
        close_ok: bool,
        closes: Arc<AtomicUsize>,
    }

    struct ScriptedSession {
        describe_ok: bool,
        close_ok: bool,
        closes: Arc<AtomicUsize>,
    }

    impl ScriptedConnector {
        fn new(connect_ok: bool, describe_ok: bool, close_ok: bool) -> Self {
            Self {
                connect_ok,
                describe_ok,
                close_ok,
                closes: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        type Session = ScriptedSession;

        fn probe(&self) -> Probe {
            Probe::Directory
        }

        async fn connect(&self, _config: &ConnectionConfig) -> Result<ScriptedSession, RawError> {
            if self.connect_ok {
                Ok(ScriptedSession {
                    describe_ok: self.describe_ok,
                    close_ok: self.close_ok,
                    closes: Arc::clone(&self.closes),
                })
            } else {
                Err(DirectoryFailure::with_code("invalidCredentials", 49).into())
            }
        }
    }

    #[async_trait]
    impl Session for ScriptedSession {
        async fn describe(&mut self) -> Result<ConnectionMetadata, RawError> {
            if self.describe_ok {
                Ok(ConnectionMetadata::Directory {
                    search_executed: true,
                })
            } else {
                Err(RawError::other("search base is not set"))
            }
        }

        async fn close(self) -> Result<(), RawError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.close_ok {
                Ok(())
            } else {
                Err(DirectoryFailure::new("unbind failed").into())
            }
        }
    }

    #[test]
    fn test_default_properties_files() {
        assert_eq!(
            Probe::Database.default_properties_file(),
            "jdbc_test.properties"
        );
        assert_eq!(
            Probe::Directory.default_properties_file(),
            "ldap_test.properties"
        );
    }

    #[tokio::test]
    async fn test_success_closes_session_once() {
        let connector = ScriptedConnector::new(true, true, true);
        let result = run_attempt(&connector, &ConnectionConfig::default()).await;

        assert!(matches!(
            result,
            Ok(ConnectionMetadata::Directory {
                search_executed: true
            })
        ));
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_describe_does_not_close() {
        let connector = ScriptedConnector::new(true, false, true);
        let result = run_attempt(&connector, &ConnectionConfig::default()).await;

        assert!(matches!(result, Err(RawError::Other(_))));
        assert_eq!(connector.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_connect_never_opens_session() {
        let connector = ScriptedConnector::new(false, true, true);
        let result = run_attempt(&connector, &ConnectionConfig::default()).await;

        assert!(matches!(result, Err(RawError::Directory(_))));
        assert_eq!(connector.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_close_keeps_success() {
        let connector = ScriptedConnector::new(true, true, false);
        let result = run_attempt(&connector, &ConnectionConfig::default()).await;

        assert!(result.is_ok());
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_probe_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let connector = ScriptedConnector::new(true, true, true);

        let classification =
            run_probe(&connector, &dir.path().join("absent.properties"), |c| c).await;

        assert_eq!(classification.kind(), Kind::ConfigError);
        assert_eq!(classification.exit_code(), 2);
        assert!(classification.message().unwrap().contains("absent.properties"));
        assert_eq!(connector.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_probe_applies_prepare() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ldap_test.properties");
        std::fs::write(&path, "ldap.baseDN=dc=example,dc=com\n").unwrap();

        let connector = ScriptedConnector::new(true, true, true);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_prepare = Arc::clone(&seen);

        let classification = run_probe(&connector, &path, move |config| {
            if config.get("ldap.baseDN") == Some("dc=example,dc=com") {
                seen_in_prepare.fetch_add(1, Ordering::SeqCst);
            }
            config
        })
        .await;

        assert!(classification.is_success());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeated_runs_classify_identically() {
        let connector = ScriptedConnector::new(false, true, true);
        let config = ConnectionConfig::default();

        let first = classify(Probe::Directory, run_attempt(&connector, &config).await);
        let second = classify(Probe::Directory, run_attempt(&connector, &config).await);

        assert_eq!(first, second);
        assert_eq!(first.exit_code(), 1);
    }

    /// The pipeline's only way to end without a handle is an error: the
    /// `Unknown state!` branch is reachable solely through mismatched
    /// metadata, never through a connector.
    #[test]
    fn test_unknown_state_only_via_mismatched_metadata() {
        let mismatched = ConnectionMetadata::Database(DatabaseMetadata {
            product_name: "SQLite".to_string(),
            product_version: "3.45.0".to_string(),
            url: "jdbc:sqlite::memory:".to_string(),
            username: None,
            driver_name: "sqlx-sqlite".to_string(),
            driver_version: "0.8".to_string(),
        });
        let classification = classify(Probe::Directory, Ok(mismatched));
        assert_eq!(classification.kind(), Kind::InternalInconsistency);
    }
}
