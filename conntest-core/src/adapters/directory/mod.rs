//! Directory connector over LDAP.
//!
//! One run opens one LDAP connection (optionally upgraded with StartTLS),
//! binds as configured, and issues a single subtree search limited to one
//! entry. Only the fact that the server executed the search matters; returned
//! entries are never inspected.

use super::{Connector, Probe, Session};
use crate::outcome::{ConnectionMetadata, DirectoryFailure, RawError};
use crate::properties::ConnectionConfig;
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchOptions};

pub mod environment;

pub use environment::{Authentication, DirectoryEnvironment};

/// Result codes of a search the server actually executed.
///
/// `sizeLimitExceeded` (4) is expected with a one-entry limit and
/// `noSuchObject` (32) still proves the server evaluated the request.
const SEARCH_EXECUTED_CODES: [u32; 3] = [0, 4, 32];

/// Attribute list requesting no attributes.
const NO_ATTRIBUTES: &str = "1.1";

/// Connects to directory services over LDAP.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryConnector;

impl DirectoryConnector {
    /// Creates the connector.
    pub fn new() -> Self {
        Self
    }
}

/// An open, bound LDAP context.
pub struct DirectorySession {
    ldap: Ldap,
    environment: DirectoryEnvironment,
}

impl std::fmt::Debug for DirectorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySession")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for DirectoryConnector {
    type Session = DirectorySession;

    fn probe(&self) -> Probe {
        Probe::Directory
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<DirectorySession, RawError> {
        let environment = DirectoryEnvironment::from_config(config);
        environment.check_factory()?;
        let authentication = environment.authentication()?;
        let url = environment.provider_url()?;

        tracing::info!(
            "Connecting to {} (StartTLS: {}, authentication: {:?})",
            url,
            environment.start_tls(),
            authentication
        );

        let settings = LdapConnSettings::new().set_starttls(environment.start_tls());
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, url)
            .await
            .map_err(directory_failure)?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!("LDAP connection error: {}", e);
            }
        });

        if authentication == Authentication::Simple {
            let credentials = environment.credentials();
            let principal = credentials.username().unwrap_or_default();
            tracing::debug!("Binding as {:?}", principal);
            ldap.simple_bind(principal, credentials.password().unwrap_or_default())
                .await
                .and_then(|result| result.success())
                .map_err(directory_failure)?;
        }

        Ok(DirectorySession { ldap, environment })
    }
}

#[async_trait]
impl Session for DirectorySession {
    async fn describe(&mut self) -> Result<ConnectionMetadata, RawError> {
        let (base_dn, filter) = self.environment.search_target()?;
        tracing::debug!("Searching {:?} with filter {:?}", base_dn, filter);

        let ldap3::SearchResult(entries, result) = self
            .ldap
            .with_search_options(SearchOptions::new().sizelimit(1))
            .search(base_dn, Scope::Subtree, filter, vec![NO_ATTRIBUTES])
            .await
            .map_err(directory_failure)?;

        tracing::debug!(
            "Search finished with result code {} ({} entries)",
            result.rc,
            entries.len()
        );

        if !search_executed(result.rc) {
            let failure = result
                .success()
                .err()
                .map(directory_failure)
                .unwrap_or_else(|| DirectoryFailure::new("search failed"));
            return Err(failure.into());
        }

        Ok(ConnectionMetadata::Directory {
            search_executed: true,
        })
    }

    async fn close(mut self) -> Result<(), RawError> {
        self.ldap.unbind().await.map_err(directory_failure)?;
        Ok(())
    }
}

/// Whether a search result code proves the server executed the search.
fn search_executed(rc: u32) -> bool {
    SEARCH_EXECUTED_CODES.contains(&rc)
}

fn directory_failure(error: LdapError) -> DirectoryFailure {
    tracing::debug!("Directory error: {:?}", error);
    match &error {
        LdapError::LdapResult { result } => DirectoryFailure::with_code(error.to_string(), result.rc),
        _ => DirectoryFailure::new(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::environment::*;
    use super::*;
    use crate::outcome::Kind;
    use crate::{classify, run_attempt};

    fn config(pairs: &[(&str, &str)]) -> ConnectionConfig {
        ConnectionConfig::from_pairs(pairs.iter().copied())
    }

    async fn unreachable_ldap_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("ldap://127.0.0.1:{port}")
    }

    #[test]
    fn test_search_executed_codes() {
        assert!(search_executed(0));
        assert!(search_executed(4));
        assert!(search_executed(32));

        // operationsError, timeLimitExceeded, insufficientAccessRights, busy
        for rc in [1, 3, 50, 51, 53] {
            assert!(!search_executed(rc), "rc {rc} counted as executed");
        }
    }

    #[tokio::test]
    async fn test_unknown_factory_fails_before_connecting() {
        let result = DirectoryConnector::new()
            .connect(&config(&[
                (FACTORY_KEY, "org.example.NoSuchFactory"),
                (PROVIDER_URL_KEY, "ldap://192.0.2.1:389"),
            ]))
            .await;

        let Err(RawError::Directory(failure)) = result else {
            panic!("expected directory failure");
        };
        assert_eq!(failure.message, "Cannot instantiate class: org.example.NoSuchFactory");
    }

    #[tokio::test]
    async fn test_missing_provider_url_is_directory_failure() {
        let result = DirectoryConnector::new()
            .connect(&config(&[(FACTORY_KEY, LDAP_CONTEXT_FACTORY)]))
            .await;
        assert!(matches!(result, Err(RawError::Directory(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let url = unreachable_ldap_url().await;
        let config = config(&[
            (FACTORY_KEY, LDAP_CONTEXT_FACTORY),
            (PROVIDER_URL_KEY, url.as_str()),
            (BASE_DN_KEY, "dc=example,dc=com"),
            (FILTER_KEY, "(objectClass=*)"),
        ]);

        let classification = classify(
            Probe::Directory,
            run_attempt(&DirectoryConnector::new(), &config).await,
        );

        assert_eq!(classification.kind(), Kind::ConnectionError);
        assert_eq!(classification.exit_code(), 1);
        assert!(classification.message().unwrap().starts_with("Connection failure! "));
    }

    #[tokio::test]
    async fn test_malformed_provider_url_is_connection_error() {
        let result = DirectoryConnector::new()
            .connect(&config(&[
                (FACTORY_KEY, LDAP_CONTEXT_FACTORY),
                (PROVIDER_URL_KEY, "not a url"),
            ]))
            .await;
        assert!(matches!(result, Err(RawError::Directory(_))));
    }

    #[test]
    fn test_ldap_result_error_keeps_code() {
        let error = LdapError::LdapResult {
            result: ldap3::LdapResult {
                rc: 49,
                matched: String::new(),
                text: "invalid credentials".to_string(),
                refs: Vec::new(),
                ctrls: Vec::new(),
            },
        };

        let failure = directory_failure(error);
        assert_eq!(failure.result_code, Some(49));
        assert!(failure.message.contains("49"));
    }
}
