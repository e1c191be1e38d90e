//! Database connector over the sqlx drivers.
//!
//! Configuration keys:
//! - `jdbc.url`: JDBC-style or native driver URL (see [`jdbc_url`])
//! - `jdbc.username`, `jdbc.password`: optional, override any credentials in the URL
//!
//! A single connection is opened (never a pool), queried once for the
//! server's product version and session user, then closed.

use super::{Connector, Probe, Session};
use crate::outcome::{ConnectionMetadata, DatabaseFailure, DatabaseMetadata, RawError};
use crate::properties::ConnectionConfig;
use crate::security::Credentials;
use async_trait::async_trait;
use std::error::Error as StdError;

pub mod jdbc_url;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgresql")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use jdbc_url::{Backend, JdbcUrl};

#[cfg(not(any(feature = "postgresql", feature = "mysql", feature = "sqlite")))]
compile_error!("enable at least one of the `postgresql`, `mysql` or `sqlite` features");

/// Key holding the connection URL.
pub const URL_KEY: &str = "jdbc.url";
/// Key holding the login user.
pub const USERNAME_KEY: &str = "jdbc.username";
/// Key holding the login password.
pub const PASSWORD_KEY: &str = "jdbc.password";

/// Driver version reported alongside the driver name.
pub const DRIVER_VERSION: &str = "0.8";

/// SQLSTATE for "client unable to establish connection".
const SQLSTATE_CONNECTION_REJECTED: &str = "08001";

/// Connects to relational databases named by a driver URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatabaseConnector;

impl DatabaseConnector {
    /// Creates the connector.
    pub fn new() -> Self {
        Self
    }
}

/// One open database connection.
pub enum DatabaseSession {
    #[cfg(feature = "postgresql")]
    Postgres {
        conn: sqlx::PgConnection,
        url: JdbcUrl,
    },
    #[cfg(feature = "mysql")]
    MySql {
        conn: sqlx::MySqlConnection,
        url: JdbcUrl,
    },
    #[cfg(feature = "sqlite")]
    Sqlite {
        conn: sqlx::SqliteConnection,
        url: JdbcUrl,
    },
}

impl std::fmt::Debug for DatabaseSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let url = match self {
            #[cfg(feature = "postgresql")]
            Self::Postgres { url, .. } => url,
            #[cfg(feature = "mysql")]
            Self::MySql { url, .. } => url,
            #[cfg(feature = "sqlite")]
            Self::Sqlite { url, .. } => url,
        };
        f.debug_struct("DatabaseSession").field("url", url).finish()
    }
}

#[async_trait]
impl Connector for DatabaseConnector {
    type Session = DatabaseSession;

    fn probe(&self) -> Probe {
        Probe::Database
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<DatabaseSession, RawError> {
        let credentials = Credentials::from_config(config, USERNAME_KEY, PASSWORD_KEY);

        let Some(configured) = config.get(URL_KEY) else {
            return Err(DatabaseFailure::new(
                "The url cannot be null",
                Some(SQLSTATE_CONNECTION_REJECTED.to_string()),
            )
            .into());
        };

        let url = JdbcUrl::parse(configured).ok_or_else(|| no_suitable_driver(configured))?;
        tracing::info!("Connecting to {} at {}", url.backend(), url.redacted());
        tracing::debug!(
            "Credentials: username={:?}, password supplied={}",
            credentials.username(),
            credentials.has_password()
        );

        let session = match url.backend() {
            #[cfg(feature = "postgresql")]
            Backend::PostgreSql => DatabaseSession::Postgres {
                conn: postgres::connect(&url, &credentials)
                    .await
                    .map_err(database_failure)?,
                url,
            },
            #[cfg(feature = "mysql")]
            Backend::MySql => DatabaseSession::MySql {
                conn: mysql::connect(&url, &credentials)
                    .await
                    .map_err(database_failure)?,
                url,
            },
            #[cfg(feature = "sqlite")]
            Backend::Sqlite => DatabaseSession::Sqlite {
                conn: sqlite::connect(&url, &credentials)
                    .await
                    .map_err(database_failure)?,
                url,
            },
            #[allow(unreachable_patterns)]
            _ => return Err(no_suitable_driver(configured)),
        };

        Ok(session)
    }
}

#[async_trait]
impl Session for DatabaseSession {
    async fn describe(&mut self) -> Result<ConnectionMetadata, RawError> {
        let metadata = match self {
            #[cfg(feature = "postgresql")]
            Self::Postgres { conn, url } => postgres::describe(conn, url).await,
            #[cfg(feature = "mysql")]
            Self::MySql { conn, url } => mysql::describe(conn, url).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, url } => sqlite::describe(conn, url).await,
        }
        .map_err(database_failure)?;

        Ok(ConnectionMetadata::Database(metadata))
    }

    async fn close(self) -> Result<(), RawError> {
        use sqlx::Connection;

        match self {
            #[cfg(feature = "postgresql")]
            Self::Postgres { conn, .. } => conn.close().await,
            #[cfg(feature = "mysql")]
            Self::MySql { conn, .. } => conn.close().await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, .. } => conn.close().await,
        }
        .map_err(database_failure)
    }
}

/// Assembles report metadata for a backend.
fn metadata(
    url: &JdbcUrl,
    product_name: impl Into<String>,
    product_version: impl Into<String>,
    username: Option<String>,
) -> DatabaseMetadata {
    DatabaseMetadata {
        product_name: product_name.into(),
        product_version: product_version.into(),
        url: url.redacted(),
        username,
        driver_name: url.backend().driver_name().to_string(),
        driver_version: DRIVER_VERSION.to_string(),
    }
}

fn no_suitable_driver(configured: &str) -> RawError {
    DatabaseFailure::new(
        format!(
            "No suitable driver found for {}",
            crate::error::redact_database_url(configured.trim())
        ),
        Some(SQLSTATE_CONNECTION_REJECTED.to_string()),
    )
    .into()
}

fn database_failure(error: sqlx::Error) -> RawError {
    tracing::debug!("Database driver error: {:?}", error);
    DatabaseFailure::from_error_chain(&error, sql_state_of).into()
}

/// Extracts the SQLSTATE (or vendor code) of one link in a driver error chain.
fn sql_state_of(link: &(dyn StdError + 'static)) -> Option<String> {
    use sqlx::error::DatabaseError;

    if let Some(sqlx::Error::Database(e)) = link.downcast_ref::<sqlx::Error>() {
        return e.code().map(|code| code.into_owned());
    }
    #[cfg(feature = "postgresql")]
    if let Some(e) = link.downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        return DatabaseError::code(e).map(|code| code.into_owned());
    }
    #[cfg(feature = "mysql")]
    if let Some(e) = link.downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
        return DatabaseError::code(e).map(|code| code.into_owned());
    }
    #[cfg(feature = "sqlite")]
    if let Some(e) = link.downcast_ref::<sqlx::sqlite::SqliteError>() {
        return DatabaseError::code(e).map(|code| code.into_owned());
    }
    None
}
