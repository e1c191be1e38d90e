//! SQLite sessions.
//!
//! A missing database file is a connection failure, never created.

use super::{JdbcUrl, metadata};
use crate::outcome::DatabaseMetadata;
use crate::security::Credentials;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::ConnectOptions;
use std::str::FromStr;

pub(super) async fn connect(
    url: &JdbcUrl,
    credentials: &Credentials,
) -> Result<SqliteConnection, sqlx::Error> {
    if credentials.username().is_some() || credentials.has_password() {
        tracing::debug!("SQLite has no authentication; ignoring configured credentials");
    }

    SqliteConnectOptions::from_str(url.native())?
        .create_if_missing(false)
        .connect()
        .await
}

pub(super) async fn describe(
    conn: &mut SqliteConnection,
    url: &JdbcUrl,
) -> Result<DatabaseMetadata, sqlx::Error> {
    let (version,): (String,) = sqlx::query_as("SELECT sqlite_version()")
        .fetch_one(&mut *conn)
        .await?;

    Ok(metadata(url, "SQLite", version, None))
}
