//! PostgreSQL sessions.

use super::{JdbcUrl, metadata};
use crate::outcome::DatabaseMetadata;
use crate::security::Credentials;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::ConnectOptions;
use std::str::FromStr;

/// Opens one connection. Configured credentials replace any in the URL.
pub(super) async fn connect(
    url: &JdbcUrl,
    credentials: &Credentials,
) -> Result<PgConnection, sqlx::Error> {
    let mut options =
        PgConnectOptions::from_str(url.native())?.application_name("conntest");

    if let Some(username) = credentials.username() {
        options = options.username(username);
    }
    if let Some(password) = credentials.password() {
        options = options.password(password);
    }

    options.connect().await
}

pub(super) async fn describe(
    conn: &mut PgConnection,
    url: &JdbcUrl,
) -> Result<DatabaseMetadata, sqlx::Error> {
    let (version, user): (String, String) =
        sqlx::query_as("SELECT current_setting('server_version'), current_user::text")
            .fetch_one(&mut *conn)
            .await?;

    Ok(metadata(url, "PostgreSQL", version, Some(user)))
}
