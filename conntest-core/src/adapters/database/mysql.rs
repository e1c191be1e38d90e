//! MySQL and MariaDB sessions.

use super::{JdbcUrl, metadata};
use crate::outcome::DatabaseMetadata;
use crate::security::Credentials;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::ConnectOptions;
use std::str::FromStr;

/// Opens one connection. Configured credentials replace any in the URL.
pub(super) async fn connect(
    url: &JdbcUrl,
    credentials: &Credentials,
) -> Result<MySqlConnection, sqlx::Error> {
    let mut options = MySqlConnectOptions::from_str(url.native())?;

    if let Some(username) = credentials.username() {
        options = options.username(username);
    }
    if let Some(password) = credentials.password() {
        options = options.password(password);
    }

    options.connect().await
}

pub(super) async fn describe(
    conn: &mut MySqlConnection,
    url: &JdbcUrl,
) -> Result<DatabaseMetadata, sqlx::Error> {
    let (version, user): (String, String) =
        sqlx::query_as("SELECT CAST(VERSION() AS CHAR), CAST(CURRENT_USER() AS CHAR)")
            .fetch_one(&mut *conn)
            .await?;

    Ok(metadata(url, product_name(&version), version, Some(user)))
}

/// MariaDB speaks the MySQL protocol and announces itself in the version.
fn product_name(version: &str) -> &'static str {
    if version.contains("MariaDB") {
        "MariaDB"
    } else {
        "MySQL"
    }
}
