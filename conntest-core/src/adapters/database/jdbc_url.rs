//! JDBC-style connection URLs and their sqlx equivalents.
//!
//! Accepted forms (the `jdbc:` prefix is optional):
//!
//! | Configured                        | Driver URL                     |
//! |-----------------------------------|--------------------------------|
//! | `jdbc:postgresql://host:5432/db`  | `postgres://host:5432/db`      |
//! | `jdbc:postgresql:db`              | `postgres://localhost/db`      |
//! | `jdbc:mysql://host:3306/db`       | `mysql://host:3306/db`         |
//! | `jdbc:mariadb://host:3306/db`     | `mysql://host:3306/db`         |
//! | `jdbc:sqlite:/path/app.db`        | `sqlite:/path/app.db`          |
//! | `jdbc:sqlite::memory:`            | `sqlite::memory:`              |
//!
//! Connection parameters after `?` are renamed to what the sqlx driver reads
//! (`ssl=true` becomes `sslmode=require`, `useSSL=false` becomes
//! `ssl-mode=DISABLED`). Parameters the driver has no equivalent for are
//! dropped.

use crate::error::redact_database_url;
use std::fmt;

/// Database family behind a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// PostgreSQL and compatible servers
    PostgreSql,
    /// MySQL and MariaDB
    MySql,
    /// SQLite database files
    Sqlite,
}

impl Backend {
    /// Name reported as the driver of a successful connection.
    pub const fn driver_name(self) -> &'static str {
        match self {
            Self::PostgreSql => "sqlx-postgres",
            Self::MySql => "sqlx-mysql",
            Self::Sqlite => "sqlx-sqlite",
        }
    }

    /// Whether this build carries the driver.
    pub const fn is_compiled_in(self) -> bool {
        match self {
            Self::PostgreSql => cfg!(feature = "postgresql"),
            Self::MySql => cfg!(feature = "mysql"),
            Self::Sqlite => cfg!(feature = "sqlite"),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostgreSql => f.write_str("PostgreSQL"),
            Self::MySql => f.write_str("MySQL"),
            Self::Sqlite => f.write_str("SQLite"),
        }
    }
}

/// A configured URL some driver in this build accepts.
#[derive(Clone, PartialEq, Eq)]
pub struct JdbcUrl {
    configured: String,
    native: String,
    backend: Backend,
}

impl JdbcUrl {
    /// Maps a configured URL to a driver URL.
    ///
    /// Returns `None` when no driver recognizes the URL, including
    /// recognized subprotocols whose driver was left out of the build.
    pub fn parse(configured: &str) -> Option<Self> {
        let trimmed = configured.trim();
        let rest = trimmed.strip_prefix("jdbc:").unwrap_or(trimmed);

        let (backend, native) = if let Some(tail) = rest.strip_prefix("postgresql://") {
            (Backend::PostgreSql, format!("postgres://{tail}"))
        } else if let Some(tail) = rest.strip_prefix("postgres://") {
            (Backend::PostgreSql, format!("postgres://{tail}"))
        } else if let Some(database) = rest.strip_prefix("postgresql:") {
            // `jdbc:postgresql:db` names a database on the local server
            if database.is_empty() {
                return None;
            }
            (Backend::PostgreSql, format!("postgres://localhost/{database}"))
        } else if let Some(tail) = rest.strip_prefix("mysql://") {
            (Backend::MySql, format!("mysql://{tail}"))
        } else if let Some(tail) = rest.strip_prefix("mariadb://") {
            (Backend::MySql, format!("mysql://{tail}"))
        } else if let Some(tail) = rest.strip_prefix("sqlite:") {
            let tail = tail.strip_prefix("//").unwrap_or(tail);
            if tail.is_empty() {
                return None;
            }
            (Backend::Sqlite, format!("sqlite:{tail}"))
        } else {
            return None;
        };

        if !backend.is_compiled_in() {
            tracing::debug!("{} driver is not part of this build", backend);
            return None;
        }

        let native = match native.split_once('?') {
            Some((base, query)) => {
                let query = driver_query(backend, query);
                if query.is_empty() {
                    base.to_string()
                } else {
                    format!("{base}?{query}")
                }
            }
            None => native,
        };

        Some(Self {
            configured: trimmed.to_string(),
            native,
            backend,
        })
    }

    /// Database family the URL selects.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// URL handed to the sqlx driver.
    pub fn native(&self) -> &str {
        &self.native
    }

    /// The configured URL with any password masked.
    pub fn redacted(&self) -> String {
        redact_database_url(&self.configured)
    }
}

/// Rewrites JDBC connection parameters into the driver's own names.
fn driver_query(backend: Backend, query: &str) -> String {
    let mut mapped = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match driver_parameter(backend, &key, &value) {
            Some((name, value)) => {
                mapped.append_pair(name, &value);
            }
            None => tracing::debug!("Ignoring connection parameter {:?} for {}", key, backend),
        }
    }
    mapped.finish()
}

fn driver_parameter(backend: Backend, key: &str, value: &str) -> Option<(&'static str, String)> {
    let enabled = value.eq_ignore_ascii_case("true");
    let parameter = match (backend, key) {
        (Backend::PostgreSql, "ssl") => {
            let mode = if enabled { "require" } else { "disable" };
            ("sslmode", mode.to_string())
        }
        (Backend::PostgreSql, "sslmode") => ("sslmode", value.to_string()),
        (Backend::PostgreSql, "sslrootcert") => ("sslrootcert", value.to_string()),
        (Backend::PostgreSql, "sslcert") => ("sslcert", value.to_string()),
        (Backend::PostgreSql, "sslkey") => ("sslkey", value.to_string()),
        (Backend::PostgreSql, "user") => ("user", value.to_string()),
        (Backend::PostgreSql, "password") => ("password", value.to_string()),
        (Backend::PostgreSql, "ApplicationName") => ("application_name", value.to_string()),
        (Backend::PostgreSql, "options") => ("options", value.to_string()),
        (Backend::MySql, "useSSL" | "useSsl") => {
            let mode = if enabled { "REQUIRED" } else { "DISABLED" };
            ("ssl-mode", mode.to_string())
        }
        (Backend::MySql, "sslMode" | "sslmode") => ("ssl-mode", value.to_string()),
        (Backend::MySql, "characterEncoding") => ("charset", value.to_string()),
        (Backend::MySql, "serverTimezone" | "connectionTimeZone") => {
            ("timezone", value.to_string())
        }
        (Backend::Sqlite, "mode") => ("mode", value.to_string()),
        (Backend::Sqlite, "cache") => ("cache", value.to_string()),
        (Backend::Sqlite, "immutable") => ("immutable", value.to_string()),
        _ => return None,
    };
    Some(parameter)
}

impl fmt::Debug for JdbcUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JdbcUrl")
            .field("url", &self.redacted())
            .field("backend", &self.backend)
            .finish()
    }
}
