//! Rendering of a classified run.
//!
//! Successful runs write to stdout, failed runs to stderr; a run never writes
//! to both. Database successes print a short metadata block:
//!
//! ```text
//! Connected to: PostgreSQL 16.2
//!          URL: jdbc:postgresql://db.internal:5432/app
//!     Username: app
//!       Driver: sqlx-postgres 0.8
//! ```
//!
//! Directory successes print exactly `OK`.

use crate::outcome::{Classification, ConnectionMetadata, DatabaseMetadata};
use std::io::{self, Write};

/// Amount of detail on success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportStyle {
    /// Metadata block for databases, `OK` for directories
    #[default]
    Detailed,
    /// `OK` for every probe
    Brief,
}

/// Line printed by brief and directory reports.
pub const OK_LINE: &str = "OK";

/// Placeholder for a connection without a session user.
const NO_USERNAME: &str = "(none)";

/// Writes the report of `classification` to `out` (success) or `err` (failure).
///
/// # Errors
/// Returns the I/O error of the underlying writer.
pub fn write_report<O, E>(
    classification: &Classification,
    style: ReportStyle,
    out: &mut O,
    err: &mut E,
) -> io::Result<()>
where
    O: Write + ?Sized,
    E: Write + ?Sized,
{
    if !classification.is_success() {
        if let Some(message) = classification.message() {
            writeln!(err, "{}", message)?;
        }
        return err.flush();
    }

    match (classification.metadata(), style) {
        (Some(ConnectionMetadata::Database(metadata)), ReportStyle::Detailed) => {
            out.write_all(format_database_report(metadata).as_bytes())?;
        }
        _ => writeln!(out, "{}", OK_LINE)?,
    }
    out.flush()
}

/// Formats the metadata block of a successful database connection.
pub fn format_database_report(metadata: &DatabaseMetadata) -> String {
    format!(
        "Connected to: {} {}\n         URL: {}\n    Username: {}\n      Driver: {} {}\n",
        metadata.product_name,
        metadata.product_version,
        metadata.url,
        metadata.username.as_deref().unwrap_or(NO_USERNAME),
        metadata.driver_name,
        metadata.driver_version,
    )
}
