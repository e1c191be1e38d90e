//! Interactive password entry.

use conntest_core::{ConnectionConfig, ConntestError};
use std::io;
use zeroize::Zeroizing;

/// Reads a secret from the controlling terminal without echo.
pub fn read_from_terminal(label: &str) -> io::Result<String> {
    rpassword::prompt_password(label)
}

/// Returns `config` with `key` set to a secret obtained from `read`.
///
/// The typed secret replaces any value the file carried.
///
/// # Errors
/// Returns a prompt error if `read` fails (no terminal, closed stdin, ...).
pub fn with_prompted_secret<R>(
    config: ConnectionConfig,
    key: &str,
    label: &str,
    read: R,
) -> Result<ConnectionConfig, ConntestError>
where
    R: FnOnce(&str) -> io::Result<String>,
{
    let secret = Zeroizing::new(
        read(label).map_err(|e| ConntestError::prompt_failed(format!("reading {key}"), e))?,
    );
    Ok(config.with_value(key, secret.as_str()))
}
