//! Secure credential container with automatic memory zeroing.
//!
//! # Security
//! - Credentials are stored in `Zeroizing<T>` containers
//! - Memory is automatically cleared when credentials go out of scope
//! - Passwords are never exposed in debug output or logs

use crate::ConnectionConfig;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// Secure credential container that automatically zeros memory on drop.
///
/// Both parts are optional: a properties file may omit either key, and the
/// connectors pass the absence on to the protocol layer unchanged.
///
/// # Example
///
/// ```rust
/// use conntest_core::security::Credentials;
///
/// let creds = Credentials::new(Some("admin".to_string()), Some("secret".to_string()));
/// assert_eq!(creds.username(), Some("admin"));
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<Option<String>>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Reads the username and password keys from a loaded config.
    pub fn from_config(config: &ConnectionConfig, username_key: &str, password_key: &str) -> Self {
        Self::new(
            config.get_owned(username_key),
            config.get_owned(password_key),
        )
    }

    /// Gets the username, if one was configured.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Gets the password for handing to a driver.
    ///
    /// Callers must not log the returned value.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
