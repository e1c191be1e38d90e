//! Directory environment read from the properties file.
//!
//! The keys follow JNDI naming so existing `ldap_test.properties` files keep
//! working:
//!
//! | Key                                | Meaning                              |
//! |------------------------------------|--------------------------------------|
//! | `java.naming.factory.initial`      | must name the LDAP context factory   |
//! | `java.naming.provider.url`         | `ldap://` or `ldaps://` server URL   |
//! | `java.naming.security.authentication` | `none` or `simple`                |
//! | `java.naming.security.principal`   | bind DN                              |
//! | `java.naming.security.credentials` | bind password                        |
//! | `ldap.baseDN`                      | search base                          |
//! | `ldap.search.filter`               | search filter                        |
//! | `ldap.starttls`                    | `true` upgrades `ldap://` via StartTLS |

use crate::outcome::{DirectoryFailure, RawError};
use crate::properties::ConnectionConfig;
use crate::security::Credentials;

/// Context factory class name
pub const FACTORY_KEY: &str = "java.naming.factory.initial";
/// Server URL
pub const PROVIDER_URL_KEY: &str = "java.naming.provider.url";
/// Authentication mechanism
pub const AUTHENTICATION_KEY: &str = "java.naming.security.authentication";
/// Bind DN
pub const PRINCIPAL_KEY: &str = "java.naming.security.principal";
/// Bind password
pub const CREDENTIALS_KEY: &str = "java.naming.security.credentials";
/// Search base
pub const BASE_DN_KEY: &str = "ldap.baseDN";
/// Search filter
pub const FILTER_KEY: &str = "ldap.search.filter";
/// StartTLS switch
pub const STARTTLS_KEY: &str = "ldap.starttls";

/// The only context factory this tool can instantiate.
pub const LDAP_CONTEXT_FACTORY: &str = "com.sun.jndi.ldap.LdapCtxFactory";

/// How the context authenticates after connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authentication {
    /// Anonymous; no bind is sent
    Anonymous,
    /// Simple bind with principal and credentials
    Simple,
}

/// Directory settings of one run.
#[derive(Debug)]
pub struct DirectoryEnvironment {
    factory: Option<String>,
    provider_url: Option<String>,
    authentication: Option<String>,
    credentials: Credentials,
    base_dn: Option<String>,
    filter: Option<String>,
    start_tls: bool,
}

impl DirectoryEnvironment {
    /// Reads the directory keys from `config`.
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            factory: config.get_owned(FACTORY_KEY),
            provider_url: config.get_owned(PROVIDER_URL_KEY),
            authentication: config.get_owned(AUTHENTICATION_KEY),
            credentials: Credentials::from_config(config, PRINCIPAL_KEY, CREDENTIALS_KEY),
            base_dn: config.get_owned(BASE_DN_KEY),
            filter: config.get_owned(FILTER_KEY),
            start_tls: config
                .get(STARTTLS_KEY)
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("true")),
        }
    }

    /// Checks that the configured factory is the LDAP one.
    pub fn check_factory(&self) -> Result<(), DirectoryFailure> {
        match self.factory.as_deref().map(str::trim) {
            None | Some("") => Err(DirectoryFailure::new(format!(
                "Need to specify class name in environment or system property: {}",
                FACTORY_KEY
            ))),
            Some(LDAP_CONTEXT_FACTORY) => Ok(()),
            Some(other) => Err(DirectoryFailure::new(format!(
                "Cannot instantiate class: {}",
                other
            ))),
        }
    }

    /// Server URL to connect to.
    ///
    /// # Errors
    /// Fails when the URL key is absent or empty.
    pub fn provider_url(&self) -> Result<&str, DirectoryFailure> {
        match self.provider_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(DirectoryFailure::new(format!(
                "Cannot connect: {} is not set",
                PROVIDER_URL_KEY
            ))),
        }
    }

    /// Resolves the authentication mechanism.
    ///
    /// Without an explicit mechanism, a configured principal implies a simple
    /// bind.
    pub fn authentication(&self) -> Result<Authentication, DirectoryFailure> {
        match self.authentication.as_deref().map(str::trim) {
            None | Some("") => Ok(if self.credentials.username().is_some() {
                Authentication::Simple
            } else {
                Authentication::Anonymous
            }),
            Some(mechanism) if mechanism.eq_ignore_ascii_case("none") => {
                Ok(Authentication::Anonymous)
            }
            Some(mechanism) if mechanism.eq_ignore_ascii_case("simple") => {
                Ok(Authentication::Simple)
            }
            Some(mechanism) => Err(DirectoryFailure::new(format!(
                "Unsupported authentication mechanism: {}",
                mechanism
            ))),
        }
    }

    /// Bind principal and password.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Whether to upgrade a plain connection with StartTLS.
    pub fn start_tls(&self) -> bool {
        self.start_tls
    }

    /// Search base and filter.
    ///
    /// Either one missing is not a directory failure: the search cannot even
    /// be expressed.
    pub fn search_target(&self) -> Result<(&str, &str), RawError> {
        let base_dn = self
            .base_dn
            .as_deref()
            .ok_or_else(|| RawError::other(format!("{} is not set", BASE_DN_KEY)))?;
        let filter = self
            .filter
            .as_deref()
            .ok_or_else(|| RawError::other(format!("{} is not set", FILTER_KEY)))?;
        Ok((base_dn, filter))
    }
}
