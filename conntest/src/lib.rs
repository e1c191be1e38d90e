//! Command-line front end of the `dbconn-test` and `ldapconn-test` tools.
//!
//! Each binary parses its arguments, runs exactly one probe through
//! `conntest-core`, prints the report and exits with the classified code:
//!
//! | exit | meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | connected (and, for LDAP, the search executed)      |
//! | 1    | the target rejected or could not be reached         |
//! | 2    | properties file unreadable, or a usage error        |

use clap::{Args, Parser};
use conntest_core::adapters::database::{PASSWORD_KEY, URL_KEY, USERNAME_KEY};
use conntest_core::adapters::directory::environment::{
    AUTHENTICATION_KEY, CREDENTIALS_KEY, FACTORY_KEY, LDAP_CONTEXT_FACTORY, PRINCIPAL_KEY,
    PROVIDER_URL_KEY, STARTTLS_KEY,
};
use conntest_core::{
    Classification, ConnectionConfig, DatabaseConnector, DirectoryConnector, Probe, ReportStyle,
    run_probe, write_report,
};
use std::path::PathBuf;

pub mod prompt;

/// Environment variable naming the database properties file.
pub const DB_PROPERTIES_ENV: &str = "CONNTEST_DB_PROPERTIES";
/// Environment variable naming the directory properties file.
pub const LDAP_PROPERTIES_ENV: &str = "CONNTEST_LDAP_PROPERTIES";

/// Logging flags shared by both tools.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase log verbosity on stderr (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

#[derive(Debug, Parser)]
#[command(name = "dbconn-test")]
#[command(about = "Test a database connection described by a properties file")]
#[command(version)]
#[command(long_about = "
Makes a single connection attempt to the database named by the `jdbc.url` key
of a properties file and reports the server's product, version and session user.

PROPERTIES KEYS:
  jdbc.url       jdbc:postgresql://host:5432/db, jdbc:mysql://host:3306/db,
                 jdbc:mariadb://host:3306/db, jdbc:sqlite:/path/to/file.db
  jdbc.username  optional login user
  jdbc.password  optional login password

`-U` and `-u` take precedence over the file's jdbc.url and jdbc.username.

EXIT CODES:
  0  connected
  1  connection failed
  2  properties file missing or unreadable

EXAMPLES:
  dbconn-test
  dbconn-test /etc/app/jdbc_test.properties
  dbconn-test --brief -W prod.properties
  dbconn-test -U jdbc:postgresql://db:5432/app -u app -W
")]
pub struct DbCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Properties file to load
    #[arg(
        value_name = "PROPERTIES",
        env = DB_PROPERTIES_ENV,
        default_value = Probe::Database.default_properties_file(),
        help = "Properties file describing the connection"
    )]
    pub properties: PathBuf,

    /// Database URL override
    #[arg(
        short = 'U',
        long,
        value_name = "URL",
        help = "Database URL to use instead of jdbc.url"
    )]
    pub url: Option<String>,

    /// Username override
    #[arg(
        short = 'u',
        long,
        value_name = "USER",
        help = "Login user to use instead of jdbc.username"
    )]
    pub username: Option<String>,

    /// Print only OK on success
    #[arg(long, help = "Print only OK on success instead of connection details")]
    pub brief: bool,

    /// Prompt for the password
    #[arg(
        short = 'W',
        long,
        help = "Prompt for the password when the properties file does not set one"
    )]
    pub prompt_password: bool,
}

impl DbCli {
    /// Success output requested on the command line.
    pub fn report_style(&self) -> ReportStyle {
        if self.brief {
            ReportStyle::Brief
        } else {
            ReportStyle::Detailed
        }
    }

    /// Properties set on the command line, applied over the file.
    pub fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        if let Some(url) = &self.url {
            overrides.push((URL_KEY, url.clone()));
        }
        if let Some(username) = &self.username {
            overrides.push((USERNAME_KEY, username.clone()));
        }
        overrides
    }
}

#[derive(Debug, Parser)]
#[command(name = "ldapconn-test")]
#[command(about = "Test a directory server connection described by a properties file")]
#[command(version)]
#[command(long_about = "
Connects to the LDAP server named in a properties file, binds as configured and
runs one subtree search limited to a single entry. Prints OK when the server
executed the search.

PROPERTIES KEYS:
  java.naming.factory.initial          com.sun.jndi.ldap.LdapCtxFactory
  java.naming.provider.url             ldap://host:389 or ldaps://host:636
  java.naming.security.authentication  none or simple
  java.naming.security.principal       bind DN
  java.naming.security.credentials     bind password
  ldap.baseDN                          search base
  ldap.search.filter                   search filter
  ldap.starttls                        true to upgrade ldap:// with StartTLS

`-H`, `-D` and `-Z` take precedence over the file. `-D` implies a simple bind.

EXIT CODES:
  0  search executed
  1  connection, bind or search failed
  2  properties file missing or unreadable
")]
pub struct LdapCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Properties file to load
    #[arg(
        value_name = "PROPERTIES",
        env = LDAP_PROPERTIES_ENV,
        default_value = Probe::Directory.default_properties_file(),
        help = "Properties file describing the connection"
    )]
    pub properties: PathBuf,

    /// Server URL override
    #[arg(
        short = 'H',
        long,
        value_name = "URL",
        help = "LDAP URL to use instead of java.naming.provider.url"
    )]
    pub provider_url: Option<String>,

    /// Bind DN override
    #[arg(
        short = 'D',
        long,
        value_name = "BINDDN",
        help = "Bind DN to use instead of java.naming.security.principal"
    )]
    pub bind_dn: Option<String>,

    /// Force StartTLS
    #[arg(short = 'Z', long, help = "Upgrade the connection with StartTLS")]
    pub starttls: bool,

    /// Prompt for the bind password
    #[arg(
        short = 'W',
        long,
        help = "Prompt for the bind password when the properties file does not set one"
    )]
    pub prompt_password: bool,
}

impl LdapCli {
    /// Properties set on the command line, applied over the file.
    pub fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        if let Some(url) = &self.provider_url {
            overrides.push((PROVIDER_URL_KEY, url.clone()));
        }
        if let Some(bind_dn) = &self.bind_dn {
            overrides.push((AUTHENTICATION_KEY, "simple".to_string()));
            overrides.push((PRINCIPAL_KEY, bind_dn.clone()));
        }
        if self.starttls {
            overrides.push((STARTTLS_KEY, "true".to_string()));
        }
        overrides
    }
}

/// Runs the database probe described by `cli`.
pub async fn run_database(cli: &DbCli) -> Classification {
    let prompt = cli.prompt_password;
    let overrides = cli.overrides();
    run_probe(&DatabaseConnector::new(), &cli.properties, move |config| {
        let config = apply_overrides(config, overrides);
        prompt_if(prompt, config, PASSWORD_KEY, "Enter database password: ")
    })
    .await
}

/// Runs the directory probe described by `cli`.
pub async fn run_directory(cli: &LdapCli) -> Classification {
    let prompt = cli.prompt_password;
    let overrides = cli.overrides();
    let sets_provider = cli.provider_url.is_some();
    run_probe(&DirectoryConnector::new(), &cli.properties, move |config| {
        // A server named on the command line needs no factory in the file
        let config = if sets_provider && config.get(FACTORY_KEY).is_none() {
            config.with_value(FACTORY_KEY, LDAP_CONTEXT_FACTORY)
        } else {
            config
        };
        let config = apply_overrides(config, overrides);
        prompt_if(prompt, config, CREDENTIALS_KEY, "Enter bind password: ")
    })
    .await
}

fn apply_overrides(
    config: ConnectionConfig,
    overrides: Vec<(&'static str, String)>,
) -> ConnectionConfig {
    overrides.into_iter().fold(config, |config, (key, value)| {
        tracing::debug!("Command line sets {}", key);
        config.with_value(key, value)
    })
}

fn prompt_if(
    enabled: bool,
    config: ConnectionConfig,
    key: &str,
    label: &str,
) -> ConnectionConfig {
    if !enabled || config.get(key).is_some_and(|value| !value.is_empty()) {
        return config;
    }
    match prompt::with_prompted_secret(config.clone(), key, label, prompt::read_from_terminal) {
        Ok(prompted) => prompted,
        Err(e) => {
            tracing::warn!("{}; using the configured value", e);
            config
        }
    }
}

/// Prints the report on the process's stdout/stderr.
pub fn emit_report(classification: &Classification, style: ReportStyle) {
    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    if let Err(e) = write_report(classification, style, &mut stdout.lock(), &mut stderr.lock()) {
        tracing::error!("Failed to write report: {}", e);
    }
}
