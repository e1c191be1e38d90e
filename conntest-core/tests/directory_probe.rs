//! Directory probe tests that need no server.

#![allow(clippy::unwrap_used)]

use conntest_core::{DirectoryConnector, Kind, run_probe};
use std::path::PathBuf;
use tempfile::TempDir;

fn write_properties(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("ldap_test.properties");
    std::fs::write(&path, contents).unwrap();
    path
}

async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn test_unreachable_server_is_connection_failure() {
    let dir = TempDir::new().unwrap();
    let port = closed_port().await;
    let path = write_properties(
        &dir,
        &format!(
            "java.naming.factory.initial=com.sun.jndi.ldap.LdapCtxFactory\n\
             java.naming.provider.url=ldap://127.0.0.1:{port}\n\
             java.naming.security.authentication=simple\n\
             java.naming.security.principal=cn=admin,dc=example,dc=com\n\
             java.naming.security.credentials=hunter2\n\
             ldap.baseDN=dc=example,dc=com\n\
             ldap.search.filter=(objectClass=*)\n"
        ),
    );

    let classification = run_probe(&DirectoryConnector::new(), &path, |c| c).await;

    assert_eq!(classification.kind(), Kind::ConnectionError);
    assert_eq!(classification.exit_code(), 1);
    let message = classification.message().unwrap();
    assert!(message.starts_with("Connection failure! "));
    assert!(!message.contains("hunter2"));
}

#[tokio::test]
async fn test_missing_factory_is_connection_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_properties(&dir, "java.naming.provider.url=ldap://127.0.0.1:389\n");

    let classification = run_probe(&DirectoryConnector::new(), &path, |c| c).await;

    assert_eq!(classification.kind(), Kind::ConnectionError);
    assert!(
        classification
            .message()
            .unwrap()
            .contains("java.naming.factory.initial")
    );
}

#[tokio::test]
async fn test_missing_properties_file_is_config_error() {
    let dir = TempDir::new().unwrap();

    let classification = run_probe(
        &DirectoryConnector::new(),
        &dir.path().join("ldap_test.properties"),
        |c| c,
    )
    .await;

    assert_eq!(classification.kind(), Kind::ConfigError);
    assert_eq!(classification.exit_code(), 2);
}

#[tokio::test]
async fn test_properties_directory_is_config_error() {
    let dir = TempDir::new().unwrap();

    let classification = run_probe(&DirectoryConnector::new(), dir.path(), |c| c).await;

    assert_eq!(classification.kind(), Kind::ConfigError);
}
