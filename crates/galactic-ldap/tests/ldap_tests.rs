//! Integration tests for the LDAP provider that need no server

use galactic_identity::{DirectoryClient, SearchFilter, SearchRequest};
use galactic_ldap::filter::request_filter;
use galactic_ldap::{LdapClient, LdapConfig, LdapError};
use std::io::Write;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_openldap_style_config() {
    let file = write_config(
        r#"
        url = "ldap://ldap.example.org:389"
        base_dn = "dc=example,dc=org"
        bind_dn = "cn=admin,dc=example,dc=org"
        bind_password = "admin"
        user_object_class = "inetOrgPerson"
        group_object_class = "groupOfNames"
        creation_time_attribute = "createTimestamp"
        in_chain_matching = false

        [attribute_map]
        surname = "sn"
        userPrincipalName = "uid"
        "#,
    );

    let config = LdapConfig::from_file(file.path()).unwrap();
    assert_eq!(config.ldap_name("userPrincipalName"), "uid");
    assert!(!config.in_chain_matching);

    let request = SearchRequest::users().with_filter(SearchFilter::or(vec![
        SearchFilter::eq("userPrincipalName", "jdoe"),
        SearchFilter::starts_with("surname", "Do"),
    ]));
    assert_eq!(
        request_filter(&request, &config),
        "(&(objectClass=inetOrgPerson)(|(uid=jdoe)(sn=Do*)))"
    );
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let file = write_config("url = \"ldap://x\"\n");
    match LdapConfig::from_file(file.path()) {
        Err(LdapError::ConfigError { message }) => assert!(message.contains("Base DN")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_client_is_a_directory_client() {
    let client = LdapClient::new(LdapConfig {
        base_dn: "dc=example,dc=org".to_string(),
        ..LdapConfig::default()
    })
    .unwrap();
    let directory: &dyn DirectoryClient = &client;
    assert_eq!(directory.provider_name(), "ldap");
}

#[tokio::test]
async fn test_unreachable_server_is_a_provider_error() {
    let client = LdapClient::new(LdapConfig {
        url: "ldap://127.0.0.1:1".to_string(),
        base_dn: "dc=example,dc=org".to_string(),
        connection_timeout_secs: 2,
        ..LdapConfig::default()
    })
    .unwrap();

    let err = client.get_object("cn=x,dc=example,dc=org").await.unwrap_err();
    assert!(err.to_string().contains("ldap"));
}
