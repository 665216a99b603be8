// tests/connection_metadata.rs

use proptest::prelude::*;
use serde_json::json;

use runlaunch::errors::LaunchError;
use runlaunch::target::{ConnectionMetadata, Endpoint};

#[test]
fn tcp_tag_has_only_host_and_port() {
    let tag = ConnectionMetadata::tcp("h", 50051).to_tag_value().unwrap();
    let value: serde_json::Value = serde_json::from_str(&tag).unwrap();

    assert_eq!(value, json!({"host": "h", "port": 50051}));
}

#[test]
fn socket_tag_with_ssl() {
    let tag = ConnectionMetadata::socket("/run/worker.sock")
        .with_ssl(true)
        .to_tag_value()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&tag).unwrap();

    assert_eq!(value, json!({"socket": "/run/worker.sock", "use_ssl": true}));
}

#[test]
fn missing_use_ssl_reads_as_false() {
    let meta = ConnectionMetadata::from_tag_value(r#"{"host": "h", "port": 1}"#).unwrap();

    assert!(!meta.use_ssl);
    assert_eq!(
        meta.endpoint,
        Endpoint::Tcp {
            host: "h".to_string(),
            port: 1
        }
    );
}

#[test]
fn explicit_false_use_ssl_is_accepted() {
    let meta =
        ConnectionMetadata::from_tag_value(r#"{"socket": "/s", "use_ssl": false}"#).unwrap();
    assert_eq!(meta, ConnectionMetadata::socket("/s"));
}

#[test]
fn ambiguous_or_incomplete_tags_are_rejected() {
    for tag in [
        r#"{"host": "h", "port": 1, "socket": "/s"}"#,
        r#"{"host": "h"}"#,
        r#"{"port": 1}"#,
        r#"{}"#,
        r#"not json"#,
    ] {
        assert!(
            matches!(
                ConnectionMetadata::from_tag_value(tag),
                Err(LaunchError::InvalidConnectionMetadata(_))
            ),
            "tag {tag} should be rejected"
        );
    }
}

proptest! {
    #[test]
    fn tag_always_names_exactly_one_endpoint(
        host in "[a-z][a-z0-9.-]{0,20}",
        port in any::<u16>(),
        use_ssl in any::<bool>(),
    ) {
        let meta = ConnectionMetadata::tcp(host, port).with_ssl(use_ssl);
        let value: serde_json::Value = serde_json::from_str(&meta.to_tag_value().unwrap()).unwrap();

        prop_assert!(value.get("host").is_some());
        prop_assert!(value.get("socket").is_none());
        prop_assert_eq!(value.get("use_ssl").is_some(), use_ssl);
        prop_assert_eq!(ConnectionMetadata::from_tag_value(&value.to_string()).unwrap(), meta);
    }
}
