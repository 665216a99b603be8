// tests/config_loading.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use runlaunch::config::{ConfigFile, LauncherSettings, load_and_validate, load_or_default};
use runlaunch::errors::LaunchError;
use runlaunch::store::RunStoreRef;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn empty_config_uses_defaults() {
    let file = config_file("");

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.launcher, LauncherSettings::default());
    assert!(!cfg.launcher.wait_for_processes);
    assert_eq!(cfg.launcher.join_timeout, Duration::from_secs(30));
    assert_eq!(cfg.launcher.initial_poll_interval, Duration::from_millis(10));
    assert_eq!(cfg.launcher.can_cancel_timeout, Duration::from_secs(5));
    assert_eq!(cfg.run_store_ref(), RunStoreRef::InMemory);
    assert_eq!(cfg.source.as_deref(), Some(file.path()));
}

#[test]
fn full_config_is_parsed() {
    let file = config_file(
        r#"
[launcher]
wait_for_processes = true
join_timeout = "2m"
initial_poll_interval = "5ms"
max_poll_interval = "500ms"
can_cancel_timeout = "3s"
request_timeout = "10s"

[store]
path = "state/runs.json"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert!(cfg.launcher.wait_for_processes);
    assert_eq!(cfg.launcher.join_timeout, Duration::from_secs(120));
    assert_eq!(cfg.launcher.initial_poll_interval, Duration::from_millis(5));
    assert_eq!(cfg.launcher.max_poll_interval, Duration::from_millis(500));
    assert_eq!(cfg.launcher.can_cancel_timeout, Duration::from_secs(3));
    assert_eq!(cfg.launcher.request_timeout, Duration::from_secs(10));

    let instance_ref = cfg.instance_ref();
    assert_eq!(
        instance_ref.run_store,
        RunStoreRef::JsonFile {
            path: PathBuf::from("state/runs.json")
        }
    );
    assert_eq!(instance_ref.config_path.as_deref(), Some(file.path()));
}

#[test]
fn bad_duration_is_config_error() {
    let file = config_file(
        r#"
[launcher]
join_timeout = "thirty seconds"
"#,
    );

    match load_and_validate(file.path()) {
        Err(LaunchError::ConfigError(msg)) => assert!(msg.contains("join_timeout")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn overflowing_duration_is_config_error() {
    let file = config_file(
        r#"
[launcher]
join_timeout = "6000000000000000h"
"#,
    );

    match load_and_validate(file.path()) {
        Err(LaunchError::ConfigError(msg)) => {
            assert!(msg.contains("join_timeout"));
            assert!(msg.contains("too large"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn zero_duration_is_rejected() {
    let file = config_file(
        r#"
[launcher]
can_cancel_timeout = "0s"
"#,
    );

    match load_and_validate(file.path()) {
        Err(LaunchError::ConfigError(msg)) => {
            assert!(msg.contains("can_cancel_timeout"));
            assert!(msg.contains("greater than zero"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn initial_interval_above_cap_is_rejected() {
    let file = config_file(
        r#"
[launcher]
initial_poll_interval = "2s"
max_poll_interval = "1s"
"#,
    );

    match load_and_validate(file.path()) {
        Err(LaunchError::ConfigError(msg)) => assert!(msg.contains("max_poll_interval")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn unknown_key_is_toml_error() {
    let file = config_file(
        r#"
[launcher]
wait_for_process = true
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(LaunchError::TomlError(_))
    ));
}

#[test]
fn missing_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_or_default(dir.path().join("Runlaunch.toml")).unwrap();

    assert_eq!(cfg.launcher, ConfigFile::default().launcher);
    assert!(cfg.source.is_none());
}
