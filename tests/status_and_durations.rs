// tests/status_and_durations.rs

use std::time::Duration;

use runlaunch::types::{RunStatus, parse_duration};

#[test]
fn only_success_failure_and_canceled_are_terminal() {
    let terminal: Vec<_> = [
        RunStatus::Queued,
        RunStatus::NotStarted,
        RunStatus::Managed,
        RunStatus::Starting,
        RunStatus::Started,
        RunStatus::Success,
        RunStatus::Failure,
        RunStatus::Canceling,
        RunStatus::Canceled,
    ]
    .into_iter()
    .filter(|s| s.is_finished())
    .collect();

    assert_eq!(
        terminal,
        vec![RunStatus::Success, RunStatus::Failure, RunStatus::Canceled]
    );
}

#[test]
fn status_parses_from_cli_spelling() {
    assert_eq!("not-started".parse::<RunStatus>(), Ok(RunStatus::NotStarted));
    assert_eq!("CANCELING".parse::<RunStatus>(), Ok(RunStatus::Canceling));
    assert!("done".parse::<RunStatus>().is_err());
}

#[test]
fn status_serialises_in_screaming_snake_case() {
    let json = serde_json::to_string(&RunStatus::NotStarted).unwrap();
    assert_eq!(json, "\"NOT_STARTED\"");
    assert_eq!(RunStatus::NotStarted.to_string(), "NOT_STARTED");
}

#[test]
fn durations_accept_known_units() {
    assert_eq!(parse_duration("10ms"), Ok(Duration::from_millis(10)));
    assert_eq!(parse_duration(" 5s "), Ok(Duration::from_secs(5)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
}

#[test]
fn durations_reject_bad_input() {
    assert!(parse_duration("").is_err());
    assert!(parse_duration("30").is_err());
    assert!(parse_duration("5d").is_err());
    assert!(parse_duration("s").is_err());
}

#[test]
fn oversized_durations_are_errors() {
    assert!(parse_duration("6000000000000000h").is_err());
    assert!(parse_duration("400000000000000000m").is_err());
    assert!(parse_duration("99999999999999999999s").is_err());
    assert_eq!(
        parse_duration("18446744073709551615ms"),
        Ok(Duration::from_millis(u64::MAX))
    );
}
