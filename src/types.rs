use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a run as recorded by the run store.
///
/// The launcher only ever asks whether a status is terminal; the other
/// variants exist so stores and workers can describe where a run is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Queued,
    #[default]
    NotStarted,
    /// Run is tracked but executed by something outside the launcher.
    Managed,
    Starting,
    Started,
    Success,
    Failure,
    /// Termination was requested; the worker may not have acted on it yet.
    Canceling,
    Canceled,
}

impl RunStatus {
    /// Terminal statuses: no further progress happens from here.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            RunStatus::Success | RunStatus::Failure | RunStatus::Canceled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "QUEUED",
            RunStatus::NotStarted => "NOT_STARTED",
            RunStatus::Managed => "MANAGED",
            RunStatus::Starting => "STARTING",
            RunStatus::Started => "STARTED",
            RunStatus::Success => "SUCCESS",
            RunStatus::Failure => "FAILURE",
            RunStatus::Canceling => "CANCELING",
            RunStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "queued" => Ok(RunStatus::Queued),
            "not_started" => Ok(RunStatus::NotStarted),
            "managed" => Ok(RunStatus::Managed),
            "starting" => Ok(RunStatus::Starting),
            "started" => Ok(RunStatus::Started),
            "success" => Ok(RunStatus::Success),
            "failure" => Ok(RunStatus::Failure),
            "canceling" => Ok(RunStatus::Canceling),
            "canceled" => Ok(RunStatus::Canceled),
            other => Err(format!("invalid run status: {other}")),
        }
    }
}

/// Parse durations of the form `<number><unit>` with unit `ms`, `s`, `m`
/// or `h` (e.g. `"10ms"`, `"30s"`).
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    let secs_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
