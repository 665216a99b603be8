//! Shared fixtures for runlaunch integration tests.

pub mod builders;
pub mod fake_client;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use runlaunch::logging::LOG_ENV_VAR;
use tracing_subscriber::EnvFilter;

/// Upper bound for operations that must finish promptly in tests.
pub const TEST_DEADLINE: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Route launcher logs into the test harness's captured output.
///
/// Honours the same `RUNLAUNCH_LOG` directives as the binary, falling back
/// to `warn` so passing tests stay quiet.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `fut`, failing the test if it outlives [`TEST_DEADLINE`].
pub async fn with_timeout<F: Future>(fut: F) -> F::Output {
    match tokio::time::timeout(TEST_DEADLINE, fut).await {
        Ok(output) => output,
        Err(_) => panic!("operation did not finish within {TEST_DEADLINE:?}"),
    }
}
