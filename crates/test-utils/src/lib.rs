// crates/test-utils/src/lib.rs

//! Fakes and builders shared by the `rerun` integration tests.

pub mod builders;
pub mod fake_process;

pub use builders::SettingsBuilder;
pub use fake_process::{FakeProcess, ProcessCall};

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Install a test-captured subscriber once per test binary.
///
/// Reads the same `RERUN_LOG` directives as the binary, defaulting to `info`.
/// Output only shows for failing tests unless run with `--nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(rerun::logging::LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `fut`, panicking if it takes longer than `limit`.
///
/// A hung supervisor loop fails the test instead of stalling the suite.
pub async fn within<F: Future>(limit: Duration, fut: F) -> F::Output {
    match tokio::time::timeout(limit, fut).await {
        Ok(out) => out,
        Err(_) => panic!("did not finish within {limit:?}"),
    }
}
