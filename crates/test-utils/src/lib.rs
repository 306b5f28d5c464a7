pub mod builders;
pub mod fake_commands;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a tracing subscriber wired to the libtest capture, so logs only
/// surface for failing tests (or under `--nocapture`).
///
/// Tests default to `debug` — when one fails, the interesting lines are the
/// store writes and status transitions, and those log at debug. Narrow or
/// widen with `STREAMREC_LOG` (full directives) or plain `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env("STREAMREC_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("debug"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Bound a future; panics if it has not resolved within `secs` seconds.
///
/// Every test that waits on a worker goes through this, so a wedged process
/// fails the test instead of hanging the suite.
pub async fn with_timeout<F>(secs: u64, fut: F) -> F::Output
where
    F: std::future::Future,
{
    match tokio::time::timeout(Duration::from_secs(secs), fut).await {
        Ok(out) => out,
        Err(_) => panic!("future did not resolve within {secs}s"),
    }
}
