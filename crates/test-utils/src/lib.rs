//! Shared helpers for pipechain's integration tests.
//!
//! - [`fake_process`]: a scripted [`Process`](pipechain::Process) that never
//!   spawns anything, plus the journal it writes to.
//! - [`builders`]: pipeline file builders.

pub mod builders;
pub mod fake_process;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use pipechain::logging::{build_filter, LOG_ENV};
use tracing_subscriber::fmt;

/// Upper bound for any single chain operation in a test. Real stages used in
/// tests finish in milliseconds; anything longer is a hang.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Route pipechain's logs into the test harness.
///
/// Reads the same `PIPECHAIN_LOG` filter as the binary (falling back to
/// `RUST_LOG`), so `PIPECHAIN_LOG=pipechain::chain=debug cargo test` shows
/// the wiring of failing tests only.
pub fn init_tracing() {
    INIT.call_once(|| {
        let spec = std::env::var(LOG_ENV)
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();

        // Another harness may have installed a subscriber first.
        let _ = fmt()
            .with_env_filter(build_filter(None, spec.as_deref()))
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("chain operation still pending after {TEST_TIMEOUT:?}"),
    }
}
