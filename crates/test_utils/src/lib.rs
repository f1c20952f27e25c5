#![deny(missing_docs)]
//! Test utilities to help with testing batchfetch.

pub mod fetcher;
pub mod id;
pub mod sink;

/// Enable tracing with the RUST_LOG environment variable.
///
/// This is intended to be used in tests, so it defaults to DEBUG level.
pub fn enable_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::DEBUG.into())
                .from_env_lossy(),
        )
        .try_init();
}

/// Repeat a code block until it breaks out of the loop, sleeping in
/// between tries. Panics if the block has not broken out before the
/// timeout.
///
/// - `iter_check!(timeout_ms, sleep_ms, { ... })`
/// - `iter_check!(timeout_ms, { ... })` sleeps 10ms between tries
/// - `iter_check!({ ... })` times out after 1000ms
#[macro_export]
macro_rules! iter_check {
    ($timeout_ms:expr, $sleep_ms:expr, $code:block) => {
        tokio::time::timeout(
            std::time::Duration::from_millis($timeout_ms),
            async {
                loop {
                    tokio::time::sleep(std::time::Duration::from_millis(
                        $sleep_ms,
                    ))
                    .await;
                    $code
                }
            },
        )
        .await
        .expect("iter_check timed out");
    };
    ($timeout_ms:expr, $code:block) => {
        $crate::iter_check!($timeout_ms, 10, $code)
    };
    ($code:block) => {
        $crate::iter_check!(1000, $code)
    };
}
