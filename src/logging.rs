//! Logging configuration using tracing
//!
//! The adapters log through `tracing`: call sites emit `debug!` around
//! remote calls and `warn!`/`error!` on upstream contract breaks. Hosts that
//! already run a subscriber can skip this module entirely; `init` is a
//! convenience for standalone use.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber
///
/// Filtering follows the RUST_LOG environment variable and defaults to
/// "warn" so that only contract breaks surface.
///
/// # Example RUST_LOG values
/// - `RUST_LOG=debug` - Show every remote call
/// - `RUST_LOG=flow_adapters=trace` - Trace level for this crate only
///
/// # Errors
/// Returns an error if a subscriber has already been installed.
pub fn init() -> crate::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| {
            crate::AdapterError::Config(format!("Failed to initialize tracing: {}", e))
        })?;

    Ok(())
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_helper() {
        // Safe to call repeatedly regardless of test ordering
        init_test();
        init_test();
    }
}
