//! Logging setup for test binaries.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber for a test binary
///
/// `RUST_LOG` takes precedence over the configured level. Output goes through
/// the test writer so `cargo test` captures it per test. Returns `false` when
/// a subscriber was already installed, which is expected when several tests
/// in one binary call this.
pub fn init_test_logging(config: &LoggingConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let json_layer = config
        .json_format
        .then(|| fmt::layer().json().with_test_writer());
    let text_layer = (!config.json_format).then(|| fmt::layer().with_test_writer());

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .is_ok()
}
