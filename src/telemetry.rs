//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Environment variable holding an `EnvFilter` directive string. Overrides the
/// configured level when set.
pub const LOG_FILTER_ENV: &str = "NETPULSE_LOG";

/// Install the global fmt subscriber. Returns `false` if a subscriber was
/// already installed, in which case nothing changes.
pub fn init(logging: &LoggingConfig) -> bool {
    let default_level = logging.level_filter().unwrap_or_else(|e| {
        eprintln!("netpulse-sync: {e}; falling back to info");
        tracing::level_filters::LevelFilter::INFO
    });

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_FILTER_ENV)
        .from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Full => builder.try_init(),
    };
    installed.is_ok()
}
