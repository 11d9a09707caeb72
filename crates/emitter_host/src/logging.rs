//! Logging system setup.
//!
//! Initializes `tracing-subscriber` with human-readable or JSON output. Thread
//! names are always included, which makes it easy to see that listeners run
//! on the loop thread.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// # Arguments
///
/// * `config` - Logging settings from the config file
/// * `json_format` - Forces JSON output regardless of `config` (CLI override)
///
/// # Returns
///
/// `Ok(())` once the subscriber is installed, or an error if one was already
/// set for this process.
///
/// # Features
///
/// * **Environment variable support** - `RUST_LOG` takes precedence over the
///   configured level
/// * **Thread information** - thread ids and names on every line, so loop
///   thread output is easy to pick out
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(fmt::layer()
                .json()
                .with_file(false)
                .with_line_number(false)
                .with_thread_ids(true)
                .with_thread_names(true)
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer()
                .with_ansi(true)
                .with_file(false)
                .with_line_number(false)
                .with_thread_ids(true)
                .with_thread_names(true)
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}
