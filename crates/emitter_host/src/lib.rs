//! # Emitter Host
//!
//! Runs a loop-owned [`loop_emitter::Emitter`] on a dedicated thread and
//! drives it from a pool of worker threads: each worker submits async
//! emissions whose payloads are built on the loop thread, and the loop-side
//! listeners count and log them.
//!
//! ```bash
//! # Run with default configuration (writes emitter.toml if missing)
//! emitter_host
//!
//! # Bigger workload, debug logging
//! emitter_host --workers 8 --events 1000 --log-level debug
//!
//! # Keep the loop alive until Ctrl+C
//! emitter_host --wait --json-logs
//! ```

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Entry point called from `main`.
///
/// # Exit Codes
///
/// * **0**: Successful run and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging settings come from the file, overridden by the CLI
    let mut logging_settings = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default()
        .logging;
    if let Some(level) = &args.log_level {
        logging_settings.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&logging_settings, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}
