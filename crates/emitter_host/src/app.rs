//! Application lifecycle: start the owning loop, run the worker workload,
//! wait for completion or a shutdown signal, then stop the loop.

use crate::{cli::CliArgs, config::AppConfig, signals::wait_for_shutdown_signal};
use loop_emitter::{Emitter, EmitterError, EmitterStats, EventLoop, Listener};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Event submitted once every worker has finished.
pub const COMPLETE_EVENT: &str = "work:complete";

/// What a finished run observed.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Progress events seen by the loop-side listener
    pub delivered: u64,
    /// Final emitter statistics
    pub stats: EmitterStats,
}

pub struct Application {
    config: AppConfig,
    wait_for_signal: bool,
}

impl Application {
    /// Loads configuration, applies CLI overrides and validates the result.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if let Some(workers) = args.workers {
            config.demo.workers = workers;
        }
        if let Some(events) = args.events_per_worker {
            config.demo.events_per_worker = events;
        }

        config.validate()?;
        Ok(Self::from_config(config, args.wait_for_signal))
    }

    pub fn from_config(config: AppConfig, wait_for_signal: bool) -> Self {
        Self {
            config,
            wait_for_signal,
        }
    }

    pub async fn run(self) -> Result<RunSummary, Box<dyn std::error::Error>> {
        let demo = self.config.demo.clone();
        let (done_tx, done_rx) = oneshot::channel::<u64>();

        let event_name = demo.event_name.clone();
        let event_loop = EventLoop::spawn::<Value, _>(self.config.emitter.clone(), move |emitter| {
            register_listeners(emitter, &event_name, done_tx)
        })?;
        info!(
            "🚀 Event loop running, {} workers x {} events on '{}'",
            demo.workers, demo.events_per_worker, demo.event_name
        );

        let mut workers = Vec::with_capacity(demo.workers);
        for worker in 0..demo.workers {
            let handle = event_loop.handle();
            let event_name = demo.event_name.clone();
            let count = demo.events_per_worker;

            workers.push(tokio::task::spawn_blocking(move || {
                for seq in 0..count {
                    // Built on the loop thread, not here.
                    handle.emit_async(&event_name, move || {
                        json!({
                            "worker": worker,
                            "seq": seq,
                            "built_on": std::thread::current().name(),
                        })
                    })?;
                }
                Ok::<(), EmitterError>(())
            }));
        }
        for worker in workers {
            worker.await??;
        }

        let workers = demo.workers;
        event_loop.emit_async(COMPLETE_EVENT, move || json!({ "workers": workers }))?;

        let delivered = tokio::select! {
            result = done_rx => result.map_err(|_| "event loop stopped before the run completed")?,
            result = wait_for_shutdown_signal() => {
                result?;
                warn!("⚠️ Interrupted before all events were delivered");
                0
            }
        };

        if self.wait_for_signal {
            info!("⏳ Run complete, waiting for shutdown signal");
            wait_for_shutdown_signal().await?;
        }

        let stats = tokio::task::spawn_blocking(move || event_loop.shutdown()).await??;
        info!("📊 Final stats: {}", serde_json::to_string(&stats)?);

        Ok(RunSummary { delivered, stats })
    }
}

/// Subscribes the host's listeners. Runs on the loop thread.
fn register_listeners(emitter: &Emitter<Value>, event_name: &str, done_tx: oneshot::Sender<u64>) {
    let delivered = Rc::new(Cell::new(0u64));

    let counted = Rc::clone(&delivered);
    let progress = Listener::from_fn(move |payload: &Value| {
        counted.set(counted.get() + 1);
        debug!("progress {}", payload);
    });

    let first = Listener::from_fn(|payload: &Value| {
        info!(
            "📨 First report from worker {} (payload built on {})",
            payload["worker"], payload["built_on"]
        );
    });

    let done_tx = RefCell::new(Some(done_tx));
    let complete = Listener::from_fn(move |payload: &Value| {
        info!("✅ All {} workers finished", payload["workers"]);
        if let Some(tx) = done_tx.borrow_mut().take() {
            let _ = tx.send(delivered.get());
        }
    });

    let registrations = [
        emitter.on(event_name, progress),
        emitter.once(event_name, first),
        emitter.once(COMPLETE_EVENT, complete),
    ];
    for result in registrations {
        if let Err(e) = result {
            warn!("⚠️ Failed to register listener: {}", e);
        }
    }
}
