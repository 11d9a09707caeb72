//! Dedicated owning thread for an [`Emitter`].
//!
//! The loop thread builds a current-thread tokio runtime, constructs the
//! emitter, runs the caller's setup closure on it and then sleeps until the
//! async bridge signals work. Everything listener-related happens on that one
//! thread; the rest of the program talks to it through a [`LoopHandle`].

use crate::bridge::{AsyncBridge, EmitterHandle};
use crate::config::EmitterConfig;
use crate::emitter::Emitter;
use crate::error::EmitterError;
use crate::stats::EmitterStats;
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Spawns owning threads.
pub struct EventLoop;

impl EventLoop {
    /// Starts an owning thread for an `Emitter<P>`.
    ///
    /// The returned handle is usable immediately, submissions made before the
    /// loop is up are queued and delivered once it is.
    ///
    /// # Arguments
    ///
    /// * `config` - Emitter settings; `loop_thread_name` names the new thread
    /// * `setup` - Runs on the new thread before the first wake-up. This is the
    ///   place to register listeners, which cannot be created elsewhere.
    ///
    /// # Returns
    ///
    /// A [`LoopHandle`] for submitting work and stopping the loop, or
    /// [`EmitterError::Config`] / [`EmitterError::LoopStartup`] if the
    /// configuration is invalid or the thread could not be started.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loop_emitter::{EmitterConfig, EventLoop, Listener};
    ///
    /// let (tx, rx) = std::sync::mpsc::channel();
    /// let event_loop = EventLoop::spawn::<String, _>(EmitterConfig::default(), move |emitter| {
    ///     emitter
    ///         .on("greet", Listener::from_fn(move |who: &String| tx.send(who.clone()).unwrap()))
    ///         .unwrap();
    /// })?;
    ///
    /// event_loop.emit_async("greet", || "world".to_string())?;
    /// assert_eq!(rx.recv().unwrap(), "world");
    /// event_loop.shutdown()?;
    /// # Ok::<(), loop_emitter::EmitterError>(())
    /// ```
    pub fn spawn<P, F>(config: EmitterConfig, setup: F) -> Result<LoopHandle<P>, EmitterError>
    where
        P: 'static,
        F: FnOnce(&Emitter<P>) + Send + 'static,
    {
        config.validate()?;

        let bridge = AsyncBridge::new();
        let handle = bridge.handle();
        let (stop_tx, stop_rx) = oneshot::channel();

        let join = thread::Builder::new()
            .name(config.loop_thread_name.clone())
            .spawn(move || run_loop(config, bridge, setup, stop_rx))
            .map_err(|e| EmitterError::LoopStartup(e.to_string()))?;

        Ok(LoopHandle {
            handle,
            stop: stop_tx,
            join,
        })
    }
}

fn run_loop<P, F>(
    config: EmitterConfig,
    bridge: AsyncBridge<P>,
    setup: F,
    mut stop_rx: oneshot::Receiver<()>,
) -> Result<EmitterStats, EmitterError>
where
    P: 'static,
    F: FnOnce(&Emitter<P>),
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| EmitterError::LoopStartup(e.to_string()))?;

    let emitter = Emitter::with_bridge(config, bridge);
    setup(&emitter);
    info!("🔁 Event loop started");

    runtime.block_on(async {
        loop {
            tokio::select! {
                biased;
                // Fires on an explicit stop and when the LoopHandle is dropped.
                _ = &mut stop_rx => break,
                _ = emitter.notified() => {
                    let processed = emitter.drain_pending();
                    debug!(processed, "drained bridge");
                }
            }
        }
    });

    if emitter.config().drain_on_shutdown {
        // Work submitted by listeners while draining is not waited for.
        let backlog = emitter.pending();
        let delivered = emitter.drain_up_to(backlog);
        debug!(delivered, "drained backlog at shutdown");
    }
    emitter.close();

    let stats = emitter.stats();
    info!(
        "🛑 Event loop stopped: {} emitted, {} delivered async, {} dropped",
        stats.events_emitted, stats.async_delivered, stats.async_dropped
    );
    Ok(stats)
}

/// Owner-side control of a running [`EventLoop`].
///
/// Dropping the handle stops the loop without waiting for it; use
/// [`LoopHandle::shutdown`] to join the thread and collect final stats.
pub struct LoopHandle<P: 'static> {
    handle: EmitterHandle<P>,
    stop: oneshot::Sender<()>,
    join: JoinHandle<Result<EmitterStats, EmitterError>>,
}

impl<P: 'static> LoopHandle<P> {
    /// Submission handle for worker threads.
    pub fn handle(&self) -> EmitterHandle<P> {
        self.handle.clone()
    }

    pub fn emit_async<F>(&self, event: &str, producer: F) -> Result<(), EmitterError>
    where
        F: FnOnce() -> P + Send + 'static,
    {
        self.handle.emit_async(event, producer)
    }

    /// Runs `job` on the owning thread, in order with submitted emissions.
    pub fn invoke<F>(&self, job: F) -> Result<(), EmitterError>
    where
        F: FnOnce(&Emitter<P>) + Send + 'static,
    {
        self.handle.invoke(job)
    }

    pub fn thread_id(&self) -> ThreadId {
        self.join.thread().id()
    }

    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Stops the loop, waits for the thread to exit and returns the emitter's
    /// final stats. Submissions still queued are dropped unless
    /// `drain_on_shutdown` is set.
    ///
    /// Blocks the calling thread; from async code run it on a blocking task.
    pub fn shutdown(self) -> Result<EmitterStats, EmitterError> {
        let LoopHandle { handle, stop, join } = self;
        // The loop may already be gone, in which case there is nobody to tell.
        let _ = stop.send(());
        drop(handle);

        join.join().map_err(|_| EmitterError::LoopPanicked)?
    }
}

impl<P: 'static> std::fmt::Debug for LoopHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopHandle")
            .field("thread", &self.join.thread().name())
            .field("finished", &self.join.is_finished())
            .finish()
    }
}
