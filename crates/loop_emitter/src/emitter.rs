//! The emitter façade: registry + synchronous dispatch + async bridge.

use crate::bridge::{AsyncBridge, BridgeJob, EmitterHandle};
use crate::config::EmitterConfig;
use crate::dispatch::{EmitReport, SynchronousEmitter};
use crate::error::EmitterError;
use crate::registry::ListenerRegistry;
use crate::stats::EmitterStats;
use crate::types::{validate_event_name, EventName, Listener, ListenerKind};
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, trace, warn};

/// Event emitter owned by a single thread.
///
/// Every listener is registered, stored and invoked on the thread that owns
/// the emitter. The type holds `Rc`/`RefCell` state and is neither `Send` nor
/// `Sync`, so calling `on`, `emit` and friends from another thread does not
/// compile. Other threads get an [`EmitterHandle`] from [`Emitter::handle`]
/// and submit emissions through it; the owner delivers them from
/// [`Emitter::drain_pending`], typically driven by an
/// [`EventLoop`](crate::EventLoop).
///
/// All methods take `&self`, listeners may call back into the emitter while
/// it is dispatching.
///
/// # Delivery order
///
/// * **Synchronous** - [`Emitter::emit`] runs persistent listeners, then
///   one-shot listeners, each in registration order, before returning
/// * **Asynchronous** - submissions are delivered in the order the bridge
///   received them, one drain per wake-up
///
/// # Example
///
/// ```rust
/// use loop_emitter::{Emitter, Listener};
///
/// let emitter: Emitter<u32> = Emitter::new();
/// let seen = std::rc::Rc::new(std::cell::Cell::new(0));
/// let seen_by_listener = seen.clone();
/// emitter.on("tick", Listener::from_fn(move |n: &u32| seen_by_listener.set(*n)))?;
///
/// emitter.emit("tick", &42)?;
/// assert_eq!(seen.get(), 42);
/// # Ok::<(), loop_emitter::EmitterError>(())
/// ```
pub struct Emitter<P: 'static> {
    registry: RefCell<ListenerRegistry<P>>,
    bridge: AsyncBridge<P>,
    config: EmitterConfig,
    stats: RefCell<EmitterStats>,
}

impl<P: 'static> Emitter<P> {
    pub fn new() -> Self {
        Self::with_config(EmitterConfig::default())
    }

    pub fn with_config(config: EmitterConfig) -> Self {
        Self::with_bridge(config, AsyncBridge::new())
    }

    /// Builds an emitter around a bridge created elsewhere, so handles can be
    /// given out before the owning thread exists.
    pub fn with_bridge(config: EmitterConfig, bridge: AsyncBridge<P>) -> Self {
        Self {
            registry: RefCell::new(ListenerRegistry::new()),
            bridge,
            config,
            stats: RefCell::new(EmitterStats::default()),
        }
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    fn register(&self, event: &str, listener: Listener<P>, kind: ListenerKind) -> Result<(), EmitterError> {
        validate_event_name(event)?;
        let id = self
            .registry
            .borrow_mut()
            .add_listener(EventName::new(event), listener, kind);
        debug!("📝 Registered {:?} listener {:?} for '{}'", kind, id, event);
        Ok(())
    }

    /// Registers a persistent listener.
    pub fn on(&self, event: &str, listener: Listener<P>) -> Result<(), EmitterError> {
        self.register(event, listener, ListenerKind::Persistent)
    }

    /// Alias of [`Emitter::on`].
    pub fn add_listener(&self, event: &str, listener: Listener<P>) -> Result<(), EmitterError> {
        self.on(event, listener)
    }

    /// Registers a listener that is removed after its first invocation.
    pub fn once(&self, event: &str, listener: Listener<P>) -> Result<(), EmitterError> {
        self.register(event, listener, ListenerKind::OneShot)
    }

    /// Removes every registration of `listener` for `event`, persistent and
    /// one-shot alike. Returns the number removed; 0 is not an error.
    pub fn off(&self, event: &str, listener: &Listener<P>) -> Result<usize, EmitterError> {
        validate_event_name(event)?;
        let removed = self.registry.borrow_mut().remove_listener(event, listener);
        debug!("🗑️ Removed {} registration(s) from '{}'", removed, event);
        Ok(removed)
    }

    /// Alias of [`Emitter::off`].
    pub fn remove_listener(&self, event: &str, listener: &Listener<P>) -> Result<usize, EmitterError> {
        self.off(event, listener)
    }

    /// Clears the listeners of `event`, or of every event when `None`.
    pub fn remove_all_listeners(&self, event: Option<&str>) -> usize {
        let removed = self.registry.borrow_mut().remove_all_listeners(event);
        debug!("🗑️ Cleared {} registration(s) ({})", removed, event.unwrap_or("all events"));
        removed
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.registry.borrow().count(event)
    }

    /// Events that currently have at least one listener, sorted.
    pub fn event_names(&self) -> Vec<EventName> {
        self.registry.borrow().event_names()
    }

    /// Dispatches `payload` to every listener of `event` before returning.
    ///
    /// Listener failures do not abort the emission and are not returned as an
    /// error; they are logged and collected in the [`EmitReport`].
    pub fn emit(&self, event: &str, payload: &P) -> Result<EmitReport, EmitterError> {
        validate_event_name(event)?;
        Ok(self.dispatch(event, payload))
    }

    fn dispatch(&self, event: &str, payload: &P) -> EmitReport {
        let report = SynchronousEmitter::new(&self.registry).emit(event, payload);

        if report.invoked == 0 {
            if self.config.warn_on_unhandled {
                warn!("⚠️ No listeners for event: {}", event);
            } else {
                trace!(event, "no listeners");
            }
        }

        let mut stats = self.stats.borrow_mut();
        stats.events_emitted += 1;
        stats.listeners_invoked += report.invoked as u64;
        stats.listener_failures += report.failures.len() as u64;
        report
    }

    /// Returns a handle other threads can use to submit emissions.
    pub fn handle(&self) -> EmitterHandle<P> {
        self.bridge.handle()
    }

    /// Queues an emission from the owning thread itself. It is delivered on a
    /// later drain, after everything submitted before it.
    pub fn emit_async<F>(&self, event: &str, producer: F) -> Result<(), EmitterError>
    where
        F: FnOnce() -> P + Send + 'static,
    {
        self.bridge.handle().emit_async(event, producer)
    }

    /// Runs queued jobs in submission order.
    ///
    /// Only the jobs already queued when the drain starts are run, capped at
    /// `max_drain_per_wake` when that limit is set. Jobs submitted by
    /// listeners during the drain wait for the next wake-up, which is re-armed
    /// here whenever work is left.
    ///
    /// # Returns
    ///
    /// The number of jobs run.
    pub fn drain_pending(&self) -> usize {
        let queued = self.bridge.pending();
        let budget = match self.config.max_drain_per_wake {
            0 => queued,
            limit => limit.min(queued),
        };

        let processed = self.drain_up_to(budget);
        if self.bridge.has_pending() {
            self.bridge.wake();
        }
        processed
    }

    /// Runs at most `budget` queued jobs without touching the wake state.
    pub(crate) fn drain_up_to(&self, budget: usize) -> usize {
        let mut processed = 0;
        while processed < budget {
            let Some(job) = self.bridge.try_next() else {
                break;
            };
            self.run_job(job);
            processed += 1;
        }
        processed
    }

    /// Number of jobs waiting in the bridge.
    pub fn pending(&self) -> usize {
        self.bridge.pending()
    }

    fn run_job(&self, job: BridgeJob<P>) {
        match job {
            BridgeJob::Emit(pending) => {
                let event = pending.event.clone();
                match catch_unwind(AssertUnwindSafe(|| pending.materialize())) {
                    Ok((event, payload)) => {
                        self.stats.borrow_mut().async_delivered += 1;
                        self.dispatch(&event, &payload);
                    }
                    Err(_) => {
                        error!("❌ Payload producer for '{}' panicked, emission dropped", event);
                    }
                }
            }
            BridgeJob::Invoke(job) => {
                if catch_unwind(AssertUnwindSafe(|| job(self))).is_err() {
                    error!("❌ Loop job panicked");
                }
            }
        }
    }

    /// Resolves once a submission has signalled the owning thread.
    pub async fn notified(&self) {
        self.bridge.notified().await;
    }

    /// Closes the bridge: later submissions fail with
    /// [`EmitterError::BridgeClosed`] and anything still queued is dropped.
    /// Returns the number of dropped jobs.
    pub fn close(&self) -> usize {
        let dropped = self.bridge.close();
        if dropped > 0 {
            warn!("⚠️ Dropped {} undelivered submission(s) at teardown", dropped);
        }
        self.stats.borrow_mut().async_dropped += dropped as u64;
        dropped
    }

    pub fn is_closed(&self) -> bool {
        self.bridge.is_closed()
    }

    pub fn stats(&self) -> EmitterStats {
        let mut stats = self.stats.borrow().clone();
        stats.total_listeners = self.registry.borrow().total();
        stats.async_submitted = self.bridge.submitted();
        stats.async_rejected = self.bridge.rejected();
        stats
    }
}

impl<P: 'static> Default for Emitter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static> std::fmt::Debug for Emitter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.registry.borrow().total())
            .field("closed", &self.is_closed())
            .field("config", &self.config)
            .finish()
    }
}

impl<P: 'static> Drop for Emitter<P> {
    fn drop(&mut self) {
        if !self.bridge.is_closed() {
            self.close();
        }
    }
}
