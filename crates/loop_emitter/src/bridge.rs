//! Cross-thread hand-off from worker threads to the owning thread.
//!
//! Workers never build payloads or touch listeners. They push a
//! [`PendingEmission`] (an event name plus a closure that will build the
//! payload) onto an unbounded multi-producer queue and ring the owner's wake
//! notification. The owning thread pops jobs in FIFO order, runs the producer
//! there and dispatches synchronously.

use crate::emitter::Emitter;
use crate::error::EmitterError;
use crate::types::{validate_event_name, EventName};
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tracing::{trace, warn};

/// Builds the payload of an async emission. Runs on the owning thread.
pub type PayloadProducer<P> = Box<dyn FnOnce() -> P + Send + 'static>;

/// Arbitrary work routed onto the owning thread, e.g. a subscription
/// requested by another thread.
pub type LoopJob<P> = Box<dyn FnOnce(&Emitter<P>) + Send + 'static>;

/// A submitted emission waiting for the owning thread.
pub struct PendingEmission<P> {
    pub event: EventName,
    producer: PayloadProducer<P>,
}

impl<P> PendingEmission<P> {
    pub fn new(event: EventName, producer: PayloadProducer<P>) -> Self {
        Self { event, producer }
    }

    /// Consumes the submission and runs its producer. Must only be called on
    /// the owning thread.
    pub fn materialize(self) -> (EventName, P) {
        let payload = (self.producer)();
        (self.event, payload)
    }
}

impl<P> std::fmt::Debug for PendingEmission<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingEmission")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// Entry in the bridge queue.
pub enum BridgeJob<P: 'static> {
    Emit(PendingEmission<P>),
    Invoke(LoopJob<P>),
}

#[derive(Debug, Default)]
pub(crate) struct BridgeCounters {
    pub(crate) submitted: AtomicU64,
    pub(crate) rejected: AtomicU64,
}

/// Thread-safe submission side of the bridge.
///
/// Cheap to clone and `Send + Sync`; hand one to every worker thread.
pub struct EmitterHandle<P: 'static> {
    sender: UnboundedSender<BridgeJob<P>>,
    wake: Arc<Notify>,
    counters: Arc<BridgeCounters>,
}

impl<P: 'static> Clone for EmitterHandle<P> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            wake: Arc::clone(&self.wake),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<P: 'static> std::fmt::Debug for EmitterHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitterHandle")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl<P: 'static> EmitterHandle<P> {
    /// Requests an emission of `event` on the owning thread.
    ///
    /// Returns as soon as the submission is queued; the producer and every
    /// listener run later, on the owning thread, in submission order. Fails
    /// with [`EmitterError::BridgeClosed`] once the owner has shut down.
    pub fn emit_async<F>(&self, event: &str, producer: F) -> Result<(), EmitterError>
    where
        F: FnOnce() -> P + Send + 'static,
    {
        validate_event_name(event)?;
        let event = EventName::new(event);
        let pending = PendingEmission::new(event.clone(), Box::new(producer));
        self.push(BridgeJob::Emit(pending), event)
    }

    /// Runs `job` on the owning thread, FIFO with async emissions.
    pub fn invoke<F>(&self, job: F) -> Result<(), EmitterError>
    where
        F: FnOnce(&Emitter<P>) + Send + 'static,
    {
        self.push(BridgeJob::Invoke(Box::new(job)), EventName::new_inline("<loop job>"))
    }

    fn push(&self, job: BridgeJob<P>, label: EventName) -> Result<(), EmitterError> {
        if self.sender.send(job).is_err() {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!("⚠️ Submission of '{}' rejected, owning loop is gone", label);
            return Err(EmitterError::BridgeClosed(label));
        }

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.wake.notify_one();
        trace!(event = %label, "queued for owning thread");
        Ok(())
    }

    /// True once the consuming side was closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Consuming side of the bridge, owned by the emitter on the owning thread.
pub struct AsyncBridge<P: 'static> {
    receiver: RefCell<UnboundedReceiver<BridgeJob<P>>>,
    handle: EmitterHandle<P>,
}

impl<P: 'static> AsyncBridge<P> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            receiver: RefCell::new(receiver),
            handle: EmitterHandle {
                sender,
                wake: Arc::new(Notify::new()),
                counters: Arc::new(BridgeCounters::default()),
            },
        }
    }

    pub fn handle(&self) -> EmitterHandle<P> {
        self.handle.clone()
    }

    /// Pops the next job without waiting. The receiver borrow ends before the
    /// job is returned, so running it may re-enter the bridge.
    pub fn try_next(&self) -> Option<BridgeJob<P>> {
        self.receiver.borrow_mut().try_recv().ok()
    }

    pub fn has_pending(&self) -> bool {
        !self.receiver.borrow().is_empty()
    }

    /// Jobs currently queued.
    pub fn pending(&self) -> usize {
        self.receiver.borrow().len()
    }

    /// Resolves when a submission has signalled the owning thread.
    pub async fn notified(&self) {
        self.handle.wake.notified().await;
    }

    /// Re-arms the wake notification.
    pub fn wake(&self) {
        self.handle.wake.notify_one();
    }

    /// Refuses further submissions and drops anything still queued. Returns
    /// the number of jobs dropped undelivered.
    pub fn close(&self) -> usize {
        let mut receiver = self.receiver.borrow_mut();
        receiver.close();

        let mut dropped = 0;
        while receiver.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub(crate) fn submitted(&self) -> u64 {
        self.handle.counters.submitted.load(Ordering::Relaxed)
    }

    pub(crate) fn rejected(&self) -> u64 {
        self.handle.counters.rejected.load(Ordering::Relaxed)
    }
}

impl<P: 'static> Default for AsyncBridge<P> {
    fn default() -> Self {
        Self::new()
    }
}
