//! Synchronous fan-out of one event to its registered listeners.

use crate::error::{EmitterError, ListenerError};
use crate::registry::ListenerRegistry;
use crate::types::{EventName, ListenerEntry};
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, trace};

/// Outcome of a single emission.
///
/// Listener failures are collected here instead of being returned as an
/// error: one failing listener never stops its siblings.
#[derive(Debug)]
pub struct EmitReport {
    pub event: EventName,
    /// Number of listener invocations, failed ones included
    pub invoked: usize,
    /// One `ListenerInvocation` error per failed invocation, in call order
    pub failures: Vec<EmitterError>,
}

impl EmitReport {
    pub(crate) fn new(event: &str) -> Self {
        Self {
            event: EventName::new(event),
            invoked: 0,
            failures: Vec::new(),
        }
    }

    /// True when every invoked listener returned `Ok`.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.invoked - self.failures.len()
    }
}

/// Dispatches against a registry owned by the current thread.
///
/// The registry borrow is never held while a listener runs, so listeners can
/// call back into the emitter (subscribe, unsubscribe, emit) freely.
pub struct SynchronousEmitter<'a, P> {
    registry: &'a RefCell<ListenerRegistry<P>>,
}

impl<'a, P> SynchronousEmitter<'a, P> {
    pub fn new(registry: &'a RefCell<ListenerRegistry<P>>) -> Self {
        Self { registry }
    }

    /// Invokes every listener of `event` with `payload`.
    ///
    /// Persistent listeners run first, then one-shot listeners, each in
    /// registration order. Registrations added while the emission runs are not
    /// invoked until the next one; registrations removed while it runs are
    /// skipped. Each one-shot entry is evicted right before it is called, so it
    /// fires exactly once even if its callback emits the same event again.
    pub fn emit(&self, event: &str, payload: &P) -> EmitReport {
        let snapshot = self.registry.borrow().snapshot(event);
        let mut report = EmitReport::new(event);
        if snapshot.is_empty() {
            return report;
        }

        trace!(event, listeners = snapshot.len(), "dispatching");

        for entry in &snapshot.persistent {
            let live = self.registry.borrow().is_live(entry);
            if !live {
                trace!(event, id = ?entry.id, "listener removed mid-emission, skipping");
                continue;
            }
            self.invoke(entry, payload, &mut report);
        }

        for entry in &snapshot.one_shot {
            let taken = self.registry.borrow_mut().take_one_shot(event, entry.id);
            if !taken {
                continue;
            }
            self.invoke(entry, payload, &mut report);
        }

        report
    }

    fn invoke(&self, entry: &ListenerEntry<P>, payload: &P, report: &mut EmitReport) {
        report.invoked += 1;

        let result = match catch_unwind(AssertUnwindSafe(|| entry.listener.call(payload))) {
            Ok(result) => result,
            Err(panic_info) => Err(ListenerError::from_panic(panic_info)),
        };

        if let Err(e) = result {
            error!("❌ Listener {:?} for '{}' failed: {}", entry.id, entry.event, e);
            report.failures.push(EmitterError::ListenerInvocation {
                event: entry.event.clone(),
                reason: e.to_string(),
            });
        }
    }
}
