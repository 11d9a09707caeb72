/// Statistics tracking for the emitter
use serde::{Deserialize, Serialize};

/// Counters describing what an emitter has done since it was created
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitterStats {
    /// Registrations currently held, both kinds
    pub total_listeners: usize,
    /// Number of emissions dispatched, sync and async
    pub events_emitted: u64,
    /// Listener invocations across all emissions
    pub listeners_invoked: u64,
    /// Invocations that returned an error or panicked
    pub listener_failures: u64,
    /// Jobs accepted by the async bridge from any thread
    pub async_submitted: u64,
    /// Submissions refused because the bridge was closed
    pub async_rejected: u64,
    /// Async emissions materialized and dispatched on the owning thread
    pub async_delivered: u64,
    /// Queued jobs dropped undelivered at teardown
    pub async_dropped: u64,
}
