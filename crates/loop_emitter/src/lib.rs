//! # Loop Emitter
//!
//! An event emitter whose listeners all live on one owning thread, plus a
//! bridge that lets any other thread ask for an emission without touching
//! listener state.
//!
//! ## Architecture
//!
//! - **ListenerRegistry**: persistent and one-shot registrations per event,
//!   in registration order
//! - **SynchronousEmitter**: snapshot-then-iterate fan-out with per-listener
//!   failure isolation
//! - **AsyncBridge**: unbounded MPSC queue of payload *producers* and a wake
//!   notification for the owning thread
//! - **Emitter**: the façade composing the three
//! - **EventLoop**: a ready-made owning thread driving an `Emitter`
//!
//! Worker threads submit a closure that builds the payload; the closure runs
//! on the owning thread, right before the listeners do.
//!
//! ```rust
//! use loop_emitter::{EmitterConfig, EventLoop, Listener};
//! use std::sync::mpsc;
//!
//! let (tx, rx) = mpsc::channel();
//! let event_loop = EventLoop::spawn(EmitterConfig::default(), move |emitter| {
//!     emitter
//!         .on("progress", Listener::from_fn(move |pct: &u8| tx.send(*pct).unwrap()))
//!         .unwrap();
//! })?;
//!
//! let handle = event_loop.handle();
//! std::thread::spawn(move || handle.emit_async("progress", || 100u8))
//!     .join()
//!     .unwrap()?;
//!
//! assert_eq!(rx.recv().unwrap(), 100);
//! event_loop.shutdown()?;
//! # Ok::<(), loop_emitter::EmitterError>(())
//! ```

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod event_loop;
pub mod registry;
pub mod stats;
pub mod types;

#[cfg(test)]
mod tests;

pub use bridge::{AsyncBridge, BridgeJob, EmitterHandle, LoopJob, PayloadProducer, PendingEmission};
pub use config::EmitterConfig;
pub use dispatch::{EmitReport, SynchronousEmitter};
pub use emitter::Emitter;
pub use error::{EmitterError, ListenerError};
pub use event_loop::{EventLoop, LoopHandle};
pub use registry::{ListenerRegistry, Snapshot};
pub use stats::EmitterStats;
pub use types::{EntryId, EventName, Listener, ListenerEntry, ListenerKind};

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, EmitterError>;
