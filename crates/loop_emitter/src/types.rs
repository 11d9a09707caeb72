//! Core value types shared by the registry, the dispatcher and the bridge.

use crate::error::{EmitterError, ListenerError};
use compact_str::CompactString;
use std::fmt;
use std::rc::Rc;

/// Event identifier. Keys are compared byte for byte, no normalisation.
pub type EventName = CompactString;

/// Closure type stored behind a [`Listener`] handle.
pub type ListenerFn<P> = dyn Fn(&P) -> Result<(), ListenerError>;

/// Whether a registration survives emission or is evicted after firing once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Persistent,
    OneShot,
}

/// Registry-unique identity of a single registration.
///
/// Two registrations of the same listener get two different ids, which is
/// what lets one-shot eviction remove exactly the entries that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u64);

/// Cloneable handle to a listener callback.
///
/// Equality is identity: clones of one handle compare equal, two handles built
/// from separate closures never do, whatever the closures contain. The handle
/// is `!Send`, listeners are created and invoked on the owning thread only.
pub struct Listener<P> {
    callback: Rc<ListenerFn<P>>,
}

impl<P> Listener<P> {
    /// Wraps a fallible callback. Errors are reported by the dispatcher and do
    /// not stop other listeners of the same emission.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&P) -> Result<(), ListenerError> + 'static,
    {
        Self {
            callback: Rc::new(callback),
        }
    }

    /// Wraps a callback that cannot fail.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(&P) + 'static,
    {
        Self::new(move |payload: &P| {
            callback(payload);
            Ok(())
        })
    }

    #[inline]
    pub(crate) fn call(&self, payload: &P) -> Result<(), ListenerError> {
        (self.callback)(payload)
    }

    fn address(&self) -> *const () {
        Rc::as_ptr(&self.callback) as *const ()
    }
}

impl<P> Clone for Listener<P> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<P> PartialEq for Listener<P> {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl<P> Eq for Listener<P> {}

impl<P> fmt::Debug for Listener<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&self.address()).finish()
    }
}

/// One registration held by the registry.
pub struct ListenerEntry<P> {
    pub id: EntryId,
    pub event: EventName,
    pub listener: Listener<P>,
    pub kind: ListenerKind,
}

impl<P> Clone for ListenerEntry<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            event: self.event.clone(),
            listener: self.listener.clone(),
            kind: self.kind,
        }
    }
}

impl<P> fmt::Debug for ListenerEntry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Rejects event names the emitter refuses to key on.
pub(crate) fn validate_event_name(event: &str) -> Result<(), EmitterError> {
    if event.is_empty() {
        return Err(EmitterError::InvalidArgument(
            "event name must not be empty".to_string(),
        ));
    }
    Ok(())
}
