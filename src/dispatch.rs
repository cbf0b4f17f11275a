//! Listener registry and change notification.
//!
//! Listeners are called synchronously on the interrupt monitor thread, in registration order.
//! A slow listener therefore delays the next poll of the chip.
use crate::{Pin, PinId, PinState};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use log::error;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A level change observed on an exported input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinStateChangeEvent {
    pin: Pin,
    old_state: PinState,
    new_state: PinState,
}

impl PinStateChangeEvent {
    pub(crate) fn new(pin: Pin, old_state: PinState, new_state: PinState) -> Self {
        Self {
            pin,
            old_state,
            new_state,
        }
    }

    pub fn pin(&self) -> &Pin {
        &self.pin
    }

    pub fn old_state(&self) -> PinState {
        self.old_state
    }

    pub fn new_state(&self) -> PinState {
        self.new_state
    }

    pub fn is_rising_edge(&self) -> bool {
        self.old_state.is_low() && self.new_state.is_high()
    }

    pub fn is_falling_edge(&self) -> bool {
        self.old_state.is_high() && self.new_state.is_low()
    }
}

impl fmt::Display for PinStateChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.pin, self.old_state, self.new_state)
    }
}

/// Receiver of pin change notifications.
///
/// Implemented for every `Fn(&PinStateChangeEvent) + Send + Sync` closure.
pub trait PinListener: Send + Sync {
    fn on_pin_change(&self, event: &PinStateChangeEvent);
}

impl<F> PinListener for F
where
    F: Fn(&PinStateChangeEvent) + Send + Sync,
{
    fn on_pin_change(&self, event: &PinStateChangeEvent) {
        self(event)
    }
}

/// Identifies one listener registration, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

#[derive(Clone)]
struct Registration {
    handle: ListenerHandle,
    /// `None` for listeners receiving events of every pin.
    pin: Option<PinId>,
    listener: Arc<dyn PinListener>,
}

impl Registration {
    fn matches(&self, pin: PinId) -> bool {
        self.pin.map_or(true, |p| p == pin)
    }
}

/// Copy-on-write list of listeners.
///
/// Dispatch iterates over a snapshot, so listeners may be added or removed from any thread,
/// including from inside a listener, without disturbing a notification that is in flight.
pub(crate) struct EventDispatcher {
    registrations: RwLock<Arc<Vec<Registration>>>,
    next_handle: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(Arc::new(Vec::new())),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn add(&self, pin: Option<PinId>, listener: Arc<dyn PinListener>) -> ListenerHandle {
        let handle = ListenerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let mut registrations = self.registrations.write();
        let mut updated = Vec::clone(&registrations);
        updated.push(Registration {
            handle,
            pin,
            listener,
        });
        *registrations = Arc::new(updated);
        handle
    }

    /// Returns `false` if the handle was not registered (anymore).
    pub fn remove(&self, handle: ListenerHandle) -> bool {
        let mut registrations = self.registrations.write();
        if !registrations.iter().any(|r| r.handle == handle) {
            return false;
        }
        let updated: Vec<_> = registrations
            .iter()
            .filter(|r| r.handle != handle)
            .cloned()
            .collect();
        *registrations = Arc::new(updated);
        true
    }

    pub fn clear(&self) {
        *self.registrations.write() = Arc::new(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    /// Notify all listeners registered for the event's pin, and all global listeners.
    ///
    /// A panicking listener is logged and skipped; the remaining listeners still run.
    pub fn dispatch(&self, event: &PinStateChangeEvent) {
        let snapshot = Arc::clone(&*self.registrations.read());
        for registration in snapshot.iter().filter(|r| r.matches(event.pin.id())) {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                registration.listener.on_pin_change(event)
            }));
            if outcome.is_err() {
                error!(
                    "listener {:?} panicked while handling {}",
                    registration.handle, event
                );
            }
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.len())
            .finish()
    }
}
