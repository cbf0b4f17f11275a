//! Background polling of the interrupt flags.
//!
//! The chips latch every level change of an interrupt-enabled pin in their INTF registers.  The
//! monitor thread checks those flags once per poll interval, reads the levels of every port that
//! flagged a change, and turns the differences to the cached levels into
//! [`PinStateChangeEvent`]s.
use crate::dev::PortRegisterMap;
use crate::dispatch::PinStateChangeEvent;
use crate::expander::{Registers, Shared};
use crate::{PinError, PinId, PinState, RegisterBus};
use core::fmt;
use core::time::Duration;
use log::{debug, error, trace, warn};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

const THREAD_NAME: &str = "expander-monitor";

/// Stop request shared with one monitor thread.
#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Wait for `interval` to pass.  Returns early, with `true`, once a stop was requested.
    fn sleep(&self, interval: Duration) -> bool {
        let deadline = Instant::now() + interval;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// A running monitor thread.
struct InterruptMonitor {
    thread: JoinHandle<()>,
    signal: Arc<StopSignal>,
}

impl InterruptMonitor {
    fn spawn<B>(shared: Arc<Shared<B>>) -> io::Result<Self>
    where
        B: RegisterBus + Send + 'static,
    {
        let signal = Arc::new(StopSignal::default());
        let thread = thread::Builder::new().name(THREAD_NAME.into()).spawn({
            let signal = Arc::clone(&signal);
            move || run(&shared, &signal)
        })?;
        Ok(Self { thread, signal })
    }

    fn stop(&self) {
        self.signal.stop();
    }

    /// Whether this is the monitor the caller is running on, i.e. we are inside a listener.
    fn is_current(&self) -> bool {
        self.thread.thread().id() == thread::current().id()
    }

    fn join(self) {
        if self.is_current() {
            // the thread ends by itself once the listener returns
            return;
        }
        if self.thread.join().is_err() {
            error!("interrupt monitor thread panicked");
        }
    }
}

fn run<B: RegisterBus>(shared: &Shared<B>, signal: &StopSignal) {
    debug!("{}: interrupt monitor started", shared.layout.name);
    while !signal.is_stopped() {
        for event in poll_once(shared) {
            if signal.is_stopped() {
                break;
            }
            shared.dispatcher.dispatch(&event);
        }
        if signal.sleep(shared.poll_interval()) {
            break;
        }
    }
    debug!("{}: interrupt monitor stopped", shared.layout.name);
}

/// Levels of a port, if any of its pins flagged a change.
fn changed_levels<B: RegisterBus>(
    registers: &mut Registers<B>,
    map: &PortRegisterMap,
) -> Result<Option<u8>, PinError<B::BusError>> {
    let flags = registers.read(map.intf)?;
    if flags == 0 {
        return Ok(None);
    }
    trace!("port {} flagged {:#010b}", map.port, flags);
    registers.read(map.gpio).map(Some)
}

/// One poll cycle: compare the levels of all flagged ports against the cache.
///
/// The cache is updated under the register lock; the returned events are meant to be dispatched
/// after the lock was released.  A failing port is skipped, the others are still checked.
pub(crate) fn poll_once<B: RegisterBus>(shared: &Shared<B>) -> Vec<PinStateChangeEvent> {
    let mut events = Vec::new();
    let mut registers = shared.registers.lock();

    for map in shared.layout.ports {
        if registers.port(map.port).interrupt_enable == 0 {
            continue;
        }
        let levels = match changed_levels(&mut registers, map) {
            Ok(Some(levels)) => levels,
            Ok(None) => continue,
            Err(e) => {
                warn!(
                    "{}: polling port {} failed: {}",
                    shared.layout.name, map.port, e
                );
                continue;
            }
        };

        let changed =
            (levels ^ shared.cache.states(map.port)) & shared.cache.exported_inputs(map.port);
        for bit in 0..8 {
            let id = PinId::new(map.port, bit);
            if changed & id.mask() == 0 {
                continue;
            }
            let new_state = PinState::from(levels & id.mask() != 0);
            shared.cache.set_state(id, new_state);
            if let Some(pin) = shared.layout.pin(id) {
                events.push(PinStateChangeEvent::new(*pin, !new_state, new_state));
            }
        }
    }
    events
}

#[derive(Default)]
struct MonitorSlot {
    active: Option<InterruptMonitor>,
    /// Monitors stopped from their own thread, which could not be joined right away.
    retired: Vec<InterruptMonitor>,
    shut_down: bool,
}

/// Owner of the (at most one) monitor thread of an expander.
///
/// Monitors are always joined without holding the slot lock, so a listener running on the
/// monitor thread may freely reconfigure pins in the meantime.
#[derive(Default)]
pub(crate) struct MonitorControl {
    slot: Mutex<MonitorSlot>,
}

impl MonitorControl {
    /// Start the monitor if any pin is an input, stop it if none is.
    ///
    /// Retired monitors whose thread has ended are joined on the way.  Does nothing else once
    /// [`shutdown()`](Self::shutdown) was called.
    pub fn reconcile<B>(&self, shared: &Arc<Shared<B>>) -> io::Result<()>
    where
        B: RegisterBus + Send + 'static,
    {
        let mut slot = self.slot.lock();
        let (mut to_join, running): (Vec<_>, Vec<_>) = slot
            .retired
            .drain(..)
            .partition(|monitor| monitor.thread.is_finished());
        slot.retired = running;

        let wanted = !slot.shut_down && shared.cache.has_inputs();
        let mut spawned = Ok(());
        if wanted && slot.active.is_none() {
            match InterruptMonitor::spawn(Arc::clone(shared)) {
                Ok(monitor) => slot.active = Some(monitor),
                Err(e) => {
                    error!("{}: cannot spawn interrupt monitor: {}", shared.layout.name, e);
                    spawned = Err(e);
                }
            }
        } else if !wanted {
            if let Some(monitor) = slot.active.take() {
                monitor.stop();
                if monitor.is_current() {
                    slot.retired.push(monitor);
                } else {
                    to_join.push(monitor);
                }
            }
        }
        drop(slot);

        for monitor in to_join {
            monitor.join();
        }
        spawned
    }

    #[cfg(test)]
    pub fn retired(&self) -> usize {
        self.slot.lock().retired.len()
    }

    /// Stop all monitors for good.  Returns `true` on the first call only.
    pub fn shutdown(&self) -> bool {
        let (first, monitors) = {
            let mut slot = self.slot.lock();
            let first = !slot.shut_down;
            slot.shut_down = true;
            let mut monitors: Vec<_> = slot.retired.drain(..).collect();
            monitors.extend(slot.active.take());
            (first, monitors)
        };
        for monitor in &monitors {
            monitor.stop();
        }
        for monitor in monitors {
            monitor.join();
        }
        first
    }

    pub fn is_running(&self) -> bool {
        self.slot.lock().active.is_some()
    }

    pub fn is_shut_down(&self) -> bool {
        self.slot.lock().shut_down
    }
}

impl Drop for MonitorControl {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for MonitorControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("MonitorControl")
            .field("running", &slot.active.is_some())
            .field("shut_down", &slot.shut_down)
            .finish()
    }
}
