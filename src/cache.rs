//! Last known configuration and level of every pin.
//!
//! Each port keeps four bitmasks (direction, level, pull-up, exported).  Readers never lock:
//! every mask is an atomic, so [`PortExpander::state()`][crate::PortExpander::state] returns
//! immediately even while the monitor is in the middle of a bus transaction.  Writers are
//! serialized externally by the expander's register lock.
use crate::{PinId, PinMode, PinState, Port, PullResistance};
use core::sync::atomic::{AtomicU8, Ordering};

/// Snapshot of the cached configuration of one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinCacheEntry {
    pub mode: PinMode,
    pub state: PinState,
    pub pull_resistance: PullResistance,
    pub exported: bool,
}

#[derive(Debug, Default)]
struct PortCache {
    direction: AtomicU8,
    state: AtomicU8,
    pull_up: AtomicU8,
    exported: AtomicU8,
}

#[derive(Debug)]
pub(crate) struct PinStateCache {
    /// Indexed by [`Port::index()`], whether or not the chip has the port.
    ports: [PortCache; 2],
}

fn store_bit(bits: &AtomicU8, mask: u8, set: bool) {
    if set {
        bits.fetch_or(mask, Ordering::AcqRel);
    } else {
        bits.fetch_and(!mask, Ordering::AcqRel);
    }
}

fn load_bit(bits: &AtomicU8, mask: u8) -> bool {
    bits.load(Ordering::Acquire) & mask != 0
}

impl PinStateCache {
    /// All pins start as non-exported outputs with pull-ups off and a LOW level.
    pub fn new() -> Self {
        Self {
            ports: Default::default(),
        }
    }

    fn port(&self, port: Port) -> &PortCache {
        &self.ports[port.index()]
    }

    pub fn entry(&self, pin: PinId) -> PinCacheEntry {
        PinCacheEntry {
            mode: self.mode(pin),
            state: self.state(pin),
            pull_resistance: self.pull_resistance(pin),
            exported: self.is_exported(pin),
        }
    }

    pub fn mode(&self, pin: PinId) -> PinMode {
        if load_bit(&self.port(pin.port()).direction, pin.mask()) {
            PinMode::DigitalInput
        } else {
            PinMode::DigitalOutput
        }
    }

    pub fn state(&self, pin: PinId) -> PinState {
        load_bit(&self.port(pin.port()).state, pin.mask()).into()
    }

    pub fn pull_resistance(&self, pin: PinId) -> PullResistance {
        if load_bit(&self.port(pin.port()).pull_up, pin.mask()) {
            PullResistance::PullUp
        } else {
            PullResistance::Off
        }
    }

    pub fn is_exported(&self, pin: PinId) -> bool {
        load_bit(&self.port(pin.port()).exported, pin.mask())
    }

    pub fn set_mode(&self, pin: PinId, mode: PinMode) {
        store_bit(&self.port(pin.port()).direction, pin.mask(), mode.is_input());
    }

    pub fn set_state(&self, pin: PinId, state: PinState) {
        store_bit(&self.port(pin.port()).state, pin.mask(), state.is_high());
    }

    pub fn set_pull_resistance(&self, pin: PinId, pull: PullResistance) {
        store_bit(
            &self.port(pin.port()).pull_up,
            pin.mask(),
            pull == PullResistance::PullUp,
        );
    }

    pub fn set_exported(&self, pin: PinId, exported: bool) {
        store_bit(&self.port(pin.port()).exported, pin.mask(), exported);
    }

    /// Overwrite the cached levels of a whole port.
    pub fn seed_states(&self, port: Port, levels: u8) {
        self.port(port).state.store(levels, Ordering::Release);
    }

    pub fn states(&self, port: Port) -> u8 {
        self.port(port).state.load(Ordering::Acquire)
    }

    /// Pins of `port` that are both exported and configured as inputs.
    pub fn exported_inputs(&self, port: Port) -> u8 {
        let port = self.port(port);
        port.direction.load(Ordering::Acquire) & port.exported.load(Ordering::Acquire)
    }

    pub fn has_inputs(&self) -> bool {
        self.ports
            .iter()
            .any(|port| port.direction.load(Ordering::Acquire) != 0)
    }
}
