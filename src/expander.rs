//! The pin-level driver shared by all supported chips.
use crate::cache::{PinCacheEntry, PinStateCache};
use crate::common::with_bits;
use crate::dev::{ChipLayout, PortRegisterMap};
use crate::dispatch::{EventDispatcher, ListenerHandle, PinListener};
use crate::monitor::MonitorControl;
use crate::{Pin, PinError, PinId, PinMode, PinState, Port, PullResistance, RegisterBus};
use core::fmt;
use core::time::Duration;
use log::{debug, trace};
use parking_lot::Mutex;
use std::sync::Arc;

/// Interval between two polls of the interrupt flags, unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Construction-time settings of a [`PortExpander`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub(crate) poll_interval: Duration,
    pub(crate) iocon: Option<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            iocon: None,
        }
    }
}

impl Config {
    /// How often the interrupt monitor checks the chip for pin changes.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Value written to the IOCON register before anything else during construction.
    ///
    /// When unset, IOCON is left at whatever the chip currently holds, except for SPI chips which
    /// get `SEQOP | HAEN` so their hardware address pins are honored.
    pub fn iocon(mut self, value: u8) -> Self {
        self.iocon = Some(value);
        self
    }
}

/// Local copy of the registers of one port, always equal to what was last written to the chip.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PortRegisters {
    pub direction: u8,
    pub output: u8,
    pub pull_up: u8,
    pub interrupt_enable: u8,
}

/// The bus together with the register mirrors; only ever accessed under the register lock.
pub(crate) struct Registers<B> {
    bus: B,
    ports: [PortRegisters; 2],
}

impl<B: RegisterBus> Registers<B> {
    pub fn write(&mut self, register: u8, value: u8) -> Result<(), PinError<B::BusError>> {
        trace!("write {:#04x} <- {:#010b}", register, value);
        self.bus
            .write_reg(register, value)
            .map_err(|error| PinError::Bus { register, error })
    }

    pub fn read(&mut self, register: u8) -> Result<u8, PinError<B::BusError>> {
        self.bus
            .read_reg(register)
            .map_err(|error| PinError::Bus { register, error })
    }

    pub fn port(&self, port: Port) -> PortRegisters {
        self.ports[port.index()]
    }

    fn port_mut(&mut self, port: Port) -> &mut PortRegisters {
        &mut self.ports[port.index()]
    }
}

/// State shared between the caller-facing [`PortExpander`] and its monitor thread.
pub(crate) struct Shared<B> {
    pub layout: &'static ChipLayout,
    pub registers: Mutex<Registers<B>>,
    pub cache: PinStateCache,
    pub dispatcher: EventDispatcher,
    poll_interval: Mutex<Duration>,
}

impl<B: RegisterBus> Shared<B> {
    /// Bring the chip into its reset configuration: all pins outputs holding their current
    /// level, interrupts disabled, pull-ups off.
    pub fn initialize(
        bus: B,
        layout: &'static ChipLayout,
        config: &Config,
    ) -> Result<Self, PinError<B::BusError>> {
        let mut registers = Registers {
            bus,
            ports: Default::default(),
        };

        if let Some(iocon) = config.iocon {
            registers.write(layout.iocon, iocon)?;
        }

        let mut levels = [0u8; 2];
        for map in layout.ports {
            levels[map.port.index()] = registers.read(map.gpio)?;
        }
        for map in layout.ports {
            registers.write(map.iodir, 0x00)?;
        }
        for map in layout.ports {
            registers.write(map.gpinten, 0x00)?;
        }
        for map in layout.ports {
            registers.write(map.defval, 0x00)?;
        }
        for map in layout.ports {
            registers.write(map.intcon, 0x00)?;
        }
        for map in layout.ports {
            let level = levels[map.port.index()];
            registers.write(map.gpio, level)?;
            registers.port_mut(map.port).output = level;
        }
        for map in layout.ports {
            registers.write(map.gppu, 0x00)?;
        }

        let cache = PinStateCache::new();
        for map in layout.ports {
            cache.seed_states(map.port, levels[map.port.index()]);
        }

        debug!("{}: initialized with levels {:02x?}", layout.name, levels);
        Ok(Self {
            layout,
            registers: Mutex::new(registers),
            cache,
            dispatcher: EventDispatcher::new(),
            poll_interval: Mutex::new(config.poll_interval),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        *self.poll_interval.lock()
    }

    /// Set the direction of a pin and mirror the direction mask into the interrupt enables.
    ///
    /// `exported` updates the exported flag once both registers were written.
    pub(crate) fn configure(
        &self,
        (pin, map): (PinId, &'static PortRegisterMap),
        mode: PinMode,
        exported: Option<bool>,
    ) -> Result<(), PinError<B::BusError>> {
        let mut registers = self.registers.lock();

        let direction = with_bits(
            registers.port(pin.port()).direction,
            pin.mask(),
            mode.is_input(),
        );
        registers.write(map.iodir, direction)?;
        registers.port_mut(pin.port()).direction = direction;
        self.cache.set_mode(pin, mode);

        // every input pin interrupts on change from its previous level
        registers.write(map.gpinten, direction)?;
        registers.port_mut(pin.port()).interrupt_enable = direction;

        if let Some(exported) = exported {
            self.cache.set_exported(pin, exported);
        }
        Ok(())
    }

    /// Write the levels of output pins, one GPIO write per affected port.
    ///
    /// Nothing is written unless every pin is an output.  Callers hold the register lock, so
    /// cached modes and levels cannot change underneath.
    fn drive_outputs(
        &self,
        registers: &mut Registers<B>,
        pins: &[(&Pin, PinId, PinState)],
    ) -> Result<(), PinError<B::BusError>> {
        for &(pin, id, _) in pins {
            let mode = self.cache.mode(id);
            if mode != PinMode::DigitalOutput {
                return Err(PinError::InvalidPinMode { pin: *pin, mode });
            }
        }

        for map in self.layout.ports {
            let on_port: Vec<_> = pins
                .iter()
                .filter(|(_, id, _)| id.port() == map.port)
                .collect();
            if on_port.is_empty() {
                continue;
            }
            let output = on_port
                .iter()
                .fold(registers.port(map.port).output, |out, (_, id, state)| {
                    with_bits(out, id.mask(), state.is_high())
                });
            registers.write(map.gpio, output)?;
            registers.port_mut(map.port).output = output;
            for (_, id, state) in on_port {
                self.cache.set_state(*id, *state);
            }
        }
        Ok(())
    }
}

/// A port-expander presented as individually configurable digital pins.
///
/// All operations take `&self` and may be called from any thread.  Configuration and output
/// changes are written to the chip synchronously; [`state()`](Self::state) only ever reads the
/// local cache.
///
/// As soon as one pin is an input, a background thread polls the chip's interrupt flags and
/// notifies registered [listeners](PinListener) of level changes on exported input pins.  The
/// thread is stopped again once no input pins remain, on [`shutdown()`](Self::shutdown) and when
/// the expander is dropped.
///
/// Listeners that need to call back into the expander should hold a
/// [`Weak`](std::sync::Weak) reference to it; a strong one keeps the expander alive forever.
pub struct PortExpander<B> {
    shared: Arc<Shared<B>>,
    monitor: MonitorControl,
}

impl<B> PortExpander<B>
where
    B: RegisterBus + Send + 'static,
{
    /// Initialize a chip described by `layout` on the given register bus.
    pub fn new(
        bus: B,
        layout: &'static ChipLayout,
        config: Config,
    ) -> Result<Self, PinError<B::BusError>> {
        let shared = Shared::initialize(bus, layout, &config)?;
        Ok(Self {
            shared: Arc::new(shared),
            monitor: MonitorControl::default(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.shared.layout.name
    }

    pub fn layout(&self) -> &'static ChipLayout {
        self.shared.layout
    }

    /// The pins declared by this expander's chip.
    pub fn pins(&self) -> &'static [Pin] {
        self.shared.layout.pins
    }

    pub fn has_pin(&self, pin: &Pin) -> bool {
        self.shared.layout.owns(pin)
    }

    /// The pin's position together with the registers of its port.
    fn locate(
        &self,
        pin: &Pin,
    ) -> Result<(PinId, &'static PortRegisterMap), PinError<B::BusError>> {
        let layout = self.shared.layout;
        match layout.port_map(pin.id().port()) {
            Some(map) if layout.owns(pin) => Ok((pin.id(), map)),
            _ => Err(PinError::InvalidPin(*pin)),
        }
    }

    fn check_pin(&self, pin: &Pin) -> Result<PinId, PinError<B::BusError>> {
        self.locate(pin).map(|(id, _)| id)
    }

    fn check_mode(
        &self,
        pin: &Pin,
        mode: PinMode,
    ) -> Result<(PinId, &'static PortRegisterMap), PinError<B::BusError>> {
        let located = self.locate(pin)?;
        if pin.supports_mode(mode) {
            Ok(located)
        } else {
            Err(PinError::UnsupportedPinMode { pin: *pin, mode })
        }
    }

    /// Bring the monitor thread in line with the configured pin directions, then hand back the
    /// result of the operation that changed them.
    fn sync_monitor(
        &self,
        result: Result<(), PinError<B::BusError>>,
    ) -> Result<(), PinError<B::BusError>> {
        let synced = self
            .monitor
            .reconcile(&self.shared)
            .map_err(PinError::MonitorSpawn);
        result?;
        synced
    }

    /// Claim a pin and configure its direction.
    ///
    /// Only exported pins deliver change events to listeners.
    pub fn export(&self, pin: &Pin, mode: PinMode) -> Result<(), PinError<B::BusError>> {
        let located = self.check_mode(pin, mode)?;
        debug!("{}: export {} as {}", self.name(), pin, mode);
        self.sync_monitor(self.shared.configure(located, mode, Some(true)))
    }

    /// Export a pin and, if it is an output, immediately drive it to `state`.
    pub fn export_with_state(
        &self,
        pin: &Pin,
        mode: PinMode,
        state: PinState,
    ) -> Result<(), PinError<B::BusError>> {
        self.export(pin, mode)?;
        if mode == PinMode::DigitalOutput {
            self.set_state(pin, state)?;
        }
        Ok(())
    }

    /// Release a pin, turning it back into an output.
    pub fn unexport(&self, pin: &Pin) -> Result<(), PinError<B::BusError>> {
        let located = self.locate(pin)?;
        debug!("{}: unexport {}", self.name(), pin);
        self.sync_monitor(
            self.shared
                .configure(located, PinMode::DigitalOutput, Some(false)),
        )
    }

    pub fn is_exported(&self, pin: &Pin) -> Result<bool, PinError<B::BusError>> {
        let id = self.check_pin(pin)?;
        Ok(self.shared.cache.is_exported(id))
    }

    /// Change the direction of a pin.
    ///
    /// The interrupt monitor starts with the first input pin and stops when the last one turns
    /// back into an output.
    pub fn set_mode(&self, pin: &Pin, mode: PinMode) -> Result<(), PinError<B::BusError>> {
        let located = self.check_mode(pin, mode)?;
        self.sync_monitor(self.shared.configure(located, mode, None))
    }

    pub fn mode(&self, pin: &Pin) -> Result<PinMode, PinError<B::BusError>> {
        let id = self.check_pin(pin)?;
        Ok(self.shared.cache.mode(id))
    }

    /// Drive an output pin HIGH or LOW.
    ///
    /// Fails with [`PinError::InvalidPinMode`] without touching the bus if the pin is an input.
    /// If the bus write fails, the cached state is left unchanged.
    pub fn set_state(&self, pin: &Pin, state: PinState) -> Result<(), PinError<B::BusError>> {
        self.set_states(&[(pin, state)])
    }

    /// Drive multiple output pins at once.
    ///
    /// Every pin is validated before any register is written.  Each affected port is then
    /// written exactly once, so pins on the same port change at the same time.
    pub fn set_states(&self, pins: &[(&Pin, PinState)]) -> Result<(), PinError<B::BusError>> {
        let pins = pins
            .iter()
            .map(|&(pin, state)| self.check_pin(pin).map(|id| (pin, id, state)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut registers = self.shared.registers.lock();
        self.shared.drive_outputs(&mut registers, &pins)
    }

    /// Invert the level of an output pin.
    pub fn toggle(&self, pin: &Pin) -> Result<(), PinError<B::BusError>> {
        let id = self.check_pin(pin)?;
        let mut registers = self.shared.registers.lock();
        let state = !self.shared.cache.state(id);
        self.shared.drive_outputs(&mut registers, &[(pin, id, state)])
    }

    /// Last known level of a pin.
    ///
    /// Never touches the bus.  For outputs this is the level last written, for inputs the level
    /// seen by the most recent poll of the interrupt monitor.
    pub fn state(&self, pin: &Pin) -> Result<PinState, PinError<B::BusError>> {
        let id = self.check_pin(pin)?;
        Ok(self.shared.cache.state(id))
    }

    pub fn set_pull_resistance(
        &self,
        pin: &Pin,
        resistance: PullResistance,
    ) -> Result<(), PinError<B::BusError>> {
        let (id, map) = self.locate(pin)?;
        if !pin.supports_pull_resistance(resistance) {
            return Err(PinError::UnsupportedPullResistance {
                pin: *pin,
                resistance,
            });
        }

        let mut registers = self.shared.registers.lock();
        let pull_up = with_bits(
            registers.port(id.port()).pull_up,
            id.mask(),
            resistance == PullResistance::PullUp,
        );
        registers.write(map.gppu, pull_up)?;
        registers.port_mut(id.port()).pull_up = pull_up;
        self.shared.cache.set_pull_resistance(id, resistance);
        Ok(())
    }

    pub fn pull_resistance(&self, pin: &Pin) -> Result<PullResistance, PinError<B::BusError>> {
        let id = self.check_pin(pin)?;
        Ok(self.shared.cache.pull_resistance(id))
    }

    /// Everything cached about a pin.
    pub fn pin_info(&self, pin: &Pin) -> Result<PinCacheEntry, PinError<B::BusError>> {
        let id = self.check_pin(pin)?;
        Ok(self.shared.cache.entry(id))
    }

    /// Get notified about level changes of one pin.
    pub fn add_listener<L>(
        &self,
        pin: &Pin,
        listener: L,
    ) -> Result<ListenerHandle, PinError<B::BusError>>
    where
        L: PinListener + 'static,
    {
        let id = self.check_pin(pin)?;
        Ok(self.shared.dispatcher.add(Some(id), Arc::new(listener)))
    }

    /// Get notified about level changes of every pin of this expander.
    pub fn add_global_listener<L>(&self, listener: L) -> ListenerHandle
    where
        L: PinListener + 'static,
    {
        self.shared.dispatcher.add(None, Arc::new(listener))
    }

    /// Returns `false` if the listener was already removed.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        self.shared.dispatcher.remove(handle)
    }

    pub fn remove_all_listeners(&self) {
        self.shared.dispatcher.clear();
    }

    /// Takes effect after the monitor's current sleep.
    pub fn set_poll_interval(&self, interval: Duration) {
        *self.shared.poll_interval.lock() = interval;
    }

    pub fn poll_interval(&self) -> Duration {
        self.shared.poll_interval()
    }

    /// Whether the interrupt monitor thread is currently running.
    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_running()
    }

    /// Stop the interrupt monitor for good.
    ///
    /// Calling this more than once has no further effect.  Pins stay usable afterwards, but
    /// input changes are no longer observed.
    pub fn shutdown(&self) {
        if self.monitor.shutdown() {
            debug!("{}: shut down", self.name());
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.monitor.is_shut_down()
    }

    /// Shut down and give back the register bus, and with it the underlying bus handle.
    ///
    /// Returns `None` only when called from inside a listener, where the monitor thread cannot
    /// be joined and still holds on to the bus.
    pub fn release(self) -> Option<B> {
        let Self { shared, monitor } = self;
        monitor.shutdown();
        drop(monitor);
        Arc::try_unwrap(shared)
            .ok()
            .map(|shared| shared.registers.into_inner().bus)
    }
}

impl<B> fmt::Debug for PortExpander<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortExpander")
            .field("chip", &self.shared.layout.name)
            .field("monitor", &self.monitor)
            .field("dispatcher", &self.shared.dispatcher)
            .finish()
    }
}
