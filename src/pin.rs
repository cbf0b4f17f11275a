use crate::{PinMode, Port, PullResistance};
use core::fmt;

/// Position of a pin on its chip: the port it belongs to and its bit within that port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId {
    port: Port,
    bit: u8,
}

impl PinId {
    /// # Panics
    /// If `bit` is not below 8.  In a `const` item this is a compile-time error instead.
    pub const fn new(port: Port, bit: u8) -> Self {
        assert!(bit < 8);
        Self { port, bit }
    }

    pub fn port(self) -> Port {
        self.port
    }

    pub fn bit(self) -> u8 {
        self.bit
    }

    /// Bit of this pin inside its port's registers.
    pub fn mask(self) -> u8 {
        1 << self.bit
    }

    /// Provider-scoped pin address, `port * 8 + bit`.
    pub fn address(self) -> u16 {
        self.port.index() as u16 * 8 + self.bit as u16
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.port, self.bit)
    }
}

/// Description of a single expander pin.
///
/// Pins are plain values: the chip modules define one constant per pin (e.g.
/// [`dev::mcp23x17::GPIO_A3`][crate::dev::mcp23x17::GPIO_A3]) and every provider operation takes a
/// reference to one.  A pin belongs to a provider when its chip name matches and the provider
/// has the pin's port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pin {
    chip: &'static str,
    name: &'static str,
    id: PinId,
    modes: &'static [PinMode],
    pull_resistances: &'static [PullResistance],
}

impl Pin {
    /// A digital pin supporting both directions and both pull settings.
    ///
    /// # Panics
    /// If `bit` is not below 8, like [`PinId::new()`].
    pub const fn new(chip: &'static str, name: &'static str, port: Port, bit: u8) -> Self {
        Self {
            chip,
            name,
            id: PinId::new(port, bit),
            modes: PinMode::ALL,
            pull_resistances: PullResistance::ALL,
        }
    }

    /// Restrict the modes this pin may be configured for.
    pub const fn with_modes(mut self, modes: &'static [PinMode]) -> Self {
        self.modes = modes;
        self
    }

    /// Restrict the pull resistances this pin may be configured for.
    pub const fn with_pull_resistances(mut self, pulls: &'static [PullResistance]) -> Self {
        self.pull_resistances = pulls;
        self
    }

    pub fn chip(&self) -> &'static str {
        self.chip
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> PinId {
        self.id
    }

    pub fn address(&self) -> u16 {
        self.id.address()
    }

    pub fn supported_modes(&self) -> &'static [PinMode] {
        self.modes
    }

    pub fn supported_pull_resistances(&self) -> &'static [PullResistance] {
        self.pull_resistances
    }

    pub fn supports_mode(&self, mode: PinMode) -> bool {
        self.modes.contains(&mode)
    }

    pub fn supports_pull_resistance(&self, pull: PullResistance) -> bool {
        self.pull_resistances.contains(&pull)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.chip)
    }
}
