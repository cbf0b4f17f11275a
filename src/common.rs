use core::fmt;

/// Direction a pin is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinMode {
    DigitalInput,
    DigitalOutput,
}

impl PinMode {
    pub const ALL: &'static [PinMode] = &[PinMode::DigitalInput, PinMode::DigitalOutput];

    pub fn is_input(self) -> bool {
        self == PinMode::DigitalInput
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinMode::DigitalInput => f.write_str("digital input"),
            PinMode::DigitalOutput => f.write_str("digital output"),
        }
    }
}

/// Logic level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinState {
    Low,
    High,
}

impl PinState {
    pub fn is_high(self) -> bool {
        self == PinState::High
    }

    pub fn is_low(self) -> bool {
        self == PinState::Low
    }
}

impl From<bool> for PinState {
    fn from(high: bool) -> Self {
        if high {
            PinState::High
        } else {
            PinState::Low
        }
    }
}

impl From<PinState> for bool {
    fn from(state: PinState) -> bool {
        state.is_high()
    }
}

impl core::ops::Not for PinState {
    type Output = PinState;

    fn not(self) -> PinState {
        match self {
            PinState::Low => PinState::High,
            PinState::High => PinState::Low,
        }
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinState::Low => f.write_str("LOW"),
            PinState::High => f.write_str("HIGH"),
        }
    }
}

/// Internal bias of an input pin.
///
/// The MCP230xx family only offers weak pull-ups, there is no pull-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PullResistance {
    Off,
    PullUp,
}

impl PullResistance {
    pub const ALL: &'static [PullResistance] = &[PullResistance::Off, PullResistance::PullUp];
}

impl fmt::Display for PullResistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullResistance::Off => f.write_str("off"),
            PullResistance::PullUp => f.write_str("pull-up"),
        }
    }
}

/// An eight-bit group of pins sharing one set of direction/state/pull/interrupt registers.
///
/// Single-port chips only have port `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Port {
    A,
    B,
}

impl Port {
    pub(crate) fn index(self) -> usize {
        match self {
            Port::A => 0,
            Port::B => 1,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::A => f.write_str("A"),
            Port::B => f.write_str("B"),
        }
    }
}

/// Returns `bits` with the bits in `mask` set or cleared.
pub(crate) fn with_bits(bits: u8, mask: u8, set: bool) -> u8 {
    if set {
        bits | mask
    } else {
        bits & !mask
    }
}
