//! The device module contains the register maps and pin definitions for each supported chip.
//!
//! All supported chips share the same register protocol and only differ in the number of ports
//! and the register offsets, which are described by a [`ChipLayout`].  The constructors for each
//! chip live in its module, e.g. [`PortExpander::new_mcp23017()`][crate::PortExpander::new_mcp23017].

use crate::{Pin, PinId, Port};

pub mod mcp23008;
pub mod mcp23x17;

/// Register offsets of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRegisterMap {
    pub port: Port,
    /// IODIR: input/output direction: 0=output; 1=input
    pub iodir: u8,
    /// GPINTEN: interrupt-on-change: 0=disable; 1=enable
    pub gpinten: u8,
    /// DEFVAL: default values for interrupt-on-change
    pub defval: u8,
    /// INTCON: 0=compare to previous pin value; 1=compare to DEFVAL
    pub intcon: u8,
    /// GPPU: weak pull-up enable
    pub gppu: u8,
    /// INTF: 1=corresponding pin caused an interrupt
    pub intf: u8,
    /// INTCAP: pin levels captured at the time of the interrupt
    pub intcap: u8,
    /// GPIO: logic level on the pins; writes go to the output latch
    pub gpio: u8,
}

/// Static description of a chip: its ports, their registers and the pins it declares.
#[derive(Debug)]
pub struct ChipLayout {
    pub name: &'static str,
    pub ports: &'static [PortRegisterMap],
    pub iocon: u8,
    pub pins: &'static [Pin],
}

impl ChipLayout {
    /// Whether `pin` belongs to a chip of this layout.
    pub fn owns(&self, pin: &Pin) -> bool {
        pin.chip() == self.name && self.port_map(pin.id().port()).is_some()
    }

    pub fn port_map(&self, port: Port) -> Option<&'static PortRegisterMap> {
        self.ports.iter().find(|map| map.port == port)
    }

    /// The declared pin at `id`.
    pub fn pin(&self, id: PinId) -> Option<&'static Pin> {
        self.pins.iter().find(|pin| pin.id() == id)
    }
}

/// I2C/SPI hardware address from the state of the address strap pins.
pub(crate) fn hardware_address(a0: bool, a1: bool, a2: bool) -> u8 {
    0x20 | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8)
}
