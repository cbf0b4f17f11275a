//! Support for the `MCP23017` and `MCP23S17` "16-Bit I/O Expander with Serial Interface"
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf
//!
//! The MCP23x17 offers two eight-bit GPIO ports.  It has three
//! address pins, so eight devices can coexist on an I2C bus, or share
//! one SPI chip-select when hardware addressing (`IOCON.HAEN`) is on.
//!
//! Pins are named `GPIO A0` to `GPIO A7` for port A and `GPIO B0` to
//! `GPIO B7` for port B; the same pin constants work for both variants.
use super::{hardware_address, ChipLayout, PortRegisterMap};
use crate::bus::{I2cBus, I2cRegisters, SpiBus, SpiRegisters};
use crate::expander::Config;
use crate::{Pin, PinError, Port, PortExpander};

/// Chip name shared by all pins of the MCP23017 and MCP23S17.
pub const NAME: &str = "MCP23x17";

/// `IOCON.SEQOP`: disable automatic address pointer increment.
pub const IOCON_SEQOP: u8 = 0x20;
/// `IOCON.HAEN`: honor the address pins (SPI variant only).
pub const IOCON_HAEN: u8 = 0x08;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// N.B.: These values are for BANK=0, which is the reset state of
/// the chip (and this driver does not change).
///
/// For all registers, the reset value is 0x00, except for
/// IODIR{A,B} which are 0xFF (making all pins inputs) at reset.
pub(crate) enum Regs {
    /// IODIR: input/output direction: 0=output; 1=input
    IODIRA = 0x00,
    /// IPOL: input polarity: 0=register values match input pins; 1=opposite
    IPOLA = 0x02,
    /// GPINTEN: interrupt-on-change: 0=disable; 1=enable
    GPINTENA = 0x04,
    /// DEFVAL: default values for interrupt-on-change
    DEFVALA = 0x06,
    /// INTCON: interrupt-on-change config: 0=compare to previous pin value;
    ///   1=compare to corresponding bit in DEFVAL
    INTCONA = 0x08,
    /// IOCON: configuration register
    /// - Pin 7: BANK (which driver assumes stays 0)
    /// - Pin 6: MIRROR: if enabled, INTA is logically ORed; an interrupt on either
    ///          port will cause both pins to activate
    /// - Pin 5: SEQOP: controls the incrementing function of the address pointer
    /// - Pin 4: DISSLW: disables slew rate control on SDA
    /// - Pin 3: HAEN: hardware address enable, no effect on MCP23017
    /// - Pin 2: ODR: interrupt pins are 0=active-driver outputs (INTPOL sets polarity)
    ///          or 1=open-drain outputs (overrides INTPOL)
    /// - Pin 1: INTPOL: interrupt pin is 0=active-low or 1=active-high
    /// - Pin 0: unused
    IOCONA = 0x0a,
    /// GPPU: GPIO pull-ups: enables weak internal pull-ups on each pin (when configured
    ///   as an input)
    GPPUA = 0x0c,
    /// INTF: interrupt flags: 0=no interrupt pending; 1=corresponding pin caused interrupt
    INTFA = 0x0e,
    /// INTCAP: interrupt captured value: reflects value of each pin at the time that they
    ///   caused an interrupt
    INTCAPA = 0x10,
    /// GPIO: reflects logic level on pins
    GPIOA = 0x12,
    /// OLAT: output latches: sets state for pins configured as outputs
    OLATA = 0x14,
    IODIRB = 0x01,
    IPOLB = 0x03,
    GPINTENB = 0x05,
    DEFVALB = 0x07,
    INTCONB = 0x09,
    /// IOCON: mirror of IOCONA
    IOCONB = 0x0b,
    GPPUB = 0x0d,
    INTFB = 0x0f,
    INTCAPB = 0x11,
    GPIOB = 0x13,
    OLATB = 0x15,
}

pub const GPIO_A0: Pin = Pin::new(NAME, "GPIO A0", Port::A, 0);
pub const GPIO_A1: Pin = Pin::new(NAME, "GPIO A1", Port::A, 1);
pub const GPIO_A2: Pin = Pin::new(NAME, "GPIO A2", Port::A, 2);
pub const GPIO_A3: Pin = Pin::new(NAME, "GPIO A3", Port::A, 3);
pub const GPIO_A4: Pin = Pin::new(NAME, "GPIO A4", Port::A, 4);
pub const GPIO_A5: Pin = Pin::new(NAME, "GPIO A5", Port::A, 5);
pub const GPIO_A6: Pin = Pin::new(NAME, "GPIO A6", Port::A, 6);
pub const GPIO_A7: Pin = Pin::new(NAME, "GPIO A7", Port::A, 7);
pub const GPIO_B0: Pin = Pin::new(NAME, "GPIO B0", Port::B, 0);
pub const GPIO_B1: Pin = Pin::new(NAME, "GPIO B1", Port::B, 1);
pub const GPIO_B2: Pin = Pin::new(NAME, "GPIO B2", Port::B, 2);
pub const GPIO_B3: Pin = Pin::new(NAME, "GPIO B3", Port::B, 3);
pub const GPIO_B4: Pin = Pin::new(NAME, "GPIO B4", Port::B, 4);
pub const GPIO_B5: Pin = Pin::new(NAME, "GPIO B5", Port::B, 5);
pub const GPIO_B6: Pin = Pin::new(NAME, "GPIO B6", Port::B, 6);
pub const GPIO_B7: Pin = Pin::new(NAME, "GPIO B7", Port::B, 7);

pub const ALL_A_PINS: [Pin; 8] = [
    GPIO_A0, GPIO_A1, GPIO_A2, GPIO_A3, GPIO_A4, GPIO_A5, GPIO_A6, GPIO_A7,
];
pub const ALL_B_PINS: [Pin; 8] = [
    GPIO_B0, GPIO_B1, GPIO_B2, GPIO_B3, GPIO_B4, GPIO_B5, GPIO_B6, GPIO_B7,
];

pub static ALL: [Pin; 16] = [
    GPIO_A0, GPIO_A1, GPIO_A2, GPIO_A3, GPIO_A4, GPIO_A5, GPIO_A6, GPIO_A7, GPIO_B0, GPIO_B1,
    GPIO_B2, GPIO_B3, GPIO_B4, GPIO_B5, GPIO_B6, GPIO_B7,
];

pub static LAYOUT: ChipLayout = ChipLayout {
    name: NAME,
    ports: &[
        PortRegisterMap {
            port: Port::A,
            iodir: Regs::IODIRA as u8,
            gpinten: Regs::GPINTENA as u8,
            defval: Regs::DEFVALA as u8,
            intcon: Regs::INTCONA as u8,
            gppu: Regs::GPPUA as u8,
            intf: Regs::INTFA as u8,
            intcap: Regs::INTCAPA as u8,
            gpio: Regs::GPIOA as u8,
        },
        PortRegisterMap {
            port: Port::B,
            iodir: Regs::IODIRB as u8,
            gpinten: Regs::GPINTENB as u8,
            defval: Regs::DEFVALB as u8,
            intcon: Regs::INTCONB as u8,
            gppu: Regs::GPPUB as u8,
            intf: Regs::INTFB as u8,
            intcap: Regs::INTCAPB as u8,
            gpio: Regs::GPIOB as u8,
        },
    ],
    iocon: Regs::IOCONA as u8,
    pins: &ALL,
};

/// `MCP23017` on an I2C bus
///
/// This is the same type as [`Mcp23008`](super::mcp23008::Mcp23008): the chip is chosen by the
/// constructor, and [`PortExpander::name()`] tells them apart at runtime.
pub type Mcp23017<I2C> = PortExpander<I2cRegisters<I2C>>;
/// `MCP23S17` on an SPI device
pub type Mcp23s17<SPI> = PortExpander<SpiRegisters<SPI>>;

impl<I2C> PortExpander<I2cRegisters<I2C>>
where
    I2C: I2cBus + Send + 'static,
{
    /// Create a new instance of the MCP23017 with I2C interface
    pub fn new_mcp23017(
        i2c: I2C,
        a0: bool,
        a1: bool,
        a2: bool,
    ) -> Result<Self, PinError<I2C::BusError>> {
        Self::mcp23017_with_config(i2c, a0, a1, a2, Config::default())
    }

    pub fn mcp23017_with_config(
        i2c: I2C,
        a0: bool,
        a1: bool,
        a2: bool,
        config: Config,
    ) -> Result<Self, PinError<I2C::BusError>> {
        let bus = I2cRegisters::new(i2c, hardware_address(a0, a1, a2));
        Self::new(bus, &LAYOUT, config)
    }
}

impl<SPI> PortExpander<SpiRegisters<SPI>>
where
    SPI: SpiBus + Send + 'static,
{
    /// Create a new instance of the MCP23S17 with SPI interface
    ///
    /// The address pins are only honored by the chip once `IOCON.HAEN` is set, which this
    /// constructor does.
    pub fn new_mcp23s17(
        spi: SPI,
        a0: bool,
        a1: bool,
        a2: bool,
    ) -> Result<Self, PinError<SPI::BusError>> {
        Self::mcp23s17_with_config(spi, a0, a1, a2, Config::default())
    }

    /// Like [`new_mcp23s17()`](Self::new_mcp23s17), IOCON defaults to `SEQOP | HAEN` unless
    /// `config` sets it.
    pub fn mcp23s17_with_config(
        spi: SPI,
        a0: bool,
        a1: bool,
        a2: bool,
        mut config: Config,
    ) -> Result<Self, PinError<SPI::BusError>> {
        config.iocon = config.iocon.or(Some(IOCON_SEQOP | IOCON_HAEN));
        let bus = SpiRegisters::new(spi, hardware_address(a0, a1, a2));
        Self::new(bus, &LAYOUT, config)
    }
}
