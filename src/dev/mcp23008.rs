//! Support for the `MCP23008` "8-Bit I/O Expander with Serial Interface"
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/DeviceDoc/MCP23008-MCP23S08-Data-Sheet-20001919F.pdf
//!
//! The MCP23008 is the single-port sibling of the MCP23017, with the same register set packed
//! into consecutive addresses.  Its pins are named `GPIO 0` to `GPIO 7`.
use super::{hardware_address, ChipLayout, PortRegisterMap};
use crate::bus::{I2cBus, I2cRegisters};
use crate::expander::Config;
use crate::{Pin, PinError, Port, PortExpander};

pub const NAME: &str = "MCP23008";

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Regs {
    IODIR = 0x00,
    IPOL = 0x01,
    GPINTEN = 0x02,
    DEFVAL = 0x03,
    INTCON = 0x04,
    IOCON = 0x05,
    GPPU = 0x06,
    INTF = 0x07,
    INTCAP = 0x08,
    GPIO = 0x09,
    OLAT = 0x0a,
}

pub const GPIO_00: Pin = Pin::new(NAME, "GPIO 0", Port::A, 0);
pub const GPIO_01: Pin = Pin::new(NAME, "GPIO 1", Port::A, 1);
pub const GPIO_02: Pin = Pin::new(NAME, "GPIO 2", Port::A, 2);
pub const GPIO_03: Pin = Pin::new(NAME, "GPIO 3", Port::A, 3);
pub const GPIO_04: Pin = Pin::new(NAME, "GPIO 4", Port::A, 4);
pub const GPIO_05: Pin = Pin::new(NAME, "GPIO 5", Port::A, 5);
pub const GPIO_06: Pin = Pin::new(NAME, "GPIO 6", Port::A, 6);
pub const GPIO_07: Pin = Pin::new(NAME, "GPIO 7", Port::A, 7);

pub static ALL: [Pin; 8] = [
    GPIO_00, GPIO_01, GPIO_02, GPIO_03, GPIO_04, GPIO_05, GPIO_06, GPIO_07,
];

pub static LAYOUT: ChipLayout = ChipLayout {
    name: NAME,
    ports: &[PortRegisterMap {
        port: Port::A,
        iodir: Regs::IODIR as u8,
        gpinten: Regs::GPINTEN as u8,
        defval: Regs::DEFVAL as u8,
        intcon: Regs::INTCON as u8,
        gppu: Regs::GPPU as u8,
        intf: Regs::INTF as u8,
        intcap: Regs::INTCAP as u8,
        gpio: Regs::GPIO as u8,
    }],
    iocon: Regs::IOCON as u8,
    pins: &ALL,
};

/// `MCP23008` on an I2C bus
///
/// This is the same type as [`Mcp23017`](super::mcp23x17::Mcp23017): the chip is chosen by the
/// constructor, and [`PortExpander::name()`] tells them apart at runtime.
pub type Mcp23008<I2C> = PortExpander<I2cRegisters<I2C>>;

impl<I2C> PortExpander<I2cRegisters<I2C>>
where
    I2C: I2cBus + Send + 'static,
{
    /// Create a new instance of the MCP23008
    pub fn new_mcp23008(
        i2c: I2C,
        a0: bool,
        a1: bool,
        a2: bool,
    ) -> Result<Self, PinError<I2C::BusError>> {
        Self::mcp23008_with_config(i2c, a0, a1, a2, Config::default())
    }

    pub fn mcp23008_with_config(
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PinMode, PinState, PullResistance};
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn mcp23008() {
        let expectations = [
            // custom IOCON: open-drain interrupt
            mock_i2c::Transaction::write(0x21, vec![0x05, 0x04]),
            mock_i2c::Transaction::write_read(0x21, vec![0x09], vec![0x10]),
            mock_i2c::Transaction::write(0x21, vec![0x00, 0x00]),
            mock_i2c::Transaction::write(0x21, vec![0x02, 0x00]),
            mock_i2c::Transaction::write(0x21, vec![0x03, 0x00]),
            mock_i2c::Transaction::write(0x21, vec![0x04, 0x00]),
            mock_i2c::Transaction::write(0x21, vec![0x09, 0x10]),
            mock_i2c::Transaction::write(0x21, vec![0x06, 0x00]),
            // export gpio 2 as output
            mock_i2c::Transaction::write(0x21, vec![0x00, 0x00]),
            mock_i2c::Transaction::write(0x21, vec![0x02, 0x00]),
            // gpio 2 high
            mock_i2c::Transaction::write(0x21, vec![0x09, 0x14]),
            // gpio 6 pull-up
            mock_i2c::Transaction::write(0x21, vec![0x06, 0x40]),
            // unexport gpio 2
            mock_i2c::Transaction::write(0x21, vec![0x00, 0x00]),
            mock_i2c::Transaction::write(0x21, vec![0x02, 0x00]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let config = Config::default().iocon(0x04);
        let mcp = PortExpander::mcp23008_with_config(bus.clone(), true, false, false, config)
            .unwrap();
        assert_eq!(mcp.name(), NAME);
        assert_eq!(mcp.pins().len(), 8);
        assert_eq!(mcp.state(&GPIO_04).unwrap(), PinState::High);

        mcp.export(&GPIO_02, PinMode::DigitalOutput).unwrap();
        mcp.set_state(&GPIO_02, PinState::High).unwrap();
        mcp.set_pull_resistance(&GPIO_06, PullResistance::PullUp)
            .unwrap();
        mcp.unexport(&GPIO_02).unwrap();

        let info = mcp.pin_info(&GPIO_02).unwrap();
        assert!(!info.exported);
        assert_eq!(info.mode, PinMode::DigitalOutput);
        assert_eq!(info.state, PinState::High);

        drop(mcp);
        bus.done();
    }

    #[test]
    fn no_port_b() {
        let expectations = [
            mock_i2c::Transaction::write_read(0x20, vec![0x09], vec![0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x00, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x02, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x03, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x04, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x09, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x06, 0x00]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);
        let mcp = PortExpander::new_mcp23008(bus.clone(), false, false, false).unwrap();

        // a port B pin carrying this chip's name is still not one of its pins
        let b0 = Pin::new(NAME, "GPIO 8", Port::B, 0);
        assert!(!mcp.has_pin(&b0));
        assert!(matches!(
            mcp.export(&b0, PinMode::DigitalOutput),
            Err(PinError::InvalidPin(_))
        ));
        assert!(matches!(
            mcp.state(&crate::dev::mcp23x17::GPIO_A0),
            Err(PinError::InvalidPin(_))
        ));

        drop(mcp);
        bus.done();
    }

    #[test]
    fn alias_shares_provider_type() {
        let expectations = [
            mock_i2c::Transaction::write_read(0x20, vec![0x09], vec![0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x00, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x02, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x03, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x04, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x09, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x06, 0x00]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);
        let mcp: crate::Mcp23017<_> =
            PortExpander::new_mcp23008(bus.clone(), false, false, false).unwrap();
        assert_eq!(mcp.name(), NAME);
        assert!(mcp.has_pin(&GPIO_07));
        assert!(!mcp.has_pin(&crate::dev::mcp23x17::GPIO_A7));

        drop(mcp);
        bus.done();
    }
}
