//! Register-level access to an expander over I2C or SPI.
//!
//! Both transports expose the same [`RegisterBus`] interface so the driver logic never has to
//! know which framing is used on the wire.
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;

/// Blanket trait for types implementing `i2c::I2c`
pub trait I2cBus: I2c {
    type BusError: From<<Self as embedded_hal::i2c::ErrorType>::Error> + core::fmt::Debug;
}

impl<T: I2c> I2cBus for T {
    type BusError = T::Error;
}

/// Blanket trait for types implementing `spi::SpiDevice`
pub trait SpiBus: SpiDevice {
    type BusError: From<<Self as embedded_hal::spi::ErrorType>::Error> + core::fmt::Debug;
}

impl<T: SpiDevice> SpiBus for T {
    type BusError = T::Error;
}

/// Single-register reads and writes on one expander chip.
///
/// Every call is one complete, blocking bus transaction.  Errors are returned as-is and never
/// retried.
pub trait RegisterBus {
    type BusError: core::fmt::Debug;

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Self::BusError>;
    fn read_reg(&mut self, reg: u8) -> Result<u8, Self::BusError>;
}

/// Registers of a chip attached to an I2C bus.
///
/// A write is a single `[reg, value]` transfer, a read is a `[reg]` write followed by a one byte
/// read in the same transaction.
#[derive(Debug)]
pub struct I2cRegisters<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C> I2cRegisters<I2C> {
    pub fn new(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }

    pub fn address(&self) -> u8 {
        self.addr
    }

    pub fn into_inner(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2cBus> RegisterBus for I2cRegisters<I2C> {
    type BusError = I2C::BusError;

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Self::BusError> {
        self.i2c.write(self.addr, &[reg, value])?;
        Ok(())
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Self::BusError> {
        let mut buf = [0x00];
        self.i2c.write_read(self.addr, &[reg], &mut buf)?;
        Ok(buf[0])
    }
}

/// R/W bit of the SPI control byte.
const SPI_WRITE: u8 = 0x00;
const SPI_READ: u8 = 0x01;

/// Registers of a chip attached to an SPI device.
///
/// Every transaction is a three byte frame `[addr << 1 | rw, reg, data]`.  Reads clock out a
/// dummy data byte and take the chip's answer from the third position.
#[derive(Debug)]
pub struct SpiRegisters<SPI> {
    spi: SPI,
    addr: u8,
}

impl<SPI> SpiRegisters<SPI> {
    pub fn new(spi: SPI, addr: u8) -> Self {
        Self { spi, addr }
    }

    pub fn address(&self) -> u8 {
        self.addr
    }

    pub fn into_inner(self) -> SPI {
        self.spi
    }

    fn control_byte(&self, rw: u8) -> u8 {
        self.addr << 1 | rw
    }
}

impl<SPI: SpiBus> RegisterBus for SpiRegisters<SPI> {
    type BusError = SPI::BusError;

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Self::BusError> {
        self.spi.write(&[self.control_byte(SPI_WRITE), reg, value])?;
        Ok(())
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Self::BusError> {
        let mut frame = [self.control_byte(SPI_READ), reg, 0x00];
        self.spi.transfer_in_place(&mut frame)?;
        Ok(frame[2])
    }
}
