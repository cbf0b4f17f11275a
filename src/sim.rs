//! A simulated MCP230xx register file on an I2C bus, for tests that need the monitor thread.
//!
//! Unlike a transaction mock it does not care about the order of accesses, which makes it
//! usable while a background thread polls concurrently.
use crate::dev::ChipLayout;
use crate::{PinState, Port};
use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, Operation, SevenBitAddress};
use parking_lot::Mutex;
use std::sync::Arc;

/// Bus error carrying the register that was accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError(pub u8);

impl i2c::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug)]
struct State {
    registers: [u8; 0x20],
    pointer: u8,
    writes: Vec<(u8, u8)>,
    reads: Vec<u8>,
    failing_writes: Vec<u8>,
    failing_reads: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SimulatedChip {
    layout: &'static ChipLayout,
    state: Arc<Mutex<State>>,
}

impl SimulatedChip {
    /// A chip in its power-on state: every pin an input, all levels low.
    pub fn new(layout: &'static ChipLayout) -> Self {
        let mut registers = [0x00; 0x20];
        for map in layout.ports {
            registers[map.iodir as usize] = 0xff;
        }
        Self {
            layout,
            state: Arc::new(Mutex::new(State {
                registers,
                pointer: 0,
                writes: Vec::new(),
                reads: Vec::new(),
                failing_writes: Vec::new(),
                failing_reads: Vec::new(),
            })),
        }
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.state.lock().registers[reg as usize]
    }

    pub fn set_register(&self, reg: u8, value: u8) {
        self.state.lock().registers[reg as usize] = value;
    }

    /// Every successful `(register, value)` write so far.
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.state.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    /// Every successfully read register so far.
    pub fn reads(&self) -> Vec<u8> {
        self.state.lock().reads.clone()
    }

    pub fn clear_reads(&self) {
        self.state.lock().reads.clear();
    }

    pub fn fail_writes_to(&self, reg: u8) {
        self.state.lock().failing_writes.push(reg);
    }

    pub fn fail_reads_from(&self, reg: u8) {
        self.state.lock().failing_reads.push(reg);
    }

    /// Stop injecting faults.
    pub fn heal(&self) {
        let mut state = self.state.lock();
        state.failing_writes.clear();
        state.failing_reads.clear();
    }

    /// Drive the external level of the pins in `mask`, flagging an interrupt for those that
    /// have interrupt-on-change enabled.
    pub fn drive(&self, port: Port, mask: u8, level: PinState) {
        let Some(map) = self.layout.port_map(port) else {
            panic!("{} has no port {}", self.layout.name, port);
        };
        let mut state = self.state.lock();
        let old = state.registers[map.gpio as usize];
        let new = if level.is_high() { old | mask } else { old & !mask };
        state.registers[map.gpio as usize] = new;
        let changed = (old ^ new) & state.registers[map.gpinten as usize];
        state.registers[map.intf as usize] |= changed;
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<(), SimError> {
        let mut state = self.state.lock();
        let Some((&reg, data)) = bytes.split_first() else {
            return Ok(());
        };
        state.pointer = reg;
        for &value in data {
            if state.failing_writes.contains(&reg) {
                return Err(SimError(reg));
            }
            let value = match self.layout.ports.iter().find(|map| map.gpio == reg) {
                // input pins keep their externally driven level
                Some(map) => {
                    let inputs = state.registers[map.iodir as usize];
                    (state.registers[reg as usize] & inputs) | (value & !inputs)
                }
                None => value,
            };
            state.registers[reg as usize] = value;
            state.writes.push((reg, value));
        }
        Ok(())
    }

    fn read_bytes(&self, buffer: &mut [u8]) -> Result<(), SimError> {
        let mut state = self.state.lock();
        let reg = state.pointer;
        if state.failing_reads.contains(&reg) {
            return Err(SimError(reg));
        }
        for byte in buffer.iter_mut() {
            *byte = state.registers[reg as usize];
        }
        if let Some(map) = self
            .layout
            .ports
            .iter()
            .find(|map| map.gpio == reg || map.intcap == reg)
        {
            state.registers[map.intf as usize] = 0x00;
        }
        state.reads.push(reg);
        Ok(())
    }
}

impl ErrorType for SimulatedChip {
    type Error = SimError;
}

impl I2c<SevenBitAddress> for SimulatedChip {
    fn transaction(
        &mut self,
        _address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.write_bytes(bytes)?,
                Operation::Read(buffer) => self.read_bytes(buffer)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::I2cRegisters;
    use crate::dev::mcp23x17::{self, Regs};
    use crate::RegisterBus;

    #[test]
    fn gpio_writes_keep_input_levels() {
        let sim = SimulatedChip::new(&mcp23x17::LAYOUT);
        let mut regs = I2cRegisters::new(sim.clone(), 0x20);
        sim.drive(Port::A, 0x01, PinState::High);

        regs.write_reg(Regs::IODIRA as u8, 0x0f).unwrap();
        regs.write_reg(Regs::GPIOA as u8, 0xf0).unwrap();
        assert_eq!(sim.register(Regs::GPIOA as u8), 0xf1);
    }

    #[test]
    fn reading_levels_clears_flags() {
        let sim = SimulatedChip::new(&mcp23x17::LAYOUT);
        let mut regs = I2cRegisters::new(sim.clone(), 0x20);
        sim.set_register(Regs::GPINTENB as u8, 0x04);

        sim.drive(Port::B, 0x06, PinState::High);
        assert_eq!(regs.read_reg(Regs::INTFB as u8).unwrap(), 0x04);
        assert_eq!(regs.read_reg(Regs::GPIOB as u8).unwrap(), 0x06);
        assert_eq!(regs.read_reg(Regs::INTFB as u8).unwrap(), 0x00);
    }

    #[test]
    fn injected_faults() {
        let sim = SimulatedChip::new(&mcp23x17::LAYOUT);
        let mut regs = I2cRegisters::new(sim.clone(), 0x20);
        sim.fail_writes_to(Regs::GPPUA as u8);

        assert_eq!(
            regs.write_reg(Regs::GPPUA as u8, 0x01),
            Err(SimError(Regs::GPPUA as u8))
        );
        assert!(sim.writes().is_empty());

        sim.heal();
        regs.write_reg(Regs::GPPUA as u8, 0x01).unwrap();
        assert_eq!(sim.writes(), vec![(Regs::GPPUA as u8, 0x01)]);
    }
}
