//! Pin-level driver for MCP230xx port-expanders with change notification.
//!
//! Every pin of an MCP23008, MCP23017 or MCP23S17 can be exported, configured and driven
//! individually through a [`PortExpander`].  Level changes on input pins are picked up by a
//! background thread and delivered to registered [`PinListener`]s.

mod bus;
mod cache;
mod common;
pub mod dev;
mod dispatch;
mod error;
mod expander;
mod monitor;
mod pin;

#[cfg(test)]
mod sim;

pub use bus::{I2cBus, I2cRegisters, RegisterBus, SpiBus, SpiRegisters};
pub use cache::PinCacheEntry;
pub use common::{PinMode, PinState, Port, PullResistance};
pub use dev::ChipLayout;
pub use dispatch::{ListenerHandle, PinListener, PinStateChangeEvent};
pub use error::PinError;
pub use expander::{Config, PortExpander, DEFAULT_POLL_INTERVAL};
pub use pin::{Pin, PinId};

pub use dev::mcp23008::Mcp23008;
pub use dev::mcp23x17::{Mcp23017, Mcp23s17};
