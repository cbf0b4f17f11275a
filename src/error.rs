use crate::{Pin, PinMode, PullResistance};
use thiserror::Error;

/// Errors returned by pin operations on a [`PortExpander`][crate::PortExpander].
///
/// `BE` is the error type of the underlying bus.  Bus failures are never retried; they are
/// reported together with the register the failing transaction addressed.
#[derive(Error, Debug)]
pub enum PinError<BE> {
    #[error("pin {0} is not provided by this expander")]
    InvalidPin(Pin),
    #[error("pin {pin} does not support mode {mode}")]
    UnsupportedPinMode { pin: Pin, mode: PinMode },
    #[error("pin {pin} does not support pull resistance {resistance}")]
    UnsupportedPullResistance {
        pin: Pin,
        resistance: PullResistance,
    },
    #[error("cannot change the state of pin {pin} while it is a {mode}")]
    InvalidPinMode { pin: Pin, mode: PinMode },
    #[error("bus transaction on register {register:#04x} failed: {error:?}")]
    Bus { register: u8, error: BE },
    #[error("failed to start the interrupt monitor thread")]
    MonitorSpawn(#[source] std::io::Error),
}

impl<BE> PinError<BE> {
    pub fn is_bus_error(&self) -> bool {
        matches!(self, PinError::Bus { .. })
    }
}
