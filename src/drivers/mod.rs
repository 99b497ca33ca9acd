//! Peripheral drivers.

pub mod modem_pins;
