//! Application core: the comms service and its ports.
//!
//! All interaction with the modem, the clock and the firmware happens
//! through the traits in [`ports`], keeping this layer testable without
//! a real modem.

pub mod commands;
pub mod ports;
pub mod service;

pub use commands::{CommandReply, CommsCommand};
pub use service::CommsService;
