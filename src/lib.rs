//! OSM comms library.
//!
//! AT-command modem engine: line classification, unsolicited demux,
//! command sequencing, timeout supervision and publish/ack, driven by a
//! per-modem dialect table. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod at;
pub mod config;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod supervisor;

mod esp_link_shims;

pub use app::{CommandReply, CommsCommand, CommsService};
pub use error::{Error, Result};
