//! Log-only application hooks.
//!
//! Implements [`CommandProcessor`] and [`AckHook`] by writing to the
//! ESP-IDF logger. Used by the standalone binary until a product
//! firmware supplies real command handling; inbound commands are
//! answered with [`RET_UNSUPPORTED`].

use log::{info, warn};

use crate::app::ports::{AckHook, CommandProcessor};

pub const RET_UNSUPPORTED: u8 = 0x01;

#[derive(Debug, Default)]
pub struct LogApp {
    acked: u32,
    failed: u32,
}

impl LogApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// (acked, failed) uplinks since boot.
    pub fn counts(&self) -> (u32, u32) {
        (self.acked, self.failed)
    }
}

impl CommandProcessor for LogApp {
    fn process(&mut self, payload: &[u8]) -> u8 {
        match core::str::from_utf8(payload) {
            Ok(text) => info!("CMD | {}", text),
            Err(_) => info!("CMD | <{} bytes>", payload.len()),
        }
        RET_UNSUPPORTED
    }
}

impl AckHook for LogApp {
    fn on_ack(&mut self, acked: bool) {
        if acked {
            self.acked += 1;
            info!("UPLINK | acked ({} ok, {} failed)", self.acked, self.failed);
        } else {
            self.failed += 1;
            warn!("UPLINK | failed ({} ok, {} failed)", self.acked, self.failed);
        }
    }
}
