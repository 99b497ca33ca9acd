//! Port traits: the boundary between the protocol engine and the board.
//!
//! ```text
//!   UART / timer ──▶ Transport + Clock ──▶ CommsService ──▶ CommandProcessor + AckHook
//!                                              │
//!                                              └──▶ ModemControl (boot / reset pins)
//! ```
//!
//! The service never owns a port. Every entry point borrows the ones it
//! needs, so a test can drive the whole engine with a scripted mock and
//! a hand-advanced clock.

use crate::at::transport::Transport;
use crate::config::CommsConfig;
use crate::error::Result;

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds. Wraps at `u32::MAX`; every comparison in the
/// engine is wrap-safe.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

// ───────────────────────────────────────────────────────────────
// Application hooks (engine → firmware)
// ───────────────────────────────────────────────────────────────

/// Handles payloads that arrive on `<header>/cmd`.
pub trait CommandProcessor {
    /// Act on one inbound command and return its result code. The code is
    /// published back on `<header>/cmd/resp` as `{"ret_code":0xNN}`.
    fn process(&mut self, payload: &[u8]) -> u8;
}

/// Told exactly once per accepted `send()` whether the uplink made it.
pub trait AckHook {
    fn on_ack(&mut self, acked: bool) {
        let _ = acked;
    }
}

// ───────────────────────────────────────────────────────────────
// Modem control lines
// ───────────────────────────────────────────────────────────────

/// The modem's boot-select and reset lines. `true` drives the line high.
pub trait ModemControl {
    fn set_boot(&mut self, high: bool) -> Result<()>;
    fn set_reset(&mut self, high: bool) -> Result<()>;

    /// Drive reset low and release it, rebooting the modem.
    fn pulse_reset(&mut self) -> Result<()> {
        self.set_reset(false)?;
        self.set_reset(true)
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration storage
// ───────────────────────────────────────────────────────────────

/// Persists the configuration across reboots.
///
/// Implementations MUST refuse to save a record that fails
/// [`CommsConfig::validate`].
pub trait ConfigStore {
    /// `Ok(None)` on first boot.
    fn load(&self) -> Result<Option<CommsConfig>>;
    fn save(&mut self, config: &CommsConfig) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Composite link
// ───────────────────────────────────────────────────────────────

/// Pairs a transport with a clock so one `&mut` satisfies both ports.
pub struct ModemLink<T, C> {
    pub transport: T,
    pub clock: C,
}

impl<T, C> ModemLink<T, C> {
    pub fn new(transport: T, clock: C) -> Self {
        Self { transport, clock }
    }
}

impl<T: Transport, C> Transport for ModemLink<T, C> {
    fn send_raw(&mut self, data: &[u8]) -> usize {
        self.transport.send_raw(data)
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Option<usize> {
        self.transport.read_line(buf)
    }
}

impl<T, C: Clock> Clock for ModemLink<T, C> {
    fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }
}
