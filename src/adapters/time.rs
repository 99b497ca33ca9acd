//! Millisecond clocks implementing [`Clock`].
//!
//! - **`target_os = "espidf"`**: `embassy_time::Instant`, whose driver
//!   symbol (`_embassy_time_now`) is backed by `esp_timer_get_time()` in
//!   `esp_link_shims`.
//! - **`not(target_os = "espidf")`**: `std::time::Instant`, for host-side
//!   simulation.
//!
//! [`ManualClock`] is advanced by hand and drives every timeout test.

use core::cell::Cell;

use crate::app::ports::Clock;

/// Monotonic time since the adapter was created, truncated to `u32` ms.
pub struct SystemClock {
    #[cfg(target_os = "espidf")]
    start: embassy_time::Instant,
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        Self {
            start: embassy_time::Instant::now(),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}
