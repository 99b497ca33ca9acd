//! Modem boot-select and reset lines.
//!
//! Generic over `embedded_hal::digital::OutputPin` and `DelayNs`, so the
//! same driver wraps `esp_idf_hal::gpio::PinDriver` on target and a
//! recording pin in tests.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::info;

use crate::app::ports::ModemControl;
use crate::error::{Error, LinkError, Result};

/// How long reset is held low by a pulse.
pub const RESET_HOLD_MS: u32 = 1;

pub struct ModemPins<B, R, D> {
    boot: B,
    reset: R,
    delay: D,
}

impl<B: OutputPin, R: OutputPin, D: DelayNs> ModemPins<B, R, D> {
    pub fn new(boot: B, reset: R, delay: D) -> Self {
        Self { boot, reset, delay }
    }

    pub fn release(self) -> (B, R, D) {
        (self.boot, self.reset, self.delay)
    }
}

fn drive<P: OutputPin>(pin: &mut P, high: bool) -> Result<()> {
    let res = if high { pin.set_high() } else { pin.set_low() };
    res.map_err(|_| Error::Link(LinkError::Pin))
}

impl<B: OutputPin, R: OutputPin, D: DelayNs> ModemControl for ModemPins<B, R, D> {
    fn set_boot(&mut self, high: bool) -> Result<()> {
        info!("comms: boot line {}", if high { "high" } else { "low" });
        drive(&mut self.boot, high)
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        info!("comms: reset line {}", if high { "high" } else { "low" });
        drive(&mut self.reset, high)
    }

    fn pulse_reset(&mut self) -> Result<()> {
        info!("comms: pulsing reset");
        drive(&mut self.reset, false)?;
        self.delay.delay_ms(RESET_HOLD_MS);
        drive(&mut self.reset, true)
    }
}
