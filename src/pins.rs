//! GPIO / peripheral assignments for the modem connector.
//!
//! Single source of truth: `main` picks peripherals by these numbers and
//! the drivers never hard-code pins.
//!
//! ```text
//!  ESP32-S3            modem
//!  GPIO17 (U1TXD) ───▶ RXD
//!  GPIO18 (U1RXD) ◀─── TXD
//!  GPIO8          ───▶ BOOT   (low at reset = download mode)
//!  GPIO7          ───▶ RESET  (active low)
//! ```

// ---------------------------------------------------------------------------
// UART1 (AT command link)
// ---------------------------------------------------------------------------

pub const MODEM_UART_TX_GPIO: i32 = 17;
pub const MODEM_UART_RX_GPIO: i32 = 18;
/// ESP-AT and RAK3172 factory default.
pub const MODEM_UART_BAUD: u32 = 115_200;

// ---------------------------------------------------------------------------
// Control lines
// ---------------------------------------------------------------------------

pub const MODEM_BOOT_GPIO: i32 = 8;
pub const MODEM_RESET_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Loop pacing
// ---------------------------------------------------------------------------

/// Period of the comms poll loop. Well under the smallest budget (500 ms).
pub const POLL_PERIOD_MS: u32 = 10;
