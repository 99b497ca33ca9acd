//! ESP-IDF UART transport.
//!
//! ```text
//!  UART RX ──▶ reader thread ──LineDecoder──▶ LINE_CHANNEL ──▶ read_line()
//!  write()  ◀──────────────────────────────────────────────── send_raw()
//! ```
//!
//! The driver is split: the reader thread owns the RX half and blocks on
//! it, the comms owner keeps the TX half and drains the channel.

use esp_idf_hal::delay::BLOCK;
use esp_idf_hal::gpio::{AnyIOPin, InputPin, OutputPin};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::uart::{config::Config, Uart, UartDriver, UartRxDriver, UartTxDriver};
use esp_idf_hal::units::Hertz;
use log::{info, warn};

use crate::app::ports::Clock;
use crate::at::channels::{pop_line, push_line, LINE_CHANNEL};
use crate::at::codec::LineDecoder;
use crate::at::transport::Transport;
use crate::pins;

const READER_STACK: usize = 6 * 1024;

pub struct UartTransport {
    tx: UartTxDriver<'static>,
}

impl UartTransport {
    /// Open the modem UART and start the reader thread.
    pub fn start(
        uart: impl Peripheral<P = impl Uart> + 'static,
        tx: impl Peripheral<P = impl OutputPin> + 'static,
        rx: impl Peripheral<P = impl InputPin> + 'static,
    ) -> anyhow::Result<Self> {
        let config = Config::default().baudrate(Hertz(pins::MODEM_UART_BAUD));
        let driver = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &config,
        )?;
        let (tx, rx) = driver.into_split();
        std::thread::Builder::new()
            .name("modem-rx".into())
            .stack_size(READER_STACK)
            .spawn(move || reader(rx))?;
        info!("comms: modem UART up at {} baud", pins::MODEM_UART_BAUD);
        Ok(Self { tx })
    }
}

fn reader(rx: UartRxDriver<'static>) {
    let mut decoder = LineDecoder::new();
    let mut chunk = [0u8; 256];
    loop {
        match rx.read(&mut chunk, BLOCK) {
            Ok(n) => decoder.feed(&chunk[..n], |line| {
                if !push_line(&LINE_CHANNEL, line) {
                    warn!("comms: line channel full, dropped {} B", line.len());
                }
            }),
            Err(e) => warn!("comms: UART read failed: {}", e),
        }
    }
}

impl Transport for UartTransport {
    fn send_raw(&mut self, data: &[u8]) -> usize {
        match self.tx.write(data) {
            Ok(n) => n,
            Err(e) => {
                warn!("comms: UART write failed: {}", e);
                0
            }
        }
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Option<usize> {
        pop_line(&LINE_CHANNEL, buf)
    }
}

/// Deadline-aware sleep between polls, paced on the same clock the engine
/// measures timeouts with.
pub fn pace<C: Clock>(clock: &C, since_ms: u32, period_ms: u32) {
    let spent = clock.now_ms().wrapping_sub(since_ms);
    if spent < period_ms {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(
            period_ms - spent,
        )));
    }
}
