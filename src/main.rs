//! OSM comms firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  UartTransport   SystemClock   NvsConfigStore   ModemPins    │
//! │  (Transport)     (Clock)       (ConfigStore)    (Control)    │
//! │  LogApp (CommandProcessor + AckHook)                         │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │  CommsService: classify · demux · FSM · supervisor │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  modem-rx thread ─LINE_CHANNEL─▶ poll loop ◀─CONSOLE─ stdin  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use osm_comms::adapters::device_id;
use osm_comms::adapters::log_ack::LogApp;
use osm_comms::adapters::nvs::NvsConfigStore;
use osm_comms::adapters::time::SystemClock;
use osm_comms::adapters::uart::{pace, UartTransport};
use osm_comms::app::ports::{Clock, ConfigStore, ModemControl, ModemLink};
use osm_comms::app::{CommandReply, CommsCommand, CommsService};
use osm_comms::config::CommsConfig;
use osm_comms::dialect::{self, ESP_WIFI};
use osm_comms::drivers::modem_pins::ModemPins;
use osm_comms::pins;

/// Modem family on this board; override at build time with
/// `OSM_COMMS_DIALECT=RAK3172` (or `ESP_POE`).
const DIALECT: Option<&str> = option_env!("OSM_COMMS_DIALECT");

type ConsoleLine = heapless::String<160>;

/// stdin reader → poll loop.
static CONSOLE: Channel<CriticalSectionRawMutex, ConsoleLine, 2> = Channel::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  OSM comms v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;

    // ── 2. Configuration from NVS (or defaults) ───────────────
    let mut store = NvsConfigStore::new()?;
    let config = match store.load() {
        Ok(Some(cfg)) => cfg,
        Ok(None) => {
            info!("No stored comms config, using defaults");
            CommsConfig::default()
        }
        Err(e) => {
            warn!("Comms config load failed ({}), using defaults", e);
            CommsConfig::default()
        }
    };

    let dialect = DIALECT.and_then(dialect::by_name).unwrap_or(&ESP_WIFI);
    let header = device_id::topic_header(device_id::read_unique_id());

    // ── 3. Modem control lines: normal boot, out of reset ─────
    // GPIO numbers mirror `pins::MODEM_BOOT_GPIO` / `MODEM_RESET_GPIO`.
    let boot = PinDriver::output(peripherals.pins.gpio8)?;
    let reset = PinDriver::output(peripherals.pins.gpio7)?;
    let mut modem_pins = ModemPins::new(boot, reset, Ets);
    modem_pins.set_boot(true)?;
    modem_pins.set_reset(true)?;

    // ── 4. UART link + clock ──────────────────────────────────
    let transport = UartTransport::start(
        peripherals.uart1,
        peripherals.pins.gpio17,
        peripherals.pins.gpio18,
    )?;
    let mut link = ModemLink::new(transport, SystemClock::new());
    let mut app = LogApp::new();

    // ── 5. Comms service ──────────────────────────────────────
    let mut comms = CommsService::new(dialect, config, header, link.now_ms());
    // A Wi-Fi modem that kept its session across our reboot is picked up
    // from its banner; if none comes the still-off budget pulses reset.
    if !dialect.resume_on_boot {
        comms.start(&mut link, &mut app);
    }

    std::thread::Builder::new()
        .name("console".into())
        .stack_size(4 * 1024)
        .spawn(console_reader)?;

    info!("Entering comms loop ({})", comms.id());

    // ── 6. Poll loop ──────────────────────────────────────────
    loop {
        let started = link.now_ms();
        comms.poll(&mut link, &mut app, &mut modem_pins);

        while let Ok(line) = CONSOLE.try_receive() {
            run_console(&line, &mut comms, &mut link, &mut app, &mut modem_pins, &mut store);
        }

        pace(&link, started, pins::POLL_PERIOD_MS);
    }
}

fn console_reader() {
    for line in std::io::stdin().lines() {
        let Ok(line) = line else { continue };
        let mut owned = ConsoleLine::new();
        if owned.push_str(line.trim()).is_err() {
            warn!("Console line too long");
            continue;
        }
        if CONSOLE.try_send(owned).is_err() {
            warn!("Console busy, line dropped");
        }
    }
}

fn run_console<L, C, S>(
    line: &str,
    comms: &mut CommsService,
    link: &mut ModemLink<L, C>,
    app: &mut LogApp,
    modem_pins: &mut impl ModemControl,
    store: &mut S,
) where
    L: osm_comms::at::Transport,
    C: Clock,
    S: ConfigStore,
{
    let cmd = match CommsCommand::parse(line) {
        Ok(cmd) => cmd,
        Err(e) => {
            warn!("{}: {}", line, e);
            return;
        }
    };
    match comms.handle_command(cmd, link, app, modem_pins) {
        Ok(CommandReply::Json(json)) => info!("{}", json),
        Ok(CommandReply::State(state)) => info!("State: {}({})", state, state as u8),
        Ok(reply) => info!("{:?}", reply),
        Err(e) => {
            warn!("{}: {}", line, e);
            return;
        }
    }
    if matches!(cmd, CommsCommand::Config { .. }) {
        if let Err(e) = store.save(comms.config()) {
            warn!("Comms config not persisted: {}", e);
        }
    }
}
