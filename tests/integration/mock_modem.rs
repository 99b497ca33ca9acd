//! Scripted modem, recording app and mock control lines.
//!
//! The mock records every write verbatim and serves queued lines to
//! `read_line`. Time only moves when a test advances it.

use std::cell::Cell;
use std::collections::VecDeque;

use osm_comms::adapters::device_id::topic_header;
use osm_comms::app::ports::{AckHook, Clock, CommandProcessor, ModemControl};
use osm_comms::at::Transport;
use osm_comms::config::CommsConfig;
use osm_comms::dialect::Dialect;
use osm_comms::CommsService;

// ── MockModem ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockModem {
    /// Every `send_raw` call, in order.
    pub writes: Vec<Vec<u8>>,
    pub inbound: VecDeque<Vec<u8>>,
    /// Clock advance per line served, for latency-sensitive tests.
    pub read_step_ms: u32,
    now: Cell<u32>,
}

#[allow(dead_code)]
impl MockModem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn set_now(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn queue(&mut self, line: &str) {
        self.inbound.push_back(line.as_bytes().to_vec());
    }

    /// Writes that were CRLF-terminated command lines, terminator removed.
    pub fn sent_commands(&self) -> Vec<String> {
        self.writes
            .iter()
            .filter_map(|w| w.strip_suffix(b"\r\n"))
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    pub fn last_command(&self) -> Option<String> {
        self.sent_commands().pop()
    }

    pub fn last_write(&self) -> Option<&[u8]> {
        self.writes.last().map(Vec::as_slice)
    }

    pub fn clear(&mut self) {
        self.writes.clear();
    }
}

impl Transport for MockModem {
    fn send_raw(&mut self, data: &[u8]) -> usize {
        self.writes.push(data.to_vec());
        data.len()
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Option<usize> {
        let line = self.inbound.pop_front()?;
        self.advance(self.read_step_ms);
        let n = line.len().min(buf.len());
        buf[..n].copy_from_slice(&line[..n]);
        Some(n)
    }
}

impl Clock for MockModem {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

// ── RecordingApp ──────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingApp {
    pub acks: Vec<bool>,
    pub commands: Vec<Vec<u8>>,
    pub reply_code: u8,
}

impl CommandProcessor for RecordingApp {
    fn process(&mut self, payload: &[u8]) -> u8 {
        self.commands.push(payload.to_vec());
        self.reply_code
    }
}

impl AckHook for RecordingApp {
    fn on_ack(&mut self, acked: bool) {
        self.acks.push(acked);
    }
}

// ── MockPins ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPins {
    pub boot: Vec<bool>,
    pub reset: Vec<bool>,
    /// Reset pulses issued by the engine.
    pub pulses: usize,
}

impl ModemControl for MockPins {
    fn set_boot(&mut self, high: bool) -> osm_comms::Result<()> {
        self.boot.push(high);
        Ok(())
    }

    fn set_reset(&mut self, high: bool) -> osm_comms::Result<()> {
        self.reset.push(high);
        Ok(())
    }

    fn pulse_reset(&mut self) -> osm_comms::Result<()> {
        self.pulses += 1;
        self.set_reset(false)?;
        self.set_reset(true)
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub const HEADER: &str = "osm/0000ABCD";

pub fn wifi_config() -> CommsConfig {
    let mut c = CommsConfig::default();
    c.set_field("wifi_ssid", "lab").unwrap();
    c.set_field("wifi_pwd", "hunter2").unwrap();
    c.set_field("mqtt_addr", "broker.example").unwrap();
    c.set_field("mqtt_user", "node").unwrap();
    c.set_field("mqtt_pwd", "pw").unwrap();
    c
}

#[allow(dead_code)]
pub fn lora_config() -> CommsConfig {
    let mut c = CommsConfig::default();
    c.set_field("lora_dev_eui", "0011223344556677").unwrap();
    c.set_field("lora_app_eui", "8899AABBCCDDEEFF").unwrap();
    c.set_field("lora_app_key", "000102030405060708090A0B0C0D0E0F")
        .unwrap();
    c
}

pub fn service(dialect: &'static Dialect, config: CommsConfig) -> CommsService {
    CommsService::new(dialect, config, topic_header(Some(0xABCD)), 0)
}

/// Service, modem and app in one place, with line-feeding helpers.
pub struct Rig {
    pub svc: CommsService,
    pub modem: MockModem,
    pub app: RecordingApp,
    pub pins: MockPins,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(dialect: &'static Dialect, config: CommsConfig) -> Self {
        Self {
            svc: service(dialect, config),
            modem: MockModem::new(),
            app: RecordingApp::default(),
            pins: MockPins::default(),
        }
    }

    pub fn start(&mut self) {
        self.svc.start(&mut self.modem, &mut self.app);
    }

    /// Feed one line straight into the engine.
    pub fn line(&mut self, line: &str) -> bool {
        self.svc
            .process_line(line.as_bytes(), &mut self.modem, &mut self.app)
    }

    pub fn lines(&mut self, lines: &[&str]) {
        for l in lines {
            self.line(l);
        }
    }

    pub fn tick(&mut self) {
        self.svc
            .tick(&mut self.modem, &mut self.app, &mut self.pins);
    }

    /// Advance the clock by `ms` and run the supervisor.
    pub fn wait(&mut self, ms: u32) {
        self.modem.advance(ms);
        self.tick();
    }

    pub fn send(&mut self, suffix: &str, payload: &[u8]) -> bool {
        self.svc.send(suffix, payload, &mut self.modem, &mut self.app)
    }

    pub fn state_name(&self) -> &'static str {
        self.svc.state_name()
    }

    pub fn last_command(&self) -> Option<String> {
        self.modem.last_command()
    }
}

/// ESP_WIFI rig driven all the way to `IDLE`.
#[allow(dead_code)]
pub fn wifi_idle() -> Rig {
    let mut rig = Rig::new(&osm_comms::dialect::ESP_WIFI, wifi_config());
    rig.start();
    rig.lines(&[
        "OK",
        "ready",
        "OK", // ATE0
        "OK", // CWCOUNTRY
        "OK", // CWMODE
        "OK", // CWINIT
        "OK", // CWJAP
        "+CWSTATE:2,\"lab\"",
        "OK", // CWSTATE?
        "OK", // SNTP cfg
        "+TIME_UPDATED",
        "OK", // MQTTUSERCFG
        "OK", // MQTTCONNCFG
        "OK", // MQTTCONN
        "OK", // MQTTSUB
    ]);
    assert_eq!(rig.state_name(), "IDLE");
    rig.modem.clear();
    rig
}

/// RAK3172 rig driven to `IDLE`.
#[allow(dead_code)]
pub fn lora_idle() -> Rig {
    let mut rig = Rig::new(&osm_comms::dialect::RAK3172, lora_config());
    rig.start();
    rig.line("INITIALIZATION OK");
    for _ in 0..9 {
        rig.line("OK");
    }
    rig.line("+EVT:JOINED");
    assert_eq!(rig.state_name(), "IDLE");
    rig.modem.clear();
    rig
}
