//! Fuzz target: `CommsService::process_line`
//!
//! The first byte picks the dialect; the rest is split on `\n` and fed
//! line by line to a started session. Malformed unsolicited frames must
//! be dropped, never panic. The clock is frozen so the supervisor never
//! intervenes.
//!
//! cargo fuzz run fuzz_process_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use osm_comms::adapters::device_id::topic_header;
use osm_comms::app::ports::{AckHook, Clock, CommandProcessor};
use osm_comms::at::Transport;
use osm_comms::config::CommsConfig;
use osm_comms::dialect::{ESP_POE, ESP_WIFI, RAK3172};
use osm_comms::CommsService;

struct Sink;

impl Transport for Sink {
    fn send_raw(&mut self, data: &[u8]) -> usize {
        data.len()
    }

    fn read_line(&mut self, _: &mut [u8]) -> Option<usize> {
        None
    }
}

impl Clock for Sink {
    fn now_ms(&self) -> u32 {
        0
    }
}

struct App;

impl CommandProcessor for App {
    fn process(&mut self, _: &[u8]) -> u8 {
        0
    }
}

impl AckHook for App {}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, data)) = data.split_first() else {
        return;
    };
    let dialect = match selector % 3 {
        0 => &ESP_WIFI,
        1 => &ESP_POE,
        _ => &RAK3172,
    };
    let mut config = CommsConfig::default();
    let _ = config.set_field("wifi_ssid", "fuzz");
    let _ = config.set_field("mqtt_addr", "broker");

    let mut svc = CommsService::new(dialect, config, topic_header(Some(0xF022)), 0);
    let (mut link, mut app) = (Sink, App);
    svc.start(&mut link, &mut app);
    for line in data.split(|&b| b == b'\n') {
        let _ = svc.process_line(line, &mut link, &mut app);
    }
    let _ = svc.state_name();
});
