//! RAKwireless RAK3172 LoRaWAN module (EU868, OTAA, class A).
//!
//! No broker: "association" is the OTAA join and a publish is a single
//! confirmed `AT+SEND` carrying the payload as hex; the network's
//! confirmation is the ack. Commands arrive as unicast downlinks. Joins
//! are slow and failures tend to repeat, hence the reset backoff.

use core::fmt::{self, Write};

use super::{
    Budgets, BringUp, CommandArgs, CommandFn, Dialect, Publish, PublishArgs, PublishStyle, Ready,
    ResetBackoff, Tokens,
};
use crate::at::classify::{UrcKind, UrcPrefix};
use crate::at::command::{CommandLine, Hex};
use crate::at::urc;
use crate::config::{APP_KEY_HEX_LEN, CommsConfig, EUI_HEX_LEN};

/// EU868 DR0 application payload limit.
const MTU: usize = 242;

/// Join retry window the module gets before our own timeout fires.
const JOIN_ATTEMPT_S: u32 = 10;

fn reboot(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("ATZ")
}

fn lorawan_mode(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+NWM=1")
}

fn confirmed_uplinks(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+CFM=1")
}

fn otaa(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+NJM=1")
}

fn class_a(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+CLASS=A")
}

fn band_eu868(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+BAND=4")
}

fn dev_eui(a: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    write!(out, "AT+DEVEUI={}", a.config.lora.dev_eui)
}

fn app_eui(a: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    write!(out, "AT+APPEUI={}", a.config.lora.app_eui)
}

fn app_key(a: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    write!(out, "AT+APPKEY={}", a.config.lora.app_key)
}

/// Auto-join off, 10 s attempt, no retries (we own retrying).
fn join(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    write!(out, "AT+JOIN=1:0:{}:0", JOIN_ATTEMPT_S)
}

fn send(p: &PublishArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    write!(out, "AT+SEND={}:{}", p.port, Hex(p.payload))
}

fn joined(body: &[u8], _: &CommsConfig) -> Option<bool> {
    urc::parse_lorawan_join(body)
}

fn config_ready(c: &CommsConfig) -> bool {
    c.lora.dev_eui.len() == EUI_HEX_LEN
        && c.lora.app_eui.len() == EUI_HEX_LEN
        && c.lora.app_key.len() == APP_KEY_HEX_LEN
}

static REGION: [CommandFn; 8] = [
    lorawan_mode,
    confirmed_uplinks,
    otaa,
    class_a,
    band_eu868,
    dev_eui,
    app_eui,
    app_key,
];

static URC: [UrcPrefix; 2] = [
    UrcPrefix {
        kind: UrcKind::Association,
        prefix: "+EVT:JOIN",
    },
    UrcPrefix {
        kind: UrcKind::Downlink,
        prefix: "+EVT:RX_",
    },
];

pub static RAK3172: Dialect = Dialect {
    name: "RAK3172",
    tokens: Tokens {
        ok: "OK",
        error: "AT_ERROR",
        ready: Ready::Exact("INITIALIZATION OK"),
        publish_ok: "+EVT:SEND_CONFIRMED_OK",
        publish_failed: Some("+EVT:SEND_CONFIRMED_FAILED"),
        already_subscribed: None,
    },
    urc: &URC,
    parse_association: joined,
    mqtt_alive: &[],
    budgets: Budgets {
        default_ms: 15_000,
        association_ms: 15_000,
        mqtt_ms: 15_000,
        fail_connect_ms: 15_000,
        still_off_ms: 15_000,
    },
    bring_up: BringUp {
        restart: reboot,
        echo_off: None,
        region_config: &REGION,
        associate: Some(join),
        association_query: None,
        time_sync: None,
    },
    mqtt: None,
    publish: Publish {
        style: PublishStyle::InlineHex,
        announce: send,
    },
    timestamp_query: None,
    probe_existing_session: false,
    resume_on_boot: false,
    probe_link_on_timeout: false,
    reset_backoff: Some(ResetBackoff {
        short_count: 5,
        short_ms: 10,
        long_ms: 15 * 60 * 1000,
    }),
    mtu: MTU,
    link_id: 0,
    config_ready,
};
