//! ESP-AT firmware on a Wi-Fi station (ESP32-C3 class co-processor).
//!
//! The restart command is a factory restore, so a modem that comes up on
//! its own is first asked whether it still holds our association and
//! broker session.

use core::fmt::{self, Write};

use super::esp_at::{self, URC_MQTT_CONN, URC_MQTT_RECV, URC_MQTT_SUB, URC_TIMESTAMP, URC_TIME_UPDATED};
use super::{
    Budgets, BringUp, CommandArgs, CommandFn, Dialect, MqttCommands, Publish, PublishStyle, Ready,
    Tokens,
};
use crate::at::classify::{UrcKind, UrcPrefix};
use crate::at::command::{CommandLine, Quoted};
use crate::config::CommsConfig;

fn country(a: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    let wifi = &a.config.wifi;
    write!(
        out,
        "AT+CWCOUNTRY=0,{},{},{}",
        Quoted(&wifi.country),
        wifi.schan,
        wifi.nchan
    )
}

fn wifi_init(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+CWINIT=1")
}

fn station_mode(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+CWMODE=1")
}

fn join_ap(a: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    let wifi = &a.config.wifi;
    write!(out, "AT+CWJAP={},{}", Quoted(&wifi.ssid), Quoted(&wifi.pwd))
}

fn station_state(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+CWSTATE?")
}

fn config_ready(c: &CommsConfig) -> bool {
    !c.wifi.ssid.is_empty() && !c.mqtt.addr.is_empty()
}

static REGION: [CommandFn; 3] = [country, station_mode, wifi_init];

static URC: [UrcPrefix; 6] = [
    UrcPrefix {
        kind: UrcKind::Association,
        prefix: "+CWSTATE:",
    },
    URC_MQTT_CONN,
    URC_MQTT_RECV,
    URC_MQTT_SUB,
    URC_TIME_UPDATED,
    URC_TIMESTAMP,
];

pub static ESP_WIFI: Dialect = Dialect {
    name: "ESP_WIFI",
    tokens: Tokens {
        ok: esp_at::OK,
        error: esp_at::ERROR,
        ready: Ready::Exact("ready"),
        publish_ok: esp_at::PUBLISH_OK,
        publish_failed: None,
        already_subscribed: Some(esp_at::ALREADY_SUBSCRIBED),
    },
    urc: &URC,
    parse_association: esp_at::station_associated,
    mqtt_alive: esp_at::MQTT_ALIVE,
    budgets: Budgets {
        default_ms: 30_000,
        association_ms: 30_000,
        mqtt_ms: 30_000,
        fail_connect_ms: 60_000,
        still_off_ms: 10_000,
    },
    bring_up: BringUp {
        restart: esp_at::restore,
        echo_off: Some(esp_at::echo_off),
        region_config: &REGION,
        associate: Some(join_ap),
        association_query: Some(station_state),
        time_sync: Some(esp_at::sntp),
    },
    mqtt: Some(MqttCommands {
        user_cfg: esp_at::mqtt_user_cfg,
        conn_cfg: esp_at::mqtt_conn_cfg,
        connect: esp_at::mqtt_connect,
        subscribe: esp_at::mqtt_subscribe,
        conn_query: esp_at::mqtt_conn_query,
        sub_query: Some(esp_at::mqtt_sub_query),
    }),
    publish: Publish {
        style: PublishStyle::Raw,
        announce: esp_at::publish_raw,
    },
    timestamp_query: Some(esp_at::timestamp),
    probe_existing_session: false,
    resume_on_boot: true,
    probe_link_on_timeout: true,
    reset_backoff: None,
    mtu: esp_at::MTU,
    link_id: 0,
    config_ready,
};
