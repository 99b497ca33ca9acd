//! ESP-AT firmware on a wired Ethernet (PoE) board.
//!
//! The PHY brings itself up, so bring-up starts at `+ETH_GOT_IP:` and
//! skips association. The broker session survives our own resets, so
//! the sequencer asks "already connected / subscribed?" before
//! reconfiguring.

use super::esp_at::{self, URC_MQTT_CONN, URC_MQTT_RECV, URC_MQTT_SUB, URC_TIMESTAMP, URC_TIME_UPDATED};
use super::{Budgets, BringUp, Dialect, MqttCommands, Publish, PublishStyle, Ready, Tokens};
use crate::at::classify::UrcPrefix;
use crate::config::CommsConfig;

fn config_ready(c: &CommsConfig) -> bool {
    !c.mqtt.addr.is_empty()
}

static URC: [UrcPrefix; 5] = [
    URC_MQTT_CONN,
    URC_MQTT_RECV,
    URC_MQTT_SUB,
    URC_TIME_UPDATED,
    URC_TIMESTAMP,
];

pub static ESP_POE: Dialect = Dialect {
    name: "ESP_POE",
    tokens: Tokens {
        ok: esp_at::OK,
        error: esp_at::ERROR,
        ready: Ready::Prefix("+ETH_GOT_IP:"),
        publish_ok: esp_at::PUBLISH_OK,
        publish_failed: None,
        already_subscribed: Some(esp_at::ALREADY_SUBSCRIBED),
    },
    urc: &URC,
    parse_association: esp_at::station_associated,
    mqtt_alive: esp_at::MQTT_ALIVE,
    budgets: Budgets {
        default_ms: 500,
        association_ms: 10_000,
        mqtt_ms: 30_000,
        fail_connect_ms: 60_000,
        still_off_ms: 10_000,
    },
    bring_up: BringUp {
        restart: esp_at::soft_restart,
        echo_off: Some(esp_at::echo_off),
        region_config: &[],
        associate: None,
        association_query: None,
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
    probe_existing_session: true,
    resume_on_boot: false,
    probe_link_on_timeout: false,
    reset_backoff: None,
    mtu: esp_at::MTU,
    link_id: 0,
    config_ready,
};
