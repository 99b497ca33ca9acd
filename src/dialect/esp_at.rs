//! Command templates shared by the ESP-AT firmwares (Wi-Fi and PoE
//! builds): echo, SNTP, the MQTT client and raw publish.

use core::fmt::{self, Write};

use super::{CommandArgs, PublishArgs, TOPIC_COMMAND, TOPIC_CONNECTION};
use crate::at::classify::{UrcKind, UrcPrefix};
use crate::at::command::{CommandLine, Quoted};
use crate::at::urc;
use crate::config::CommsConfig;

pub const OK: &str = "OK";
pub const ERROR: &str = "ERROR";
pub const PUBLISH_OK: &str = "+MQTTPUB:OK";
pub const ALREADY_SUBSCRIBED: &str = "ALREADY SUBSCRIBE";

/// ESP-AT `+MQTTCONN` states meaning the broker session is up
/// (connected, connected-no-topic, connected-with-topic).
pub const MQTT_ALIVE: &[u8] = &[4, 5, 6];

pub const MTU: usize = 1024 + 128;

pub const URC_MQTT_CONN: UrcPrefix = UrcPrefix {
    kind: UrcKind::MqttConnection,
    prefix: "+MQTTCONN:",
};
pub const URC_MQTT_SUB: UrcPrefix = UrcPrefix {
    kind: UrcKind::Subscription,
    prefix: "+MQTTSUB:",
};
pub const URC_MQTT_RECV: UrcPrefix = UrcPrefix {
    kind: UrcKind::Message,
    prefix: "+MQTTSUBRECV:",
};
pub const URC_TIME_UPDATED: UrcPrefix = UrcPrefix {
    kind: UrcKind::TimeSync,
    prefix: "+TIME_UPDATED",
};
pub const URC_TIMESTAMP: UrcPrefix = UrcPrefix {
    kind: UrcKind::Timestamp,
    prefix: "+SYSTIMESTAMP:",
};

/// `+CWSTATE` code for "connected, IP obtained".
const STATION_GOT_IP: u32 = 2;

const MQTT_KEEPALIVE_S: u16 = 120;

/// Associated only when the station holds an IP on the configured SSID.
pub fn station_associated(body: &[u8], config: &CommsConfig) -> Option<bool> {
    let station = urc::parse_cwstate(body)?;
    Some(station.code == STATION_GOT_IP && station.ssid == config.wifi.ssid.as_bytes())
}
const LWT_MESSAGE: &str = "{\"connection\": \"lost\"}";

pub fn echo_off(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("ATE0")
}

pub fn restore(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+RESTORE")
}

pub fn soft_restart(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+RST")
}

pub fn sntp(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str(
        "AT+CIPSNTPCFG=1,0,\"0.pool.ntp.org\",\"1.pool.ntp.org\",\"2.pool.ntp.org\"",
    )
}

pub fn timestamp(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+SYSTIMESTAMP?")
}

pub fn mqtt_user_cfg(a: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    let mqtt = &a.config.mqtt;
    write!(
        out,
        "AT+MQTTUSERCFG={},{},\"osm-0x{}\",{},{},0,0,\"\"",
        a.link_id,
        mqtt.scheme,
        a.device_tag(),
        Quoted(&mqtt.user),
        Quoted(&mqtt.pwd),
    )
}

pub fn mqtt_conn_cfg(a: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    write!(
        out,
        "AT+MQTTCONNCFG={},{},0,\"{}/{}\",{},0,0",
        a.link_id,
        MQTT_KEEPALIVE_S,
        a.topic_header,
        TOPIC_CONNECTION,
        Quoted(LWT_MESSAGE),
    )
}

pub fn mqtt_connect(a: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    let mqtt = &a.config.mqtt;
    write!(
        out,
        "AT+MQTTCONN={},{},{},0",
        a.link_id,
        Quoted(&mqtt.addr),
        mqtt.port
    )
}

pub fn mqtt_subscribe(a: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    write!(
        out,
        "AT+MQTTSUB={},\"{}/{}\",0",
        a.link_id, a.topic_header, TOPIC_COMMAND
    )
}

pub fn mqtt_conn_query(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+MQTTCONN?")
}

pub fn mqtt_sub_query(_: &CommandArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    out.write_str("AT+MQTTSUB?")
}

/// QoS 0, no retain.
pub fn publish_raw(p: &PublishArgs<'_>, out: &mut CommandLine) -> fmt::Result {
    write!(
        out,
        "AT+MQTTPUBRAW={},\"{}\",{},0,0",
        p.link_id,
        p.topic,
        p.payload.len()
    )
}
