//! Response classifier.
//!
//! Every inbound line gets exactly one label. Unsolicited prefixes are
//! tested first, then the exact `OK` / `ERROR` tokens; anything else is
//! `Plain` and left to the current state to interpret (ready banners,
//! publish markers, `ALREADY SUBSCRIBE`, ...).
//!
//! Ok/Error are full-line matches, never prefixes: `OK` must not fire on
//! `OK+ETH` or `+MQTTPUB:OK`.

use crate::dialect::Dialect;

/// Unsolicited frame families a dialect can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrcKind {
    /// Link association status, e.g. `+CWSTATE:2,"ssid"` or `+EVT:JOINED`.
    Association,
    /// MQTT session status, e.g. `+MQTTCONN:0,4,...`.
    MqttConnection,
    /// Subscription listing, e.g. `+MQTTSUB:0,6,"osm/1234ABCD/cmd",0`.
    Subscription,
    /// Inbound application message on a broker topic.
    Message,
    /// LoRaWAN downlink, e.g. `+EVT:RX_C:-38:5:UNICAST:1:01434D44...`.
    Downlink,
    /// Network time became valid.
    TimeSync,
    /// Reply to a timestamp query.
    Timestamp,
}

/// Prefix to kind mapping, one row per unsolicited frame family.
#[derive(Debug, Clone, Copy)]
pub struct UrcPrefix {
    pub kind: UrcKind,
    pub prefix: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<'a> {
    Ok,
    Error,
    /// Kind plus the body that follows the prefix.
    Unsolicited(UrcKind, &'a [u8]),
    Plain,
}

/// Label one CR/LF-stripped line.
pub fn classify<'a>(dialect: &Dialect, line: &'a [u8]) -> Response<'a> {
    for urc in dialect.urc {
        if let Some(body) = line.strip_prefix(urc.prefix.as_bytes()) {
            return Response::Unsolicited(urc.kind, body);
        }
    }
    if line == dialect.tokens.ok.as_bytes() {
        Response::Ok
    } else if line == dialect.tokens.error.as_bytes() {
        Response::Error
    } else {
        Response::Plain
    }
}
