//! Unsolicited frame extractors.
//!
//! Each parser takes the body that follows the dialect prefix and returns
//! borrowed sub-slices of it. Nothing is copied and the line is never
//! modified; a `None` means the frame was malformed and must be dropped.
//! [`decode_hex`] is the exception: it writes into a caller's buffer.

/// `<link>,"<topic>",<len>,<payload>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundMessage<'a> {
    pub link_id: u8,
    pub topic: &'a [u8],
    /// Exactly `len` bytes; anything after them on the line is ignored.
    pub payload: &'a [u8],
}

/// `<link>,<code>[,...]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqttConnStatus {
    pub link_id: u8,
    pub code: u8,
}

/// `<code>,"<ssid>"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationState<'a> {
    pub code: u32,
    pub ssid: &'a [u8],
}

/// `<slot>:<rssi>:<snr>:UNICAST:<port>:<hex>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downlink<'a> {
    pub port: u8,
    /// Still hex-encoded; see [`decode_hex`].
    pub hex: &'a [u8],
}

/// Parse an inbound application message.
pub fn parse_message(body: &[u8]) -> Option<InboundMessage<'_>> {
    let (link, rest) = split_once(body, b',')?;
    let link_id: u8 = parse_decimal(link)?.try_into().ok()?;
    let (topic, rest) = take_quoted(rest)?;
    let rest = rest.strip_prefix(b",")?;
    let (len, rest) = split_once(rest, b',')?;
    let len = parse_decimal(len)? as usize;
    let payload = rest.get(..len)?;
    Some(InboundMessage {
        link_id,
        topic,
        payload,
    })
}

/// Parse an MQTT connection status push.
pub fn parse_mqtt_conn(body: &[u8]) -> Option<MqttConnStatus> {
    let (link, rest) = split_once(body, b',')?;
    let code = match split_once(rest, b',') {
        Some((code, _)) => code,
        None => rest,
    };
    Some(MqttConnStatus {
        link_id: parse_decimal(link)?.try_into().ok()?,
        code: parse_decimal(code)?.try_into().ok()?,
    })
}

/// Topic named in a subscription listing `<link>,<state>,"<topic>",<qos>`.
pub fn parse_subscription(body: &[u8]) -> Option<&[u8]> {
    let (_link, rest) = split_once(body, b',')?;
    let (_state, rest) = split_once(rest, b',')?;
    take_quoted(rest).map(|(topic, _)| topic)
}

/// ESP-AT station state. The SSID is empty when not associated.
pub fn parse_cwstate(body: &[u8]) -> Option<StationState<'_>> {
    let (code, rest) = split_once(body, b',')?;
    let (ssid, rest) = take_quoted(rest)?;
    if !rest.is_empty() {
        return None;
    }
    Some(StationState {
        code: parse_decimal(code)?,
        ssid,
    })
}

/// RAK3172 receive event, after the `+EVT:RX_` prefix. Only unicast
/// frames carry commands for us.
pub fn parse_downlink(body: &[u8]) -> Option<Downlink<'_>> {
    let (_slot, rest) = split_once(body, b':')?;
    let (rssi, rest) = split_once(rest, b':')?;
    let (snr, rest) = split_once(rest, b':')?;
    parse_signed(rssi)?;
    parse_signed(snr)?;
    let rest = rest.strip_prefix(b"UNICAST:")?;
    let (port, hex) = split_once(rest, b':')?;
    Some(Downlink {
        port: parse_decimal(port)?.try_into().ok()?,
        hex,
    })
}

/// Decode an even-length hex string into `out`. `None` on odd length,
/// a non-hex digit or overflow.
pub fn decode_hex<const N: usize>(hex: &[u8], out: &mut heapless::Vec<u8, N>) -> Option<()> {
    if hex.len() % 2 != 0 {
        return None;
    }
    out.clear();
    for pair in hex.chunks_exact(2) {
        let byte = (nibble(pair[0])? << 4) | nibble(pair[1])?;
        out.push(byte).ok()?;
    }
    Some(())
}

/// Downlink frame version understood here.
pub const DOWNLINK_VERSION: u8 = 0x01;
/// Frame id of a console command carried in a downlink.
pub const DOWNLINK_COMMAND: &[u8] = b"CMD\0";

/// Command text of a decoded downlink frame: version byte, 4-byte frame
/// id, then the command. `None` for other versions or ids.
pub fn downlink_command(frame: &[u8]) -> Option<&[u8]> {
    match frame.split_first()? {
        (&DOWNLINK_VERSION, rest) => rest.strip_prefix(DOWNLINK_COMMAND),
        _ => None,
    }
}

/// RAK3172 join events. The dialect prefix is `+EVT:JOIN`, so the body is
/// `ED` on success and `_FAILED...` on failure.
pub fn parse_lorawan_join(body: &[u8]) -> Option<bool> {
    if body == b"ED" {
        Some(true)
    } else if body.starts_with(b"_FAILED") {
        Some(false)
    } else {
        None
    }
}

/// Unix seconds from a timestamp reply.
pub fn parse_timestamp(body: &[u8]) -> Option<u64> {
    parse_decimal_u64(body)
}

// ---------------------------------------------------------------------------
// Slice helpers
// ---------------------------------------------------------------------------

fn split_once(s: &[u8], sep: u8) -> Option<(&[u8], &[u8])> {
    let pos = s.iter().position(|&b| b == sep)?;
    Some((&s[..pos], &s[pos + 1..]))
}

/// `"<text>"<rest>` → (`text`, `rest`). No escape handling: the modem
/// does not escape quotes inside topics.
fn take_quoted(s: &[u8]) -> Option<(&[u8], &[u8])> {
    let inner = s.strip_prefix(b"\"")?;
    split_once(inner, b'"')
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn parse_signed(s: &[u8]) -> Option<u32> {
    parse_decimal(s.strip_prefix(b"-").unwrap_or(s))
}

fn parse_decimal(s: &[u8]) -> Option<u32> {
    parse_decimal_u64(s)?.try_into().ok()
}

fn parse_decimal_u64(s: &[u8]) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    s.iter().try_fold(0u64, |acc, &b| {
        if b.is_ascii_digit() {
            acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
        } else {
            None
        }
    })
}
