//! Session: the complete mutable state of one modem connection.
//!
//! Created once at boot in `Off`, owned by the comms service, and passed
//! by `&mut` into every sequencer step. A full reset clears it back to
//! `Off` in place; it is never dropped.

use heapless::{String, Vec};

use super::State;
use crate::at::command::CommandLine;

/// Capacity of the topic header and of full topics.
pub const TOPIC_MAX_LEN: usize = 63;

/// Largest payload the session can hold for an in-flight publish.
pub const PAYLOAD_MAX: usize = 1024 + 128;

pub type Topic = String<TOPIC_MAX_LEN>;
pub type Payload = Vec<u8, PAYLOAD_MAX>;

/// What the modem last told us about its connectivity. `None` means
/// "not asked since the last reset / probe".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkBelief {
    pub associated: Option<bool>,
    pub mqtt_connected: Option<bool>,
    /// Our command topic showed up in a subscription listing.
    pub subscribed: bool,
}

/// Saved on a retry-capable timeout, replayed if the probe comes back good.
#[derive(Debug, Clone)]
pub struct ProbeSnapshot {
    pub state: State,
    pub command: CommandLine,
}

/// Timestamp push plus the local tick it arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampCapture {
    pub unix: u64,
    pub captured_ms: u32,
}

pub struct Session {
    pub(crate) state: State,
    pub(crate) last_sent_ms: u32,
    pub(crate) last_cmd: CommandLine,
    pub(crate) snapshot: Option<ProbeSnapshot>,
    pub(crate) belief: LinkBelief,
    pub(crate) topic_header: Topic,
    /// In-flight publish payload; `Some` from `send()` until ack/nack.
    pub(crate) publish: Option<Payload>,
    pub(crate) timestamp: Option<TimestampCapture>,
    /// Index into the dialect's region/mode command list.
    pub(crate) region_step: usize,
    /// Last LoRaWAN uplink port used.
    pub(crate) uplink_port: u8,
    pub(crate) consecutive_resets: u8,
    /// Deferred restart (reset backoff).
    pub(crate) restart_due: Option<u32>,
    /// Held in reset on purpose; no restart until `start()`.
    pub(crate) powered_down: bool,
    /// Ready banner seen with an unusable configuration. Nothing is sent
    /// until `start()`.
    pub(crate) parked: bool,
    /// No restart or reset has been issued since boot, so the modem may
    /// still hold a station and broker session from before.
    pub(crate) may_resume: bool,
    /// Result code of a downlink command, published once `Idle`.
    pub(crate) pending_reply: Option<u8>,
}

impl Session {
    /// New session in `Off`. `now_ms` counts as the last send, so the
    /// still-off budget runs from boot.
    pub fn new(topic_header: Topic, now_ms: u32) -> Self {
        Self {
            state: State::Off,
            last_sent_ms: now_ms,
            last_cmd: CommandLine::new(),
            snapshot: None,
            belief: LinkBelief::default(),
            topic_header,
            publish: None,
            timestamp: None,
            region_step: 0,
            uplink_port: 0,
            consecutive_resets: 0,
            restart_due: None,
            powered_down: false,
            parked: false,
            may_resume: true,
            pending_reply: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn topic_header(&self) -> &str {
        &self.topic_header
    }

    /// Text of the last command sent (without terminator).
    pub fn last_command(&self) -> &str {
        &self.last_cmd
    }

    pub fn last_sent_ms(&self) -> u32 {
        self.last_sent_ms
    }

    pub fn belief(&self) -> LinkBelief {
        self.belief
    }

    pub fn publish_in_flight(&self) -> bool {
        self.publish.is_some()
    }

    pub fn snapshot(&self) -> Option<&ProbeSnapshot> {
        self.snapshot.as_ref()
    }

    /// Downlink result code not yet published.
    pub fn pending_reply(&self) -> Option<u8> {
        self.pending_reply
    }

    /// Waiting for a usable configuration.
    pub fn is_parked(&self) -> bool {
        self.parked
    }

    /// Milliseconds since the last send, wrap-safe.
    pub fn elapsed_ms(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.last_sent_ms)
    }

    /// Back to `Off` with every modem-derived cache dropped. The topic
    /// header, uplink port and reset counter survive.
    pub(crate) fn clear(&mut self) {
        self.state = State::Off;
        self.last_cmd.clear();
        self.snapshot = None;
        self.belief = LinkBelief::default();
        self.publish = None;
        self.timestamp = None;
        self.region_step = 0;
        self.restart_due = None;
        self.parked = false;
        self.may_resume = false;
        self.pending_reply = None;
    }

    /// Next LoRaWAN application port, cycling 1..=223.
    pub(crate) fn peek_uplink_port(&self) -> u8 {
        if self.uplink_port >= 223 {
            1
        } else {
            self.uplink_port + 1
        }
    }
}
