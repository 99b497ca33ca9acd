//! Modem dialect tables.
//!
//! A [`Dialect`] is pure data: command templates (plain `fn` pointers that
//! render into a [`CommandLine`]), response tokens, unsolicited prefixes,
//! timeout budgets and a few behaviour flags. The sequencer in
//! [`crate::fsm`] is written once against this table; each supported
//! modem family is one `static` instance.
//!
//! ```text
//!             ┌──────────┬──────────┬──────────┐
//!             │ ESP_WIFI │ ESP_POE  │ RAK3172  │
//! ┌───────────┼──────────┼──────────┼──────────┤
//! │ echo-off  │ ATE0     │ ATE0     │    -     │
//! │ region    │ 3 cmds   │    -     │ 8 cmds   │
//! │ associate │ CWJAP    │    -     │ JOIN     │
//! │ time-sync │ SNTP     │ SNTP     │    -     │
//! │ mqtt      │ yes      │ yes      │    -     │
//! │ publish   │ raw      │ raw      │ hex      │
//! └───────────┴──────────┴──────────┴──────────┘
//! ```

mod esp_at;
mod esp_poe;
mod esp_wifi;
mod rak3172;

use core::fmt;

use crate::at::classify::UrcPrefix;
use crate::at::command::CommandLine;
use crate::config::CommsConfig;

pub use esp_poe::ESP_POE;
pub use esp_wifi::ESP_WIFI;
pub use rak3172::RAK3172;

// ---------------------------------------------------------------------------
// Topic scheme: `<header>/<suffix>`
// ---------------------------------------------------------------------------

pub const TOPIC_MEASUREMENTS: &str = "measurements";
pub const TOPIC_COMMAND: &str = "cmd";
pub const TOPIC_COMMAND_RESP: &str = "cmd/resp";
/// Last-will topic.
pub const TOPIC_CONNECTION: &str = "conn";

// ---------------------------------------------------------------------------
// Template signatures
// ---------------------------------------------------------------------------

/// Inputs available to every command template.
pub struct CommandArgs<'a> {
    pub config: &'a CommsConfig,
    /// `osm/<ID>`; see [`crate::adapters::device_id`].
    pub topic_header: &'a str,
    pub link_id: u8,
}

impl CommandArgs<'_> {
    /// Device tag used in client ids: the header after its last `/`.
    pub fn device_tag(&self) -> &str {
        self.topic_header
            .rsplit_once('/')
            .map_or(self.topic_header, |(_, tag)| tag)
    }
}

/// Inputs for the publish-announce template.
pub struct PublishArgs<'a> {
    pub link_id: u8,
    /// Full topic (`<header>/<suffix>`).
    pub topic: &'a str,
    pub payload: &'a [u8],
    /// LoRaWAN uplink port; unused by MQTT dialects.
    pub port: u8,
}

pub type CommandFn = fn(&CommandArgs<'_>, &mut CommandLine) -> fmt::Result;
pub type PublishFn = fn(&PublishArgs<'_>, &mut CommandLine) -> fmt::Result;

/// Parses an association push body into "associated?", judged against
/// the configured network.
pub type AssociationParser = fn(&[u8], &CommsConfig) -> Option<bool>;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// How the modem announces it finished booting.
#[derive(Debug, Clone, Copy)]
pub enum Ready {
    Exact(&'static str),
    Prefix(&'static str),
}

impl Ready {
    pub fn matches(&self, line: &[u8]) -> bool {
        match self {
            Self::Exact(t) => line == t.as_bytes(),
            Self::Prefix(p) => line.starts_with(p.as_bytes()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tokens {
    pub ok: &'static str,
    pub error: &'static str,
    pub ready: Ready,
    /// Publish completed. A leading `>` (ESP-AT prompt) is tolerated.
    pub publish_ok: &'static str,
    /// Publish definitively failed (unconfirmed uplink).
    pub publish_failed: Option<&'static str>,
    /// Subscribe reply meaning "nothing to do".
    pub already_subscribed: Option<&'static str>,
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Budget families; every waiting state belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    /// Quick local commands.
    Default,
    /// Network join, association and time sync.
    Association,
    /// Broker round trips.
    Mqtt,
    /// Backoff before redoing the MQTT configuration.
    FailConnect,
}

#[derive(Debug, Clone, Copy)]
pub struct Budgets {
    pub default_ms: u32,
    pub association_ms: u32,
    pub mqtt_ms: u32,
    pub fail_connect_ms: u32,
    /// Silence in `Off` before the reset line is pulsed.
    pub still_off_ms: u32,
}

impl Budgets {
    pub const fn for_class(&self, class: TimeoutClass) -> u32 {
        match class {
            TimeoutClass::Default => self.default_ms,
            TimeoutClass::Association => self.association_ms,
            TimeoutClass::Mqtt => self.mqtt_ms,
            TimeoutClass::FailConnect => self.fail_connect_ms,
        }
    }
}

/// Delay before the restart command after a full reset: `short_ms` for
/// the first `short_count` consecutive resets, `long_ms` afterwards.
#[derive(Debug, Clone, Copy)]
pub struct ResetBackoff {
    pub short_count: u8,
    pub short_ms: u32,
    pub long_ms: u32,
}

impl ResetBackoff {
    pub const fn delay_ms(&self, consecutive_resets: u8) -> u32 {
        if consecutive_resets <= self.short_count {
            self.short_ms
        } else {
            self.long_ms
        }
    }
}

// ---------------------------------------------------------------------------
// Command sets
// ---------------------------------------------------------------------------

/// Bring-up vocabulary. `None` / empty stages are skipped.
pub struct BringUp {
    /// First bring-up command; also what a full reset sends.
    pub restart: CommandFn,
    pub echo_off: Option<CommandFn>,
    /// Region / mode configuration, one `OK` each, in order.
    pub region_config: &'static [CommandFn],
    pub associate: Option<CommandFn>,
    /// Status check sent after the associate `OK`. Without it the
    /// sequencer waits for the association push alone.
    pub association_query: Option<CommandFn>,
    pub time_sync: Option<CommandFn>,
}

pub struct MqttCommands {
    pub user_cfg: CommandFn,
    pub conn_cfg: CommandFn,
    pub connect: CommandFn,
    pub subscribe: CommandFn,
    /// "Already connected?" / timed-out probe.
    pub conn_query: CommandFn,
    /// "Already subscribed?" boot probe.
    pub sub_query: Option<CommandFn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStyle {
    /// Announce carries the length; payload bytes follow after `OK`.
    Raw,
    /// Payload is hex-encoded inside the announce; nothing follows.
    InlineHex,
}

pub struct Publish {
    pub style: PublishStyle,
    pub announce: PublishFn,
}

// ---------------------------------------------------------------------------
// Dialect
// ---------------------------------------------------------------------------

pub struct Dialect {
    pub name: &'static str,
    pub tokens: Tokens,
    /// Unsolicited prefixes, tested in order before Ok/Error.
    pub urc: &'static [UrcPrefix],
    pub parse_association: AssociationParser,
    /// MQTT connection codes that count as "connected".
    pub mqtt_alive: &'static [u8],
    pub budgets: Budgets,
    pub bring_up: BringUp,
    pub mqtt: Option<MqttCommands>,
    pub publish: Publish,
    pub timestamp_query: Option<CommandFn>,
    /// Query for an existing broker session before configuring one.
    pub probe_existing_session: bool,
    /// On the first ready banner since boot, before any restart or reset
    /// pulse, check for a live association and broker session before
    /// wiping the modem with the restart command.
    pub resume_on_boot: bool,
    /// On an MQTT-phase timeout, check the link before the broker session.
    pub probe_link_on_timeout: bool,
    pub reset_backoff: Option<ResetBackoff>,
    /// Largest publish payload in bytes.
    pub mtu: usize,
    pub link_id: u8,
    /// Does the configuration carry what this modem needs?
    pub config_ready: fn(&CommsConfig) -> bool,
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialect").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Look a dialect up by its console name.
pub fn by_name(name: &str) -> Option<&'static Dialect> {
    [&ESP_WIFI, &ESP_POE, &RAK3172]
        .into_iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
}
