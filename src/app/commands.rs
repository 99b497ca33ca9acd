//! Console commands understood by the comms service.
//!
//! These arrive as text from the debug console (`comms_send hello`,
//! `comms_boot 1`, ...) and are interpreted by
//! [`CommsService::handle_command`](super::service::CommsService::handle_command).

use crate::error::{Error, Result};
use crate::fsm::State;

/// Commands the outside world can send into the comms service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsCommand<'a> {
    /// Publish text on `<header>/measurements`.
    Send(&'a str),
    /// Write a raw line to the modem (CR/LF appended). Diagnostics only:
    /// the reply is seen by the sequencer like any other line.
    Debug(&'a str),
    /// Report the sequencer state.
    State,
    /// Report whether the uplink is usable.
    Connected,
    /// Full reset and bring-up from scratch.
    Restart,
    /// Drive the boot-select line.
    Boot(bool),
    /// Drive the reset line.
    Reset(bool),
    /// Set one configuration field, then restart.
    Config { name: &'a str, value: &'a str },
    /// Dump the configuration as JSON.
    JsonConfig,
    /// Hold the modem in reset.
    PowerDown,
}

impl<'a> CommsCommand<'a> {
    /// Parse one console line.
    pub fn parse(line: &'a str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim_start()));
        match word {
            "comms_send" => Ok(Self::Send(rest)),
            "comms_dbg" => Ok(Self::Debug(rest)),
            "comms_state" => Ok(Self::State),
            "comms_conn" => Ok(Self::Connected),
            "comms_restart" => Ok(Self::Restart),
            "comms_boot" => parse_level(rest).map(Self::Boot),
            "comms_reset" => parse_level(rest).map(Self::Reset),
            "comms_config" => {
                let (name, value) = rest
                    .split_once(char::is_whitespace)
                    .map_or((rest, ""), |(n, v)| (n, v.trim_start()));
                if name.is_empty() {
                    return Err(Error::Command("comms_config <name> <value>"));
                }
                Ok(Self::Config { name, value })
            }
            "comms_j_cfg" => Ok(Self::JsonConfig),
            "comms_power_down" => Ok(Self::PowerDown),
            _ => Err(Error::Command("unknown command")),
        }
    }
}

fn parse_level(arg: &str) -> Result<bool> {
    match arg {
        "1" | "on" | "high" => Ok(true),
        "0" | "off" | "low" => Ok(false),
        _ => Err(Error::Command("expected 0 or 1")),
    }
}

/// What a console command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Done,
    State(State),
    Connected(bool),
    /// Whether the publish was accepted (not whether it was acked).
    Sent(bool),
    Json(std::string::String),
}
