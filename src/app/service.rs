//! Comms service: the engine's public face.
//!
//! [`CommsService`] owns the session, the dialect and the configuration.
//! Ports are borrowed per call, never stored, so the same service runs
//! against the ESP-IDF UART on target and a scripted mock in tests.
//!
//! ```text
//!  Transport + Clock ──▶ ┌──────────────────────────┐ ──▶ CommandProcessor
//!                        │       CommsService        │
//!                        │ classify · demux · FSM ·  │ ──▶ AckHook
//!                        │ supervisor                │
//!                        └──────────────────────────┘ ──▶ ModemControl
//! ```
//!
//! Single-owner and non-reentrant: one task calls `poll` (or
//! `process_line` + `tick`) and everything else, in order.

use log::{debug, info, warn};

use super::commands::{CommandReply, CommsCommand};
use super::ports::{AckHook, Clock, CommandProcessor, ModemControl};
use crate::at::codec::LINE_MAX;
use crate::at::command::frame;
use crate::at::transport::Transport;
use crate::config::CommsConfig;
use crate::dialect::{Dialect, TOPIC_MEASUREMENTS};
use crate::error::{Error, LinkError, Result};
use crate::fsm::session::Topic;
use crate::fsm::{Machine, Session, State};
use crate::supervisor;

/// A timestamp older than this when collected is discarded.
pub const TIMESTAMP_MAX_AGE_MS: u32 = 50;

/// Upper bound on lines drained per `poll`, so a chattering modem cannot
/// starve the timeout check.
const MAX_LINES_PER_POLL: usize = 16;

// ───────────────────────────────────────────────────────────────
// CommsService
// ───────────────────────────────────────────────────────────────

pub struct CommsService {
    session: Session,
    dialect: &'static Dialect,
    config: CommsConfig,
}

impl CommsService {
    /// Build the service in `Off`. Nothing is sent until [`start`] or the
    /// modem's ready banner; a silent modem gets a reset pulse after the
    /// still-off budget.
    ///
    /// [`start`]: Self::start
    pub fn new(
        dialect: &'static Dialect,
        config: CommsConfig,
        topic_header: Topic,
        now_ms: u32,
    ) -> Self {
        info!(
            "comms: {} as {} (config {})",
            dialect.name,
            topic_header,
            if config.is_valid() { "ok" } else { "invalid" }
        );
        Self {
            session: Session::new(topic_header, now_ms),
            dialect,
            config,
        }
    }

    fn machine<'a, L, A>(&'a mut self, link: &'a mut L, app: &'a mut A) -> Machine<'a, L, A>
    where
        L: Transport + Clock,
        A: CommandProcessor + AckHook,
    {
        Machine::new(&mut self.session, self.dialect, &self.config, link, app)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Issue the restart command (or fully reset if already running).
    pub fn start<L, A>(&mut self, link: &mut L, app: &mut A)
    where
        L: Transport + Clock,
        A: CommandProcessor + AckHook,
    {
        self.machine(link, app).start();
    }

    /// Run the timeout supervisor once. `pins` is pulsed when the modem
    /// stops answering altogether.
    pub fn tick<L, A, P>(&mut self, link: &mut L, app: &mut A, pins: &mut P)
    where
        L: Transport + Clock,
        A: CommandProcessor + AckHook,
        P: ModemControl + ?Sized,
    {
        supervisor::check(&mut self.machine(link, app), pins);
    }

    /// Feed one complete, terminator-stripped line. Returns `true` when it
    /// was an unsolicited frame that parsed and was acted on.
    pub fn process_line<L, A>(&mut self, line: &[u8], link: &mut L, app: &mut A) -> bool
    where
        L: Transport + Clock,
        A: CommandProcessor + AckHook,
    {
        self.machine(link, app).process_line(line)
    }

    /// Drain pending lines from the transport, then tick.
    pub fn poll<L, A, P>(&mut self, link: &mut L, app: &mut A, pins: &mut P)
    where
        L: Transport + Clock,
        A: CommandProcessor + AckHook,
        P: ModemControl + ?Sized,
    {
        self.drain(link, app);
        self.tick(link, app, pins);
    }

    fn drain<L, A>(&mut self, link: &mut L, app: &mut A)
    where
        L: Transport + Clock,
        A: CommandProcessor + AckHook,
    {
        let mut buf = [0u8; LINE_MAX];
        for _ in 0..MAX_LINES_PER_POLL {
            let Some(n) = link.read_line(&mut buf) else {
                break;
            };
            let n = n.min(buf.len());
            self.process_line(&buf[..n], link, app);
        }
    }

    // ── Uplink ────────────────────────────────────────────────

    /// Publish `payload` on `<header>/<suffix>`. `true` if accepted; the
    /// outcome arrives later through [`AckHook::on_ack`].
    pub fn send<L, A>(&mut self, suffix: &str, payload: &[u8], link: &mut L, app: &mut A) -> bool
    where
        L: Transport + Clock,
        A: CommandProcessor + AckHook,
    {
        self.machine(link, app).send(suffix, payload)
    }

    /// Ask the modem for unix time, draining the link up to `tick_budget`
    /// times for the answer. Returns `None` outside `Idle`, on dialects without a
    /// timestamp query, or when the reading is stale.
    pub fn get_unix_time<L, A>(&mut self, link: &mut L, app: &mut A, tick_budget: u32) -> Option<u64>
    where
        L: Transport + Clock,
        A: CommandProcessor + AckHook,
    {
        if !self.machine(link, app).query_timestamp() {
            return None;
        }
        for _ in 0..tick_budget {
            if self.session.state != State::WaitTimestamp {
                break;
            }
            self.drain(link, app);
        }
        let capture = self.session.timestamp.take()?;
        let age = link.now_ms().wrapping_sub(capture.captured_ms);
        if age > TIMESTAMP_MAX_AGE_MS {
            debug!("comms: timestamp {} ms old, discarded", age);
            return None;
        }
        Some(capture.unix)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_connected(&self) -> bool {
        self.session.state.is_connected()
    }

    /// A `send` now would be accepted (size permitting).
    pub fn send_ready(&self) -> bool {
        self.session.state == State::Idle
    }

    pub fn mtu(&self) -> usize {
        self.dialect.mtu
    }

    pub fn state(&self) -> State {
        self.session.state
    }

    pub fn state_name(&self) -> &'static str {
        self.session.state.name()
    }

    /// Topic header (`osm/<ID>`).
    pub fn id(&self) -> &str {
        self.session.topic_header()
    }

    pub fn dialect(&self) -> &'static Dialect {
        self.dialect
    }

    pub fn config(&self) -> &CommsConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ── Control ───────────────────────────────────────────────

    /// Hold the modem in reset and park the session in `Off`. An in-flight
    /// publish is nacked. Nothing is sent to the modem.
    pub fn power_down<L, A>(&mut self, link: &mut L, app: &mut A, pins: &mut impl ModemControl) -> Result<()>
    where
        L: Transport + Clock,
        A: CommandProcessor + AckHook,
    {
        self.machine(link, app).power_down();
        pins.set_reset(false)
    }

    /// Execute one console command.
    pub fn handle_command<L, A>(
        &mut self,
        cmd: CommsCommand<'_>,
        link: &mut L,
        app: &mut A,
        pins: &mut impl ModemControl,
    ) -> Result<CommandReply>
    where
        L: Transport + Clock,
        A: CommandProcessor + AckHook,
    {
        match cmd {
            CommsCommand::Send(text) => Ok(CommandReply::Sent(self.send(
                TOPIC_MEASUREMENTS,
                text.as_bytes(),
                link,
                app,
            ))),
            CommsCommand::Debug(raw) => {
                let wire = frame(raw).ok_or(Error::Link(LinkError::CommandTooLong))?;
                debug!("<< {}", raw);
                if link.send_raw(&wire) != wire.len() {
                    return Err(Error::Link(LinkError::ShortWrite));
                }
                Ok(CommandReply::Done)
            }
            CommsCommand::State => Ok(CommandReply::State(self.state())),
            CommsCommand::Connected => Ok(CommandReply::Connected(self.is_connected())),
            CommsCommand::Restart => {
                pins.set_reset(true)?;
                self.start(link, app);
                Ok(CommandReply::Done)
            }
            CommsCommand::Boot(high) => {
                pins.set_boot(high)?;
                Ok(CommandReply::Done)
            }
            CommsCommand::Reset(high) => {
                pins.set_reset(high)?;
                Ok(CommandReply::Done)
            }
            CommsCommand::Config { name, value } => {
                self.config.set_field(name, value)?;
                if self.config.is_valid() && !self.session.powered_down {
                    info!("comms: {} updated, restarting", name);
                    self.start(link, app);
                } else {
                    warn!("comms: {} updated, configuration still incomplete", name);
                }
                Ok(CommandReply::Done)
            }
            CommsCommand::JsonConfig => Ok(CommandReply::Json(self.config.to_json()?)),
            CommsCommand::PowerDown => {
                self.power_down(link, app, pins)?;
                Ok(CommandReply::Done)
            }
        }
    }
}
