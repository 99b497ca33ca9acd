//! Sequencer transitions.
//!
//! [`Machine`] borrows the session, the dialect, the configuration and
//! both ports for the duration of one entry-point call. Every inbound
//! line is classified once and routed to exactly one of
//! `on_unsolicited` / `on_ok` / `on_error` / `on_plain`; each of those
//! matches exhaustively on [`State`].

use core::fmt::Write;

use log::{debug, info, warn};

use super::session::{Payload, ProbeSnapshot, TimestampCapture, Topic, PAYLOAD_MAX};
use super::{Session, State};
use crate::app::ports::{AckHook, Clock, CommandProcessor};
use crate::at::classify::{classify, Response, UrcKind};
use crate::at::command::{frame, reply_json, CommandLine};
use crate::at::transport::Transport;
use crate::at::urc::{self, InboundMessage};
use crate::config::CommsConfig;
use crate::dialect::{
    CommandArgs, CommandFn, Dialect, MqttCommands, PublishArgs, PublishStyle, TOPIC_COMMAND,
    TOPIC_COMMAND_RESP,
};

/// Bring-up stages in order. A stage the dialect has no command for is
/// skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    EchoOff,
    RegionConfig,
    Associate,
    TimeSync,
    Mqtt,
    Online,
}

impl Stage {
    const fn next(self) -> Self {
        match self {
            Self::EchoOff => Self::RegionConfig,
            Self::RegionConfig => Self::Associate,
            Self::Associate => Self::TimeSync,
            Self::TimeSync => Self::Mqtt,
            Self::Mqtt | Self::Online => Self::Online,
        }
    }
}

/// One sequencer step's worth of borrowed context.
pub struct Machine<'a, L, A> {
    pub(crate) session: &'a mut Session,
    pub(crate) dialect: &'static Dialect,
    pub(crate) config: &'a CommsConfig,
    pub(crate) link: &'a mut L,
    pub(crate) app: &'a mut A,
}

impl<'a, L, A> Machine<'a, L, A>
where
    L: Transport + Clock,
    A: CommandProcessor + AckHook,
{
    pub(crate) fn new(
        session: &'a mut Session,
        dialect: &'static Dialect,
        config: &'a CommsConfig,
        link: &'a mut L,
        app: &'a mut A,
    ) -> Self {
        Self {
            session,
            dialect,
            config,
            link,
            app,
        }
    }

    // ── Entry points ──────────────────────────────────────────

    /// Classify and dispatch one line. Returns `true` when the line was
    /// an unsolicited frame that parsed and was acted on.
    pub fn process_line(&mut self, line: &[u8]) -> bool {
        match core::str::from_utf8(line) {
            Ok(text) => debug!(">> {}", text),
            Err(_) => debug!(">> <{} bytes>", line.len()),
        }
        match classify(self.dialect, line) {
            Response::Unsolicited(kind, body) => self.on_unsolicited(kind, body),
            Response::Ok => {
                self.on_ok();
                false
            }
            Response::Error => {
                self.on_error();
                false
            }
            Response::Plain => {
                self.on_plain(line);
                false
            }
        }
    }

    /// Announce a publish on `<header>/<suffix>`. Only accepted in `Idle`;
    /// a rejected call leaves the session untouched.
    pub fn send(&mut self, suffix: &str, payload: &[u8]) -> bool {
        let state = self.session.state;
        if state != State::Idle {
            debug!("comms: send rejected in {}", state);
            return false;
        }
        let dialect = self.dialect;
        if payload.len() > dialect.mtu || payload.len() > PAYLOAD_MAX {
            warn!("comms: payload {} B exceeds MTU {}", payload.len(), dialect.mtu);
            return false;
        }
        let mut topic = Topic::new();
        if write!(topic, "{}/{}", self.session.topic_header, suffix).is_err() {
            warn!("comms: topic '{}' too long", suffix);
            return false;
        }
        let port = self.session.peek_uplink_port();
        let args = PublishArgs {
            link_id: dialect.link_id,
            topic: &topic,
            payload,
            port,
        };
        let mut cmd = CommandLine::new();
        if (dialect.publish.announce)(&args, &mut cmd).is_err() {
            warn!("comms: publish announce overflow");
            return false;
        }
        let Ok(buf) = Payload::from_slice(payload) else {
            return false;
        };
        if dialect.publish.style == PublishStyle::InlineHex {
            self.session.uplink_port = port;
        }
        self.session.publish = Some(buf);
        self.session.last_cmd = cmd;
        self.transmit();
        self.set_state(State::WaitPub);
        true
    }

    /// Issue the restart command (first bring-up command) from `Off`, or
    /// fully reset from any other state.
    pub fn start(&mut self) {
        self.session.powered_down = false;
        self.session.parked = false;
        if self.session.state == State::Off {
            self.restart();
        } else {
            self.full_reset("restart requested");
        }
    }

    /// Ask for the modem's unix time. Only from `Idle`.
    pub fn query_timestamp(&mut self) -> bool {
        if self.session.state != State::Idle {
            return false;
        }
        let Some(query) = self.dialect.timestamp_query else {
            return false;
        };
        self.session.timestamp = None;
        self.emit(query);
        self.set_state(State::WaitTimestamp);
        true
    }

    /// Drop everything and go back to `Off`. Fires `ack(false)` first if
    /// a publish was in flight, then re-issues the restart command
    /// (immediately, or after the dialect's reset backoff).
    pub fn full_reset(&mut self, reason: &str) {
        warn!("comms: reset from {} ({})", self.session.state, reason);
        self.finish_publish(false);
        self.session.clear();
        self.session.consecutive_resets = self.session.consecutive_resets.saturating_add(1);
        match self.dialect.reset_backoff {
            Some(backoff) => {
                let now = self.link.now_ms();
                let delay = backoff.delay_ms(self.session.consecutive_resets);
                info!("comms: restart in {} ms", delay);
                self.session.restart_due = Some(now.wrapping_add(delay));
                self.session.last_sent_ms = now;
            }
            None => self.restart(),
        }
    }

    /// The reset line was just pulsed: abandon everything and wait in
    /// `Off` for the banner. Nothing is sent.
    pub(crate) fn hard_reset(&mut self, reason: &str) {
        warn!("comms: hardware reset from {} ({})", self.session.state, reason);
        self.finish_publish(false);
        self.session.clear();
        self.session.last_sent_ms = self.link.now_ms();
    }

    /// Publish the result of a downlink command once the link is free.
    pub(crate) fn flush_reply(&mut self) {
        if self.session.state != State::Idle {
            return;
        }
        let Some(code) = self.session.pending_reply.take() else {
            return;
        };
        let reply = reply_json(code);
        if !self.send(TOPIC_COMMAND_RESP, reply.as_bytes()) {
            warn!("comms: reply 0x{:02X} dropped", code);
        }
    }

    /// Hold the modem down: abandon everything, stay `Off` and silent.
    pub fn power_down(&mut self) {
        self.finish_publish(false);
        self.session.clear();
        self.session.powered_down = true;
        info!("comms: powered down");
    }

    // ── Line dispatch ─────────────────────────────────────────

    fn on_unsolicited(&mut self, kind: UrcKind, body: &[u8]) -> bool {
        let dialect = self.dialect;
        match kind {
            UrcKind::Association => {
                let Some(up) = (dialect.parse_association)(body, self.config) else {
                    return malformed(kind);
                };
                self.session.belief.associated = Some(up);
                let awaiting_push = self.session.state == State::AssociateWait
                    && dialect.bring_up.association_query.is_none();
                if awaiting_push {
                    if up {
                        self.advance(Stage::TimeSync);
                    } else {
                        self.full_reset("association failed");
                    }
                }
                true
            }
            UrcKind::MqttConnection => {
                let Some(status) = urc::parse_mqtt_conn(body) else {
                    return malformed(kind);
                };
                let alive = dialect.mqtt_alive.contains(&status.code);
                debug!("comms: mqtt link {} state {}", status.link_id, status.code);
                self.session.belief.mqtt_connected = Some(alive);
                true
            }
            UrcKind::Subscription => {
                let Some(topic) = urc::parse_subscription(body) else {
                    return malformed(kind);
                };
                if self.topic_tail(topic) == Some(TOPIC_COMMAND.as_bytes()) {
                    self.session.belief.subscribed = true;
                }
                true
            }
            UrcKind::Message => {
                let Some(msg) = urc::parse_message(body) else {
                    return malformed(kind);
                };
                self.on_message(&msg);
                true
            }
            UrcKind::Downlink => {
                let Some(frame) = urc::parse_downlink(body) else {
                    return malformed(kind);
                };
                let mut bytes = Payload::new();
                if urc::decode_hex(frame.hex, &mut bytes).is_none() {
                    return malformed(kind);
                }
                match urc::downlink_command(&bytes) {
                    Some(command) => {
                        let code = self.app.process(command);
                        debug!("comms: downlink command -> 0x{:02X}", code);
                        // Goes out as an uplink once Idle.
                        self.session.pending_reply = Some(code);
                    }
                    None => debug!("comms: downlink on port {} ignored", frame.port),
                }
                true
            }
            UrcKind::TimeSync => {
                if self.session.state == State::TimeSync {
                    self.advance(Stage::Mqtt);
                }
                true
            }
            UrcKind::Timestamp => {
                let Some(unix) = urc::parse_timestamp(body) else {
                    return malformed(kind);
                };
                self.session.timestamp = Some(TimestampCapture {
                    unix,
                    captured_ms: self.link.now_ms(),
                });
                true
            }
        }
    }

    fn on_ok(&mut self) {
        let dialect = self.dialect;
        let belief = self.session.belief;
        match self.session.state {
            // Echo of the restart command, late replies, or nothing pending.
            State::Off | State::TimeSync | State::Idle | State::MqttFailConnect => {}
            // ESP-AT sends no OK after the raw payload; RAK3172 sends one
            // before the TX event. Either way the marker decides.
            State::Publishing => {}
            State::EchoOff => self.advance(Stage::RegionConfig),
            State::RegionConfig => {
                self.session.region_step += 1;
                match dialect.bring_up.region_config.get(self.session.region_step) {
                    Some(&next) => self.emit(next),
                    None => self.advance(Stage::Associate),
                }
            }
            State::Associate => {
                if let Some(query) = dialect.bring_up.association_query {
                    self.session.belief.associated = None;
                    self.emit(query);
                }
                self.set_state(State::AssociateWait);
            }
            State::AssociateWait => {
                if belief.associated == Some(true) {
                    self.advance(Stage::TimeSync);
                } else {
                    debug!("comms: not associated yet");
                }
            }
            State::ProbeIsAssociated => match dialect.mqtt.as_ref() {
                Some(mqtt) if belief.associated == Some(true) => {
                    info!("comms: station still up, checking the broker session");
                    self.session.belief.mqtt_connected = None;
                    self.emit(mqtt.conn_query);
                    self.set_state(State::ProbeIsConnected);
                }
                _ => self.full_reset("no session to resume"),
            },
            State::MqttUserCfg => self.mqtt_step(|m| m.conn_cfg, State::MqttConnCfg),
            State::MqttConnCfg => self.mqtt_step(|m| m.connect, State::MqttConnecting),
            State::MqttConnecting => self.mqtt_step(|m| m.subscribe, State::MqttSub),
            State::MqttSub => self.enter_idle(),
            State::ProbeIsConnected => {
                if belief.mqtt_connected == Some(true) {
                    match dialect.mqtt.as_ref().and_then(|m| m.sub_query) {
                        Some(query) => {
                            self.session.belief.subscribed = false;
                            self.emit(query);
                            self.set_state(State::ProbeIsSubscribed);
                        }
                        None => self.mqtt_step(|m| m.subscribe, State::MqttSub),
                    }
                } else {
                    self.configure_mqtt();
                }
            }
            State::ProbeIsSubscribed => {
                if belief.subscribed {
                    self.enter_idle();
                } else {
                    self.mqtt_step(|m| m.subscribe, State::MqttSub);
                }
            }
            State::WaitPub => self.write_payload(),
            State::TimedOutProbeLink => {
                if belief.associated != Some(true) {
                    self.full_reset("link down after timeout");
                } else if let Some(mqtt) = dialect.mqtt.as_ref() {
                    self.session.belief.mqtt_connected = None;
                    self.emit(mqtt.conn_query);
                    self.set_state(State::TimedOutProbeMqtt);
                } else {
                    self.retry_snapshot();
                }
            }
            State::TimedOutProbeMqtt => {
                if belief.mqtt_connected == Some(true) {
                    self.retry_snapshot();
                } else {
                    self.full_reset("broker session lost after timeout");
                }
            }
            State::WaitTimestamp => self.set_state(State::Idle),
        }
    }

    fn on_error(&mut self) {
        match self.session.state {
            // Reply to the restart command; the still-off timer covers it.
            State::Off => debug!("comms: ERROR while off"),
            // Refusal holds off for the fail-connect budget and then redoes
            // the MQTT configuration, instead of a full reset.
            State::MqttConnecting => {
                warn!("comms: broker refused, backing off");
                self.set_state(State::MqttFailConnect);
            }
            State::MqttSub if self.session.belief.subscribed => self.enter_idle(),
            State::EchoOff
            | State::RegionConfig
            | State::Associate
            | State::AssociateWait
            | State::TimeSync
            | State::MqttUserCfg
            | State::MqttConnCfg
            | State::MqttSub
            | State::ProbeIsAssociated
            | State::ProbeIsConnected
            | State::ProbeIsSubscribed
            | State::MqttFailConnect
            | State::Idle
            | State::WaitPub
            | State::Publishing
            | State::TimedOutProbeLink
            | State::TimedOutProbeMqtt
            | State::WaitTimestamp => self.full_reset("ERROR"),
        }
    }

    fn on_plain(&mut self, line: &[u8]) {
        let tokens = &self.dialect.tokens;
        if tokens.ready.matches(line) {
            self.on_ready();
            return;
        }
        match self.session.state {
            State::MqttSub => {
                if tokens.already_subscribed.is_some_and(|t| line == t.as_bytes()) {
                    info!("comms: command topic already subscribed");
                    self.session.belief.subscribed = true;
                }
            }
            State::Publishing => {
                let marker = line.strip_prefix(b">").unwrap_or(line);
                if marker == tokens.publish_ok.as_bytes() {
                    self.finish_publish(true);
                    self.set_state(State::Idle);
                } else if tokens.publish_failed.is_some_and(|t| marker == t.as_bytes()) {
                    self.full_reset("uplink not confirmed");
                }
            }
            State::Off
            | State::EchoOff
            | State::RegionConfig
            | State::Associate
            | State::AssociateWait
            | State::TimeSync
            | State::MqttUserCfg
            | State::MqttConnCfg
            | State::MqttConnecting
            | State::ProbeIsAssociated
            | State::ProbeIsConnected
            | State::ProbeIsSubscribed
            | State::MqttFailConnect
            | State::Idle
            | State::WaitPub
            | State::TimedOutProbeLink
            | State::TimedOutProbeMqtt
            | State::WaitTimestamp => {}
        }
    }

    fn on_ready(&mut self) {
        let may_resume = core::mem::take(&mut self.session.may_resume);
        if self.session.state != State::Off {
            warn!("comms: modem restarted during {}", self.session.state);
            self.finish_publish(false);
            self.session.clear();
        }
        if self.session.powered_down {
            return;
        }
        let dialect = self.dialect;
        if !self.config.is_valid() || !(dialect.config_ready)(self.config) {
            warn!("comms: configuration incomplete for {}, parked", dialect.name);
            self.session.restart_due = None;
            self.session.parked = true;
            return;
        }
        self.session.restart_due = None;
        match dialect.bring_up.association_query {
            Some(query) if may_resume && dialect.resume_on_boot => {
                info!("comms: first banner since boot, looking for a live session");
                self.session.belief.associated = None;
                self.emit(query);
                self.set_state(State::ProbeIsAssociated);
            }
            _ => self.advance(Stage::EchoOff),
        }
    }

    fn on_message(&mut self, msg: &InboundMessage<'_>) {
        match self.topic_tail(msg.topic) {
            Some(tail) if tail == TOPIC_COMMAND.as_bytes() => {
                let code = self.app.process(msg.payload);
                let reply = reply_json(code);
                if !self.send(TOPIC_COMMAND_RESP, reply.as_bytes()) {
                    warn!(
                        "comms: reply 0x{:02X} dropped in {}",
                        code, self.session.state
                    );
                }
            }
            Some(_) => debug!("comms: broadcast ignored"),
            None => debug!("comms: message for a foreign topic"),
        }
    }

    // ── Transitions ───────────────────────────────────────────

    fn advance(&mut self, from: Stage) {
        let dialect = self.dialect;
        let steps = &dialect.bring_up;
        let mut stage = from;
        loop {
            match stage {
                Stage::EchoOff => {
                    if let Some(cmd) = steps.echo_off {
                        self.emit(cmd);
                        self.set_state(State::EchoOff);
                        return;
                    }
                }
                Stage::RegionConfig => {
                    if let Some(&cmd) = steps.region_config.first() {
                        self.session.region_step = 0;
                        self.emit(cmd);
                        self.set_state(State::RegionConfig);
                        return;
                    }
                }
                Stage::Associate => {
                    if let Some(cmd) = steps.associate {
                        self.session.belief.associated = None;
                        self.emit(cmd);
                        self.set_state(State::Associate);
                        return;
                    }
                }
                Stage::TimeSync => {
                    if let Some(cmd) = steps.time_sync {
                        self.emit(cmd);
                        self.set_state(State::TimeSync);
                        return;
                    }
                }
                Stage::Mqtt => {
                    if let Some(mqtt) = dialect.mqtt.as_ref() {
                        if dialect.probe_existing_session {
                            self.session.belief.mqtt_connected = None;
                            self.emit(mqtt.conn_query);
                            self.set_state(State::ProbeIsConnected);
                        } else {
                            self.configure_mqtt();
                        }
                        return;
                    }
                }
                Stage::Online => {
                    self.enter_idle();
                    return;
                }
            }
            stage = stage.next();
        }
    }

    /// Start (or restart) the MQTT configuration chain.
    pub(crate) fn configure_mqtt(&mut self) {
        self.mqtt_step(|m| m.user_cfg, State::MqttUserCfg);
    }

    fn mqtt_step(&mut self, pick: fn(&MqttCommands) -> CommandFn, next: State) {
        match self.dialect.mqtt.as_ref() {
            Some(mqtt) => {
                self.emit(pick(mqtt));
                self.set_state(next);
            }
            None => self.full_reset("no MQTT vocabulary"),
        }
    }

    fn enter_idle(&mut self) {
        if self.session.state != State::Idle {
            info!("comms: {} link up", self.dialect.name);
        }
        self.session.consecutive_resets = 0;
        self.session.snapshot = None;
        self.set_state(State::Idle);
    }

    fn write_payload(&mut self) {
        if self.dialect.publish.style == PublishStyle::Raw {
            match &self.session.publish {
                Some(payload) => {
                    let n = self.link.send_raw(payload);
                    if n != payload.len() {
                        warn!("comms: payload short write {}/{}", n, payload.len());
                    }
                    self.session.last_sent_ms = self.link.now_ms();
                }
                None => warn!("comms: go-ahead with no payload"),
            }
        }
        self.set_state(State::Publishing);
    }

    fn finish_publish(&mut self, acked: bool) {
        if self.session.publish.take().is_some() {
            if !acked {
                warn!("comms: publish failed");
            }
            self.app.on_ack(acked);
        }
    }

    /// Snapshot and send the timeout probe. The snapshot resumes a timed
    /// out `Publishing` at `WaitPub`, since the announce is what gets
    /// replayed.
    pub(crate) fn begin_probe(&mut self) {
        let dialect = self.dialect;
        let Some(mqtt) = dialect.mqtt.as_ref() else {
            self.full_reset("timeout");
            return;
        };
        let state = self.session.state;
        let resume = if state == State::Publishing {
            State::WaitPub
        } else {
            state
        };
        self.session.snapshot = Some(ProbeSnapshot {
            state: resume,
            command: self.session.last_cmd.clone(),
        });
        self.session.belief.associated = None;
        self.session.belief.mqtt_connected = None;
        match dialect.bring_up.association_query {
            Some(query) if dialect.probe_link_on_timeout => {
                self.emit(query);
                self.set_state(State::TimedOutProbeLink);
            }
            _ => {
                self.emit(mqtt.conn_query);
                self.set_state(State::TimedOutProbeMqtt);
            }
        }
    }

    fn retry_snapshot(&mut self) {
        match self.session.snapshot.take() {
            Some(snap) => {
                info!("comms: modem alive, retrying {}", snap.state);
                self.session.last_cmd = snap.command;
                self.transmit();
                self.set_state(snap.state);
            }
            None => self.full_reset("probe without snapshot"),
        }
    }

    pub(crate) fn restart(&mut self) {
        self.session.restart_due = None;
        self.session.may_resume = false;
        self.emit(self.dialect.bring_up.restart);
    }

    // ── Output ────────────────────────────────────────────────

    /// Render a template into the session's last-command slot and send it.
    fn emit(&mut self, template: CommandFn) {
        let args = CommandArgs {
            config: self.config,
            topic_header: &self.session.topic_header,
            link_id: self.dialect.link_id,
        };
        let mut cmd = CommandLine::new();
        if template(&args, &mut cmd).is_err() {
            log::error!("comms: command overflow in {}", self.session.state);
            self.session.last_cmd.clear();
            self.session.last_sent_ms = self.link.now_ms();
            return;
        }
        self.session.last_cmd = cmd;
        self.transmit();
    }

    /// Frame and write `last_cmd`, stamping the send time.
    fn transmit(&mut self) {
        debug!("<< {}", self.session.last_cmd);
        match frame(&self.session.last_cmd) {
            Some(wire) => {
                let n = self.link.send_raw(&wire);
                if n != wire.len() {
                    warn!("comms: short write {}/{}", n, wire.len());
                }
            }
            None => log::error!("comms: command too long to frame"),
        }
        self.session.last_sent_ms = self.link.now_ms();
    }

    pub(crate) fn set_state(&mut self, next: State) {
        let prev = self.session.state;
        if prev != next {
            info!("comms: {} -> {}", prev, next);
            self.session.state = next;
        }
    }

    /// Part of `topic` after `<header>/`, if it is one of ours.
    fn topic_tail<'t>(&self, topic: &'t [u8]) -> Option<&'t [u8]> {
        topic
            .strip_prefix(self.session.topic_header.as_bytes())?
            .strip_prefix(b"/")
    }
}

fn malformed(kind: UrcKind) -> bool {
    debug!("comms: malformed {:?} frame dropped", kind);
    false
}
