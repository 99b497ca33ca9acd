//! Modem command sequencer.
//!
//! ```text
//!  Off ─ready─▶ EchoOff ─OK─▶ RegionConfig ─OK…─▶ Associate ─OK─▶ AssociateWait
//!                                                                    │ associated
//!  ┌─────────────────────────────────────────────────────────────────┘
//!  ▼
//!  TimeSync ─+TIME_UPDATED─▶ MqttUserCfg ─OK─▶ MqttConnCfg ─OK─▶ MqttConnecting
//!     │                           ▲                                   │ OK
//!     └▶ ProbeIsConnected ─no─────┘                                   ▼
//!            │ yes                                                 MqttSub ─OK─▶ Idle
//!            ▼                                                        ▲
//!        ProbeIsSubscribed ─no────────────────────────────────────────┘
//!            │ yes ─────────────────────────────────────────────────────────▶ Idle
//!
//!  Off ─ready (not after our restart)─▶ ProbeIsAssociated ─yes─▶ ProbeIsConnected
//!                                              │ no
//!                                              └─▶ full reset
//!
//!  Idle ─send()─▶ WaitPub ─OK─▶ Publishing ─marker─▶ Idle (ack true)
//! ```
//!
//! Stages the dialect has no command for are skipped. An exact `ERROR`
//! sends the session back to `Off` through a full reset, except a broker
//! refusal, which parks in `MqttFailConnect`; timeouts are handled by
//! [`crate::supervisor`].
//!
//! The machine is a plain enum plus exhaustive `match` in
//! [`states`]: adding a state without deciding its reaction to every
//! input does not compile.

pub mod session;
pub mod states;

pub use session::Session;
pub use states::Machine;

use crate::dialect::TimeoutClass;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum State {
    /// Modem booting or held in reset; waiting for its ready banner.
    Off = 0,
    EchoOff = 1,
    RegionConfig = 2,
    Associate = 3,
    /// Waiting for the association push (after the optional status query).
    AssociateWait = 4,
    /// Waiting for the time-updated push.
    TimeSync = 5,
    MqttUserCfg = 6,
    MqttConnCfg = 7,
    MqttConnecting = 8,
    MqttSub = 9,
    /// Boot resume: is the station still associated?
    ProbeIsAssociated = 10,
    /// Boot probe: is a broker session already up?
    ProbeIsConnected = 11,
    /// Boot probe: is our command topic already subscribed?
    ProbeIsSubscribed = 12,
    /// Broker refused; holding off before reconfiguring.
    MqttFailConnect = 13,
    Idle = 14,
    /// Publish announced, waiting for the go-ahead.
    WaitPub = 15,
    /// Payload written, waiting for the publish marker.
    Publishing = 16,
    /// Timed out; asking whether the network link is still up.
    TimedOutProbeLink = 17,
    /// Timed out; asking whether the broker session is still up.
    TimedOutProbeMqtt = 18,
    WaitTimestamp = 19,
}

impl State {
    pub const COUNT: usize = 20;

    pub const ALL: [State; Self::COUNT] = [
        Self::Off,
        Self::EchoOff,
        Self::RegionConfig,
        Self::Associate,
        Self::AssociateWait,
        Self::TimeSync,
        Self::MqttUserCfg,
        Self::MqttConnCfg,
        Self::MqttConnecting,
        Self::MqttSub,
        Self::ProbeIsAssociated,
        Self::ProbeIsConnected,
        Self::ProbeIsSubscribed,
        Self::MqttFailConnect,
        Self::Idle,
        Self::WaitPub,
        Self::Publishing,
        Self::TimedOutProbeLink,
        Self::TimedOutProbeMqtt,
        Self::WaitTimestamp,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::EchoOff => "ECHO_OFF",
            Self::RegionConfig => "REGION_CONFIG",
            Self::Associate => "ASSOCIATE",
            Self::AssociateWait => "ASSOCIATE_WAIT",
            Self::TimeSync => "TIME_SYNC",
            Self::MqttUserCfg => "MQTT_USER_CFG",
            Self::MqttConnCfg => "MQTT_CONN_CFG",
            Self::MqttConnecting => "MQTT_CONNECTING",
            Self::MqttSub => "MQTT_SUB",
            Self::ProbeIsAssociated => "PROBE_IS_ASSOCIATED",
            Self::ProbeIsConnected => "PROBE_IS_CONNECTED",
            Self::ProbeIsSubscribed => "PROBE_IS_SUBSCRIBED",
            Self::MqttFailConnect => "MQTT_FAIL_CONNECT",
            Self::Idle => "IDLE",
            Self::WaitPub => "WAIT_PUB",
            Self::Publishing => "PUBLISHING",
            Self::TimedOutProbeLink => "TIMED_OUT_PROBE_LINK",
            Self::TimedOutProbeMqtt => "TIMED_OUT_PROBE_MQTT",
            Self::WaitTimestamp => "WAIT_TIMESTAMP",
        }
    }

    /// Budget family for states that wait on the modem. `Off` runs on the
    /// still-off budget and `Idle` waits on nothing.
    pub const fn timeout_class(self) -> Option<TimeoutClass> {
        match self {
            Self::Off | Self::Idle => None,
            Self::EchoOff
            | Self::RegionConfig
            | Self::ProbeIsAssociated
            | Self::ProbeIsConnected
            | Self::ProbeIsSubscribed
            | Self::TimedOutProbeLink
            | Self::TimedOutProbeMqtt
            | Self::WaitTimestamp => Some(TimeoutClass::Default),
            Self::Associate | Self::AssociateWait | Self::TimeSync => {
                Some(TimeoutClass::Association)
            }
            Self::MqttUserCfg
            | Self::MqttConnCfg
            | Self::MqttConnecting
            | Self::MqttSub
            | Self::WaitPub
            | Self::Publishing => Some(TimeoutClass::Mqtt),
            Self::MqttFailConnect => Some(TimeoutClass::FailConnect),
        }
    }

    /// On timeout these probe the modem and retry instead of resetting.
    pub const fn is_retry_capable(self) -> bool {
        matches!(
            self,
            Self::MqttUserCfg
                | Self::MqttConnCfg
                | Self::MqttConnecting
                | Self::MqttSub
                | Self::WaitPub
                | Self::Publishing
        )
    }

    /// Uplink is usable (or in use).
    pub const fn is_connected(self) -> bool {
        matches!(
            self,
            Self::Idle | Self::WaitPub | Self::Publishing | Self::WaitTimestamp
        )
    }
}

impl core::fmt::Display for State {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
