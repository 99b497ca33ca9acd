//! Timeout supervisor.
//!
//! Runs on every tick, after pending lines have been processed. It owns
//! no state of its own: everything it needs is the session's state and
//! last-sent timestamp plus the dialect's budgets.
//!
//! ## Timeout lifecycle
//!
//! 1. A command is sent; the session stamps `last_sent_ms`.
//! 2. If the state's budget elapses with no transition, the supervisor
//!    picks one of three outcomes:
//!    - retry-capable MQTT / publish states snapshot themselves and probe
//!      the modem (link first where the dialect can, then broker);
//!    - `MqttFailConnect` has waited out its backoff and redoes the MQTT
//!      configuration;
//!    - states on the default budget pulse the reset line: the modem
//!      stopped answering plain commands;
//!    - everything else gets a full reset.
//! 3. In `Off` the supervisor instead fires a deferred restart when its
//!    backoff is due, or pulses reset after the still-off budget. A
//!    parked or powered-down session is left alone.
//! 4. In `Idle` a deferred downlink reply goes out.

use log::{info, warn};

use crate::app::ports::{AckHook, Clock, CommandProcessor, ModemControl};
use crate::at::transport::Transport;
use crate::dialect::TimeoutClass;
use crate::fsm::{Machine, State};

/// Evaluate the current state's budget against the clock.
pub fn check<L, A, P>(m: &mut Machine<'_, L, A>, pins: &mut P)
where
    L: Transport + Clock,
    A: CommandProcessor + AckHook,
    P: ModemControl + ?Sized,
{
    let now = m.link.now_ms();
    let state = m.session.state;

    match state {
        State::Off => {
            check_off(m, pins, now);
            return;
        }
        State::Idle => {
            m.flush_reply();
            return;
        }
        _ => {}
    }

    let Some(class) = state.timeout_class() else {
        return;
    };
    let budget = m.dialect.budgets.for_class(class);
    if m.session.elapsed_ms(now) <= budget {
        return;
    }

    warn!("comms: {} timed out after {} ms", state, budget);
    if state.is_retry_capable() {
        m.begin_probe();
    } else if state == State::MqttFailConnect {
        info!("comms: retrying broker configuration");
        m.configure_mqtt();
    } else if class == TimeoutClass::Default {
        hardware_reset(m, pins, "timeout");
    } else {
        m.full_reset("timeout");
    }
}

fn check_off<L, A, P>(m: &mut Machine<'_, L, A>, pins: &mut P, now: u32)
where
    L: Transport + Clock,
    A: CommandProcessor + AckHook,
    P: ModemControl + ?Sized,
{
    if m.session.powered_down || m.session.parked {
        return;
    }
    if let Some(due) = m.session.restart_due {
        if reached(now, due) {
            m.restart();
        }
        return;
    }
    if m.session.elapsed_ms(now) > m.dialect.budgets.still_off_ms {
        info!("comms: modem still off");
        hardware_reset(m, pins, "no banner");
    }
}

fn hardware_reset<L, A, P>(m: &mut Machine<'_, L, A>, pins: &mut P, reason: &str)
where
    L: Transport + Clock,
    A: CommandProcessor + AckHook,
    P: ModemControl + ?Sized,
{
    if let Err(e) = pins.pulse_reset() {
        warn!("comms: reset pulse failed: {}", e);
    }
    m.hard_reset(reason);
}

/// `now` is at or past `due`, across a tick wrap.
#[allow(clippy::cast_possible_wrap)]
fn reached(now: u32, due: u32) -> bool {
    (now.wrapping_sub(due) as i32) >= 0
}
