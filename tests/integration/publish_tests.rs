//! Publish / ack pipeline for raw (ESP-AT) and inline-hex (RAK3172)
//! styles.

use osm_comms::fsm::State;

use crate::mock_modem::{lora_idle, wifi_idle};

const PAYLOAD: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

#[test]
fn raw_publish_writes_payload_after_ok() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", &PAYLOAD));
    assert_eq!(rig.svc.state(), State::WaitPub);
    assert_eq!(
        rig.modem.sent_commands(),
        vec!["AT+MQTTPUBRAW=0,\"osm/0000ABCD/measurements\",4,0,0"]
    );

    rig.line("OK");
    assert_eq!(rig.svc.state(), State::Publishing);
    assert_eq!(rig.modem.last_write(), Some(&PAYLOAD[..]));
    assert_eq!(rig.modem.writes.len(), 2);

    rig.line(">+MQTTPUB:OK");
    assert_eq!(rig.svc.state(), State::Idle);
    assert_eq!(rig.app.acks, vec![true]);
}

#[test]
fn marker_without_prompt_also_completes() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", b"{\"t\":21}"));
    rig.lines(&["OK", "+MQTTPUB:OK"]);
    assert_eq!(rig.app.acks, vec![true]);
    assert!(rig.svc.send_ready());
}

#[test]
fn send_is_rejected_while_busy() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", &PAYLOAD));
    let writes = rig.modem.writes.len();
    assert!(!rig.send("measurements", &PAYLOAD));
    assert_eq!(rig.modem.writes.len(), writes);
    assert_eq!(rig.svc.state(), State::WaitPub);
}

#[test]
fn oversized_payload_is_rejected_untouched() {
    let mut rig = wifi_idle();
    assert_eq!(rig.svc.mtu(), 1152);
    let big = vec![0u8; 1153];
    assert!(!rig.send("measurements", &big));
    assert!(rig.modem.writes.is_empty());
    assert_eq!(rig.svc.state(), State::Idle);
    assert!(rig.app.acks.is_empty());

    let max = vec![0x55u8; 1152];
    assert!(rig.send("measurements", &max));
}

#[test]
fn error_while_publishing_nacks_and_resets() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", &PAYLOAD));
    rig.lines(&["OK", "ERROR"]);
    assert_eq!(rig.app.acks, vec![false]);
    assert_eq!(rig.svc.state(), State::Off);
    assert_eq!(rig.last_command().as_deref(), Some("AT+RESTORE"));
}

#[test]
fn error_on_announce_nacks_once() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", &PAYLOAD));
    rig.line("ERROR");
    rig.line("ERROR");
    assert_eq!(rig.app.acks, vec![false]);
}

#[test]
fn lora_publish_is_inline_hex() {
    let mut rig = lora_idle();
    assert!(rig.send("measurements", &PAYLOAD));
    assert_eq!(rig.modem.sent_commands(), vec!["AT+SEND=1:DEADBEEF"]);

    rig.line("OK");
    assert_eq!(rig.svc.state(), State::Publishing);
    assert_eq!(rig.modem.writes.len(), 1);

    rig.line("+EVT:SEND_CONFIRMED_OK");
    assert_eq!(rig.svc.state(), State::Idle);
    assert_eq!(rig.app.acks, vec![true]);

    assert!(rig.send("measurements", &[0x01]));
    assert_eq!(rig.last_command().as_deref(), Some("AT+SEND=2:01"));
}

#[test]
fn unconfirmed_uplink_nacks_and_resets() {
    let mut rig = lora_idle();
    assert!(rig.send("measurements", &PAYLOAD));
    rig.lines(&["OK", "+EVT:SEND_CONFIRMED_FAILED"]);
    assert_eq!(rig.app.acks, vec![false]);
    assert_eq!(rig.svc.state(), State::Off);

    // Reset backoff, then the restart command.
    rig.wait(10);
    assert_eq!(rig.last_command().as_deref(), Some("ATZ"));
}

#[test]
fn confirmation_outside_a_publish_is_ignored() {
    let mut rig = lora_idle();
    assert!(!rig.line("+EVT:SEND_CONFIRMED_FAILED"));
    assert!(!rig.line("+EVT:SEND_CONFIRMED_OK"));
    assert_eq!(rig.svc.state(), State::Idle);
    assert!(rig.app.acks.is_empty());
}

#[test]
fn lora_mtu_is_enforced() {
    let mut rig = lora_idle();
    assert_eq!(rig.svc.mtu(), 242);
    assert!(!rig.send("measurements", &[0u8; 243]));
    assert!(rig.send("measurements", &[0u8; 242]));
}

#[test]
fn lora_uplink_port_wraps_to_one() {
    let mut rig = lora_idle();
    for _ in 0..223 {
        assert!(rig.send("measurements", &[0xAA]));
        rig.lines(&["OK", "+EVT:SEND_CONFIRMED_OK"]);
    }
    assert_eq!(rig.last_command().as_deref(), Some("AT+SEND=223:AA"));
    assert!(rig.send("measurements", &[0xAA]));
    assert_eq!(rig.last_command().as_deref(), Some("AT+SEND=1:AA"));
    assert_eq!(rig.app.acks.len(), 223);
}

#[test]
fn rejected_send_does_not_consume_a_port() {
    let mut rig = lora_idle();
    assert!(!rig.send("measurements", &[0u8; 300]));
    assert!(rig.send("measurements", &[0x01]));
    assert_eq!(rig.last_command().as_deref(), Some("AT+SEND=1:01"));
}
