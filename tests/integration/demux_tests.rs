//! Unsolicited frames: inbound commands, foreign topics, malformed
//! frames and the timestamp query.

use osm_comms::dialect::{ESP_POE, ESP_WIFI};
use osm_comms::fsm::State;

use crate::mock_modem::{lora_idle, wifi_config, wifi_idle, Rig};

const CMD_RECV: &str = "+MQTTSUBRECV:0,\"osm/0000ABCD/cmd\",5,hello";

#[test]
fn command_is_processed_and_answered() {
    let mut rig = wifi_idle();
    rig.app.reply_code = 0x00;
    assert!(rig.line(CMD_RECV));
    assert_eq!(rig.app.commands, vec![b"hello".to_vec()]);
    assert_eq!(
        rig.last_command().as_deref(),
        Some("AT+MQTTPUBRAW=0,\"osm/0000ABCD/cmd/resp\",17,0,0")
    );
    assert_eq!(rig.svc.state(), State::WaitPub);

    rig.line("OK");
    assert_eq!(rig.modem.last_write(), Some(&b"{\"ret_code\":0x00}"[..]));
    rig.line("+MQTTPUB:OK");
    assert_eq!(rig.app.acks, vec![true]);
    assert_eq!(rig.svc.state(), State::Idle);
}

#[test]
fn reply_code_is_two_digit_hex() {
    let mut rig = wifi_idle();
    rig.app.reply_code = 0x2A;
    assert!(rig.line(CMD_RECV));
    rig.line("OK");
    assert_eq!(rig.modem.last_write(), Some(&b"{\"ret_code\":0x2A}"[..]));
}

#[test]
fn command_while_busy_is_processed_but_reply_dropped() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", b"hi"));
    rig.modem.clear();
    assert!(rig.line(CMD_RECV));
    assert_eq!(rig.app.commands.len(), 1);
    assert!(rig.modem.writes.is_empty());
    assert_eq!(rig.svc.state(), State::WaitPub);
}

#[test]
fn payload_with_commas_is_length_delimited() {
    let mut rig = wifi_idle();
    assert!(rig.line("+MQTTSUBRECV:0,\"osm/0000ABCD/cmd\",5,a,b,cdef"));
    assert_eq!(rig.app.commands, vec![b"a,b,c".to_vec()]);
}

#[test]
fn foreign_and_sibling_topics_are_consumed_silently() {
    let mut rig = wifi_idle();
    assert!(rig.line("+MQTTSUBRECV:0,\"osm/FFFF0000/cmd\",2,hi"));
    assert!(rig.line("+MQTTSUBRECV:0,\"osm/0000ABCD/measurements\",2,hi"));
    assert!(rig.line("+MQTTSUBRECV:0,\"osm/0000ABCDcmd\",2,hi"));
    assert!(rig.app.commands.is_empty());
    assert!(rig.modem.writes.is_empty());
    assert_eq!(rig.svc.state(), State::Idle);
}

#[test]
fn malformed_frames_are_dropped() {
    let mut rig = wifi_idle();
    // declared length longer than the line
    assert!(!rig.line("+MQTTSUBRECV:0,\"osm/0000ABCD/cmd\",9,hi"));
    // unterminated topic
    assert!(!rig.line("+MQTTSUBRECV:0,\"osm/0000ABCD/cmd,2,hi"));
    assert!(!rig.line("+MQTTCONN:x"));
    assert!(!rig.line("+CWSTATE:?"));
    assert!(!rig.line("+SYSTIMESTAMP:soon"));
    assert!(rig.app.commands.is_empty());
    assert_eq!(rig.svc.state(), State::Idle);
}

#[test]
fn solicited_lines_are_not_unsolicited() {
    let mut rig = wifi_idle();
    assert!(!rig.line("OK"));
    assert!(!rig.line("+MQTTPUB:OK"));
    assert!(!rig.line("busy p..."));
    assert_eq!(rig.svc.state(), State::Idle);
}

#[test]
fn status_pushes_update_belief() {
    let mut rig = wifi_idle();
    assert!(rig.line("+MQTTCONN:0,1,0,\"\",\"\",\"\",0"));
    assert_eq!(rig.svc.session().belief().mqtt_connected, Some(false));
    assert!(rig.line("+MQTTCONN:0,6,1,\"broker.example\",\"443\",\"\",1"));
    assert_eq!(rig.svc.session().belief().mqtt_connected, Some(true));
    assert!(rig.line("+CWSTATE:2,\"lab\""));
    assert_eq!(rig.svc.session().belief().associated, Some(true));
    // Status alone never moves the sequencer.
    assert_eq!(rig.svc.state(), State::Idle);
}

#[test]
fn subscription_listing_only_counts_our_topic() {
    let mut rig = Rig::new(&ESP_POE, wifi_config());
    assert!(rig.line("+MQTTSUB:0,6,\"osm/FFFF0000/cmd\",0"));
    assert!(!rig.svc.session().belief().subscribed);
    assert!(rig.line("+MQTTSUB:0,6,\"osm/0000ABCD/cmd\",0"));
    assert!(rig.svc.session().belief().subscribed);
}

// ── LoRaWAN downlinks ─────────────────────────────────────────

/// Version 1 command frame carrying `ping`.
const DOWNLINK: &str = "+EVT:RX_C:-38:5:UNICAST:1:01434D440070696E67";

fn reply_send(port: u8, code: u8) -> String {
    let json = format!("{{\"ret_code\":0x{:02X}}}", code);
    let hex: String = json.bytes().map(|b| format!("{:02X}", b)).collect();
    format!("AT+SEND={}:{}", port, hex)
}

#[test]
fn downlink_command_is_answered_from_idle() {
    let mut rig = lora_idle();
    rig.app.reply_code = 0x2A;
    assert!(rig.line(DOWNLINK));
    assert_eq!(rig.app.commands, vec![b"ping".to_vec()]);
    assert!(rig.modem.writes.is_empty());

    rig.tick();
    assert_eq!(rig.last_command(), Some(reply_send(1, 0x2A)));
    assert_eq!(rig.svc.state(), State::WaitPub);
    rig.lines(&["OK", "+EVT:SEND_CONFIRMED_OK"]);
    assert_eq!(rig.app.acks, vec![true]);

    // Answered once.
    rig.modem.clear();
    rig.tick();
    assert!(rig.modem.writes.is_empty());
}

#[test]
fn downlink_reply_waits_for_the_uplink_in_flight() {
    let mut rig = lora_idle();
    assert!(rig.send("measurements", &[0x01]));
    assert!(rig.line(DOWNLINK));
    rig.modem.clear();
    rig.tick();
    assert!(rig.modem.writes.is_empty());

    rig.lines(&["OK", "+EVT:SEND_CONFIRMED_OK"]);
    rig.tick();
    assert_eq!(rig.last_command(), Some(reply_send(2, 0x00)));
}

#[test]
fn downlink_reply_is_dropped_by_a_reset() {
    let mut rig = lora_idle();
    assert!(rig.line(DOWNLINK));
    rig.line("AT_ERROR");
    assert!(rig.svc.session().pending_reply().is_none());
}

#[test]
fn other_downlinks_are_consumed_without_a_command() {
    let mut rig = lora_idle();
    // version 2
    assert!(rig.line("+EVT:RX_C:-38:5:UNICAST:1:02434D440070696E67"));
    // not a command frame
    assert!(rig.line("+EVT:RX_C:-38:5:UNICAST:1:01434647007879"));
    assert!(rig.app.commands.is_empty());
    rig.tick();
    assert!(rig.modem.writes.is_empty());
}

#[test]
fn malformed_downlinks_are_dropped() {
    let mut rig = lora_idle();
    assert!(!rig.line("+EVT:RX_C:-38:5:UNICAST:1:0"));
    assert!(!rig.line("+EVT:RX_C:-38:5:UNICAST:1:ZZ"));
    assert!(!rig.line("+EVT:RX_C:-38:5:MULTICAST:1:01"));
    assert!(!rig.line("+EVT:RX_C:loud:5:UNICAST:1:01"));
    assert!(rig.app.commands.is_empty());
    assert_eq!(rig.svc.state(), State::Idle);
}

// ── Timestamp ─────────────────────────────────────────────────

#[test]
fn unix_time_comes_from_the_modem() {
    let mut rig = wifi_idle();
    rig.modem.read_step_ms = 5;
    rig.modem.queue("+SYSTIMESTAMP:1700000000");
    rig.modem.queue("OK");
    let t = rig.svc.get_unix_time(&mut rig.modem, &mut rig.app, 4);
    assert_eq!(t, Some(1_700_000_000));
    assert_eq!(rig.modem.sent_commands(), vec!["AT+SYSTIMESTAMP?"]);
    assert_eq!(rig.svc.state(), State::Idle);
}

#[test]
fn stale_unix_time_is_discarded() {
    let mut rig = wifi_idle();
    rig.modem.read_step_ms = 60;
    rig.modem.queue("+SYSTIMESTAMP:1700000000");
    rig.modem.queue("OK");
    let t = rig.svc.get_unix_time(&mut rig.modem, &mut rig.app, 4);
    assert_eq!(t, None);
    assert_eq!(rig.svc.state(), State::Idle);
}

#[test]
fn unix_time_needs_idle_and_a_query() {
    let mut rig = Rig::new(&ESP_WIFI, wifi_config());
    assert_eq!(rig.svc.get_unix_time(&mut rig.modem, &mut rig.app, 4), None);
    assert!(rig.modem.writes.is_empty());

    let mut rig = lora_idle();
    assert_eq!(rig.svc.get_unix_time(&mut rig.modem, &mut rig.app, 4), None);
    assert!(rig.modem.writes.is_empty());
}

#[test]
fn unix_time_without_reply_gives_none() {
    let mut rig = wifi_idle();
    let t = rig.svc.get_unix_time(&mut rig.modem, &mut rig.app, 3);
    assert_eq!(t, None);
    assert_eq!(rig.svc.state(), State::WaitTimestamp);
}

#[test]
fn old_timestamp_push_is_not_reused() {
    let mut rig = wifi_idle();
    assert!(rig.line("+SYSTIMESTAMP:1600000000"));
    rig.modem.queue("OK");
    let t = rig.svc.get_unix_time(&mut rig.modem, &mut rig.app, 2);
    assert_eq!(t, None);
}
