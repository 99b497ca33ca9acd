//! Timeouts, probes, retries and full resets.

use osm_comms::dialect::{ESP_POE, ESP_WIFI, RAK3172};
use osm_comms::fsm::State;

use crate::mock_modem::{lora_config, wifi_config, wifi_idle, Rig};

const ANNOUNCE: &str = "AT+MQTTPUBRAW=0,\"osm/0000ABCD/measurements\",2,0,0";

#[test]
fn publish_timeout_probes_then_retries() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", b"hi"));
    rig.wait(30_000);
    assert_eq!(rig.svc.state(), State::WaitPub);

    rig.wait(1);
    assert_eq!(rig.state_name(), "TIMED_OUT_PROBE_LINK");
    assert_eq!(rig.last_command().as_deref(), Some("AT+CWSTATE?"));
    assert!(rig.app.acks.is_empty());

    rig.lines(&["+CWSTATE:2,\"lab\"", "OK"]);
    assert_eq!(rig.state_name(), "TIMED_OUT_PROBE_MQTT");
    assert_eq!(rig.last_command().as_deref(), Some("AT+MQTTCONN?"));

    rig.lines(&["+MQTTCONN:0,4,1,\"broker.example\",\"443\",\"\",1", "OK"]);
    assert_eq!(rig.svc.state(), State::WaitPub);
    assert_eq!(rig.last_command().as_deref(), Some(ANNOUNCE));

    rig.lines(&["OK", "+MQTTPUB:OK"]);
    assert_eq!(rig.app.acks, vec![true]);
    assert_eq!(rig.svc.state(), State::Idle);
}

#[test]
fn publishing_timeout_resumes_at_announce() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", b"hi"));
    rig.line("OK");
    assert_eq!(rig.svc.state(), State::Publishing);
    rig.wait(30_001);
    let snap = rig.svc.session().snapshot().cloned().unwrap();
    assert_eq!(snap.state, State::WaitPub);
    assert_eq!(snap.command.as_str(), ANNOUNCE);

    rig.lines(&["+CWSTATE:2,\"lab\"", "OK"]);
    rig.lines(&["+MQTTCONN:0,6,1,\"broker.example\",\"443\",\"\",1", "OK"]);
    assert_eq!(rig.svc.state(), State::WaitPub);
    rig.line("OK");
    assert_eq!(rig.modem.last_write(), Some(&b"hi"[..]));
}

#[test]
fn link_down_after_timeout_resets_with_one_nack() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", b"hi"));
    rig.wait(30_001);
    rig.lines(&["+CWSTATE:0,\"\"", "OK"]);
    assert_eq!(rig.svc.state(), State::Off);
    assert_eq!(rig.app.acks, vec![false]);
    assert_eq!(rig.last_command().as_deref(), Some("AT+RESTORE"));
}

#[test]
fn broker_down_after_timeout_resets() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", b"hi"));
    rig.wait(30_001);
    rig.lines(&["+CWSTATE:2,\"lab\"", "OK"]);
    rig.lines(&["+MQTTCONN:0,1,0,\"\",\"\",\"\",0", "OK"]);
    assert_eq!(rig.svc.state(), State::Off);
    assert_eq!(rig.app.acks, vec![false]);
}

#[test]
fn probe_push_alone_decides_nothing() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", b"hi"));
    rig.wait(30_001);
    rig.line("+CWSTATE:2,\"lab\"");
    assert_eq!(rig.state_name(), "TIMED_OUT_PROBE_LINK");
}

#[test]
fn silent_modem_after_timeout_gets_a_reset_pulse() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", b"hi"));
    rig.wait(30_001);
    assert_eq!(rig.state_name(), "TIMED_OUT_PROBE_LINK");
    rig.modem.clear();
    rig.wait(30_000);
    assert_eq!(rig.pins.pulses, 0);
    rig.wait(1);
    assert_eq!(rig.pins.pulses, 1);
    assert_eq!(rig.svc.state(), State::Off);
    assert_eq!(rig.app.acks, vec![false]);
    assert!(rig.modem.writes.is_empty());
}

#[test]
fn poe_probes_broker_directly() {
    let mut rig = Rig::new(&ESP_POE, wifi_config());
    rig.start();
    rig.lines(&["+ETH_GOT_IP:\"10.0.0.7\"", "OK", "+TIME_UPDATED"]);
    rig.lines(&["+MQTTCONN:0,0,0,\"\",\"\",\"\",0", "OK"]);
    assert_eq!(rig.state_name(), "MQTT_USER_CFG");
    rig.wait(30_001);
    assert_eq!(rig.state_name(), "TIMED_OUT_PROBE_MQTT");
    assert_eq!(rig.last_command().as_deref(), Some("AT+MQTTCONN?"));

    rig.lines(&["+MQTTCONN:0,4,1,\"broker.example\",\"443\",\"\",1", "OK"]);
    assert_eq!(rig.state_name(), "MQTT_USER_CFG");
    assert!(rig.last_command().unwrap().starts_with("AT+MQTTUSERCFG="));
}

#[test]
fn default_budget_timeout_pulses_reset() {
    let mut rig = Rig::new(&ESP_WIFI, wifi_config());
    rig.start();
    rig.line("ready");
    assert_eq!(rig.state_name(), "ECHO_OFF");
    rig.wait(30_000);
    assert_eq!(rig.state_name(), "ECHO_OFF");
    rig.wait(1);
    assert_eq!(rig.svc.state(), State::Off);
    assert_eq!(rig.pins.pulses, 1);
    assert_eq!(rig.last_command().as_deref(), Some("ATE0"));

    rig.line("ready");
    assert_eq!(rig.state_name(), "ECHO_OFF");
}

#[test]
fn poe_default_budget_is_short() {
    let mut rig = Rig::new(&ESP_POE, wifi_config());
    rig.start();
    rig.lines(&["+ETH_GOT_IP:\"10.0.0.7\"", "OK", "+TIME_UPDATED"]);
    assert_eq!(rig.state_name(), "PROBE_IS_CONNECTED");
    rig.wait(501);
    assert_eq!(rig.svc.state(), State::Off);
    assert_eq!(rig.pins.pulses, 1);
}

/// Wi-Fi rig that has just sent the subscribe.
fn wifi_subscribing() -> Rig {
    let mut rig = Rig::new(&ESP_WIFI, wifi_config());
    rig.start();
    rig.lines(&["ready", "OK", "OK", "OK", "OK", "OK"]);
    rig.lines(&["+CWSTATE:2,\"lab\"", "OK", "+TIME_UPDATED", "OK", "OK", "OK"]);
    assert_eq!(rig.state_name(), "MQTT_SUB");
    rig
}

#[test]
fn mqtt_sub_timeout_retries_subscribe() {
    let mut rig = wifi_subscribing();
    rig.wait(30_001);
    assert_eq!(rig.state_name(), "TIMED_OUT_PROBE_LINK");
    rig.lines(&["+CWSTATE:2,\"lab\"", "OK"]);
    rig.lines(&["+MQTTCONN:0,4,1,\"broker.example\",\"443\",\"\",1", "OK"]);
    assert_eq!(rig.state_name(), "MQTT_SUB");
    assert_eq!(
        rig.last_command().as_deref(),
        Some("AT+MQTTSUB=0,\"osm/0000ABCD/cmd\",0")
    );
    rig.line("OK");
    assert_eq!(rig.svc.state(), State::Idle);
}

#[test]
fn mqtt_sub_timeout_not_connected_resets() {
    let mut rig = wifi_subscribing();
    rig.wait(30_001);
    rig.lines(&["+CWSTATE:2,\"lab\"", "OK"]);
    rig.lines(&["+MQTTCONN:0,1,0,\"\",\"\",\"\",0", "OK"]);
    assert_eq!(rig.svc.state(), State::Off);
    assert_eq!(rig.last_command().as_deref(), Some("AT+RESTORE"));
    assert_eq!(rig.pins.pulses, 0);
}

#[test]
fn idle_never_times_out() {
    let mut rig = wifi_idle();
    rig.wait(3_600_000);
    assert_eq!(rig.svc.state(), State::Idle);
    assert!(rig.modem.writes.is_empty());
}

#[test]
fn error_anywhere_else_resets() {
    let mut rig = Rig::new(&ESP_WIFI, wifi_config());
    rig.start();
    rig.lines(&["ready", "OK", "OK"]);
    assert_eq!(rig.state_name(), "REGION_CONFIG");
    rig.line("ERROR");
    assert_eq!(rig.svc.state(), State::Off);
    assert_eq!(rig.modem.sent_commands().last().map(String::as_str), Some("AT+RESTORE"));
}

#[test]
fn modem_reboot_mid_publish_restarts_bring_up() {
    let mut rig = wifi_idle();
    assert!(rig.send("measurements", b"hi"));
    rig.line("ready");
    assert_eq!(rig.app.acks, vec![false]);
    assert_eq!(rig.state_name(), "ECHO_OFF");
    assert_eq!(rig.last_command().as_deref(), Some("ATE0"));
}

/// Leave `Off` on the banner, then fail the first region command.
fn fail_once(rig: &mut Rig) {
    rig.line("INITIALIZATION OK");
    assert_eq!(rig.state_name(), "REGION_CONFIG");
    rig.modem.clear();
    rig.line("AT_ERROR");
    assert_eq!(rig.svc.state(), State::Off);
}

#[test]
fn reset_backoff_grows_after_repeated_failures() {
    let mut rig = Rig::new(&RAK3172, lora_config());
    rig.start();

    for _ in 0..5 {
        fail_once(&mut rig);
        rig.wait(10);
        assert_eq!(rig.modem.sent_commands(), vec!["ATZ"]);
    }

    fail_once(&mut rig);
    rig.wait(10);
    assert!(rig.modem.writes.is_empty());
    rig.wait(15 * 60 * 1000 - 10);
    assert_eq!(rig.modem.sent_commands(), vec!["ATZ"]);
}

#[test]
fn reaching_idle_clears_the_backoff() {
    let mut rig = Rig::new(&RAK3172, lora_config());
    rig.start();
    for _ in 0..6 {
        fail_once(&mut rig);
    }
    rig.line("INITIALIZATION OK");
    for _ in 0..9 {
        rig.line("OK");
    }
    rig.line("+EVT:JOINED");
    assert_eq!(rig.svc.state(), State::Idle);

    rig.modem.clear();
    rig.line("AT_ERROR");
    rig.wait(10);
    assert_eq!(rig.modem.sent_commands(), vec!["ATZ"]);
}
