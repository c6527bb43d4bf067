/// Live interface status, by way of `ubus call network.interface.<name> status`.
///
/// The reply is a JSON object; the fields we care about are "up" (bool) and "uptime" (seconds
/// since the interface came up, absent or zero when it is down).  The query is a single blocking
/// call with a timeout and no retry: any failure - ubus missing, the interface unknown, garbage
/// output - degrades to None and the caller reports from the logs alone.
use crate::command;

use serde_json::Value;
use ustr::Ustr;
use wanlog::{now, LiveStatus};

pub fn get_live_status(interface: &str, timeout_seconds: u64) -> Option<LiveStatus> {
    let cmd = format!("ubus call network.interface.{interface} status");
    let output = command::run_with_timeout(&cmd, timeout_seconds).ok()?;
    let uptime_seconds = parse_uptime(&output)?;
    Some(LiveStatus {
        interface: Ustr::from(interface),
        uptime_seconds,
        observed_at: now(),
    })
}

fn parse_uptime(raw: &str) -> Option<f64> {
    let v: Value = serde_json::from_str(raw).ok()?;
    if !v.is_object() {
        return None;
    }
    // A down interface carries no uptime; report it as zero rather than unavailable, so the
    // reconciler can tell "daemon says down" from "daemon unreachable".
    match v.get("up").and_then(Value::as_bool) {
        Some(true) => v.get("uptime").and_then(Value::as_f64),
        Some(false) => Some(0.0),
        None => None,
    }
}

#[test]
fn test_parse_uptime_up() {
    let raw = r#"{ "up": true, "uptime": 3600, "l3_device": "pppoe-wan", "ipv4-address": [] }"#;
    assert_eq!(parse_uptime(raw), Some(3600.0));
}

#[test]
fn test_parse_uptime_down() {
    assert_eq!(parse_uptime(r#"{ "up": false }"#), Some(0.0));
}

#[test]
fn test_parse_uptime_garbage() {
    assert_eq!(parse_uptime(""), None);
    assert_eq!(parse_uptime("Command failed: Not found"), None);
    assert_eq!(parse_uptime(r#"{ "uptime": 3600 }"#), None);
    assert_eq!(parse_uptime(r#"[1, 2, 3]"#), None);
}
