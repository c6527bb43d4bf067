/// Recognize link state-change events in classified log records.
///
/// The interface-management daemon is chatty.  A single reconnect produces "has link
/// connectivity", "is setting up now", "is enabled", "Network device ... link is up", and more,
/// and most of it is useless for interval reconstruction because it fires for half-configured
/// states too.  Only the authoritative transition messages produce events:
///
///   Interface 'wan' is now up
///   Interface 'wan' is now down
///
/// The message is matched in full, not substring-searched: a configured "wan" must never match a
/// "wan6" message.  The interface name carried on the event is the canonical text from the
/// message itself.
use crate::{LogRecord, Timestamp};

use anyhow::{bail, Result};
use regex::Regex;
use ustr::Ustr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEventKind {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEvent {
    pub timestamp: Timestamp,
    pub interface: Ustr,
    pub kind: LinkEventKind,
}

pub struct EventMatcher {
    process: Ustr,
    message_re: Regex,
}

impl EventMatcher {
    /// Create a matcher for transition messages from `process` about any of `interfaces`.

    pub fn new(process: &str, interfaces: &[String]) -> Result<EventMatcher> {
        if interfaces.is_empty() {
            bail!("At least one interface name is required");
        }
        let names = interfaces
            .iter()
            .map(|i| regex::escape(i))
            .collect::<Vec<String>>()
            .join("|");
        let message_re = Regex::new(&format!(r"^Interface '({names})' is now (up|down)$"))?;
        Ok(EventMatcher {
            process: Ustr::from(process),
            message_re,
        })
    }

    /// True iff the record comes from the interface-management process at the severity the
    /// transition messages are logged at.

    pub fn is_relevant(&self, r: &LogRecord) -> bool {
        r.severity.as_str() == "notice" && r.process == self.process
    }

    /// Extract a link event from the record, or None for the (vast) majority of records that
    /// carry no authoritative transition.

    pub fn extract(&self, r: &LogRecord) -> Option<LinkEvent> {
        if !self.is_relevant(r) {
            return None;
        }
        let m = self.message_re.captures(&r.message)?;
        let kind = if &m[2] == "up" {
            LinkEventKind::Up
        } else {
            LinkEventKind::Down
        };
        Some(LinkEvent {
            timestamp: r.timestamp,
            interface: Ustr::from(&m[1]),
            kind,
        })
    }
}

#[cfg(test)]
use crate::dates::timestamp_from_ymdhms;

#[cfg(test)]
fn record(severity: &str, process: &str, message: &str) -> LogRecord {
    LogRecord {
        timestamp: timestamp_from_ymdhms(2017, 5, 29, 0, 9, 43),
        severity: Ustr::from(severity),
        process: Ustr::from(process),
        pid: 0,
        message: message.to_string(),
        file: Ustr::from("messages"),
        line_number: 1,
    }
}

#[test]
fn test_extract_transitions() {
    let m = EventMatcher::new("netifd", &["wan".to_string()]).unwrap();
    let up = m
        .extract(&record("notice", "netifd", "Interface 'wan' is now up"))
        .unwrap();
    assert_eq!(up.kind, LinkEventKind::Up);
    assert_eq!(up.interface.as_str(), "wan");
    let down = m
        .extract(&record("notice", "netifd", "Interface 'wan' is now down"))
        .unwrap();
    assert_eq!(down.kind, LinkEventKind::Down);
}

#[test]
fn test_extract_ignores_chatter() {
    let m = EventMatcher::new("netifd", &["wan".to_string()]).unwrap();
    for msg in [
        "Interface 'wan' has link connectivity",
        "Interface 'wan' is setting up now",
        "Interface 'wan' is enabled",
        "Interface 'wan' is disabled",
        "Interface 'wan' has link connectivity loss",
        "Network device 'pppoe-wan' link is up",
        "Network alias 'pppoe-wan' link is up",
    ] {
        assert!(m.extract(&record("notice", "netifd", msg)).is_none());
    }
}

#[test]
fn test_extract_filters_severity_and_process() {
    let m = EventMatcher::new("netifd", &["wan".to_string()]).unwrap();
    assert!(m
        .extract(&record("warn", "netifd", "Interface 'wan' is now up"))
        .is_none());
    assert!(m
        .extract(&record("notice", "firewall", "Interface 'wan' is now up"))
        .is_none());
}

#[test]
fn test_extract_does_not_alias_interface_names() {
    // "wan" must not pick up wan6 transitions, and vice versa.
    let m = EventMatcher::new("netifd", &["wan".to_string()]).unwrap();
    assert!(m
        .extract(&record("notice", "netifd", "Interface 'wan6' is now up"))
        .is_none());

    let m = EventMatcher::new("netifd", &["wan".to_string(), "wan6".to_string()]).unwrap();
    let e = m
        .extract(&record("notice", "netifd", "Interface 'wan6' is now down"))
        .unwrap();
    assert_eq!(e.interface.as_str(), "wan6");
}
