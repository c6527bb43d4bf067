/// Classifier for raw message-log lines.
///
/// A classifiable line decomposes into five fields: a timestamp, a bare severity word, a process
/// name, a bracketed (possibly empty) pid, and a free-text message running to end of line.  Both
/// historical timestamp encodings are admitted by the same layout:
///
///   2024-01-01 00:00:00 notice netifd[1]: Interface 'wan' is now up
///   2017-05-29T00:09:32+10:00 notice netifd[]: Interface 'wan' is setting up now
///
/// Classification is a pure function over one line: a line that matches no recognized layout is
/// flagged, not raised, and the caller decides whether anyone cares.
use crate::dates::parse_log_timestamp;
use crate::LogRecord;

use anyhow::Result;
use regex::Regex;
use ustr::Ustr;

pub enum Classification {
    /// The line decomposed cleanly.
    Record(LogRecord),

    /// The layout matched but the timestamp failed validation.
    MalformedTimestamp,

    /// The line matched no recognized layout.
    Unrecognized,
}

pub struct Classifier {
    line_re: Regex,
}

impl Classifier {
    pub fn new() -> Result<Classifier> {
        // The time field admits both encodings; dates.rs sorts out which one it got.  The process
        // field is wider than \w because daemons show up as eg "dnsmasq-dhcp" or "hostapd(wlan0)".
        let line_re = Regex::new(
            r"^(?P<time>\d{4}-\d\d-\d\d[T ]\d\d:\d\d:\d\d(?:[+-]\d\d:\d\d)?)\s+(?P<severity>\w+)\s+(?P<process>[\w()./-]+)\[(?P<pid>\d*)\]: (?P<message>.*)$",
        )?;
        Ok(Classifier { line_re })
    }

    /// Decompose one raw line.  `file` and `line_number` only provide provenance for the record.

    pub fn classify(&self, file: Ustr, line_number: usize, line: &str) -> Classification {
        let m = match self.line_re.captures(line) {
            Some(m) => m,
            None => {
                return Classification::Unrecognized;
            }
        };
        let timestamp = match parse_log_timestamp(&m["time"]) {
            Ok(t) => t,
            Err(_) => {
                return Classification::MalformedTimestamp;
            }
        };
        // An empty pid field, "netifd[]", is common and recorded as zero.
        let pid = m["pid"].parse::<u32>().unwrap_or(0);
        Classification::Record(LogRecord {
            timestamp,
            severity: Ustr::from(&m["severity"]),
            process: Ustr::from(&m["process"]),
            pid,
            message: m["message"].to_string(),
            file,
            line_number,
        })
    }
}

#[cfg(test)]
use crate::dates::timestamp_from_ymdhms;

#[cfg(test)]
fn classify_one(line: &str) -> Classification {
    Classifier::new()
        .unwrap()
        .classify(Ustr::from("messages"), 1, line)
}

#[test]
fn test_classify_format_a() {
    let c = classify_one("2024-01-01 00:00:00 notice netifd[1]: Interface 'wan' is now up");
    let Classification::Record(r) = c else {
        panic!("Expected a record");
    };
    assert_eq!(r.timestamp, timestamp_from_ymdhms(2024, 1, 1, 0, 0, 0));
    assert_eq!(r.severity.as_str(), "notice");
    assert_eq!(r.process.as_str(), "netifd");
    assert_eq!(r.pid, 1);
    assert_eq!(r.message, "Interface 'wan' is now up");
    assert_eq!(r.file.as_str(), "messages");
    assert_eq!(r.line_number, 1);
}

#[test]
fn test_classify_format_b_empty_pid() {
    let c = classify_one(
        "2017-05-29T00:09:43+10:00 notice firewall[]: Reloading firewall due to ifup of wan (pppoe-wan)",
    );
    let Classification::Record(r) = c else {
        panic!("Expected a record");
    };
    assert_eq!(r.timestamp, timestamp_from_ymdhms(2017, 5, 28, 14, 9, 43));
    assert_eq!(r.process.as_str(), "firewall");
    assert_eq!(r.pid, 0);
    assert_eq!(r.message, "Reloading firewall due to ifup of wan (pppoe-wan)");
}

#[test]
fn test_classify_wide_process_names() {
    let c = classify_one("2024-01-01 00:00:00 info dnsmasq-dhcp[1234]: DHCPACK(br-lan) 10.0.0.7");
    assert!(matches!(c, Classification::Record(_)));
}

#[test]
fn test_classify_unrecognized() {
    assert!(matches!(classify_one(""), Classification::Unrecognized));
    assert!(matches!(
        classify_one("some free text that is not a log line"),
        Classification::Unrecognized
    ));
    // Kernel lines carry no process[pid] field.
    assert!(matches!(
        classify_one("2024-01-01 00:00:00 kern.info kernel: [12.3] eth0 link up"),
        Classification::Unrecognized
    ));
}

#[test]
fn test_classify_malformed_timestamp() {
    // The layout matches but the offset is impossible.
    assert!(matches!(
        classify_one("2017-05-29T00:09:32+99:00 notice netifd[]: Interface 'wan' is now up"),
        Classification::MalformedTimestamp
    ));
}
