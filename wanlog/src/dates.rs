/// Types and utilities for manipulating log timestamps.
///
/// Two timestamp encodings appear in the message logs, an artifact of the logging daemon having
/// changed its format at some point:
///
///  - Format A, "YYYY-MM-DD HH:MM:SS", the host's local wall-clock time with no offset
///  - Format B, "YYYY-MM-DDTHH:MM:SS+HH:MM" (or "-HH:MM"), with a trailing UTC offset
///
/// Old and current rotated files can carry different encodings, so both must be supported at the
/// same time.  Both are folded into a single naive instant at parse time so that nothing
/// downstream ever branches on the encoding again.  The folded instant is "log-relative", not
/// UTC: what matters is that all parsed instants, and `now()`, are mutually comparable on the
/// host that wrote the logs.
use anyhow::{bail, Result};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

pub type Timestamp = NaiveDateTime;

/// The time right now, in the same log-relative representation the parser produces.

pub fn now() -> Timestamp {
    Local::now().naive_local()
}

/// Given year, month, day, hour, minute, second, return a Timestamp.  The arguments must be a
/// valid calendar date and time of day.

pub fn timestamp_from_ymdhms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Timestamp {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

/// Parse a timestamp in either log encoding into a single comparable Timestamp, or fail.
///
/// A Format B offset of "+HH:MM" marks an instant that is HH:MM ahead of the reference time, so
/// the offset is subtracted to fold the instant back; "-HH:MM" is added.  Offsets must have hours
/// in 0..=23 and minutes in 0..=59.

pub fn parse_log_timestamp(s: &str) -> Result<Timestamp> {
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(t);
    }

    // Format B.  The offset is located by looking at the fixed-width tail of the string; the
    // HH:MM:SS fields earlier on make a left-to-right search for "[+-]HH:MM" ambiguous.
    if s.is_ascii() && s.len() > 6 {
        let (stamp, offset) = s.split_at(s.len() - 6);
        let ob = offset.as_bytes();
        if (ob[0] == b'+' || ob[0] == b'-') && ob[3] == b':' {
            let naive = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S")?;
            let hours = offset[1..3].parse::<i64>()?;
            let minutes = offset[4..6].parse::<i64>()?;
            if hours > 23 || minutes > 59 {
                bail!("Impossible UTC offset in timestamp {s}");
            }
            let delta = Duration::seconds((hours * 60 + minutes) * 60);
            return Ok(if ob[0] == b'+' {
                naive - delta
            } else {
                naive + delta
            });
        }
    }

    bail!("Unrecognized timestamp {s}")
}

#[test]
fn test_parse_format_a() {
    assert_eq!(
        parse_log_timestamp("2024-01-01 00:00:00").unwrap(),
        timestamp_from_ymdhms(2024, 1, 1, 0, 0, 0)
    );
    assert_eq!(
        parse_log_timestamp("2017-05-29 05:32:29").unwrap(),
        timestamp_from_ymdhms(2017, 5, 29, 5, 32, 29)
    );
}

#[test]
fn test_parse_format_b() {
    // "+10:00" is ten hours ahead of the reference time, so the parse folds it back.
    assert_eq!(
        parse_log_timestamp("2017-05-29T00:09:32+10:00").unwrap(),
        timestamp_from_ymdhms(2017, 5, 28, 14, 9, 32)
    );
    // "-03:30" is behind, so the parse adds.
    assert_eq!(
        parse_log_timestamp("2017-05-29T00:09:32-03:30").unwrap(),
        timestamp_from_ymdhms(2017, 5, 29, 3, 39, 32)
    );
    assert_eq!(
        parse_log_timestamp("2017-05-29T00:09:32+00:00").unwrap(),
        timestamp_from_ymdhms(2017, 5, 29, 0, 9, 32)
    );
}

#[test]
fn test_parse_failures() {
    assert!(parse_log_timestamp("").is_err());
    assert!(parse_log_timestamp("yesterday").is_err());
    // Format B requires the offset.
    assert!(parse_log_timestamp("2017-05-29T00:09:32").is_err());
    // Offset fields out of range.
    assert!(parse_log_timestamp("2017-05-29T00:09:32+24:00").is_err());
    assert!(parse_log_timestamp("2017-05-29T00:09:32+10:60").is_err());
    // Not a calendar date.
    assert!(parse_log_timestamp("2017-13-29 00:09:32").is_err());
}

#[test]
fn test_parse_preserves_ordering() {
    // Textually earlier moments must parse to earlier instants, within and across formats.
    let a1 = parse_log_timestamp("2024-01-01 00:00:00").unwrap();
    let a2 = parse_log_timestamp("2024-01-01 01:30:00").unwrap();
    assert!(a1 < a2);
    let b1 = parse_log_timestamp("2017-05-29T00:09:43+10:00").unwrap();
    let b2 = parse_log_timestamp("2017-05-29T00:09:54+10:00").unwrap();
    assert!(b1 < b2);
    // The same instant written in both encodings compares equal.
    let a = parse_log_timestamp("2017-05-28 14:09:32").unwrap();
    let b = parse_log_timestamp("2017-05-29T00:09:32+10:00").unwrap();
    assert_eq!(a, b);
}
