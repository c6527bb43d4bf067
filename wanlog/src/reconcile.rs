/// Merge the log-derived view of an interface with the live daemon-reported uptime.
///
/// The two sources fail independently: logs rot, rotate away, or never capture the boot that
/// brought the link up; the status daemon may be unreachable or report a freshly restarted
/// counter.  The report therefore prefers the live value when both agree, falls back to whichever
/// source exists, and flags disagreement explicitly - it never silently discards either source.
use crate::intervals::Interval;
use crate::Timestamp;

use chrono::Duration;
use ustr::Ustr;

/// One live status observation for an interface, as reported by the status daemon.  Not derived
/// from logs.  An uptime of zero means the daemon considers the link down.

#[derive(Debug, Clone, PartialEq)]
pub struct LiveStatus {
    pub interface: Ustr,
    pub uptime_seconds: f64,
    pub observed_at: Timestamp,
}

/// What the reconstructed interval list says about an interface right now.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvidence {
    /// No intervals were reconstructed at all.
    None,

    /// The final interval is closed: the link looks down since its closing instant.
    Down { last_down: Timestamp },

    /// An open interval: the link looks up since this instant.
    Up { since: Timestamp },
}

/// Reduce an interval list (in fold emission order) to the evidence for one interface.

pub fn log_evidence(intervals: &[Interval], interface: Ustr) -> LogEvidence {
    // The open interval, if any, is emitted last for its interface.
    let mut last = None;
    for iv in intervals {
        if iv.interface == interface {
            last = Some(iv);
        }
    }
    match last {
        None => LogEvidence::None,
        Some(iv) => match iv.down_at {
            None => LogEvidence::Up { since: iv.up_at },
            Some(last_down) => LogEvidence::Down { last_down },
        },
    }
}

/// Where the primary estimate in a Report came from.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Live,
    Log,
    Unknown,
}

/// The reconciled "up since" estimate for one interface.  `uptime_seconds`/`up_since` hold the
/// primary estimate (absent when the link does not appear to be up); `log_since` carries the
/// log-derived instant when the primary source is live, as corroboration or as the other side of
/// a discrepancy; `last_down` is the log-derived closing instant when the logs say down.

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub interface: Ustr,
    pub source: Source,
    pub uptime_seconds: Option<f64>,
    pub up_since: Option<Timestamp>,
    pub log_since: Option<Timestamp>,
    pub last_down: Option<Timestamp>,
    pub discrepancy: bool,
}

/// Merge log evidence with an optional live observation into a Report.
///
/// Agreement means the log-derived uptime and the live uptime differ by at most
/// `tolerance_seconds`.  A live uptime of zero counts as "live says down".

pub fn reconcile(
    interface: Ustr,
    evidence: &LogEvidence,
    live: Option<&LiveStatus>,
    now: Timestamp,
    tolerance_seconds: i64,
) -> Report {
    let live_up = live.filter(|l| l.uptime_seconds > 0.0);
    let live_says_down = live.is_some() && live_up.is_none();

    match (evidence, live_up) {
        (LogEvidence::Up { since }, Some(l)) => {
            let log_uptime = (now - *since).num_seconds();
            let agree = (log_uptime - l.uptime_seconds as i64).abs() <= tolerance_seconds;
            Report {
                interface,
                source: Source::Live,
                uptime_seconds: Some(l.uptime_seconds),
                up_since: Some(now - Duration::seconds(l.uptime_seconds as i64)),
                log_since: Some(*since),
                last_down: None,
                discrepancy: !agree,
            }
        }
        (LogEvidence::Up { since }, None) => Report {
            interface,
            source: Source::Log,
            uptime_seconds: Some((now - *since).num_seconds() as f64),
            up_since: Some(*since),
            log_since: Some(*since),
            last_down: None,
            // The logs say up; if the daemon answered and said down, that is a conflict.
            discrepancy: live_says_down,
        },
        (LogEvidence::Down { last_down }, Some(l)) => Report {
            interface,
            source: Source::Live,
            uptime_seconds: Some(l.uptime_seconds),
            up_since: Some(now - Duration::seconds(l.uptime_seconds as i64)),
            log_since: None,
            last_down: Some(*last_down),
            // The logs say the link went down and stayed down; the daemon disagrees.
            discrepancy: true,
        },
        (LogEvidence::None, Some(l)) => Report {
            interface,
            source: Source::Live,
            uptime_seconds: Some(l.uptime_seconds),
            up_since: Some(now - Duration::seconds(l.uptime_seconds as i64)),
            log_since: None,
            last_down: None,
            discrepancy: false,
        },
        (LogEvidence::Down { last_down }, None) => Report {
            interface,
            // A live "down" answer confirms the logs; silence leaves the logs on their own.
            source: if live_says_down { Source::Live } else { Source::Log },
            uptime_seconds: None,
            up_since: None,
            log_since: None,
            last_down: Some(*last_down),
            discrepancy: false,
        },
        (LogEvidence::None, None) => Report {
            interface,
            source: Source::Unknown,
            uptime_seconds: None,
            up_since: None,
            log_since: None,
            last_down: None,
            discrepancy: false,
        },
    }
}

#[cfg(test)]
use crate::dates::timestamp_from_ymdhms;

#[cfg(test)]
fn wan() -> Ustr {
    Ustr::from("wan")
}

#[cfg(test)]
fn live(uptime_seconds: f64, observed_at: Timestamp) -> LiveStatus {
    LiveStatus {
        interface: wan(),
        uptime_seconds,
        observed_at,
    }
}

#[test]
fn test_reconcile_agreement_prefers_live() {
    let now = timestamp_from_ymdhms(2024, 1, 1, 12, 0, 0);
    let since = now - Duration::seconds(3600);
    let l = live(3600.0, now);
    let r = reconcile(wan(), &LogEvidence::Up { since }, Some(&l), now, 5);
    assert_eq!(r.source, Source::Live);
    assert!(!r.discrepancy);
    assert_eq!(r.uptime_seconds, Some(3600.0));
    assert_eq!(r.up_since, Some(since));
    assert_eq!(r.log_since, Some(since));
}

#[test]
fn test_reconcile_disagreement_is_flagged() {
    let now = timestamp_from_ymdhms(2024, 1, 1, 12, 0, 0);
    let since = now - Duration::seconds(3600);
    let l = live(7200.0, now);
    let r = reconcile(wan(), &LogEvidence::Up { since }, Some(&l), now, 5);
    assert!(r.discrepancy);
    // Both sides are surfaced.
    assert_eq!(r.uptime_seconds, Some(7200.0));
    assert_eq!(r.log_since, Some(since));
}

#[test]
fn test_reconcile_tolerance_boundary() {
    let now = timestamp_from_ymdhms(2024, 1, 1, 12, 0, 0);
    let since = now - Duration::seconds(3600);
    let r = reconcile(wan(), &LogEvidence::Up { since }, Some(&live(3605.0, now)), now, 5);
    assert!(!r.discrepancy);
    let r = reconcile(wan(), &LogEvidence::Up { since }, Some(&live(3606.0, now)), now, 5);
    assert!(r.discrepancy);
}

#[test]
fn test_reconcile_log_only_is_apparent() {
    let now = timestamp_from_ymdhms(2024, 1, 1, 12, 0, 0);
    let since = now - Duration::seconds(900);
    let r = reconcile(wan(), &LogEvidence::Up { since }, None, now, 5);
    assert_eq!(r.source, Source::Log);
    assert_eq!(r.uptime_seconds, Some(900.0));
    assert_eq!(r.up_since, Some(since));
    assert!(!r.discrepancy);
}

#[test]
fn test_reconcile_live_only() {
    let now = timestamp_from_ymdhms(2024, 1, 1, 12, 0, 0);
    let r = reconcile(wan(), &LogEvidence::None, Some(&live(120.0, now)), now, 5);
    assert_eq!(r.source, Source::Live);
    assert_eq!(r.uptime_seconds, Some(120.0));
    assert_eq!(r.up_since, Some(now - Duration::seconds(120)));
    assert!(!r.discrepancy);
}

#[test]
fn test_reconcile_logs_down_but_live_up() {
    let now = timestamp_from_ymdhms(2024, 1, 1, 12, 0, 0);
    let last_down = now - Duration::seconds(600);
    let r = reconcile(
        wan(),
        &LogEvidence::Down { last_down },
        Some(&live(3600.0, now)),
        now,
        5,
    );
    assert!(r.discrepancy);
    assert_eq!(r.uptime_seconds, Some(3600.0));
    assert_eq!(r.last_down, Some(last_down));
}

#[test]
fn test_reconcile_logs_up_but_live_down() {
    let now = timestamp_from_ymdhms(2024, 1, 1, 12, 0, 0);
    let since = now - Duration::seconds(600);
    let r = reconcile(wan(), &LogEvidence::Up { since }, Some(&live(0.0, now)), now, 5);
    assert_eq!(r.source, Source::Log);
    assert!(r.discrepancy);
}

#[test]
fn test_reconcile_neither_source() {
    let now = timestamp_from_ymdhms(2024, 1, 1, 12, 0, 0);
    let r = reconcile(wan(), &LogEvidence::None, None, now, 5);
    assert_eq!(r.source, Source::Unknown);
    assert_eq!(r.uptime_seconds, None);
    assert!(!r.discrepancy);
}

#[test]
fn test_log_evidence_reads_final_interval() {
    let t0 = timestamp_from_ymdhms(2024, 1, 1, 0, 0, 0);
    let t1 = timestamp_from_ymdhms(2024, 1, 1, 1, 0, 0);
    let t2 = timestamp_from_ymdhms(2024, 1, 1, 2, 0, 0);
    let intervals = vec![
        Interval {
            interface: wan(),
            up_at: t0,
            down_at: Some(t1),
        },
        Interval {
            interface: wan(),
            up_at: t2,
            down_at: None,
        },
    ];
    assert_eq!(log_evidence(&intervals, wan()), LogEvidence::Up { since: t2 });
    assert_eq!(
        log_evidence(&intervals[..1], wan()),
        LogEvidence::Down { last_down: t1 }
    );
    assert_eq!(log_evidence(&intervals, Ustr::from("wan6")), LogEvidence::None);
}
