/// Fold an ordered link-event stream into up-intervals.
///
/// The fold is a state machine with one {state, pending-up} cell per interface seen:
///
///   state         event   action
///   ------------  -----   ------------------------------------------------------------
///   Unknown/Down  Up      state=Up, remember the instant
///   Up            Up      keep the first instant, warn (redundant transition)
///   Up            Down    emit the closed interval, state=Down
///   Unknown/Down  Down    nothing to close, warn (orphan transition)
///
/// At end of stream, an interface still in the Up state contributes one open interval - the
/// candidate "still up" report.
///
/// Events are consumed strictly in the order given and never re-sorted.  The caller feeds files
/// oldest-rotation-first and lines in physical order, so for a healthy log the stream is
/// monotone in time; a source that writes out-of-order timestamps produces intervals in file
/// order, and that is accepted, not corrected.  The fold has no hidden state and no wall-clock
/// dependency: the same event sequence always yields the same intervals and warnings.
use crate::events::{LinkEvent, LinkEventKind};
use crate::{Timestamp, Warning};

use std::collections::HashMap;
use ustr::Ustr;

/// A contiguous span during which an interface was reported up.  `down_at == None` means the
/// interval was still open when the event stream ended.  A closed interval always has
/// `down_at > up_at`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub interface: Ustr,
    pub up_at: Timestamp,
    pub down_at: Option<Timestamp>,
}

enum LinkState {
    Unknown,
    Up(Timestamp),
    Down,
}

pub fn fold_events(events: &[LinkEvent]) -> (Vec<Interval>, Vec<Warning>) {
    let mut states = HashMap::<Ustr, LinkState>::new();
    let mut intervals = vec![];
    let mut warnings = vec![];

    for e in events {
        let state = states.entry(e.interface).or_insert(LinkState::Unknown);
        match e.kind {
            LinkEventKind::Up => match *state {
                // Re-affirmation; the link came up when it first said so.
                LinkState::Up(_) => {
                    warnings.push(Warning::RedundantTransition {
                        interface: e.interface,
                        at: e.timestamp,
                    });
                }
                _ => {
                    *state = LinkState::Up(e.timestamp);
                }
            },
            LinkEventKind::Down => {
                match *state {
                    // A down in the same second as the pending up spans nothing; treat it as
                    // unmatched rather than emit an interval that violates down_at > up_at.
                    LinkState::Up(up_at) if e.timestamp > up_at => {
                        intervals.push(Interval {
                            interface: e.interface,
                            up_at,
                            down_at: Some(e.timestamp),
                        });
                    }
                    _ => {
                        warnings.push(Warning::OrphanTransition {
                            interface: e.interface,
                            at: e.timestamp,
                        });
                    }
                }
                *state = LinkState::Down;
            }
        }
    }

    // Anything still up contributes the open interval for its interface.  Emission order follows
    // the opening events; ties are broken by name so the result is deterministic.
    let mut open = states
        .iter()
        .filter_map(|(interface, state)| match state {
            LinkState::Up(up_at) => Some(Interval {
                interface: *interface,
                up_at: *up_at,
                down_at: None,
            }),
            _ => None,
        })
        .collect::<Vec<Interval>>();
    open.sort_by(|a, b| a.up_at.cmp(&b.up_at).then(a.interface.cmp(&b.interface)));
    intervals.append(&mut open);

    (intervals, warnings)
}

#[cfg(test)]
use crate::dates::timestamp_from_ymdhms;

#[cfg(test)]
fn ev(interface: &str, h: u32, mi: u32, kind: LinkEventKind) -> LinkEvent {
    LinkEvent {
        timestamp: timestamp_from_ymdhms(2024, 1, 1, h, mi, 0),
        interface: Ustr::from(interface),
        kind,
    }
}

#[test]
fn test_fold_alternating_pairs() {
    use LinkEventKind::*;
    let events = [
        ev("wan", 0, 0, Up),
        ev("wan", 1, 30, Down),
        ev("wan", 2, 0, Up),
        ev("wan", 3, 15, Down),
    ];
    let (intervals, warnings) = fold_events(&events);
    assert!(warnings.is_empty());
    assert_eq!(intervals.len(), 2);
    assert_eq!(
        intervals[0],
        Interval {
            interface: Ustr::from("wan"),
            up_at: timestamp_from_ymdhms(2024, 1, 1, 0, 0, 0),
            down_at: Some(timestamp_from_ymdhms(2024, 1, 1, 1, 30, 0)),
        }
    );
    for iv in &intervals {
        assert!(iv.down_at.unwrap() > iv.up_at);
    }
}

#[test]
fn test_fold_trailing_open_interval() {
    use LinkEventKind::*;
    let events = [
        ev("wan", 0, 0, Up),
        ev("wan", 1, 0, Down),
        ev("wan", 2, 0, Up),
    ];
    let (intervals, warnings) = fold_events(&events);
    assert!(warnings.is_empty());
    assert_eq!(intervals.len(), 2);
    assert_eq!(intervals[1].up_at, timestamp_from_ymdhms(2024, 1, 1, 2, 0, 0));
    assert_eq!(intervals[1].down_at, None);
}

#[test]
fn test_fold_orphan_down() {
    use LinkEventKind::*;
    let (intervals, warnings) = fold_events(&[ev("wan", 0, 0, Down)]);
    assert!(intervals.is_empty());
    assert_eq!(
        warnings,
        vec![Warning::OrphanTransition {
            interface: Ustr::from("wan"),
            at: timestamp_from_ymdhms(2024, 1, 1, 0, 0, 0),
        }]
    );
    // State stays Down: a following up/down pair folds normally with no further warnings.
    let (intervals, warnings) = fold_events(&[
        ev("wan", 0, 0, Down),
        ev("wan", 1, 0, Up),
        ev("wan", 2, 0, Down),
    ]);
    assert_eq!(intervals.len(), 1);
    assert_eq!(warnings.len(), 1);
}

#[test]
fn test_fold_redundant_up_keeps_first_instant() {
    use LinkEventKind::*;
    let (intervals, warnings) = fold_events(&[
        ev("wan", 0, 0, Up),
        ev("wan", 0, 30, Up),
        ev("wan", 1, 0, Down),
    ]);
    assert_eq!(
        warnings,
        vec![Warning::RedundantTransition {
            interface: Ustr::from("wan"),
            at: timestamp_from_ymdhms(2024, 1, 1, 0, 30, 0),
        }]
    );
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].up_at, timestamp_from_ymdhms(2024, 1, 1, 0, 0, 0));
    assert_eq!(
        intervals[0].down_at,
        Some(timestamp_from_ymdhms(2024, 1, 1, 1, 0, 0))
    );
}

#[test]
fn test_fold_keys_interfaces_independently() {
    use LinkEventKind::*;
    let events = [
        ev("wan", 0, 0, Up),
        ev("wan6", 0, 5, Up),
        ev("wan6", 0, 10, Down),
        ev("wan", 1, 0, Down),
        ev("wan", 1, 5, Up),
    ];
    let (intervals, warnings) = fold_events(&events);
    assert!(warnings.is_empty());
    assert_eq!(intervals.len(), 3);
    // Closed intervals in closing order, then the open one.
    assert_eq!(intervals[0].interface.as_str(), "wan6");
    assert_eq!(intervals[1].interface.as_str(), "wan");
    assert_eq!(intervals[2].interface.as_str(), "wan");
    assert_eq!(intervals[2].down_at, None);
}

#[test]
fn test_fold_zero_length_span_is_not_an_interval() {
    use LinkEventKind::*;
    let (intervals, warnings) = fold_events(&[ev("wan", 0, 0, Up), ev("wan", 0, 0, Down)]);
    assert!(intervals.is_empty());
    assert_eq!(warnings.len(), 1);
}

#[test]
fn test_fold_is_idempotent() {
    use LinkEventKind::*;
    let events = [
        ev("wan", 0, 0, Down),
        ev("wan", 1, 0, Up),
        ev("wan", 1, 0, Up),
        ev("wan", 2, 0, Down),
        ev("wan", 3, 0, Up),
    ];
    let (i1, w1) = fold_events(&events);
    let (i2, w2) = fold_events(&events);
    assert_eq!(i1, i2);
    assert_eq!(w1, w2);
}
