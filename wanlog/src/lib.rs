/// A message log is a line-oriented system log: each line carries a timestamp, a severity, the
/// name and pid of the reporting process, and a free-text message.  Message logs are rotated, so
/// the history of a system at any moment is spread across a *rotation family* of files - the live
/// file plus zero or more numbered, possibly gzip-compressed, older files - and a rotation family
/// may live in one of several candidate directories (on the routers we care about, a mounted USB
/// disk is preferred over /var/log).
///
/// The fundamental task of this library is to reconstruct, from whatever fragments of that history
/// are readable, the up/down timeline of a named network interface, and to reconcile the
/// reconstruction with the uptime currently reported by the interface-management daemon.  The task
/// breaks down into a number of subtasks:
///
/// - Find the rotation family within the candidate directories and order the files oldest-first,
///   so that reading them in sequence yields records in (nominally) increasing time order.
///
/// - Classify the lines within the log files, handling both the older local-time timestamp format
///   and the newer format with a trailing UTC offset transparently.
///
/// - Extract the authoritative link up/down transition messages for the interfaces of interest,
///   ignoring all other chatter.
///
/// - Fold the ordered event stream into a list of up-intervals, at most one of which is still
///   open, tolerating malformed and contradictory input.
///
/// - Reconcile the open interval with a live status report, surfacing any disagreement between
///   the two sources rather than discarding either.
///
/// A guiding policy throughout: reconstruct as much history as possible from whatever is readable,
/// and surface uncertainty rather than abort.  Malformed lines, unreadable files, and impossible
/// transitions are all collected as `Warning` values, never raised as errors.
mod classify;
mod dates;
mod events;
mod intervals;
mod logtree;
mod reconcile;
mod scan;

use std::fmt;
use ustr::Ustr;

// Types and utilities for manipulating timestamps.

pub use dates::Timestamp;

// The time right now, as a log-relative instant.

pub use dates::now;

// Parse a &str in either historical log encoding into a Timestamp.

pub use dates::parse_log_timestamp;

// Given year, month, day, hour, minute, second, return a Timestamp.

pub use dates::timestamp_from_ymdhms;

// Decompose one raw log line into a LogRecord, or flag it.

pub use classify::Classification;
pub use classify::Classifier;

// Compute the ordered (oldest first) rotation family within a set of candidate directories.

pub use logtree::find_logfiles;

// Open one member of a rotation family, decompressing transparently.

pub use logtree::open_logfile;

// Recognize link up/down transitions for a set of named interfaces.

pub use events::EventMatcher;
pub use events::LinkEvent;
pub use events::LinkEventKind;

// Fold an ordered event stream into up-intervals.

pub use intervals::fold_events;
pub use intervals::Interval;

// Reduce an interval list to the current log-derived view of one interface.

pub use reconcile::log_evidence;
pub use reconcile::LogEvidence;

// Merge the log-derived view with a live status report.

pub use reconcile::reconcile;
pub use reconcile::LiveStatus;
pub use reconcile::Report;
pub use reconcile::Source;

// Scan log files into an event stream, collecting warnings and per-file statistics.

pub use scan::scan_logfile;
pub use scan::scan_logs;
pub use scan::FileSummary;
pub use scan::ScanSummary;

/// The LogRecord structure holds the decomposed fields of one successfully classified log line.
/// Records are created one per line and consumed immediately by the event extractor; they are not
/// retained, so there is no attempt to intern or pack the message text.
///
/// The short, endlessly repeated fields (severity, process, source file) are Ustr to avoid
/// allocating the same few strings once per line.

#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Instant of the record, already folded into the single log-relative representation.
    pub timestamp: Timestamp,

    /// Severity word as it appears in the log: "notice", "warn", ...
    pub severity: Ustr,

    /// Name of the reporting process, eg "netifd".
    pub process: Ustr,

    /// Pid of the reporting process.  The logs frequently carry an empty pid field, "netifd[]";
    /// that is recorded as zero.
    pub pid: u32,

    /// Free-text message, everything after the "]: " separator.
    pub message: String,

    /// File the line came from.
    pub file: Ustr,

    /// 1-based line number within that file.
    pub line_number: usize,
}

/// Non-fatal conditions encountered during a scan.  These are data, not errors: they are collected
/// in order and surfaced (or suppressed) by the caller.  Nothing in this taxonomy ever aborts a
/// scan; at worst a single file's remaining lines are lost.

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A non-blank line that matched no recognized layout.
    UnrecognizedLine {
        file: Ustr,
        line_number: usize,
        text: String,
    },

    /// A line that matched the layout but whose timestamp failed validation.
    MalformedTimestamp {
        file: Ustr,
        line_number: usize,
        text: String,
    },

    /// A candidate log directory that could not be listed.
    UnlistableDirectory { dir: String, error: String },

    /// A family member that could not be opened or read to the end (permissions, I/O error,
    /// corrupt gzip stream).  Any events already extracted from the file are kept.
    UnreadableFile { file: String, error: String },

    /// An up event for an interface that was already up.
    RedundantTransition { interface: Ustr, at: Timestamp },

    /// A down event with no prior up event to match it.
    OrphanTransition { interface: Ustr, at: Timestamp },

    /// The live status query failed or was disabled; the report is log-derived only.
    LiveStatusUnavailable { interface: Ustr },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Warning::UnrecognizedLine {
                file,
                line_number,
                text,
            } => {
                write!(f, "Ill-formed log line at {file}:{line_number} was ignored: {text}")
            }
            Warning::MalformedTimestamp {
                file,
                line_number,
                text,
            } => {
                write!(f, "Malformed timestamp at {file}:{line_number}: {text}")
            }
            Warning::UnlistableDirectory { dir, error } => {
                write!(f, "Log directory {dir} could not be listed: {error}")
            }
            Warning::UnreadableFile { file, error } => {
                write!(f, "Log file {file} could not be fully read: {error}")
            }
            Warning::RedundantTransition { interface, at } => {
                write!(f, "Interface '{interface}' went up at {at} when it was not down")
            }
            Warning::OrphanTransition { interface, at } => {
                write!(f, "Interface '{interface}' went down at {at} when it was not up")
            }
            Warning::LiveStatusUnavailable { interface } => {
                write!(f, "No live status available for interface '{interface}'")
            }
        }
    }
}
