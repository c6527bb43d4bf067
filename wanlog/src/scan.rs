/// Scan an ordered set of log files into a link-event stream.
///
/// This is the sequential driver for the pipeline: files are processed one at a time, fully, in
/// the order the locator fixed; within a file, lines are classified and fed to the event matcher
/// in physical order.  A file that cannot be opened or read to the end costs only that file (or
/// its remaining lines) - the scan warns and continues, and the per-file summary says what was
/// actually seen, so a report built on partial history can be labeled as such.
use crate::classify::{Classification, Classifier};
use crate::events::{EventMatcher, LinkEvent, LinkEventKind};
use crate::logtree::open_logfile;
use crate::{Timestamp, Warning};

use anyhow::Result;
use std::io::BufRead;
use ustr::Ustr;

/// Line and match counts for one scanned file.  Purely diagnostic; the self-test mode prints
/// these so a user can tell dead regexes from genuinely quiet logs.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSummary {
    pub file: String,

    /// Every line read, recognized or not.
    pub lines_seen: usize,

    /// Lines that decomposed into a full record.
    pub lines_recognized: usize,

    /// Records at the right severity from the interface-management process.
    pub lines_matched: usize,

    pub ups_seen: usize,
    pub downs_seen: usize,

    /// Timestamps of the first and last recognized record, in physical line order.
    pub first_seen: Option<Timestamp>,
    pub last_seen: Option<Timestamp>,

    /// The raw text of the matched lines, kept only when the scan is asked to.
    pub matched_lines: Vec<String>,

    /// True when a read error cut the file short.
    pub truncated: bool,
}

/// Summary of a whole scan.

#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub files: Vec<FileSummary>,

    /// Files the locator offered that could not be opened at all.
    pub files_unreadable: usize,
}

impl ScanSummary {
    /// True when any part of the history could not be read.

    pub fn is_partial(&self) -> bool {
        self.files_unreadable > 0 || self.files.iter().any(|f| f.truncated)
    }

    pub fn lines_seen(&self) -> usize {
        self.files.iter().map(|f| f.lines_seen).sum()
    }

    pub fn events_seen(&self) -> usize {
        self.files.iter().map(|f| f.ups_seen + f.downs_seen).sum()
    }

    pub fn lines_recognized(&self) -> usize {
        self.files.iter().map(|f| f.lines_recognized).sum()
    }

    /// Timestamp of the first recognized record across the whole scan, in scan order.  The files
    /// are scanned oldest rotation first, so for a healthy log this is also the earliest instant.

    pub fn first_seen(&self) -> Option<Timestamp> {
        self.files.iter().find_map(|f| f.first_seen)
    }

    pub fn last_seen(&self) -> Option<Timestamp> {
        self.files.iter().rev().find_map(|f| f.last_seen)
    }
}

/// Scan one file, appending extracted events to `events` and non-fatal conditions to `warnings`.
/// Returns an error only if the file cannot be opened; a read error mid-file keeps whatever was
/// extracted up to that point and marks the summary truncated.

pub fn scan_logfile(
    file_name: &str,
    classifier: &Classifier,
    matcher: &EventMatcher,
    keep_matched: bool,
    events: &mut Vec<LinkEvent>,
    warnings: &mut Vec<Warning>,
) -> Result<FileSummary> {
    let reader = open_logfile(file_name)?;
    let file = Ustr::from(file_name);
    let mut summary = FileSummary {
        file: file_name.to_string(),
        ..FileSummary::default()
    };

    for (ix, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warnings.push(Warning::UnreadableFile {
                    file: file_name.to_string(),
                    error: e.to_string(),
                });
                summary.truncated = true;
                break;
            }
        };
        summary.lines_seen += 1;
        let line_number = ix + 1;

        match classifier.classify(file, line_number, &line) {
            Classification::Record(r) => {
                summary.lines_recognized += 1;
                if summary.first_seen.is_none() {
                    summary.first_seen = Some(r.timestamp);
                }
                summary.last_seen = Some(r.timestamp);
                if matcher.is_relevant(&r) {
                    summary.lines_matched += 1;
                    if keep_matched {
                        summary.matched_lines.push(line.clone());
                    }
                    if let Some(e) = matcher.extract(&r) {
                        match e.kind {
                            LinkEventKind::Up => summary.ups_seen += 1,
                            LinkEventKind::Down => summary.downs_seen += 1,
                        }
                        events.push(e);
                    }
                }
            }
            Classification::MalformedTimestamp => {
                warnings.push(Warning::MalformedTimestamp {
                    file,
                    line_number,
                    text: line,
                });
            }
            Classification::Unrecognized => {
                // Blank lines are common padding in rotated logs and not worth a warning.
                if !line.trim().is_empty() {
                    warnings.push(Warning::UnrecognizedLine {
                        file,
                        line_number,
                        text: line,
                    });
                }
            }
        }
    }

    Ok(summary)
}

/// Scan a whole ordered file list.  Unopenable files are skipped with a warning; the returned
/// event stream preserves the given file order and the physical line order within each file.

pub fn scan_logs(
    logfiles: &[String],
    matcher: &EventMatcher,
    keep_matched: bool,
    warnings: &mut Vec<Warning>,
) -> Result<(Vec<LinkEvent>, ScanSummary)> {
    let classifier = Classifier::new()?;
    let mut events = vec![];
    let mut summary = ScanSummary::default();

    for file in logfiles {
        match scan_logfile(file, &classifier, matcher, keep_matched, &mut events, warnings) {
            Ok(fs) => {
                summary.files.push(fs);
            }
            Err(e) => {
                warnings.push(Warning::UnreadableFile {
                    file: file.clone(),
                    error: e.to_string(),
                });
                summary.files_unreadable += 1;
            }
        }
    }

    Ok((events, summary))
}

#[cfg(test)]
use crate::dates::timestamp_from_ymdhms;
#[cfg(test)]
use crate::intervals::fold_events;
#[cfg(test)]
use std::io::Write;

#[cfg(test)]
fn scratch_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("wanlog-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[cfg(test)]
fn wan_matcher() -> EventMatcher {
    EventMatcher::new("netifd", &["wan".to_string()]).unwrap()
}

#[test]
fn test_scan_to_intervals() {
    let dir = scratch_dir("scan-plain");
    let file = dir.join("messages");
    std::fs::write(
        &file,
        "2024-01-01 00:00:00 notice netifd[1]: Interface 'wan' is now up\n\
         2024-01-01 00:30:00 notice firewall[]: Reloading firewall due to ifup of wan (pppoe-wan)\n\
         2024-01-01 01:30:00 notice netifd[1]: Interface 'wan' is now down\n",
    )
    .unwrap();

    let mut warnings = vec![];
    let (events, summary) = scan_logs(
        &[file.to_str().unwrap().to_string()],
        &wan_matcher(),
        false,
        &mut warnings,
    )
    .unwrap();
    assert!(warnings.is_empty());
    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.files[0].lines_seen, 3);
    assert_eq!(summary.files[0].lines_recognized, 3);
    assert_eq!(summary.files[0].lines_matched, 2);
    assert_eq!(summary.files[0].ups_seen, 1);
    assert_eq!(summary.files[0].downs_seen, 1);
    assert!(!summary.is_partial());

    let (intervals, fold_warnings) = fold_events(&events);
    assert!(fold_warnings.is_empty());
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].up_at, timestamp_from_ymdhms(2024, 1, 1, 0, 0, 0));
    assert_eq!(
        intervals[0].down_at,
        Some(timestamp_from_ymdhms(2024, 1, 1, 1, 30, 0))
    );
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_scan_unparsable_line_does_not_break_the_fold() {
    let dir = scratch_dir("scan-garbage");
    let file = dir.join("messages");
    std::fs::write(
        &file,
        "2024-01-01 00:00:00 notice netifd[1]: Interface 'wan' is now up\n\
         !!! garbage that matches nothing !!!\n\
         2024-01-01 01:30:00 notice netifd[1]: Interface 'wan' is now down\n",
    )
    .unwrap();

    let mut warnings = vec![];
    let (events, _) = scan_logs(
        &[file.to_str().unwrap().to_string()],
        &wan_matcher(),
        false,
        &mut warnings,
    )
    .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(warnings.len(), 1);
    assert!(matches!(&warnings[0], Warning::UnrecognizedLine { line_number: 2, .. }));
    let (intervals, _) = fold_events(&events);
    assert_eq!(intervals.len(), 1);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_scan_blank_lines_are_not_warned_about() {
    let dir = scratch_dir("scan-blank");
    let file = dir.join("messages");
    std::fs::write(&file, "\n\n2024-01-01 00:00:00 notice netifd[1]: Interface 'wan' is now up\n")
        .unwrap();
    let mut warnings = vec![];
    let (events, summary) = scan_logs(
        &[file.to_str().unwrap().to_string()],
        &wan_matcher(),
        false,
        &mut warnings,
    )
    .unwrap();
    assert!(warnings.is_empty());
    assert_eq!(events.len(), 1);
    assert_eq!(summary.files[0].lines_seen, 3);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_scan_reads_gzip_members_transparently() {
    let dir = scratch_dir("scan-gzip");
    let old = dir.join("messages.1.gz");
    let mut enc = flate2::write::GzEncoder::new(
        std::fs::File::create(&old).unwrap(),
        flate2::Compression::default(),
    );
    enc.write_all(b"2017-05-29T00:09:43+10:00 notice netifd[]: Interface 'wan' is now up\n")
        .unwrap();
    enc.finish().unwrap();
    let live = dir.join("messages");
    std::fs::write(
        &live,
        "2017-05-29 05:32:29 notice netifd[]: Interface 'wan' is now down\n",
    )
    .unwrap();

    // Oldest rotation first, exactly as the locator orders them.
    let files = vec![
        old.to_str().unwrap().to_string(),
        live.to_str().unwrap().to_string(),
    ];
    let mut warnings = vec![];
    let (events, summary) = scan_logs(&files, &wan_matcher(), false, &mut warnings).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(events.len(), 2);
    assert_eq!(summary.files.len(), 2);

    let (intervals, fold_warnings) = fold_events(&events);
    assert!(fold_warnings.is_empty());
    assert_eq!(intervals.len(), 1);
    // The gzip member used format B with +10:00, folded back at parse time.
    assert_eq!(intervals[0].up_at, timestamp_from_ymdhms(2017, 5, 28, 14, 9, 43));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_scan_skips_unreadable_file() {
    let dir = scratch_dir("scan-unreadable");
    let good = dir.join("messages");
    std::fs::write(
        &good,
        "2024-01-01 00:00:00 notice netifd[1]: Interface 'wan' is now up\n",
    )
    .unwrap();
    let files = vec![
        dir.join("messages.1").to_str().unwrap().to_string(), // does not exist
        good.to_str().unwrap().to_string(),
    ];
    let mut warnings = vec![];
    let (events, summary) = scan_logs(&files, &wan_matcher(), false, &mut warnings).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(summary.files_unreadable, 1);
    assert!(summary.is_partial());
    assert!(matches!(&warnings[0], Warning::UnreadableFile { .. }));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_scan_tracks_recognized_span_across_files() {
    let dir = scratch_dir("scan-span");
    let old = dir.join("messages.1");
    std::fs::write(
        &old,
        "!!! garbage before the first real record !!!\n\
         2024-01-01 00:00:00 notice netifd[1]: Interface 'wan' is now up\n\
         2024-01-01 06:00:00 warn kernel[]: something unrelated\n",
    )
    .unwrap();
    let live = dir.join("messages");
    std::fs::write(
        &live,
        "2024-01-02 12:00:00 notice netifd[1]: Interface 'wan' is now down\n",
    )
    .unwrap();

    let files = vec![
        old.to_str().unwrap().to_string(),
        live.to_str().unwrap().to_string(),
    ];
    let mut warnings = vec![];
    let (_, summary) = scan_logs(&files, &wan_matcher(), false, &mut warnings).unwrap();
    // The span covers recognized records, matched or not, and skips the garbage line.
    assert_eq!(summary.lines_recognized(), 3);
    assert_eq!(summary.first_seen(), Some(timestamp_from_ymdhms(2024, 1, 1, 0, 0, 0)));
    assert_eq!(summary.last_seen(), Some(timestamp_from_ymdhms(2024, 1, 2, 12, 0, 0)));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_scan_empty_scan_has_no_span() {
    let mut warnings = vec![];
    let (_, summary) = scan_logs(&[], &wan_matcher(), false, &mut warnings).unwrap();
    assert_eq!(summary.first_seen(), None);
    assert_eq!(summary.last_seen(), None);
}

#[test]
fn test_scan_keeps_matched_lines_on_request() {
    let dir = scratch_dir("scan-matched");
    let file = dir.join("messages");
    let up_line = "2024-01-01 00:00:00 notice netifd[1]: Interface 'wan' is now up";
    let chatter = "2024-01-01 00:15:00 notice netifd[1]: Network device 'eth0' link is up";
    std::fs::write(
        &file,
        format!("{up_line}\n{chatter}\n2024-01-01 00:30:00 notice firewall[]: Reloading firewall\n"),
    )
    .unwrap();

    let files = vec![file.to_str().unwrap().to_string()];
    let mut warnings = vec![];
    let (_, summary) = scan_logs(&files, &wan_matcher(), true, &mut warnings).unwrap();
    // Every line from the relevant process is kept verbatim, transition or chatter; lines from
    // other processes are not.
    assert_eq!(summary.files[0].matched_lines, vec![up_line.to_string(), chatter.to_string()]);

    let (_, summary) = scan_logs(&files, &wan_matcher(), false, &mut warnings).unwrap();
    assert!(summary.files[0].matched_lines.is_empty());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_scan_warns_about_malformed_timestamp_with_provenance() {
    let dir = scratch_dir("scan-badtime");
    let file = dir.join("messages");
    std::fs::write(
        &file,
        "2024-01-01 00:00:00 notice netifd[1]: Interface 'wan' is now up\n\
         2024-01-01T01:00:00+99:00 notice netifd[1]: Interface 'wan' is now down\n",
    )
    .unwrap();

    let mut warnings = vec![];
    let (events, summary) = scan_logs(
        &[file.to_str().unwrap().to_string()],
        &wan_matcher(),
        false,
        &mut warnings,
    )
    .unwrap();
    // The bad line is dropped, not fatal, and the warning says exactly where it was.
    assert_eq!(events.len(), 1);
    assert_eq!(summary.files[0].lines_seen, 2);
    assert_eq!(summary.files[0].lines_recognized, 1);
    assert_eq!(warnings.len(), 1);
    match &warnings[0] {
        Warning::MalformedTimestamp { file: f, line_number, text } => {
            assert_eq!(f.as_str(), file.to_str().unwrap());
            assert_eq!(*line_number, 2);
            assert!(text.contains("+99:00"));
        }
        w => panic!("unexpected warning {w}"),
    }
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_scan_corrupt_gzip_is_truncation_not_failure() {
    let dir = scratch_dir("scan-corrupt");
    let bad = dir.join("messages.1.gz");
    std::fs::write(&bad, b"this is not a gzip stream").unwrap();
    let mut warnings = vec![];
    let (events, summary) = scan_logs(
        &[bad.to_str().unwrap().to_string()],
        &wan_matcher(),
        false,
        &mut warnings,
    )
    .unwrap();
    assert!(events.is_empty());
    assert!(summary.is_partial());
    assert_eq!(warnings.len(), 1);
    std::fs::remove_dir_all(&dir).unwrap();
}
