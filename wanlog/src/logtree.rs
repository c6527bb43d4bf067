/// Locate and open the members of a rotated-log family.
///
/// Log rotation leaves a family of files sharing a base name: the live file plus numbered older
/// files, any of which may additionally be gzip-compressed ("messages", "messages.1",
/// "messages.2.gz", ...; some rotation configurations use "-" instead of ".").  The family may
/// live in one of several candidate directories - on the routers this code was written for,
/// logging goes to a mounted USB disk when one is present and to /var/log otherwise - so the
/// directories are probed in a fixed priority order and the first one holding any family member
/// wins.  Files from different directories are never merged.
///
/// Higher rotation numbers are older data, so reading the family highest-number-first keeps the
/// derived record stream in increasing time order.
use crate::Warning;

use anyhow::Result;
use flate2::read::GzDecoder;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Return the full paths of the rotation family for `base_name`, oldest data first, from the
/// first candidate directory that has any member at all.  Directories that cannot be listed are
/// skipped with a warning.  An empty result is not an error: it means no history is available,
/// and the caller reports exactly that.

pub fn find_logfiles(
    log_dirs: &[String],
    base_name: &str,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<String>> {
    let family = Regex::new(&format!(
        r"^{}[-.]?(?P<num>[0-9]+)?(\.gz)?$",
        regex::escape(base_name)
    ))?;

    for dir in log_dirs {
        let rd = match Path::new(dir).read_dir() {
            Ok(rd) => rd,
            Err(e) => {
                warnings.push(Warning::UnlistableDirectory {
                    dir: dir.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        let mut members: Vec<(u64, String)> = vec![];
        for entry in rd {
            let entry = match entry {
                Ok(entry) => entry,
                // Bad directory entries would be I/O errors; skip them, assuming the iterator
                // still makes progress.
                Err(_) => {
                    continue;
                }
            };
            let path = entry.path();
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                // A non-UTF8 name cannot match the family pattern.
                Err(_) => {
                    continue;
                }
            };
            if let Some(m) = family.captures(&name) {
                // No rotation number marks the live file; it sorts as rotation 0.
                let num = match m.name("num") {
                    Some(num) => match num.as_str().parse::<u64>() {
                        Ok(num) => num,
                        Err(_) => {
                            continue;
                        }
                    },
                    None => 0,
                };
                if let Some(p) = path.to_str() {
                    members.push((num, p.to_string()));
                }
            }
        }

        if !members.is_empty() {
            // Highest rotation number first, ie oldest data first; ties broken by name so the
            // order is deterministic.
            members.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
            return Ok(members.into_iter().map(|(_, f)| f).collect());
        }
    }

    Ok(vec![])
}

/// Open one family member for line-oriented reading, decompressing transparently when the name
/// carries the compressed-log suffix.

pub fn open_logfile(file_name: &str) -> Result<Box<dyn BufRead>> {
    let file = File::open(file_name)?;
    if file_name.ends_with(".gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
fn scratch_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("wanlog-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[cfg(test)]
fn base_names(files: &[String]) -> Vec<String> {
    files
        .iter()
        .map(|f| {
            Path::new(f)
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .to_string()
        })
        .collect()
}

#[test]
fn test_find_logfiles_rotation_order() {
    let dir = scratch_dir("rotation-order");
    for name in [
        "messages",
        "messages.1",
        "messages.2.gz",
        "messages.old",
        "syslog",
        "more-messages",
    ] {
        std::fs::write(dir.join(name), b"").unwrap();
    }
    let mut warnings = vec![];
    let files = find_logfiles(
        &[dir.to_str().unwrap().to_string()],
        "messages",
        &mut warnings,
    )
    .unwrap();
    assert!(warnings.is_empty());
    assert_eq!(base_names(&files), vec!["messages.2.gz", "messages.1", "messages"]);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_find_logfiles_dash_and_gz_variants() {
    let dir = scratch_dir("family-variants");
    for name in ["messages", "messages-2", "messages.1.gz"] {
        std::fs::write(dir.join(name), b"").unwrap();
    }
    let mut warnings = vec![];
    let files = find_logfiles(
        &[dir.to_str().unwrap().to_string()],
        "messages",
        &mut warnings,
    )
    .unwrap();
    assert_eq!(base_names(&files), vec!["messages-2", "messages.1.gz", "messages"]);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_find_logfiles_first_directory_wins() {
    let preferred = scratch_dir("first-dir-preferred");
    let fallback = scratch_dir("first-dir-fallback");
    std::fs::write(preferred.join("messages"), b"").unwrap();
    std::fs::write(fallback.join("messages"), b"").unwrap();
    std::fs::write(fallback.join("messages.1"), b"").unwrap();
    let mut warnings = vec![];
    let files = find_logfiles(
        &[
            preferred.to_str().unwrap().to_string(),
            fallback.to_str().unwrap().to_string(),
        ],
        "messages",
        &mut warnings,
    )
    .unwrap();
    // Only the preferred directory's family is used, even though the fallback has more files.
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with(preferred.to_str().unwrap()));
    std::fs::remove_dir_all(&preferred).unwrap();
    std::fs::remove_dir_all(&fallback).unwrap();
}

#[test]
fn test_find_logfiles_skips_unlistable_directory() {
    let dir = scratch_dir("unlistable-fallback");
    std::fs::write(dir.join("messages"), b"").unwrap();
    let mut warnings = vec![];
    let files = find_logfiles(
        &[
            "/no/such/directory/anywhere".to_string(),
            dir.to_str().unwrap().to_string(),
        ],
        "messages",
        &mut warnings,
    )
    .unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(warnings.len(), 1);
    assert!(matches!(&warnings[0], Warning::UnlistableDirectory { .. }));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_find_logfiles_no_match_anywhere() {
    let dir = scratch_dir("no-match");
    std::fs::write(dir.join("syslog"), b"").unwrap();
    let mut warnings = vec![];
    let files = find_logfiles(
        &[dir.to_str().unwrap().to_string()],
        "messages",
        &mut warnings,
    )
    .unwrap();
    assert!(files.is_empty());
    assert!(warnings.is_empty());
    std::fs::remove_dir_all(&dir).unwrap();
}
