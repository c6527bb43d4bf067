/// `wanstat` -- report WAN link up/down history from the router's message logs
///
/// The history is reconstructed from whatever rotated log files exist (see the wanlog crate) and
/// reconciled against the uptime the interface-management daemon currently reports over ubus.
/// The two sources frequently disagree on routers with flaky storage or short log retention, so
/// the report says where every number came from and flags conflicts instead of hiding them.
///
/// Quirks
///
/// Parser warnings are suppressed by default, matching how noisy real-world message logs are;
/// `--warnings` prints the lot.  The `scan` subcommand exists to debug exactly that noise: it
/// only counts what the scanner recognized and matched, per file, without building intervals.
mod command;
mod humanize;
mod status;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::process;
use ustr::Ustr;
use wanlog::{
    find_logfiles, fold_events, log_evidence, now, reconcile, scan_logs, EventMatcher, Interval,
    Report, ScanSummary, Source, Warning,
};

use crate::humanize::duration_formatted;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print information about the program
    Version,

    /// Reconstruct and print the link up-intervals, reconciled against live status
    Timers(TimersCmdArgs),

    /// Scan the log files and print per-file match statistics
    Scan(ScanCmdArgs),
}

#[derive(Args, Debug)]
pub struct TimersCmdArgs {
    #[command(flatten)]
    source_args: SourceArgs,

    #[command(flatten)]
    print_args: TimersPrintArgs,

    #[command(flatten)]
    meta_args: MetaArgs,
}

#[derive(Args, Debug)]
pub struct ScanCmdArgs {
    #[command(flatten)]
    source_args: SourceArgs,

    #[command(flatten)]
    meta_args: MetaArgs,
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Log directory to search, in priority order (repeatable).  The removable-media location
    /// comes first because the routers log there when a USB disk is mounted
    #[arg(long = "log-dir", default_values_t = ["/mnt/sda1/log".to_string(), "/var/log".to_string()])]
    log_dirs: Vec<String>,

    /// Base name of the rotated log family
    #[arg(long, default_value = "messages")]
    base_name: String,

    /// Interface to report on (repeatable)
    #[arg(long = "interface", short, default_values_t = ["wan".to_string()])]
    interfaces: Vec<String>,

    /// Process whose messages carry the authoritative link transitions
    #[arg(long, default_value = "netifd")]
    process: String,
}

#[derive(Args, Debug)]
pub struct TimersPrintArgs {
    /// Show parser warnings (suppressed by default)
    #[arg(long, short)]
    warnings: bool,

    /// Echo the matched log lines verbatim
    #[arg(long, short)]
    logs: bool,

    /// Print the size and time span of the scanned message log
    #[arg(long, short = 'L')]
    log_summary: bool,

    /// Agreement tolerance between log-derived and live uptime, in seconds
    #[arg(long, default_value_t = 5)]
    tolerance: i64,

    /// Timeout for the live status query, in seconds
    #[arg(long, default_value_t = 5)]
    status_timeout: u64,

    /// Skip the live status query and report from the logs alone
    #[arg(long)]
    no_live: bool,
}

#[derive(Args, Debug)]
pub struct MetaArgs {
    /// Print progress information
    #[arg(long, short)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Version => {
            println!("wanstat v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Timers(args) => timers_command(&args),
        Commands::Scan(args) => scan_command(&args),
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn locate_and_scan(
    source_args: &SourceArgs,
    meta_args: &MetaArgs,
    keep_matched: bool,
    warnings: &mut Vec<Warning>,
) -> Result<(Vec<wanlog::LinkEvent>, ScanSummary)> {
    let files = find_logfiles(&source_args.log_dirs, &source_args.base_name, warnings)?;
    if meta_args.verbose {
        println!("Scanning {} file(s), oldest first:", files.len());
        for f in &files {
            println!("  {f}");
        }
    }
    let matcher = EventMatcher::new(&source_args.process, &source_args.interfaces)?;
    scan_logs(&files, &matcher, keep_matched, warnings)
}

fn timers_command(args: &TimersCmdArgs) -> Result<()> {
    let mut warnings = vec![];
    let (events, summary) = locate_and_scan(
        &args.source_args,
        &args.meta_args,
        args.print_args.logs,
        &mut warnings,
    )?;

    if args.print_args.logs {
        for f in &summary.files {
            for line in &f.matched_lines {
                println!("{line}");
            }
        }
    }
    if args.print_args.log_summary {
        print_log_summary(&summary);
    }

    let (intervals, fold_warnings) = fold_events(&events);
    warnings.extend(fold_warnings);

    for iv in &intervals {
        print_closed_interval(iv);
    }

    let now = now();
    for interface in &args.source_args.interfaces {
        let interface = Ustr::from(interface);
        let live = if args.print_args.no_live {
            None
        } else {
            status::get_live_status(interface.as_str(), args.print_args.status_timeout)
        };
        if live.is_none() && !args.print_args.no_live {
            warnings.push(Warning::LiveStatusUnavailable { interface });
        }
        let evidence = log_evidence(&intervals, interface);
        let report = reconcile(
            interface,
            &evidence,
            live.as_ref(),
            now,
            args.print_args.tolerance,
        );
        print_report(&report);
    }

    if summary.lines_seen() == 0 {
        println!("No message log history was found.");
    } else if summary.is_partial() {
        println!(
            "Note: the log history is partial ({} file(s) could not be fully read).",
            summary.files_unreadable
                + summary.files.iter().filter(|f| f.truncated).count()
        );
    }

    print_warnings(&warnings, args.print_args.warnings);
    Ok(())
}

fn scan_command(args: &ScanCmdArgs) -> Result<()> {
    let mut warnings = vec![];
    let (_, summary) = locate_and_scan(&args.source_args, &args.meta_args, false, &mut warnings)?;

    for f in &summary.files {
        println!(
            "{}: {} lines, {} recognized, {} matched, {} ups, {} downs{}",
            f.file,
            f.lines_seen,
            f.lines_recognized,
            f.lines_matched,
            f.ups_seen,
            f.downs_seen,
            if f.truncated { " (truncated)" } else { "" }
        );
    }
    println!(
        "Total: {} file(s), {} line(s), {} event(s), {} unreadable",
        summary.files.len(),
        summary.lines_seen(),
        summary.events_seen(),
        summary.files_unreadable
    );

    print_warnings(&warnings, true);
    Ok(())
}

fn print_log_summary(summary: &ScanSummary) {
    match (summary.first_seen(), summary.last_seen()) {
        (Some(first), Some(last)) => {
            println!(
                "Message log has {} entries, spanning {} between {} and {}",
                summary.lines_recognized(),
                duration_formatted((last - first).num_seconds() as f64),
                first.format("%c"),
                last.format("%c")
            );
        }
        _ => {
            println!("Message log has no recognized entries");
        }
    }
}

fn print_closed_interval(iv: &Interval) {
    if let Some(down_at) = iv.down_at {
        let secs = (down_at - iv.up_at).num_seconds();
        println!(
            "Link '{}' was up for {} until {}",
            iv.interface,
            duration_formatted(secs as f64),
            down_at.format("%c")
        );
    }
}

fn print_report(r: &Report) {
    let name = r.interface.as_str();
    match r.source {
        Source::Live => {
            if let (Some(uptime), Some(since)) = (r.uptime_seconds, r.up_since) {
                println!(
                    "Link '{name}' has been up for {} since {} (from current status)",
                    duration_formatted(uptime),
                    since.format("%c")
                );
                if let Some(log_since) = r.log_since {
                    if !r.discrepancy {
                        println!(
                            "  corroborated by the message log (up since {})",
                            log_since.format("%c")
                        );
                    } else {
                        println!(
                            "  CONFLICT: the message log says up since {}",
                            log_since.format("%c")
                        );
                    }
                } else if let Some(last_down) = r.last_down {
                    println!(
                        "  CONFLICT: the message log last saw the link go down at {}",
                        last_down.format("%c")
                    );
                }
            } else {
                println!("Link '{name}' is down (from current status)");
                if let Some(last_down) = r.last_down {
                    println!("  the message log agrees, down since {}", last_down.format("%c"));
                }
            }
        }
        Source::Log => {
            if let (Some(uptime), Some(since)) = (r.uptime_seconds, r.up_since) {
                println!(
                    "Link '{name}' has (apparently) been up for {} since {} (from the message log)",
                    duration_formatted(uptime),
                    since.format("%c")
                );
                if r.discrepancy {
                    println!("  CONFLICT: current status reports the link down");
                }
            } else if let Some(last_down) = r.last_down {
                println!(
                    "Link '{name}' appears to be down since {} (from the message log)",
                    last_down.format("%c")
                );
            }
        }
        Source::Unknown => {
            println!("Link '{name}': no log history found and no live status available");
        }
    }
}

fn print_warnings(warnings: &[Warning], show: bool) {
    if warnings.is_empty() {
        return;
    }
    if !show {
        println!(
            "({} warning(s) suppressed, use --warnings to see them)",
            warnings.len()
        );
        return;
    }
    println!("{} warning(s):", warnings.len());
    for w in warnings {
        println!("  {w}");
    }
}
