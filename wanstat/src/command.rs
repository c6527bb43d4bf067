// Run an external command with a timeout, capturing its stdout.
//
// The child must be drained while we wait for it: a child that fills the pipe blocks, and with a
// time limit on the read that surfaces as a timeout rather than a hang.  See
// https://github.com/rust-lang/rust/issues/45572 for the underlying problem with the obvious
// read-after-wait approach.

use std::io;
use std::time::Duration;
use subprocess::{Exec, ExitStatus, Redirection};

pub fn run_with_timeout(command: &str, timeout_seconds: u64) -> Result<String, String> {
    let mut p = Exec::shell(command)
        .stdout(Redirection::Pipe)
        .stderr(Redirection::Pipe)
        .popen()
        .map_err(|e| format!("{command}: {e}"))?;

    let mut comm = p
        .communicate_start(None)
        .limit_time(Duration::new(timeout_seconds, 0));
    let mut stdout = "".to_string();
    let mut failure: Option<String> = None;
    loop {
        match comm.read_string() {
            Ok((Some(out), Some(err))) => {
                if !err.is_empty() {
                    failure = Some(err);
                    break;
                }
                if out.is_empty() {
                    // EOF; timeouts come back as Err.
                    break;
                }
                stdout += &out;
            }
            Ok((_, _)) => {
                failure = Some("Unexpected channel state".to_string());
                break;
            }
            Err(e) => {
                if e.error.kind() == io::ErrorKind::TimedOut {
                    let _ = p.terminate();
                    failure = Some(format!("{command}: timed out"));
                } else {
                    failure = Some(format!("{command}: {}", e.error));
                }
                break;
            }
        }
    }

    match (p.wait(), failure) {
        (Ok(ExitStatus::Exited(0)), None) => Ok(stdout),
        (_, Some(why)) => Err(why),
        (_, None) => Err(format!("{command}: nonzero exit")),
    }
}
