//! External scrape subprocess (§6 "Scrape", §4.8 "Scrape subprocess
//! failure"): materialises a compiled/native-extension module by invoking
//! `<interpreter> -B -E <scrape_module.py> -u8 <module.name> <library_path>`
//! and capturing its UTF-8 stdout. The output is itself Python source (§1:
//! "a parsed AST is assumed as input") — this module only gets the text onto
//! the page; [`crate::resolver::Resolver`] parses and walks it exactly like
//! any other module body.

use std::{
    path::Path,
    process::{Command, Stdio},
    time::{Duration, Instant},
};

use pysem_core::diagnostics::{DiagnosticEvent, Diagnostics};

/// §4.8: "exceeded its wall-clock budget... ~60 s".
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(60);
/// How often to poll the child for completion while waiting on the budget.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Outcome of a scrape attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// The captured stdout, to be parsed as Python source by the caller.
    Output(String),
    /// The subprocess exited non-zero or the timeout elapsed; the slot
    /// should be left unpopulated and may be retried later (§4.8).
    Failed,
}

/// Runs the scrape subprocess for `module_name` against `interpreter` and
/// `library_path`, per the argument list in §6.
pub fn scrape(
    interpreter: &Path,
    scrape_module: &Path,
    module_name: &str,
    library_path: &Path,
    diagnostics: &mut dyn Diagnostics,
) -> ScrapeOutcome {
    diagnostics.emit(DiagnosticEvent::Scrape { module: module_name.to_string() });

    let spawned = Command::new(interpreter)
        .arg("-B")
        .arg("-E")
        .arg(scrape_module)
        .arg("-u8")
        .arg(module_name)
        .arg(library_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn();

    let Ok(mut child) = spawned else {
        return ScrapeOutcome::Failed;
    };

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return if status.success() { read_output(child, module_name, diagnostics) } else { ScrapeOutcome::Failed };
            }
            Ok(None) => {
                if start.elapsed() > SCRAPE_TIMEOUT {
                    let _ = child.kill();
                    let _ = child.wait();
                    diagnostics.emit(DiagnosticEvent::ScrapeTimeout { module: module_name.to_string() });
                    return ScrapeOutcome::Failed;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(_) => return ScrapeOutcome::Failed,
        }
    }
}

fn read_output(mut child: std::process::Child, module_name: &str, diagnostics: &mut dyn Diagnostics) -> ScrapeOutcome {
    use std::io::Read;
    let Some(mut stdout) = child.stdout.take() else {
        return ScrapeOutcome::Failed;
    };
    let mut buffer = String::new();
    if stdout.read_to_string(&mut buffer).is_err() {
        return ScrapeOutcome::Failed;
    }
    diagnostics.emit(DiagnosticEvent::ImportScraped { module: module_name.to_string() });
    ScrapeOutcome::Output(buffer)
}

#[cfg(all(test, unix))]
mod tests {
    use pretty_assertions::assert_eq;
    use pysem_core::diagnostics::NoopDiagnostics;

    use super::*;

    #[test]
    fn captures_stdout_on_a_successful_run() {
        let outcome = scrape(
            Path::new("/bin/echo"),
            Path::new("scrape_module.py"),
            "some_module",
            Path::new("/usr/lib/python3"),
            &mut NoopDiagnostics,
        );
        match outcome {
            ScrapeOutcome::Output(text) => assert!(text.contains("some_module")),
            ScrapeOutcome::Failed => panic!("expected Output"),
        }
    }

    #[test]
    fn a_nonzero_exit_is_reported_as_failed() {
        let outcome = scrape(
            Path::new("/bin/false"),
            Path::new("scrape_module.py"),
            "some_module",
            Path::new("/usr/lib/python3"),
            &mut NoopDiagnostics,
        );
        assert_eq!(outcome, ScrapeOutcome::Failed);
    }

    #[test]
    fn a_missing_interpreter_is_reported_as_failed() {
        let outcome = scrape(
            Path::new("/no/such/interpreter"),
            Path::new("scrape_module.py"),
            "some_module",
            Path::new("/usr/lib/python3"),
            &mut NoopDiagnostics,
        );
        assert_eq!(outcome, ScrapeOutcome::Failed);
    }
}
