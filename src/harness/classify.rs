use std::{fs, io, path::Path, time::Duration};

use crate::{harness::oracle::Invocation, types::Verdict};

/// Reads the verdict out of solver stdout. `UNSAT` is tested first since
/// it contains `SAT`.
pub fn classify_output(stdout: &str) -> Verdict {
    if stdout.contains("UNSAT") {
        Verdict::Unsat
    } else if stdout.contains("SAT") {
        Verdict::Sat
    } else {
        Verdict::Error
    }
}

/// Folds an invocation into the actual verdict and the text kept for
/// reporting: the raw stdout for a decided run, a diagnostic otherwise.
pub fn outcome(invocation: io::Result<Invocation>, timeout: Duration) -> (Verdict, String) {
    match invocation {
        Ok(Invocation::Completed { stdout, .. }) => match classify_output(&stdout) {
            Verdict::Error => (
                Verdict::Error,
                format!("Could not determine result from output:\n{stdout}"),
            ),
            verdict => (verdict, stdout),
        },
        Ok(Invocation::TimedOut) => (
            Verdict::Timeout,
            format!("Solver timed out after {} seconds", timeout.as_secs_f64()),
        ),
        Err(e) => (Verdict::Error, e.to_string()),
    }
}

fn tagged(line: &str) -> Option<Verdict> {
    if !line.contains("Expected:") {
        return None;
    }
    if line.contains("UNSAT") {
        Some(Verdict::Unsat)
    } else if line.contains("SAT") {
        Some(Verdict::Sat)
    } else {
        None
    }
}

fn mentioned(line: &str) -> Option<Verdict> {
    if line.contains("Expected:") {
        return None;
    }
    let upper = line.to_uppercase();
    if upper.contains("UNSAT") && !upper.contains("EXPECTED") {
        Some(Verdict::Unsat)
    } else if upper.contains("SAT") && !upper.contains("UNSAT") {
        Some(Verdict::Sat)
    } else {
        None
    }
}

/// Guesses the expected verdict of a corpus file from its leading comments.
///
/// An `Expected:` tag wins; otherwise the first comment that mentions
/// `UNSAT` or `SAT` in any case decides. The scan stops at the `p` line.
/// Note that generated files carry `c Random k-SAT` and so read as `SAT`.
pub fn expected_verdict(text: &str) -> Verdict {
    let comments: Vec<&str> = text
        .lines()
        .take_while(|line| !line.starts_with('p'))
        .filter(|line| line.starts_with('c'))
        .collect();

    comments
        .iter()
        .find_map(|line| tagged(line))
        .or_else(|| comments.iter().find_map(|line| mentioned(line)))
        .unwrap_or(Verdict::Unknown)
}

pub fn expected_verdict_of_file(path: &Path) -> Verdict {
    match fs::read(path) {
        Ok(bytes) => expected_verdict(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            log::warn!("could not parse {}: {}", path.display(), e);
            Verdict::Unknown
        }
    }
}
