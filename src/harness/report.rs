use std::{fmt, io::Write};

use crate::types::Verdict;

pub const RULE_WIDTH: usize = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Pass,
    Fail,
    Unknown,
    Error,
}

impl Status {
    pub fn derive(expected: Verdict, actual: Verdict) -> Self {
        if actual.is_failure() {
            Status::Error
        } else if expected == Verdict::Unknown {
            Status::Unknown
        } else if expected == actual {
            Status::Pass
        } else {
            Status::Fail
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Unknown => "UNKNOWN",
            Status::Error => "ERROR",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseRecord {
    pub name: String,
    pub expected: Verdict,
    pub actual: Verdict,
    pub status: Status,
    /// Solver output or diagnostic, kept for `FAIL` and `ERROR` only.
    pub details: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub records: Vec<CaseRecord>,
    pub passed: usize,
    pub failed: usize,
    pub unknown: usize,
    pub errored: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        name: impl Into<String>,
        expected: Verdict,
        actual: Verdict,
        output: String,
    ) -> Status {
        let status = Status::derive(expected, actual);
        let details = match status {
            Status::Pass => {
                self.passed += 1;
                None
            }
            Status::Unknown => {
                self.unknown += 1;
                None
            }
            Status::Fail => {
                self.failed += 1;
                Some(output)
            }
            Status::Error => {
                self.errored += 1;
                Some(output)
            }
        };

        self.records.push(CaseRecord {
            name: name.into(),
            expected,
            actual,
            status,
            details,
        });
        status
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// True when no case failed and the solver never errored or timed out.
    pub fn success(&self) -> bool {
        self.failed + self.errored == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    pub fn write(&self, writer: &mut impl Write, preview_len: usize) -> std::io::Result<()> {
        for record in &self.records {
            let expected = match record.expected {
                Verdict::Unknown => "?".to_string(),
                verdict => verdict.to_string(),
            };
            writeln!(
                writer,
                "{:<12} {:<40} Expected: {:<6} Got: {}",
                record.status, record.name, expected, record.actual
            )?;

            if let Some(details) = record.details.as_deref().filter(|d| !d.is_empty()) {
                let (preview, truncated) = preview(details, preview_len);
                writeln!(writer, "  Details: {preview}")?;
                if truncated {
                    writeln!(writer, "  ...")?;
                }
                writeln!(writer)?;
            }
        }

        writeln!(writer, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(
            writer,
            "\nResults: {} passed, {} failed, {} unknown, {} errors",
            self.passed, self.failed, self.unknown, self.errored
        )?;
        writeln!(writer, "Total: {} tests", self.total())?;
        if self.success() {
            writeln!(writer, "\nAll tests completed with no failures or errors.")?;
        }
        Ok(())
    }
}

/// The first `len` characters of `text`, and whether anything was cut.
pub fn preview(text: &str, len: usize) -> (&str, bool) {
    match text.char_indices().nth(len) {
        Some((end, _)) => (&text[..end], true),
        None => (text, false),
    }
}
