pub mod classify;
pub mod oracle;
pub mod report;

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::{
    config::HarnessConfig,
    error::{Error, Result},
    generator::{self, GeneratorParams},
    io as dimacs,
    types::Verdict,
};

use self::{
    classify::{expected_verdict_of_file, outcome},
    oracle::{Invocation, Oracle, ProcessSolver},
    report::RunReport,
};

/// One instance to hand to the solver, with the verdict it should get.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub cnf: String,
    pub expected: Verdict,
}

impl TestCase {
    pub fn new(name: impl Into<String>, cnf: impl Into<String>, expected: Verdict) -> Self {
        Self {
            name: name.into(),
            cnf: cnf.into(),
            expected,
        }
    }
}

pub fn simple_sat() -> TestCase {
    TestCase::new(
        "simple_sat",
        "c Simple SAT test\np cnf 3 3\n1 2 0\n-1 3 0\n-2 -3 0\n",
        Verdict::Sat,
    )
}

pub fn simple_unsat() -> TestCase {
    TestCase::new(
        "simple_unsat",
        "c Simple UNSAT test\np cnf 1 2\n1 0\n-1 0\n",
        Verdict::Unsat,
    )
}

pub fn empty_formula() -> TestCase {
    TestCase::new("empty_formula", "c Empty formula\np cnf 0 0\n", Verdict::Sat)
}

/// Random instances of growing size whose verdict is not known up front.
pub fn random_cases(count: usize, seed: Option<u64>) -> Result<Vec<TestCase>> {
    (0..count)
        .map(|i| {
            let params = GeneratorParams {
                var_count: 10 + i * 10,
                clause_count: 30 + i * 20,
                min_clause_len: 2,
                max_clause_len: 3,
                seed: seed.map(|seed| seed.wrapping_add(i as u64)),
            };
            let cnf = generator::formula_string(&params)?;
            Ok(TestCase::new(format!("random_{}", i + 1), cnf, Verdict::Unknown))
        })
        .collect()
}

pub fn builtin_cases(random: usize, seed: Option<u64>) -> Result<Vec<TestCase>> {
    let mut cases = vec![simple_sat(), simple_unsat(), empty_formula()];
    cases.extend(random_cases(random, seed)?);
    Ok(cases)
}

/// Every `*.cnf` directly inside `dir`, sorted by path.
pub fn corpus_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Configuration(format!(
            "test directory {} does not exist",
            dir.display()
        )));
    }

    let mut files = vec![];
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "cnf") {
            files.push(path);
        }
    }
    files.sort();
    log::info!("found {} CNF files in {}", files.len(), dir.display());
    Ok(files)
}

/// Raw result of a single solve, shaped like the web endpoint's reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SolveOutput {
    pub output: String,
    pub error: String,
    pub return_code: Option<i32>,
}

pub struct Harness<O> {
    oracle: O,
    config: HarnessConfig,
}

impl Harness<ProcessSolver> {
    /// Builds a harness around the configured solver binary, failing before
    /// any case runs if the binary is unusable.
    pub fn from_config(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(ProcessSolver::new(&config.solver), config))
    }
}

impl<O: Oracle> Harness<O> {
    pub fn new(oracle: O, config: HarnessConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    fn write_temp(cnf: &str) -> io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new().suffix(".cnf").tempfile()?;
        file.write_all(cnf.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    fn invoke_text(&self, cnf: &str) -> io::Result<Invocation> {
        // the file is removed when `input` drops
        let input = Self::write_temp(cnf)?;
        self.oracle.invoke(input.path(), self.config.timeout)
    }

    /// Runs one case and returns the actual verdict with the text to report.
    pub fn run_case(&self, case: &TestCase) -> (Verdict, String) {
        outcome(self.invoke_text(&case.cnf), self.config.timeout)
    }

    pub fn run_cases(&self, cases: &[TestCase]) -> RunReport {
        let mut report = RunReport::new();
        for case in cases {
            let (actual, output) = self.run_case(case);
            let status = report.record(&case.name, case.expected, actual, output);
            log::info!(
                "{}: expected {}, got {} ({})",
                case.name,
                case.expected,
                actual,
                status
            );
        }
        report
    }

    /// Runs the solver on each file in place. The expected verdict comes
    /// from the file's comments. With `validate`, files that do not parse
    /// as DIMACS are reported as errors without running the solver.
    pub fn run_corpus(&self, files: &[PathBuf], validate: bool) -> RunReport {
        let mut report = RunReport::new();
        for path in files {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let expected = expected_verdict_of_file(path);

            let (actual, output) = match validate.then(|| check_dimacs(path)) {
                Some(Err(message)) => (Verdict::Error, message),
                _ => outcome(
                    self.oracle.invoke(path, self.config.timeout),
                    self.config.timeout,
                ),
            };

            let status = report.record(name.as_str(), expected, actual, output);
            log::info!("{}: expected {}, got {} ({})", name, expected, actual, status);
        }
        report
    }

    /// Runs the solver once on `cnf` and hands back everything it printed.
    pub fn solve_text(&self, cnf: &str) -> Result<SolveOutput> {
        if cnf.trim().is_empty() {
            return Err(Error::InvalidParameters("no CNF content provided".to_string()));
        }
        Ok(match self.invoke_text(cnf)? {
            Invocation::Completed {
                stdout,
                stderr,
                exit_code,
            } => SolveOutput {
                output: stdout,
                error: stderr,
                return_code: exit_code,
            },
            Invocation::TimedOut => SolveOutput {
                output: String::new(),
                error: "solver timed out".to_string(),
                return_code: None,
            },
        })
    }
}

fn check_dimacs(path: &Path) -> std::result::Result<(), String> {
    let mut file = fs::File::open(path).map_err(|e| e.to_string())?;
    dimacs::read_formula(&mut file)
        .map(|_| ())
        .map_err(|e| format!("malformed DIMACS: {e}"))
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        fs, io,
        path::{Path, PathBuf},
        time::Duration,
    };

    use super::{builtin_cases, corpus_files, random_cases, Harness, SolveOutput, TestCase};
    use crate::{
        config::HarnessConfig,
        error::Error,
        harness::{
            oracle::{Invocation, Oracle},
            report::Status,
        },
        io as dimacs,
        types::Verdict,
    };

    /// Answers from the instance text itself: `UNSAT` if it holds the
    /// clause pair `1 0`/`-1 0`, a timeout for formulas tagged `slow`.
    #[derive(Default)]
    struct FakeSolver {
        seen: RefCell<Vec<String>>,
    }

    impl Oracle for FakeSolver {
        fn invoke(&self, input: &Path, _timeout: Duration) -> io::Result<Invocation> {
            let text = fs::read_to_string(input)?;
            self.seen.borrow_mut().push(text.clone());
            if text.contains("slow") {
                return Ok(Invocation::TimedOut);
            }
            if text.contains("garbled") {
                return Ok(Invocation::Completed {
                    stdout: "Parsed formula\n".into(),
                    stderr: String::new(),
                    exit_code: Some(0),
                });
            }
            let stdout = if text.contains("\n1 0\n-1 0\n") {
                "UNSAT\n"
            } else {
                "SAT: \nAssignment: 1\n"
            };
            Ok(Invocation::Completed {
                stdout: stdout.into(),
                stderr: "warn\n".into(),
                exit_code: Some(0),
            })
        }
    }

    fn harness() -> Harness<FakeSolver> {
        Harness::new(FakeSolver::default(), HarnessConfig::default())
    }

    #[test]
    fn builtin_suite_passes() {
        let harness = harness();
        let cases = builtin_cases(5, Some(42)).unwrap();
        assert_eq!(cases.len(), 8);

        let report = harness.run_cases(&cases);
        let statuses: Vec<_> = report.records.iter().map(|r| r.status).collect();
        assert_eq!(statuses[..3], [Status::Pass; 3]);
        assert_eq!(statuses[3..], [Status::Unknown; 5]);
        assert_eq!(report.exit_code(), 0);

        // every case saw its own text, in order
        let seen = harness.oracle.seen.borrow();
        assert_eq!(seen.len(), 8);
        assert_eq!(seen[0], cases[0].cnf);
        assert_eq!(seen[7], cases[7].cnf);
    }

    #[test]
    fn errors_are_isolated() {
        let cases = vec![
            TestCase::new("slow", "c slow\np cnf 1 1\n1 0\n", Verdict::Sat),
            TestCase::new("garbled", "c garbled\np cnf 1 1\n1 0\n", Verdict::Sat),
            TestCase::new("wrong", "p cnf 1 2\n1 0\n-1 0\n", Verdict::Sat),
            TestCase::new("fine", "p cnf 1 1\n1 0\n", Verdict::Sat),
        ];
        let report = harness().run_cases(&cases);

        let actual: Vec<_> = report.records.iter().map(|r| (r.actual, r.status)).collect();
        assert_eq!(
            actual,
            vec![
                (Verdict::Timeout, Status::Error),
                (Verdict::Error, Status::Error),
                (Verdict::Unsat, Status::Fail),
                (Verdict::Sat, Status::Pass),
            ]
        );
        assert_eq!((report.passed, report.failed, report.errored), (1, 1, 2));
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.records[2].details.as_deref(), Some("UNSAT\n"));
    }

    #[test]
    fn random_cases_are_valid_dimacs() {
        let cases = random_cases(3, None).unwrap();
        for (i, case) in cases.iter().enumerate() {
            assert_eq!(case.name, format!("random_{}", i + 1));
            assert_eq!(case.expected, Verdict::Unknown);
            let formula = dimacs::read_formula(&mut case.cnf.as_bytes()).unwrap();
            assert_eq!(formula.var_count, 10 + 10 * i);
            assert_eq!(formula.clauses.len(), 30 + 20 * i);
        }
        assert_eq!(random_cases(2, Some(1)).unwrap(), random_cases(2, Some(1)).unwrap());
    }

    #[test]
    fn corpus_run() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_unsat.cnf"), "c Expected: UNSAT\np cnf 1 2\n1 0\n-1 0\n").unwrap();
        fs::write(dir.path().join("a_sat.cnf"), "c Random 3-SAT\np cnf 2 1\n1 2 0\n").unwrap();
        fs::write(dir.path().join("c_plain.cnf"), "p cnf 1 1\n1 0\n").unwrap();
        fs::write(dir.path().join("d_broken.cnf"), "c Expected: SAT\np cnf 1 1\n5 0\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "c SAT\n").unwrap();

        let files = corpus_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a_sat.cnf", "b_unsat.cnf", "c_plain.cnf", "d_broken.cnf"]);

        let report = harness().run_corpus(&files, false);
        let statuses: Vec<_> = report.records.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [Status::Pass, Status::Pass, Status::Unknown, Status::Pass]
        );

        let report = harness().run_corpus(&files, true);
        assert_eq!(report.records[3].status, Status::Error);
        assert!(report.records[3]
            .details
            .as_deref()
            .is_some_and(|d| d.starts_with("malformed DIMACS")));
    }

    #[test]
    fn missing_corpus_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            corpus_files(&dir.path().join("nope")),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn solve_text() {
        let harness = harness();
        assert_eq!(
            harness.solve_text("p cnf 1 2\n1 0\n-1 0\n").unwrap(),
            SolveOutput {
                output: "UNSAT\n".into(),
                error: "warn\n".into(),
                return_code: Some(0),
            }
        );
        assert_eq!(
            harness.solve_text("c slow\np cnf 0 0\n").unwrap().return_code,
            None
        );
        assert!(matches!(
            harness.solve_text("  \n"),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn from_config_rejects_missing_solver() {
        let config = HarnessConfig {
            solver: PathBuf::from("/definitely/not/here/tinydpll"),
            ..HarnessConfig::default()
        };
        assert!(matches!(
            Harness::from_config(config),
            Err(Error::Configuration(_))
        ));
    }
}
