use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
    process,
    time::Duration,
};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use satcheck::{
    config::{FileConfig, HarnessConfig},
    generator::{self, GeneratorParams},
    harness::{self, Harness},
    io as dimacs, path,
};

#[derive(Parser)]
#[command(version, about = "Random CNF generation and differential testing of a SAT solver")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate random DIMACS CNF files.
    Generate(GenerateArgs),
    /// Run the solver on built-in and random formulas.
    Test {
        #[command(flatten)]
        solver: SolverArgs,
        /// Number of random formulas to add to the built-in cases.
        #[arg(long, default_value_t = 5)]
        random: usize,
        /// Base seed for the random formulas.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run the solver on every CNF file in a directory.
    Check {
        #[command(flatten)]
        solver: SolverArgs,
        #[arg(default_value = "tests/cnf")]
        dir: PathBuf,
        /// Report files that are not valid DIMACS as errors instead of
        /// running the solver on them.
        #[arg(long)]
        validate: bool,
    },
    /// Run the solver once and print its raw output as JSON.
    Solve {
        #[command(flatten)]
        solver: SolverArgs,
        /// CNF file to solve, `-` for stdin.
        #[arg(default_value = "-")]
        input: String,
    },
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long, default_value_t = 50)]
    vars: usize,
    #[arg(long, default_value_t = 200)]
    clauses: usize,
    #[arg(long, default_value_t = 2)]
    min_clause_length: usize,
    #[arg(long, default_value_t = 4)]
    max_clause_length: usize,
    /// Random seed for reproducibility; file `i` uses `seed + i`.
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path, only used when generating a single file.
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long, default_value_t = 1)]
    count: usize,
    #[arg(long, default_value = "tests/cnf")]
    output_dir: PathBuf,
}

#[derive(Args)]
struct SolverArgs {
    /// Solver binary, invoked as `SOLVER <file.cnf>`.
    #[arg(long)]
    solver: Option<PathBuf>,
    /// Per-invocation timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
    /// Characters of solver output shown for failing cases.
    #[arg(long)]
    preview_len: Option<usize>,
    /// TOML file with `solver`, `timeout_secs` and `preview_len` keys.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl SolverArgs {
    fn resolve(self, base: HarnessConfig) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => base.merge(FileConfig::load(path)?),
            None => base,
        };
        if let Some(solver) = self.solver {
            config.solver = solver;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(preview_len) = self.preview_len {
            config.preview_len = preview_len;
        }
        Ok(config)
    }
}

fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    if args.output.is_some() && args.count != 1 {
        log::warn!("--output is ignored when generating {} files", args.count);
    }

    for i in 0..args.count {
        let params = GeneratorParams {
            var_count: args.vars,
            clause_count: args.clauses,
            min_clause_len: args.min_clause_length,
            max_clause_len: args.max_clause_length,
            seed: args.seed.map(|seed| seed.wrapping_add(i as u64)),
        };
        let formula = generator::generate(&params)?;

        let filepath = match &args.output {
            Some(output) if args.count == 1 => output.clone(),
            _ => {
                let base_name = if args.count > 1 {
                    format!("random_{}_{}_{}", args.vars, args.clauses, i + 1)
                } else {
                    format!("random_{}_{}", args.vars, args.clauses)
                };
                path::unique_path(&args.output_dir, &base_name)
            }
        };

        let mut file = fs::File::create(&filepath)
            .with_context(|| format!("creating {}", filepath.display()))?;
        dimacs::write_formula(&mut file, &formula, &generator::default_comments(&params))
            .with_context(|| format!("writing {}", filepath.display()))?;

        println!("Generated: {}", filepath.display());
        println!(
            "  Variables: {}, Clauses: {}",
            formula.var_count,
            formula.clauses.len()
        );
    }
    Ok(())
}

fn print_header(config: &HarnessConfig, count: usize, what: &str) {
    println!(
        "Running {} on {} {}...\n",
        config.solver.display(),
        count,
        what
    );
    println!("{}", "=".repeat(harness::report::RULE_WIDTH));
}

fn main() -> anyhow::Result<()> {
    let _ = env_logger::try_init();
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Generate(args) => return generate(args),
        Command::Test {
            solver,
            random,
            seed,
        } => {
            let harness = Harness::from_config(solver.resolve(HarnessConfig::default())?)?;
            let cases = harness::builtin_cases(random, seed)?;
            print_header(harness.config(), cases.len(), "tests");
            (harness.run_cases(&cases), harness.config().preview_len)
        }
        Command::Check {
            solver,
            dir,
            validate,
        } => {
            let harness = Harness::from_config(solver.resolve(HarnessConfig::default())?)?;
            let files = harness::corpus_files(&dir)?;
            if files.is_empty() {
                println!("No CNF files found in {}", dir.display());
                return Ok(());
            }
            print_header(harness.config(), files.len(), "test files");
            (
                harness.run_corpus(&files, validate),
                harness.config().preview_len,
            )
        }
        Command::Solve { solver, input } => {
            let harness = Harness::from_config(solver.resolve(HarnessConfig::web())?)?;
            let cnf = if input == "-" {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text)?;
                text
            } else {
                fs::read_to_string(&input).with_context(|| format!("reading {input}"))?
            };
            let output = harness.solve_text(&cnf)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }
    };

    let (report, preview_len) = report;
    report.write(&mut io::stdout().lock(), preview_len)?;
    process::exit(report.exit_code());
}
