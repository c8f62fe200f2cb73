//! CLI tool to filter a delimited record file through the worker pool.
//!
//! Usage:
//!   filter-run <input.txt>
//!   filter-run <input.txt> -o <result.txt> -w 6
//!
//! If no output file is specified, writes to stdout. `-` reads stdin.

use clap::{Parser, ValueEnum};
use filter_pipeline::{InputSource, OutputSink, Pipeline, PipelineConfig, SkipPolicy, WorkerPool};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Which records are left out of the result table.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SkipArg {
    /// Omit records with an empty label and zero number and value
    AllBlank,
    /// Omit records with an empty label, or zero number and value
    AnyBlank,
}

impl From<SkipArg> for SkipPolicy {
    fn from(arg: SkipArg) -> Self {
        match arg {
            SkipArg::AllBlank => SkipPolicy::AllBlank,
            SkipArg::AnyBlank => SkipPolicy::AnyBlank,
        }
    }
}

/// Keep the even-numbered records of a `label;number;value` file, sorted by
/// number.
#[derive(Parser)]
#[command(name = "filter-run")]
struct Cli {
    /// Input data file (`label;number;value` per line, or - for stdin)
    input: String,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of pool workers (default: available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Buffer capacity is the loaded record count divided by this
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CAPACITY_DIVISOR)]
    capacity_divisor: usize,

    /// Field delimiter
    #[arg(short, long, default_value_t = ';')]
    delimiter: char,

    /// Which records to leave out of the table
    #[arg(long, value_enum, default_value_t = SkipArg::AllBlank)]
    skip_policy: SkipArg,

    /// Stop the workers after this many milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Show paths, stage transitions, and record counts on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> PipelineConfig {
        let input = if self.input == "-" {
            InputSource::Stdin
        } else {
            InputSource::Path(PathBuf::from(&self.input))
        };
        let output = match &self.output {
            Some(path) => OutputSink::Path(path.clone()),
            None => OutputSink::Stdout,
        };

        let mut config = PipelineConfig::new(input, output);
        config.workers = self.workers.unwrap_or_else(WorkerPool::default_size);
        config.capacity_divisor = self.capacity_divisor;
        config.delimiter = self.delimiter;
        config.skip_policy = self.skip_policy.into();
        config.drain_deadline = self.deadline_ms.map(Duration::from_millis);
        config
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,filter_pipeline=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config();
    if cli.verbose {
        eprintln!("Input:    {}", config.input.name());
        eprintln!("Output:   {}", config.output.name());
        eprintln!("Workers:  {}", config.workers);
    }

    let mut pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            process::exit(1);
        }
    };

    match pipeline.run() {
        Ok(report) => {
            if cli.verbose {
                eprintln!(
                    "Records:  {} in -> {} matched -> {} out",
                    report.loaded, report.matched, report.written
                );
            }
            if report.stopped_early {
                eprintln!("Warning: drain deadline reached, results are partial");
            }
        }
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            process::exit(1);
        }
    }
}
