//! CLI tool to filter a record file using the single-threaded executor.

use clap::Parser;
use filter_pipeline::{EvenNumber, SkipPolicy};
use serial_pipe::run_serial;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

/// Filter a record file on one thread.
///
/// Produces the same table as filter-run, up to the order of records that
/// share a number.
#[derive(Parser)]
#[command(name = "filter-run-serial")]
struct Cli {
    /// Input data file (`label;number;value` per line)
    input: PathBuf,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Field delimiter
    #[arg(short, long, default_value_t = ';')]
    delimiter: char,

    /// Show paths and record counts on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let input = match File::open(&cli.input) {
        Ok(file) => BufReader::new(file),
        Err(e) => {
            eprintln!("Error reading input file '{}': {e}", cli.input.display());
            process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!("Input:    {}", cli.input.display());
        eprintln!(
            "Output:   {}",
            cli.output
                .as_deref()
                .map_or("(stdout)".into(), |p| p.display().to_string())
        );
        eprintln!("Executor: serial");
    }

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => match create_output(path) {
            Ok(file) => Box::new(BufWriter::new(file)),
            Err(e) => {
                eprintln!("Error writing output file '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => Box::new(io::stdout().lock()),
    };

    match run_serial(input, &mut out, &EvenNumber, cli.delimiter, SkipPolicy::AllBlank) {
        Ok((input_count, output_count)) => {
            if cli.verbose {
                eprintln!("Records:  {input_count} in -> {output_count} out");
            }
        }
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            process::exit(1);
        }
    }
}

fn create_output(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    File::create(path)
}
