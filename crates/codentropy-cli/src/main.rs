//! codentropy — batch NIST-style randomness audits for base-32 codes.

mod ingest;
mod render;

use std::path::PathBuf;

use clap::Parser;
use codentropy_core::{
    BatchConfig, DEFAULT_ALPHA, DEFAULT_CHUNK_SIZE, DEFAULT_PROGRESS_EVERY,
    analyze_all_with_progress, default_worker_count,
};

#[derive(Parser)]
#[command(name = "codentropy")]
#[command(about = "Batch-analyze codes with a NIST-style randomness test battery")]
#[command(version = codentropy_core::VERSION)]
struct Cli {
    /// Input CSV file containing codes (one or many per row)
    input_file: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "summary", value_parser = ["json", "csv", "summary"])]
    format: String,

    /// Number of parallel workers (default: half of the CPUs)
    #[arg(short = 'p', long = "processes")]
    processes: Option<usize>,

    /// Optional limit on the number of codes to analyze
    #[arg(short, long)]
    limit: Option<usize>,

    /// Print progress every N codes (0 disables)
    #[arg(long, default_value_t = DEFAULT_PROGRESS_EVERY)]
    progress_every: usize,

    /// Codes per dispatched chunk
    #[arg(long = "chunksize", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Significance threshold shared by every test
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    alpha: f64,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    println!("Reading codes from {}...", cli.input_file.display());
    let codes = match ingest::read_codes(&cli.input_file, cli.limit) {
        Ok(codes) => codes,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", cli.input_file.display());
            std::process::exit(1);
        }
    };
    let total = codes.len();
    log::debug!("ingested {total} codes from {}", cli.input_file.display());
    if cli.limit.is_some() {
        println!("✓ Loaded {total} codes (limited)\n");
    } else {
        println!("✓ Loaded {total} codes\n");
    }

    let workers = cli.processes.unwrap_or_else(default_worker_count).max(1);
    if workers > 1 {
        println!("Analyzing with {workers} workers...");
    } else {
        println!("Analyzing sequentially...");
    }

    let config = BatchConfig {
        alpha: cli.alpha,
        workers,
        chunk_size: cli.chunk_size.max(1),
        progress_every: cli.progress_every,
    };
    let records = match analyze_all_with_progress(&codes, &config, |done| {
        let pct = 100.0 * done as f64 / total as f64;
        println!("  Progress: {done} / {total} ({pct:.1}%)");
    }) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    println!("✓ Analysis complete: {} codes processed\n", records.len());

    let rendered = match cli.format.as_str() {
        "json" => render::json(&records),
        "csv" => render::csv(&records),
        _ => render::summary(&records, cli.alpha),
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &rendered) {
                eprintln!("Failed to write {}: {e}", path.display());
                std::process::exit(1);
            }
            println!("✓ Results saved to {}", path.display());
        }
        None => println!("{rendered}"),
    }
}
