//! schemapress - Main Entry Point
//!
//! `bench` runs the compression methods over a corpus and writes JSON records,
//! `compress` prints the compressed form of a single schema.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use schemapress::benchmark::{BenchmarkConfig, BenchmarkHarness};
use schemapress::common::constants::{DEFAULT_DICTIONARY_ENTRIES, DEFAULT_TIMEOUT_SECS};
use schemapress::compression::{CompressionStats, Method, SchemaCompressor};
use schemapress::config::{Ablation, AblationSet, CompressorConfig};
use schemapress::schema::parser::parse_ddl;
use schemapress::LengthModel;

#[derive(Parser)]
#[command(name = "schemapress")]
#[command(about = "Compress relational schema descriptions for LLM prompts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Benchmark greedy and ILP compression over a corpus
    Bench(BenchArgs),
    /// Compress one DDL file and print the result
    Compress(CompressArgs),
}

#[derive(Args)]
struct AblationArgs {
    /// Solve without the greedy warm start
    #[arg(long)]
    nostart: bool,

    /// Solve without branching hints
    #[arg(long)]
    nohints: bool,

    /// Decide per element instead of per merged group
    #[arg(long)]
    nomerge: bool,
}

impl AblationArgs {
    fn to_set(&self) -> AblationSet {
        let mut set = AblationSet::new();
        if self.nostart {
            set.insert(Ablation::NoStart);
        }
        if self.nohints {
            set.insert(Ablation::NoHints);
        }
        if self.nomerge {
            set.insert(Ablation::NoMerge);
        }
        set
    }
}

#[derive(Args)]
struct BenchArgs {
    /// Directory of .sql files and Spider tables.json catalogs
    corpus: PathBuf,

    /// Time limit per case in seconds
    timeout_s: u64,

    /// Output JSON file
    out: PathBuf,

    #[command(flatten)]
    ablations: AblationArgs,

    /// Skip the ILP method
    #[arg(long)]
    noilp: bool,

    /// Run every combination of the ILP ablations
    #[arg(long)]
    sweep: bool,

    /// Worker threads (1 runs sequentially, 0 uses every core)
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Length metric: chars or tokens
    #[arg(long, default_value = "chars")]
    metric: LengthModel,

    /// Maximum mined dictionary entries
    #[arg(long, default_value_t = DEFAULT_DICTIONARY_ENTRIES)]
    entries: usize,
}

#[derive(Args)]
struct CompressArgs {
    /// DDL file with CREATE TABLE statements
    file: PathBuf,

    /// Compression method: verbatim, greedy or ilp
    #[arg(long, default_value = "ilp")]
    method: Method,

    /// Solver time limit in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    #[command(flatten)]
    ablations: AblationArgs,

    /// Length metric: chars or tokens
    #[arg(long, default_value = "chars")]
    metric: LengthModel,

    /// Print metrics as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "schemapress=debug" } else { "schemapress=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_bench(args: BenchArgs) -> anyhow::Result<()> {
    if args.timeout_s == 0 {
        bail!("timeout must be at least one second");
    }
    let mut ablations = args.ablations.to_set();
    if args.noilp {
        ablations.insert(Ablation::NoIlp);
    }
    let mut config = BenchmarkConfig::new(&args.corpus, &args.out)
        .with_timeout(Duration::from_secs(args.timeout_s))
        .with_ablations(ablations)
        .with_sweep(args.sweep)
        .with_threads(args.threads)
        .with_length_model(args.metric);
    config.max_dictionary_entries = args.entries;

    let (_, summary) = BenchmarkHarness::new(config)
        .run()
        .with_context(|| format!("benchmark over {} failed", args.corpus.display()))?;

    println!(
        "{} schemas, {} cases, {} failed, {} optimal",
        summary.schemas, summary.cases, summary.failed, summary.optimal
    );
    if let Some(ratio) = summary.mean_ratio {
        println!("mean compression ratio: {:.3}", ratio);
    }
    println!("records written to {}", args.out.display());
    Ok(())
}

fn run_compress(args: CompressArgs) -> anyhow::Result<()> {
    let ddl = std::fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    let name = args
        .file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "schema".to_string());
    let schema = parse_ddl(&name, &ddl)?;

    let config = CompressorConfig::default()
        .with_length_model(args.metric)
        .with_time_limit(Duration::from_secs(args.timeout))
        .with_ablations(args.ablations.to_set());
    let result = SchemaCompressor::new(config).compress(&schema, args.method)?;

    println!("{}", result.text);
    println!();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.metrics)?);
    } else {
        let metrics = &result.metrics;
        println!(
            "{} ({}): {} -> {} {} (ratio {:.3}, saved {:.1}%, {:.3}s{})",
            result.method,
            result.flags,
            metrics.original_length,
            metrics.compressed_length,
            metrics.length_model.name(),
            metrics.compression_ratio,
            metrics.space_savings(),
            metrics.seconds,
            if metrics.is_optimal { ", optimal" } else { "" }
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Bench(args) => run_bench(args),
        Command::Compress(args) => run_compress(args),
    };
    if let Err(e) = outcome {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
