//! Aggregate DMR++ shard documents into a single document.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::{LevelFilter, debug};

use dmrpp_agg::storage::{load_allow_list, resolve_locations};
use dmrpp_agg::{Aggregation, AggregationSpec, Aggregator, JoinMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AggType {
    JoinNew,
    JoinExisting,
}

impl From<AggType> for JoinMode {
    fn from(value: AggType) -> Self {
        match value {
            AggType::JoinNew => JoinMode::JoinNew,
            AggType::JoinExisting => JoinMode::JoinExisting,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dmrpp_agg", version)]
#[command(about = "Aggregate the chunk metadata of DMR++ shards along a new or existing dimension")]
struct Args {
    /// Aggregation type
    #[arg(short = 't', long = "agg-type", value_enum)]
    agg_type: Option<AggType>,

    /// Name of the new dimension (join-new) or of the dimension to extend (join-existing)
    #[arg(short = 'n', long = "dim-name")]
    dim_name: Option<String>,

    /// File listing the variables to keep, one FQN per line
    #[arg(short = 'v', long = "variables-file")]
    variables_file: Option<PathBuf>,

    /// JSON aggregation config; the other options override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mark every aggregated chunk URL as trusted
    #[arg(long)]
    trust: bool,

    /// Write the aggregated document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a JSON summary of the aggregation here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Shard documents in aggregation order. A single argument may also be a
    /// directory or a file listing one location per line.
    #[arg(required = true)]
    shards: Vec<String>,
}

impl Args {
    fn spec(&self) -> dmrpp_agg::Result<AggregationSpec> {
        let mut spec = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => AggregationSpec::default(),
        };
        if let Some(agg_type) = self.agg_type {
            spec.mode = agg_type.into();
        }
        if let Some(name) = &self.dim_name {
            spec.dimension_name = name.clone();
        }
        if let Some(path) = &self.variables_file {
            spec.variable_allow_list = Some(load_allow_list(path)?);
        }
        spec.trust_urls |= self.trust;
        Ok(spec)
    }
}

fn run(args: &Args) -> dmrpp_agg::Result<()> {
    let spec = args.spec()?;
    debug!("aggregation config: {}", serde_json::to_string(&spec)?);
    let locations = resolve_locations(&args.shards)?;
    let aggregation = Aggregator::new(spec).try_aggregate(locations.iter().map(|l| l.load()))?;
    write_document(&aggregation, args.output.as_deref())?;
    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_string_pretty(&aggregation.summary)?)?;
    }
    Ok(())
}

fn write_document(aggregation: &Aggregation, output: Option<&Path>) -> dmrpp_agg::Result<()> {
    match output {
        Some(path) => {
            let mut file = io::BufWriter::new(fs::File::create(path)?);
            dmrpp_agg::xml::write(&aggregation.tree, &mut file)?;
            file.flush()?;
            Ok(())
        }
        None => {
            let mut stdout = io::stdout().lock();
            dmrpp_agg::xml::write(&aggregation.tree, &mut stdout)?;
            writeln!(stdout)?;
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    if args.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dmrpp_agg: {e}");
            ExitCode::FAILURE
        }
    }
}
