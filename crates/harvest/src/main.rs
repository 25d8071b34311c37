use clap::{Parser, Subcommand};
use harvest_engine::backend::FetchBackend;
use harvest_engine::config::{ConfigLoader, HarvestConfig};
use harvest_engine::merge;
use harvest_engine::pipeline::{Pipeline, RunSummary};
use harvest_engine::queue::TargetQueue;
use harvest_engine::store::{self, RecordStore};
use harvest_fly::FlyBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "harvest", version, about = "Three-pass product page harvester")]
struct Args {
    /// Config file (defaults to ./harvest.yaml, then ~/.harvest/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every address in the input file and write the merged results
    Run {
        /// JSON file with `{"urls": [...]}` or a bare array of addresses
        #[arg(long)]
        input: PathBuf,
        /// Output directory (overrides output.dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Re-merge the per-pass record files already in the output directory
    Merge {
        /// Input file, used to fix the target count
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Print the remaining credits on the fetch-service account
    Credits,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries only command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };

    match args.command {
        Command::Run { input, out_dir } => run(&config, &input, out_dir).await?,
        Command::Merge { input, out_dir } => remerge(&config, input.as_deref(), out_dir).await?,
        Command::Credits => {
            let backend = FlyBackend::new(&config.service)?;
            let remaining = backend.remaining_credits().await?;
            println!("{}", remaining);
        }
    }
    Ok(())
}

fn output_store(config: &HarvestConfig, out_dir: Option<PathBuf>) -> RecordStore {
    RecordStore::new(out_dir.unwrap_or_else(|| config.output.dir.clone()))
}

async fn run(
    config: &HarvestConfig,
    input: &Path,
    out_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Fail before any pass starts when there is no credential.
    let backend: Arc<dyn FetchBackend> = Arc::new(FlyBackend::new(&config.service)?);

    let addresses = store::load_addresses(input).await?;
    let queue = TargetQueue::from_addresses(&addresses);
    if queue.is_empty() {
        warn!("No fetchable addresses in {}", input.display());
        return Ok(());
    }
    info!("Loaded {} target(s) from {}", queue.len(), input.display());

    let pipeline = Pipeline::from_config(config, backend.clone())?;
    let store = output_store(config, out_dir);
    let report = pipeline
        .run_to_store(&queue, &store, config.output.audit)
        .await?;

    let summary = report.summary();
    info!("{}", summary);
    if !report.merged.missing.is_empty() {
        error!(
            "{} target(s) have no record in any pass: {:?}",
            report.merged.missing.len(),
            report.merged.missing
        );
    }
    match backend.remaining_credits().await {
        Ok(remaining) => info!("Credits left after run: {}", remaining),
        Err(e) => warn!("Could not read remaining credits: {}", e),
    }
    println!("{}", summary);
    Ok(())
}

async fn remerge(
    config: &HarvestConfig,
    input: Option<&Path>,
    out_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = output_store(config, out_dir);
    let [pass1, pass2, pass3] = store.load_pass_records().await?;

    let total = match input {
        Some(path) => TargetQueue::from_addresses(&store::load_addresses(path).await?).total(),
        None => pass1
            .iter()
            .chain(&pass2)
            .chain(&pass3)
            .map(|r| r.index)
            .max()
            .unwrap_or(0),
    };

    let merged = merge::merge(&pass1, &pass2, &pass3, total);
    store.save_merge(&merged).await?;
    let summary = RunSummary::from_merge(&merged);
    info!("Merged from {}: {}", store.dir().display(), summary);
    println!("{}", summary);
    Ok(())
}
