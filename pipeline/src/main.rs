//! Binary entry point. Parses the CLI, initializes
//! structured logging, and dispatches into the orchestrator or one of the
//! read-only query helpers.
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pipeline::cli::{BuildArgs, Cli, Command, ListArtifactsArgs, RegionArgs};
use pipeline::config;
use pipeline::layout::RegionLayout;
use pipeline::orchestrator::Orchestrator;
use pipeline::params::BuildParams;
use pipeline::query;
use pipeline::types::{self, PipelineOptions, Region};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(message) => {
            error!(%message, "command failed");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, String> {
    match cli.command {
        Command::Build(args) => run_build(args).await,
        Command::Describe(args) => run_describe(args),
        Command::Footprint(args) => run_footprint(args),
        Command::ListArtifacts(args) => run_list_artifacts(args),
    }
}

fn metacache_for(region: &RegionArgs) -> Result<metacache::MetadataCache, String> {
    let layout = RegionLayout::new(&region.output_root, &region.region);
    let log_path = layout.region_dir().join("metacache.log");
    metacache::persist::load(&log_path).map_err(|e| e.to_string())
}

async fn run_build(args: BuildArgs) -> Result<ExitCode, String> {
    let products = args.resolve_products()?;
    let source_cloud = args.region.cloud.clone().ok_or_else(|| "--cloud is required for build".to_string())?;
    let region = Region::new(args.region.region.clone(), source_cloud);

    let cache = metacache_for(&args.region)?;
    let orchestrator = Orchestrator::new(&args.region.output_root, &region.name, cache);

    let file_config = config::load(args.config.as_deref())?;
    let mut options = PipelineOptions {
        clean_mode: args.clean,
        force_rebuild: args.force,
        ..PipelineOptions::default()
    };
    let mut params = BuildParams::default();
    file_config.apply(&mut params, &mut options);
    if let Some(v) = args.resolution_m {
        options.resolution_m = v;
    }
    if let Some(v) = args.node_timeout_secs {
        options.node_timeout_secs = v;
    }
    if let Some(v) = args.max_retries {
        options.max_retries = v;
    }
    if args.degrade_to_standard_on_empty_footprint {
        options.degrade_to_standard_on_empty_footprint = true;
    }
    let cancel = CancellationToken::new();

    info!(region = %region.name, products = ?products, clean = options.clean_mode, "starting build");
    let report = orchestrator.build(&region, &products, &params, &options, &cancel).await.map_err(|e| e.to_string())?;

    println!("{}", serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?);
    Ok(if report.all_done() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn run_describe(args: RegionArgs) -> Result<ExitCode, String> {
    let source_cloud = args.cloud.clone().ok_or_else(|| "--cloud is required for describe".to_string())?;
    let region = Region::new(args.region.clone(), source_cloud);
    let layout = RegionLayout::new(&args.output_root, &args.region);
    let cache = metacache_for(&args)?;

    let description = query::describe_region(&region, &layout, &cache).map_err(|e| e.to_string())?;
    println!("{}", serde_json::to_string_pretty(&description).map_err(|e| e.to_string())?);
    Ok(ExitCode::SUCCESS)
}

fn run_footprint(args: RegionArgs) -> Result<ExitCode, String> {
    let layout = RegionLayout::new(&args.output_root, &args.region);
    match query::region_footprint(&layout) {
        Some(path) => {
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("null");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_list_artifacts(args: ListArtifactsArgs) -> Result<ExitCode, String> {
    let layout = RegionLayout::new(&args.region.output_root, &args.region.region);
    let filter = match args.product.as_deref() {
        Some(name) => Some(types::ProductKind::parse(name).ok_or_else(|| format!("unknown product '{name}'"))?),
        None => None,
    };
    let artifacts = query::list_artifacts(&layout, filter).map_err(|e| e.to_string())?;
    println!("{}", serde_json::to_string_pretty(&artifacts).map_err(|e| e.to_string())?);
    Ok(ExitCode::SUCCESS)
}
