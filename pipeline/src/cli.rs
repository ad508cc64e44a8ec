/// Command-line surface over `Orchestrator::build` and the read-only query
/// helpers. One `clap` derive struct per subcommand, kept thin: argument
/// parsing and wiring only, no orchestration logic lives here.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::params::BuildParams;
use crate::types::ProductKind;

#[derive(Parser, Debug)]
#[command(name = "pipeline", version, about = "LiDAR point-cloud-to-raster anomaly-detection pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build one or more products for a region, reusing fresh artifacts.
    Build(BuildArgs),
    /// Print a region's bounds, CRS, point count, and artifact summary.
    Describe(RegionArgs),
    /// Print the path to a region's standard-mode footprint, if it exists.
    Footprint(RegionArgs),
    /// List artifacts already built for a region, optionally by product.
    ListArtifacts(ListArtifactsArgs),
}

#[derive(Args, Debug)]
pub struct RegionArgs {
    /// Display name for the region; also the output subdirectory name.
    #[arg(long)]
    pub region: String,
    /// Root directory under which every region's output tree lives.
    #[arg(long, default_value = "./output")]
    pub output_root: PathBuf,
    /// Source LAS/LAZ point cloud. Required unless the region's metadata
    /// has already been cached by a prior `build`/`describe` call.
    #[arg(long)]
    pub cloud: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListArtifactsArgs {
    #[command(flatten)]
    pub region: RegionArgs,
    /// Restrict the listing to one product kind (e.g. `dtm`, `hillshade`).
    #[arg(long)]
    pub product: Option<String>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub region: RegionArgs,
    /// Products to build, by name (e.g. `dtm slope hillshade`). Omitting
    /// this builds every requestable product.
    #[arg(long = "product", value_name = "PRODUCT")]
    pub products: Vec<String>,
    /// Crop to the validity footprint first and rebuild every requested
    /// product from the cropped cloud (clean-mode re-entry).
    #[arg(long)]
    pub clean: bool,
    /// Rebuild even if a fresh artifact already exists.
    #[arg(long)]
    pub force: bool,
    /// In clean mode, resolve a node blocked by an empty footprint using its
    /// already-built standard-mode sibling instead of leaving it blocked.
    #[arg(long)]
    pub degrade_to_standard_on_empty_footprint: bool,
    /// Optional TOML file supplying defaults for any flag below that isn't
    /// passed explicitly. An explicit flag always wins over the file, and
    /// the file always wins over this binary's built-in defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Output grid resolution, in meters per pixel. Falls back to the config
    /// file, then to 1.0.
    #[arg(long)]
    pub resolution_m: Option<f64>,
    /// Falls back to the config file, then to 600.
    #[arg(long)]
    pub node_timeout_secs: Option<u64>,
    /// Falls back to the config file, then to 2.
    #[arg(long)]
    pub max_retries: Option<u32>,
}

impl BuildArgs {
    /// Resolves `--product` names into `ProductKind`s, defaulting to the
    /// full requestable catalog when none were given. Returns the first
    /// unrecognized name as `Err` so the CLI can report it before any work
    /// starts, rather than failing mid-build on a typo.
    pub fn resolve_products(&self) -> Result<Vec<ProductKind>, String> {
        if self.products.is_empty() {
            return Ok(ProductKind::requestable().to_vec());
        }
        self.products
            .iter()
            .map(|name| ProductKind::parse(name).ok_or_else(|| format!("unknown product '{name}'")))
            .collect()
    }
}
