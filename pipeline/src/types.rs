/// Core orchestrator vocabulary: the DAG node catalog, the
/// standard/clean mode switch, and the build report every `build()` call
/// returns regardless of partial failure.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A region is an opaque display name bound to exactly one source cloud
/// path. The orchestrator never mutates `source_cloud`;
/// re-pointing a region at a different cloud is a new region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub source_cloud: PathBuf,
}

impl Region {
    pub fn new(name: impl Into<String>, source_cloud: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), source_cloud: source_cloud.into() }
    }
}

/// One DAG node kind. `Density`/`Mask`/`Footprint`/`Crop` are internal —
/// reachable only through clean-mode re-entry — everything else is a
/// directly requestable terminal or intermediate product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductKind {
    Density,
    Mask,
    Footprint,
    Crop,
    Dtm,
    Dsm,
    Chm,
    Slope,
    Aspect,
    Hillshade,
    Tpi,
    Tri,
    Roughness,
    Svf,
    Lrm,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Density => "density",
            ProductKind::Mask => "mask",
            ProductKind::Footprint => "footprint",
            ProductKind::Crop => "crop",
            ProductKind::Dtm => "dtm",
            ProductKind::Dsm => "dsm",
            ProductKind::Chm => "chm",
            ProductKind::Slope => "slope",
            ProductKind::Aspect => "aspect",
            ProductKind::Hillshade => "hillshade",
            ProductKind::Tpi => "tpi",
            ProductKind::Tri => "tri",
            ProductKind::Roughness => "roughness",
            ProductKind::Svf => "svf",
            ProductKind::Lrm => "lrm",
        }
    }

    /// Direct dependencies within the same mode.
    pub fn dependencies(&self) -> &'static [ProductKind] {
        match self {
            ProductKind::Density => &[],
            ProductKind::Mask => &[ProductKind::Density],
            ProductKind::Footprint => &[ProductKind::Mask],
            ProductKind::Crop => &[ProductKind::Footprint],
            ProductKind::Dtm => &[],
            ProductKind::Dsm => &[],
            ProductKind::Chm => &[ProductKind::Dsm, ProductKind::Dtm],
            ProductKind::Slope
            | ProductKind::Aspect
            | ProductKind::Hillshade
            | ProductKind::Tpi
            | ProductKind::Tri
            | ProductKind::Roughness
            | ProductKind::Svf
            | ProductKind::Lrm => &[ProductKind::Dtm],
        }
    }

    /// Whether this product has a PNG renderer. Density, mask, footprint,
    /// and crop are internal plumbing, not terminal products, and are never
    /// rendered.
    pub fn is_rendered(&self) -> bool {
        !matches!(self, ProductKind::Density | ProductKind::Mask | ProductKind::Footprint | ProductKind::Crop)
    }

    pub fn output_subdir(&self) -> &'static str {
        match self {
            ProductKind::Density => "density",
            ProductKind::Mask => "density/masks",
            ProductKind::Footprint => "vectors",
            ProductKind::Crop => "cropped",
            other => other.as_str(),
        }
    }

    /// Inverse of `as_str`, for CLI product lists and manifest scans that
    /// only have the string form on hand.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "density" => ProductKind::Density,
            "mask" => ProductKind::Mask,
            "footprint" => ProductKind::Footprint,
            "crop" => ProductKind::Crop,
            "dtm" => ProductKind::Dtm,
            "dsm" => ProductKind::Dsm,
            "chm" => ProductKind::Chm,
            "slope" => ProductKind::Slope,
            "aspect" => ProductKind::Aspect,
            "hillshade" => ProductKind::Hillshade,
            "tpi" => ProductKind::Tpi,
            "tri" => ProductKind::Tri,
            "roughness" => ProductKind::Roughness,
            "svf" => ProductKind::Svf,
            "lrm" => ProductKind::Lrm,
            _ => return None,
        })
    }

    /// Every directly requestable product kind, in catalog order. Excludes
    /// the internal footprint-chain nodes (`Density`/`Mask`/`Footprint`/
    /// `Crop`), which a caller only ever reaches through clean-mode re-entry.
    pub fn requestable() -> &'static [ProductKind] {
        &[
            ProductKind::Dtm,
            ProductKind::Dsm,
            ProductKind::Chm,
            ProductKind::Slope,
            ProductKind::Aspect,
            ProductKind::Hillshade,
            ProductKind::Tpi,
            ProductKind::Tri,
            ProductKind::Roughness,
            ProductKind::Svf,
            ProductKind::Lrm,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Standard,
    Clean,
}

impl Mode {
    /// Basename discriminator: clean-mode outputs carry a `_clean` suffix
    /// on basenames, not a separate directory.
    pub fn suffix(&self) -> &'static str {
        match self {
            Mode::Standard => "",
            Mode::Clean => "_clean",
        }
    }
}

/// `(region, product_kind, parameters, mode)` identifies one build request.
/// `parameters` is deferred to `crate::params::ProducerParams` so this
/// struct stays generic over every product kind.
#[derive(Debug, Clone)]
pub struct ProductRequest {
    pub product: ProductKind,
    pub mode: Mode,
}

impl ProductRequest {
    pub fn standard(product: ProductKind) -> Self {
        Self { product, mode: Mode::Standard }
    }

    pub fn clean(product: ProductKind) -> Self {
        Self { product, mode: Mode::Clean }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub clean_mode: bool,
    /// When a clean-mode node is blocked because `Crop` failed with
    /// `EmptyFootprint`, resolve it using its already-built standard-mode
    /// sibling instead of leaving it blocked. Defaults to false: the clean
    /// branch fails outright and only the standard branch's own artifacts
    /// are reported.
    pub degrade_to_standard_on_empty_footprint: bool,
    pub resolution_m: f64,
    pub force_rebuild: bool,
    pub node_timeout_secs: u64,
    pub max_retries: u32,
    pub worker_pool_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            clean_mode: false,
            degrade_to_standard_on_empty_footprint: false,
            resolution_m: 1.0,
            force_rebuild: false,
            node_timeout_secs: 600,
            max_retries: 2,
            worker_pool_size: num_cpus::get(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Pending,
    Running,
    Done,
    Failed,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeReport {
    pub product: ProductKind,
    pub mode: Mode,
    pub fingerprint: String,
    pub state: NodeState,
    pub cause: Option<String>,
    pub artifact_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildReport {
    pub region: String,
    pub nodes: Vec<NodeReport>,
}

impl BuildReport {
    pub fn all_done(&self) -> bool {
        self.nodes.iter().all(|n| n.state == NodeState::Done)
    }
}
