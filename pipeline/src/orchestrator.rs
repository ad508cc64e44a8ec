/// DAG execution. `build()` is the one entry point the
/// CLI and the test harness both call: resolve the DAG, fingerprint
/// bottom-up, skip what's already fresh, run everything else through a
/// per-fingerprint lock with bounded retries and a node timeout, and
/// render every terminal raster's PNGs along the way.
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use geo_primitives::PipelineError;
use metacache::MetadataCache;
use pointcloud::PointCloud;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dag;
use crate::layout::RegionLayout;
use crate::lock::FingerprintLocks;
use crate::manifest::{self, InputRef, Manifest};
use crate::params::{canonical_params_for, BuildParams};
use crate::producers;
use crate::types::{BuildReport, Mode, NodeReport, NodeState, PipelineOptions, ProductKind, Region};

/// Which mode a node's own artifact is built under. The footprint chain
/// (density -> mask -> footprint) always runs once, against the original
/// cloud; `Crop`'s output *is* the clean cloud and so is always the
/// `Clean`-suffixed artifact; everything else follows the caller's
/// `clean_mode` switch: clean-mode re-entry only changes which cloud
/// downstream nodes read from, not the footprint chain itself.
fn node_mode(product: ProductKind, clean_mode: bool) -> Mode {
    match product {
        ProductKind::Density | ProductKind::Mask | ProductKind::Footprint => Mode::Standard,
        ProductKind::Crop => Mode::Clean,
        _ => {
            if clean_mode {
                Mode::Clean
            } else {
                Mode::Standard
            }
        }
    }
}

/// The cloud a node reads points from. Footprint-chain nodes always read
/// the region's original cloud; everything downstream of a clean-mode
/// build reads the cropped cloud the `Crop` node just produced, which is
/// the re-entry this module is named after.
fn effective_cloud_path(product: ProductKind, region: &Region, layout: &RegionLayout, clean_mode: bool) -> PathBuf {
    match product {
        ProductKind::Density | ProductKind::Mask | ProductKind::Footprint | ProductKind::Crop => region.source_cloud.clone(),
        _ if clean_mode => layout.cropped_cloud_path(Mode::Clean),
        _ => region.source_cloud.clone(),
    }
}

fn render_product_for(product: ProductKind) -> Option<render::Product> {
    Some(match product {
        ProductKind::Dtm => render::Product::Dtm,
        ProductKind::Dsm => render::Product::Dsm,
        ProductKind::Chm => render::Product::Chm,
        ProductKind::Slope => render::Product::Slope,
        ProductKind::Aspect => render::Product::Aspect,
        ProductKind::Hillshade => render::Product::Hillshade,
        ProductKind::Svf => render::Product::Svf,
        ProductKind::Lrm => render::Product::Lrm,
        ProductKind::Tpi => render::Product::Tpi,
        ProductKind::Tri => render::Product::Tri,
        ProductKind::Roughness => render::Product::Roughness,
        ProductKind::Density | ProductKind::Mask | ProductKind::Footprint | ProductKind::Crop => return None,
    })
}

pub struct Orchestrator {
    layout: RegionLayout,
    locks: FingerprintLocks,
    metacache: MetadataCache,
    render_registry: render::RenderedPaths,
}

impl Orchestrator {
    pub fn new(output_root: impl AsRef<std::path::Path>, region_name: &str, metacache: MetadataCache) -> Self {
        Self {
            layout: RegionLayout::new(output_root, region_name),
            locks: FingerprintLocks::new(),
            metacache,
            render_registry: render::RenderedPaths::new(),
        }
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    /// Runs every requested product to completion (or failure/blocked),
    /// returning a report for each resolved DAG node regardless of
    /// whether the overall build fully succeeded.
    ///
    /// The standard branch always runs first, independent of
    /// `options.clean_mode`: its artifacts must exist on their own, not only
    /// as a side effect of a clean-mode build that happens to share some of
    /// the same DAG nodes. When `clean_mode` is set, the crop-chain re-entry
    /// runs as a second pass against the same fingerprint table, so a
    /// fingerprint computed for a footprint-chain node in the first pass is
    /// reused (and found fresh) rather than recomputed in the second.
    pub async fn build(
        &self,
        region: &Region,
        requested: &[ProductKind],
        params: &BuildParams,
        options: &PipelineOptions,
        cancel: &CancellationToken,
    ) -> Result<BuildReport, PipelineError> {
        std::fs::create_dir_all(self.layout.manifests_dir()).map_err(|e| PipelineError::IoTransient(e.to_string()))?;
        std::fs::create_dir_all(self.layout.png_dir()).map_err(|e| PipelineError::IoTransient(e.to_string()))?;

        let mut fingerprints: HashMap<ProductKind, String> = HashMap::new();
        let mut standard_artifacts: HashMap<ProductKind, PathBuf> = HashMap::new();

        let standard_order = dag::resolve(requested, false)?;
        let standard_nodes = self
            .run_pass(region, &standard_order, false, params, options, cancel, &mut fingerprints)
            .await?;
        for report in &standard_nodes {
            if report.state == NodeState::Done {
                if let Some(path) = &report.artifact_path {
                    standard_artifacts.insert(report.product, path.clone());
                }
            }
        }
        let mut nodes = standard_nodes;

        if options.clean_mode {
            let clean_order = dag::resolve(requested, true)?;
            let mut clean_nodes = self
                .run_pass(region, &clean_order, true, params, options, cancel, &mut fingerprints)
                .await?;

            if options.degrade_to_standard_on_empty_footprint {
                for report in &mut clean_nodes {
                    if report.state != NodeState::Blocked {
                        continue;
                    }
                    if let Some(standard_path) = standard_artifacts.get(&report.product) {
                        info!(product = report.product.as_str(), "degrading clean-mode node to its standard-mode sibling");
                        report.state = NodeState::Done;
                        report.cause = Some(format!(
                            "degraded to standard-mode artifact: {}",
                            report.cause.clone().unwrap_or_default()
                        ));
                        report.artifact_path = Some(standard_path.clone());
                    }
                }
            }
            nodes.extend(clean_nodes);
        }

        Ok(BuildReport { region: region.name.clone(), nodes })
    }

    /// Runs one DAG pass (standard or clean) to completion, returning a
    /// report per resolved node. `fingerprints` is shared across passes so a
    /// node common to both (the footprint chain) is fingerprinted once and
    /// found fresh, not recomputed, on its second visit.
    #[allow(clippy::too_many_arguments)]
    async fn run_pass(
        &self,
        region: &Region,
        order: &[ProductKind],
        pass_clean_mode: bool,
        params: &BuildParams,
        options: &PipelineOptions,
        cancel: &CancellationToken,
        fingerprints: &mut HashMap<ProductKind, String>,
    ) -> Result<Vec<NodeReport>, PipelineError> {
        let mut blocked: HashMap<ProductKind, String> = HashMap::new();
        let mut nodes = Vec::with_capacity(order.len());

        for &product in order {
            if cancel.is_cancelled() {
                nodes.push(NodeReport {
                    product,
                    mode: node_mode(product, pass_clean_mode),
                    fingerprint: String::new(),
                    state: NodeState::Pending,
                    cause: Some("build cancelled before this node started".into()),
                    artifact_path: None,
                });
                continue;
            }

            if let Some(cause) = blocked.get(&product).cloned() {
                nodes.push(NodeReport {
                    product,
                    mode: node_mode(product, pass_clean_mode),
                    fingerprint: String::new(),
                    state: NodeState::Blocked,
                    cause: Some(cause),
                    artifact_path: None,
                });
                continue;
            }

            let mode = node_mode(product, pass_clean_mode);
            let cloud_path = effective_cloud_path(product, region, &self.layout, pass_clean_mode);
            let cloud_entry = self
                .metacache
                .get_or_compute(&cloud_path)
                .map_err(|e| PipelineError::ExternalFailure(e.to_string()))?;

            let canonical = canonical_params_for(product, params, options.resolution_m);
            let upstream: Vec<&str> = product.dependencies().iter().map(|d| fingerprints[d].as_str()).collect();
            let cloud_identity = format!("{}:{}", cloud_path.display(), cloud_entry.point_count);
            let mut parts: Vec<&[u8]> = vec![cloud_identity.as_bytes(), product.as_str().as_bytes(), mode.suffix().as_bytes()];
            let canonical_bytes = canonical.canonical_bytes();
            parts.push(&canonical_bytes);
            let upstream_bytes: Vec<&[u8]> = upstream.iter().map(|s| s.as_bytes()).collect();
            parts.extend(upstream_bytes);
            let fingerprint = geo_primitives::fingerprint(&parts);
            fingerprints.insert(product, fingerprint.clone());

            let artifact_path = if product == ProductKind::Crop {
                self.layout.cropped_cloud_path(mode)
            } else {
                self.layout.artifact_path(product, mode)
            };

            if !options.force_rebuild && manifest::artifact_is_fresh(&self.layout.manifests_dir(), &fingerprint, &artifact_path) {
                info!(product = product.as_str(), %fingerprint, "artifact already fresh, skipping");
                self.maybe_render(product, &artifact_path, mode)?;
                nodes.push(NodeReport {
                    product,
                    mode,
                    fingerprint,
                    state: NodeState::Done,
                    cause: None,
                    artifact_path: Some(artifact_path),
                });
                continue;
            }

            let lock_dir = self.layout.scratch_path("locks");
            std::fs::create_dir_all(&lock_dir).map_err(|e| PipelineError::IoTransient(e.to_string()))?;
            let _guard = self.locks.acquire(&fingerprint, Some(&lock_dir)).await;

            // Re-check freshness now that the lock is held: another process
            // (or the lock's prior holder, in this same process) may have
            // just finished this exact fingerprint while we were waiting,
            // and running the producer again would violate at-most-once.
            if !options.force_rebuild && manifest::artifact_is_fresh(&self.layout.manifests_dir(), &fingerprint, &artifact_path) {
                info!(product = product.as_str(), %fingerprint, "artifact became fresh while waiting for the lock, skipping");
                self.maybe_render(product, &artifact_path, mode)?;
                nodes.push(NodeReport {
                    product,
                    mode,
                    fingerprint,
                    state: NodeState::Done,
                    cause: None,
                    artifact_path: Some(artifact_path),
                });
                continue;
            }

            match self
                .run_with_retries(product, mode, &cloud_path, &artifact_path, params, options, &fingerprint, cancel)
                .await
            {
                Ok(()) => {
                    self.write_manifest(product, mode, &fingerprint, &canonical, &cloud_path, &artifact_path)?;
                    self.maybe_render(product, &artifact_path, mode)?;
                    nodes.push(NodeReport {
                        product,
                        mode,
                        fingerprint,
                        state: NodeState::Done,
                        cause: None,
                        artifact_path: Some(artifact_path),
                    });
                }
                Err(e) => {
                    warn!(product = product.as_str(), error = %e, "node failed");
                    if e.propagates_to_dependents() {
                        for dependent in downstream_of(product, order) {
                            blocked.entry(dependent).or_insert_with(|| format!("dependency {} failed: {e}", product.as_str()));
                        }
                    }
                    nodes.push(NodeReport {
                        product,
                        mode,
                        fingerprint,
                        state: NodeState::Failed,
                        cause: Some(e.to_string()),
                        artifact_path: None,
                    });
                }
            }
        }

        Ok(nodes)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_with_retries(
        &self,
        product: ProductKind,
        mode: Mode,
        cloud_path: &std::path::Path,
        artifact_path: &std::path::Path,
        params: &BuildParams,
        options: &PipelineOptions,
        fingerprint: &str,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let result = self.run_node_once(product, mode, cloud_path, artifact_path, params, options).await;
            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < options.max_retries => {
                    attempt += 1;
                    warn!(product = product.as_str(), %fingerprint, attempt, error = %e, "retrying transient failure");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_node_once(
        &self,
        product: ProductKind,
        mode: Mode,
        cloud_path: &std::path::Path,
        artifact_path: &std::path::Path,
        params: &BuildParams,
        options: &PipelineOptions,
    ) -> Result<(), PipelineError> {
        if let Some(parent) = artifact_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::IoTransient(e.to_string()))?;
        }

        let timeout = Duration::from_secs(options.node_timeout_secs);
        let layout_root = self.layout.region_dir().to_path_buf();
        let cloud_path = cloud_path.to_path_buf();
        let artifact_path = artifact_path.to_path_buf();
        let params = params.clone();
        let resolution_m = options.resolution_m;

        let join = tokio::task::spawn_blocking(move || {
            run_producer_blocking(product, mode, &layout_root, &cloud_path, &artifact_path, &params, resolution_m)
        });

        match tokio::time::timeout(timeout, join).await {
            Ok(Ok(inner)) => inner,
            Ok(Err(_join_err)) => Err(PipelineError::ExternalFailure(format!("{} producer task panicked", product.as_str()))),
            Err(_elapsed) => Err(PipelineError::NodeTimeout),
        }
    }

    fn maybe_render(&self, product: ProductKind, artifact_path: &std::path::Path, mode: Mode) -> Result<(), PipelineError> {
        let Some(render_product) = render_product_for(product) else { return Ok(()) };
        let clean_png = self.layout.png_path(product, mode, false);
        let decorated_png = self.layout.png_path(product, mode, true);
        if let Some(parent) = clean_png.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::IoTransient(e.to_string()))?;
        }
        producers::produce_render(render_product, artifact_path, &clean_png, &decorated_png, &self.render_registry)
    }

    fn write_manifest(
        &self,
        product: ProductKind,
        mode: Mode,
        fingerprint: &str,
        canonical: &geo_primitives::CanonicalParams,
        cloud_path: &std::path::Path,
        artifact_path: &std::path::Path,
    ) -> Result<(), PipelineError> {
        let mut inputs = vec![InputRef {
            path: cloud_path.to_path_buf(),
            content_hash: manifest::content_hash(cloud_path).unwrap_or_else(|_| "unreadable".into()),
        }];
        for dep in product.dependencies() {
            let dep_mode = if matches!(dep, ProductKind::Density | ProductKind::Mask | ProductKind::Footprint) {
                Mode::Standard
            } else {
                mode
            };
            let dep_path = self.layout.artifact_path(*dep, dep_mode);
            if dep_path.exists() {
                inputs.push(InputRef {
                    path: dep_path.clone(),
                    content_hash: manifest::content_hash(&dep_path).unwrap_or_else(|_| "unreadable".into()),
                });
            }
        }

        let record = Manifest {
            fingerprint: fingerprint.to_string(),
            product_kind: product.as_str().to_string(),
            parameters: serde_json::to_value(canonical).unwrap_or(serde_json::Value::Null),
            inputs,
            produced_at_unix_secs: chrono::Utc::now().timestamp(),
            producer_version: manifest::PRODUCER_VERSION.to_string(),
        };
        manifest::write_manifest(&self.layout.manifests_dir(), &record).map_err(PipelineError::from)
    }
}

/// Every resolved node that transitively depends on `failed`, so a single
/// upstream failure blocks the whole branch above it -- including internal
/// footprint-chain nodes the caller never requested directly -- rather than
/// letting an orchestrator bug silently build on top of missing input.
fn downstream_of(failed: ProductKind, resolved_order: &[ProductKind]) -> Vec<ProductKind> {
    resolved_order
        .iter()
        .copied()
        .filter(|&p| depends_transitively_on(p, failed))
        .collect()
}

fn depends_transitively_on(product: ProductKind, target: ProductKind) -> bool {
    product.dependencies().iter().any(|&d| d == target || depends_transitively_on(d, target))
}

fn run_producer_blocking(
    product: ProductKind,
    mode: Mode,
    region_root: &std::path::Path,
    cloud_path: &std::path::Path,
    artifact_path: &std::path::Path,
    params: &BuildParams,
    resolution_m: f64,
) -> Result<(), PipelineError> {
    let cloud = PointCloud::open(cloud_path)?;

    match product {
        ProductKind::Density => {
            let metadata = cloud.bounds_and_crs()?;
            let grid = producers::working_grid(&metadata.bounds, metadata.crs, resolution_m);
            producers::produce_density(&cloud, &grid, artifact_path)
        }
        ProductKind::Mask => {
            let density_path = sibling_artifact(region_root, ProductKind::Density, Mode::Standard);
            producers::produce_mask(&density_path, params.footprint.density_threshold, artifact_path)
        }
        ProductKind::Footprint => {
            let mask_path = sibling_artifact(region_root, ProductKind::Mask, Mode::Standard);
            producers::produce_footprint(&mask_path, params.footprint.simplify_tolerance_m, params.footprint.min_ring_area_m2, artifact_path)
        }
        ProductKind::Crop => {
            let footprint_path = sibling_artifact(region_root, ProductKind::Footprint, Mode::Standard);
            producers::produce_crop(&cloud, &footprint_path, artifact_path)
        }
        ProductKind::Dtm => {
            let metadata = cloud.bounds_and_crs()?;
            let grid = producers::working_grid(&metadata.bounds, metadata.crs, resolution_m);
            let scratch = region_root.join("scratch").join("ground_classified.laz");
            if let Some(parent) = scratch.parent() {
                std::fs::create_dir_all(parent).map_err(|e| PipelineError::IoTransient(e.to_string()))?;
            }
            producers::produce_dtm(&cloud, &grid, params, &scratch, artifact_path)
        }
        ProductKind::Dsm => {
            let metadata = cloud.bounds_and_crs()?;
            let grid = producers::working_grid(&metadata.bounds, metadata.crs, resolution_m);
            producers::produce_dsm(&cloud, &grid, artifact_path)
        }
        ProductKind::Chm => {
            let dsm_path = sibling_artifact(region_root, ProductKind::Dsm, mode);
            let dtm_path = sibling_artifact(region_root, ProductKind::Dtm, mode);
            producers::produce_chm(&dsm_path, &dtm_path, artifact_path)
        }
        ProductKind::Slope => {
            producers::produce_slope(&sibling_artifact(region_root, ProductKind::Dtm, mode), params.slope_z_factor, artifact_path)
        }
        ProductKind::Aspect => producers::produce_aspect(
            &sibling_artifact(region_root, ProductKind::Dtm, mode),
            params.aspect_flat_epsilon_degrees,
            artifact_path,
        ),
        ProductKind::Hillshade => {
            producers::produce_hillshade(&sibling_artifact(region_root, ProductKind::Dtm, mode), params.hillshade, artifact_path)
        }
        ProductKind::Tpi => producers::produce_tpi(&sibling_artifact(region_root, ProductKind::Dtm, mode), params.tpi, artifact_path),
        ProductKind::Tri => producers::produce_tri(&sibling_artifact(region_root, ProductKind::Dtm, mode), artifact_path),
        ProductKind::Roughness => producers::produce_roughness(&sibling_artifact(region_root, ProductKind::Dtm, mode), artifact_path),
        ProductKind::Svf => producers::produce_svf(&sibling_artifact(region_root, ProductKind::Dtm, mode), params.svf, artifact_path),
        ProductKind::Lrm => producers::produce_lrm(&sibling_artifact(region_root, ProductKind::Dtm, mode), params.lrm, artifact_path),
    }
}

fn sibling_artifact(region_root: &std::path::Path, product: ProductKind, mode: Mode) -> PathBuf {
    let region_name = region_root.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let layout = RegionLayout::new(region_root.parent().unwrap_or(region_root), region_name);
    layout.artifact_path(product, mode)
}
