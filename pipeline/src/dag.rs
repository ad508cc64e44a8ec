/// Dependency DAG resolution. Requested products pull in
/// their transitive prerequisites; clean mode additionally prepends the
/// density→mask→footprint→crop chain ahead of every other node, since the
/// clean cloud is a prerequisite of every clean-mode raster.
use std::collections::HashSet;

use geo_primitives::PipelineError;

use crate::types::ProductKind;

/// Topological order over `requested ∪ transitive prerequisites`, with
/// clean-mode's crop chain always first. Cycle detection walks `dependencies()`
/// to a fixed depth bound — the product catalog is finite and hand-enumerated,
/// so a real cycle can only come from a future catalog edit, which this guards.
pub fn resolve(requested: &[ProductKind], clean_mode: bool) -> Result<Vec<ProductKind>, PipelineError> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut in_progress = HashSet::new();

    if clean_mode {
        visit(ProductKind::Crop, &mut order, &mut visited, &mut in_progress)?;
    }
    for &product in requested {
        visit(product, &mut order, &mut visited, &mut in_progress)?;
    }
    Ok(order)
}

fn visit(
    product: ProductKind,
    order: &mut Vec<ProductKind>,
    visited: &mut HashSet<ProductKind>,
    in_progress: &mut HashSet<ProductKind>,
) -> Result<(), PipelineError> {
    if visited.contains(&product) {
        return Ok(());
    }
    if !in_progress.insert(product) {
        return Err(PipelineError::InvariantViolation(format!("cycle detected at {}", product.as_str())));
    }
    for &dep in product.dependencies() {
        visit(dep, order, visited, in_progress)?;
    }
    in_progress.remove(&product);
    visited.insert(product);
    order.push(product);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtm_precedes_every_dtm_dependent_derivative() {
        let order = resolve(&[ProductKind::Slope, ProductKind::Svf, ProductKind::Lrm], false).unwrap();
        let dtm_pos = order.iter().position(|p| *p == ProductKind::Dtm).unwrap();
        for dependent in [ProductKind::Slope, ProductKind::Svf, ProductKind::Lrm] {
            let pos = order.iter().position(|p| *p == dependent).unwrap();
            assert!(dtm_pos < pos);
        }
    }

    #[test]
    fn chm_waits_on_both_dsm_and_dtm() {
        let order = resolve(&[ProductKind::Chm], false).unwrap();
        let chm_pos = order.iter().position(|p| *p == ProductKind::Chm).unwrap();
        let dsm_pos = order.iter().position(|p| *p == ProductKind::Dsm).unwrap();
        let dtm_pos = order.iter().position(|p| *p == ProductKind::Dtm).unwrap();
        assert!(dsm_pos < chm_pos && dtm_pos < chm_pos);
    }

    #[test]
    fn clean_mode_places_the_crop_chain_before_everything_else() {
        let order = resolve(&[ProductKind::Dtm], true).unwrap();
        let crop_pos = order.iter().position(|p| *p == ProductKind::Crop).unwrap();
        let dtm_pos = order.iter().position(|p| *p == ProductKind::Dtm).unwrap();
        assert!(crop_pos < dtm_pos);
    }

    #[test]
    fn requesting_the_same_product_twice_does_not_duplicate_it() {
        let order = resolve(&[ProductKind::Dtm, ProductKind::Dtm], false).unwrap();
        assert_eq!(order.iter().filter(|p| **p == ProductKind::Dtm).count(), 1);
    }
}
