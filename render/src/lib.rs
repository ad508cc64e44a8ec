pub mod colormap;
pub mod error;
pub mod renderer;
pub mod stretch;

pub use colormap::Colormap;
pub use error::RenderError;
pub use renderer::{render_clean, render_decorated, write_png_atomic, RenderSpec, RenderedPaths};
pub use stretch::Normalization;

/// Which raster product a render call is producing. Used only to pick the
/// fixed colormap/normalization pairing below; it plays
/// no part in the render math itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Dtm,
    Dsm,
    Chm,
    Slope,
    Aspect,
    Hillshade,
    Svf,
    Lrm,
    Tpi,
    Tri,
    Roughness,
}

/// Looks up the colormap + normalization pairing fixed for `product`.
pub fn render_spec_for(product: Product) -> RenderSpec {
    match product {
        Product::Dtm | Product::Dsm => RenderSpec {
            colormap: Colormap::Viridis,
            normalization: Normalization::PercentileStretch { low: 2.0, high: 98.0 },
            aspect_flat_sentinel: None,
        },
        Product::Chm => RenderSpec {
            colormap: Colormap::GreenRamp,
            normalization: Normalization::PercentileStretch { low: 2.0, high: 98.0 },
            aspect_flat_sentinel: None,
        },
        Product::Slope => RenderSpec {
            colormap: Colormap::Inferno,
            normalization: Normalization::Linear { min: 0.0, max: 60.0 },
            aspect_flat_sentinel: None,
        },
        Product::Aspect => RenderSpec {
            colormap: Colormap::Cyclic,
            normalization: Normalization::Linear { min: 0.0, max: 360.0 },
            aspect_flat_sentinel: Some(terrain::aspect::FLAT_ASPECT_SENTINEL),
        },
        Product::Hillshade => RenderSpec {
            colormap: Colormap::Grayscale,
            normalization: Normalization::Linear { min: 0.0, max: 255.0 },
            aspect_flat_sentinel: None,
        },
        Product::Svf => RenderSpec {
            colormap: Colormap::Cividis,
            normalization: Normalization::Linear { min: 0.0, max: 1.0 },
            aspect_flat_sentinel: None,
        },
        Product::Lrm => RenderSpec {
            colormap: Colormap::Coolwarm,
            normalization: Normalization::SymmetricPercentile { low: 2.0, high: 98.0 },
            aspect_flat_sentinel: None,
        },
        Product::Tpi | Product::Tri | Product::Roughness => RenderSpec {
            colormap: Colormap::Grayscale,
            normalization: Normalization::PercentileStretch { low: 2.0, high: 98.0 },
            aspect_flat_sentinel: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_carries_a_flat_sentinel_and_others_do_not() {
        assert!(render_spec_for(Product::Aspect).aspect_flat_sentinel.is_some());
        assert!(render_spec_for(Product::Dtm).aspect_flat_sentinel.is_none());
    }
}
