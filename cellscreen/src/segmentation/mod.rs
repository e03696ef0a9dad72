//! Membrane and interior region masks from a cell-mask image.
//!
//! # Algorithm Overview
//!
//! 1. **Binarization**: Global Otsu threshold; pixels above the level are
//!    foreground.
//!
//! 2. **Contours**: Outermost boundaries of the foreground objects, reduced
//!    to the endpoints of straight runs.
//!
//! 3. **Shape filter**: Keep contours whose circularity 4π·A/P² lies strictly
//!    inside the configured range. Elongated debris and merged clumps fall
//!    outside it.
//!
//! 4. **Regions**: Retained contours are drawn as a thick band (membrane)
//!    and as filled polygons. The interior is the filled area minus the
//!    membrane band, so the two masks never overlap.

mod contour;
mod raster;
mod threshold;


pub use contour::{external_contours, simplify_chain, CircularityRange, Contour};
pub use raster::{draw_filled, draw_outlines};
pub use threshold::{binarize_otsu, Binarized};

use common::Buffer2;
use image_lib::GrayImage;
use serde::{Deserialize, Serialize};

/// Segmentation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Width in pixels of the membrane band drawn over each contour.
    ///
    /// The band is stamped with disks of radius `thickness / 2`, so it spans
    /// `2 * (thickness / 2) + 1` pixels: even values draw one pixel wider
    /// (2 draws like 3, 8 like 9).
    pub thickness: u32,
    /// Exclusive lower bound on accepted circularity.
    pub min_circularity: f64,
    /// Exclusive upper bound on accepted circularity.
    pub max_circularity: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            thickness: 7,
            min_circularity: 0.6,
            max_circularity: 1.4,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) {
        assert!(self.thickness >= 1, "thickness must be at least 1 pixel");
        assert!(
            self.min_circularity.is_finite() && self.max_circularity.is_finite(),
            "circularity bounds must be finite"
        );
        assert!(
            self.min_circularity < self.max_circularity,
            "min_circularity ({}) must be below max_circularity ({})",
            self.min_circularity,
            self.max_circularity
        );
    }

    pub fn circularity_range(&self) -> CircularityRange {
        CircularityRange {
            min: self.min_circularity,
            max: self.max_circularity,
        }
    }
}

/// Boolean pixel mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask(Buffer2<bool>);

impl BinaryMask {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self(Buffer2::new_default(width, height))
    }

    /// Nonzero pixels of a gray canvas become set.
    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let pixels = image.as_raw().iter().map(|&v| v != 0).collect();
        Self(Buffer2::new(width, height, pixels))
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.0.dimensions()
    }

    pub fn pixels(&self) -> &[bool] {
        self.0.pixels()
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        *self.0.get(x, y)
    }

    pub fn count(&self) -> usize {
        self.0.count_where(|&on| on)
    }

    pub fn is_all_zero(&self) -> bool {
        !self.0.iter().any(|&on| on)
    }

    /// Pixels set here and not set in `other`.
    pub fn and_not(&self, other: &BinaryMask) -> BinaryMask {
        BinaryMask(self.0.zip_map(&other.0, |&a, &b| a && !b))
    }

    /// Number of pixels set in both masks.
    pub fn overlap_count(&self, other: &BinaryMask) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .filter(|&(&a, &b)| a && b)
            .count()
    }
}

/// Per-image segmentation output.
#[derive(Debug, Clone)]
pub struct RegionMasks {
    pub membrane: BinaryMask,
    pub interior: BinaryMask,
    pub diagnostics: SegmentationDiagnostics,
}

impl RegionMasks {
    pub fn dimensions(&self) -> (usize, usize) {
        self.membrane.dimensions()
    }

    /// True when either region has no pixels, i.e. the image cannot be
    /// quantified.
    pub fn is_empty(&self) -> bool {
        self.membrane.is_all_zero() || self.interior.is_all_zero()
    }
}

/// Counts from each stage, for logging and tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentationDiagnostics {
    /// Otsu level separating background from cells.
    pub threshold: u8,
    /// External contours found before the shape filter.
    pub candidates: usize,
    /// Contours inside the circularity range.
    pub retained: usize,
}

/// Builds region masks from cell-mask images.
#[derive(Debug, Clone)]
pub struct MaskSegmenter {
    config: SegmentationConfig,
}

impl Default for MaskSegmenter {
    fn default() -> Self {
        Self::new(SegmentationConfig::default())
    }
}

impl MaskSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    pub fn segment(&self, mask: &GrayImage) -> RegionMasks {
        let binarized = binarize_otsu(mask);
        let candidates = external_contours(&binarized.image);

        let range = self.config.circularity_range();
        let retained: Vec<Contour> = candidates
            .iter()
            .filter(|c| range.accepts(c))
            .cloned()
            .collect();

        let mut outline = GrayImage::new(mask.width(), mask.height());
        draw_outlines(&mut outline, &retained, self.config.thickness);
        let mut filled = GrayImage::new(mask.width(), mask.height());
        draw_filled(&mut filled, &retained);

        let membrane = BinaryMask::from_gray(&outline);
        let interior = BinaryMask::from_gray(&filled).and_not(&membrane);

        let diagnostics = SegmentationDiagnostics {
            threshold: binarized.level,
            candidates: candidates.len(),
            retained: retained.len(),
        };
        tracing::debug!(
            threshold = diagnostics.threshold,
            candidates = diagnostics.candidates,
            retained = diagnostics.retained,
            membrane_pixels = membrane.count(),
            interior_pixels = interior.count(),
            "Segmented cell mask"
        );

        RegionMasks {
            membrane,
            interior,
            diagnostics,
        }
    }
}
