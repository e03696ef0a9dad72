//! Per-region intensity statistics.

use std::path::Path;

use strum_macros::Display;

use crate::error::{Error, Result};
use crate::filename::WellPositionKey;
use crate::image_io::{load_intensity, IntensityImage};
use crate::segmentation::{BinaryMask, RegionMasks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Region {
    Membrane,
    Interior,
}

/// Pixel count, summed intensity and mean intensity of one region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegionStats {
    pub area: usize,
    pub total: f64,
    pub mean: f64,
}

impl RegionStats {
    /// Statistics of `intensity` under `mask`; `MissingRegion` when the
    /// mask selects nothing.
    pub fn measure(mask: &BinaryMask, intensity: &IntensityImage, region: Region) -> Result<Self> {
        let (area, total) = mask
            .pixels()
            .iter()
            .zip(intensity.pixels.iter())
            .filter(|&(&on, _)| on)
            .fold((0usize, 0.0f64), |(n, sum), (_, &v)| (n + 1, sum + v));

        if area == 0 {
            return Err(Error::MissingRegion { region });
        }
        Ok(Self {
            area,
            total,
            mean: total / area as f64,
        })
    }
}

/// Measurements for one imaged position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantificationRecord {
    pub key: WellPositionKey,
    pub membrane: RegionStats,
    pub interior: RegionStats,
}

impl QuantificationRecord {
    pub fn region(&self, region: Region) -> &RegionStats {
        match region {
            Region::Membrane => &self.membrane,
            Region::Interior => &self.interior,
        }
    }
}

/// Measures both regions of an already-loaded intensity image.
pub fn quantify_image(
    masks: &RegionMasks,
    intensity: &IntensityImage,
    key: WellPositionKey,
    path: &Path,
) -> Result<QuantificationRecord> {
    if intensity.dimensions() != masks.dimensions() {
        return Err(Error::DimensionMismatch {
            path: path.to_path_buf(),
            expected: masks.dimensions(),
            actual: intensity.dimensions(),
        });
    }

    Ok(QuantificationRecord {
        key,
        membrane: RegionStats::measure(&masks.membrane, intensity, Region::Membrane)?,
        interior: RegionStats::measure(&masks.interior, intensity, Region::Interior)?,
    })
}

/// Loads the intensity image at `path` and measures both regions. The
/// record's identity comes from the file name.
pub fn quantify(masks: &RegionMasks, path: &Path) -> Result<QuantificationRecord> {
    let key = WellPositionKey::from_path(path)?;
    let intensity = load_intensity(path)?;
    quantify_image(masks, &intensity, key, path)
}
