//! Screen configuration.
//!
//! Loaded from TOML; every field has a default, so an empty file describes
//! the standard layout of a 16-plate, 384-well screen with three positions
//! per well.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::segmentation::SegmentationConfig;
use crate::well::{PlateShape, StackOrder};

/// Placeholder substituted with the plate number in directory templates.
pub const PLATE_PLACEHOLDER: &str = "{plate}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    // ------------------------------------------------------------------------
    // Filesystem layout
    // ------------------------------------------------------------------------
    /// Screen root; relative directories below resolve against it.
    pub data_root: PathBuf,
    /// Intensity image directory template.
    pub intensity_dir: String,
    /// Cell-mask image directory template.
    pub mask_dir: String,
    /// Per-plate result tables and the ranking table.
    pub results_dir: PathBuf,
    /// Written when `save_mask_previews` is on.
    pub preview_dir: PathBuf,
    pub intensity_channel: String,
    pub mask_channel: String,
    pub image_extension: String,

    // ------------------------------------------------------------------------
    // Plate geometry
    // ------------------------------------------------------------------------
    pub plates: Vec<u32>,
    pub plate_shape: PlateShape,
    pub positions: u32,
    pub stack_order: StackOrder,

    // ------------------------------------------------------------------------
    // Processing
    // ------------------------------------------------------------------------
    /// Positions of one plate processed at the same time.
    pub max_concurrent_positions: usize,
    /// Save membrane/interior masks as PNG next to the results.
    pub save_mask_previews: bool,
    pub segmentation: SegmentationConfig,

    // ------------------------------------------------------------------------
    // Strain metadata
    // ------------------------------------------------------------------------
    pub strains: StrainSheetConfig,

    // ------------------------------------------------------------------------
    // Logging
    // ------------------------------------------------------------------------
    pub log_level: String,
    /// Daily-rolling log files; console only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            intensity_dir: "plate_{plate}/data".into(),
            mask_dir: "Analysis/plate {plate}/processed".into(),
            results_dir: PathBuf::from("Analysis/plate results"),
            preview_dir: PathBuf::from("Analysis/mask previews"),
            intensity_channel: "488nm".into(),
            mask_channel: "CellMask".into(),
            image_extension: "tif".into(),
            plates: (1..=16).collect(),
            plate_shape: PlateShape::WELLS_384,
            positions: 3,
            stack_order: StackOrder::RowStack,
            max_concurrent_positions: 8,
            save_mask_previews: false,
            segmentation: SegmentationConfig::default(),
            strains: StrainSheetConfig::default(),
            log_level: "info".into(),
            log_dir: None,
        }
    }
}

/// Location and column names of the strain sheet export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrainSheetConfig {
    /// Tab-separated export of the strain spreadsheet.
    pub path: Option<PathBuf>,
    pub orf_column: String,
    pub gene_column: String,
    pub code_column: String,
}

impl Default for StrainSheetConfig {
    fn default() -> Self {
        Self {
            path: None,
            orf_column: "ORF".into(),
            gene_column: "Gene".into(),
            code_column: "384 Plate_Row_Col".into(),
        }
    }
}

impl ScreenConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self =
            common::toml_file::load(path).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        common::toml_file::save(self, path).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.plate_shape.validate()?;

        if self.plates.is_empty() {
            return Err(Error::Config("no plates configured".into()));
        }
        if self.plates.contains(&0) {
            return Err(Error::Config("plate numbers are 1-based".into()));
        }
        if self.positions == 0 {
            return Err(Error::Config("positions must be at least 1".into()));
        }
        if self.max_concurrent_positions == 0 {
            return Err(Error::Config(
                "max_concurrent_positions must be at least 1".into(),
            ));
        }
        for (name, template) in [
            ("intensity_dir", &self.intensity_dir),
            ("mask_dir", &self.mask_dir),
        ] {
            if !template.contains(PLATE_PLACEHOLDER) {
                return Err(Error::Config(format!(
                    "{name} '{template}' lacks the {PLATE_PLACEHOLDER} placeholder"
                )));
            }
        }
        for (name, value) in [
            ("intensity_channel", &self.intensity_channel),
            ("mask_channel", &self.mask_channel),
            ("image_extension", &self.image_extension),
        ] {
            if value.is_empty() || value.contains("--") {
                return Err(Error::Config(format!("{name} '{value}' is not usable in file names")));
            }
        }

        let seg = &self.segmentation;
        if seg.thickness == 0 {
            return Err(Error::Config("segmentation.thickness must be at least 1".into()));
        }
        if !(seg.min_circularity.is_finite()
            && seg.max_circularity.is_finite()
            && seg.min_circularity < seg.max_circularity)
        {
            return Err(Error::Config(format!(
                "segmentation circularity range ({}, {}) is empty",
                seg.min_circularity, seg.max_circularity
            )));
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_root.join(path)
        }
    }

    fn plate_template(&self, template: &str, plate: u32) -> PathBuf {
        self.resolve(Path::new(
            &template.replace(PLATE_PLACEHOLDER, &plate.to_string()),
        ))
    }

    pub fn intensity_dir_for(&self, plate: u32) -> PathBuf {
        self.plate_template(&self.intensity_dir, plate)
    }

    pub fn mask_dir_for(&self, plate: u32) -> PathBuf {
        self.plate_template(&self.mask_dir, plate)
    }

    pub fn results_path(&self) -> PathBuf {
        self.resolve(&self.results_dir)
    }

    pub fn preview_path(&self) -> PathBuf {
        self.resolve(&self.preview_dir)
    }

    pub fn raw_results_file(&self, plate: u32) -> PathBuf {
        self.results_path().join(format!("plate {plate}.txt"))
    }

    pub fn averaged_results_file(&self, plate: u32) -> PathBuf {
        self.results_path()
            .join(format!("AVG Ratio for plate {plate}.txt"))
    }

    pub fn ranking_file(&self) -> PathBuf {
        self.results_path().join("ranking.txt")
    }

    pub fn strain_sheet_path(&self) -> Option<PathBuf> {
        self.strains.path.as_deref().map(|p| self.resolve(p))
    }
}
