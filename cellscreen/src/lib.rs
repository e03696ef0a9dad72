//! Cellscreen - membrane versus interior fluorescence across a plate screen.
//!
//! For every plate, well and imaged position the cell-mask image is
//! segmented into a membrane band and a cell interior, the intensity image
//! is measured under both regions and the results are averaged per well and
//! ranked by the membrane/interior intensity ratio.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cellscreen::{PlateAnalysis, ScreenConfig};
//!
//! let config = ScreenConfig::load("screen.toml".as_ref())?;
//! let analysis = PlateAnalysis::new(config)?;
//! let summary = analysis.run()?;
//!
//! println!("{} records from {} plates", summary.records, summary.plates);
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod filename;
pub mod image_io;
pub mod quantification;
pub mod ranking;
pub mod segmentation;
pub mod strains;
pub mod table;
pub mod well;

// ============================================================================
// Public API exports
// ============================================================================

pub use config::{ScreenConfig, StrainSheetConfig};
pub use driver::{PlateAnalysis, PlateResult, RunSummary, SkipReason, WellSummary};
pub use error::{Error, Result};
pub use filename::{ImageFileName, WellPositionKey};
pub use quantification::{quantify, QuantificationRecord, Region, RegionStats};
pub use ranking::rank_plates;
pub use segmentation::{BinaryMask, MaskSegmenter, RegionMasks, SegmentationConfig};
pub use strains::{annotate_results, StrainCode, StrainSheet};
pub use table::Table;
pub use well::{Conversion, PlateShape, StackOrder, WellId};
