//! Plate analysis: iterates plates, wells and positions, runs segmentation
//! and quantification per position, aggregates per well and writes the
//! per-plate result tables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use common::parallel::try_map_batches;
use strum_macros::Display;

use crate::config::ScreenConfig;
use crate::error::{Error, Result};
use crate::filename::{ImageFileName, WellPositionKey};
use crate::image_io::{load_mask, save_mask_preview};
use crate::quantification::{quantify, QuantificationRecord, Region};
use crate::segmentation::{MaskSegmenter, RegionMasks};
use crate::table::{compare_nan_last, format_value, Table};
use crate::well::WellId;

pub const RECORD_COLUMNS: [&str; 9] = [
    "WellID",
    "WellNumber",
    "Position",
    "MembraneArea",
    "MembraneTotalIntensity",
    "MembraneMeanIntensity",
    "InteriorArea",
    "InteriorTotalIntensity",
    "InteriorMeanIntensity",
];

pub const SUMMARY_COLUMNS: [&str; 10] = [
    "WellID",
    "WellNumber",
    "Positions",
    "MembraneArea",
    "MembraneTotalIntensity",
    "MembraneMeanIntensity",
    "InteriorArea",
    "InteriorTotalIntensity",
    "InteriorMeanIntensity",
    "IntensityRatio",
];

pub const RATIO_COLUMN: &str = "IntensityRatio";
pub const WELL_ID_COLUMN: &str = "WellID";

// =============================================================================
// Per-position work
// =============================================================================

/// Why a position produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// No contour passed the shape filter, or one region came out empty.
    EmptyMask,
    MissingFile,
    ImageDecode,
    UnsupportedImage,
    DimensionMismatch,
    MalformedFilename,
    MissingMembrane,
    MissingInterior,
}

impl SkipReason {
    fn from_error(err: &Error) -> Option<Self> {
        Some(match err {
            Error::MissingFile { .. } => SkipReason::MissingFile,
            Error::ImageDecode { .. } => SkipReason::ImageDecode,
            Error::UnsupportedImage { .. } => SkipReason::UnsupportedImage,
            Error::DimensionMismatch { .. } => SkipReason::DimensionMismatch,
            Error::MalformedFilename { .. } => SkipReason::MalformedFilename,
            Error::MissingRegion {
                region: Region::Membrane,
            } => SkipReason::MissingMembrane,
            Error::MissingRegion {
                region: Region::Interior,
            } => SkipReason::MissingInterior,
            _ => return None,
        })
    }
}

/// Image pair of one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionTask {
    pub key: WellPositionKey,
    pub intensity_path: PathBuf,
    pub mask_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionOutcome {
    Measured(QuantificationRecord),
    Skipped(WellPositionKey, SkipReason),
}

// =============================================================================
// Per-well aggregation
// =============================================================================

/// Region statistics averaged over a well's positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AveragedStats {
    pub area: f64,
    pub total: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WellSummary {
    pub well_id: WellId,
    pub well_number: u32,
    pub positions: usize,
    pub membrane: AveragedStats,
    pub interior: AveragedStats,
    /// Averaged membrane mean over averaged interior mean.
    pub intensity_ratio: f64,
}

/// One summary per well with at least one record, in well-number order.
pub fn summarize_wells(records: &[QuantificationRecord]) -> Vec<WellSummary> {
    let mut by_well: BTreeMap<u32, Vec<&QuantificationRecord>> = BTreeMap::new();
    for record in records {
        by_well.entry(record.key.well_number).or_default().push(record);
    }

    by_well
        .into_values()
        .map(|group| {
            let n = group.len() as f64;
            let average = |region: Region| {
                let mut acc = AveragedStats::default();
                for record in &group {
                    let stats = record.region(region);
                    acc.area += stats.area as f64;
                    acc.total += stats.total;
                    acc.mean += stats.mean;
                }
                AveragedStats {
                    area: acc.area / n,
                    total: acc.total / n,
                    mean: acc.mean / n,
                }
            };
            let membrane = average(Region::Membrane);
            let interior = average(Region::Interior);
            let first = group[0].key;
            WellSummary {
                well_id: first.well_id,
                well_number: first.well_number,
                positions: group.len(),
                membrane,
                interior,
                intensity_ratio: membrane.mean / interior.mean,
            }
        })
        .collect()
}

/// Stable ascending sort by intensity ratio; NaN ratios go last.
pub fn sort_by_ratio(summaries: &mut [WellSummary]) {
    summaries.sort_by(|a, b| {
        let key = |s: &WellSummary| Some(s.intensity_ratio).filter(|r| !r.is_nan());
        compare_nan_last(key(a), key(b))
    });
}

pub fn records_table(records: &[QuantificationRecord]) -> Table {
    let mut table = Table::from_columns(&RECORD_COLUMNS);
    for r in records {
        table.push_row(vec![
            r.key.well_id.to_string(),
            r.key.well_number.to_string(),
            r.key.position.to_string(),
            r.membrane.area.to_string(),
            format_value(r.membrane.total),
            format_value(r.membrane.mean),
            r.interior.area.to_string(),
            format_value(r.interior.total),
            format_value(r.interior.mean),
        ]);
    }
    table
}

pub fn summaries_table(summaries: &[WellSummary]) -> Table {
    let mut table = Table::from_columns(&SUMMARY_COLUMNS);
    for s in summaries {
        table.push_row(vec![
            s.well_id.to_string(),
            s.well_number.to_string(),
            s.positions.to_string(),
            format_value(s.membrane.area),
            format_value(s.membrane.total),
            format_value(s.membrane.mean),
            format_value(s.interior.area),
            format_value(s.interior.total),
            format_value(s.interior.mean),
            format_value(s.intensity_ratio),
        ]);
    }
    table
}

// =============================================================================
// Plate driver
// =============================================================================

/// Records of one plate plus the positions that were skipped.
#[derive(Debug, Clone, Default)]
pub struct PlateResult {
    pub plate: u32,
    /// Ordered by (well number, position).
    pub records: Vec<QuantificationRecord>,
    pub skipped: Vec<(WellPositionKey, SkipReason)>,
}

impl PlateResult {
    pub fn skip_counts(&self) -> BTreeMap<SkipReason, usize> {
        let mut counts = BTreeMap::new();
        for (_, reason) in &self.skipped {
            *counts.entry(*reason).or_insert(0) += 1;
        }
        counts
    }
}

/// Totals over all plates of a run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub plates: usize,
    pub records: usize,
    pub wells: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl RunSummary {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

pub struct PlateAnalysis {
    config: ScreenConfig,
    segmenter: MaskSegmenter,
}

impl PlateAnalysis {
    pub fn new(config: ScreenConfig) -> Result<Self> {
        config.validate()?;
        let segmenter = MaskSegmenter::new(config.segmentation);
        Ok(Self { config, segmenter })
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Expected image pairs of a plate, in (well number, position) order.
    pub fn position_tasks(&self, plate: u32) -> Result<Vec<PositionTask>> {
        let config = &self.config;
        let intensity_dir = config.intensity_dir_for(plate);
        let mask_dir = config.mask_dir_for(plate);

        let mut tasks = Vec::new();
        for well_number in 1..=config.plate_shape.well_count() {
            let well_id = config
                .plate_shape
                .number_to_id(well_number, config.stack_order)?;
            for position in 1..=config.positions {
                let key = WellPositionKey {
                    well_number,
                    position,
                    well_id,
                };
                let file_name = |channel: &str| {
                    ImageFileName::new(key, channel, &config.image_extension).to_string()
                };
                tasks.push(PositionTask {
                    key,
                    intensity_path: intensity_dir.join(file_name(&config.intensity_channel)),
                    mask_path: mask_dir.join(file_name(&config.mask_channel)),
                });
            }
        }
        Ok(tasks)
    }

    /// Segments and measures one position. Per-position failures become
    /// skips; anything else is returned as an error.
    pub fn process_position(&self, plate: u32, task: &PositionTask) -> Result<PositionOutcome> {
        let skip = |reason: SkipReason| PositionOutcome::Skipped(task.key, reason);

        let masks = match load_mask(&task.mask_path).map(|m| self.segmenter.segment(&m)) {
            Ok(masks) => masks,
            Err(err) => return self.absorb(plate, task, err),
        };
        if masks.is_empty() {
            tracing::debug!(plate, position = %task.key, "No qualifying cells, skipping");
            return Ok(skip(SkipReason::EmptyMask));
        }

        if self.config.save_mask_previews {
            self.save_previews(plate, task.key, &masks);
        }

        let measured = quantify(&masks, &task.intensity_path).and_then(|record| {
            self.check_key(task, &record.key)?;
            Ok(record)
        });
        match measured {
            Ok(record) => {
                tracing::debug!(
                    plate,
                    position = %record.key,
                    membrane_mean = record.membrane.mean,
                    interior_mean = record.interior.mean,
                    "Position done"
                );
                Ok(PositionOutcome::Measured(record))
            }
            Err(err) => self.absorb(plate, task, err),
        }
    }

    /// The well ID in a file name must name the same well as its well
    /// number under the configured plate shape and stacking order.
    fn check_key(&self, task: &PositionTask, parsed: &WellPositionKey) -> Result<()> {
        let config = &self.config;
        let expected = config
            .plate_shape
            .number_to_id(parsed.well_number, config.stack_order)
            .ok();
        if expected == Some(parsed.well_id) && *parsed == task.key {
            return Ok(());
        }
        let name = task
            .intensity_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Err(Error::MalformedFilename {
            name,
            reason: format!(
                "well ID {} does not match well number {} (expected position {})",
                parsed.well_id, parsed.well_number, task.key
            ),
        })
    }

    fn absorb(&self, plate: u32, task: &PositionTask, err: Error) -> Result<PositionOutcome> {
        match SkipReason::from_error(&err) {
            Some(reason @ SkipReason::MissingFile) => {
                tracing::debug!(plate, position = %task.key, error = %err, "Skipping {reason}");
                Ok(PositionOutcome::Skipped(task.key, reason))
            }
            Some(reason) => {
                tracing::warn!(plate, position = %task.key, error = %err, "Skipping {reason}");
                Ok(PositionOutcome::Skipped(task.key, reason))
            }
            None => Err(err),
        }
    }

    fn save_previews(&self, plate: u32, key: WellPositionKey, masks: &RegionMasks) {
        let dir = self.config.preview_path().join(format!("plate {plate}"));
        if let Err(source) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %source, "Cannot create preview directory");
            return;
        }
        for (region, mask) in [
            (Region::Membrane, &masks.membrane),
            (Region::Interior, &masks.interior),
        ] {
            let path = dir.join(ImageFileName::new(key, &region.to_string(), "png").to_string());
            if let Err(err) = save_mask_preview(mask, &path) {
                tracing::warn!(error = %err, "Failed to save mask preview");
            }
        }
    }

    /// Measures every position of a plate.
    pub fn analyze_plate(&self, plate: u32) -> Result<PlateResult> {
        let tasks = self.position_tasks(plate)?;
        tracing::info!(plate, positions = tasks.len(), "Analyzing plate");

        let outcomes = try_map_batches(
            &tasks,
            self.config.max_concurrent_positions,
            |task| self.process_position(plate, task),
            |done, total| tracing::debug!(plate, done, total, "Positions processed"),
        )?;

        let mut result = PlateResult {
            plate,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                PositionOutcome::Measured(record) => result.records.push(record),
                PositionOutcome::Skipped(key, reason) => result.skipped.push((key, reason)),
            }
        }
        result
            .records
            .sort_by_key(|r| (r.key.well_number, r.key.position));
        Ok(result)
    }

    /// Writes the raw and averaged tables of a plate and returns the
    /// averaged rows in ratio order.
    pub fn persist_plate(&self, result: &PlateResult) -> Result<Vec<WellSummary>> {
        records_table(&result.records).write(&self.config.raw_results_file(result.plate))?;

        let mut summaries = summarize_wells(&result.records);
        sort_by_ratio(&mut summaries);
        summaries_table(&summaries).write(&self.config.averaged_results_file(result.plate))?;
        Ok(summaries)
    }

    /// Analyzes and persists every configured plate, one plate at a time.
    pub fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let plate_count = self.config.plates.len();

        for (i, &plate) in self.config.plates.iter().enumerate() {
            let result = self.analyze_plate(plate)?;
            let wells = self.persist_plate(&result)?;

            tracing::info!(
                plate,
                records = result.records.len(),
                wells = wells.len(),
                skipped = result.skipped.len(),
                "Finished plate {} of {}",
                i + 1,
                plate_count
            );

            summary.plates += 1;
            summary.records += result.records.len();
            summary.wells += wells.len();
            for (reason, count) in result.skip_counts() {
                *summary.skipped.entry(reason).or_insert(0) += count;
            }
        }

        tracing::info!(
            plates = summary.plates,
            records = summary.records,
            wells = summary.wells,
            skipped = summary.skipped_total(),
            "Analysis complete"
        );
        for (reason, count) in &summary.skipped {
            tracing::info!(%reason, count, "Skipped positions");
        }
        Ok(summary)
    }
}

/// Results directory listing used by the annotate and rank steps.
pub fn result_files(dir: &Path) -> Result<Vec<PathBuf>> {
    common::file_utils::table_files(dir).map_err(|e| Error::io(dir, e))
}

#[cfg(test)]
mod tests;
