//! Tests for per-well aggregation and the plate driver.

use std::path::Path;

use common::test_utils::fresh_test_dir;
use image_lib::{GrayImage, ImageBuffer, Luma};

use super::*;
use crate::quantification::RegionStats;
use crate::well::PlateShape;

// =============================================================================
// Helper Functions
// =============================================================================

fn record(well: &str, well_number: u32, position: u32, membrane: f64, interior: f64) -> QuantificationRecord {
    let stats = |mean: f64| RegionStats {
        area: 10,
        total: mean * 10.0,
        mean,
    };
    QuantificationRecord {
        key: WellPositionKey {
            well_number,
            position,
            well_id: well.parse().unwrap(),
        },
        membrane: stats(membrane),
        interior: stats(interior),
    }
}

const CELL_RADIUS: i32 = 20;

fn cell_mask(size: u32) -> GrayImage {
    let c = size as i32 / 2;
    GrayImage::from_fn(size, size, |x, y| {
        let (dx, dy) = (x as i32 - c, y as i32 - c);
        let inside = dx * dx + dy * dy <= CELL_RADIUS * CELL_RADIUS;
        Luma([if inside { 255 } else { 0 }])
    })
}

/// Bright rim (r >= 15) around a dim core.
fn rim_intensity(size: u32) -> ImageBuffer<Luma<u16>, Vec<u16>> {
    let c = size as i32 / 2;
    ImageBuffer::from_fn(size, size, |x, y| {
        let (dx, dy) = (x as i32 - c, y as i32 - c);
        Luma([if dx * dx + dy * dy < 15 * 15 { 100 } else { 300 }])
    })
}

fn screen_config(root: &Path) -> ScreenConfig {
    ScreenConfig {
        data_root: root.to_path_buf(),
        plates: vec![1],
        plate_shape: PlateShape::new(1, 2).unwrap(),
        positions: 2,
        max_concurrent_positions: 2,
        ..Default::default()
    }
}

fn image_path(dir: &Path, well: &str, number: u32, position: u32, channel: &str) -> PathBuf {
    let key = WellPositionKey {
        well_number: number,
        position,
        well_id: well.parse().unwrap(),
    };
    dir.join(ImageFileName::new(key, channel, "tif").to_string())
}

/// Plate 1 of a 1×2 plate with two positions per well:
/// A1/P1 rim-bright cell, A1/P2 no cells, A2/P1 uniform cell, A2/P2 no
/// intensity image.
fn write_plate(config: &ScreenConfig) {
    let size = 80;
    let data = config.intensity_dir_for(1);
    let masks = config.mask_dir_for(1);
    std::fs::create_dir_all(&data).unwrap();
    std::fs::create_dir_all(&masks).unwrap();

    cell_mask(size)
        .save(image_path(&masks, "A1", 1, 1, "CellMask"))
        .unwrap();
    rim_intensity(size)
        .save(image_path(&data, "A1", 1, 1, "488nm"))
        .unwrap();

    GrayImage::new(size, size)
        .save(image_path(&masks, "A1", 1, 2, "CellMask"))
        .unwrap();
    rim_intensity(size)
        .save(image_path(&data, "A1", 1, 2, "488nm"))
        .unwrap();

    cell_mask(size)
        .save(image_path(&masks, "A2", 2, 1, "CellMask"))
        .unwrap();
    ImageBuffer::<Luma<u16>, Vec<u16>>::from_pixel(size, size, Luma([500]))
        .save(image_path(&data, "A2", 2, 1, "488nm"))
        .unwrap();

    cell_mask(size)
        .save(image_path(&masks, "A2", 2, 2, "CellMask"))
        .unwrap();
}

// =============================================================================
// Aggregation Tests
// =============================================================================

#[test]
fn test_well_average_and_ratio_of_averages() {
    let records = [
        record("A1", 1, 1, 10.0, 4.0),
        record("A1", 1, 2, 20.0, 1.0),
    ];
    let summaries = summarize_wells(&records);
    assert_eq!(summaries.len(), 1);

    let s = &summaries[0];
    assert_eq!(s.positions, 2);
    assert_eq!(s.membrane.mean, 15.0);
    assert_eq!(s.interior.mean, 2.5);
    assert_eq!(s.membrane.total, 150.0);
    assert_eq!(s.membrane.area, 10.0);
    // Ratio of averaged means (15 / 2.5), not the mean of per-position
    // ratios (2.5 + 20) / 2.
    assert_eq!(s.intensity_ratio, 6.0);
}

#[test]
fn test_summaries_follow_well_number() {
    let records = [
        record("A3", 3, 1, 1.0, 1.0),
        record("A1", 1, 1, 1.0, 1.0),
        record("A2", 2, 1, 1.0, 1.0),
    ];
    let numbers: Vec<u32> = summarize_wells(&records)
        .iter()
        .map(|s| s.well_number)
        .collect();
    assert_eq!(numbers, [1, 2, 3]);
}

#[test]
fn test_ratio_sort_is_stable_with_nan_last() {
    let records = [
        record("A1", 1, 1, 2.0, 1.0),
        record("A2", 2, 1, 0.0, 0.0),
        record("A3", 3, 1, 1.0, 1.0),
        record("A4", 4, 1, 4.0, 2.0),
    ];
    let mut summaries = summarize_wells(&records);
    sort_by_ratio(&mut summaries);
    let order: Vec<String> = summaries.iter().map(|s| s.well_id.to_string()).collect();
    assert_eq!(order, ["A3", "A1", "A4", "A2"]);
}

#[test]
fn test_tables_have_expected_columns() {
    let records = [record("B2", 26, 3, 8.0, 2.0)];
    let raw = records_table(&records);
    assert_eq!(raw.columns, RECORD_COLUMNS);
    assert_eq!(
        raw.rows[0],
        ["B2", "26", "3", "10", "80", "8", "10", "20", "2"]
    );

    let avg = summaries_table(&summarize_wells(&records));
    assert_eq!(avg.columns, SUMMARY_COLUMNS);
    assert_eq!(avg.rows[0][0], "B2");
    assert_eq!(avg.rows[0][2], "1");
    assert_eq!(avg.rows[0][9], "4");
}

// =============================================================================
// Plate Driver Tests
// =============================================================================

#[test]
fn test_position_tasks_paths() {
    let analysis = PlateAnalysis::new(ScreenConfig {
        data_root: PathBuf::from("/screen"),
        ..Default::default()
    })
    .unwrap();
    let tasks = analysis.position_tasks(4).unwrap();
    assert_eq!(tasks.len(), 384 * 3);

    let t = &tasks[3 * 24 + 1];
    assert_eq!(t.key.well_id.to_string(), "B1");
    assert_eq!(t.key.position, 2);
    assert_eq!(
        t.intensity_path,
        PathBuf::from("/screen/plate_4/data/B1--W00025--P00002--Z00000--T00000--488nm.tif")
    );
    assert_eq!(
        t.mask_path,
        PathBuf::from(
            "/screen/Analysis/plate 4/processed/B1--W00025--P00002--Z00000--T00000--CellMask.tif"
        )
    );
}

#[test]
fn test_analyze_plate_skips_and_measures() {
    let root = fresh_test_dir("driver_analyze_plate");
    let config = screen_config(&root);
    write_plate(&config);

    let analysis = PlateAnalysis::new(config).unwrap();
    let result = analysis.analyze_plate(1).unwrap();

    let keys: Vec<String> = result.records.iter().map(|r| r.key.to_string()).collect();
    assert_eq!(keys, ["A1 - 1", "A2 - 1"]);

    let counts = result.skip_counts();
    assert_eq!(counts.get(&SkipReason::EmptyMask), Some(&1));
    assert_eq!(counts.get(&SkipReason::MissingFile), Some(&1));

    let rim = &result.records[0];
    assert_eq!(rim.membrane.mean, 300.0);
    assert!(rim.interior.mean < 300.0);

    let uniform = &result.records[1];
    assert_eq!(uniform.membrane.mean, 500.0);
    assert_eq!(uniform.interior.mean, 500.0);
}

#[test]
fn test_well_id_disagreeing_with_number_is_skipped() {
    let root = fresh_test_dir("driver_well_id_mismatch");
    let config = screen_config(&root);
    write_plate(&config);

    let analysis = PlateAnalysis::new(config.clone()).unwrap();
    let mut task = analysis.position_tasks(1).unwrap()[0].clone();
    assert_eq!(task.key.to_string(), "A1 - 1");

    // Same image, but named as well A2 with well number 1.
    let data = config.intensity_dir_for(1);
    let renamed = image_path(&data, "A2", 1, 1, "488nm");
    std::fs::copy(&task.intensity_path, &renamed).unwrap();
    task.intensity_path = renamed;

    let outcome = analysis.process_position(1, &task).unwrap();
    assert_eq!(
        outcome,
        PositionOutcome::Skipped(task.key, SkipReason::MalformedFilename)
    );
}

#[test]
fn test_run_writes_plate_tables() {
    let root = fresh_test_dir("driver_run");
    let config = screen_config(&root);
    write_plate(&config);

    let analysis = PlateAnalysis::new(config.clone()).unwrap();
    let summary = analysis.run().unwrap();
    assert_eq!(summary.plates, 1);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.wells, 2);
    assert_eq!(summary.skipped_total(), 2);

    let raw = Table::read(&config.raw_results_file(1)).unwrap();
    assert_eq!(raw.columns, RECORD_COLUMNS);
    assert_eq!(raw.len(), 2);

    let avg = Table::read(&config.averaged_results_file(1)).unwrap();
    assert_eq!(avg.columns, SUMMARY_COLUMNS);
    let order: Vec<&str> = avg.rows.iter().map(|r| r[0].as_str()).collect();
    // Uniform well has ratio 1; the rim-bright well sorts after it.
    assert_eq!(order, ["A2", "A1"]);
    assert_eq!(avg.rows[0][9], "1");
}

#[test]
fn test_mask_previews_are_written() {
    let root = fresh_test_dir("driver_mask_previews");
    let config = ScreenConfig {
        save_mask_previews: true,
        ..screen_config(&root)
    };
    write_plate(&config);

    let analysis = PlateAnalysis::new(config.clone()).unwrap();
    analysis.analyze_plate(1).unwrap();

    let dir = config.preview_path().join("plate 1");
    assert!(dir
        .join("A1--W00001--P00001--Z00000--T00000--membrane.png")
        .exists());
    assert!(dir
        .join("A2--W00002--P00001--Z00000--T00000--interior.png")
        .exists());
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = PlateAnalysis::new(ScreenConfig {
        positions: 0,
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::Config(_))));
}
