//! Strain metadata and annotation of result tables.
//!
//! The strain sheet maps each strain (ORF, gene) to a plate position code
//! such as `3A01` or `3_A_01`: the first digit run is the plate, the
//! letters after it the row and the next digit run the column.

use std::path::{Path, PathBuf};

use crate::config::StrainSheetConfig;
use crate::driver::{result_files, RATIO_COLUMN, WELL_ID_COLUMN};
use crate::error::{Error, Result};
use crate::table::Table;

/// Subdirectory of the results directory receiving annotated tables.
pub const ANNOTATED_DIR: &str = "W strains";

/// Plate position parsed from a strain code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrainCode {
    pub plate: u32,
    pub row: String,
    pub column: u32,
}

impl StrainCode {
    pub fn parse(code: &str) -> Result<Self> {
        let malformed = || Error::MalformedStrainCode(code.to_string());

        let runs = digit_runs(code);
        let [(plate_start, plate_end), (column_start, column_end), ..] = runs.as_slice() else {
            return Err(malformed());
        };

        let plate = code[*plate_start..*plate_end]
            .parse()
            .map_err(|_| malformed())?;
        let row: String = code[*plate_end..*column_start]
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        if row.is_empty() {
            return Err(malformed());
        }
        let column = code[*column_start..*column_end]
            .parse()
            .map_err(|_| malformed())?;

        Ok(Self { plate, row, column })
    }

    /// Row letters followed by the column without zero padding, as used
    /// in result tables.
    pub fn well_id(&self) -> String {
        format!("{}{}", self.row, self.column)
    }
}

/// Byte ranges of the maximal ASCII digit runs in `s`.
fn digit_runs(s: &str) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, b) in s.bytes().enumerate() {
        match (b.is_ascii_digit(), start) {
            (true, None) => start = Some(i),
            (false, Some(st)) => {
                runs.push((st, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(st) = start {
        runs.push((st, s.len()));
    }
    runs
}

/// First digit run of a file name, e.g. 12 for `AVG Ratio for plate 12.txt`.
pub fn plate_from_file_name(name: &str) -> Option<u32> {
    digit_runs(name)
        .first()
        .and_then(|&(start, end)| name[start..end].parse().ok())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strain {
    pub orf: String,
    pub gene: String,
    pub code: StrainCode,
}

/// Strains of the screen in sheet order.
#[derive(Debug, Clone, Default)]
pub struct StrainSheet {
    pub strains: Vec<Strain>,
}

impl StrainSheet {
    pub fn load(path: &Path, columns: &StrainSheetConfig) -> Result<Self> {
        Self::from_table(&Table::read(path)?, columns)
    }

    pub fn from_table(table: &Table, columns: &StrainSheetConfig) -> Result<Self> {
        let orf = table.require_column(&columns.orf_column)?;
        let gene = table.require_column(&columns.gene_column)?;
        let code = table.require_column(&columns.code_column)?;

        let strains = table
            .rows
            .iter()
            .map(|row| {
                Ok(Strain {
                    orf: row[orf].clone(),
                    gene: row[gene].clone(),
                    code: StrainCode::parse(&row[code])?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(path = %table.origin.display(), strains = strains.len(), "Loaded strain sheet");
        Ok(Self { strains })
    }

    pub fn for_plate(&self, plate: u32) -> impl Iterator<Item = &Strain> {
        self.strains.iter().filter(move |s| s.code.plate == plate)
    }

    /// Inner join of the plate's strains with `results` on the well ID.
    ///
    /// Rows follow strain order, then result order. Columns are `ORF`,
    /// `Gene`, `WellID`, then the remaining result columns. Re-sorted by
    /// intensity ratio when the results carry one.
    pub fn annotate(&self, plate: u32, results: &Table) -> Result<Table> {
        let well_col = results.require_column(WELL_ID_COLUMN)?;

        let mut columns = vec!["ORF".to_string(), "Gene".to_string(), WELL_ID_COLUMN.to_string()];
        columns.extend(
            results
                .columns
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != well_col)
                .map(|(_, c)| c.clone()),
        );
        let mut merged = Table::new(columns);
        merged.origin = results.origin.clone();

        for strain in self.for_plate(plate) {
            let well_id = strain.code.well_id();
            for row in results.rows.iter().filter(|r| r[well_col] == well_id) {
                let mut out = vec![strain.orf.clone(), strain.gene.clone(), well_id.clone()];
                out.extend(
                    row.iter()
                        .enumerate()
                        .filter(|&(i, _)| i != well_col)
                        .map(|(_, v)| v.clone()),
                );
                merged.push_row(out);
            }
        }

        merged.sort_by_numeric_column(RATIO_COLUMN);
        Ok(merged)
    }
}

/// Annotates every result table in `results_dir`, writing the merged
/// tables to its `W strains` subdirectory under the same names. Returns
/// the written paths.
pub fn annotate_results(sheet: &StrainSheet, results_dir: &Path) -> Result<Vec<PathBuf>> {
    let out_dir = results_dir.join(ANNOTATED_DIR);
    let mut written = Vec::new();

    for path in result_files(results_dir)? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(plate) = plate_from_file_name(name) else {
            tracing::warn!(file = name, "No plate number in file name, skipping");
            continue;
        };

        let results = Table::read(&path)?;
        let merged = sheet.annotate(plate, &results)?;
        let out = out_dir.join(name);
        merged.write(&out)?;
        tracing::info!(file = name, plate, rows = merged.len(), "Annotated results");
        written.push(out);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::fresh_test_dir;

    fn sheet_table() -> Table {
        Table::parse(
            "ORF\tGene\t384 Plate_Row_Col\n\
             YAL001C\tTFC3\t1A01\n\
             YAL002W\tVPS8\t1_B_12\n\
             YAL003W\tEFB1\t2A01\n\
             YAL004W\tNone\t1A02\n",
            Path::new("strains.tsv"),
        )
        .unwrap()
    }

    fn sheet() -> StrainSheet {
        StrainSheet::from_table(&sheet_table(), &StrainSheetConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_strain_codes() {
        let code = StrainCode::parse("3_A01").unwrap();
        assert_eq!(code.plate, 3);
        assert_eq!(code.row, "A");
        assert_eq!(code.column, 1);
        assert_eq!(code.well_id(), "A1");

        let code = StrainCode::parse("12P24").unwrap();
        assert_eq!((code.plate, code.well_id().as_str()), (12, "P24"));

        let code = StrainCode::parse("1_B_12").unwrap();
        assert_eq!(code.well_id(), "B12");
    }

    #[test]
    fn test_malformed_strain_codes() {
        for bad in ["", "A01", "3", "3_01", "3A", "plate"] {
            assert!(
                matches!(StrainCode::parse(bad), Err(Error::MalformedStrainCode(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_sheet_missing_code_column() {
        let table = Table::parse("ORF\tGene\nYAL001C\tTFC3\n", Path::new("s.tsv")).unwrap();
        let err = StrainSheet::from_table(&table, &StrainSheetConfig::default()).unwrap_err();
        assert!(
            matches!(err, Error::MissingColumn { ref column, .. } if column == "384 Plate_Row_Col")
        );
    }

    #[test]
    fn test_plate_from_file_name() {
        assert_eq!(plate_from_file_name("plate 3.txt"), Some(3));
        assert_eq!(plate_from_file_name("AVG Ratio for plate 12.txt"), Some(12));
        assert_eq!(plate_from_file_name("ranking.txt"), None);
    }

    #[test]
    fn test_annotate_joins_on_well_and_sorts_by_ratio() {
        let results = Table::parse(
            "WellID\tWellNumber\tIntensityRatio\n\
             A1\t1\t2.5\n\
             A2\t2\t0.5\n\
             B12\t36\t1.5\n\
             C3\t51\t0.1\n",
            Path::new("AVG Ratio for plate 1.txt"),
        )
        .unwrap();

        let merged = sheet().annotate(1, &results).unwrap();
        assert_eq!(
            merged.columns,
            ["ORF", "Gene", "WellID", "WellNumber", "IntensityRatio"]
        );
        let genes: Vec<&str> = merged.rows.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(genes, ["None", "VPS8", "TFC3"]);
        assert_eq!(merged.rows[0], ["YAL004W", "None", "A2", "2", "0.5"]);
    }

    #[test]
    fn test_annotate_without_ratio_keeps_strain_order() {
        let results = Table::parse(
            "Position\tWellID\n1\tA2\n2\tA1\n1\tA1\n",
            Path::new("plate 1.txt"),
        )
        .unwrap();
        let merged = sheet().annotate(1, &results).unwrap();
        let rows: Vec<(&str, &str)> = merged
            .rows
            .iter()
            .map(|r| (r[2].as_str(), r[3].as_str()))
            .collect();
        assert_eq!(rows, [("A1", "2"), ("A1", "1"), ("A2", "1")]);
    }

    #[test]
    fn test_annotate_requires_well_column() {
        let results = Table::parse("Well\tRatio\nA1\t1\n", Path::new("plate 1.txt")).unwrap();
        assert!(matches!(
            sheet().annotate(1, &results),
            Err(Error::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_annotate_results_dir() {
        let dir = fresh_test_dir("strains_annotate_dir");
        std::fs::write(
            dir.join("AVG Ratio for plate 2.txt"),
            "WellID\tIntensityRatio\nA1\t1.2\nA2\t0.9\n",
        )
        .unwrap();
        std::fs::write(dir.join("ranking.txt"), "Plate-Well\n").unwrap();

        let written = annotate_results(&sheet(), &dir).unwrap();
        assert_eq!(written, [dir.join(ANNOTATED_DIR).join("AVG Ratio for plate 2.txt")]);

        let merged = Table::read(&written[0]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.rows[0], ["YAL003W", "EFB1", "A1", "1.2"]);
    }
}
