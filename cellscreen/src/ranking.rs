//! Cross-plate ranking of wells by intensity ratio.

use crate::config::ScreenConfig;
use crate::driver::{RATIO_COLUMN, WELL_ID_COLUMN};
use crate::error::{Error, Result};
use crate::table::Table;

pub const PLATE_WELL_COLUMN: &str = "Plate-Well";
pub const PLATE_COLUMN: &str = "Plate";

/// Concatenates per-plate averaged tables into one table ordered by
/// intensity ratio, with `Plate-Well` and `Plate` prepended.
///
/// All tables must share the columns of the first one.
pub fn rank_tables(plates: &[(u32, Table)]) -> Result<Table> {
    let Some((_, first)) = plates.first() else {
        return Ok(Table::from_columns(&[PLATE_WELL_COLUMN, PLATE_COLUMN]));
    };

    let mut columns = vec![PLATE_WELL_COLUMN.to_string(), PLATE_COLUMN.to_string()];
    columns.extend(first.columns.iter().cloned());
    let mut ranking = Table::new(columns);

    for (plate, table) in plates {
        if table.columns != first.columns {
            return Err(Error::MalformedTable {
                path: table.origin.clone(),
                line: 1,
                reason: format!("columns differ from '{}'", first.origin.display()),
            });
        }
        let well = table.require_column(WELL_ID_COLUMN)?;
        table.require_column(RATIO_COLUMN)?;

        for row in &table.rows {
            let mut out = Vec::with_capacity(row.len() + 2);
            out.push(format!("{plate}{}", row[well]));
            out.push(plate.to_string());
            out.extend(row.iter().cloned());
            ranking.push_row(out);
        }
    }

    ranking.sort_by_numeric_column(RATIO_COLUMN);
    Ok(ranking)
}

/// Reads the averaged table of every configured plate, ranks the wells and
/// writes the ranking table. Plates without an averaged table are logged
/// and left out.
pub fn rank_plates(config: &ScreenConfig) -> Result<Table> {
    let mut tables = Vec::with_capacity(config.plates.len());
    for &plate in &config.plates {
        let path = config.averaged_results_file(plate);
        if !path.is_file() {
            tracing::warn!(plate, path = %path.display(), "No averaged results, leaving plate out");
            continue;
        }
        tables.push((plate, Table::read(&path)?));
    }

    let ranking = rank_tables(&tables)?;
    ranking.write(&config.ranking_file())?;
    tracing::info!(
        plates = tables.len(),
        wells = ranking.len(),
        path = %config.ranking_file().display(),
        "Wrote ranking"
    );
    Ok(ranking)
}
