//! Tab-separated result tables.
//!
//! First line is the header; every following non-empty line must have the
//! same number of fields. Values are kept as text; numeric columns are
//! parsed on demand.

use std::cmp::Ordering;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const DELIMITER: &str = "\t";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// File the table was read from, for error messages.
    pub origin: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            origin: PathBuf::new(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_columns(columns: &[&str]) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
            .filter(|(_, l)| !l.trim().is_empty());

        let (_, header) = lines.next().ok_or_else(|| Error::MalformedTable {
            path: origin.to_path_buf(),
            line: 1,
            reason: "missing header".into(),
        })?;
        let columns: Vec<String> = header.split(DELIMITER).map(|c| c.trim().to_string()).collect();

        let mut rows = Vec::new();
        for (line, text) in lines {
            let row: Vec<String> = text.split(DELIMITER).map(|f| f.trim().to_string()).collect();
            if row.len() != columns.len() {
                return Err(Error::MalformedTable {
                    path: origin.to_path_buf(),
                    line,
                    reason: format!("expected {} fields, found {}", columns.len(), row.len()),
                });
            }
            rows.push(row);
        }

        Ok(Self {
            origin: origin.to_path_buf(),
            columns,
            rows,
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = fs::File::create(path).map_err(|e| Error::io(path, e))?;
        let mut out = BufWriter::new(file);

        let mut write_line = |fields: &[String]| -> io::Result<()> {
            writeln!(out, "{}", fields.join(DELIMITER))
        };
        write_line(&self.columns[..]).map_err(|e| Error::io(path, e))?;
        for row in &self.rows {
            write_line(&row[..]).map_err(|e| Error::io(path, e))?;
        }
        out.flush().map_err(|e| Error::io(path, e))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| Error::MissingColumn {
            path: self.origin.clone(),
            column: name.to_string(),
        })
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width mismatch");
        self.rows.push(row);
    }

    /// Stable ascending sort on a numeric column. Values that do not parse
    /// or are NaN go last, keeping their relative order.
    pub fn sort_by_numeric(&mut self, column: usize) {
        self.rows.sort_by(|a, b| {
            let key = |row: &[String]| row[column].parse::<f64>().ok().filter(|v| !v.is_nan());
            compare_nan_last(key(a), key(b))
        });
    }

    /// Stable ascending sort on a named numeric column, if the table has it.
    /// Returns whether the column was found.
    pub fn sort_by_numeric_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.sort_by_numeric(idx);
                true
            }
            None => false,
        }
    }
}

/// Ascending order with missing values after every present one.
pub fn compare_nan_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Text form of a measurement value.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::fresh_test_dir;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_write_then_read() {
        let dir = fresh_test_dir("table_write_read");
        let path = dir.join("nested").join("plate 1.txt");

        let mut table = Table::from_columns(&["WellID", "IntensityRatio"]);
        table.push_row(row(&["A1", "1.5"]));
        table.push_row(row(&["A2", "0.25"]));
        table.write(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "WellID\tIntensityRatio\nA1\t1.5\nA2\t0.25\n");

        let back = Table::read(&path).unwrap();
        assert_eq!(back.columns, table.columns);
        assert_eq!(back.rows, table.rows);
        assert_eq!(back.origin, path);
    }

    #[test]
    fn test_fields_are_split_only_on_delimiter() {
        let dir = fresh_test_dir("table_delimiter");
        let path = dir.join("genes.txt");

        let mut table = Table::from_columns(&["Gene", "Plate-Well"]);
        table.push_row(row(&["cell wall protein", "3-A1"]));
        table.write(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let line = text.lines().nth(1).unwrap();
        assert_eq!(line.split(DELIMITER).collect::<Vec<_>>(), ["cell wall protein", "3-A1"]);
        assert_eq!(Table::read(&path).unwrap().rows, table.rows);
    }

    #[test]
    fn test_parse_tolerates_crlf_and_blank_lines() {
        let table = Table::parse("A\tB\r\n1\t2\r\n\r\n3\t4\r\n", Path::new("t.tsv")).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1], row(&["3", "4"]));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let err = Table::parse("A\tB\n1\t2\n3\n", Path::new("t.tsv")).unwrap_err();
        assert!(matches!(err, Error::MalformedTable { line: 3, .. }));

        let err = Table::parse("", Path::new("t.tsv")).unwrap_err();
        assert!(matches!(err, Error::MalformedTable { .. }));
    }

    #[test]
    fn test_require_column() {
        let table = Table::parse("ORF\tGene\n", Path::new("strains.tsv")).unwrap();
        assert_eq!(table.require_column("Gene").unwrap(), 1);
        let err = table.require_column("WellID").unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "WellID"));
    }

    #[test]
    fn test_numeric_sort_is_stable_with_nan_last() {
        let mut table = Table::from_columns(&["WellID", "IntensityRatio"]);
        for (id, ratio) in [("A1", "2"), ("A2", "NaN"), ("A3", "0.5"), ("A4", "2"), ("A5", "x")] {
            table.push_row(row(&[id, ratio]));
        }
        assert!(table.sort_by_numeric_column("IntensityRatio"));
        let order: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(order, ["A3", "A1", "A4", "A2", "A5"]);

        assert!(!table.sort_by_numeric_column("Missing"));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(15.0), "15");
        assert_eq!(format_value(0.125), "0.125");
        assert_eq!(format_value(f64::NAN), "NaN");
    }
}
