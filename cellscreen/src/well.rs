//! Well addressing: letter/number well IDs ("A1") and sequential well
//! numbers (1..=rows×columns) under row-major or column-major stacking.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{Error, Result};

/// Single-letter row labels limit plates to this many rows.
pub const MAX_ROWS: u32 = 26;

/// Order in which wells are numbered across the plate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StackOrder {
    /// A1, A2, ..., A24, B1, ... (numbering runs along rows).
    #[default]
    RowStack,
    /// A1, B1, ..., P1, A2, ... (numbering runs down columns).
    ColumnStack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToNumber,
    ToId,
}

/// One of the four well conversions.
///
/// Text names are only accepted at the config/CLI boundary via [`FromStr`];
/// everything else works with the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub order: StackOrder,
    pub direction: Direction,
}

impl FromStr for Conversion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (order, direction) = match s {
            "ID2num_row_stack" => (StackOrder::RowStack, Direction::ToNumber),
            "ID2num_column_stack" => (StackOrder::ColumnStack, Direction::ToNumber),
            "num2ID_row_stack" => (StackOrder::RowStack, Direction::ToId),
            "num2ID_column_stack" => (StackOrder::ColumnStack, Direction::ToId),
            _ => return Err(Error::UnsupportedConversionMethod(s.to_string())),
        };
        Ok(Self { order, direction })
    }
}

/// A well identifier: row letter plus 1-based column number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WellId {
    /// 0-based row index ('A' = 0).
    row: u8,
    /// 1-based column number.
    column: u32,
}

impl WellId {
    pub fn new(row: u8, column: u32) -> Result<Self> {
        if u32::from(row) >= MAX_ROWS || column == 0 {
            return Err(Error::InvalidWellId(format!("row {row} column {column}")));
        }
        Ok(Self { row, column })
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn row_letter(&self) -> char {
        char::from(b'A' + self.row)
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.column)
    }
}

impl FromStr for WellId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidWellId(s.to_string());

        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(invalid)?;
        if !letter.is_ascii_uppercase() {
            return Err(invalid());
        }
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let column: u32 = digits.parse().map_err(|_| invalid())?;
        if column == 0 {
            return Err(invalid());
        }

        Ok(Self {
            row: letter as u8 - b'A',
            column,
        })
    }
}

/// Plate geometry: number of rows and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateShape {
    pub rows: u32,
    pub columns: u32,
}

impl Default for PlateShape {
    fn default() -> Self {
        Self::WELLS_384
    }
}

impl PlateShape {
    /// Standard 384-well plate, 16 rows (A..P) × 24 columns.
    pub const WELLS_384: PlateShape = PlateShape {
        rows: 16,
        columns: 24,
    };

    pub fn new(rows: u32, columns: u32) -> Result<Self> {
        let shape = Self { rows, columns };
        shape.validate()?;
        Ok(shape)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.rows > MAX_ROWS {
            return Err(Error::Config(format!(
                "plate rows must be in 1..={MAX_ROWS}, got {}",
                self.rows
            )));
        }
        if self.columns == 0 {
            return Err(Error::Config("plate columns must be positive".into()));
        }
        Ok(())
    }

    pub fn well_count(&self) -> u32 {
        self.rows * self.columns
    }

    pub fn contains(&self, id: &WellId) -> bool {
        u32::from(id.row) < self.rows && id.column <= self.columns
    }

    pub fn number_to_id(&self, number: u32, order: StackOrder) -> Result<WellId> {
        if number == 0 || number > self.well_count() {
            return Err(Error::WellNumberOutOfRange {
                number,
                wells: self.well_count(),
            });
        }

        let (row, column) = match order {
            StackOrder::RowStack => {
                let mut row = number / self.columns;
                let mut column = number % self.columns;
                if column == 0 {
                    column = self.columns;
                    row -= 1;
                }
                (row, column)
            }
            StackOrder::ColumnStack => {
                let mut row = number % self.rows;
                let mut column = number / self.rows + 1;
                if row == 0 {
                    row = self.rows;
                    column -= 1;
                }
                (row - 1, column)
            }
        };

        WellId::new(row as u8, column)
    }

    pub fn id_to_number(&self, id: &WellId, order: StackOrder) -> Result<u32> {
        if !self.contains(id) {
            return Err(Error::InvalidWellId(id.to_string()));
        }
        let row = u32::from(id.row);
        Ok(match order {
            StackOrder::RowStack => row * self.columns + id.column,
            StackOrder::ColumnStack => row + 1 + self.rows * (id.column - 1),
        })
    }

    /// Text-level conversion: a well ID or well number in, the converted
    /// value out.
    pub fn convert(&self, value: &str, conversion: Conversion) -> Result<String> {
        match conversion.direction {
            Direction::ToNumber => {
                let id: WellId = value.trim().parse()?;
                Ok(self.id_to_number(&id, conversion.order)?.to_string())
            }
            Direction::ToId => {
                let number: u32 = value
                    .trim()
                    .parse()
                    .map_err(|_| Error::InvalidWellId(value.to_string()))?;
                Ok(self.number_to_id(number, conversion.order)?.to_string())
            }
        }
    }
}
