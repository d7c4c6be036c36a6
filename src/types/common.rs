use csv::StringRecord;

use crate::error::{Result, ToolError};
use crate::types::amount::Amount;

/// One CSV line, kept exactly as it was read.
pub type Row = StringRecord;

/// A header plus its rows in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub headers: StringRecord,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: StringRecord, rows: Vec<Row>) -> Self {
        Dataset { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Same header, only the given rows.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Dataset {
            headers: self.headers.clone(),
            rows,
        }
    }

    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|header| header == column)
            .ok_or_else(|| ToolError::ColumnNotFound {
                column: column.to_string(),
                available: self.headers.iter().map(str::to_string).collect(),
            })
    }

    /// Parses every cell of `column` as an amount, failing on the first bad one.
    pub fn amounts(&self, column: &str) -> Result<Vec<Amount>> {
        let idx = self.column_index(column)?;

        self.rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let raw = row.get(idx).unwrap_or_default();
                raw.parse::<Amount>()
                    .map_err(|_| ToolError::MalformedValue {
                        column: column.to_string(),
                        line: line_of(row, row_idx),
                        value: raw.to_string(),
                    })
            })
            .collect()
    }
}

/// Line in the source file, falling back to header + position for rows built in memory.
pub fn line_of(row: &Row, row_idx: usize) -> u64 {
    row.position()
        .map(|pos| pos.line())
        .unwrap_or(row_idx as u64 + 2)
}
