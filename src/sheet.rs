//! In-memory view of a single worksheet.
//!
//! Every vendor export is addressed positionally ("tickers live on row 3"),
//! so a [`Grid`] keeps cells at their absolute 0-based worksheet position even
//! when the used range of the workbook starts below `A1`.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{EtlError, Result};

/// A single spreadsheet cell after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Trimmed string form of the cell, `None` for empty cells.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Cell::Number(n) => Some(format_number(*n)),
            Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

static EMPTY: Cell = Cell::Empty;

/// Rectangular-ish table of cells; rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a grid from string literals; `""` becomes an empty cell.
    pub fn from_text_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| Cell::text(s.as_ref())).collect())
            .collect();
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Trimmed header label → column index for one row; the first occurrence
    /// of a repeated label wins.
    pub fn header_map(&self, row: usize) -> HashMap<String, usize> {
        let mut map = HashMap::new();
        for (col, cell) in self.row(row).iter().enumerate() {
            if let Some(label) = cell.as_label() {
                map.entry(label).or_insert(col);
            }
        }
        map
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let target = &mut self.rows[row];
        if target.len() <= col {
            target.resize(col + 1, Cell::Empty);
        }
        target[col] = cell;
    }
}

/// Load the first worksheet of a workbook, or a CSV rendition of one.
pub fn load_grid(path: &Path) -> Result<Grid> {
    if !path.exists() {
        return Err(EtlError::MissingFile(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let grid = match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path)?,
        "csv" => load_csv(path)?,
        _ => return Err(EtlError::UnsupportedFormat(path.to_path_buf())),
    };

    debug!(
        "Loaded {} ({} rows x {} cols)",
        path.display(),
        grid.height(),
        grid.width()
    );
    Ok(grid)
}

fn load_workbook(path: &Path) -> Result<Grid> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EtlError::EmptyWorkbook {
            file: path.display().to_string(),
        })??;

    let mut grid = Grid::new();
    let (row_offset, col_offset) = match range.start() {
        Some((r, c)) => (r as usize, c as usize),
        None => return Ok(grid),
    };

    for (r, row) in range.rows().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let cell = convert_cell(value);
            if !cell.is_empty() {
                grid.set(row_offset + r, col_offset + c, cell);
            }
        }
    }
    Ok(grid)
}

fn convert_cell(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => Cell::Date(ts.date()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.clone()),
        // Formula errors (#N/A, #DIV/0!) read like the vendor's own sentinels.
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

fn load_csv(path: &Path) -> Result<Grid> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::text).collect());
    }
    Ok(Grid::from_rows(rows))
}

/// Render a number the way a spreadsheet shows it: integers without `.0`.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
