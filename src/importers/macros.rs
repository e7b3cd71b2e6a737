use std::path::Path;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::database::DatabaseManager;
use crate::error::Result;
use crate::models::{ImportStats, MacroCategory, MacroIndicator};
use crate::sheet::{load_grid, Cell, Grid};
use crate::utils::{clean_number, clean_text, month_abbreviation, month_calendar};

/// Row 1 holds "Text, Ticker, Dec, Nov, ..."; indicators follow.
const HEADER_ROW: usize = 1;
const FIRST_DATA_ROW: usize = 2;
const NAME_COL: usize = 0;
const TICKER_COL: usize = 1;
const FIRST_VALUE_COL: usize = 2;

/// Month of every value column, newest first.
pub fn column_months(grid: &Grid, end_month: NaiveDate) -> Vec<(usize, NaiveDate)> {
    let count = grid.width().saturating_sub(FIRST_VALUE_COL);
    month_calendar(end_month, count)
        .into_iter()
        .enumerate()
        .map(|(offset, month)| (FIRST_VALUE_COL + offset, month))
        .collect()
}

/// Header cells that name a different month than the reconstructed calendar.
///
/// Only cells that look like a month (a date, or text starting with a month
/// abbreviation) are compared.
pub fn header_mismatches(grid: &Grid, months: &[(usize, NaiveDate)]) -> Vec<(usize, String)> {
    let mut mismatches = Vec::new();
    for (col, month) in months {
        let cell = grid.cell(HEADER_ROW, *col);
        let matches = match cell {
            Cell::Date(d) => Some(d.year() == month.year() && d.month() == month.month()),
            Cell::Text(raw) => {
                let label = raw.trim().to_ascii_lowercase();
                let named = (1..=12).find(|m| label.starts_with(&month_abbreviation(*m).to_ascii_lowercase()));
                named.map(|m| m == month.month())
            }
            Cell::Empty | Cell::Number(_) => None,
        };
        if matches == Some(false) {
            mismatches.push((*col, cell.as_label().unwrap_or_default()));
        }
    }
    mismatches
}

/// Map one country's macro export to indicator observations.
///
/// Returns the observations and the number of indicator rows skipped for a
/// missing name. Null cells are not observations and are not counted.
pub fn map_macro(grid: &Grid, country_id: &str, end_month: NaiveDate) -> (Vec<MacroIndicator>, usize) {
    let months = column_months(grid, end_month);

    let mismatches = header_mismatches(grid, &months);
    if let Some((col, label)) = mismatches.first() {
        warn!(
            "{}: {} header months disagree with the calendar ending {} (first: column {} is '{}')",
            country_id,
            mismatches.len(),
            end_month.format("%Y-%m"),
            col,
            label
        );
    }

    let mut indicators = Vec::new();
    let mut skipped = 0;

    for row in FIRST_DATA_ROW..grid.height() {
        let indicator_name = match clean_text(grid.cell(row, NAME_COL)) {
            Some(name) => name,
            None => {
                skipped += 1;
                continue;
            }
        };
        let bloomberg_ticker = clean_text(grid.cell(row, TICKER_COL));
        let indicator_category = MacroCategory::classify(&indicator_name);

        for (col, indicator_date) in &months {
            if let Some(indicator_value) = clean_number(grid.cell(row, *col)) {
                indicators.push(MacroIndicator {
                    country_id: country_id.to_string(),
                    indicator_date: *indicator_date,
                    indicator_name: indicator_name.clone(),
                    bloomberg_ticker: bloomberg_ticker.clone(),
                    indicator_value,
                    indicator_category,
                });
            }
        }
    }

    (indicators, skipped)
}

/// Import one country's macro export → macro_indicators table.
pub fn import_macro(
    db: &DatabaseManager,
    path: &Path,
    country_id: &str,
    end_month: NaiveDate,
) -> Result<ImportStats> {
    info!("🌍 Importing macro ({}) from {}...", country_id, path.display());

    let grid = load_grid(path)?;
    let (indicators, skipped) = map_macro(&grid, country_id, end_month);
    debug!("{}: {} observations mapped", country_id, indicators.len());

    let mut stats = ImportStats::new(format!("macro_indicators_{}", country_id));
    stats.rows_read = indicators.len() + skipped;
    stats.rows_skipped = skipped;

    db.begin()?;
    for indicator in &indicators {
        if db.insert_macro_indicator(indicator)? {
            stats.rows_written += 1;
        }
    }
    db.commit()?;

    info!("   ✓ Imported {} macro records", stats.rows_written);
    Ok(stats)
}
