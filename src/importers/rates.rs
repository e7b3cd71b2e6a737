use std::path::Path;

use tracing::{debug, info, warn};

use crate::database::DatabaseManager;
use crate::error::Result;
use crate::models::{ImportStats, InterestRate, RateType};
use crate::sheet::{load_grid, Grid};
use crate::utils::{clean_number, clean_text, parse_date};

const TICKER_ROW: usize = 3;
const FIRST_DATA_ROW: usize = 6;

/// A fixed column of the rates export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateColumn {
    pub col: usize,
    pub country_id: &'static str,
    pub rate_type: RateType,
    pub bloomberg_ticker: &'static str,
}

const fn column(
    col: usize,
    country_id: &'static str,
    rate_type: RateType,
    bloomberg_ticker: &'static str,
) -> RateColumn {
    RateColumn {
        col,
        country_id,
        rate_type,
        bloomberg_ticker,
    }
}

pub const RATE_COLUMNS: [RateColumn; 10] = [
    column(1, "US", RateType::TenYearYield, "USGG10YR Index"),
    column(2, "GB", RateType::TenYearYield, "GTGBP10Y Govt"),
    column(3, "DE", RateType::TenYearYield, "GTDEM10Y Govt"),
    column(4, "JP", RateType::TenYearYield, "GTJPY10Y Govt"),
    column(5, "CN", RateType::TenYearYield, "GTCNY10Y Govt"),
    column(6, "US", RateType::PolicyRate, "FDTR Index"),
    column(7, "GB", RateType::PolicyRate, "UKBRBASE Index"),
    column(8, "DE", RateType::PolicyRate, "EURR002W Index"),
    column(9, "JP", RateType::PolicyRate, "BOJDTR Index"),
    column(10, "CN", RateType::PolicyRate, "PBOC7P Index"),
];

/// Columns whose ticker header differs from the literal table, with the
/// ticker actually found.
pub fn ticker_mismatches(grid: &Grid) -> Vec<(RateColumn, String)> {
    RATE_COLUMNS
        .iter()
        .filter_map(|rc| {
            let found = clean_text(grid.cell(TICKER_ROW, rc.col))?;
            (found != rc.bloomberg_ticker).then(|| (*rc, found))
        })
        .collect()
}

/// Map the rates export to observations; returns the rows and the number of
/// data rows skipped for an unparsable date.
pub fn map_interest_rates(grid: &Grid) -> (Vec<InterestRate>, usize) {
    for (rc, found) in ticker_mismatches(grid) {
        warn!(
            "Rates column {} is '{}', expected {} ({} {})",
            rc.col,
            found,
            rc.bloomberg_ticker,
            rc.country_id,
            rc.rate_type.as_str()
        );
    }

    let mut rates = Vec::new();
    let mut skipped = 0;

    for row in FIRST_DATA_ROW..grid.height() {
        let rate_date = match parse_date(grid.cell(row, 0)) {
            Some(d) => d,
            None => {
                debug!("Row {}: no parsable date", row);
                skipped += 1;
                continue;
            }
        };

        for rc in &RATE_COLUMNS {
            if let Some(rate_value) = clean_number(grid.cell(row, rc.col)) {
                rates.push(InterestRate {
                    country_id: rc.country_id.to_string(),
                    rate_date,
                    rate_type: rc.rate_type,
                    bloomberg_ticker: rc.bloomberg_ticker.to_string(),
                    rate_value,
                });
            }
        }
    }

    (rates, skipped)
}

/// Import the yields and policy rates export → interest_rates table.
pub fn import_interest_rates(db: &DatabaseManager, path: &Path) -> Result<ImportStats> {
    info!("💹 Importing interest rates from {}...", path.display());

    let grid = load_grid(path)?;
    let (rates, skipped) = map_interest_rates(&grid);

    let mut stats = ImportStats::new("interest_rates");
    stats.rows_read = rates.len() + skipped;
    stats.rows_skipped = skipped;

    db.begin()?;
    for rate in &rates {
        if db.insert_interest_rate(rate)? {
            stats.rows_written += 1;
        }
    }
    db.commit()?;

    info!("   ✓ Imported {} rate records", stats.rows_written);
    Ok(stats)
}
