use std::path::Path;

use tracing::{debug, info, warn};

use super::{progress_bar, TickerResolver};
use crate::database::DatabaseManager;
use crate::error::Result;
use crate::models::{FinancialField, FinancialValues, Financials, ImportStats, PeriodType};
use crate::sheet::{load_grid, Cell, Grid};
use crate::utils::{clean_number, clean_text, parse_date, period_calendar};

const TICKER_ROW: usize = 3;
const FIELD_ROW: usize = 5;
const FIRST_DATA_ROW: usize = 6;
const FIRST_BLOCK_COL: usize = 1;
const BLOCK_WIDTH: usize = 7;

/// Years covered by the financial statement exports.
pub const FIRST_PERIOD_YEAR: i32 = 2005;
pub const LAST_PERIOD_YEAR: i32 = 2024;

/// One ticker's seven-column block.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialBlock {
    pub ticker: String,
    /// (column, field) for every recognised field label.
    pub fields: Vec<(usize, FinancialField)>,
}

pub fn locate_financial_blocks(grid: &Grid) -> Vec<FinancialBlock> {
    let mut blocks = Vec::new();

    for col in (FIRST_BLOCK_COL..grid.width()).step_by(BLOCK_WIDTH) {
        let ticker = match clean_text(grid.cell(TICKER_ROW, col)) {
            Some(t) => t,
            None => continue,
        };

        let labelled: Vec<(usize, Option<String>)> = (col..col + BLOCK_WIDTH)
            .map(|c| (c, grid.cell(FIELD_ROW, c).as_label()))
            .collect();

        if labelled.iter().all(|(_, l)| l.is_none()) {
            warn!("{}: no field labels in column {}, skipping block", ticker, col);
            continue;
        }

        let fields: Vec<(usize, FinancialField)> = labelled
            .into_iter()
            .filter_map(|(c, label)| {
                let label = label?;
                let field = FinancialField::from_mnemonic(&label);
                if field.is_none() {
                    debug!("{}: unmapped field {} in column {}", ticker, label, c);
                }
                field.map(|f| (c, f))
            })
            .collect();

        blocks.push(FinancialBlock { ticker, fields });
    }
    blocks
}

/// Overwrite the date column with the period calendar.
///
/// Some exports come back with the period end column blank or shifted; the
/// rows are always ordered oldest first, one per period.
pub fn fill_period_dates(grid: &mut Grid, period_type: PeriodType, first_year: i32, last_year: i32) {
    let calendar = period_calendar(period_type, first_year, last_year);
    let rows: Vec<usize> = (FIRST_DATA_ROW..grid.height()).collect();
    if rows.len() != calendar.len() {
        warn!(
            "{} calendar has {} periods but the sheet has {} data rows",
            period_type,
            calendar.len(),
            rows.len()
        );
    }
    for (row, date) in rows.into_iter().zip(calendar) {
        grid.set(row, 0, Cell::Date(date));
    }
}

/// Map a financial statement export to one row per ticker and period.
///
/// Returns the rows and the number of (ticker, row) pairs skipped because the
/// date was unparsable or every value was null.
pub fn map_financials<F>(
    grid: &Grid,
    period_type: PeriodType,
    mut resolve: F,
) -> Result<(Vec<Financials>, usize)>
where
    F: FnMut(&str) -> Result<Option<i64>>,
{
    let mut resolved = Vec::new();
    for block in locate_financial_blocks(grid) {
        match resolve(&block.ticker)? {
            Some(id) => resolved.push((id, block)),
            None => warn!("Financials block for unknown ticker {}, skipping", block.ticker),
        }
    }

    let mut rows = Vec::new();
    let mut skipped = 0;

    for row in FIRST_DATA_ROW..grid.height() {
        let period_end_date = match parse_date(grid.cell(row, 0)) {
            Some(d) => d,
            None => {
                debug!("Row {}: no parsable period end", row);
                skipped += resolved.len();
                continue;
            }
        };

        for (company_id, block) in &resolved {
            let mut values = FinancialValues::default();
            for (col, field) in &block.fields {
                values.set(*field, clean_number(grid.cell(row, *col)));
            }
            if values.is_empty() {
                skipped += 1;
                continue;
            }
            rows.push(Financials {
                company_id: *company_id,
                period_end_date,
                period_type,
                values,
                currency: None,
            });
        }
    }

    Ok((rows, skipped))
}

/// Import an annual or quarterly financials export → financials table.
pub fn import_financials(
    db: &DatabaseManager,
    resolver: &mut TickerResolver,
    path: &Path,
    period_type: PeriodType,
    fill_dates: bool,
    commit_every: usize,
) -> Result<ImportStats> {
    info!("📈 Importing {} financials from {}...", period_type, path.display());

    let mut grid = load_grid(path)?;
    if fill_dates {
        fill_period_dates(&mut grid, period_type, FIRST_PERIOD_YEAR, LAST_PERIOD_YEAR);
    }
    let (rows, skipped) = map_financials(&grid, period_type, |ticker| resolver.resolve(db, ticker))?;

    let source = match period_type {
        PeriodType::Annual => "financials_annual",
        PeriodType::Quarterly => "financials_quarterly",
    };
    let mut stats = ImportStats::new(source);
    stats.rows_read = rows.len() + skipped;
    stats.rows_skipped = skipped;

    let pb = progress_bar(rows.len() as u64, "Importing financials...");
    let commit_every = commit_every.max(1);

    db.begin()?;
    for (n, row) in rows.iter().enumerate() {
        if db.upsert_financials(row)? {
            stats.rows_written += 1;
        }
        if (n + 1) % commit_every == 0 {
            db.checkpoint()?;
            stats.checkpoints += 1;
            info!("   💾 Committed {} {} statements", n + 1, period_type);
        }
        pb.inc(1);
    }
    db.commit()?;
    pb.finish_and_clear();

    info!(
        "   ✓ Stored {} {} statements ({} empty periods skipped)",
        stats.rows_written, period_type, skipped
    );
    Ok(stats)
}
