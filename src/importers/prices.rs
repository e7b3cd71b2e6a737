use std::path::Path;

use tracing::{debug, info, warn};

use super::{progress_bar, TickerResolver};
use crate::database::DatabaseManager;
use crate::error::Result;
use crate::models::{ImportStats, WeeklyPrice};
use crate::sheet::{load_grid, Grid};
use crate::utils::{clean_number, clean_text, parse_date};

const TICKER_ROW: usize = 3;
const FIELD_ROW: usize = 4;
const FIRST_DATA_ROW: usize = 6;
const FIRST_BLOCK_COL: usize = 1;
const BLOCK_WIDTH: usize = 2;

/// Column pair for one ticker in the weekly price export.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBlock {
    pub ticker: String,
    pub price_col: usize,
    pub return_col: usize,
}

/// Find the ticker blocks on the ticker row.
///
/// Each block is two columns wide. The first column labelled "Price" is the
/// price, and a "Return" label on the second column wins over one on the
/// first. Without labels the first column is the price.
pub fn locate_price_blocks(grid: &Grid) -> Vec<PriceBlock> {
    let mut blocks = Vec::new();

    for col in (FIRST_BLOCK_COL..grid.width()).step_by(BLOCK_WIDTH) {
        let ticker = match clean_text(grid.cell(TICKER_ROW, col)) {
            Some(t) => t,
            None => continue,
        };

        let label = |c: usize| grid.cell(FIELD_ROW, c).as_label().unwrap_or_default();
        let price_col = [col, col + 1]
            .into_iter()
            .find(|&c| label(c).contains("Price"))
            .unwrap_or(col);
        let return_col = [col + 1, col]
            .into_iter()
            .find(|&c| label(c).contains("Return"))
            .unwrap_or(col + 1);

        blocks.push(PriceBlock {
            ticker,
            price_col,
            return_col,
        });
    }
    blocks
}

/// Map the weekly price export to price rows.
///
/// `resolve` turns a ticker into a company id; blocks for unknown tickers are
/// dropped. Returns the rows and the number of candidate cells skipped for an
/// unparsable date or a missing close price.
pub fn map_prices<F>(grid: &Grid, mut resolve: F) -> Result<(Vec<WeeklyPrice>, usize)>
where
    F: FnMut(&str) -> Result<Option<i64>>,
{
    let mut resolved = Vec::new();
    for block in locate_price_blocks(grid) {
        match resolve(&block.ticker)? {
            Some(id) => resolved.push((id, block)),
            None => warn!("Price block for unknown ticker {}, skipping", block.ticker),
        }
    }

    let mut prices = Vec::new();
    let mut skipped = 0;

    for row in FIRST_DATA_ROW..grid.height() {
        let price_date = match parse_date(grid.cell(row, 0)) {
            Some(d) => d,
            None => {
                debug!("Row {}: no parsable date", row);
                skipped += resolved.len();
                continue;
            }
        };

        for (company_id, block) in &resolved {
            let close_price = match clean_number(grid.cell(row, block.price_col)) {
                Some(p) => p,
                None => {
                    skipped += 1;
                    continue;
                }
            };
            prices.push(WeeklyPrice {
                company_id: *company_id,
                price_date,
                close_price,
                total_return: clean_number(grid.cell(row, block.return_col)),
            });
        }
    }

    Ok((prices, skipped))
}

/// Import the weekly price export → prices_weekly table.
pub fn import_prices_weekly(
    db: &DatabaseManager,
    resolver: &mut TickerResolver,
    path: &Path,
    commit_every: usize,
) -> Result<ImportStats> {
    info!("💹 Importing weekly prices from {}...", path.display());

    let grid = load_grid(path)?;
    let (prices, skipped) = map_prices(&grid, |ticker| resolver.resolve(db, ticker))?;

    let mut stats = ImportStats::new("prices_weekly");
    stats.rows_read = prices.len() + skipped;
    stats.rows_skipped = skipped;

    let pb = progress_bar(prices.len() as u64, "Importing weekly prices...");
    let commit_every = commit_every.max(1);

    db.begin()?;
    for (n, price) in prices.iter().enumerate() {
        if db.insert_weekly_price(price)? {
            stats.rows_written += 1;
        }
        if (n + 1) % commit_every == 0 {
            db.checkpoint()?;
            stats.checkpoints += 1;
            info!("   💾 Committed {} price rows", n + 1);
        }
        pb.inc(1);
    }
    db.commit()?;
    pb.finish_and_clear();

    info!(
        "   ✓ Imported {} weekly prices ({} empty cells skipped)",
        stats.rows_written, skipped
    );
    Ok(stats)
}
