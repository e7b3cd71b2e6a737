use std::path::Path;

use tracing::{debug, info, warn};

use crate::database::DatabaseManager;
use crate::error::Result;
use crate::models::{Company, ImportStats};
use crate::sheet::{load_grid, Grid};
use crate::utils::{clean_number, clean_text};

/// The export carries a title line above the header.
const HEADER_ROW: usize = 1;
const FIRST_DATA_ROW: usize = 2;
const TICKER_COL: usize = 0;

/// Map the company master export to company records.
///
/// Returns the mapped companies and the number of rows skipped for a missing
/// ticker. Optional columns that are absent from the header map to `None`.
pub fn map_companies(grid: &Grid) -> (Vec<Company>, usize) {
    let header = grid.header_map(HEADER_ROW);
    let column = |name: &str| header.get(name).copied();

    for expected in ["NAME", "COUNTRY", "GICS_SECTOR_NAME"] {
        if column(expected).is_none() {
            warn!("company master has no {} column; values will be null", expected);
        }
    }

    let name_col = column("NAME");
    let country_col = column("COUNTRY");
    let currency_col = column("CRNCY");
    let sector_col = column("GICS_SECTOR_NAME");
    let group_col = column("GICS_INDUSTRY_GROUP_NAME");
    let industry_col = column("GICS_INDUSTRY_NAME");
    let sub_industry_col = column("GICS_SUB_INDUSTRY_NAME");
    let market_cap_col = column("CUR_MKT_CAP");

    let text_at = |row: usize, col: Option<usize>| col.and_then(|c| clean_text(grid.cell(row, c)));

    let mut companies = Vec::new();
    let mut skipped = 0;

    for row in FIRST_DATA_ROW..grid.height() {
        let ticker = match clean_text(grid.cell(row, TICKER_COL)) {
            Some(t) => t,
            None => {
                debug!("Row {}: no ticker, skipping", row);
                skipped += 1;
                continue;
            }
        };

        companies.push(Company {
            company_id: None,
            ticker,
            company_name: text_at(row, name_col),
            country_id: text_at(row, country_col).map(|c| c.chars().take(2).collect()),
            currency: text_at(row, currency_col),
            gics_sector_name: text_at(row, sector_col),
            gics_industry_group_name: text_at(row, group_col),
            gics_industry_name: text_at(row, industry_col),
            gics_sub_industry_name: text_at(row, sub_industry_col),
            current_market_cap: market_cap_col.and_then(|c| clean_number(grid.cell(row, c))),
            is_active: true,
        });
    }

    (companies, skipped)
}

/// Import company_master.csv → companies table.
pub fn import_companies(db: &DatabaseManager, path: &Path) -> Result<ImportStats> {
    info!("🏢 Importing companies from {}...", path.display());

    let grid = load_grid(path)?;
    let (companies, skipped) = map_companies(&grid);

    let mut stats = ImportStats::new("companies");
    stats.rows_read = companies.len() + skipped;
    stats.rows_skipped = skipped;

    db.begin()?;
    for company in &companies {
        if db.insert_company(company)? {
            stats.rows_written += 1;
        }
    }
    db.commit()?;

    info!(
        "   ✓ Imported {} companies ({} skipped, {} already present)",
        stats.rows_written,
        skipped,
        companies.len() - stats.rows_written
    );
    Ok(stats)
}
