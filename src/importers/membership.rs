use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info};

use super::TickerResolver;
use crate::database::DatabaseManager;
use crate::error::{EtlError, Result};
use crate::models::{ImportStats, IndexMembership, SnapshotRow};
use crate::sheet::Cell;
use crate::utils::{clean_number, parse_date_str};

fn clean_field(value: &Option<String>) -> Option<f64> {
    value
        .as_deref()
        .and_then(|raw| clean_number(&Cell::text(raw)))
}

/// Map one snapshot row for an already-resolved company.
///
/// `None` when the as-of date cannot be parsed.
pub fn map_membership_row(row: &SnapshotRow, company_id: i64) -> Option<IndexMembership> {
    let as_of_date = parse_date_str(&row.as_of_date)?;
    Some(IndexMembership {
        index_id: row.index_id.trim().to_string(),
        company_id,
        as_of_date,
        weight: clean_field(&row.weight),
        shares_outstanding: clean_field(&row.shares),
        price: clean_field(&row.price),
    })
}

pub fn read_snapshot(path: &Path) -> Result<Vec<SnapshotRow>> {
    if !path.exists() {
        return Err(EtlError::MissingFile(path.to_path_buf()));
    }
    let mut rdr = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in rdr.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

/// Import index_membership_snapshot.csv → index_membership table.
pub fn import_index_membership(
    db: &DatabaseManager,
    resolver: &mut TickerResolver,
    path: &Path,
) -> Result<ImportStats> {
    info!("📊 Importing index membership from {}...", path.display());

    let rows = read_snapshot(path)?;
    let mut stats = ImportStats::new("index_membership");
    stats.rows_read = rows.len();

    db.begin()?;
    for row in &rows {
        let company_id = match resolver.resolve(db, row.ticker.trim())? {
            Some(id) => id,
            None => {
                stats.rows_skipped += 1;
                continue;
            }
        };

        let membership = match map_membership_row(row, company_id) {
            Some(m) => m,
            None => {
                debug!("{}: unparsable as-of date '{}'", row.ticker, row.as_of_date);
                stats.rows_skipped += 1;
                continue;
            }
        };

        if db.insert_membership(&membership)? {
            stats.rows_written += 1;
        }
    }
    db.commit()?;

    info!(
        "   ✓ Imported {} membership records ({} skipped)",
        stats.rows_written, stats.rows_skipped
    );
    Ok(stats)
}
