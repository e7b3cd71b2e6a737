//! Per-year index constituent exports → one membership snapshot.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info};

use crate::error::{EtlError, Result};
use crate::models::SnapshotRow;
use crate::sheet::{load_grid, Grid};
use crate::utils::{extract_year, format_iso};

const HEADER_ROW: usize = 0;
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "csv"];

/// Constituent exports named `"<PREFIX> as of ..."` in `dir`, sorted by name.
///
/// Office lock files (`~$...`) are ignored.
pub fn discover_membership_files(dir: &Path, prefixes: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(EtlError::MissingFile(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        if name.starts_with("~$") {
            continue;
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }
        if prefixes.iter().any(|p| name.starts_with(&format!("{} as of", p))) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Index id and year-end as-of date encoded in an export's file name.
pub fn snapshot_identity(file_name: &str) -> Result<(String, NaiveDate)> {
    let index_id: String = file_name.chars().take(3).collect();
    let year = extract_year(file_name).ok_or_else(|| EtlError::FilenameYear(file_name.to_string()))?;
    let as_of = NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| EtlError::FilenameYear(file_name.to_string()))?;
    Ok((index_id, as_of))
}

/// Rows of one constituent export; `Ticker` is the only required column.
pub fn snapshot_rows(grid: &Grid, file_name: &str) -> Result<Vec<SnapshotRow>> {
    let (index_id, as_of) = snapshot_identity(file_name)?;
    let as_of_date = format_iso(as_of);

    let header = grid.header_map(HEADER_ROW);
    let ticker_col = *header.get("Ticker").ok_or_else(|| EtlError::MissingColumn {
        file: file_name.to_string(),
        column: "Ticker".to_string(),
    })?;
    let optional = |name: &str| header.get(name).copied();
    let (name_col, weight_col, shares_col, price_col) = (
        optional("Name"),
        optional("Weight"),
        optional("Shares"),
        optional("Price"),
    );
    let text_at = |row: usize, col: Option<usize>| col.and_then(|c| grid.cell(row, c).as_label());

    let mut rows = Vec::new();
    for row in HEADER_ROW + 1..grid.height() {
        let ticker = match grid.cell(row, ticker_col).as_label() {
            Some(t) => t,
            None => continue,
        };
        rows.push(SnapshotRow {
            index_id: index_id.clone(),
            as_of_date: as_of_date.clone(),
            ticker,
            name: text_at(row, name_col),
            weight: text_at(row, weight_col),
            shares: text_at(row, shares_col),
            price: text_at(row, price_col),
        });
    }
    Ok(rows)
}

/// Drop repeated (index, as-of date, ticker) rows, keeping the first.
pub fn dedup_snapshot(rows: Vec<SnapshotRow>) -> Vec<SnapshotRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|r| seen.insert((r.index_id.clone(), r.as_of_date.clone(), r.ticker.clone())))
        .collect()
}

/// Read every export and merge them into one de-duplicated snapshot.
pub fn consolidate_membership(files: &[PathBuf]) -> Result<Vec<SnapshotRow>> {
    let mut all = Vec::new();
    for path in files {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let grid = load_grid(path)?;
        let rows = snapshot_rows(&grid, &file_name)?;
        debug!("{}: {} constituents", file_name, rows.len());
        all.extend(rows);
    }

    let total = all.len();
    let rows = dedup_snapshot(all);
    info!(
        "🧩 Consolidated {} files into {} membership rows ({} duplicates dropped)",
        files.len(),
        rows.len(),
        total - rows.len()
    );
    Ok(rows)
}

pub fn write_snapshot(rows: &[SnapshotRow], path: &Path) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    if rows.is_empty() {
        wtr.write_record(["index_id", "as_of_date", "Ticker", "Name", "Weight", "Shares", "Price"])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    info!("💾 Saved {}", path.display());
    Ok(())
}

/// Sorted unique tickers of a snapshot CSV (`Ticker` or `ticker` column).
pub fn unique_tickers(snapshot: &Path) -> Result<Vec<String>> {
    if !snapshot.exists() {
        return Err(EtlError::MissingFile(snapshot.to_path_buf()));
    }
    let mut rdr = ReaderBuilder::new().from_path(snapshot)?;
    let headers = rdr.headers()?.clone();
    let col = headers
        .iter()
        .position(|h| h.trim() == "Ticker")
        .or_else(|| headers.iter().position(|h| h.trim() == "ticker"))
        .ok_or_else(|| EtlError::MissingColumn {
            file: snapshot.display().to_string(),
            column: "Ticker".to_string(),
        })?;

    let mut tickers = BTreeSet::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(t) = record.get(col).map(str::trim).filter(|t| !t.is_empty()) {
            tickers.insert(t.to_string());
        }
    }
    Ok(tickers.into_iter().collect())
}

pub fn write_ticker_list(tickers: &[String], path: &Path) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record(["ticker"])?;
    for ticker in tickers {
        wtr.write_record([ticker])?;
    }
    wtr.flush()?;
    info!("💾 Saved {}, unique tickers = {}", path.display(), tickers.len());
    Ok(())
}
