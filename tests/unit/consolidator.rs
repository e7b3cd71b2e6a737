//! Membership consolidation over a scratch data directory

use assert_matches::assert_matches;
use macroalpha::consolidator::{
    consolidate_membership, discover_membership_files, unique_tickers, write_snapshot, write_ticker_list,
};
use macroalpha::models::SnapshotRow;
use macroalpha::EtlError;
use pretty_assertions::assert_eq;
use test_log::test;

use crate::common::fixtures::{write_grid, Workspace};
use crate::common::logging::log_test_step;

fn file_names(ws: &Workspace) -> Vec<String> {
    discover_membership_files(&ws.config.data_dir, &ws.config.sources.membership_indices)
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_discovery_skips_lock_files_and_other_exports() {
    let ws = Workspace::new();
    assert_eq!(
        file_names(&ws),
        vec![
            "SPX as of Dec 29 2023.csv",
            "UKX as of Dec 29 2023.csv",
            "UKX as of Dec 30 2022.csv",
        ]
    );
}

#[test]
fn test_consolidation_dedups_and_stamps_year_end() {
    log_test_step("Consolidating three constituent exports");
    let ws = Workspace::new();
    let files = discover_membership_files(&ws.config.data_dir, &ws.config.sources.membership_indices).unwrap();

    let rows = consolidate_membership(&files).unwrap();
    assert_eq!(rows.len(), 7);

    let spx: Vec<&SnapshotRow> = rows.iter().filter(|r| r.index_id == "SPX").collect();
    assert_eq!(spx.len(), 2);
    assert!(spx.iter().all(|r| r.as_of_date == "2023-12-31"));

    let hsbc = rows.iter().find(|r| r.ticker == "HSBA LN").unwrap();
    assert_eq!(hsbc.as_of_date, "2022-12-31");
    assert_eq!(hsbc.shares.as_deref(), Some("20,000,000,000"));
}

#[test]
fn test_snapshot_feeds_ticker_list() {
    let ws = Workspace::new();
    let files = discover_membership_files(&ws.config.data_dir, &ws.config.sources.membership_indices).unwrap();
    let rows = consolidate_membership(&files).unwrap();

    let snapshot = ws.config.snapshot_path();
    write_snapshot(&rows, &snapshot).unwrap();
    let tickers = unique_tickers(&snapshot).unwrap();
    assert_eq!(tickers, vec!["AAPL US", "AZN LN", "HSBA LN", "MSFT US", "SHEL LN"]);

    let list = ws.config.source_path(&ws.config.sources.ticker_list);
    write_ticker_list(&tickers, &list).unwrap();
    let written = std::fs::read_to_string(&list).unwrap();
    assert_eq!(written.lines().next(), Some("ticker"));
    assert_eq!(written.lines().count(), 6);
}

#[test]
fn test_export_without_ticker_column_is_rejected() {
    let ws = Workspace::new();
    let bad = ws.config.data_dir.join("SPX as of Dec 31 2021.csv");
    write_grid(&bad, &[vec!["Symbol", "Weight"], vec!["AAPL US", "6.1"]]);

    let err = consolidate_membership(&[bad]);
    assert_matches!(err, Err(EtlError::MissingColumn { column, .. }) if column == "Ticker");
}

#[test]
fn test_export_without_year_is_rejected() {
    let ws = Workspace::new();
    let bad = ws.config.data_dir.join("UKX as of latest.csv");
    write_grid(&bad, &[vec!["Ticker"], vec!["AZN LN"]]);

    let err = consolidate_membership(&[bad]);
    assert_matches!(err, Err(EtlError::FilenameYear(_)));
}
