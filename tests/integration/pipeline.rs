//! End-to-end runs over the fixture data directory

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use assert_matches::assert_matches;
use macroalpha::export::ExportFormat;
use macroalpha::importers::{self, ImportOptions, Source};
use macroalpha::pipeline::{self, run_pipeline, PipelineOptions};
use macroalpha::EtlError;
use pretty_assertions::assert_eq;
use test_log::test;

use crate::common::fixtures::Workspace;
use crate::common::logging::{log_test_data, log_test_step};

fn counts(config: &macroalpha::models::Config) -> HashMap<&'static str, i64> {
    let db = pipeline::open_database(config, false).unwrap();
    db.table_counts().unwrap().into_iter().collect()
}

fn files_with_extension(dir: &Path, extension: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(extension))
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_full_pipeline_run() {
    log_test_step("Running the full pipeline over fixtures");
    let ws = Workspace::new();
    let options = PipelineOptions {
        fresh: true,
        ..PipelineOptions::default()
    };

    let report = run_pipeline(&ws.config, &options).unwrap();
    log_test_data("imports", &report.imports);

    assert_eq!(report.snapshot_rows, Some(7));
    assert_eq!(report.unique_tickers, Some(5));

    let table_counts = counts(&ws.config);
    assert_eq!(table_counts["companies"], 5);
    assert_eq!(table_counts["index_membership"], 7);
    assert_eq!(table_counts["prices_weekly"], 5);
    assert_eq!(table_counts["financials"], 3);
    assert_eq!(table_counts["macro_indicators"], 5);
    assert_eq!(table_counts["interest_rates"], 19);

    // Quarterly financials and the UK macro file are absent
    let sources: Vec<&str> = report.imports.iter().map(|s| s.source.as_str()).collect();
    assert!(!sources.contains(&"financials_quarterly"));
    assert!(sources.contains(&"macro_indicators_US"));
    assert!(!sources.contains(&"macro_indicators_GB"));

    assert!(report.export.all_succeeded(), "failed: {:?}", report.export.failed);
    assert_eq!(files_with_extension(&ws.config.results_dir, "csv").len(), 9);

    assert_eq!(report.charts.len(), 7);
    assert_eq!(files_with_extension(&ws.config.charts_dir, "png").len(), 7);
    for chart in &report.charts {
        let bytes = fs::read(chart).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"), "{} is not a PNG", chart.display());
    }
}

#[test]
fn test_import_statistics() {
    let ws = Workspace::new();
    pipeline::consolidate(&ws.config).unwrap();
    let db = pipeline::open_database(&ws.config, true).unwrap();

    let stats = importers::run_all(&db, &ws.config, &ImportOptions::default()).unwrap();
    let by_source: HashMap<&str, _> = stats.iter().map(|s| (s.source.as_str(), s)).collect();

    let companies = by_source["companies"];
    assert_eq!(companies.rows_written, 5);
    assert_eq!(companies.rows_skipped, 1);

    let prices = by_source["prices_weekly"];
    assert_eq!(prices.rows_written, 5);
    assert_eq!(prices.rows_skipped, 1);

    let rates = by_source["interest_rates"];
    assert_eq!(rates.rows_written, 19);
    assert_eq!(rates.rows_read, 19);
}

#[test]
fn test_reimport_is_idempotent() {
    log_test_step("Loading every source twice");
    let ws = Workspace::new();
    let options = PipelineOptions {
        fresh: true,
        skip_charts: true,
        ..PipelineOptions::default()
    };
    run_pipeline(&ws.config, &options).unwrap();
    let first = counts(&ws.config);

    let db = pipeline::open_database(&ws.config, false).unwrap();
    let stats = importers::run_all(&db, &ws.config, &ImportOptions::default()).unwrap();
    drop(db);

    let written: usize = stats
        .iter()
        .filter(|s| s.source != "financials_annual")
        .map(|s| s.rows_written)
        .sum();
    assert_eq!(written, 0);
    assert_eq!(counts(&ws.config), first);
}

#[test]
fn test_single_source_import() {
    let ws = Workspace::new();
    let db = pipeline::open_database(&ws.config, true).unwrap();
    let options = ImportOptions::default();

    // Prices before companies resolve nothing
    let stats = importers::import_source(&db, &ws.config, &options, Source::Prices).unwrap();
    assert_eq!(stats[0].rows_written, 0);

    importers::import_source(&db, &ws.config, &options, Source::Companies).unwrap();
    let stats = importers::import_source(&db, &ws.config, &options, Source::Prices).unwrap();
    assert_eq!(stats[0].rows_written, 5);

    let azn = db.get_company("AZN LN").unwrap().unwrap();
    assert_eq!(azn.country_id.as_deref(), Some("GB"));
    assert_eq!(azn.gics_sector_name.as_deref(), Some("Health Care"));
}

#[test]
fn test_json_export() {
    let ws = Workspace::new();
    let options = PipelineOptions {
        fresh: true,
        format: ExportFormat::Json,
        skip_charts: true,
        ..PipelineOptions::default()
    };

    let report = run_pipeline(&ws.config, &options).unwrap();
    assert!(report.charts.is_empty());
    assert_eq!(files_with_extension(&ws.config.results_dir, "json").len(), 9);

    let hhi = fs::read_to_string(ws.config.results_dir.join("uc1_q2_hhi_concentration.json")).unwrap();
    let rows: serde_json::Value = serde_json::from_str(&hhi).unwrap();
    let years: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["year"].as_str().unwrap())
        .collect();
    assert_eq!(years, vec!["2022", "2023"]);
}

#[test]
fn test_missing_company_master_is_fatal() {
    let ws = Workspace::new();
    fs::remove_file(ws.config.source_path(&ws.config.sources.company_master)).unwrap();

    let err = run_pipeline(&ws.config, &PipelineOptions::default()).unwrap_err();
    assert_matches!(err.downcast_ref::<EtlError>(), Some(EtlError::MissingFile(_)));
}
