//! Financial statement loads through the source dispatcher

use macroalpha::database::DatabaseManager;
use macroalpha::importers::{self, ImportOptions, Source};
use macroalpha::pipeline;
use pretty_assertions::assert_eq;
use test_log::test;

use crate::common::fixtures::{write_grid, Workspace};
use crate::common::logging::{log_test_data, log_test_step};

const FIELDS: [&str; 7] = [
    "SALES_REV_TURN",
    "EBITDA",
    "IS_INT_EXPENSE",
    "CF_FREE_CASH_FLOW",
    "GROSS_PROFIT",
    "SHORT_AND_LONG_TERM_DEBT",
    "ARD_COST_OF_GOODS_SOLD",
];

fn loaded_workspace() -> (Workspace, DatabaseManager) {
    let ws = Workspace::new();
    let db = pipeline::open_database(&ws.config, true).unwrap();
    importers::import_source(&db, &ws.config, &ImportOptions::default(), Source::Companies).unwrap();
    (ws, db)
}

fn statement_dates(db: &DatabaseManager, period_type: &str) -> Vec<String> {
    let mut stmt = db
        .connection()
        .prepare("SELECT period_end_date FROM financials WHERE period_type = ?1 ORDER BY period_end_date")
        .unwrap();
    stmt.query_map([period_type], |r| r.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

fn companies_with_statements(db: &DatabaseManager) -> Vec<String> {
    let mut stmt = db
        .connection()
        .prepare(
            "SELECT DISTINCT c.ticker FROM financials f
             JOIN companies c ON f.company_id = c.company_id
             ORDER BY c.ticker",
        )
        .unwrap();
    stmt.query_map([], |r| r.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

/// Quarterly export for AAPL with the period end column left blank.
fn write_undated_quarterly(ws: &Workspace) {
    let mut labels = vec!["Dates"];
    labels.extend(FIELDS);
    write_grid(
        &ws.config.source_path(&ws.config.sources.financials_quarterly),
        &[
            vec![""],
            vec![""],
            vec![""],
            vec!["", "AAPL US"],
            vec![""],
            labels,
            vec!["", "90753", "28833", "714", "20000", "39000", "110000", "51000"],
            vec!["", "81797", "26000", "720", "19000", "36000", "109000", "46000"],
            vec!["", "89498", "30000", "740", "21000", "41000", "108000", "48000"],
        ],
    );
}

#[test]
fn test_fill_dates_rebuilds_quarterly_period_ends() {
    log_test_step("Loading undated quarterly statements with --fill-dates");
    let (ws, db) = loaded_workspace();
    write_undated_quarterly(&ws);

    let options = ImportOptions { fill_dates: true };
    let stats = importers::import_source(&db, &ws.config, &options, Source::Financials).unwrap();
    log_test_data("financials", &stats);

    let sources: Vec<&str> = stats.iter().map(|s| s.source.as_str()).collect();
    assert_eq!(sources, vec!["financials_annual", "financials_quarterly"]);
    assert_eq!(stats[1].rows_written, 3);
    assert_eq!(
        statement_dates(&db, "QUARTERLY"),
        vec!["2005-03-31", "2005-06-30", "2005-09-30"]
    );
}

#[test]
fn test_undated_quarterly_rows_are_skipped_without_fill() {
    let (ws, db) = loaded_workspace();
    write_undated_quarterly(&ws);

    let stats = importers::import_source(&db, &ws.config, &ImportOptions::default(), Source::Financials).unwrap();
    assert_eq!(stats[1].rows_written, 0);
    assert_eq!(stats[1].rows_skipped, 3);
    assert!(statement_dates(&db, "QUARTERLY").is_empty());
}

#[test]
fn test_block_without_field_labels_imports_nothing() {
    log_test_step("Annual export whose AZN block has a blank field row");
    let (ws, db) = loaded_workspace();

    let mut labels = vec!["Dates"];
    labels.extend(FIELDS);
    write_grid(
        &ws.config.source_path(&ws.config.sources.financials_annual),
        &[
            vec![""],
            vec![""],
            vec![""],
            vec!["", "AAPL US", "", "", "", "", "", "", "AZN LN"],
            vec![""],
            labels,
            vec!["2023-12-31", "383285", "125820", "3933", "99584", "169148", "111088", "214137",
                 "45811", "12341", "1282", "9766", "37751", "29274", "8060"],
        ],
    );

    let stats = importers::import_source(&db, &ws.config, &ImportOptions::default(), Source::Financials).unwrap();
    assert_eq!(stats[0].rows_written, 1);
    assert_eq!(companies_with_statements(&db), vec!["AAPL US"]);
}

#[test]
fn test_checkpoint_cadence_follows_commit_every() {
    let (mut ws, db) = loaded_workspace();

    // Three annual statements at two rows per batch
    let stats = importers::import_source(&db, &ws.config, &ImportOptions::default(), Source::Financials).unwrap();
    assert_eq!(stats[0].rows_written, 3);
    assert_eq!(stats[0].checkpoints, 1);
    assert!(db.connection().is_autocommit());

    let prices = importers::import_source(&db, &ws.config, &ImportOptions::default(), Source::Prices).unwrap();
    assert_eq!(prices[0].rows_written, 5);
    assert_eq!(prices[0].checkpoints, 2);

    ws.config.commit_every = 1;
    let stats = importers::import_source(&db, &ws.config, &ImportOptions::default(), Source::Financials).unwrap();
    assert_eq!(stats[0].rows_read - stats[0].rows_skipped, 3);
    assert_eq!(stats[0].checkpoints, 3);
    assert!(db.connection().is_autocommit());
}
