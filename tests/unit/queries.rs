//! Catalog queries against the seeded dataset

use assert_matches::assert_matches;
use macroalpha::queries::catalog;
use macroalpha::queries::{run_query, QueryParams};
use pretty_assertions::assert_eq;
use test_log::test;

use macroalpha::models::{MacroCategory, MacroIndicator};

use crate::common::database::{ymd, TestDatabase};
use crate::common::logging::{log_test_data, log_test_step};

fn single(values: Vec<Option<f64>>) -> f64 {
    assert_eq!(values.len(), 1, "expected one row, got {:?}", values);
    values[0].expect("non-null value")
}

#[test]
fn test_concentration_for_index_year() {
    log_test_step("Top-10 weight and HHI for UKX 2023");
    let test_db = TestDatabase::seeded();
    let conn = test_db.db.connection();
    let params = QueryParams::default();

    let top10 = run_query(conn, &catalog::TOP10_CONCENTRATION, &params).unwrap();
    assert_eq!(top10.text_column("year"), vec!["2023"]);
    assert_eq!(single(top10.f64_column("top10_weight_pct")), 60.0);
    assert_eq!(single(top10.f64_column("top10_count")), 3.0);

    let hhi = run_query(conn, &catalog::HHI_CONCENTRATION, &params).unwrap();
    log_test_data("hhi", &hhi.rows);
    assert_eq!(single(hhi.f64_column("hhi_index")), 1400.0);
    assert_eq!(single(hhi.f64_column("effective_positions")), 7.1);
    assert_eq!(hhi.text_column("concentration_level"), vec!["Unconcentrated"]);
}

#[test]
fn test_concentration_for_other_index_is_empty() {
    let test_db = TestDatabase::seeded();
    let params = QueryParams {
        index_id: "SPX".to_string(),
        ..QueryParams::default()
    };

    let top10 = run_query(test_db.db.connection(), &catalog::TOP10_CONCENTRATION, &params).unwrap();
    assert!(top10.is_empty());
    assert_eq!(top10.columns, vec!["year", "top10_weight_pct", "top10_count"]);
}

#[test]
fn test_debt_to_revenue_excludes_financials() {
    let test_db = TestDatabase::seeded();
    let result = run_query(
        test_db.db.connection(),
        &catalog::DEBT_TO_REVENUE,
        &QueryParams::default(),
    )
    .unwrap();

    assert_eq!(result.text_column("year"), vec!["2024"]);
    assert_eq!(single(result.f64_column("company_count")), 3.0);
    assert_eq!(single(result.f64_column("mean_debt_to_revenue")), 1.5);
    assert_eq!(single(result.f64_column("min_ratio")), 1.0);
    assert_eq!(single(result.f64_column("max_ratio")), 2.0);
}

#[test]
fn test_zombie_companies_by_sector() {
    let test_db = TestDatabase::seeded();
    let result = run_query(
        test_db.db.connection(),
        &catalog::ZOMBIE_COMPANIES,
        &QueryParams::default(),
    )
    .unwrap();

    assert_eq!(result.text_column("gics_sector_name"), vec!["Energy"]);
    assert_eq!(single(result.f64_column("zombie_count")), 1.0);
}

#[test]
fn test_stress_test_respects_minimum_companies() {
    log_test_step("Rate shock with the default country threshold");
    let test_db = TestDatabase::seeded();
    let result = run_query(
        test_db.db.connection(),
        &catalog::RATE_SHOCK_STRESS_TEST,
        &QueryParams::default(),
    )
    .unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_stress_test_shocked_coverage() {
    log_test_step("Rate shock with a one-company threshold");
    let test_db = TestDatabase::seeded();
    let params = QueryParams {
        min_companies: 1,
        ..QueryParams::default()
    };
    let result = run_query(test_db.db.connection(), &catalog::RATE_SHOCK_STRESS_TEST, &params).unwrap();
    log_test_data("stress test", &result.rows);

    assert_eq!(result.text_column("country_id"), vec!["GB", "US"]);
    assert_eq!(result.f64_column("companies"), vec![Some(2.0), Some(1.0)]);
    assert_eq!(result.f64_column("current_icr")[0], Some(6.0));
    assert_eq!(result.f64_column("shocked_icr")[0], Some(3.1));
    assert_eq!(result.f64_column("newly_distressed"), vec![Some(1.0), Some(0.0)]);
}

#[test]
fn test_stress_year_without_financials() {
    let test_db = TestDatabase::seeded();
    let params = QueryParams {
        stress_year: 2019,
        min_companies: 1,
        ..QueryParams::default()
    };
    let result = run_query(test_db.db.connection(), &catalog::RATE_SHOCK_STRESS_TEST, &params).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_inflation_regimes() {
    let test_db = TestDatabase::seeded();
    let result = run_query(
        test_db.db.connection(),
        &catalog::INFLATION_REGIMES,
        &QueryParams::default(),
    )
    .unwrap();

    assert_eq!(result.text_column("regime"), vec!["High Inflation"]);
    assert_eq!(single(result.f64_column("months")), 1.0);
    assert_eq!(single(result.f64_column("avg_cpi_yoy")), 5.0);

    let strict = QueryParams {
        inflation_threshold: 6.0,
        ..QueryParams::default()
    };
    let result = run_query(test_db.db.connection(), &catalog::INFLATION_REGIMES, &strict).unwrap();
    assert_eq!(result.text_column("regime"), vec!["Low Inflation"]);
}

#[test]
fn test_inflation_lag_stays_within_each_series() {
    let test_db = TestDatabase::seeded();
    for month in 1..=13 {
        let (year, month) = if month <= 12 { (2023, month) } else { (2024, 1) };
        test_db
            .db
            .insert_macro_indicator(&MacroIndicator {
                country_id: "US".to_string(),
                indicator_date: ymd(year, month, 1),
                indicator_name: "US CPI Core Index".to_string(),
                bloomberg_ticker: None,
                indicator_value: 200.0,
                indicator_category: MacroCategory::Cpi,
            })
            .unwrap();
    }

    let result = run_query(
        test_db.db.connection(),
        &catalog::INFLATION_REGIMES,
        &QueryParams::default(),
    )
    .unwrap();
    assert_eq!(result.text_column("regime"), vec!["High Inflation", "Low Inflation"]);
    assert_eq!(result.f64_column("months"), vec![Some(1.0), Some(1.0)]);
    assert_eq!(result.f64_column("avg_cpi_yoy"), vec![Some(5.0), Some(0.0)]);
}

#[test]
fn test_short_histories_produce_no_rolling_statistics() {
    let test_db = TestDatabase::seeded();
    let conn = test_db.db.connection();
    let params = QueryParams::default();

    for query in [
        catalog::ICR_RATE_SENSITIVITY,
        catalog::REVENUE_VOLATILITY,
        catalog::DELEVERAGING_CYCLES,
    ] {
        let result = run_query(conn, &query, &params).unwrap();
        assert!(result.is_empty(), "{} returned {:?}", query.name, result.rows);
    }
}

#[test]
fn test_query_on_missing_table_fails() {
    let db = macroalpha::database::DatabaseManager::open_in_memory().unwrap();
    let err = run_query(db.connection(), &catalog::TOP10_CONCENTRATION, &QueryParams::default());
    assert_matches!(err, Err(macroalpha::EtlError::Database(_)));
}

#[test]
fn test_every_catalog_query_runs_on_populated_data() {
    log_test_step("Executing the full catalog against both datasets");
    let params = QueryParams::default();

    for test_db in [TestDatabase::seeded(), TestDatabase::with_history()] {
        let conn = test_db.db.connection();
        for query in catalog::EXPORT_QUERIES.iter().chain(catalog::CHART_QUERIES.iter()) {
            let result = run_query(conn, query, &params);
            assert!(result.is_ok(), "{} failed: {:?}", query.name, result.err());
        }
    }
}

#[test]
fn test_revenue_volatility_over_ten_years() {
    let test_db = TestDatabase::with_history();
    let result = run_query(
        test_db.db.connection(),
        &catalog::REVENUE_VOLATILITY,
        &QueryParams::default(),
    )
    .unwrap();
    log_test_data("volatility", &result.rows);

    assert_eq!(result.f64_column("volatility_quartile"), vec![Some(1.0)]);
    assert_eq!(result.text_column("classification"), vec!["Low Volatility (Defensive)"]);
    assert_eq!(single(result.f64_column("company_count")), 1.0);
    assert_eq!(single(result.f64_column("avg_volatility")), 9.55);
    assert_eq!(single(result.f64_column("avg_growth_rate")), 0.45);
}

#[test]
fn test_icr_moves_against_policy_rate() {
    let test_db = TestDatabase::with_history();
    let result = run_query(
        test_db.db.connection(),
        &catalog::ICR_RATE_SENSITIVITY,
        &QueryParams::default(),
    )
    .unwrap();
    log_test_data("icr sensitivity", &result.rows);

    assert_eq!(result.text_column("company_name"), vec!["HIST LN HOLDINGS"]);
    assert_eq!(single(result.f64_column("total_years_data")), 10.0);
    assert_eq!(single(result.f64_column("avg_icr_recent_5y")), 6.5);
    assert_eq!(single(result.f64_column("correlation_with_policy_rate")), -1.0);
    assert_eq!(
        result.text_column("rate_sensitivity_classification"),
        vec!["Highly Rate-Sensitive"]
    );
}

#[test]
fn test_sector_volatility_chart_data() {
    let test_db = TestDatabase::with_history();
    let result = run_query(
        test_db.db.connection(),
        &catalog::SECTOR_VOLATILITY,
        &QueryParams::default(),
    )
    .unwrap();

    assert_eq!(result.text_column("gics_sector_name"), vec!["Industrials"]);
    let avg_vol = single(result.f64_column("avg_vol"));
    assert!((avg_vol - 9.5455).abs() < 1e-3, "avg_vol {}", avg_vol);
}
