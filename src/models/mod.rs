use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EtlError;

/// Company master record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub company_id: Option<i64>,
    pub ticker: String,
    pub company_name: Option<String>,
    pub country_id: Option<String>,
    pub currency: Option<String>,
    pub gics_sector_name: Option<String>,
    pub gics_industry_group_name: Option<String>,
    pub gics_industry_name: Option<String>,
    pub gics_sub_industry_name: Option<String>,
    pub current_market_cap: Option<f64>,
    pub is_active: bool,
}

/// One row of the consolidated membership snapshot, before ticker resolution.
///
/// Numeric columns stay as exported text; the membership importer cleans them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub index_id: String,
    pub as_of_date: String,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Weight", default)]
    pub weight: Option<String>,
    #[serde(rename = "Shares", default)]
    pub shares: Option<String>,
    #[serde(rename = "Price", default)]
    pub price: Option<String>,
}

/// Index constituent weight at an as-of date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMembership {
    pub index_id: String,
    pub company_id: i64,
    pub as_of_date: NaiveDate,
    pub weight: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub price: Option<f64>,
}

/// Weekly close and total return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPrice {
    pub company_id: i64,
    pub price_date: NaiveDate,
    pub close_price: f64,
    pub total_return: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodType {
    Annual,
    Quarterly,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Annual => "ANNUAL",
            PeriodType::Quarterly => "QUARTERLY",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ANNUAL" => Ok(PeriodType::Annual),
            "QUARTERLY" => Ok(PeriodType::Quarterly),
            other => Err(EtlError::Config(format!("unknown period type '{}'", other))),
        }
    }
}

/// Financial statement values for one company and period.
///
/// Values are keyed by the field they were mapped to; any subset may be null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialValues {
    pub revenue: Option<f64>,
    pub ebitda: Option<f64>,
    pub interest_expense: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub gross_profit: Option<f64>,
    pub total_debt: Option<f64>,
    pub cost_of_goods_sold: Option<f64>,
}

impl FinancialValues {
    pub fn is_empty(&self) -> bool {
        self.revenue.is_none()
            && self.ebitda.is_none()
            && self.interest_expense.is_none()
            && self.free_cash_flow.is_none()
            && self.gross_profit.is_none()
            && self.total_debt.is_none()
            && self.cost_of_goods_sold.is_none()
    }

    pub fn set(&mut self, field: FinancialField, value: Option<f64>) {
        let slot = match field {
            FinancialField::Revenue => &mut self.revenue,
            FinancialField::Ebitda => &mut self.ebitda,
            FinancialField::InterestExpense => &mut self.interest_expense,
            FinancialField::FreeCashFlow => &mut self.free_cash_flow,
            FinancialField::GrossProfit => &mut self.gross_profit,
            FinancialField::TotalDebt => &mut self.total_debt,
            FinancialField::CostOfGoodsSold => &mut self.cost_of_goods_sold,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinancialField {
    Revenue,
    Ebitda,
    InterestExpense,
    FreeCashFlow,
    GrossProfit,
    TotalDebt,
    CostOfGoodsSold,
}

impl FinancialField {
    /// Terminal field mnemonic → normalized column.
    pub fn from_mnemonic(label: &str) -> Option<Self> {
        match label {
            "SALES_REV_TURN" => Some(FinancialField::Revenue),
            "EBITDA" => Some(FinancialField::Ebitda),
            "IS_INT_EXPENSE" => Some(FinancialField::InterestExpense),
            "CF_FREE_CASH_FLOW" => Some(FinancialField::FreeCashFlow),
            "GROSS_PROFIT" => Some(FinancialField::GrossProfit),
            "SHORT_AND_LONG_TERM_DEBT" => Some(FinancialField::TotalDebt),
            "ARD_COST_OF_GOODS_SOLD" => Some(FinancialField::CostOfGoodsSold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    pub company_id: i64,
    pub period_end_date: NaiveDate,
    pub period_type: PeriodType,
    pub values: FinancialValues,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MacroCategory {
    Gdp,
    Cpi,
    Employment,
    Housing,
    Rates,
    Trade,
    Other,
}

impl MacroCategory {
    /// Keyword classification of an indicator name; first match wins.
    pub fn classify(indicator_name: &str) -> Self {
        let name = indicator_name.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| name.contains(w));

        if has(&["gdp"]) {
            MacroCategory::Gdp
        } else if has(&["cpi", "price", "inflation"]) {
            MacroCategory::Cpi
        } else if has(&["unemploy", "employ"]) {
            MacroCategory::Employment
        } else if has(&["housing", "construction"]) {
            MacroCategory::Housing
        } else if has(&["rate", "yield"]) {
            MacroCategory::Rates
        } else if has(&["trade", "export", "import"]) {
            MacroCategory::Trade
        } else {
            MacroCategory::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MacroCategory::Gdp => "GDP",
            MacroCategory::Cpi => "CPI",
            MacroCategory::Employment => "Employment",
            MacroCategory::Housing => "Housing",
            MacroCategory::Rates => "Rates",
            MacroCategory::Trade => "Trade",
            MacroCategory::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroIndicator {
    pub country_id: String,
    pub indicator_date: NaiveDate,
    pub indicator_name: String,
    pub bloomberg_ticker: Option<String>,
    pub indicator_value: f64,
    pub indicator_category: MacroCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateType {
    TenYearYield,
    PolicyRate,
}

impl RateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateType::TenYearYield => "10Y_YIELD",
            RateType::PolicyRate => "POLICY_RATE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestRate {
    pub country_id: String,
    pub rate_date: NaiveDate,
    pub rate_type: RateType,
    pub bloomberg_ticker: String,
    pub rate_value: f64,
}

/// Names of the exported source files inside the data directory.
#[derive(Debug, Clone)]
pub struct SourceFiles {
    pub company_master: String,
    pub membership_snapshot: String,
    pub ticker_list: String,
    pub prices_weekly: String,
    pub financials_annual: String,
    pub financials_quarterly: String,
    /// (file name, country code)
    pub macro_files: Vec<(String, String)>,
    pub interest_rates: String,
    /// Index prefixes of the per-year membership exports.
    pub membership_indices: Vec<String>,
}

impl Default for SourceFiles {
    fn default() -> Self {
        let macro_files = [
            ("usa_macros_2024~2005.xlsx", "US"),
            ("uk_macros_2024~2005.xlsx", "GB"),
            ("de_macros_2024~2005.xlsx", "DE"),
            ("jp_macros_2024~2005.xlsx", "JP"),
            ("cn_macros_2024~2005.xlsx", "CN"),
        ]
        .iter()
        .map(|(file, country)| (file.to_string(), country.to_string()))
        .collect();

        Self {
            company_master: "company_master.csv".to_string(),
            membership_snapshot: "index_membership_snapshot.csv".to_string(),
            ticker_list: "tickers_unique.csv".to_string(),
            prices_weekly: "price_weekly.xlsx.xlsx".to_string(),
            financials_annual: "financials_annual.xlsx".to_string(),
            financials_quarterly: "financials_quarterly.xlsx".to_string(),
            macro_files,
            interest_rates: "5 countries 10y yield and policy rate.xlsx".to_string(),
            membership_indices: vec!["SPX".to_string(), "UKX".to_string()],
        }
    }
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub results_dir: PathBuf,
    pub charts_dir: PathBuf,
    pub busy_timeout_ms: u64,
    pub commit_every: usize,
    /// Newest month in the macro exports; columns count backward from here.
    pub macro_end_month: NaiveDate,
    pub sources: SourceFiles,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            database_path: PathBuf::from("macroalpha.db"),
            results_dir: PathBuf::from("results"),
            charts_dir: PathBuf::from("."),
            busy_timeout_ms: 30_000,
            commit_every: 200,
            macro_end_month: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap_or_default(),
            sources: SourceFiles::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, EtlError> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let defaults = Config::default();

        let macro_end_month = match std::env::var("MACROALPHA_MACRO_END_MONTH") {
            Ok(raw) => NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
                .map_err(|_| {
                    EtlError::Config(format!(
                        "MACROALPHA_MACRO_END_MONTH must look like 2024-12, got '{}'",
                        raw
                    ))
                })?,
            Err(_) => defaults.macro_end_month,
        };

        Ok(Config {
            data_dir: env_path("MACROALPHA_DATA_DIR").unwrap_or(defaults.data_dir),
            database_path: env_path("MACROALPHA_DB_PATH").unwrap_or(defaults.database_path),
            results_dir: env_path("MACROALPHA_RESULTS_DIR").unwrap_or(defaults.results_dir),
            charts_dir: env_path("MACROALPHA_CHARTS_DIR").unwrap_or(defaults.charts_dir),
            busy_timeout_ms: std::env::var("MACROALPHA_BUSY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.busy_timeout_ms),
            commit_every: std::env::var("MACROALPHA_COMMIT_EVERY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.commit_every),
            macro_end_month,
            sources: defaults.sources,
        })
    }

    pub fn source_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.source_path(&self.sources.membership_snapshot)
    }

    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Rows written and skipped for one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportStats {
    pub source: String,
    pub rows_read: usize,
    pub rows_written: usize,
    pub rows_skipped: usize,
    /// Intermediate commits made while loading.
    pub checkpoints: usize,
}

impl ImportStats {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn merge(&mut self, other: &ImportStats) {
        self.rows_read += other.rows_read;
        self.rows_written += other.rows_written;
        self.rows_skipped += other.rows_skipped;
        self.checkpoints += other.checkpoints;
    }
}
