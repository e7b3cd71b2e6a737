//! CSV renditions of every vendor export layout, written into a scratch
//! data directory.

use std::fs;
use std::path::Path;

use macroalpha::models::Config;
use tempfile::TempDir;

pub struct Workspace {
    pub dir: TempDir,
    pub config: Config,
}

impl Workspace {
    /// Scratch data directory with every export except the membership
    /// snapshot, which the consolidator produces.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path();

        let mut config = Config::default().with_data_dir(root);
        config.database_path = root.join("macroalpha.db");
        config.results_dir = root.join("results");
        config.charts_dir = root.join("charts");
        config.commit_every = 2;
        config.sources.prices_weekly = "price_weekly.csv".to_string();
        config.sources.financials_annual = "financials_annual.csv".to_string();
        config.sources.financials_quarterly = "financials_quarterly.csv".to_string();
        config.sources.interest_rates = "rates.csv".to_string();
        config.sources.macro_files = vec![
            ("usa_macros.csv".to_string(), "US".to_string()),
            ("uk_macros.csv".to_string(), "GB".to_string()),
        ];

        write_constituents(root);
        write_grid(&root.join("company_master.csv"), &company_master());
        write_grid(&root.join("price_weekly.csv"), &prices());
        write_grid(&root.join("financials_annual.csv"), &financials());
        write_grid(&root.join("usa_macros.csv"), &macros());
        write_grid(&root.join("rates.csv"), &rates());

        Self { dir, config }
    }
}

/// Write rows as CSV, padding every row to the widest one so blank rows keep
/// their position.
pub fn write_grid(path: &Path, rows: &[Vec<&str>]) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(1).max(2);
    let mut out = String::new();
    for row in rows {
        let mut cells: Vec<String> = row.iter().map(|c| quote(c)).collect();
        cells.resize(width, String::new());
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    fs::write(path, out).expect("write fixture");
}

fn quote(cell: &str) -> String {
    if cell.contains(',') {
        format!("\"{}\"", cell)
    } else {
        cell.to_string()
    }
}

fn write_constituents(root: &Path) {
    let header = vec!["Ticker", "Name", "Weight", "Shares", "Price"];
    write_grid(
        &root.join("SPX as of Dec 29 2023.csv"),
        &[
            header.clone(),
            vec!["AAPL US", "APPLE INC", "7.0", "15,550,061,000", "192.53"],
            vec!["MSFT US", "MICROSOFT CORP", "6.9", "7,432,306,000", "376.04"],
            vec!["AAPL US", "APPLE INC", "7.0", "15,550,061,000", "192.53"],
        ],
    );
    write_grid(
        &root.join("UKX as of Dec 30 2022.csv"),
        &[
            header.clone(),
            vec!["AZN LN", "ASTRAZENECA PLC", "8.1", "1,549,000,000", "11218"],
            vec!["SHEL LN", "SHELL PLC", "8.9", "6,900,000,000", "2340"],
            vec!["HSBA LN", "HSBC HOLDINGS PLC", "5.5", "20,000,000,000", "515.6"],
        ],
    );
    write_grid(
        &root.join("UKX as of Dec 29 2023.csv"),
        &[
            header,
            vec!["AZN LN", "ASTRAZENECA PLC", "8.3", "1,549,000,000", "10600"],
            vec!["SHEL LN", "SHELL PLC", "8.0", "6,500,000,000", "2573"],
            vec!["", "", "", "", ""],
        ],
    );
    // Office lock file; must be ignored
    fs::write(root.join("~$UKX as of Dec 29 2023.csv"), "garbage").expect("write lock file");
}

fn company_master() -> Vec<Vec<&'static str>> {
    vec![
        vec!["Bloomberg company master"],
        vec![
            "Ticker",
            "NAME",
            "COUNTRY",
            "CRNCY",
            "GICS_SECTOR_NAME",
            "GICS_INDUSTRY_GROUP_NAME",
            "GICS_INDUSTRY_NAME",
            "GICS_SUB_INDUSTRY_NAME",
            "CUR_MKT_CAP",
        ],
        vec!["AAPL US", "APPLE INC", "US", "USD", "Information Technology", "Technology Hardware & Equipment", "Technology Hardware, Storage & Peripherals", "Technology Hardware, Storage & Peripherals", "2,994,371,000,000"],
        vec!["MSFT US", "MICROSOFT CORP", "US", "USD", "Information Technology", "Software & Services", "Software", "Systems Software", "2,794,828,000,000"],
        vec!["AZN LN", "ASTRAZENECA PLC", "GB", "GBp", "Health Care", "Pharmaceuticals", "Pharmaceuticals", "Pharmaceuticals", "164,000,000,000"],
        vec!["SHEL LN", "SHELL PLC", "GB", "GBp", "Energy", "Energy", "Oil, Gas & Consumable Fuels", "Integrated Oil & Gas", "167,000,000,000"],
        vec!["HSBA LN", "HSBC HOLDINGS PLC", "GB", "GBp", "Financials", "Banks", "Banks", "Diversified Banks", "#N/A N/A"],
        vec!["#N/A", "", "", "", "", "", "", "", ""],
    ]
}

fn prices() -> Vec<Vec<&'static str>> {
    vec![
        vec![""],
        vec![""],
        vec![""],
        vec!["", "AAPL US", "", "AZN LN", "", "#N/A Requesting Data...", ""],
        vec!["Dates", "Last Price", "Total Return", "Last Price", "Total Return", "", ""],
        vec![""],
        vec!["2024-01-05", "181.18", "-1.2", "10500", "0.5"],
        vec!["2024-01-12", "185.92", "2.6", "#N/A N/A", ""],
        vec!["2024-01-19", "191.56", "3.0", "10720", "2.1"],
    ]
}

fn financials() -> Vec<Vec<&'static str>> {
    let fields = [
        "SALES_REV_TURN",
        "EBITDA",
        "IS_INT_EXPENSE",
        "CF_FREE_CASH_FLOW",
        "GROSS_PROFIT",
        "SHORT_AND_LONG_TERM_DEBT",
        "ARD_COST_OF_GOODS_SOLD",
    ];
    let mut labels = vec!["Dates"];
    labels.extend(fields);
    labels.extend(fields);

    vec![
        vec![""],
        vec![""],
        vec![""],
        vec!["", "AAPL US", "", "", "", "", "", "", "AZN LN"],
        vec![""],
        labels,
        vec!["2022-12-31", "394328", "130541", "2931", "111443", "170782", "120069", "223546",
             "#N/A", "#N/A", "#N/A", "#N/A", "#N/A", "#N/A", "#N/A"],
        vec!["2023-12-31", "383285", "125820", "3933", "99584", "169148", "111088", "214137",
             "45811", "12341", "1282", "9766", "37751", "29274", "8060"],
    ]
}

fn macros() -> Vec<Vec<&'static str>> {
    vec![
        vec![""],
        vec!["Text", "Ticker", "Dec", "Nov", "Oct"],
        vec!["US CPI Urban Consumers YoY NSA", "CPI YOY Index", "2.9", "2.7", "2.6"],
        vec!["U-3 US Unemployment Rate Total", "USURTOT Index", "4.1", "#N/A", "4.1"],
    ]
}

fn rates() -> Vec<Vec<&'static str>> {
    vec![
        vec![""],
        vec![""],
        vec![""],
        vec![
            "",
            "USGG10YR Index",
            "GTGBP10Y Govt",
            "GTDEM10Y Govt",
            "GTJPY10Y Govt",
            "GTCNY10Y Govt",
            "FDTR Index",
            "UKBRBASE Index",
            "EURR002W Index",
            "BOJDTR Index",
            "PBOC7P Index",
        ],
        vec!["Dates", "Last Price"],
        vec![""],
        vec!["2024-12-27", "4.62", "4.63", "2.40", "1.10", "1.68", "4.50", "4.75", "3.15", "0.25", "1.50"],
        vec!["2024-12-20", "4.52", "#N/A N/A", "2.29", "1.06", "1.70", "4.50", "4.75", "3.15", "0.25", "1.50"],
    ]
}
