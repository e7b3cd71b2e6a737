use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{Company, Financials, IndexMembership, InterestRate, MacroIndicator, WeeklyPrice};

/// Static DDL for the six MacroAlpha tables.
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Tables in load order.
pub const TABLES: [&str; 6] = [
    "companies",
    "index_membership",
    "prices_weekly",
    "financials",
    "macro_indicators",
    "interest_rates",
];

/// Scalar functions the analytics rely on that the bundled SQLite is built
/// without. `sqrt` of a negative or null argument is null, as in SQLite's
/// own math extension.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "sqrt",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<f64> = ctx.get(0)?;
            Ok(value.filter(|v| *v >= 0.0).map(f64::sqrt))
        },
    )?;
    Ok(())
}

pub struct DatabaseManager {
    connection: Connection,
}

impl DatabaseManager {
    /// Open (or create) the database file at `database_path`.
    pub fn open(database_path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(database_path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        register_functions(&conn)?;
        debug!("Opened database at {}", database_path.display());
        Ok(Self { connection: conn })
    }

    /// Remove any existing file at `database_path`, then open a new one.
    pub fn create_fresh(database_path: &Path, busy_timeout: Duration) -> Result<Self> {
        if database_path.exists() {
            std::fs::remove_file(database_path)?;
            info!("🗑️  Removed existing database {}", database_path.display());
        }
        Self::open(database_path, busy_timeout)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        register_functions(&conn)?;
        Ok(Self { connection: conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Execute the static DDL script.
    pub fn initialize_schema(&self) -> Result<()> {
        info!("📦 Creating database schema...");
        self.connection.execute_batch(SCHEMA_SQL)?;
        info!("   ✓ Schema created");
        Ok(())
    }

    /// Start a write batch unless one is already open.
    pub fn begin(&self) -> Result<()> {
        if self.connection.is_autocommit() {
            self.connection.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    /// Commit the open write batch, if any.
    pub fn commit(&self) -> Result<()> {
        if !self.connection.is_autocommit() {
            self.connection.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Commit and immediately open the next batch.
    pub fn checkpoint(&self) -> Result<()> {
        self.commit()?;
        self.begin()
    }

    /// Insert a company; an existing ticker is left untouched.
    pub fn insert_company(&self, company: &Company) -> Result<bool> {
        let mut stmt = self.connection.prepare_cached(
            "INSERT OR IGNORE INTO companies (
                ticker, company_name, country_id, currency,
                gics_sector_name, gics_industry_group_name,
                gics_industry_name, gics_sub_industry_name,
                current_market_cap, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        let changed = stmt.execute(params![
            company.ticker,
            company.company_name,
            company.country_id,
            company.currency,
            company.gics_sector_name,
            company.gics_industry_group_name,
            company.gics_industry_name,
            company.gics_sub_industry_name,
            company.current_market_cap,
            company.is_active,
        ])?;
        Ok(changed > 0)
    }

    pub fn insert_membership(&self, row: &IndexMembership) -> Result<bool> {
        let mut stmt = self.connection.prepare_cached(
            "INSERT OR IGNORE INTO index_membership
                (index_id, company_id, as_of_date, weight, shares_outstanding, price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        let changed = stmt.execute(params![
            row.index_id,
            row.company_id,
            row.as_of_date,
            row.weight,
            row.shares_outstanding,
            row.price,
        ])?;
        Ok(changed > 0)
    }

    pub fn insert_weekly_price(&self, price: &WeeklyPrice) -> Result<bool> {
        let mut stmt = self.connection.prepare_cached(
            "INSERT OR IGNORE INTO prices_weekly
                (company_id, price_date, close_price, total_return)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let changed = stmt.execute(params![
            price.company_id,
            price.price_date,
            price.close_price,
            price.total_return,
        ])?;
        Ok(changed > 0)
    }

    /// Insert or replace the row for (company, period end, period type).
    pub fn upsert_financials(&self, row: &Financials) -> Result<bool> {
        let mut stmt = self.connection.prepare_cached(
            "INSERT OR REPLACE INTO financials
                (company_id, period_end_date, period_type,
                 revenue, ebitda, interest_expense, free_cash_flow,
                 gross_profit, total_debt, cost_of_goods_sold, currency)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        let v = &row.values;
        let changed = stmt.execute(params![
            row.company_id,
            row.period_end_date,
            row.period_type.as_str(),
            v.revenue,
            v.ebitda,
            v.interest_expense,
            v.free_cash_flow,
            v.gross_profit,
            v.total_debt,
            v.cost_of_goods_sold,
            row.currency,
        ])?;
        Ok(changed > 0)
    }

    pub fn insert_macro_indicator(&self, row: &MacroIndicator) -> Result<bool> {
        let mut stmt = self.connection.prepare_cached(
            "INSERT OR IGNORE INTO macro_indicators
                (country_id, indicator_date, indicator_name, bloomberg_ticker,
                 indicator_value, indicator_category)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        let changed = stmt.execute(params![
            row.country_id,
            row.indicator_date,
            row.indicator_name,
            row.bloomberg_ticker,
            row.indicator_value,
            row.indicator_category.as_str(),
        ])?;
        Ok(changed > 0)
    }

    pub fn insert_interest_rate(&self, row: &InterestRate) -> Result<bool> {
        let mut stmt = self.connection.prepare_cached(
            "INSERT OR IGNORE INTO interest_rates
                (country_id, rate_date, rate_type, bloomberg_ticker, rate_value)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let changed = stmt.execute(params![
            row.country_id,
            row.rate_date,
            row.rate_type.as_str(),
            row.bloomberg_ticker,
            row.rate_value,
        ])?;
        Ok(changed > 0)
    }

    pub fn company_id(&self, ticker: &str) -> Result<Option<i64>> {
        let id = self
            .connection
            .query_row(
                "SELECT company_id FROM companies WHERE ticker = ?1",
                params![ticker],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Ticker → company id for every known company.
    pub fn ticker_map(&self) -> Result<HashMap<String, i64>> {
        let mut stmt = self
            .connection
            .prepare("SELECT ticker, company_id FROM companies")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut map = HashMap::new();
        for row in rows {
            let (ticker, id) = row?;
            map.insert(ticker, id);
        }
        Ok(map)
    }

    pub fn get_company(&self, ticker: &str) -> Result<Option<Company>> {
        let company = self
            .connection
            .query_row(
                "SELECT company_id, ticker, company_name, country_id, currency,
                        gics_sector_name, gics_industry_group_name, gics_industry_name,
                        gics_sub_industry_name, current_market_cap, is_active
                 FROM companies WHERE ticker = ?1",
                params![ticker],
                |row| {
                    Ok(Company {
                        company_id: Some(row.get(0)?),
                        ticker: row.get(1)?,
                        company_name: row.get(2)?,
                        country_id: row.get(3)?,
                        currency: row.get(4)?,
                        gics_sector_name: row.get(5)?,
                        gics_industry_group_name: row.get(6)?,
                        gics_industry_name: row.get(7)?,
                        gics_sub_industry_name: row.get(8)?,
                        current_market_cap: row.get(9)?,
                        is_active: row.get(10)?,
                    })
                },
            )
            .optional()?;
        Ok(company)
    }

    /// Row count per table, in load order.
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        let mut counts = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let count: i64 = self.connection.query_row(
                &format!("SELECT COUNT(*) FROM {}", table),
                [],
                |row| row.get(0),
            )?;
            counts.push((table, count));
        }
        Ok(counts)
    }
}
