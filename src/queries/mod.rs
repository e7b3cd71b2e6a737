//! Fixed catalog of analytical queries and a small runner for them.

pub mod catalog;

use rusqlite::types::{ToSql, Value};
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedQuery {
    /// File stem of the exported result.
    pub name: &'static str,
    pub title: &'static str,
    pub sql: &'static str,
}

/// Parameters shared by the analytical queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParams {
    /// Index whose concentration is measured.
    pub index_id: String,
    /// Sector left out of leverage and coverage statistics.
    pub excluded_sector: String,
    /// Interest coverage below this is distressed.
    pub distress_icr: f64,
    pub stress_year: i32,
    /// Rate shock applied to floating debt, as a fraction (0.02 = 200bp).
    pub rate_shock: f64,
    /// Share of total debt assumed to reprice.
    pub floating_share: f64,
    /// Countries with fewer companies are left out of the stress test.
    pub min_companies: i64,
    /// CPI year-over-year percentage above which a month is high inflation.
    pub inflation_threshold: f64,
    /// Market used by the return and yield charts.
    pub country: String,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            index_id: "UKX".to_string(),
            excluded_sector: "Financials".to_string(),
            distress_icr: 1.5,
            stress_year: 2024,
            rate_shock: 0.02,
            floating_share: 0.5,
            min_companies: 10,
            inflation_threshold: 3.0,
            country: "US".to_string(),
        }
    }
}

impl QueryParams {
    /// SQL value for a named parameter such as `:index_id`.
    pub fn value(&self, name: &str) -> Option<Value> {
        let value = match name.trim_start_matches([':', '@', '$']) {
            "index_id" => Value::Text(self.index_id.clone()),
            "excluded_sector" => Value::Text(self.excluded_sector.clone()),
            "distress_icr" => Value::Real(self.distress_icr),
            // compared against strftime('%Y', ...) which yields text
            "stress_year" => Value::Text(self.stress_year.to_string()),
            "rate_shock" => Value::Real(self.rate_shock),
            "floating_share" => Value::Real(self.floating_share),
            "min_companies" => Value::Integer(self.min_companies),
            "inflation_threshold" => Value::Real(self.inflation_threshold),
            "country" => Value::Text(self.country.clone()),
            _ => return None,
        };
        Some(value)
    }
}

/// Column names and rows of an executed query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Numeric values of a column; text and null cells are `None`.
    pub fn f64_column(&self, name: &str) -> Vec<Option<f64>> {
        match self.column_index(name) {
            Some(idx) => self.rows.iter().map(|row| value_as_f64(&row[idx])).collect(),
            None => Vec::new(),
        }
    }

    /// Display form of every value in a column; nulls become empty strings.
    pub fn text_column(&self, name: &str) -> Vec<String> {
        match self.column_index(name) {
            Some(idx) => self.rows.iter().map(|row| value_to_string(&row[idx])).collect(),
            None => Vec::new(),
        }
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(col, value)| (col.clone(), value_to_json(value)))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Real(f) => Some(*f),
        Value::Text(s) => s.parse().ok(),
        Value::Null | Value::Blob(_) => None,
    }
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null | Value::Blob(_) => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
    }
}

/// Execute a catalog query, binding only the parameters it names.
pub fn run_query(conn: &Connection, query: &NamedQuery, params: &QueryParams) -> Result<QueryResult> {
    let mut stmt = conn.prepare(query.sql)?;

    let mut bound: Vec<(String, Value)> = Vec::new();
    for idx in 1..=stmt.parameter_count() {
        if let Some(name) = stmt.parameter_name(idx) {
            if let Some(value) = params.value(name) {
                bound.push((name.to_string(), value));
            }
        }
    }
    let named: Vec<(&str, &dyn ToSql)> = bound
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect();

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query(named.as_slice())?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(row.get::<_, Value>(i)?);
        }
        rows.push(values);
    }

    debug!("{}: {} rows", query.name, rows.len());
    Ok(QueryResult { columns, rows })
}
