use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use serde::Serialize;
use tracing::{error, info};

use crate::database::DatabaseManager;
use crate::error::Result;
use crate::queries::catalog::EXPORT_QUERIES;
use crate::queries::{run_query, value_to_string, NamedQuery, QueryParams, QueryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    /// (query name, error message)
    pub failed: Vec<(String, String)>,
}

impl ExportSummary {
    pub fn total(&self) -> usize {
        self.written.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

pub fn write_csv(result: &QueryResult, path: &Path) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record(&result.columns)?;
    for row in &result.rows {
        wtr.write_record(row.iter().map(value_to_string))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json(result: &QueryResult, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&result.to_json())?;
    fs::write(path, json)?;
    Ok(())
}

/// Run one query and write its result under `out_dir`.
pub fn export_query(
    db: &DatabaseManager,
    query: &NamedQuery,
    params: &QueryParams,
    out_dir: &Path,
    format: ExportFormat,
) -> Result<PathBuf> {
    let result = run_query(db.connection(), query, params)?;
    let path = out_dir.join(format!("{}.{}", query.name, format.extension()));
    match format {
        ExportFormat::Csv => write_csv(&result, &path)?,
        ExportFormat::Json => write_json(&result, &path)?,
    }
    info!("   ✓ Saved: {} ({} rows)", path.display(), result.len());
    Ok(path)
}

/// Export every catalog query. A failing query is logged and counted; only
/// failing to create the output directory aborts.
pub fn export_all(
    db: &DatabaseManager,
    params: &QueryParams,
    out_dir: &Path,
    format: ExportFormat,
) -> Result<ExportSummary> {
    fs::create_dir_all(out_dir)?;
    info!("🔍 Exporting {} queries to {}/", EXPORT_QUERIES.len(), out_dir.display());

    let mut summary = ExportSummary::default();
    for query in &EXPORT_QUERIES {
        info!("   Executing: {}...", query.name);
        match export_query(db, query, params, out_dir, format) {
            Ok(path) => summary.written.push(path),
            Err(e) => {
                error!("   ✗ {} failed: {}", query.name, e);
                summary.failed.push((query.name.to_string(), e.to_string()));
            }
        }
    }

    if summary.all_succeeded() {
        info!("✅ All {} queries exported successfully", summary.total());
    } else {
        info!(
            "⚠️  {} of {} queries failed to export",
            summary.failed.len(),
            summary.total()
        );
    }
    Ok(summary)
}
