//! The linear batch run: consolidate → schema → load → analyze → render.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::charts;
use crate::consolidator;
use crate::database::DatabaseManager;
use crate::error::Result;
use crate::export::{self, ExportFormat, ExportSummary};
use crate::importers::{self, ImportOptions};
use crate::models::{Config, ImportStats};
use crate::queries::QueryParams;

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Delete the database file before loading.
    pub fresh: bool,
    pub import: ImportOptions,
    pub format: ExportFormat,
    pub params: QueryParams,
    pub skip_charts: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct PipelineReport {
    /// Rows in the consolidated snapshot, when constituent exports were found.
    pub snapshot_rows: Option<usize>,
    pub unique_tickers: Option<usize>,
    pub imports: Vec<ImportStats>,
    pub export: ExportSummary,
    pub charts: Vec<PathBuf>,
}

/// Merge the per-year constituent exports in the data directory.
///
/// Returns `None` when there are no exports; an existing snapshot file is
/// then left as it is.
pub fn consolidate(config: &Config) -> Result<Option<usize>> {
    let files = consolidator::discover_membership_files(&config.data_dir, &config.sources.membership_indices)?;
    if files.is_empty() {
        info!(
            "⏩ No constituent exports in {}, keeping the existing snapshot",
            config.data_dir.display()
        );
        return Ok(None);
    }

    let rows = consolidator::consolidate_membership(&files)?;
    consolidator::write_snapshot(&rows, &config.snapshot_path())?;
    Ok(Some(rows.len()))
}

/// Write the unique ticker list next to the snapshot, if there is one.
pub fn ticker_list(config: &Config) -> Result<Option<usize>> {
    let snapshot = config.snapshot_path();
    if !snapshot.exists() {
        info!("⏩ No membership snapshot at {}, skipping ticker list", snapshot.display());
        return Ok(None);
    }
    let tickers = consolidator::unique_tickers(&snapshot)?;
    consolidator::write_ticker_list(&tickers, &config.source_path(&config.sources.ticker_list))?;
    Ok(Some(tickers.len()))
}

/// Open the configured database and make sure the schema exists.
pub fn open_database(config: &Config, fresh: bool) -> Result<DatabaseManager> {
    let timeout = Duration::from_millis(config.busy_timeout_ms);
    let db = if fresh {
        DatabaseManager::create_fresh(&config.database_path, timeout)?
    } else {
        DatabaseManager::open(&config.database_path, timeout)?
    };
    db.initialize_schema()?;
    Ok(db)
}

/// Row counts per table, logged and returned.
pub fn status(db: &DatabaseManager) -> Result<Vec<(&'static str, i64)>> {
    let counts = db.table_counts()?;
    info!("📊 Database status:");
    for (table, count) in &counts {
        info!("   {:<18} {:>10}", table, count);
    }
    Ok(counts)
}

pub fn run_pipeline(config: &Config, options: &PipelineOptions) -> anyhow::Result<PipelineReport> {
    let started = Instant::now();
    info!("🚀 MacroAlpha pipeline starting (data dir {})", config.data_dir.display());

    let mut report = PipelineReport {
        snapshot_rows: consolidate(config)?,
        unique_tickers: ticker_list(config)?,
        ..PipelineReport::default()
    };

    let db = open_database(config, options.fresh)?;
    report.imports = importers::run_all(&db, config, &options.import)?;
    status(&db)?;

    report.export = export::export_all(&db, &options.params, &config.results_dir, options.format)?;

    if !options.skip_charts {
        report.charts = charts::render_all(&db, &options.params, &config.charts_dir)?;
    }

    info!("✅ Pipeline finished in {:.1}s", started.elapsed().as_secs_f64());
    Ok(report)
}
