use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use macroalpha::charts;
use macroalpha::export::{self, ExportFormat};
use macroalpha::importers::{self, ImportOptions, Source};
use macroalpha::models::Config;
use macroalpha::pipeline::{self, PipelineOptions};
use macroalpha::queries::QueryParams;

#[derive(Parser)]
#[command(
    name = "macroalpha",
    about = "📈 MacroAlpha ETL and analytics",
    long_about = "Loads index membership, prices, financials, macro indicators and interest rates \
                  from vendor spreadsheet exports into SQLite, then exports query results and charts. \
                  Runs the whole pipeline when no command is given."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Directory holding the spreadsheet exports
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory for exported query results
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    /// Directory for rendered charts
    #[arg(long, global = true)]
    charts_dir: Option<PathBuf>,

    /// Index used by the concentration queries
    #[arg(long, global = true)]
    index: Option<String>,

    /// Show debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Merge per-year constituent exports into the membership snapshot
    Consolidate,
    /// Write the unique ticker list from the membership snapshot
    Tickers,
    /// Create the database schema
    InitDb {
        /// Delete any existing database first
        #[arg(long)]
        fresh: bool,
    },
    /// Load spreadsheet exports into the database
    Import {
        /// Load only this source (all sources when omitted)
        #[arg(long, value_enum)]
        source: Option<Source>,

        /// Rebuild the financials date column from the period calendar
        #[arg(long)]
        fill_dates: bool,
    },
    /// Run the analytical queries and write their results
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },
    /// Render the charts
    Charts,
    /// Show row counts per table
    Status,
    /// Run every step in order
    Run {
        /// Delete any existing database first
        #[arg(long)]
        fresh: bool,

        #[arg(long)]
        fill_dates: bool,

        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        #[arg(long)]
        skip_charts: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "macroalpha=debug" } else { "macroalpha=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    if let Some(dir) = &cli.results_dir {
        config.results_dir = dir.clone();
    }
    if let Some(dir) = &cli.charts_dir {
        config.charts_dir = dir.clone();
    }
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let mut params = QueryParams::default();
    if let Some(index) = &cli.index {
        params.index_id = index.clone();
    }

    let command = cli.command.unwrap_or(Command::Run {
        fresh: false,
        fill_dates: false,
        format: ExportFormat::Csv,
        skip_charts: false,
    });

    match command {
        Command::Consolidate => {
            if pipeline::consolidate(&config)?.is_none() {
                info!("Nothing to consolidate");
            }
        }
        Command::Tickers => {
            pipeline::ticker_list(&config)?;
        }
        Command::InitDb { fresh } => {
            pipeline::open_database(&config, fresh)?;
            info!("💾 Database ready at {}", config.database_path.display());
        }
        Command::Import { source, fill_dates } => {
            let db = pipeline::open_database(&config, false)?;
            let options = ImportOptions { fill_dates };
            let stats = match source {
                Some(source) => importers::import_source(&db, &config, &options, source)?,
                None => importers::run_all(&db, &config, &options)?,
            };
            for s in &stats {
                info!(
                    "   {:<24} read {:>8}  written {:>8}  skipped {:>8}",
                    s.source, s.rows_read, s.rows_written, s.rows_skipped
                );
            }
        }
        Command::Export { format } => {
            let db = pipeline::open_database(&config, false)?;
            let summary = export::export_all(&db, &params, &config.results_dir, format)?;
            if !summary.all_succeeded() {
                anyhow::bail!("{} of {} queries failed", summary.failed.len(), summary.total());
            }
        }
        Command::Charts => {
            let db = pipeline::open_database(&config, false)?;
            charts::render_all(&db, &params, &config.charts_dir)?;
        }
        Command::Status => {
            let db = pipeline::open_database(&config, false)?;
            pipeline::status(&db)?;
        }
        Command::Run {
            fresh,
            fill_dates,
            format,
            skip_charts,
        } => {
            let options = PipelineOptions {
                fresh,
                import: ImportOptions { fill_dates },
                format,
                params,
                skip_charts,
            };
            let report = pipeline::run_pipeline(&config, &options)?;
            if !report.export.all_succeeded() {
                anyhow::bail!("{} export queries failed", report.export.failed.len());
            }
        }
    }
    Ok(())
}
