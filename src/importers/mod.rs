//! Spreadsheet-to-row mappers and their loaders, one module per source.
//!
//! Each source exposes a pure `map_*` function that turns a [`Grid`] into
//! typed rows and an `import_*` function that reads the file, maps it and
//! writes the rows through [`DatabaseManager`].
//!
//! [`Grid`]: crate::sheet::Grid

pub mod companies;
pub mod financials;
pub mod macros;
pub mod membership;
pub mod prices;
pub mod rates;

use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::database::DatabaseManager;
use crate::error::Result;
use crate::models::{Config, ImportStats, PeriodType};

/// Tickers that are present in the source but were never loaded as companies
/// resolve to `None`; callers skip those rows.
pub struct TickerResolver {
    cache: HashMap<String, i64>,
}

impl TickerResolver {
    pub fn new(db: &DatabaseManager) -> Result<Self> {
        Ok(Self {
            cache: db.ticker_map()?,
        })
    }

    pub fn resolve(&mut self, db: &DatabaseManager, ticker: &str) -> Result<Option<i64>> {
        if let Some(id) = self.cache.get(ticker) {
            return Ok(Some(*id));
        }
        let id = db.company_id(ticker)?;
        if let Some(id) = id {
            self.cache.insert(ticker.to_string(), id);
        } else {
            debug!("Ticker {} not in companies table", ticker);
        }
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Rebuild the financials date column from the period calendar.
    pub fill_dates: bool,
}

/// Every loadable source, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Source {
    Companies,
    Membership,
    Prices,
    Financials,
    Macro,
    Rates,
}

impl Source {
    pub const ALL: [Source; 6] = [
        Source::Companies,
        Source::Membership,
        Source::Prices,
        Source::Financials,
        Source::Macro,
        Source::Rates,
    ];
}

/// Load one source into the database.
pub fn import_source(
    db: &DatabaseManager,
    config: &Config,
    options: &ImportOptions,
    source: Source,
) -> Result<Vec<ImportStats>> {
    let sources = &config.sources;
    let stats = match source {
        Source::Companies => vec![companies::import_companies(
            db,
            &config.source_path(&sources.company_master),
        )?],
        Source::Membership => {
            let mut resolver = TickerResolver::new(db)?;
            vec![membership::import_index_membership(
                db,
                &mut resolver,
                &config.snapshot_path(),
            )?]
        }
        Source::Prices => {
            let mut resolver = TickerResolver::new(db)?;
            vec![prices::import_prices_weekly(
                db,
                &mut resolver,
                &config.source_path(&sources.prices_weekly),
                config.commit_every,
            )?]
        }
        Source::Financials => {
            let mut resolver = TickerResolver::new(db)?;
            let mut stats = vec![financials::import_financials(
                db,
                &mut resolver,
                &config.source_path(&sources.financials_annual),
                PeriodType::Annual,
                options.fill_dates,
                config.commit_every,
            )?];
            let quarterly = config.source_path(&sources.financials_quarterly);
            if quarterly.exists() {
                stats.push(financials::import_financials(
                    db,
                    &mut resolver,
                    &quarterly,
                    PeriodType::Quarterly,
                    options.fill_dates,
                    config.commit_every,
                )?);
            } else {
                info!("⏩ No quarterly financials at {}, skipping", quarterly.display());
            }
            stats
        }
        Source::Macro => {
            let mut stats = Vec::new();
            for (file, country) in &sources.macro_files {
                let path = config.source_path(file);
                if path.exists() {
                    stats.push(macros::import_macro(db, &path, country, config.macro_end_month)?);
                } else {
                    info!("⏩ Macro file {} not found, skipping", path.display());
                }
            }
            stats
        }
        Source::Rates => vec![rates::import_interest_rates(
            db,
            &config.source_path(&sources.interest_rates),
        )?],
    };
    Ok(stats)
}

/// Load every source in dependency order.
pub fn run_all(
    db: &DatabaseManager,
    config: &Config,
    options: &ImportOptions,
) -> Result<Vec<ImportStats>> {
    let mut all = Vec::new();
    for source in Source::ALL {
        all.extend(import_source(db, config, options, source)?);
    }
    Ok(all)
}

/// Row progress bar; indicatif hides it when stderr is not a terminal.
pub(crate) fn progress_bar(len: u64, message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message);
    pb
}
