//! PNG charts for the five research questions plus a summary dashboard.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::database::DatabaseManager;
use crate::queries::catalog;
use crate::queries::{run_query, QueryParams, QueryResult};

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const PRIMARY: RGBColor = RGBColor(0x2E, 0x86, 0xAB);
const SECONDARY: RGBColor = RGBColor(0xA2, 0x3B, 0x72);
const ACCENT: RGBColor = RGBColor(0xF1, 0x8F, 0x01);
const ALERT: RGBColor = RGBColor(0xC7, 0x3E, 0x1D);
const NEUTRAL: RGBColor = RGBColor(0x6C, 0x75, 0x7D);
const HIGHLIGHT: RGBColor = RGBColor(0x28, 0xA7, 0x45);

const FONT: &str = "sans-serif";
const CRISIS_YEARS: [&str; 3] = ["2008", "2020", "2022"];

/// Every chart, in the order they are rendered.
pub const CHARTS: [&str; 7] = [
    "viz_uc1_concentration",
    "viz_uc2_leverage",
    "viz_uc3_stress_test",
    "viz_uc4_volatility",
    "viz_uc5_inflation",
    "viz_uc5_rate_sensitivity",
    "viz_dashboard",
];

/// One bar series; `colors` holds one color per bar.
struct Bars<'s> {
    label: &'s str,
    values: Vec<f64>,
    colors: Vec<RGBColor>,
}

impl<'s> Bars<'s> {
    fn uniform(label: &'s str, values: Vec<f64>, color: RGBColor) -> Self {
        let colors = vec![color; values.len()];
        Self { label, values, colors }
    }

    fn legend_color(&self) -> RGBColor {
        self.colors.first().copied().unwrap_or(PRIMARY)
    }
}

/// A horizontal reference line (or vertical, on horizontal bar charts).
struct Threshold<'s> {
    value: f64,
    label: &'s str,
}

fn category_label(labels: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

/// Value range padded so bars and thresholds fit.
fn value_range(values: impl Iterator<Item = f64>, threshold: Option<f64>) -> (f64, f64) {
    let (mut lo, mut hi) = (0.0_f64, 0.0_f64);
    for v in values.chain(threshold).filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if hi <= lo {
        hi = lo + 1.0;
    }
    let pad = (hi - lo) * 0.1;
    (if lo < 0.0 { lo - pad } else { lo }, hi + pad)
}

fn blend(from: RGBColor, to: RGBColor, t: f64) -> RGBColor {
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t.clamp(0.0, 1.0)).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

fn no_data(area: &Area, title: &str) -> Result<()> {
    let area = area.titled(title, (FONT, 18))?;
    let (xs, ys) = area.get_pixel_range();
    let center = ((xs.start + xs.end) / 2 - 30, (ys.start + ys.end) / 2);
    area.draw(&Text::new("no data", center, (FONT, 16).into_font().color(&NEUTRAL)))?;
    Ok(())
}

fn vertical_bars(
    area: &Area,
    title: &str,
    labels: &[String],
    series: &[Bars],
    y_desc: &str,
    threshold: Option<Threshold>,
) -> Result<()> {
    if labels.is_empty() || series.is_empty() {
        return no_data(area, title);
    }

    let n = labels.len();
    let (y_min, y_max) = value_range(
        series.iter().flat_map(|s| s.values.iter().copied()),
        threshold.as_ref().map(|t| t.value),
    );

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), y_min..y_max)?;

    let formatter = |x: &f64| category_label(labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&formatter)
        .y_desc(y_desc)
        .draw()?;

    let width = 0.8 / series.len() as f64;
    for (k, s) in series.iter().enumerate() {
        let offset = -0.4 + k as f64 * width;
        let legend = s.legend_color();
        chart
            .draw_series(s.values.iter().zip(&s.colors).enumerate().map(|(i, (v, c))| {
                let x0 = i as f64 + offset;
                Rectangle::new([(x0, 0.0), (x0 + width, *v)], c.mix(0.85).filled())
            }))?
            .label(s.label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], legend.filled()));
    }

    if let Some(t) = &threshold {
        chart
            .draw_series(LineSeries::new(
                vec![(-0.5, t.value), (n as f64 - 0.5, t.value)],
                ACCENT.stroke_width(2),
            ))?
            .label(t.label)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], ACCENT.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn horizontal_bars(
    area: &Area,
    title: &str,
    labels: &[String],
    bars: &Bars,
    x_desc: &str,
    threshold: Option<Threshold>,
) -> Result<()> {
    if labels.is_empty() {
        return no_data(area, title);
    }

    let n = labels.len();
    let (x_min, x_max) = value_range(bars.values.iter().copied(), threshold.as_ref().map(|t| t.value));

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(170)
        .build_cartesian_2d(x_min..x_max, -0.5..(n as f64 - 0.5))?;

    let formatter = |y: &f64| category_label(labels, *y);
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&formatter)
        .x_desc(x_desc)
        .draw()?;

    chart.draw_series(bars.values.iter().zip(&bars.colors).enumerate().map(|(i, (v, c))| {
        let y0 = i as f64 - 0.4;
        Rectangle::new([(0.0, y0), (*v, y0 + 0.8)], c.mix(0.85).filled())
    }))?;

    if let Some(t) = &threshold {
        chart
            .draw_series(LineSeries::new(
                vec![(t.value, -0.5), (t.value, n as f64 - 0.5)],
                ACCENT.stroke_width(2),
            ))?
            .label(t.label)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], ACCENT.stroke_width(2)));
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

fn line_panel(
    area: &Area,
    title: &str,
    labels: &[String],
    values: &[Option<f64>],
    color: RGBColor,
    filled: bool,
    y_desc: &str,
    threshold: Option<Threshold>,
) -> Result<()> {
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|v| v.is_finite()).map(|v| (i as f64, v)))
        .collect();
    if points.is_empty() {
        return no_data(area, title);
    }

    let n = labels.len();
    let (y_min, y_max) = value_range(points.iter().map(|p| p.1), threshold.as_ref().map(|t| t.value));

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), y_min..y_max)?;

    let formatter = |x: &f64| category_label(labels, *x);
    chart
        .configure_mesh()
        .x_labels(n)
        .x_label_formatter(&formatter)
        .y_desc(y_desc)
        .draw()?;

    if filled {
        chart.draw_series(AreaSeries::new(points.iter().copied(), 0.0, color.mix(0.3)))?;
    }
    chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
    chart.draw_series(points.iter().map(|p| Circle::new(*p, 4, color.filled())))?;

    if let Some(t) = &threshold {
        chart
            .draw_series(LineSeries::new(
                vec![(-0.5, t.value), (n as f64 - 0.5, t.value)],
                ACCENT.stroke_width(2),
            ))?
            .label(t.label)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], ACCENT.stroke_width(2)));
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

fn values_or_zero(result: &QueryResult, column: &str) -> Vec<f64> {
    result
        .f64_column(column)
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect()
}

/// UC1: top 10 weight bars (crisis years highlighted) next to the HHI trend.
pub fn viz_uc1_concentration(db: &DatabaseManager, params: &QueryParams, path: &Path) -> Result<()> {
    let top10 = run_query(db.connection(), &catalog::TOP10_CONCENTRATION, params)?;
    let hhi = run_query(db.connection(), &catalog::HHI_CONCENTRATION, params)?;

    let root = BitMapBackend::new(path, (1400, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    let (left, right) = root.split_horizontally(700);

    let years = top10.text_column("year");
    let weights = values_or_zero(&top10, "top10_weight_pct");
    let colors = years
        .iter()
        .map(|y| if CRISIS_YEARS.contains(&y.as_str()) { ALERT } else { PRIMARY })
        .collect();
    vertical_bars(
        &left,
        &format!("{} Top 10 Concentration", params.index_id),
        &years,
        &[Bars { label: "Top 10 weight", values: weights, colors }],
        "Top 10 Weight (%)",
        Some(Threshold { value: 50.0, label: "50% threshold" }),
    )?;

    line_panel(
        &right,
        "Herfindahl-Hirschman Index",
        &hhi.text_column("year"),
        &hhi.f64_column("hhi_index"),
        SECONDARY,
        true,
        "HHI",
        Some(Threshold { value: 250.0, label: "Moderate concentration" }),
    )?;

    root.present()?;
    Ok(())
}

/// UC2: share of companies deleveraging per year.
pub fn viz_uc2_leverage(db: &DatabaseManager, params: &QueryParams, path: &Path) -> Result<()> {
    let result = run_query(db.connection(), &catalog::DELEVERAGING_SHARE, params)?;

    let root = BitMapBackend::new(path, (1400, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let pct = values_or_zero(&result, "pct");
    let colors = pct
        .iter()
        .map(|p| if *p > 25.0 { ALERT } else if *p > 15.0 { PRIMARY } else { NEUTRAL })
        .collect();
    vertical_bars(
        &root,
        "Deleveraging Cycles (debt down two years running)",
        &result.text_column("year"),
        &[Bars { label: "Deleveraging (%)", values: pct, colors }],
        "Companies Deleveraging (%)",
        Some(Threshold { value: 20.0, label: "20% threshold" }),
    )?;

    root.present()?;
    Ok(())
}

/// UC3: average coverage per country before and after the rate shock.
pub fn viz_uc3_stress_test(db: &DatabaseManager, params: &QueryParams, path: &Path) -> Result<()> {
    let result = run_query(db.connection(), &catalog::RATE_SHOCK_STRESS_TEST, params)?;

    let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let clip = |v: Vec<f64>| v.into_iter().map(|x| x.min(80.0)).collect::<Vec<_>>();
    let countries: Vec<String> = result
        .text_column("country_id")
        .into_iter()
        .zip(result.text_column("companies"))
        .map(|(country, n)| format!("{} (n={})", country, n))
        .collect();
    let shock_bp = (params.rate_shock * 10_000.0).round();
    let shocked_label = format!("Shocked ICR (+{}bp)", shock_bp);
    let distress_label = format!("Distress threshold ({})", params.distress_icr);

    vertical_bars(
        &root,
        &format!("{}bp Rate Shock Stress Test ({} data)", shock_bp, params.stress_year),
        &countries,
        &[
            Bars::uniform("Current ICR", clip(values_or_zero(&result, "current_icr")), PRIMARY),
            Bars::uniform(&shocked_label, clip(values_or_zero(&result, "shocked_icr")), ALERT),
        ],
        "Interest Coverage Ratio",
        Some(Threshold { value: params.distress_icr, label: &distress_label }),
    )?;

    root.present()?;
    Ok(())
}

/// UC4: average revenue volatility by sector, defensive to cyclical.
pub fn viz_uc4_volatility(db: &DatabaseManager, params: &QueryParams, path: &Path) -> Result<()> {
    let result = run_query(db.connection(), &catalog::SECTOR_VOLATILITY, params)?;

    let root = BitMapBackend::new(path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let values: Vec<f64> = values_or_zero(&result, "avg_vol")
        .into_iter()
        .map(|v| v.min(100.0))
        .collect();
    let last = values.len().saturating_sub(1).max(1) as f64;
    let colors = (0..values.len())
        .map(|i| blend(HIGHLIGHT, ALERT, i as f64 / last))
        .collect();

    horizontal_bars(
        &root,
        "Revenue Volatility by Sector (cyclicality proxy)",
        &result.text_column("gics_sector_name"),
        &Bars { label: "Volatility", values, colors },
        "Average Revenue Volatility (%)",
        Some(Threshold { value: 20.0, label: "20% volatility threshold" }),
    )?;

    root.present()?;
    Ok(())
}

/// Pivot (regime, sector, return) rows into one value per sector for each
/// regime; missing combinations are zero.
fn pivot_regimes(result: &QueryResult) -> (Vec<String>, Vec<f64>, Vec<f64>) {
    let regimes = result.text_column("regime");
    let sectors_col = result.text_column("sector");
    let returns = result.f64_column("ann_return");

    let mut sectors: Vec<String> = sectors_col.clone();
    sectors.sort();
    sectors.dedup();

    let mut high = vec![0.0; sectors.len()];
    let mut low = vec![0.0; sectors.len()];
    for ((regime, sector), value) in regimes.iter().zip(&sectors_col).zip(returns) {
        let idx = match sectors.binary_search(sector) {
            Ok(i) => i,
            Err(_) => continue,
        };
        let slot = if regime.starts_with("High") { &mut high } else { &mut low };
        slot[idx] = value.unwrap_or(0.0);
    }
    (sectors, high, low)
}

/// UC5: annualized sector returns in high and low inflation months.
pub fn viz_uc5_inflation(db: &DatabaseManager, params: &QueryParams, path: &Path) -> Result<()> {
    let result = run_query(db.connection(), &catalog::SECTOR_INFLATION_RETURNS, params)?;
    let (sectors, high, low) = pivot_regimes(&result);

    let root = BitMapBackend::new(path, (1400, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let high_label = format!("High Inflation (CPI>{}%)", params.inflation_threshold);
    let low_label = format!("Low Inflation (CPI<={}%)", params.inflation_threshold);
    vertical_bars(
        &root,
        &format!("Sector Performance by Inflation Regime ({})", params.country),
        &sectors,
        &[
            Bars::uniform(&high_label, high, ALERT),
            Bars::uniform(&low_label, low, PRIMARY),
        ],
        "Annualized Return (%)",
        None,
    )?;

    root.present()?;
    Ok(())
}

/// UC5: covariance of sector returns with 10Y yield changes.
pub fn viz_uc5_rate_sensitivity(db: &DatabaseManager, params: &QueryParams, path: &Path) -> Result<()> {
    let result = run_query(db.connection(), &catalog::SECTOR_RATE_SENSITIVITY, params)?;

    let root = BitMapBackend::new(path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let values: Vec<f64> = values_or_zero(&result, "sensitivity")
        .into_iter()
        .map(|v| v * 1000.0)
        .collect();
    let colors = values
        .iter()
        .map(|v| if *v < 0.0 { ALERT } else { HIGHLIGHT })
        .collect();

    horizontal_bars(
        &root,
        "Sector Rate Sensitivity (10Y yield changes)",
        &result.text_column("gics_sector_name"),
        &Bars { label: "Sensitivity", values, colors },
        "Rate Sensitivity (x1000)",
        None,
    )?;

    root.present()?;
    Ok(())
}

/// Six-panel overview of what was loaded.
pub fn viz_dashboard(db: &DatabaseManager, params: &QueryParams, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (1600, 1000)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("MacroAlpha Dashboard: Key Metrics", (FONT, 24))?;
    let panels = root.split_evenly((2, 3));

    let counts = db.table_counts()?;
    let shown = ["companies", "prices_weekly", "financials", "macro_indicators"];
    let (names, sizes): (Vec<String>, Vec<f64>) = counts
        .iter()
        .filter(|(table, _)| shown.contains(table))
        .map(|(table, n)| (table.to_string(), *n as f64 / 1000.0))
        .unzip();
    horizontal_bars(
        &panels[0],
        "Database Size",
        &names,
        &Bars::uniform("Records", sizes, PRIMARY),
        "Records (thousands)",
        None,
    )?;

    let sectors = run_query(db.connection(), &catalog::COMPANIES_BY_SECTOR, params)?;
    horizontal_bars(
        &panels[1],
        "Companies by Sector (Top 6)",
        &sectors.text_column("gics_sector_name"),
        &Bars::uniform("Companies", values_or_zero(&sectors, "cnt"), SECONDARY),
        "Companies",
        None,
    )?;

    let coverage = run_query(db.connection(), &catalog::FINANCIAL_COVERAGE, params)?;
    line_panel(
        &panels[2],
        "Financial Data Coverage",
        &coverage.text_column("year"),
        &coverage.f64_column("companies"),
        SECONDARY,
        false,
        "Companies with Data",
        None,
    )?;

    let top10 = run_query(db.connection(), &catalog::TOP10_CONCENTRATION, params)?;
    line_panel(
        &panels[3],
        &format!("{} Concentration", params.index_id),
        &top10.text_column("year"),
        &top10.f64_column("top10_weight_pct"),
        PRIMARY,
        true,
        "Top 10 Weight (%)",
        None,
    )?;

    let yields = run_query(db.connection(), &catalog::YIELD_HISTORY, params)?;
    line_panel(
        &panels[4],
        &format!("{} 10-Year Yield", params.country),
        &yields.text_column("year"),
        &yields.f64_column("rate"),
        ACCENT,
        false,
        "10Y Yield (%)",
        None,
    )?;

    let macros = run_query(db.connection(), &catalog::MACRO_COVERAGE, params)?;
    vertical_bars(
        &panels[5],
        "Macro Data by Country",
        &macros.text_column("country_id"),
        &[Bars::uniform("Indicators", values_or_zero(&macros, "indicators"), HIGHLIGHT)],
        "Unique Indicators",
        None,
    )?;

    root.present()?;
    Ok(())
}

/// Render every chart into `out_dir` as `<name>.png`.
pub fn render_all(db: &DatabaseManager, params: &QueryParams, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    info!("📊 Generating charts in {}/", out_dir.display());

    type Render = fn(&DatabaseManager, &QueryParams, &Path) -> Result<()>;
    let renderers: [Render; 7] = [
        viz_uc1_concentration,
        viz_uc2_leverage,
        viz_uc3_stress_test,
        viz_uc4_volatility,
        viz_uc5_inflation,
        viz_uc5_rate_sensitivity,
        viz_dashboard,
    ];

    let mut written = Vec::with_capacity(CHARTS.len());
    for (name, render) in CHARTS.iter().zip(renderers) {
        let path = out_dir.join(format!("{}.png", name));
        render(db, params, &path)?;
        info!("   ✓ Saved: {}", path.display());
        written.push(path);
    }
    Ok(written)
}
