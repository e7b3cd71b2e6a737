use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};

use crate::models::PeriodType;
use crate::sheet::Cell;

/// Placeholders the terminal writes instead of a value.
const NA_SENTINELS: &[&str] = &["#N/A", "--", "#N/A Requesting Data...", "N/A", "nan", ""];

/// Date formats accepted in text cells, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%m-%d-%Y",
];

/// A cell value after sentinel removal.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanValue {
    Number(f64),
    Text(String),
}

/// Map N/A sentinels to `None`, numeric text to a number, everything else to
/// trimmed text.
pub fn clean_value(cell: &Cell) -> Option<CleanValue> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) if n.is_nan() => None,
        Cell::Number(n) => Some(CleanValue::Number(*n)),
        Cell::Date(d) => Some(CleanValue::Text(format_iso(*d))),
        Cell::Text(raw) => {
            let value = raw.trim();
            if is_na(value) {
                return None;
            }
            match value.replace(',', "").parse::<f64>() {
                Ok(n) if n.is_finite() => Some(CleanValue::Number(n)),
                _ => Some(CleanValue::Text(value.to_string())),
            }
        }
    }
}

fn is_na(value: &str) -> bool {
    // "#N/A N/A", "#N/A Field Not Applicable", ... all start with #N/A
    NA_SENTINELS.contains(&value) || value.starts_with("#N/A")
}

/// Numeric field; text that is not a number counts as missing.
pub fn clean_number(cell: &Cell) -> Option<f64> {
    match clean_value(cell)? {
        CleanValue::Number(n) => Some(n),
        CleanValue::Text(_) => None,
    }
}

/// Text field; numbers are rendered back to text.
pub fn clean_text(cell: &Cell) -> Option<String> {
    match clean_value(cell)? {
        CleanValue::Text(s) => Some(s),
        CleanValue::Number(_) => cell.as_label(),
    }
}

/// Parse a date cell in any of the accepted layouts.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => parse_date_str(s),
        Cell::Empty | Cell::Number(_) => None,
    }
}

pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }

    // Timestamps written by spreadsheet tools: "2024-12-31 00:00:00"
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(ts.date());
        }
    }

    None
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// First-of-month dates counting backward from `end`; index 0 is `end`'s month.
pub fn month_calendar(end: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let anchor = end.with_day(1).unwrap_or(end);
    (0..count)
        .filter_map(|offset| anchor.checked_sub_months(Months::new(offset as u32)))
        .collect()
}

/// Period end dates from `first_year` to `last_year` inclusive.
pub fn period_calendar(period_type: PeriodType, first_year: i32, last_year: i32) -> Vec<NaiveDate> {
    let ends: &[(u32, u32)] = match period_type {
        PeriodType::Annual => &[(12, 31)],
        PeriodType::Quarterly => &[(3, 31), (6, 30), (9, 30), (12, 31)],
    };

    (first_year..=last_year)
        .flat_map(|year| {
            ends.iter()
                .filter_map(move |&(month, day)| NaiveDate::from_ymd_opt(year, month, day))
        })
        .collect()
}

/// First `20xx` year embedded in a file name.
pub fn extract_year(name: &str) -> Option<i32> {
    let bytes = name.as_bytes();
    bytes.windows(4).find_map(|w| {
        if w[0] == b'2' && w[1] == b'0' && w[2].is_ascii_digit() && w[3].is_ascii_digit() {
            std::str::from_utf8(w).ok()?.parse().ok()
        } else {
            None
        }
    })
}

/// Three-letter English month abbreviation used in macro export headers.
pub fn month_abbreviation(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}
