//! Coercion of messy survey answers into numeric years.
//!
//! Age brackets ("25-34", "<18", "65+") become their midpoint; experience
//! answers ("0-2", ">=5", "since 08.wrz") become elapsed years. Values that
//! match none of the accepted shapes degrade to a missing value so that row
//! counts are preserved.

use chrono::{Local, NaiveDate};
use color_eyre::Result;
use polars::prelude::*;
use regex::Regex;
use std::sync::OnceLock;

/// Polish three-letter month abbreviations, in calendar order.
pub const MONTHS_PL: &[(&str, u32)] = &[
    ("sty", 1),
    ("lut", 2),
    ("mar", 3),
    ("kwi", 4),
    ("maj", 5),
    ("cze", 6),
    ("lip", 7),
    ("sie", 8),
    ("wrz", 9),
    ("paź", 10),
    ("lis", 11),
    ("gru", 12),
];

fn month_number(abbrev: &str) -> Option<u32> {
    MONTHS_PL
        .iter()
        .find(|(name, _)| *name == abbrev)
        .map(|(_, n)| *n)
}

/// Parses an age answer into years. Bracket strings are averaged: a leading
/// `<` becomes a `0-` lower bound and a trailing `+` a `-100` upper bound,
/// then all numeric halves are averaged. Plain numbers pass through.
pub fn parse_age(value: &str) -> Option<f64> {
    let cleaned = value.trim().replace('<', "0-").replace('+', "-100");
    let halves: Vec<f64> = cleaned
        .split('-')
        .filter_map(|part| part.trim().parse::<f64>().ok())
        .collect();
    if halves.is_empty() {
        return None;
    }
    Some(halves.iter().sum::<f64>() / halves.len() as f64)
}

fn experience_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{2})?\.*([a-ząćęłńóśżź]{3})").expect("valid experience regex")
    })
}

/// Parses an experience answer into years, relative to `today`.
///
/// Three accepted shapes: the literal `0-2` (one year), a `>=N` floor
/// (N years), and a "since" token of two-digit year plus Polish month
/// abbreviation (elapsed years, one decimal). Two-digit years below 30 are
/// 20xx, the rest 19xx. Everything else is missing.
pub fn parse_experience_at(value: &str, today: NaiveDate) -> Option<f64> {
    let value = value.trim().to_lowercase();
    if value == "0-2" {
        return Some(1.0);
    }
    if let Some(rest) = value.strip_prefix(">=") {
        return rest.trim().parse::<i64>().ok().map(|n| n as f64);
    }
    let caps = experience_date_re().captures(&value)?;
    let year_str = caps.get(1)?.as_str();
    let month = month_number(caps.get(2)?.as_str())?;
    let year: i32 = year_str.parse().ok()?;
    let year = year + if year < 30 { 2000 } else { 1900 };
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days = (today - start).num_days() as f64;
    Some((days / 365.25 * 10.0).round() / 10.0)
}

/// [`parse_experience_at`] against today's local date.
pub fn parse_experience(value: &str) -> Option<f64> {
    parse_experience_at(value, Local::now().date_naive())
}

/// Rewrites the canonical `age` and `experience_years` columns to Float64
/// using the parsers above. Columns already numeric are cast; text columns
/// are parsed row by row, unparseable entries becoming null. Other columns
/// are untouched.
pub fn preprocess_at(df: &mut DataFrame, today: NaiveDate) -> Result<()> {
    coerce_column(df, "age", parse_age)?;
    coerce_column(df, "experience_years", |v| parse_experience_at(v, today))?;
    Ok(())
}

/// [`preprocess_at`] against today's local date.
pub fn preprocess(df: &mut DataFrame) -> Result<()> {
    preprocess_at(df, Local::now().date_naive())
}

fn coerce_column<F>(df: &mut DataFrame, name: &str, parse: F) -> Result<()>
where
    F: Fn(&str) -> Option<f64>,
{
    let Ok(column) = df.column(name) else {
        return Ok(());
    };
    let series = column.as_materialized_series().clone();
    let parsed: Series = if series.dtype().is_numeric() {
        series.cast(&DataType::Float64)?
    } else if series.dtype() == &DataType::String {
        let ca = series.str()?;
        let values: Vec<Option<f64>> = ca.into_iter().map(|v| v.and_then(&parse)).collect();
        Series::new(name.into(), values)
    } else {
        return Ok(());
    };
    df.with_column(parsed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_bracket_midpoints() {
        assert_eq!(parse_age("25-34"), Some(29.5));
        assert_eq!(parse_age("<18"), Some(9.0));
        assert_eq!(parse_age("65+"), Some(82.5));
        assert_eq!(parse_age("42"), Some(42.0));
        assert_eq!(parse_age("  18-24 "), Some(21.0));
    }

    #[test]
    fn age_garbage_is_missing() {
        assert_eq!(parse_age("unknown"), None);
        assert_eq!(parse_age(""), None);
        assert_eq!(parse_age("dużo"), None);
    }

    #[test]
    fn experience_fixed_shapes() {
        let today = date(2025, 1, 1);
        assert_eq!(parse_experience_at("0-2", today), Some(1.0));
        assert_eq!(parse_experience_at(">=5", today), Some(5.0));
        assert_eq!(parse_experience_at(">= 12", today), Some(12.0));
    }

    #[test]
    fn experience_since_date() {
        // 2024-01-01 to 2025-01-01 is 366 days (leap year): 1.0 years.
        assert_eq!(parse_experience_at("24.sty", date(2025, 1, 1)), Some(1.0));
        // 2005-04-01 to 2025-04-01 is exactly 20 * 365.25 days.
        assert_eq!(parse_experience_at("05.kwi", date(2025, 4, 1)), Some(20.0));
        // Century split: 99 -> 1999.
        assert_eq!(parse_experience_at("99.sty", date(2025, 1, 1)), Some(26.0));
    }

    #[test]
    fn experience_unknown_month_is_missing() {
        let today = date(2025, 1, 1);
        assert_eq!(parse_experience_at("08.xyz", today), None);
        assert_eq!(parse_experience_at("cze", today), None); // no year
        assert_eq!(parse_experience_at("kilka lat", today), None);
    }

    #[test]
    fn preprocess_rewrites_canonical_columns() {
        let mut df = polars::prelude::df!(
            "age" => &["25-34", "<18", "unknown"],
            "gender" => &["Kobieta", "Mężczyzna", "Kobieta"]
        )
        .unwrap();
        preprocess_at(&mut df, date(2025, 1, 1)).unwrap();
        let age = df.column("age").unwrap().f64().unwrap();
        assert_eq!(age.get(0), Some(29.5));
        assert_eq!(age.get(1), Some(9.0));
        assert_eq!(age.get(2), None);
        // gender untouched
        assert_eq!(df.column("gender").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn preprocess_keeps_numeric_age() {
        let mut df = polars::prelude::df!("age" => &[25i64, 40]).unwrap();
        preprocess_at(&mut df, date(2025, 1, 1)).unwrap();
        let age = df.column("age").unwrap().f64().unwrap();
        assert_eq!(age.get(0), Some(25.0));
    }
}
