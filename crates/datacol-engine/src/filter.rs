//! Value filters: rendering cells as text and parsing text into cells.
//!
//! Every column carries an [`InputFilter`] (text -> value) and an
//! [`OutputFilter`] (value -> text) chosen by its mode. Mode conversion and
//! text-mode entry go through these; parse failures surface as `None` and
//! the caller marks the cell invalid.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::data::CellValue;
use crate::mode::ColumnMode;

pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const MONTH_FORMAT: &str = "%B";
pub const DAY_FORMAT: &str = "%A";
pub const DEFAULT_DIGITS: usize = 6;

/// Julian day number of 1970-01-01.
const UNIX_EPOCH_JULIAN_DAY: i64 = 2_440_588;
const SECONDS_PER_DAY: f64 = 86_400.0;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];
const DAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// How numbers are rendered as text.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericFormat {
    /// Fixed number of decimals.
    Decimal,
    /// Mantissa/exponent notation.
    Scientific,
    /// Shortest of the two at the given significant digits.
    #[default]
    Automatic,
}

/// Renders cell values as text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OutputFilter {
    Text,
    Numeric { format: NumericFormat, digits: usize },
    DateTime { format: String },
}

/// Parses text into cell values.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFilter {
    Text,
    Numeric,
    DateTime,
    Month,
    DayOfWeek,
}

impl OutputFilter {
    /// Default output filter for a mode.
    pub fn for_mode(mode: ColumnMode) -> OutputFilter {
        match mode {
            ColumnMode::Numeric => OutputFilter::Numeric {
                format: NumericFormat::Automatic,
                digits: DEFAULT_DIGITS,
            },
            ColumnMode::Text => OutputFilter::Text,
            ColumnMode::DateTime => OutputFilter::DateTime {
                format: DEFAULT_DATETIME_FORMAT.to_string(),
            },
            ColumnMode::Month => OutputFilter::DateTime {
                format: MONTH_FORMAT.to_string(),
            },
            ColumnMode::Day => OutputFilter::DateTime {
                format: DAY_FORMAT.to_string(),
            },
        }
    }

    pub fn format_number(&self, value: f64) -> String {
        match self {
            OutputFilter::Numeric { format, digits } => format_double(value, *format, *digits),
            _ => format_double(value, NumericFormat::Automatic, DEFAULT_DIGITS),
        }
    }

    pub fn format_date_time(&self, value: Option<NaiveDateTime>) -> String {
        let Some(dt) = value else {
            return String::new();
        };
        let format = match self {
            OutputFilter::DateTime { format } => format.as_str(),
            _ => DEFAULT_DATETIME_FORMAT,
        };
        let mut out = String::new();
        if write!(out, "{}", dt.format(format)).is_err() {
            out.clear();
            let _ = write!(out, "{}", dt.format(DEFAULT_DATETIME_FORMAT));
        }
        out
    }

    pub fn render(&self, value: &CellValue) -> String {
        match value {
            CellValue::Number(x) => self.format_number(*x),
            CellValue::Text(s) => s.clone(),
            CellValue::DateTime(dt) => self.format_date_time(*dt),
        }
    }
}

impl InputFilter {
    /// Default input filter for a mode.
    pub fn for_mode(mode: ColumnMode) -> InputFilter {
        match mode {
            ColumnMode::Numeric => InputFilter::Numeric,
            ColumnMode::Text => InputFilter::Text,
            ColumnMode::DateTime => InputFilter::DateTime,
            ColumnMode::Month => InputFilter::Month,
            ColumnMode::Day => InputFilter::DayOfWeek,
        }
    }

    /// Parse `text`; `None` when it does not fit this filter.
    pub fn parse(&self, text: &str) -> Option<CellValue> {
        match self {
            InputFilter::Text => Some(CellValue::Text(text.to_string())),
            InputFilter::Numeric => parse_number(text).map(CellValue::Number),
            InputFilter::DateTime => parse_date_time(text).map(|dt| CellValue::DateTime(Some(dt))),
            InputFilter::Month => parse_month(text).map(|dt| CellValue::DateTime(Some(dt))),
            InputFilter::DayOfWeek => parse_day(text).map(|dt| CellValue::DateTime(Some(dt))),
        }
    }
}

/// Format a number according to `format` and `digits`.
pub fn format_double(value: f64, format: NumericFormat, digits: usize) -> String {
    if value.is_nan() {
        return "#NAN!".to_string();
    }
    if value.is_infinite() {
        return "#INF!".to_string();
    }
    match format {
        NumericFormat::Decimal => format!("{:.*}", digits, value),
        NumericFormat::Scientific => format!("{:.*e}", digits, value),
        NumericFormat::Automatic => format_automatic(value, digits.max(1)),
    }
}

fn format_automatic(value: f64, precision: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let exponent = value.abs().log10().floor() as i64;
    if exponent < -4 || exponent >= precision as i64 {
        let formatted = format!("{:.*e}", precision - 1, value);
        match formatted.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{}", trim_fraction(mantissa), exp),
            None => formatted,
        }
    } else {
        let decimals = (precision as i64 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

pub fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    for format in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, format) {
            return reference_date(1).map(|date| date.and_time(time));
        }
    }
    None
}

pub fn parse_month(text: &str) -> Option<NaiveDateTime> {
    let lower = text.trim().to_lowercase();
    if let Some(month) = parse_name(&lower, &MONTH_NAMES) {
        return month_to_date_time(month as f64);
    }
    lower.parse::<f64>().ok().and_then(month_to_date_time)
}

pub fn parse_day(text: &str) -> Option<NaiveDateTime> {
    let lower = text.trim().to_lowercase();
    if let Some(day) = parse_name(&lower, &DAY_NAMES) {
        return weekday_to_date_time(day as f64);
    }
    lower.parse::<f64>().ok().and_then(weekday_to_date_time)
}

/// 1-based index of a full or three-letter abbreviated name.
fn parse_name(lower: &str, names: &[&str]) -> Option<usize> {
    if lower.len() < 3 {
        return None;
    }
    names
        .iter()
        .position(|name| *name == lower || (lower.len() == 3 && name.starts_with(lower)))
        .map(|idx| idx + 1)
}

/// January 1900 starts on a Monday, so weekday `n` (Monday = 1) is day `n`.
fn reference_date(day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1900, 1, day)
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Julian day number (with fractional day) to a date-time.
pub fn julian_day_to_date_time(value: f64) -> Option<NaiveDateTime> {
    if !value.is_finite() || value.abs() > 1e9 {
        return None;
    }
    let days = value.floor();
    let millis = ((value - days) * SECONDS_PER_DAY * 1000.0).round() as i64;
    let date = epoch().checked_add_signed(TimeDelta::try_days(days as i64 - UNIX_EPOCH_JULIAN_DAY)?)?;
    date.and_time(NaiveTime::MIN)
        .checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

/// Date-time to Julian day number (with fractional day).
pub fn date_time_to_julian_day(value: NaiveDateTime) -> f64 {
    let days = (value.date() - epoch()).num_days() + UNIX_EPOCH_JULIAN_DAY;
    let seconds = value.num_seconds_from_midnight() as f64
        + f64::from(value.nanosecond()) / 1_000_000_000.0;
    days as f64 + seconds / SECONDS_PER_DAY
}

pub fn month_to_date_time(value: f64) -> Option<NaiveDateTime> {
    let month = value.round();
    if !(1.0..=12.0).contains(&month) {
        return None;
    }
    NaiveDate::from_ymd_opt(1900, month as u32, 1).map(|d| d.and_time(NaiveTime::MIN))
}

pub fn weekday_to_date_time(value: f64) -> Option<NaiveDateTime> {
    let day = value.round();
    if !(1.0..=7.0).contains(&day) {
        return None;
    }
    reference_date(day as u32).map(|d| d.and_time(NaiveTime::MIN))
}

pub fn month_number(value: NaiveDateTime) -> f64 {
    f64::from(value.month())
}

pub fn weekday_number(value: NaiveDateTime) -> f64 {
    f64::from(value.weekday().number_from_monday())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_automatic_format_trims_zeros() {
        assert_eq!(format_double(3.14, NumericFormat::Automatic, 6), "3.14");
        assert_eq!(format_double(2.0, NumericFormat::Automatic, 6), "2");
        assert_eq!(format_double(1.5e-7, NumericFormat::Automatic, 6), "1.5e-7");
        assert_eq!(format_double(1234567.0, NumericFormat::Automatic, 6), "1.23457e6");
    }

    #[test]
    fn test_decimal_and_scientific() {
        assert_eq!(format_double(2.5, NumericFormat::Decimal, 2), "2.50");
        assert_eq!(format_double(250.0, NumericFormat::Scientific, 1), "2.5e2");
        assert_eq!(format_double(f64::NAN, NumericFormat::Decimal, 2), "#NAN!");
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert_eq!(parse_number(" 3.14 "), Some(3.14));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_parse_date_time_variants() {
        let full = parse_date_time("2024-03-05 10:20:30").unwrap();
        assert_eq!(full.to_string(), "2024-03-05 10:20:30");
        let date_only = parse_date_time("2024-03-05").unwrap();
        assert_eq!(date_only.hour(), 0);
        let time_only = parse_date_time("12:30").unwrap();
        assert_eq!(time_only.date(), NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());
        assert!(parse_date_time("not a date").is_none());
    }

    #[test]
    fn test_month_and_day_names() {
        assert_eq!(parse_month("March").map(|d| d.month()), Some(3));
        assert_eq!(parse_month("dec").map(|d| d.month()), Some(12));
        assert!(parse_month("13").is_none());
        let wed = parse_day("Wednesday").unwrap();
        assert_eq!(weekday_number(wed), 3.0);
        assert_eq!(OutputFilter::for_mode(ColumnMode::Day).format_date_time(Some(wed)), "Wednesday");
    }

    #[test]
    fn test_julian_day_round_trip() {
        let dt = julian_day_to_date_time(2_440_588.5).unwrap();
        assert_eq!(dt.to_string(), "1970-01-01 12:00:00");
        assert_eq!(date_time_to_julian_day(dt), 2_440_588.5);
        assert!(julian_day_to_date_time(f64::INFINITY).is_none());
    }

    #[test]
    fn test_invalid_strftime_falls_back() {
        let filter = OutputFilter::DateTime {
            format: "%Q".to_string(),
        };
        let dt = parse_date_time("2024-01-02").unwrap();
        assert_eq!(filter.format_date_time(Some(dt)), "2024-01-02 00:00:00");
    }
}
