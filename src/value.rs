//! Spreadsheet cell values.
//!
//! Workbooks are loosely typed: a code column can hold numbers in one row and text in the next,
//! and indicator columns are sometimes `1`/`0`, sometimes booleans. `Value` keeps what the reader
//! gave us and offers the few interpretations the dashboard needs (text for searching, numbers
//! for indicator sums, years for the admission filter).
use crate::ArcStr;
use calamine::DataType;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, cmp::Ordering, fmt};

/// Formats tried, in order, when a date arrives as text.
///
/// Day-first because the source workbooks are written that way.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Serial number of 9999-12-31, the last date Excel can store.
const MAX_EXCEL_SERIAL: f64 = 2_958_465.;

/// Largest float we print as an integer.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Bool(bool),
    Number(f64),
    Text(ArcStr),
    Date(NaiveDate),
}

impl Default for Value {
    fn default() -> Self {
        Value::Empty
    }
}

impl Value {
    /// Convert a cell as read by calamine.
    ///
    /// Blank text is mapped to `Empty`, and error cells (`#N/A` etc.) are treated as missing.
    pub fn from_cell(cell: &DataType) -> Self {
        match cell {
            DataType::Int(v) => Value::Number(*v as f64),
            DataType::Float(v) => Value::Number(*v),
            DataType::Bool(v) => Value::Bool(*v),
            DataType::String(s) => Value::text(s),
            DataType::DateTime(serial) => match excel_serial_date(*serial) {
                Some(date) => Value::Date(date),
                None => Value::Number(*serial),
            },
            _ => Value::Empty,
        }
    }

    /// Text value, or `Empty` if the text is blank.
    pub fn text(s: &str) -> Self {
        if s.trim().is_empty() {
            Value::Empty
        } else {
            Value::Text(s.into())
        }
    }

    /// `true` for empty cells, blank text and NaN.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Number(v) => v.is_nan(),
            Value::Text(s) => s.trim().is_empty(),
            Value::Bool(_) | Value::Date(_) => false,
        }
    }

    /// The text representation used for searching, grouping and export.
    ///
    /// Integral numbers print without a decimal part, so a code stored as `101.0` reads `101`.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Empty => None,
            Value::Text(s) if s.trim().is_empty() => None,
            Value::Text(s) => Some(Cow::Borrowed(&**s)),
            Value::Number(v) if v.is_nan() => None,
            Value::Number(v) => Some(Cow::Owned(format_number(*v))),
            Value::Bool(v) => Some(Cow::Borrowed(if *v { "true" } else { "false" })),
            Value::Date(d) => Some(Cow::Owned(d.format("%Y-%m-%d").to_string())),
        }
    }

    /// Numeric interpretation: numbers as-is, booleans as 1/0, text if it parses.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) if !v.is_nan() => Some(*v),
            Value::Bool(v) => Some(if *v { 1. } else { 0. }),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
            _ => None,
        }
    }

    /// Case-insensitive substring test.
    ///
    /// `needle` must already be lowercase. Missing values never match.
    pub fn contains_lower(&self, needle: &str) -> bool {
        match self.as_text() {
            Some(text) => text.to_lowercase().contains(needle),
            None => false,
        }
    }

    /// Year of a date cell, or of text that parses as a date.
    pub fn year(&self) -> Option<i32> {
        match self {
            Value::Date(d) => Some(d.year()),
            Value::Text(s) => parse_date(s.trim()).map(|d| d.year()),
            _ => None,
        }
    }

    /// Ordering between two present values.
    ///
    /// Numbers (and booleans) sort before dates, which sort before text. Callers are expected to
    /// deal with missing values themselves.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.rank(), other.rank()) {
            (a, b) if a != b => a.cmp(&b),
            _ => match (self, other) {
                (Value::Date(a), Value::Date(b)) => a.cmp(b),
                (Value::Text(a), Value::Text(b)) => a.cmp(b),
                _ => match (self.as_number(), other.as_number()) {
                    (Some(a), Some(b)) => a.total_cmp(&b),
                    _ => Ordering::Equal,
                },
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Number(_) | Value::Bool(_) => 0,
            Value::Date(_) => 1,
            Value::Text(_) => 2,
            Value::Empty => 3,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => Ok(()),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Empty)
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0. && v.abs() < MAX_EXACT_INT {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

/// Excel stores dates as days since 1899-12-30 (ignoring the time part here).
///
/// Serials outside the range Excel can store give `None`.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}
