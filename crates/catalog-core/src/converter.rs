use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::table::{columns, has_column, require_column, Table};

/// ISO orderings first, then month-first dates as written with `/` before the
/// separator is standardized.
pub const DEFAULT_DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y",
];

/// Outcome of coercing one raw text value: either a typed value or null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParseResult<T> {
    Parsed(T),
    Null,
}

impl<T> ParseResult<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            ParseResult::Parsed(value) => Some(value),
            ParseResult::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParseResult::Null)
    }
}

pub fn parse_price(text: &str) -> ParseResult<f64> {
    let text = text.trim();
    if text.is_empty() {
        return ParseResult::Null;
    }
    match text.parse::<f64>() {
        Ok(value) if !value.is_nan() => ParseResult::Parsed(value),
        _ => ParseResult::Null,
    }
}

/// RFC 3339 input is normalised to UTC; everything else is read as a naive timestamp.
pub fn parse_timestamp<S: AsRef<str>>(text: &str, formats: &[S]) -> ParseResult<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return ParseResult::Null;
    }

    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return ParseResult::Parsed(value.naive_utc());
    }

    for format in formats {
        let format = format.as_ref();
        if let Ok(value) = NaiveDateTime::parse_from_str(text, format) {
            return ParseResult::Parsed(value);
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return ParseResult::Parsed(date.and_time(NaiveTime::MIN));
        }
    }

    ParseResult::Null
}

/// Reinterprets `currency` as a categorical label. Empty text becomes null; any
/// other label is accepted as-is.
pub fn currency_to_categorical(table: &Table) -> Result<Table> {
    let column = require_column(table, columns::CURRENCY)?;
    if matches!(column.dtype(), DataType::Categorical(_, _)) {
        return Ok(table.clone());
    }

    let labels: Vec<Option<String>> = column
        .cast(&DataType::String)?
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(str::to_string)
        })
        .collect();

    let categorical = Series::new(columns::CURRENCY.into(), labels)
        .cast(&DataType::Categorical(None, CategoricalOrdering::default()))?;

    let mut output = table.clone();
    output.with_column(categorical)?;
    Ok(output)
}

pub fn parse_datetime(table: &Table) -> Result<Table> {
    parse_datetime_with(table, &DEFAULT_DATE_FORMATS[..])
}

/// Parses `created_at` / `updated_at` into microsecond timestamps; anything that
/// fails every format is coerced to null.
pub fn parse_datetime_with<S: AsRef<str>>(table: &Table, formats: &[S]) -> Result<Table> {
    let mut output = table.clone();

    for name in columns::DATES {
        if !has_column(table, name) {
            continue;
        }
        let column = require_column(table, name)?;
        if column.dtype() != &DataType::String {
            continue;
        }

        let mut coerced = 0usize;
        let micros: Vec<Option<i64>> = column
            .str()?
            .into_iter()
            .map(|value| {
                let parsed = value.map_or(ParseResult::Null, |text| parse_timestamp(text, formats));
                if parsed.is_null() && value.is_some_and(|text| !text.trim().is_empty()) {
                    coerced += 1;
                }
                parsed
                    .into_option()
                    .map(|timestamp| timestamp.and_utc().timestamp_micros())
            })
            .collect();

        debug!(column = name, coerced, "parsed datetime column");

        let series = Series::new(name.into(), micros)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
        output.with_column(series)?;
    }

    Ok(output)
}

/// Parses `price` into `f64`; unparseable text is coerced to null.
pub fn parse_numeric(table: &Table) -> Result<Table> {
    let column = require_column(table, columns::PRICE)?;
    if column.dtype() == &DataType::Float64 {
        return Ok(table.clone());
    }

    let as_text = column.cast(&DataType::String)?;
    let mut coerced = 0usize;
    let prices: Vec<Option<f64>> = as_text
        .str()?
        .into_iter()
        .map(|value| {
            let parsed = value.map_or(ParseResult::Null, parse_price);
            if parsed.is_null() && value.is_some_and(|text| !text.trim().is_empty()) {
                coerced += 1;
            }
            parsed.into_option()
        })
        .collect();

    debug!(column = columns::PRICE, coerced, "parsed numeric column");

    let mut output = table.clone();
    output.with_column(Series::new(columns::PRICE.into(), prices))?;
    Ok(output)
}
