use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::table::{columns, has_column, require_column, Table};

/// Strips surrounding whitespace from every text column. Nulls stay null.
pub fn trim_whitespace(table: &Table) -> Result<Table> {
    let mut output = table.clone();

    for column in table.get_columns() {
        if column.dtype() != &DataType::String {
            continue;
        }
        let trimmed: Vec<Option<&str>> = column
            .str()?
            .into_iter()
            .map(|value| value.map(str::trim))
            .collect();
        output.with_column(Series::new(column.name().clone(), trimmed))?;
    }

    debug!(columns = output.width(), "trimmed text columns");
    Ok(output)
}

/// Title-cases the `name` column only; identifiers and currency codes are left alone.
pub fn normalize_case(table: &Table) -> Result<Table> {
    let names: Vec<Option<String>> = require_column(table, columns::NAME)?
        .str()?
        .into_iter()
        .map(|value| value.map(title_case))
        .collect();

    let mut output = table.clone();
    output.with_column(Series::new(columns::NAME.into(), names))?;
    Ok(output)
}

/// Rewrites `/` as `-` in the raw date text so every date shares one separator.
pub fn standardize_date_separator(table: &Table) -> Result<Table> {
    let mut output = table.clone();

    for name in columns::DATES {
        if !has_column(table, name) {
            continue;
        }
        let column = require_column(table, name)?;
        if column.dtype() != &DataType::String {
            continue;
        }
        let standardized: Vec<Option<String>> = column
            .str()?
            .into_iter()
            .map(|value| value.map(|text| text.replace('/', "-")))
            .collect();
        output.with_column(Series::new(name.into(), standardized))?;
    }

    Ok(output)
}

/// Uppercases the first letter of every word and lowercases the rest.
/// A word starts at any letter that does not follow another letter.
pub fn title_case(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut previous_is_letter = false;

    for ch in text.chars() {
        if previous_is_letter {
            output.extend(ch.to_lowercase());
        } else {
            output.extend(ch.to_uppercase());
        }
        previous_is_letter = ch.is_alphabetic();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::title_case;

    #[test]
    fn title_case_handles_words_and_digits() {
        assert_eq!(title_case("wireless MOUSE"), "Wireless Mouse");
        assert_eq!(title_case("usb-c hub"), "Usb-C Hub");
        assert_eq!(title_case("3rd edition"), "3Rd Edition");
        assert_eq!(title_case(""), "");
    }
}
