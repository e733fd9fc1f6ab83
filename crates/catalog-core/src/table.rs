use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// The working data structure every stage consumes and produces.
pub type Table = DataFrame;

pub mod columns {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const PRICE: &str = "price";
    pub const CURRENCY: &str = "currency";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";

    pub const MISSING_DATA: &str = "missing_data";
    pub const DATE_VIOLATION: &str = "date_violation";
    pub const DUPLICATES: &str = "duplicates";
    pub const NEGATIVE_PRICE: &str = "negative_price";
    pub const PRICE_OUTLIER: &str = "price_outlier";

    pub const REVIEW_REASON: &str = "review_reason";
    pub const REJECTION_REASON: &str = "rejection_reason";

    pub const RAW: [&str; 6] = [ID, NAME, PRICE, CURRENCY, CREATED_AT, UPDATED_AT];
    pub const DATES: [&str; 2] = [CREATED_AT, UPDATED_AT];
}

pub fn has_column(table: &Table, name: &str) -> bool {
    table.get_column_index(name).is_some()
}

pub fn require_column<'a>(table: &'a Table, name: &str) -> Result<&'a Column> {
    table
        .column(name)
        .map_err(|_| PipelineError::MissingColumn {
            column: name.to_string(),
        })
}

/// Fails with `MissingColumn` for the first raw product column the table lacks.
pub fn require_product_schema(table: &Table) -> Result<()> {
    for name in columns::RAW {
        require_column(table, name)?;
    }
    Ok(())
}

/// Returns a copy of `table` with `series` added, or replacing the column of the same name.
pub fn with_column(table: &Table, series: Series) -> Result<Table> {
    let mut output = table.clone();
    output.with_column(series)?;
    Ok(output)
}

/// Keeps the rows whose mask entry is `true`, preserving their order.
pub fn filter_rows(table: &Table, mask: &[bool]) -> Result<Table> {
    let mask = BooleanChunked::from_slice("mask".into(), mask);
    Ok(table.filter(&mask)?)
}

/// Zero-row table carrying the raw product schema (every column nullable text).
pub fn empty_products_table() -> Result<Table> {
    let columns = columns::RAW
        .iter()
        .map(|name| Series::new_empty((*name).into(), &DataType::String).into())
        .collect::<Vec<Column>>();
    Ok(DataFrame::new(columns)?)
}

pub fn null_mask(column: &Column) -> Vec<bool> {
    column
        .as_materialized_series()
        .is_null()
        .into_iter()
        .map(|value| value.unwrap_or(false))
        .collect()
}

/// Column values rendered as text; identifiers are opaque so any dtype is accepted.
pub fn text_values(table: &Table, name: &str) -> Result<Vec<Option<String>>> {
    let column = require_column(table, name)?;
    let as_text = column.cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// The converted `price` column; fails unless it is already `Float64`.
pub fn price_column(table: &Table) -> Result<&Float64Chunked> {
    Ok(require_column(table, columns::PRICE)?.f64()?)
}

pub fn price_values(table: &Table) -> Result<Vec<Option<f64>>> {
    Ok(price_column(table)?.into_iter().collect())
}

pub fn flag_values(table: &Table, name: &str) -> Result<Vec<bool>> {
    let flags = require_column(table, name)?.bool()?;
    Ok(flags
        .into_iter()
        .map(|value| value.unwrap_or(false))
        .collect())
}

pub fn non_null_count(table: &Table, name: &str) -> Result<usize> {
    let column = require_column(table, name)?;
    Ok(column.len() - column.null_count())
}
