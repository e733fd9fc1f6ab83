use std::collections::HashMap;

use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::Result;
use crate::stats::IqrBounds;
use crate::table::{
    columns, has_column, null_mask, price_column, price_values, require_column, text_values,
    with_column, Table,
};

/// Flags rows holding a null in any column that exists at the time of the call.
pub fn missing_data(table: &Table) -> Result<Table> {
    let mut flags = vec![false; table.height()];

    for column in table.get_columns() {
        if column.null_count() == 0 {
            continue;
        }
        for (flag, is_null) in flags.iter_mut().zip(null_mask(column)) {
            *flag |= is_null;
        }
    }

    with_column(table, Series::new(columns::MISSING_DATA.into(), flags))
}

/// Flags rows whose `updated_at` precedes `created_at`. A null or absent date never
/// triggers the flag.
pub fn date_violation(table: &Table) -> Result<Table> {
    let len = table.height();
    let mut flags = vec![false; len];

    if has_column(table, columns::CREATED_AT) && has_column(table, columns::UPDATED_AT) {
        let created = require_column(table, columns::CREATED_AT)?.datetime()?;
        let updated = require_column(table, columns::UPDATED_AT)?.datetime()?;

        for (idx, flag) in flags.iter_mut().enumerate() {
            if let (Some(created_at), Some(updated_at)) = (created.get(idx), updated.get(idx)) {
                *flag = updated_at < created_at;
            }
        }
    }

    with_column(table, Series::new(columns::DATE_VIOLATION.into(), flags))
}

/// Flags every member of a group of rows sharing a non-null `id`.
pub fn duplicates(table: &Table) -> Result<Table> {
    let ids = text_values(table, columns::ID)?;

    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for id in ids.iter().flatten() {
        *occurrences.entry(id.as_str()).or_default() += 1;
    }

    let flags: Vec<bool> = ids
        .iter()
        .map(|id| {
            id.as_deref()
                .is_some_and(|id| occurrences.get(id).is_some_and(|count| *count > 1))
        })
        .collect();

    with_column(table, Series::new(columns::DUPLICATES.into(), flags))
}

/// Flags prices at or below zero. A null price is not negative.
pub fn negative_price(table: &Table) -> Result<Table> {
    let flags: Vec<bool> = price_values(table)?
        .into_iter()
        .map(|price| price.is_some_and(|price| price <= 0.0))
        .collect();

    with_column(table, Series::new(columns::NEGATIVE_PRICE.into(), flags))
}

/// Flags prices above `Q3 + 1.5 * IQR`, with quartiles taken over the whole table.
pub fn price_outlier(table: &Table) -> Result<Table> {
    let prices = price_column(table)?;

    let flags: Vec<bool> = match IqrBounds::from_prices(prices)? {
        Some(bounds) => {
            debug!(
                q1 = bounds.q1,
                q3 = bounds.q3,
                upper = bounds.upper,
                "computed price outlier bounds"
            );
            prices
                .into_iter()
                .map(|price| price.is_some_and(|price| price > bounds.upper))
                .collect()
        }
        None => {
            if !prices.is_empty() {
                warn!("no parseable prices; outlier flag left unset");
            }
            vec![false; prices.len()]
        }
    };

    with_column(table, Series::new(columns::PRICE_OUTLIER.into(), flags))
}
