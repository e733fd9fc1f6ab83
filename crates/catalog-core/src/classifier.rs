use polars::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::table::{
    columns, filter_rows, flag_values, null_mask, price_values, require_column, with_column, Table,
};

pub const REASON_SEPARATOR: &str = "; ";

/// Prices above this are rejected as implausible.
pub const EXTREME_PRICE: f64 = 50_000.0;

/// Review labels in the order they appear in `review_reason`.
const REVIEW_LABELS: [(&str, &str); 5] = [
    (columns::MISSING_DATA, "Missing data"),
    (columns::NEGATIVE_PRICE, "Negative price"),
    (columns::PRICE_OUTLIER, "Price outlier"),
    (columns::DUPLICATES, "Duplicate ID"),
    (columns::DATE_VIOLATION, "Invalid date"),
];

const MISSING_ID: &str = "Missing ID";
const MISSING_CURRENCY: &str = "Missing currency";
const INVALID_PRICE: &str = "Invalid price (≤0)";
const EXTREME_PRICE_LABEL: &str = "Extreme price (>50k)";

/// Joins triggered labels once, each followed by the separator. No labels gives "".
pub fn reason_text(labels: &[&str]) -> String {
    labels
        .iter()
        .map(|label| format!("{label}{REASON_SEPARATOR}"))
        .collect()
}

/// Returns only the rows with at least one quality flag set, annotated with
/// `review_reason`.
pub fn categorize_for_review(table: &Table) -> Result<Table> {
    let len = table.height();
    let mut labels: Vec<Vec<&str>> = vec![Vec::new(); len];

    for (flag_column, label) in REVIEW_LABELS {
        let flags = flag_values(table, flag_column)?;
        for (row_labels, flagged) in labels.iter_mut().zip(flags) {
            if flagged {
                row_labels.push(label);
            }
        }
    }

    let reasons: Vec<String> = labels.iter().map(|row| reason_text(row)).collect();
    let needs_review: Vec<bool> = reasons.iter().map(|reason| !reason.is_empty()).collect();

    let annotated = with_column(table, Series::new(columns::REVIEW_REASON.into(), reasons))?;
    let review = filter_rows(&annotated, &needs_review)?;

    info!(rows = len, review = review.height(), "categorized rows for review");
    Ok(review)
}

/// Splits the table into `(rejected, valid)`. A row is rejected when its id or
/// currency is null, or its price is missing, not positive, or above the
/// extreme threshold. Rejected rows carry `rejection_reason`.
pub fn reject_products(table: &Table) -> Result<(Table, Table)> {
    let missing_id = null_mask(require_column(table, columns::ID)?);
    let missing_currency = null_mask(require_column(table, columns::CURRENCY)?);
    let prices = price_values(table)?;

    let mut reasons: Vec<String> = Vec::with_capacity(table.height());
    let mut rejected_mask: Vec<bool> = Vec::with_capacity(table.height());

    for ((no_id, no_currency), price) in missing_id.into_iter().zip(missing_currency).zip(prices) {
        let mut labels = Vec::new();
        if no_id {
            labels.push(MISSING_ID);
        }
        if no_currency {
            labels.push(MISSING_CURRENCY);
        }
        match price {
            None => labels.push(INVALID_PRICE),
            Some(value) if value <= 0.0 => labels.push(INVALID_PRICE),
            Some(value) if value > EXTREME_PRICE => labels.push(EXTREME_PRICE_LABEL),
            Some(_) => {}
        }

        rejected_mask.push(!labels.is_empty());
        reasons.push(reason_text(&labels));
    }

    let valid_mask: Vec<bool> = rejected_mask.iter().map(|rejected| !rejected).collect();
    let rejected_reasons: Vec<String> = reasons
        .into_iter()
        .zip(&rejected_mask)
        .filter_map(|(reason, rejected)| rejected.then_some(reason))
        .collect();

    let rejected = with_column(
        &filter_rows(table, &rejected_mask)?,
        Series::new(columns::REJECTION_REASON.into(), rejected_reasons),
    )?;
    let valid = filter_rows(table, &valid_mask)?;

    info!(
        rejected = rejected.height(),
        valid = valid.height(),
        "partitioned rows"
    );
    Ok((rejected, valid))
}

#[cfg(test)]
mod tests {
    use super::reason_text;

    #[test]
    fn reason_text_keeps_label_order() {
        assert_eq!(
            reason_text(&["Missing data", "Negative price"]),
            "Missing data; Negative price; "
        );
        assert_eq!(reason_text(&[]), "");
    }
}
