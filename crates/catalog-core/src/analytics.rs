use polars::df;
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::stats::{self, IqrBounds};
use crate::table::{
    columns, filter_rows, non_null_count, null_mask, price_column, price_values, require_column,
    text_values, Table,
};

pub const TOP_N: usize = 10;

/// Headline counts and price statistics over the cleaned and valid sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub total_products_clean: usize,
    pub total_products_valid: usize,
    pub missing_price: usize,
    pub median_price_clean: Option<f64>,
    pub median_price_valid: Option<f64>,
    pub mean_price_clean: Option<f64>,
    pub mean_price_valid: Option<f64>,
}

impl SummaryReport {
    pub fn to_table(&self) -> Result<Table> {
        Ok(df!(
            "total_products_clean" => [self.total_products_clean as u64],
            "total_products_valid" => [self.total_products_valid as u64],
            "missing_price" => [self.missing_price as u64],
            "median_price_clean" => [self.median_price_clean],
            "median_price_valid" => [self.median_price_valid],
            "mean_price_clean" => [self.mean_price_clean],
            "mean_price_valid" => [self.mean_price_valid],
        )?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedProduct {
    pub id: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
}

/// Two independently ranked lists. They are only aligned by position when rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscrepancyReport {
    pub most_expensive: Vec<PricedProduct>,
    pub discrepancies: Vec<PricedProduct>,
}

impl DiscrepancyReport {
    /// Side-by-side rendering; the shorter list is padded with nulls.
    pub fn to_table(&self) -> Result<Table> {
        let height = self.most_expensive.len().max(self.discrepancies.len());
        let ranks: Vec<u32> = (1..=height as u32).collect();

        let pick = |list: &[PricedProduct]| {
            let mut ids = Vec::with_capacity(height);
            let mut names = Vec::with_capacity(height);
            let mut prices = Vec::with_capacity(height);
            for rank in 0..height {
                let entry = list.get(rank);
                ids.push(entry.and_then(|product| product.id.clone()));
                names.push(entry.and_then(|product| product.name.clone()));
                prices.push(entry.and_then(|product| product.price));
            }
            (ids, names, prices)
        };

        let (top_ids, top_names, top_prices) = pick(&self.most_expensive);
        let (gap_ids, gap_names, gap_prices) = pick(&self.discrepancies);

        Ok(DataFrame::new(vec![
            Series::new("rank".into(), ranks).into(),
            Series::new("top_price_id".into(), top_ids).into(),
            Series::new("top_price_name".into(), top_names).into(),
            Series::new("top_price".into(), top_prices).into(),
            Series::new("discrepancy_id".into(), gap_ids).into(),
            Series::new("discrepancy_name".into(), gap_names).into(),
            Series::new("discrepancy_price".into(), gap_prices).into(),
        ])?)
    }
}

pub fn summarize(clean: &Table, valid: &Table) -> Result<SummaryReport> {
    let clean_prices = price_column(clean)?;
    let valid_prices = price_column(valid)?;

    let missing_price = null_mask(require_column(clean, columns::ID)?)
        .into_iter()
        .zip(clean_prices)
        .filter(|(no_id, price)| !no_id && price.is_none())
        .count();

    let report = SummaryReport {
        total_products_clean: non_null_count(clean, columns::ID)?,
        total_products_valid: non_null_count(valid, columns::ID)?,
        missing_price,
        median_price_clean: clean_prices.median().map(stats::round2),
        median_price_valid: valid_prices.median().map(stats::round2),
        mean_price_clean: clean_prices.mean().map(stats::round2),
        mean_price_valid: valid_prices.mean().map(stats::round2),
    };

    info!(
        clean = report.total_products_clean,
        valid = report.total_products_valid,
        missing_price = report.missing_price,
        "summarized catalog"
    );
    Ok(report)
}

pub fn price_analysis(clean: &Table) -> Result<DiscrepancyReport> {
    price_analysis_with_limit(clean, TOP_N)
}

/// Ranks the most expensive products, and separately the price discrepancies:
/// IQR outliers on either side plus identified, named products with no price.
/// Discrepancy rows identical in every column are reported once.
pub fn price_analysis_with_limit(clean: &Table, limit: usize) -> Result<DiscrepancyReport> {
    let prices = price_column(clean)?;

    let priced = clean.filter(&prices.is_not_null())?;
    let most_expensive = ranked_products(priced.lazy(), limit)?;

    let bounds = IqrBounds::from_prices(prices)?;
    let missing_id = null_mask(require_column(clean, columns::ID)?);
    let missing_name = null_mask(require_column(clean, columns::NAME)?);

    let is_discrepancy: Vec<bool> = prices
        .into_iter()
        .zip(missing_id.into_iter().zip(missing_name))
        .map(|(price, (no_id, no_name))| match price {
            Some(price) => bounds.is_some_and(|bounds| bounds.is_extreme(price)),
            None => !no_id && !no_name,
        })
        .collect();

    let candidates = filter_rows(clean, &is_discrepancy)?
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First);
    let discrepancies = ranked_products(candidates, limit)?;

    Ok(DiscrepancyReport {
        most_expensive,
        discrepancies,
    })
}

/// Highest price first, missing prices last, input order kept among ties.
fn ranked_products(frame: LazyFrame, limit: usize) -> Result<Vec<PricedProduct>> {
    let ranked = frame
        .sort(
            [columns::PRICE],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .limit(limit as IdxSize)
        .collect()?;

    let ids = text_values(&ranked, columns::ID)?;
    let names = text_values(&ranked, columns::NAME)?;
    let prices = price_values(&ranked)?;

    Ok(ids
        .into_iter()
        .zip(names)
        .zip(prices)
        .map(|((id, name), price)| PricedProduct { id, name, price })
        .collect())
}
