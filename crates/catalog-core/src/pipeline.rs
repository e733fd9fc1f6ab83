use serde::Serialize;
use tracing::info;

use crate::analytics::{self, DiscrepancyReport, SummaryReport};
use crate::classifier;
use crate::cleaner;
use crate::config::PipelineConfig;
use crate::converter;
use crate::error::Result;
use crate::flagger;
use crate::io::TableSink;
use crate::table::{require_product_schema, Table};

pub const CLEANED_PRODUCTS: &str = "cleaned_products";
pub const REVIEW_PRODUCTS: &str = "review_products";
pub const REJECTED_PRODUCTS: &str = "rejected_products";
pub const VALID_PRODUCTS: &str = "valid_products";
pub const ANALYTICS_SUMMARY: &str = "analytics_summary";
pub const PRICE_ANALYSIS: &str = "price_analysis";

#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub clean: Table,
    pub review: Table,
    pub rejected: Table,
    pub valid: Table,
    pub summary: SummaryReport,
    pub price_analysis: DiscrepancyReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub ingested: usize,
    pub review: usize,
    pub rejected: usize,
    pub valid: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub counts: RunCounts,
    pub summary: SummaryReport,
    pub price_analysis: DiscrepancyReport,
}

impl PipelineOutputs {
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            ingested: self.clean.height(),
            review: self.review.height(),
            rejected: self.rejected.height(),
            valid: self.valid.height(),
        }
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            counts: self.counts(),
            summary: self.summary.clone(),
            price_analysis: self.price_analysis.clone(),
        }
    }
}

/// Whitespace, `name` casing, then date separators.
pub fn clean(raw: &Table) -> Result<Table> {
    let table = cleaner::trim_whitespace(raw)?;
    let table = cleaner::normalize_case(&table)?;
    cleaner::standardize_date_separator(&table)
}

pub fn convert(table: &Table, config: &PipelineConfig) -> Result<Table> {
    let table = converter::currency_to_categorical(table)?;
    let table = converter::parse_datetime_with(&table, &config.date_formats[..])?;
    converter::parse_numeric(&table)
}

/// `missing_data` runs first so it only sees the source columns.
pub fn flag(table: &Table) -> Result<Table> {
    let table = flagger::missing_data(table)?;
    let table = flagger::date_violation(&table)?;
    let table = flagger::duplicates(&table)?;
    let table = flagger::negative_price(&table)?;
    flagger::price_outlier(&table)
}

pub fn run(raw: &Table, config: &PipelineConfig) -> Result<PipelineOutputs> {
    config.validate()?;
    require_product_schema(raw)?;
    info!(rows = raw.height(), "starting pipeline");

    let cleaned = clean(raw)?;
    info!("cleaning complete");

    let converted = convert(&cleaned, config)?;
    info!("conversion complete");

    let clean = flag(&converted)?;
    let review = classifier::categorize_for_review(&clean)?;
    info!(review = review.height(), "flagging complete");

    let (rejected, valid) = classifier::reject_products(&clean)?;

    let summary = analytics::summarize(&clean, &valid)?;
    let price_analysis = analytics::price_analysis_with_limit(&clean, config.top_n)?;

    Ok(PipelineOutputs {
        clean,
        review,
        rejected,
        valid,
        summary,
        price_analysis,
    })
}

/// Renders every output before the first write, so a rendering failure leaves
/// the sink untouched.
pub fn persist(outputs: &PipelineOutputs, sink: &dyn TableSink) -> Result<()> {
    let summary = outputs.summary.to_table()?;
    let price_analysis = outputs.price_analysis.to_table()?;

    let tables: [(&Table, &str); 6] = [
        (&outputs.clean, CLEANED_PRODUCTS),
        (&outputs.review, REVIEW_PRODUCTS),
        (&outputs.rejected, REJECTED_PRODUCTS),
        (&outputs.valid, VALID_PRODUCTS),
        (&summary, ANALYTICS_SUMMARY),
        (&price_analysis, PRICE_ANALYSIS),
    ];

    for (table, destination) in tables {
        sink.save(table, destination)?;
    }

    info!(outputs = tables.len(), "persisted pipeline outputs");
    Ok(())
}
