use std::fs;

use polars::prelude::*;
use tempfile::TempDir;

use catalog_core::config::PipelineConfig;
use catalog_core::io::{CsvDirectorySink, CsvTableSource, MemorySource, TableSink, TableSource};
use catalog_core::pipeline;
use catalog_core::table::{columns, empty_products_table, text_values};
use catalog_core::PipelineError;

const HEADER: &str = "id,name,price,currency,created_at,updated_at";

fn write_csv(dir: &TempDir, body: &str) -> anyhow::Result<std::path::PathBuf> {
    let path = dir.path().join("products_raw.csv");
    fs::write(&path, body)?;
    Ok(path)
}

#[test]
fn csv_source_reads_every_column_as_nullable_text() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_csv(
        &dir,
        &format!("{HEADER}\n1,Mouse,25.5,USD,2024-01-01,2024-01-02\nNA,Lamp,N/A,,2024-01-01,null\n"),
    )?;

    let table = CsvTableSource::new(&path).load()?;

    assert_eq!(table.height(), 2);
    for column in table.get_columns() {
        assert_eq!(column.dtype(), &DataType::String, "{}", column.name());
    }
    assert_eq!(
        text_values(&table, columns::ID)?,
        vec![Some("1".to_string()), None]
    );
    assert_eq!(
        text_values(&table, columns::PRICE)?,
        vec![Some("25.5".to_string()), None]
    );
    assert_eq!(table.column(columns::CURRENCY)?.null_count(), 1);
    assert_eq!(table.column(columns::UPDATED_AT)?.null_count(), 1);
    Ok(())
}

#[test]
fn custom_null_tokens_replace_the_defaults() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_csv(
        &dir,
        &format!("{HEADER}\n1,NA,-,USD,2024-01-01,2024-01-02\n"),
    )?;

    let table = CsvTableSource::new(&path)
        .with_null_tokens(vec!["-".to_string()])
        .load()?;

    assert_eq!(
        text_values(&table, columns::NAME)?,
        vec![Some("NA".to_string())]
    );
    assert_eq!(text_values(&table, columns::PRICE)?, vec![None]);
    Ok(())
}

#[test]
fn csv_source_pads_short_rows_with_nulls() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_csv(&dir, &format!("{HEADER}\n1,Mouse,25.5\n"))?;

    let table = CsvTableSource::new(&path).load()?;

    assert_eq!(table.height(), 1);
    assert_eq!(table.column(columns::CURRENCY)?.null_count(), 1);
    assert_eq!(table.column(columns::UPDATED_AT)?.null_count(), 1);
    Ok(())
}

#[test]
fn csv_source_reports_missing_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("absent.csv");

    match CsvTableSource::new(&path).load() {
        Err(PipelineError::NotFound { path: missing }) => assert_eq!(missing, path),
        other => panic!("expected not found, got {other:?}"),
    }
    Ok(())
}

#[test]
fn csv_source_requires_product_columns() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_csv(
        &dir,
        "id,name,price,created_at,updated_at\n1,Mouse,25.5,2024-01-01,2024-01-02\n",
    )?;

    match CsvTableSource::new(&path).load() {
        Err(PipelineError::MissingColumn { column }) => assert_eq!(column, "currency"),
        other => panic!("expected missing column, got {other:?}"),
    }
    Ok(())
}

#[test]
fn directory_sink_writes_header_for_empty_tables() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let sink = CsvDirectorySink::new(dir.path().join("processed"));

    sink.save(&empty_products_table()?, "valid_products")?;

    let written = fs::read_to_string(sink.path_for("valid_products"))?;
    assert_eq!(written.trim_end(), HEADER);

    let leftovers: Vec<_> = fs::read_dir(dir.path().join("processed"))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    Ok(())
}

#[test]
fn directory_sink_cleans_up_after_a_failed_write() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let sink = CsvDirectorySink::new(dir.path());

    // Nested values cannot be written as CSV.
    let tags = Series::new(
        "tags".into(),
        &[Series::new("".into(), &[1i32, 2]), Series::new("".into(), &[3i32])],
    );
    let table = DataFrame::new(vec![tags.into()])?;

    assert!(sink.save(&table, "tagged").is_err());

    let remaining: Vec<String> = fs::read_dir(dir.path())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(remaining.is_empty(), "left behind: {remaining:?}");
    Ok(())
}

#[test]
fn memory_source_feeds_the_pipeline() -> anyhow::Result<()> {
    let source = MemorySource::new(empty_products_table()?);
    let outputs = pipeline::run(&source.load()?, &PipelineConfig::default())?;
    assert_eq!(outputs.counts().ingested, 0);
    Ok(())
}

#[test]
fn csv_run_writes_six_files() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_csv(
        &dir,
        &format!(
            "{HEADER}\n\
             1,wireless mouse,25.5,USD,2024/01/05,2024/02/01\n\
             2,desk lamp,40,EUR,2024-03-01,2024-03-02\n\
             ,mystery box,abc,USD,2024-01-01,2024-01-01\n"
        ),
    )?;
    let output_dir = dir.path().join("processed");

    let raw = CsvTableSource::new(&path).load()?;
    let outputs = pipeline::run(&raw, &PipelineConfig::default())?;
    let sink = CsvDirectorySink::new(&output_dir);
    pipeline::persist(&outputs, &sink)?;

    let mut written: Vec<String> = fs::read_dir(&output_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    written.sort();
    assert_eq!(
        written,
        vec![
            "analytics_summary.csv",
            "cleaned_products.csv",
            "price_analysis.csv",
            "rejected_products.csv",
            "review_products.csv",
            "valid_products.csv",
        ]
    );

    let valid = fs::read_to_string(output_dir.join("valid_products.csv"))?;
    assert_eq!(valid.lines().count(), 3);
    assert!(valid.contains("Wireless Mouse"));
    Ok(())
}
