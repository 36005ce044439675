//! CSV persistence layer.
//!
//! RULE: Only store.rs reads and writes table files.
//! Stages take a `Table` and return a `Table`; they never touch the disk.
//!
//! Column types are inferred on read: a column whose non-empty cells all
//! parse as integers is Int, else as floats is Float, else Text. Empty cells
//! and the usual NA markers (`NaN`, `NA`, `N/A`, `null`, ...) are missing
//! values. Timestamps stay Text until a stage parses them.

use crate::{
    error::FeatureResult,
    table::{Column, Table},
};
use csv::{Reader, Writer};
use std::{
    io::{Read, Write},
    path::Path,
};

/// Cell texts read as missing values.
pub const MISSING_TOKENS: &[&str] = &["", "NaN", "nan", "NA", "N/A", "n/a", "null", "NULL", "None"];

/// Load a headed CSV file into a table.
pub fn read_csv(path: impl AsRef<Path>) -> FeatureResult<Table> {
    let path = path.as_ref();
    let table = read_table(Reader::from_path(path)?)?;
    log::info!(
        "Loaded {} rows x {} columns from {}",
        table.height(),
        table.width(),
        path.display()
    );
    Ok(table)
}

/// Parse headed CSV from any reader.
pub fn read_csv_from<R: Read>(source: R) -> FeatureResult<Table> {
    read_table(Reader::from_reader(source))
}

fn read_table<R: Read>(mut reader: Reader<R>) -> FeatureResult<Table> {
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (i, column) in cells.iter_mut().enumerate() {
            let raw = record.get(i).unwrap_or("").trim();
            column.push((!MISSING_TOKENS.contains(&raw)).then(|| raw.to_string()));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| (name, infer_column(raw)))
        .collect();
    Table::from_columns(columns)
}

fn infer_column(raw: Vec<Option<String>>) -> Column {
    let present = || raw.iter().flatten();
    if present().all(|s| s.parse::<i64>().is_ok()) {
        return Column::Int(raw.iter().map(|s| s.as_deref().and_then(|s| s.parse().ok())).collect());
    }
    if present().all(|s| s.parse::<f64>().is_ok()) {
        return Column::Float(raw.iter().map(|s| s.as_deref().and_then(|s| s.parse().ok())).collect());
    }
    Column::Text(raw)
}

/// Write a table as headed CSV; missing cells are written empty.
pub fn write_csv(table: &Table, path: impl AsRef<Path>) -> FeatureResult<()> {
    let path = path.as_ref();
    write_table(table, Writer::from_path(path)?)?;
    log::info!("Wrote {} rows to {}", table.height(), path.display());
    Ok(())
}

/// Write headed CSV to any writer.
pub fn write_csv_to<W: Write>(table: &Table, sink: W) -> FeatureResult<()> {
    write_table(table, Writer::from_writer(sink))
}

fn write_table<W: Write>(table: &Table, mut writer: Writer<W>) -> FeatureResult<()> {
    writer.write_record(table.column_names())?;
    let columns: Vec<&Column> = table.columns().map(|(_, c)| c).collect();
    for row in 0..table.height() {
        writer.write_record(columns.iter().map(|c| c.render(row)))?;
    }
    writer.flush()?;
    Ok(())
}
