//! Serializes a column projection of a table to delimited text.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use polars::prelude::*;
use tracing::info;

use crate::schema::{
    EPISODES, FAVORITES, GENRES, MEMBERS, SCORE, SOURCE, START_YEAR, STATUS, SYNOPSIS, TITLE,
    TITLE_ENGLISH, TYPE,
};
use crate::table::RecordTable;
use crate::CompressionFormat;

/// Columns shown in the result table and written on export, in order.
pub const DISPLAY_COLUMNS: &[&str] = &[
    TITLE,
    TITLE_ENGLISH,
    TYPE,
    SOURCE,
    EPISODES,
    STATUS,
    START_YEAR,
    SCORE,
    MEMBERS,
    FAVORITES,
    GENRES,
    SYNOPSIS,
];

/// Project `table` onto the columns of `columns` that it has, keeping their order.
pub fn project(table: &RecordTable, columns: &[&str]) -> Result<DataFrame> {
    let present: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|c| table.has_column(c))
        .collect();
    Ok(table.frame().select(present)?)
}

pub fn display_projection(table: &RecordTable) -> Result<DataFrame> {
    project(table, DISPLAY_COLUMNS)
}

/// The bounded window shown interactively. Export always covers the full table.
pub fn display_window(table: &RecordTable, rows: usize) -> Result<DataFrame> {
    display_projection(&table.head(rows))
}

fn write_csv<W: Write>(writer: W, df: &mut DataFrame, separator: u8) -> Result<()> {
    CsvWriter::new(writer)
        .include_header(true)
        .with_separator(separator)
        .finish(df)?;
    Ok(())
}

/// Comma-separated UTF-8 bytes with a header row; missing values are empty fields.
pub fn to_portable_bytes(table: &RecordTable, columns: &[&str]) -> Result<Vec<u8>> {
    let mut df = project(table, columns)?;
    let mut bytes = Vec::new();
    write_csv(&mut bytes, &mut df, b',')?;
    Ok(bytes)
}

/// Write the display window of `table` as CSV to `writer`. Returns the number of rows written.
pub fn write_display_window<W: Write>(
    writer: W,
    table: &RecordTable,
    rows: usize,
) -> Result<usize> {
    let mut df = display_window(table, rows)?;
    write_csv(writer, &mut df, b',')?;
    Ok(df.height())
}

/// Write the export projection to `path`, compressing when its extension asks for it.
pub fn write_export(table: &RecordTable, path: &Path, columns: &[&str]) -> Result<()> {
    let mut df = project(table, columns)?;
    let file =
        File::create(path).wrap_err_with(|| format!("Could not create {}", path.display()))?;
    match CompressionFormat::from_extension(path) {
        None => write_csv(file, &mut df, b',')?,
        Some(CompressionFormat::Gzip) => write_csv(
            flate2::write::GzEncoder::new(file, flate2::Compression::default()),
            &mut df,
            b',',
        )?,
        Some(CompressionFormat::Zstd) => {
            write_csv(zstd::Encoder::new(file, 0)?.auto_finish(), &mut df, b',')?
        }
        Some(CompressionFormat::Bzip2) => write_csv(
            bzip2::write::BzEncoder::new(file, bzip2::Compression::default()),
            &mut df,
            b',',
        )?,
        Some(CompressionFormat::Xz) => {
            write_csv(xz2::write::XzEncoder::new(file, 6), &mut df, b',')?
        }
    }
    info!(path = %path.display(), rows = df.height(), "exported results");
    Ok(())
}
