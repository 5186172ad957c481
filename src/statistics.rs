use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;

use crate::schema::{is_numeric_type, FAVORITES, MEMBERS, SCORE, START_YEAR};
use crate::table::RecordTable;

/// Lowest year offered when the table carries no start years.
pub const FALLBACK_MIN_YEAR: i32 = 1900;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMissingness {
    pub column: String,
    /// Percentage of rows with a missing value, rounded to 2 decimals.
    pub pct_missing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub row_count: usize,
    /// `None` when no row has a score.
    pub mean_score: Option<f64>,
    /// `None` when the column is absent or has no values.
    pub mean_favorites: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreMembersPoint {
    pub members: i64,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetShape {
    pub rows: usize,
    pub columns: usize,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Missing-value percentage per column, highest first. Ties keep column order.
pub fn missingness(table: &RecordTable) -> Vec<ColumnMissingness> {
    let height = table.height();
    let mut out: Vec<ColumnMissingness> = table
        .frame()
        .get_columns()
        .iter()
        .map(|c| {
            let pct_missing = if height == 0 {
                0.0
            } else {
                round2(c.null_count() as f64 / height as f64 * 100.0)
            };
            ColumnMissingness {
                column: c.name().to_string(),
                pct_missing,
            }
        })
        .collect();
    out.sort_by(|a, b| b.pct_missing.total_cmp(&a.pct_missing));
    out
}

fn column_mean(table: &RecordTable, name: &str) -> Result<Option<f64>> {
    if !table.has_column(name) {
        return Ok(None);
    }
    let values = table.frame().column(name)?.cast(&DataType::Float64)?;
    Ok(values.as_materialized_series().mean().filter(|m| m.is_finite()))
}

pub fn kpis(table: &RecordTable) -> Result<Kpis> {
    let caps = table.capabilities();
    let mean_score = if caps.has_score {
        column_mean(table, SCORE)?
    } else {
        None
    };
    let mean_favorites = if caps.has_favorites {
        column_mean(table, FAVORITES)?
    } else {
        None
    };
    Ok(Kpis {
        row_count: table.height(),
        mean_score,
        mean_favorites,
    })
}

fn present_years(table: &RecordTable) -> Result<Vec<i32>> {
    let years = table.frame().column(START_YEAR)?.cast(&DataType::Int32)?;
    Ok(years.i32()?.into_iter().flatten().collect())
}

/// Rows per start year, ascending by year. Rows without a year are not counted.
pub fn per_year_counts(table: &RecordTable) -> Result<BTreeMap<i32, usize>> {
    let mut counts = BTreeMap::new();
    for year in present_years(table)? {
        *counts.entry(year).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Inclusive range of present start years, or 1900 through the current year.
pub fn year_bounds(table: &RecordTable) -> Result<(i32, i32)> {
    let years = present_years(table)?;
    match (years.iter().min(), years.iter().max()) {
        (Some(min), Some(max)) => Ok((*min, *max)),
        _ => Ok((FALLBACK_MIN_YEAR, chrono::Local::now().year())),
    }
}

fn present_scores(table: &RecordTable) -> Result<Vec<f64>> {
    let scores = table.frame().column(SCORE)?.cast(&DataType::Float64)?;
    Ok(scores.f64()?.into_iter().flatten().collect())
}

/// Equal-width histogram of present scores over their own min..max.
pub fn score_histogram(table: &RecordTable, bins: usize) -> Result<Vec<HistogramBin>> {
    let scores = present_scores(table)?;
    if bins == 0 || scores.is_empty() {
        return Ok(Vec::new());
    }
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bins as f64;

    let mut counts = vec![0usize; bins];
    for s in &scores {
        let idx = if width > 0.0 {
            (((s - min) / width) as usize).min(bins - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count,
        })
        .collect())
}

/// (Members, Score) pairs for rows where both are present. Empty without a Members column.
pub fn score_members_points(table: &RecordTable) -> Result<Vec<ScoreMembersPoint>> {
    if !table.capabilities().has_members {
        return Ok(Vec::new());
    }
    let df = table.frame();
    let members = df.column(MEMBERS)?.cast(&DataType::Int64)?;
    let scores = df.column(SCORE)?.cast(&DataType::Float64)?;
    Ok(members
        .i64()?
        .into_iter()
        .zip(scores.f64()?)
        .filter_map(|(m, s)| Some(ScoreMembersPoint {
            members: m?,
            score: s?,
        }))
        .collect())
}

/// Sorted distinct non-empty values of a categorical column.
pub fn distinct_values(table: &RecordTable, column: &str) -> Result<Vec<String>> {
    if !table.capabilities().supports(column) {
        return Ok(Vec::new());
    }
    let values = table.frame().column(column)?.cast(&DataType::String)?;
    let set: BTreeSet<String> = values
        .str()?
        .into_iter()
        .flatten()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .collect();
    Ok(set.into_iter().collect())
}

/// Columns offered for sorting: numeric columns backed by source data, in table order.
pub fn sortable_columns(table: &RecordTable) -> Vec<String> {
    let caps = table.capabilities();
    table
        .frame()
        .get_columns()
        .iter()
        .filter(|c| is_numeric_type(c.dtype()))
        .map(|c| c.name().to_string())
        .filter(|name| match name.as_str() {
            SCORE => caps.has_score,
            START_YEAR => caps.has_year,
            _ => true,
        })
        .collect()
}

pub fn dataset_shape(table: &RecordTable) -> DatasetShape {
    DatasetShape {
        rows: table.height(),
        columns: table.width(),
    }
}
