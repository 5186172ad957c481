//! Filter engine: turns a [`RecordTable`] and a [`FilterSpec`] into a filtered view.
//!
//! Predicates are combined with AND across categories; set-valued predicates
//! accept a row when any of their values match. Rows with a missing score are
//! never removed by the score range, while rows with a missing start year are
//! kept only when `include_missing_years` is set. A predicate whose column is
//! absent from the source is skipped.

use std::collections::BTreeSet;

use color_eyre::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::schema::{GENRES, SCORE, START_YEAR, STATUS, TYPE};
use crate::table::RecordTable;

const ROW_INDEX: &str = "__animex_row";
const GENRE_MATCH: &str = "__animex_genre_match";

/// Default bounds of the score slider.
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;

/// User-chosen predicate and sort configuration for one filtering pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub types: BTreeSet<String>,
    pub statuses: BTreeSet<String>,
    pub genres: BTreeSet<String>,
    pub score_min: f64,
    pub score_max: f64,
    /// A bound of `None` (or `Some(0)`) leaves that side of the year range open.
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub include_missing_years: bool,
    pub search_text: String,
    pub sort_by: Option<String>,
    pub sort_ascending: bool,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            types: BTreeSet::new(),
            statuses: BTreeSet::new(),
            genres: BTreeSet::new(),
            score_min: SCORE_MIN,
            score_max: SCORE_MAX,
            year_min: None,
            year_max: None,
            include_missing_years: true,
            search_text: String::new(),
            sort_by: None,
            sort_ascending: false,
        }
    }
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for a freshly loaded table: the year range spans the data.
    pub fn for_table(table: &RecordTable) -> Result<Self> {
        let (year_min, year_max) = crate::statistics::year_bounds(table)?;
        Ok(Self {
            year_min: Some(year_min),
            year_max: Some(year_max),
            ..Self::default()
        })
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses = statuses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_score_range(mut self, min: f64, max: f64) -> Self {
        self.score_min = min;
        self.score_max = max;
        self
    }

    pub fn with_year_range(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.year_min = min;
        self.year_max = max;
        self
    }

    pub fn with_include_missing_years(mut self, include: bool) -> Self {
        self.include_missing_years = include;
        self
    }

    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn with_sort(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.sort_by = Some(column.into());
        self.sort_ascending = ascending;
        self
    }

    fn year_bound(bound: Option<i32>) -> Option<i32> {
        bound.filter(|y| *y != 0)
    }

    /// Whether the year predicate constrains anything.
    pub fn year_filter_active(&self) -> bool {
        Self::year_bound(self.year_min).is_some() || Self::year_bound(self.year_max).is_some()
    }
}

/// Apply `spec` to `table`. The input is never modified; row order follows the
/// input unless a sort column is given, and sorting is stable with missing
/// values placed last in either direction.
pub fn apply(table: &RecordTable, spec: &FilterSpec) -> Result<RecordTable> {
    let caps = table.capabilities();
    let mut df = table.frame().with_row_index(ROW_INDEX.into(), None)?;
    let mut predicates: Vec<Expr> = Vec::new();

    if !spec.types.is_empty() {
        if caps.has_type {
            predicates.extend(any_of(TYPE, &spec.types));
        } else {
            debug!(column = TYPE, "column absent, type filter skipped");
        }
    }

    if !spec.statuses.is_empty() {
        if caps.has_status {
            predicates.extend(any_of(STATUS, &spec.statuses));
        } else {
            debug!(column = STATUS, "column absent, status filter skipped");
        }
    }

    let score = col(SCORE);
    predicates.push(
        score.clone().is_null().or(score
            .clone()
            .gt_eq(lit(spec.score_min))
            .and(score.lt_eq(lit(spec.score_max)))),
    );

    if spec.year_filter_active() {
        predicates.push(year_predicate(spec));
    }

    if !spec.genres.is_empty() {
        if caps.has_genres {
            let mask: Vec<bool> = table
                .genre_tokens()
                .iter()
                .map(|labels| labels.iter().any(|label| spec.genres.contains(label)))
                .collect();
            df.with_column(Series::new(GENRE_MATCH.into(), mask))?;
            predicates.push(col(GENRE_MATCH));
        } else {
            debug!(column = GENRES, "column absent, genre filter skipped");
        }
    }

    if !spec.search_text.is_empty() {
        let needle = spec.search_text.to_lowercase();
        let matches = caps
            .search_columns()
            .into_iter()
            .map(|c| {
                col(c)
                    .str()
                    .to_lowercase()
                    .str()
                    .contains_literal(lit(needle.as_str()))
            })
            .reduce(|a, b| a.or(b));
        match matches {
            Some(expr) => predicates.push(expr),
            None => debug!("no searchable columns, text search skipped"),
        }
    }

    let mut lf = df.lazy();
    if let Some(predicate) = predicates.into_iter().reduce(|a, b| a.and(b)) {
        lf = lf.filter(predicate);
    }

    if let Some(column) = &spec.sort_by {
        if table.has_column(column) {
            let options = SortMultipleOptions::default()
                .with_order_descending(!spec.sort_ascending)
                .with_nulls_last(true)
                .with_maintain_order(true);
            lf = lf.sort_by_exprs(vec![col(column.as_str())], options);
        } else {
            warn!(column = %column, "sort column not in table, leaving input order");
        }
    }

    let mut out = lf.collect()?;
    let rows = out.column(ROW_INDEX)?.cast(&DataType::UInt64)?;
    let genres: Vec<Vec<String>> = rows
        .u64()?
        .into_no_null_iter()
        .map(|i| table.genre_tokens()[i as usize].clone())
        .collect();
    out = out.drop(ROW_INDEX)?;
    if out.get_column_index(GENRE_MATCH).is_some() {
        out = out.drop(GENRE_MATCH)?;
    }

    debug!(rows_in = table.height(), rows_out = out.height(), "applied filter");
    RecordTable::new(out, genres, *caps)
}

/// `column == v1 OR column == v2 ...`; missing values never match.
fn any_of(column: &str, accepted: &BTreeSet<String>) -> Option<Expr> {
    accepted
        .iter()
        .map(|v| col(column).eq(lit(v.as_str())))
        .reduce(|a, b| a.or(b))
}

fn year_predicate(spec: &FilterSpec) -> Expr {
    let year = col(START_YEAR);
    let mut in_range = year.clone().is_not_null();
    if let Some(min) = FilterSpec::year_bound(spec.year_min) {
        in_range = in_range.and(year.clone().gt_eq(lit(min)));
    }
    if let Some(max) = FilterSpec::year_bound(spec.year_max) {
        in_range = in_range.and(year.clone().lt_eq(lit(max)));
    }
    if spec.include_missing_years {
        year.is_null().or(in_range)
    } else {
        in_range
    }
}
