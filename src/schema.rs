//! Canonical column vocabulary and schema negotiation.
//!
//! The loader resolves raw column names once and records which optional
//! columns exist in a [`Capabilities`] value. Everything downstream consults
//! that record instead of probing the frame for column names.

use polars::prelude::{DataFrame, DataType};
use serde::Serialize;

pub const TITLE: &str = "Title";
pub const TITLE_ENGLISH: &str = "Title English";
pub const TITLE_JAPANESE: &str = "Title Japanese";
pub const SYNOPSIS: &str = "Synopsis";
pub const STUDIOS: &str = "Studios";
pub const GENRES: &str = "Genres";
pub const TYPE: &str = "Type";
pub const STATUS: &str = "Status";
pub const SOURCE: &str = "Source";
pub const EPISODES: &str = "Episodes";
pub const SCORE: &str = "Score";
pub const AIRED_FROM: &str = "Aired From";
pub const MEMBERS: &str = "Members";
pub const FAVORITES: &str = "Favorites";
pub const START_YEAR: &str = "start_year";

/// Free-text columns whose missing values are normalized to the empty string.
pub const TEXT_COLUMNS: &[&str] = &[TITLE, TITLE_ENGLISH, TITLE_JAPANESE, SYNOPSIS, STUDIOS];

/// Columns searched by the free-text filter.
pub const SEARCH_COLUMNS: &[&str] = &[TITLE, TITLE_ENGLISH, SYNOPSIS];

/// Which optional columns the loaded source actually carried.
///
/// Derived columns (`Genres`, `Score`, `start_year`) always exist in a loaded
/// table; these flags say whether the source had data behind them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub has_title: bool,
    pub has_title_english: bool,
    pub has_synopsis: bool,
    pub has_type: bool,
    pub has_status: bool,
    pub has_genres: bool,
    pub has_score: bool,
    pub has_year: bool,
    pub has_members: bool,
    pub has_favorites: bool,
}

impl Capabilities {
    /// Negotiate capabilities from the raw (trimmed) column names of a source.
    pub fn negotiate(
        columns: &[String],
        score_column: Option<&str>,
        aired_from_column: Option<&str>,
    ) -> Self {
        let has = |name: &str| columns.iter().any(|c| c == name);
        Self {
            has_title: has(TITLE),
            has_title_english: has(TITLE_ENGLISH),
            has_synopsis: has(SYNOPSIS),
            has_type: has(TYPE),
            has_status: has(STATUS),
            has_genres: has(GENRES),
            has_score: score_column.is_some(),
            has_year: aired_from_column.is_some(),
            has_members: has(MEMBERS),
            has_favorites: has(FAVORITES),
        }
    }

    /// Whether a filterable column is backed by source data.
    pub fn supports(&self, column: &str) -> bool {
        match column {
            TITLE => self.has_title,
            TITLE_ENGLISH => self.has_title_english,
            SYNOPSIS => self.has_synopsis,
            TYPE => self.has_type,
            STATUS => self.has_status,
            GENRES => self.has_genres,
            SCORE => self.has_score,
            START_YEAR => self.has_year,
            MEMBERS => self.has_members,
            FAVORITES => self.has_favorites,
            _ => false,
        }
    }

    /// Searchable text columns present in the source, in search order.
    pub fn search_columns(&self) -> Vec<&'static str> {
        SEARCH_COLUMNS
            .iter()
            .copied()
            .filter(|c| self.supports(c))
            .collect()
    }
}

/// First name in `aliases` that appears in `columns`.
pub fn resolve_alias<'a>(columns: &[String], aliases: &'a [String]) -> Option<&'a str> {
    aliases
        .iter()
        .find(|alias| columns.iter().any(|c| c == *alias))
        .map(String::as_str)
}

pub(crate) fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

pub(crate) fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}
