//! Reads a delimited source into a normalized [`RecordTable`].
//!
//! Every column is read as text and coerced here, so one malformed value can
//! only ever become a missing value. The load as a whole fails only when the
//! source cannot be read or parsed as delimited data.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use polars::prelude::*;
use tracing::{debug, info};

use crate::config::FileLoadingConfig;
use crate::genres::tokenize;
use crate::schema::{
    column_names, resolve_alias, Capabilities, GENRES, SCORE, START_YEAR, TEXT_COLUMNS,
};
use crate::source::{input_source, InputSource};
use crate::table::RecordTable;
use crate::{CompressionFormat, FileFormat};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01, the epoch of polars `Date`.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Options for reading and normalizing a source.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub has_header: bool,
    pub compression: Option<CompressionFormat>,
    pub format: Option<FileFormat>,
    pub aired_from_columns: Vec<String>,
    pub score_columns: Vec<String>,
    pub integer_columns: Vec<String>,
    pub null_placeholders: Vec<String>,
    pub date_formats: Vec<String>,
    pub http_timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::from_config(&FileLoadingConfig::default())
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FileLoadingConfig) -> Self {
        Self {
            delimiter: config.delimiter,
            has_header: config.has_header.unwrap_or(true),
            compression: None,
            format: None,
            aired_from_columns: config.aired_from_columns.clone(),
            score_columns: config.score_columns.clone(),
            integer_columns: config.integer_columns.clone(),
            null_placeholders: config.null_placeholders.clone(),
            date_formats: config.date_formats.clone(),
            http_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_compression(mut self, compression: CompressionFormat) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Explicit delimiter, then explicit format, then the format implied by the extension, then comma.
    pub fn separator_for(&self, path: &Path) -> u8 {
        self.delimiter
            .or_else(|| self.format.map(|f| f.separator()))
            .or_else(|| FileFormat::from_path(path).map(|f| f.separator()))
            .unwrap_or(b',')
    }
}

/// Load and normalize the table behind `source`.
pub fn load(source: &InputSource, options: &LoadOptions) -> Result<RecordTable> {
    let identity = source.identity();
    let bytes = source
        .read_bytes(options.compression, options.http_timeout)
        .wrap_err_with(|| format!("Could not read source {}", identity))?;
    let separator = options.separator_for(&source.extension_path());
    let df = read_delimited(bytes, separator, options.has_header)
        .wrap_err_with(|| format!("Could not read source {} as delimited data", identity))?;
    let table = normalize(df, options)?;
    info!(
        source = %identity,
        rows = table.height(),
        columns = table.width(),
        "loaded table"
    );
    Ok(table)
}

/// Convenience wrapper around [`load`] for a local path or URL.
pub fn load_path(path: impl AsRef<Path>, options: &LoadOptions) -> Result<RecordTable> {
    load(&input_source(path.as_ref()), options)
}

/// Load an in-memory upload. The separator comes from `options` (comma when unset).
pub fn load_from_bytes(bytes: Vec<u8>, options: &LoadOptions) -> Result<RecordTable> {
    let separator = options
        .delimiter
        .or_else(|| options.format.map(|f| f.separator()))
        .unwrap_or(b',');
    let df = read_delimited(bytes, separator, options.has_header)
        .wrap_err("Could not read uploaded data as delimited text")?;
    normalize(df, options)
}

/// Parse delimited bytes with every column read as text.
pub fn read_delimited(bytes: Vec<u8>, separator: u8, has_header: bool) -> Result<DataFrame> {
    let read_options = CsvReadOptions::default()
        .with_has_header(has_header)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| {
            opts.with_separator(separator)
                .with_encoding(CsvEncoding::LossyUtf8)
        });
    let df = CsvReader::new(Cursor::new(bytes))
        .with_options(read_options)
        .finish()?;
    Ok(df)
}

/// Header names with surrounding whitespace removed. A header whose trimmed
/// name is already claimed, by an earlier header or by a column carrying it
/// exactly, keeps its raw name. Raw names are unique, so the result is too.
fn trimmed_headers(names: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut headers = Vec::with_capacity(names.len());
    for (i, raw) in names.iter().enumerate() {
        let trimmed = raw.trim();
        let claimed = taken.contains(trimmed) || names[i + 1..].iter().any(|n| n == trimmed);
        let header = if claimed {
            debug!(column = %raw, "header collides with {:?} after trimming", trimmed);
            raw.clone()
        } else {
            trimmed.to_string()
        };
        taken.insert(header.clone());
        headers.push(header);
    }
    headers
}

/// Apply the load-time normalization to an already parsed frame.
pub fn normalize(mut df: DataFrame, options: &LoadOptions) -> Result<RecordTable> {
    let names = column_names(&df);
    let headers = trimmed_headers(&names);
    let renames: Vec<(&str, &str)> = names
        .iter()
        .zip(&headers)
        .filter(|(old, new)| old != new)
        .map(|(old, new)| (old.as_str(), new.as_str()))
        .collect();
    if !renames.is_empty() {
        df = df
            .lazy()
            .rename(
                renames.iter().map(|(old, _)| *old),
                renames.iter().map(|(_, new)| *new),
                false,
            )
            .collect()?;
    }

    let aired_from = resolve_alias(&headers, &options.aired_from_columns).map(str::to_string);
    let score_source = resolve_alias(&headers, &options.score_columns).map(str::to_string);
    let mut capabilities =
        Capabilities::negotiate(&headers, score_source.as_deref(), aired_from.as_deref());
    let height = df.height();

    let start_years: Vec<Option<i32>> = match &aired_from {
        Some(name) => {
            let dates: Vec<Option<NaiveDate>> = string_values(&df, name)?
                .iter()
                .map(|v| v.as_deref().and_then(|s| parse_date(s, &options.date_formats)))
                .collect();
            report_absorbed(name, &df, dates.iter().filter(|d| d.is_none()).count())?;
            let days: Vec<Option<i32>> = dates
                .iter()
                .map(|d| d.map(|d| d.num_days_from_ce() - UNIX_EPOCH_CE_DAYS))
                .collect();
            let parsed = Series::new(name.as_str().into(), days).cast(&DataType::Date)?;
            df.with_column(parsed)?;
            dates.iter().map(|d| d.map(|d| d.year())).collect()
        }
        // A previously exported table carries the derived year without the date.
        None if df.get_column_index(START_YEAR).is_some() => {
            capabilities.has_year = true;
            string_values(&df, START_YEAR)?
                .iter()
                .map(|v| {
                    v.as_deref()
                        .and_then(parse_integer)
                        .and_then(|y| i32::try_from(y).ok())
                })
                .collect()
        }
        None => vec![None; height],
    };
    df.with_column(Series::new(START_YEAR.into(), start_years))?;

    let genre_values: Vec<String> = if capabilities.has_genres {
        string_values(&df, GENRES)?
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect()
    } else {
        vec![String::new(); height]
    };
    let genre_tokens: Vec<Vec<String>> = genre_values.iter().map(|g| tokenize(g)).collect();
    df.with_column(Series::new(GENRES.into(), genre_values))?;

    let scores: Vec<Option<f64>> = match &score_source {
        Some(name) => {
            let scores: Vec<Option<f64>> = string_values(&df, name)?
                .iter()
                .map(|v| v.as_deref().and_then(parse_float))
                .collect();
            report_absorbed(name, &df, scores.iter().filter(|s| s.is_none()).count())?;
            scores
        }
        None => vec![None; height],
    };
    df.with_column(Series::new(SCORE.into(), scores))?;

    for name in &options.integer_columns {
        if name == SCORE || df.get_column_index(name).is_none() {
            continue;
        }
        let values: Vec<Option<i64>> = string_values(&df, name)?
            .iter()
            .map(|v| v.as_deref().and_then(parse_integer))
            .collect();
        report_absorbed(name, &df, values.iter().filter(|v| v.is_none()).count())?;
        df.with_column(Series::new(name.as_str().into(), values))?;
    }

    for name in TEXT_COLUMNS {
        if df.get_column_index(name).is_none() {
            continue;
        }
        let values: Vec<String> = string_values(&df, name)?
            .into_iter()
            .map(|v| match v {
                Some(s) if !options.null_placeholders.iter().any(|p| *p == s) => s,
                _ => String::new(),
            })
            .collect();
        df.with_column(Series::new((*name).into(), values))?;
    }

    RecordTable::new(df, genre_tokens, capabilities)
}

fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Log how many present values a coercion turned into missing ones.
fn report_absorbed(name: &str, df: &DataFrame, missing_after: usize) -> Result<()> {
    let missing_before = df.column(name)?.null_count();
    let absorbed = missing_after.saturating_sub(missing_before);
    if absorbed > 0 {
        debug!(column = name, absorbed, "unparseable values treated as missing");
    }
    Ok(())
}

/// Parse a calendar date, trying RFC 3339 first and then each configured format.
pub fn parse_date(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    formats.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(raw, fmt)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(raw, fmt).ok().map(|dt| dt.date()))
    })
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        parse_float(raw)
            .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
            .map(|v| v as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> Vec<String> {
        FileLoadingConfig::default().date_formats
    }

    #[test]
    fn parse_date_accepts_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(1998, 4, 3);
        assert_eq!(parse_date("1998-04-03", &formats()), expected);
        assert_eq!(parse_date(" 1998-04-03 00:00:00 ", &formats()), expected);
        assert_eq!(parse_date("1998-04-03T00:00:00+09:00", &formats()), expected);
        assert_eq!(parse_date("Apr 3, 1998", &formats()), expected);
        assert_eq!(parse_date("not a date", &formats()), None);
        assert_eq!(parse_date("", &formats()), None);
    }

    #[test]
    fn parse_float_rejects_non_finite() {
        assert_eq!(parse_float(" 8.5 "), Some(8.5));
        assert_eq!(parse_float("nan"), None);
        assert_eq!(parse_float("inf"), None);
        assert_eq!(parse_float("N/A"), None);
    }

    #[test]
    fn parse_integer_accepts_whole_floats_only() {
        assert_eq!(parse_integer("12"), Some(12));
        assert_eq!(parse_integer("12.0"), Some(12));
        assert_eq!(parse_integer("12.5"), None);
        assert_eq!(parse_integer("Unknown"), None);
    }

    #[test]
    fn separator_resolution_order() {
        let opts = LoadOptions::new();
        assert_eq!(opts.separator_for(Path::new("a.csv")), b',');
        assert_eq!(opts.separator_for(Path::new("a.tsv.gz")), b'\t');
        assert_eq!(opts.separator_for(Path::new("a")), b',');
        let opts = LoadOptions::new().with_format(FileFormat::Psv);
        assert_eq!(opts.separator_for(Path::new("a.tsv")), b'|');
        let opts = opts.with_delimiter(b';');
        assert_eq!(opts.separator_for(Path::new("a.tsv")), b';');
    }

    #[test]
    fn normalize_derives_fields() -> Result<()> {
        let df = df!(
            " Title " => ["A", "B", "C"],
            "Aired From" => [Some("2010-01-09"), Some("garbage"), None],
            "score" => [Some("8.5"), Some("n/a"), None],
            "Genres" => [Some("Action, Comedy"), None, Some(" Drama ")],
            "Members" => [Some("1200"), Some("lots"), None],
            "Synopsis" => [Some("nan"), None, Some("text")]
        )?;
        let table = normalize(df, &LoadOptions::new())?;
        let frame = table.frame();

        assert!(table.has_column("Title"));
        assert_eq!(
            frame.column(START_YEAR)?.i32()?.into_iter().collect::<Vec<_>>(),
            vec![Some(2010), None, None]
        );
        assert_eq!(
            frame.column(SCORE)?.f64()?.into_iter().collect::<Vec<_>>(),
            vec![Some(8.5), None, None]
        );
        assert_eq!(
            frame.column("Members")?.i64()?.into_iter().collect::<Vec<_>>(),
            vec![Some(1200), None, None]
        );
        assert_eq!(
            frame.column("Synopsis")?.str()?.into_iter().collect::<Vec<_>>(),
            vec![Some(""), Some(""), Some("text")]
        );
        assert_eq!(
            frame.column(GENRES)?.str()?.into_iter().collect::<Vec<_>>(),
            vec![Some("Action, Comedy"), Some(""), Some(" Drama ")]
        );
        assert_eq!(frame.column("Aired From")?.dtype(), &DataType::Date);
        assert_eq!(
            table.genre_tokens(),
            &[
                vec!["Action".to_string(), "Comedy".to_string()],
                vec![],
                vec!["Drama".to_string()],
            ]
        );

        let caps = table.capabilities();
        assert!(caps.has_score && caps.has_year && caps.has_members && caps.has_genres);
        assert!(!caps.has_type && !caps.has_favorites);
        Ok(())
    }

    #[test]
    fn normalize_adds_derived_columns_when_sources_are_absent() -> Result<()> {
        let df = df!("Title" => ["A", "B"])?;
        let table = normalize(df, &LoadOptions::new())?;
        let frame = table.frame();
        assert_eq!(frame.column(START_YEAR)?.null_count(), 2);
        assert_eq!(frame.column(SCORE)?.null_count(), 2);
        assert_eq!(frame.column(GENRES)?.str()?.get(0), Some(""));
        assert!(!table.capabilities().has_year);
        assert!(!table.capabilities().has_score);
        Ok(())
    }

    #[test]
    fn trimmed_headers_resolve_collisions() {
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            trimmed_headers(&names(&[" Title ", "Score"])),
            names(&["Title", "Score"])
        );
        assert_eq!(
            trimmed_headers(&names(&["Title", " Title"])),
            names(&["Title", " Title"])
        );
        // An exact name is never displaced by a padded one.
        assert_eq!(
            trimmed_headers(&names(&[" Title", "Title"])),
            names(&[" Title", "Title"])
        );
        assert_eq!(
            trimmed_headers(&names(&["b ", " b", "b"])),
            names(&["b ", " b", "b"])
        );
    }
}
