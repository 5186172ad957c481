//! One interaction cycle's worth of aggregates, rendered for the terminal or as JSON.

use std::fmt::Write as _;

use color_eyre::Result;
use serde::Serialize;

use crate::config::DisplayConfig;
use crate::genres::{top_genres, GenreCount};
use crate::statistics::{
    dataset_shape, kpis, missingness, per_year_counts, score_histogram, score_members_points,
    ColumnMissingness, DatasetShape, HistogramBin, Kpis, ScoreMembersPoint,
};
use crate::table::RecordTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub dataset: DatasetShape,
    pub original_rows: usize,
    pub filtered_rows: usize,
    /// Computed over the full table.
    pub missingness: Vec<ColumnMissingness>,
    /// Everything below is computed over the filtered table.
    pub kpis: Kpis,
    pub top_genres: Vec<GenreCount>,
    pub per_year: Vec<YearCount>,
    pub score_histogram: Vec<HistogramBin>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub score_members: Vec<ScoreMembersPoint>,
}

impl Dashboard {
    pub fn build(
        full: &RecordTable,
        filtered: &RecordTable,
        display: &DisplayConfig,
    ) -> Result<Self> {
        let mut missing = missingness(full);
        missing.truncate(display.top_missing);
        let per_year = per_year_counts(filtered)?
            .into_iter()
            .map(|(year, count)| YearCount { year, count })
            .collect();
        Ok(Self {
            dataset: dataset_shape(full),
            original_rows: full.height(),
            filtered_rows: filtered.height(),
            missingness: missing,
            kpis: kpis(filtered)?,
            top_genres: top_genres(filtered, display.top_genres),
            per_year,
            score_histogram: score_histogram(filtered, display.score_bins)?,
            score_members: score_members_points(filtered)?,
        })
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        writeln!(
            out,
            "Dataset: {} rows, {} columns",
            self.dataset.rows, self.dataset.columns
        )?;

        writeln!(out, "\nMissing values (% of rows)")?;
        if self.missingness.is_empty() {
            writeln!(out, "  no data")?;
        }
        for m in &self.missingness {
            writeln!(out, "  {:<20} {:>6.2}%", m.column, m.pct_missing)?;
        }

        writeln!(out, "\nResults: {} of {} rows", self.filtered_rows, self.original_rows)?;
        match self.kpis.mean_score {
            Some(mean) => writeln!(out, "  mean score      {:.2}", mean)?,
            None => writeln!(out, "  mean score      N/A")?,
        }
        match self.kpis.mean_favorites {
            Some(mean) => writeln!(out, "  mean favorites  {:.0}", mean)?,
            None => writeln!(out, "  mean favorites  N/A")?,
        }

        writeln!(out, "\nTop genres")?;
        if self.top_genres.is_empty() {
            writeln!(out, "  no genres in the filtered data")?;
        }
        for g in &self.top_genres {
            writeln!(out, "  {:<20} {:>6}", g.genre, g.count)?;
        }

        writeln!(out, "\nReleases per year")?;
        if self.per_year.is_empty() {
            writeln!(out, "  no start years available")?;
        }
        for y in &self.per_year {
            writeln!(out, "  {}  {:>6}", y.year, y.count)?;
        }

        writeln!(out, "\nScore distribution")?;
        if self.score_histogram.is_empty() {
            writeln!(out, "  no scores available")?;
        }
        let peak = self
            .score_histogram
            .iter()
            .map(|b| b.count)
            .max()
            .unwrap_or(0);
        for bin in &self.score_histogram {
            let bar = if peak == 0 { 0 } else { bin.count * 40 / peak };
            writeln!(
                out,
                "  {:>5.2}-{:<5.2} {:>6} {}",
                bin.lower,
                bin.upper,
                bin.count,
                "#".repeat(bar)
            )?;
        }
        Ok(())
    }
}
