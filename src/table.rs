use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::DataFrame;

use crate::schema::{column_names, Capabilities};

/// Normalized in-memory dataset: the frame, per-row genre tokens and the
/// capability record negotiated at load time.
///
/// Tables are never patched in place. Filtering and projection produce new
/// tables whose genre tokens stay aligned with their rows.
#[derive(Debug, Clone)]
pub struct RecordTable {
    df: DataFrame,
    genres: Vec<Vec<String>>,
    capabilities: Capabilities,
}

impl RecordTable {
    pub(crate) fn new(
        df: DataFrame,
        genres: Vec<Vec<String>>,
        capabilities: Capabilities,
    ) -> Result<Self> {
        if df.height() != genres.len() {
            return Err(eyre!(
                "Genre tokens ({}) do not line up with table rows ({})",
                genres.len(),
                df.height()
            ));
        }
        Ok(Self {
            df,
            genres,
            capabilities,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        column_names(&self.df)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.get_column_index(name).is_some()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Genre labels of each row, aligned with the frame.
    pub fn genre_tokens(&self) -> &[Vec<String>] {
        &self.genres
    }

    /// First `n` rows (the interactive display window).
    pub fn head(&self, n: usize) -> RecordTable {
        let n = n.min(self.height());
        RecordTable {
            df: self.df.head(Some(n)),
            genres: self.genres[..n].to_vec(),
            capabilities: self.capabilities,
        }
    }

    /// Row-for-row equality, treating nulls in the same position as equal.
    pub fn same_rows(&self, other: &RecordTable) -> bool {
        self.genres == other.genres && self.df.equals_missing(&other.df)
    }
}
