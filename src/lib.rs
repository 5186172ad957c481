//! animex: load, filter and summarize anime catalogue tables.
//!
//! The pipeline is `loader` -> `filter` -> `statistics` / `genres` -> `export`,
//! with `cache` keeping loaded tables alive for a bounded time.

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error_display;
pub mod export;
pub mod filter;
pub mod genres;
pub mod loader;
pub mod muse;
pub mod schema;
pub mod source;
pub mod statistics;
pub mod table;

pub use animex_cli::{
    Args, Command, CompressionFormat, FileFormat, MuseArgs, MuseKind, OutputFormat,
};
pub use cache::TableCache;
pub use config::{AppConfig, ConfigManager, DisplayConfig, FileLoadingConfig};
pub use dashboard::Dashboard;
pub use export::{to_portable_bytes, DISPLAY_COLUMNS};
pub use filter::{apply, FilterSpec};
pub use genres::{extract_vocabulary, genre_counts, GenreCount};
pub use loader::{load, load_from_bytes, load_path, LoadOptions};
pub use schema::Capabilities;
pub use source::{input_source, InputSource};
pub use table::RecordTable;

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "animex";
