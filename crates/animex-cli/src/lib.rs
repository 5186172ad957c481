//! Shared CLI definitions for animex.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Delimited text layout of an input file (used to bypass extension-based detection).
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Pipe-separated values
    Psv,
}

impl FileFormat {
    /// Detect file format from path extension, looking through a compression suffix
    /// (`anime.tsv.gz` is Tsv). Returns None when the extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        if CompressionFormat::from_extension(path).is_some() {
            return path
                .file_stem()
                .map(Path::new)
                .and_then(|stem| stem.extension())
                .and_then(|e| e.to_str())
                .and_then(Self::from_extension);
        }
        Self::from_extension(ext)
    }

    /// Parse format from extension string (e.g. "csv", "tsv").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "psv" => Some(Self::Psv),
            _ => None,
        }
    }

    /// Field separator byte for this format.
    pub fn separator(&self) -> u8 {
        match self {
            Self::Csv => b',',
            Self::Tsv => b'\t',
            Self::Psv => b'|',
        }
    }
}

/// Compression format for data files
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz) - Most common, good balance of speed and compression
    Gzip,
    /// Zstandard compression (.zst) - Modern, fast compression with good ratios
    Zstd,
    /// Bzip2 compression (.bz2) - Good compression ratio, slower than gzip
    Bzip2,
    /// XZ compression (.xz) - Excellent compression ratio, slower than bzip2
    Xz,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            match ext.to_lowercase().as_str() {
                "gz" => Some(Self::Gzip),
                "zst" | "zstd" => Some(Self::Zstd),
                "bz2" | "bz" => Some(Self::Bzip2),
                "xz" => Some(Self::Xz),
                _ => None,
            }
        } else {
            None
        }
    }
}

/// How the dashboard summary is printed
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// Pretty-printed JSON document
    Json,
}

/// Command-line arguments for animex
#[derive(Clone, Parser, Debug)]
#[command(
    name = "animex",
    version,
    about = "Explore, filter and summarize anime metadata datasets",
    subcommand_negates_reqs = true
)]
pub struct Args {
    /// Path or http(s) URL of the delimited data file to open
    /// (not required with --generate-config or the muse subcommand)
    #[arg(required_unless_present_any = ["generate_config"], value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Specify the delimiter to use when reading a delimited text file
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Specify that the file has no header
    #[arg(long = "no-header", action)]
    pub no_header: bool,

    /// Specify the compression format explicitly (gzip, zstd, bzip2, xz)
    /// If not specified, compression is auto-detected from file extension.
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Force file format (csv, tsv, psv). By default format is auto-detected from the file extension.
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Keep only rows whose Type is one of these values (repeatable)
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<String>,

    /// Keep only rows whose Status is one of these values (repeatable)
    #[arg(long = "status", value_name = "STATUS")]
    pub statuses: Vec<String>,

    /// Keep only rows tagged with at least one of these genres (repeatable)
    #[arg(long = "genre", value_name = "GENRE")]
    pub genres: Vec<String>,

    /// Lower bound of the score range (inclusive). Rows without a score always pass.
    #[arg(long = "score-min", default_value_t = 0.0)]
    pub score_min: f64,

    /// Upper bound of the score range (inclusive)
    #[arg(long = "score-max", default_value_t = 10.0)]
    pub score_max: f64,

    /// Earliest start year (inclusive)
    #[arg(long = "year-min")]
    pub year_min: Option<i32>,

    /// Latest start year (inclusive)
    #[arg(long = "year-max")]
    pub year_max: Option<i32>,

    /// Drop rows with an unknown start year when a year range is active
    #[arg(long = "exclude-missing-years", action)]
    pub exclude_missing_years: bool,

    /// Case-insensitive search over Title, Title English and Synopsis
    #[arg(long = "search", value_name = "TEXT")]
    pub search: Option<String>,

    /// Sort the filtered rows by this column
    #[arg(long = "sort-by", value_name = "COLUMN")]
    pub sort_by: Option<String>,

    /// Sort ascending instead of descending
    #[arg(long = "ascending", action)]
    pub ascending: bool,

    /// Write the filtered rows (display columns) as CSV to this path. Use "-" for stdout.
    #[arg(long = "export", value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Maximum rows shown in the result table (overrides config [display] row_limit)
    #[arg(long = "rows", value_name = "N")]
    pub rows: Option<usize>,

    /// Number of genres shown in the top genres chart (overrides config [display] top_genres)
    #[arg(long = "top-genres", value_name = "N")]
    pub top_genres: Option<usize>,

    /// Print the sorted genre vocabulary and exit
    #[arg(long = "list-genres", action)]
    pub list_genres: bool,

    /// Print the distinct Type values and exit
    #[arg(long = "list-types", action)]
    pub list_types: bool,

    /// Print the distinct Status values and exit
    #[arg(long = "list-statuses", action)]
    pub list_statuses: bool,

    /// Print the columns accepted by --sort-by and exit
    #[arg(long = "list-sortable", action)]
    pub list_sortable: bool,

    /// Summary output format
    #[arg(long = "output", value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Enable debug logging
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/animex/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Clone, Subcommand, Debug)]
pub enum Command {
    /// Ask the remote content service for an original character or story
    Muse(MuseArgs),
}

#[derive(Clone, clap::Args, Debug)]
pub struct MuseArgs {
    #[command(subcommand)]
    pub kind: MuseKind,

    /// Model identifier (overrides config [muse] model)
    #[arg(long = "model", global = true)]
    pub model: Option<String>,
}

#[derive(Clone, Subcommand, Debug)]
pub enum MuseKind {
    /// Create an original anime character
    Character {
        /// Character name (optional)
        #[arg(long)]
        name: Option<String>,
        /// Character gender
        #[arg(long, default_value = "Masculino")]
        gender: String,
        /// Character role (hero, villain, ...)
        #[arg(long, default_value = "Héroe")]
        role: String,
        /// Setting (optional)
        #[arg(long)]
        setting: Option<String>,
    },
    /// Create an original anime story
    Story {
        /// Story genre
        #[arg(long, default_value = "Acción")]
        genre: String,
        /// Story length
        #[arg(long, default_value = "Corta (1 párrafo)")]
        length: String,
        /// Central theme (optional)
        #[arg(long)]
        theme: Option<String>,
    },
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let placeholder: String = arg
            .get_value_names()
            .map(|names| {
                names
                    .iter()
                    .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let option_str = if arg.is_positional() {
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            if arg.get_action().takes_values() && !placeholder.is_empty() {
                format!("{op} {placeholder}")
            } else {
                op
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}
