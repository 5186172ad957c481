use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string with comments.
    /// All fields are commented out so defaults are used, but users can uncomment to override
    pub fn generate_default_config(&self) -> String {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .unwrap_or_else(|e| panic!("Failed to serialize default config: {}", e));

        Self::comment_all_fields(toml_str, Self::collect_all_comments())
    }

    /// Collect all field comments from section comment constants into a map keyed by field path
    fn collect_all_comments() -> HashMap<String, String> {
        let mut comments = HashMap::new();

        for (field, comment) in APP_COMMENTS {
            comments.insert(field.to_string(), comment.to_string());
        }

        let sections: &[(&str, &[(&str, &str)])] = &[
            ("file_loading", FILE_LOADING_COMMENTS),
            ("cache", CACHE_COMMENTS),
            ("display", DISPLAY_COMMENTS),
            ("muse", MUSE_COMMENTS),
            ("debug", DEBUG_COMMENTS),
        ];
        for (section, fields) in sections {
            for (field, comment) in *fields {
                comments.insert(format!("{}.{}", section, field), comment.to_string());
            }
        }

        comments
    }

    /// Comment out all fields in TOML and add comments.
    /// Also adds missing Option fields as commented-out `# field = null`
    fn comment_all_fields(toml: String, comments: HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# animex configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: HashSet<String> = HashSet::new();

        for line in toml.lines() {
            if let Some(section) = Self::extract_section_name(line) {
                current_section = section.clone();

                if let Some(header) = SECTION_HEADERS.iter().find(|(s, _)| s == &section) {
                    result.push_str(header.1);
                    result.push('\n');
                }

                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = Self::extract_field_path_simple(line, &current_section) {
                seen_fields.insert(field_path.clone());

                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }

                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else if line.trim().is_empty() {
                result.push('\n');
            } else {
                // Continuation lines of multi-line arrays
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            }
        }

        Self::add_missing_option_fields(result, &comments, &seen_fields)
    }

    /// Add missing Option fields that weren't serialized (because they're None)
    fn add_missing_option_fields(
        mut result: String,
        comments: &HashMap<String, String>,
        seen_fields: &HashSet<String>,
    ) -> String {
        let option_fields = ["file_loading.delimiter", "file_loading.has_header"];

        for field_path in option_fields {
            if seen_fields.contains(field_path) || !comments.contains_key(field_path) {
                continue;
            }
            let Some((section, field_name)) = field_path.split_once('.') else {
                continue;
            };
            let section_header = format!("# [{}]", section);
            let Some(section_pos) = result.find(&section_header) else {
                continue;
            };
            let after_header_start = section_pos + section_header.len();
            let newline_pos = result[after_header_start..].find('\n').unwrap_or(0);
            let insert_pos = after_header_start + newline_pos + 1;

            let mut new_content = String::new();
            if let Some(comment) = comments.get(field_path) {
                for comment_line in comment.lines() {
                    new_content.push_str("# ");
                    new_content.push_str(comment_line);
                    new_content.push('\n');
                }
            }
            new_content.push_str(&format!("# {} = null\n", field_name));
            result.insert_str(insert_pos, &new_content);
        }

        result
    }

    /// Extract section name from TOML line like "[display]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') && !trimmed.contains(['=', '"']) {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    /// Extract field path ("section.field") from a `field = value` line
    fn extract_field_path_simple(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }

        let eq_pos = trimmed.find('=')?;
        let field_name = trimmed[..eq_pos].trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, self.generate_default_config())?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub cache: CacheConfig,
    pub display: DisplayConfig,
    pub muse: MuseConfig,
    pub debug: DebugConfig,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "file_loading",
        "# ============================================================================\n# File Loading\n# ============================================================================",
    ),
    (
        "cache",
        "# ============================================================================\n# Loaded Table Cache\n# ============================================================================",
    ),
    (
        "display",
        "# ============================================================================\n# Display Settings\n# ============================================================================",
    ),
    (
        "muse",
        "# ============================================================================\n# Content Generation (muse)\n# ============================================================================\n# The API key is read from the environment variable named by api_key_env.",
    ),
    (
        "debug",
        "# ============================================================================\n# Debug Settings\n# ============================================================================",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    /// Candidate names of the aired-from date column; the first present one is used.
    pub aired_from_columns: Vec<String>,
    /// Candidate names of the score column; the first present one is used.
    pub score_columns: Vec<String>,
    /// Columns coerced to whole numbers at load time.
    pub integer_columns: Vec<String>,
    /// Text values treated as missing in free-text columns.
    pub null_placeholders: Vec<String>,
    /// chrono formats tried, in order, when parsing the aired-from date.
    pub date_formats: Vec<String>,
}

const FILE_LOADING_COMMENTS: &[(&str, &str)] = &[
    (
        "delimiter",
        "Default delimiter for delimited files (as ASCII value, e.g., 44 for comma)\nIf not specified, it is chosen from the file extension",
    ),
    (
        "has_header",
        "Whether files have a header row\nnull = true",
    ),
    (
        "aired_from_columns",
        "Candidate names of the aired-from date column (first present wins)",
    ),
    (
        "score_columns",
        "Candidate names of the score column (first present wins)",
    ),
    (
        "integer_columns",
        "Columns coerced to whole numbers; values that do not parse become missing",
    ),
    (
        "null_placeholders",
        "Text values treated as missing in Title, Title English, Title Japanese, Synopsis and Studios",
    ),
    (
        "date_formats",
        "Date formats (chrono strftime syntax) tried in order for the aired-from column",
    ),
];

impl Default for FileLoadingConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: None,
            aired_from_columns: vec!["Aired From".to_string()],
            score_columns: vec!["Score".to_string(), "score".to_string()],
            integer_columns: ["Episodes", "Members", "Favorites"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            null_placeholders: ["nan", "NaN", "None", "null"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            date_formats: [
                "%Y-%m-%d",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%d %H:%M:%S",
                "%Y/%m/%d",
                "%b %d, %Y",
                "%B %d, %Y",
                "%d/%m/%Y",
                "%m/%d/%Y",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        let default = FileLoadingConfig::default();
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
        if other.aired_from_columns != default.aired_from_columns {
            self.aired_from_columns = other.aired_from_columns;
        }
        if other.score_columns != default.score_columns {
            self.score_columns = other.score_columns;
        }
        if other.integer_columns != default.integer_columns {
            self.integer_columns = other.integer_columns;
        }
        if other.null_placeholders != default.null_placeholders {
            self.null_placeholders = other.null_placeholders;
        }
        if other.date_formats != default.date_formats {
            self.date_formats = other.date_formats;
        }
    }
}

/// Default time-to-live of a cached table, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

const CACHE_COMMENTS: &[(&str, &str)] = &[(
    "ttl_secs",
    "Seconds a loaded table is reused before the source is read again (> 0)",
)];

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn merge(&mut self, other: Self) {
        if other.ttl_secs != CacheConfig::default().ttl_secs {
            self.ttl_secs = other.ttl_secs;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Max rows shown in the result table. Export always covers every filtered row.
    pub row_limit: usize,
    pub top_genres: usize,
    pub top_missing: usize,
    pub score_bins: usize,
}

const DISPLAY_COMMENTS: &[(&str, &str)] = &[
    (
        "row_limit",
        "Maximum rows shown in the result table (export is never truncated)",
    ),
    ("top_genres", "Number of genres in the top genres chart"),
    (
        "top_missing",
        "Number of columns listed in the data quality summary",
    ),
    ("score_bins", "Number of bins in the score histogram (> 0)"),
];

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            row_limit: 1000,
            top_genres: 20,
            top_missing: 8,
            score_bins: 30,
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.row_limit != default.row_limit {
            self.row_limit = other.row_limit;
        }
        if other.top_genres != default.top_genres {
            self.top_genres = other.top_genres;
        }
        if other.top_missing != default.top_missing {
            self.top_missing = other.top_missing;
        }
        if other.score_bins != default.score_bins {
            self.score_bins = other.score_bins;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MuseConfig {
    pub model: String,
    pub endpoint: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

const MUSE_COMMENTS: &[(&str, &str)] = &[
    ("model", "Model identifier sent to the content service"),
    (
        "endpoint",
        "Base URL of the content service; the model name is appended",
    ),
    (
        "api_key_env",
        "Name of the environment variable holding the API key",
    ),
    (
        "timeout_secs",
        "Request timeout in seconds (> 0). Failed requests are not retried",
    ),
];

impl Default for MuseConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl MuseConfig {
    pub fn merge(&mut self, other: Self) {
        let default = MuseConfig::default();
        if other.model != default.model {
            self.model = other.model;
        }
        if other.endpoint != default.endpoint {
            self.endpoint = other.endpoint;
        }
        if other.api_key_env != default.api_key_env {
            self.api_key_env = other.api_key_env;
        }
        if other.timeout_secs != default.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

const DEBUG_COMMENTS: &[(&str, &str)] = &[("enabled", "Enable debug logging by default")];

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled {
            self.enabled = true;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            cache: CacheConfig::default(),
            display: DisplayConfig::default(),
            muse: MuseConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        match ConfigManager::new(app_name) {
            Ok(manager) => Self::load_from(&manager),
            Err(_) => Ok(AppConfig::default()),
        }
    }

    /// Load configuration using the config file of the given manager
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let config_path = manager.config_path("config.toml");
        let mut config = AppConfig::default();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).map_err(|e| {
                eyre!(
                    "Failed to read config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;
            let user_config: AppConfig = toml::from_str(&content).map_err(|e| {
                eyre!(
                    "Failed to parse config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;
            config.merge(user_config);
        }

        config.validate().map_err(|e| {
            eyre!(
                "Invalid configuration in {}: {}",
                config_path.display(),
                e
            )
        })?;

        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.cache.merge(other.cache);
        self.display.merge(other.display);
        self.muse.merge(other.muse);
        self.debug.merge(other.debug);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.cache.ttl_secs == 0 {
            return Err(eyre!("cache.ttl_secs must be greater than 0"));
        }

        if self.display.score_bins == 0 {
            return Err(eyre!("display.score_bins must be greater than 0"));
        }

        if self.muse.timeout_secs == 0 {
            return Err(eyre!("muse.timeout_secs must be greater than 0"));
        }

        if self.file_loading.date_formats.is_empty() {
            return Err(eyre!("file_loading.date_formats must not be empty"));
        }

        Ok(())
    }
}
