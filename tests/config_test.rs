use animex::{AppConfig, ConfigManager, LoadOptions};
use color_eyre::Result;
use std::fs;

#[test]
fn test_default_config_is_valid() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.version, "0.1");
    assert_eq!(config.cache.ttl_secs, 600);
    assert_eq!(config.display.row_limit, 1000);
    assert_eq!(config.display.top_genres, 20);
    assert_eq!(config.display.top_missing, 8);
    assert_eq!(config.display.score_bins, 30);
    assert_eq!(config.muse.api_key_env, "GEMINI_API_KEY");
    assert_eq!(config.file_loading.score_columns, vec!["Score", "score"]);
}

#[test]
fn test_generated_config_is_fully_commented() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manager = ConfigManager::with_dir(dir.path().to_path_buf());
    let text = manager.generate_default_config();

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        assert!(line.starts_with('#'), "uncommented line: {}", line);
    }
    assert!(text.contains("# [file_loading]"));
    assert!(text.contains("# delimiter = null"));
    assert!(text.contains("# ttl_secs = 600"));

    // Parsing the template yields the defaults.
    let parsed: AppConfig = toml::from_str(&text)?;
    assert_eq!(parsed.display.row_limit, AppConfig::default().display.row_limit);
    Ok(())
}

#[test]
fn test_write_default_config_respects_force() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manager = ConfigManager::with_dir(dir.path().join("animex"));

    let path = manager.write_default_config(false)?;
    assert!(path.exists());
    assert!(manager.write_default_config(false).is_err());
    assert_eq!(manager.write_default_config(true)?, path);
    Ok(())
}

#[test]
fn test_user_file_overrides_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manager = ConfigManager::with_dir(dir.path().to_path_buf());
    fs::write(
        manager.config_path("config.toml"),
        r#"
[file_loading]
delimiter = 59
score_columns = ["Rating"]

[display]
row_limit = 50
"#,
    )?;

    let config = AppConfig::load_from(&manager)?;
    assert_eq!(config.display.row_limit, 50);
    assert_eq!(config.display.top_genres, 20);
    assert_eq!(config.file_loading.delimiter, Some(b';'));

    let opts = LoadOptions::from_config(&config.file_loading);
    assert_eq!(opts.delimiter, Some(b';'));
    assert_eq!(opts.score_columns, vec!["Rating"]);
    Ok(())
}

#[test]
fn test_invalid_values_are_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manager = ConfigManager::with_dir(dir.path().to_path_buf());
    fs::write(manager.config_path("config.toml"), "[cache]\nttl_secs = 0\n")?;
    assert!(AppConfig::load_from(&manager).is_err());

    fs::write(manager.config_path("config.toml"), "version = \"2.0\"\n")?;
    assert!(AppConfig::load_from(&manager).is_err());

    fs::write(manager.config_path("config.toml"), "[display\n")?;
    assert!(AppConfig::load_from(&manager).is_err());
    Ok(())
}

#[test]
fn test_missing_file_uses_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manager = ConfigManager::with_dir(dir.path().join("nowhere"));
    let config = AppConfig::load_from(&manager)?;
    assert_eq!(config.cache.ttl_secs, AppConfig::default().cache.ttl_secs);
    Ok(())
}
