use std::io::Write;
use std::path::Path;

use animex::error_display::user_message_from_report;
use animex::export::{write_display_window, write_export};
use animex::schema::{STATUS, TYPE};
use animex::statistics::{distinct_values, sortable_columns};
use animex::{
    apply, extract_vocabulary, input_source, to_portable_bytes, AppConfig, Args, Command,
    ConfigManager, Dashboard, FilterSpec, LoadOptions, OutputFormat, RecordTable, TableCache,
    APP_NAME, DISPLAY_COLUMNS,
};
use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(debug: bool) {
    let default_filter = if debug { "animex=debug" } else { "animex=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_options(args: &Args, config: &AppConfig) -> LoadOptions {
    let mut opts = LoadOptions::from_config(&config.file_loading);
    if let Some(delimiter) = args.delimiter {
        opts = opts.with_delimiter(delimiter);
    }
    if args.no_header {
        opts = opts.with_has_header(false);
    }
    if let Some(compression) = args.compression {
        opts = opts.with_compression(compression);
    }
    if let Some(format) = args.format {
        opts = opts.with_format(format);
    }
    opts
}

/// Overlay the command-line filter flags on the defaults derived from the table.
fn filter_spec(args: &Args, base: FilterSpec) -> FilterSpec {
    let mut spec = base
        .with_types(args.types.iter().cloned())
        .with_statuses(args.statuses.iter().cloned())
        .with_genres(args.genres.iter().cloned())
        .with_score_range(args.score_min, args.score_max)
        .with_include_missing_years(!args.exclude_missing_years);
    if args.year_min.is_some() {
        spec.year_min = args.year_min;
    }
    if args.year_max.is_some() {
        spec.year_max = args.year_max;
    }
    if let Some(search) = &args.search {
        spec = spec.with_search_text(search.clone());
    }
    if let Some(column) = &args.sort_by {
        spec = spec.with_sort(column.clone(), args.ascending);
    }
    spec
}

/// The values requested by a `--list-*` flag, if any was given.
fn listing(args: &Args, table: &RecordTable) -> Result<Option<Vec<String>>> {
    if args.list_genres {
        return Ok(Some(extract_vocabulary(table)));
    }
    if args.list_types {
        return Ok(Some(distinct_values(table, TYPE)?));
    }
    if args.list_statuses {
        return Ok(Some(distinct_values(table, STATUS)?));
    }
    if args.list_sortable {
        return Ok(Some(sortable_columns(table)));
    }
    Ok(None)
}

fn check_sort_column(args: &Args, table: &RecordTable) -> Result<()> {
    let Some(column) = &args.sort_by else {
        return Ok(());
    };
    let sortable = sortable_columns(table);
    if sortable.iter().any(|c| c == column) {
        return Ok(());
    }
    Err(eyre!(
        "Cannot sort by {:?}; sortable columns: {}",
        column,
        if sortable.is_empty() {
            "none".to_string()
        } else {
            sortable.join(", ")
        }
    ))
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        let path = manager.write_default_config(args.force)?;
        println!("Configuration written to {}", path.display());
        return Ok(Some(()));
    }
    Ok(None)
}

#[cfg(feature = "http")]
fn run_muse(args: &animex::MuseArgs, config: &AppConfig) -> Result<()> {
    use animex::muse::{ContentClient, GeminiClient, PromptRequest};

    let prompt = PromptRequest::from(args).compose_prompt();
    debug!(%prompt, "composed prompt");
    let mut client = GeminiClient::from_config(&config.muse)?;
    if let Some(model) = &args.model {
        client = client.with_model(model.clone());
    }
    let text = client.generate(&prompt)?;
    println!("{}", text);
    Ok(())
}

#[cfg(not(feature = "http"))]
fn run_muse(_args: &animex::MuseArgs, _config: &AppConfig) -> Result<()> {
    Err(eyre!("animex was built without the `http` feature"))
}

fn print_summary(
    args: &Args,
    config: &AppConfig,
    full: &RecordTable,
    filtered: &RecordTable,
) -> Result<()> {
    let mut display = config.display.clone();
    if let Some(rows) = args.rows {
        display.row_limit = rows;
    }
    if let Some(top) = args.top_genres {
        display.top_genres = top;
    }
    let dashboard = Dashboard::build(full, filtered, &display)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &dashboard)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            write!(out, "{}", dashboard.render_text())?;
            let shown = display.row_limit.min(filtered.height());
            writeln!(out, "\nResults table (first {} of {} rows)", shown, filtered.height())?;
            write_display_window(&mut out, filtered, display.row_limit)?;
        }
    }
    Ok(())
}

fn run(args: &Args, config: &AppConfig) -> Result<()> {
    if let Some(Command::Muse(muse)) = &args.command {
        return run_muse(muse, config);
    }

    let path = args
        .path
        .as_deref()
        .ok_or_else(|| eyre!("A data file path is required"))?;
    let source = input_source(path);
    let cache = TableCache::with_ttl(std::time::Duration::from_secs(config.cache.ttl_secs));
    let full = cache.get_or_load(&source, &load_options(args, config))?;

    if let Some(values) = listing(args, &full)? {
        for value in values {
            println!("{}", value);
        }
        return Ok(());
    }
    check_sort_column(args, &full)?;

    let spec = filter_spec(args, FilterSpec::for_table(&full)?);
    debug!(?spec, "filter specification");
    let filtered = apply(&full, &spec)?;

    match args.export.as_deref() {
        Some(dest) if dest == Path::new("-") => {
            std::io::stdout().write_all(&to_portable_bytes(&filtered, DISPLAY_COLUMNS)?)?;
            return Ok(());
        }
        Some(dest) => write_export(&filtered, dest, DISPLAY_COLUMNS)?,
        None => {}
    }

    print_summary(args, config, &full, &filtered)
}

fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    let config = match AppConfig::load(APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}. Using default configuration.", e);
            AppConfig::default()
        }
    };
    init_tracing(args.debug || config.debug.enabled);

    if let Err(e) = run(&args, &config) {
        warn!(error = %e, "run failed");
        eprintln!("Error: {}", user_message_from_report(&e));
        std::process::exit(1);
    }
    Ok(())
}
