use animex::export::{display_projection, display_window, write_display_window, write_export};
use animex::{apply, load_from_bytes, load_path, to_portable_bytes, FilterSpec, LoadOptions, DISPLAY_COLUMNS};
use color_eyre::Result;

mod common;
use common::*;

#[test]
fn test_header_follows_display_order_and_skips_absent_columns() -> Result<()> {
    let (_dir, table) = catalogue();
    let bytes = to_portable_bytes(&table, DISPLAY_COLUMNS)?;
    let text = String::from_utf8(bytes)?;
    let header = text.lines().next().unwrap();
    assert_eq!(
        header,
        "Title,Title English,Type,Episodes,Status,start_year,Score,Members,Favorites,Genres,Synopsis"
    );
    Ok(())
}

#[test]
fn test_unknown_columns_are_omitted() -> Result<()> {
    let (_dir, table) = catalogue();
    let bytes = to_portable_bytes(&table, &["Title", "Popularity"])?;
    let text = String::from_utf8(bytes)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Title");
    assert_eq!(lines[1..], CATALOGUE_TITLES);
    Ok(())
}

#[test]
fn test_round_trip_preserves_rows_and_missing_values() -> Result<()> {
    let (_dir, table) = catalogue();
    let filtered = apply(&table, &FilterSpec::new().with_sort("Score", true))?;
    let bytes = to_portable_bytes(&filtered, DISPLAY_COLUMNS)?;

    let reloaded = load_from_bytes(bytes, &LoadOptions::default())?;
    assert_eq!(reloaded.height(), filtered.height());
    assert_eq!(titles(&reloaded), titles(&filtered));
    assert_eq!(scores(&reloaded), scores(&filtered));
    assert_eq!(years(&reloaded), years(&filtered));
    assert_eq!(reloaded.genre_tokens(), filtered.genre_tokens());
    assert!(scores(&reloaded).contains(&None));
    Ok(())
}

#[test]
fn test_export_covers_all_rows_not_the_display_window() -> Result<()> {
    let (_dir, table) = catalogue();
    let window = display_window(&table, 2)?;
    assert_eq!(window.height(), 2);
    assert_eq!(display_projection(&table)?.height(), 5);

    let text = String::from_utf8(to_portable_bytes(&table, DISPLAY_COLUMNS)?)?;
    // Header plus one line per row; no field in the fixture spans lines.
    assert_eq!(text.lines().count(), 6);
    Ok(())
}

#[test]
fn test_display_window_is_written_as_csv() -> Result<()> {
    let (_dir, table) = catalogue();
    let mut out = Vec::new();
    assert_eq!(write_display_window(&mut out, &table, 2)?, 2);

    let text = String::from_utf8(out)?;
    let mut lines = text.lines();
    assert!(lines
        .next()
        .is_some_and(|header| header.starts_with("Title,Title English,Type,")));
    assert_eq!(lines.count(), 2);
    assert!(text.contains(CATALOGUE_TITLES[0]));
    assert!(!text.contains(CATALOGUE_TITLES[2]));

    let mut all = Vec::new();
    assert_eq!(write_display_window(&mut all, &table, 100)?, 5);
    Ok(())
}

#[test]
fn test_write_export_compresses_by_extension() -> Result<()> {
    let (dir, table) = catalogue();
    let path = dir.path().join("results.csv.gz");
    write_export(&table, &path, DISPLAY_COLUMNS)?;

    let reloaded = load_path(&path, &LoadOptions::default())?;
    assert_eq!(titles(&reloaded), CATALOGUE_TITLES);
    assert_eq!(scores(&reloaded), scores(&table));
    Ok(())
}
