use animex::{load_from_bytes, load_path, CompressionFormat, LoadOptions};
use color_eyre::Result;
use polars::prelude::*;
use std::fs::File;
use std::io::Write;

mod common;
use common::*;

#[test]
fn test_load_normalizes_catalogue() -> Result<()> {
    let (_dir, table) = catalogue();
    assert_eq!(table.height(), 5);
    assert_eq!(titles(&table), CATALOGUE_TITLES);

    assert_eq!(
        scores(&table),
        vec![Some(8.75), Some(8.16), None, Some(7.2), None]
    );
    assert_eq!(
        years(&table),
        vec![Some(1998), Some(1988), None, Some(2010), None]
    );

    let caps = table.capabilities();
    assert!(caps.has_title && caps.has_title_english && caps.has_synopsis);
    assert!(caps.has_type && caps.has_status && caps.has_genres);
    assert!(caps.has_score && caps.has_year && caps.has_members && caps.has_favorites);

    let df = table.frame();
    assert_eq!(df.column("Aired From")?.dtype(), &DataType::Date);
    assert_eq!(df.column("Members")?.dtype(), &DataType::Int64);
    let members: Vec<Option<i64>> = df.column("Members")?.i64()?.into_iter().collect();
    assert_eq!(
        members,
        vec![Some(1_800_000), Some(600_000), Some(5000), Some(20_000), None]
    );
    Ok(())
}

#[test]
fn test_missing_text_becomes_empty_string() -> Result<()> {
    let (_dir, table) = catalogue();
    let df = table.frame();
    for column in ["Title English", "Synopsis", "Genres"] {
        assert_eq!(df.column(column)?.null_count(), 0, "{} has nulls", column);
    }
    let english: Vec<&str> = df
        .column("Title English")?
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or("<null>"))
        .collect();
    assert_eq!(english[2], "");
    assert_eq!(english[4], "");
    Ok(())
}

#[test]
fn test_genre_tokens_are_trimmed() {
    let (_dir, table) = catalogue();
    let tokens = table.genre_tokens();
    assert_eq!(tokens[0], vec!["Action", "Sci-Fi"]);
    assert_eq!(tokens[3], vec!["Slice of Life", "Comedy"]);
    assert!(tokens[4].is_empty());
}

#[test]
fn test_header_whitespace_and_score_alias() -> Result<()> {
    let (_dir, path) = write_fixture(
        "padded.csv",
        " Title ,  score,Aired From \nA,9.1,2001-10-03\nB,oops,\n",
    );
    let table = load_path(&path, &LoadOptions::default())?;
    assert!(table.has_column("Title"));
    assert!(table.has_column("Aired From"));
    assert!(table.capabilities().has_score);
    assert_eq!(scores(&table), vec![Some(9.1), None]);
    assert_eq!(years(&table), vec![Some(2001), None]);
    Ok(())
}

#[test]
fn test_headers_equal_after_trimming_keep_first() -> Result<()> {
    let table = load_from_bytes(b"Title, Title\nA,B\n".to_vec(), &LoadOptions::default())?;
    assert_eq!(table.height(), 1);
    assert_eq!(titles(&table), vec!["A"]);
    assert!(table.has_column(" Title"));
    let second = table.frame().column(" Title")?.str()?.get(0).map(str::to_string);
    assert_eq!(second.as_deref(), Some("B"));
    Ok(())
}

#[test]
fn test_absent_optional_columns() -> Result<()> {
    let (_dir, path) = write_fixture("titles.csv", "Title\nOnly\nTitles\n");
    let table = load_path(&path, &LoadOptions::default())?;
    let caps = table.capabilities();
    assert!(caps.has_title);
    assert!(!caps.has_score && !caps.has_year && !caps.has_genres && !caps.has_type);
    // Derived columns exist but carry no data.
    assert_eq!(scores(&table), vec![None, None]);
    assert_eq!(years(&table), vec![None, None]);
    assert!(table.genre_tokens().iter().all(Vec::is_empty));
    Ok(())
}

#[test]
fn test_unreadable_source_fails_whole_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.csv");
    let err = load_path(&path, &LoadOptions::default()).unwrap_err();
    assert!(
        err.to_string().starts_with("Could not read source"),
        "unexpected error: {}",
        err
    );
    assert!(err
        .chain()
        .any(|cause| cause.downcast_ref::<std::io::Error>().is_some()));
}

#[test]
fn test_tab_separated_by_extension() -> Result<()> {
    let (_dir, path) = write_fixture("anime.tsv", "Title\tScore\nA, with comma\t7\n");
    let table = load_path(&path, &LoadOptions::default())?;
    assert_eq!(titles(&table), vec!["A, with comma"]);
    assert_eq!(scores(&table), vec![Some(7.0)]);
    Ok(())
}

#[test]
fn test_explicit_delimiter() -> Result<()> {
    let (_dir, path) = write_fixture("anime.txt", "Title;Score\nA;6.5\n");
    let table = load_path(&path, &LoadOptions::default().with_delimiter(b';'))?;
    assert_eq!(scores(&table), vec![Some(6.5)]);
    Ok(())
}

#[test]
fn test_gzip_source_is_decompressed() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("anime.csv.gz");
    let mut encoder =
        flate2::write::GzEncoder::new(File::create(&path)?, flate2::Compression::default());
    encoder.write_all(CATALOGUE_CSV.as_bytes())?;
    encoder.finish()?;

    let table = load_path(&path, &LoadOptions::default())?;
    assert_eq!(titles(&table), CATALOGUE_TITLES);
    Ok(())
}

#[test]
fn test_explicit_compression_overrides_extension() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("anime.data");
    let mut encoder = zstd::Encoder::new(File::create(&path)?, 0)?;
    encoder.write_all(b"Title,Score\nA,5\n")?;
    encoder.finish()?;

    let opts = LoadOptions::default().with_compression(CompressionFormat::Zstd);
    let table = load_path(&path, &opts)?;
    assert_eq!(scores(&table), vec![Some(5.0)]);
    Ok(())
}

#[test]
fn test_typed_frame_round_trips_through_csv() -> Result<()> {
    let mut df = df!(
        "Title" => ["A", "B"],
        "Score" => [Some(7.5), None],
        "Episodes" => [Some(12i64), None]
    )?;
    let (_dir, path) = write_frame("typed.csv", &mut df);
    let table = load_csv(&path);
    assert_eq!(scores(&table), vec![Some(7.5), None]);
    let episodes: Vec<Option<i64>> = table.frame().column("Episodes")?.i64()?.into_iter().collect();
    assert_eq!(episodes, vec![Some(12), None]);
    Ok(())
}
