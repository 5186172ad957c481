#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use animex::{load_path, LoadOptions, RecordTable};
use polars::prelude::*;
use tempfile::TempDir;

/// Small catalogue covering present, missing and malformed values.
///
/// | row | Title        | Score | start_year | Genres                        |
/// |-----|--------------|-------|------------|-------------------------------|
/// | 0   | Cowboy Bebop | 8.75  | 1998       | Action, Sci-Fi                |
/// | 1   | Akira        | 8.16  | 1988       | Action, Sci-Fi, Horror        |
/// | 2   | Mystery Show | -     | -          | Comedy                        |
/// | 3   | Slice Story  | 7.2   | 2010       | Slice of Life, Comedy         |
/// | 4   | Unknown Gem  | nan   | bad date   | -                             |
pub const CATALOGUE_CSV: &str = "\
Title,Title English,Synopsis,Genres,Type,Status,Score,Aired From,Members,Favorites,Episodes
Cowboy Bebop,Cowboy Bebop,Bounty hunters drifting through space,\"Action, Sci-Fi\",TV,Finished Airing,8.75,1998-04-03,1800000,80000,26
Akira,Akira,Psychic war in Neo-Tokyo,\"Action, Sci-Fi, Horror\",Movie,Finished Airing,8.16,1988-07-16,600000,9000,1
Mystery Show,,A quiet comedy,Comedy,TV,Currently Airing,,,5000,,12
Slice Story,Slice Story,Everyday life at school,\"Slice of Life,  Comedy \",TV,Finished Airing,7.2,2010-01-05,20000,100,12
Unknown Gem,,,,OVA,Not yet aired,nan,not a date,unknown,3,
";

pub const CATALOGUE_TITLES: [&str; 5] = [
    "Cowboy Bebop",
    "Akira",
    "Mystery Show",
    "Slice Story",
    "Unknown Gem",
];

/// Write `contents` to `name` inside a fresh temporary directory.
pub fn write_fixture(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    (dir, path)
}

/// Write a polars frame as CSV inside a fresh temporary directory.
pub fn write_frame(name: &str, df: &mut DataFrame) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    (dir, path)
}

pub fn load_csv(path: &Path) -> RecordTable {
    load_path(path, &LoadOptions::default()).unwrap()
}

/// The catalogue fixture, loaded. Keep the `TempDir` alive while the path is in use.
pub fn catalogue() -> (TempDir, RecordTable) {
    let (dir, path) = write_fixture("anime.csv", CATALOGUE_CSV);
    let table = load_csv(&path);
    (dir, table)
}

pub fn titles(table: &RecordTable) -> Vec<String> {
    table
        .frame()
        .column("Title")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect()
}

pub fn scores(table: &RecordTable) -> Vec<Option<f64>> {
    table
        .frame()
        .column("Score")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

pub fn years(table: &RecordTable) -> Vec<Option<i32>> {
    table
        .frame()
        .column("start_year")
        .unwrap()
        .i32()
        .unwrap()
        .into_iter()
        .collect()
}
