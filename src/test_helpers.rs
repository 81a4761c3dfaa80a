//! Shared test utilities.
//!
//! Provides temp-dir layouts mirroring a real site checkout and lookup
//! helpers over [`ScanReport`] that panic with the available ids on a miss.

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::config::ConvertConfig;
use crate::scan::{Incomplete, PostMatch, ScanReport};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/notebooks/` into `<tmp>/notebooks` and return the temp dir.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/notebooks");
    let dest = tmp.path().join("notebooks");
    fs::create_dir_all(&dest).unwrap();
    for entry in fs::read_dir(&fixtures).unwrap() {
        let entry = entry.unwrap();
        fs::copy(entry.path(), dest.join(entry.file_name())).unwrap();
    }
    tmp
}

/// Config pointing at `<root>/notebooks`, `<root>/_posts`, `<root>/images`.
pub fn config_for(root: &Path) -> ConvertConfig {
    let mut config = ConvertConfig::default();
    config.paths.notebooks = root.join("notebooks");
    config.paths.posts = root.join("_posts");
    config.paths.images = root.join("images");
    config
}

/// Empty notebook, post, and image directories.
pub fn empty_layout() -> (TempDir, ConvertConfig) {
    let tmp = TempDir::new().unwrap();
    let config = config_for(tmp.path());
    create_dirs(&config);
    (tmp, config)
}

/// Fixture notebooks plus empty post and image directories.
pub fn fixture_layout() -> (TempDir, ConvertConfig) {
    let tmp = setup_fixtures();
    let config = config_for(tmp.path());
    create_dirs(&config);
    (tmp, config)
}

fn create_dirs(config: &ConvertConfig) {
    for dir in [
        &config.paths.notebooks,
        &config.paths.posts,
        &config.paths.images,
    ] {
        fs::create_dir_all(dir).unwrap();
    }
}

/// Write a file into the configured notebook directory.
pub fn write_notebook_dir(config: &ConvertConfig, name: &str, content: &str) {
    fs::write(config.paths.notebooks.join(name), content).unwrap();
}

/// Sorted filenames in the posts directory.
pub fn post_names(config: &ConvertConfig) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(&config.paths.posts)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

// =========================================================================
// Report lookups
// =========================================================================

pub fn match_ids(report: &ScanReport) -> Vec<&str> {
    report
        .matches
        .iter()
        .map(|m| m.logical_id.as_str())
        .collect()
}

pub fn unmatched_ids(report: &ScanReport) -> Vec<&str> {
    report
        .unmatched
        .iter()
        .map(|i| i.partial.logical_id.as_str())
        .collect()
}

/// Find a complete match by logical id. Panics if not found.
pub fn find_match<'a>(report: &'a ScanReport, logical_id: &str) -> &'a PostMatch {
    report
        .matches
        .iter()
        .find(|m| m.logical_id == logical_id)
        .unwrap_or_else(|| {
            let ids = match_ids(report);
            panic!("match '{logical_id}' not found. Available: {ids:?}")
        })
}

/// Find an incomplete candidate by logical id. Panics if not found.
pub fn find_unmatched<'a>(report: &'a ScanReport, logical_id: &str) -> &'a Incomplete {
    report
        .unmatched
        .iter()
        .find(|i| i.partial.logical_id == logical_id)
        .unwrap_or_else(|| {
            let ids = unmatched_ids(report);
            panic!("unmatched '{logical_id}' not found. Available: {ids:?}")
        })
}
