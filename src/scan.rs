//! Pairing front-matter files with notebooks.
//!
//! Stage 1 of a conversion run. Lists the notebook directory and produces a
//! [`ScanReport`]: every logical id that has both halves becomes a
//! [`PostMatch`], every logical id with only one half becomes an
//! [`Incomplete`] entry, and every logical id claimed by more than one
//! front-matter file becomes an [`Ambiguous`] entry. The caller reports and
//! skips the last two; neither stops the run.
//!
//! ## Algorithm
//!
//! Matching runs in explicit passes so the result never depends on the order
//! the filesystem lists entries in:
//!
//! 1. **Classify**: each filename is parsed by [`naming::classify`] into a
//!    [`SourceFile`] or ignored.
//! 2. **Group**: classified files are grouped by logical id into
//!    [`PartialMatch`] records (`BTreeMap`, so ids come out sorted).
//! 3. **Finalize**: each group becomes [`MatchOutcome::Complete`],
//!    [`MatchOutcome::Incomplete`] listing the missing halves, or
//!    [`MatchOutcome::Ambiguous`].
//!
//! ## Validation
//!
//! - An unreadable notebook directory is an error.
//! - Two front-matter files for the same logical id
//!   (`2024-01-01-x.md`, `2024-02-01-x.md`) make that id ambiguous. It is
//!   skipped; every other pair still converts.
//! - Unmatched halves are not errors.

use crate::config::NamingConfig;
use crate::naming::{self, FileKind, SourceFile};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read notebook directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A logical id with both halves present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMatch {
    /// Notebook filename, e.g. `hiking.ipynb`.
    pub notebook: String,
    /// Front-matter filename, e.g. `2024-01-01-hiking.md`. Also the name of
    /// the published post.
    pub front_matter: String,
    pub logical_id: String,
}

/// Files seen for one logical id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialMatch {
    pub logical_id: String,
    /// Sorted. More than one entry makes the id ambiguous.
    pub front_matter: Vec<String>,
    pub notebook: Option<String>,
}

/// A logical id that lacks one or both halves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incomplete {
    pub partial: PartialMatch,
    pub missing: Vec<FileKind>,
}

impl Incomplete {
    /// The file that was found, if any.
    pub fn present(&self) -> Option<&str> {
        self.partial
            .front_matter
            .first()
            .map(String::as_str)
            .or(self.partial.notebook.as_deref())
    }
}

/// A logical id claimed by several front-matter files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguous {
    pub logical_id: String,
    /// All claimants, sorted by name.
    pub front_matter: Vec<String>,
    pub notebook: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Complete(PostMatch),
    Incomplete(Incomplete),
    Ambiguous(Ambiguous),
}

impl PartialMatch {
    fn new(logical_id: &str) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            front_matter: Vec::new(),
            notebook: None,
        }
    }

    /// Freeze the record into a match, an incomplete report, or an
    /// ambiguity report.
    pub fn finalize(mut self) -> MatchOutcome {
        if self.front_matter.len() > 1 {
            return MatchOutcome::Ambiguous(Ambiguous {
                logical_id: self.logical_id,
                front_matter: self.front_matter,
                notebook: self.notebook,
            });
        }
        match (self.front_matter.pop(), self.notebook) {
            (Some(front_matter), Some(notebook)) => MatchOutcome::Complete(PostMatch {
                notebook,
                front_matter,
                logical_id: self.logical_id,
            }),
            (front_matter, notebook) => {
                let mut missing = Vec::new();
                if front_matter.is_none() {
                    missing.push(FileKind::FrontMatter);
                }
                if notebook.is_none() {
                    missing.push(FileKind::Notebook);
                }
                MatchOutcome::Incomplete(Incomplete {
                    partial: PartialMatch {
                        logical_id: self.logical_id,
                        front_matter: front_matter.into_iter().collect(),
                        notebook,
                    },
                    missing,
                })
            }
        }
    }
}

/// Outcome of scanning a notebook directory.
///
/// Every list is ordered by logical id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub matches: Vec<PostMatch>,
    pub unmatched: Vec<Incomplete>,
    pub ambiguous: Vec<Ambiguous>,
}

impl FromIterator<MatchOutcome> for ScanReport {
    fn from_iter<I: IntoIterator<Item = MatchOutcome>>(iter: I) -> Self {
        let mut report = ScanReport::default();
        for outcome in iter {
            match outcome {
                MatchOutcome::Complete(m) => report.matches.push(m),
                MatchOutcome::Incomplete(i) => report.unmatched.push(i),
                MatchOutcome::Ambiguous(a) => report.ambiguous.push(a),
            }
        }
        report
    }
}

pub fn scan(dir: &Path, naming: &NamingConfig) -> Result<ScanReport, ScanError> {
    let names = list_files(dir)?;
    let files = classify_entries(&names, naming);
    let groups = group_by_logical_id(files);
    Ok(groups.into_values().map(PartialMatch::finalize).collect())
}

/// List regular-file names in `dir`, sorted.
///
/// Subdirectories and names that are not valid UTF-8 are skipped.
pub fn list_files(dir: &Path) -> Result<Vec<String>, ScanError> {
    let read = fs::read_dir(dir).map_err(|source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut names: Vec<String> = read
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}

/// Pass 1: keep the entries that follow one of the two conventions.
pub fn classify_entries(names: &[String], naming: &NamingConfig) -> Vec<SourceFile> {
    names
        .iter()
        .filter_map(|name| naming::classify(name, naming))
        .collect()
}

/// Pass 2: group classified files by logical id.
///
/// A notebook name is its logical id plus a fixed extension, so only front
/// matter can appear more than once per id.
pub fn group_by_logical_id(files: Vec<SourceFile>) -> BTreeMap<String, PartialMatch> {
    let mut groups: BTreeMap<String, PartialMatch> = BTreeMap::new();
    for file in files {
        let group = groups
            .entry(file.logical_id.clone())
            .or_insert_with(|| PartialMatch::new(&file.logical_id));
        match file.kind {
            FileKind::FrontMatter => group.front_matter.push(file.name),
            FileKind::Notebook => group.notebook = Some(file.name),
        }
    }
    for group in groups.values_mut() {
        group.front_matter.sort();
    }
    groups
}
