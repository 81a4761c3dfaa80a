//! Conversion driver.
//!
//! Ties the stages together: scan the notebook directory, report every
//! incomplete candidate, then assemble the complete ones one at a time in
//! logical-id order. Everything runs on the calling thread; progress is
//! delivered as [`ConvertEvent`]s to a caller-supplied sink as it happens.
//!
//! ## Failure policy
//!
//! | Condition | Default | `keep_going` |
//! |---|---|---|
//! | Only one half of a pair found | reported, skipped | reported, skipped |
//! | Several front-matter files for one id | reported, skipped | reported, skipped |
//! | Notebook fails to render | run stops | reported, skipped |
//! | Filesystem read/write fails | run stops | run stops |
//!
//! Posts and images written before a stop stay on disk, and every image is
//! reported as soon as it is written.

use crate::assemble::{self, AssembleError};
use crate::config::ConvertConfig;
use crate::naming::FileKind;
use crate::render::NotebookRenderer;
use crate::scan::{self, ScanError, ScanReport};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Progress reported while a run is underway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertEvent {
    /// A logical id with only one half; nothing is written for it.
    Unmatched {
        logical_id: String,
        present: Option<String>,
        missing: Vec<FileKind>,
    },
    /// Several front-matter files claim one logical id; nothing is written
    /// for it.
    Ambiguous {
        logical_id: String,
        front_matter: Vec<String>,
    },
    ImageWritten {
        logical_id: String,
        path: PathBuf,
        bytes: usize,
    },
    PostWritten {
        logical_id: String,
        path: PathBuf,
        bytes: usize,
    },
    /// Rendering failed and `keep_going` is set.
    RenderSkipped {
        logical_id: String,
        notebook: String,
        error: String,
    },
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub posts_written: usize,
    pub images_written: usize,
    pub unmatched: usize,
    pub ambiguous: usize,
    pub skipped: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} posts, {} images, {} unmatched, {} ambiguous, {} skipped",
            self.posts_written,
            self.images_written,
            self.unmatched,
            self.ambiguous,
            self.skipped
        )
    }
}

/// Scan `config.paths.notebooks` and convert every complete candidate.
pub fn run(
    config: &ConvertConfig,
    renderer: &impl NotebookRenderer,
    on_event: impl FnMut(ConvertEvent),
) -> Result<RunSummary, ConvertError> {
    let report = scan::scan(&config.paths.notebooks, &config.naming)?;
    convert_report(report, config, renderer, on_event)
}

/// Convert an already-scanned report.
pub fn convert_report(
    report: ScanReport,
    config: &ConvertConfig,
    renderer: &impl NotebookRenderer,
    mut on_event: impl FnMut(ConvertEvent),
) -> Result<RunSummary, ConvertError> {
    let mut summary = RunSummary::default();

    for incomplete in report.unmatched {
        summary.unmatched += 1;
        on_event(ConvertEvent::Unmatched {
            present: incomplete.present().map(str::to_string),
            logical_id: incomplete.partial.logical_id,
            missing: incomplete.missing,
        });
    }

    for ambiguous in report.ambiguous {
        summary.ambiguous += 1;
        on_event(ConvertEvent::Ambiguous {
            logical_id: ambiguous.logical_id,
            front_matter: ambiguous.front_matter,
        });
    }

    for post in report.matches {
        let result = assemble::assemble(renderer, &post, config, |image| {
            summary.images_written += 1;
            on_event(ConvertEvent::ImageWritten {
                logical_id: post.logical_id.clone(),
                path: image.path.clone(),
                bytes: image.bytes,
            });
        });
        match result {
            Ok(assembled) => {
                summary.posts_written += 1;
                on_event(ConvertEvent::PostWritten {
                    logical_id: assembled.logical_id,
                    path: assembled.post_path,
                    bytes: assembled.bytes_written,
                });
            }
            Err(err) if err.is_render_failure() && config.run.keep_going => {
                summary.skipped += 1;
                on_event(ConvertEvent::RenderSkipped {
                    logical_id: post.logical_id,
                    notebook: post.notebook,
                    error: err.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(summary)
}
