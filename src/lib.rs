//! # nb2post
//!
//! Turns Jupyter notebooks into blog posts for a Jekyll-style site. A post is
//! written in two files that sit side by side in the notebook directory: a
//! dated front-matter file (`2024-01-01-hiking.md`) and the notebook that
//! supplies its body (`hiking.ipynb`).
//!
//! # Pipeline
//!
//! ```text
//! 1. Scan      notebooks/  →  ScanReport          (pair files by logical id)
//! 2. Assemble  per pair    →  _posts/ + images/   (render, relocate, concatenate)
//! ```
//!
//! The [`convert`] driver runs both stages sequentially on the calling
//! thread. Everything it needs (directories, naming rules, failure policy,
//! renderer) is passed in; there is no global state.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Filename conventions: dated front matter vs. notebook |
//! | [`scan`] | Stage 1: classify, group by logical id, split complete from incomplete |
//! | [`render`] | [`render::NotebookRenderer`] trait and the native nbformat 4 renderer |
//! | [`assemble`] | Stage 2: write outputs to the images directory, rewrite links, write the post |
//! | [`convert`] | Driver: runs the stages, reports events, applies the failure policy |
//! | [`config`] | `nb2post.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Renderer as a Trait
//!
//! Rendering is the one step with real complexity that the rest of the
//! pipeline does not care about. Behind [`render::NotebookRenderer`] the
//! assembler can be tested with canned markup and outputs, and the
//! production renderer can be swapped without touching file handling.
//!
//! ## Deterministic Runs
//!
//! Candidates are processed in logical-id order and outputs in output-id
//! order, so two runs over the same inputs write byte-identical files and
//! print identical logs.

pub mod assemble;
pub mod config;
pub mod convert;
pub mod naming;
pub mod output;
pub mod render;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
