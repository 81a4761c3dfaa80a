//! Post assembly.
//!
//! Stage 2 of a conversion run, executed once per [`PostMatch`]:
//!
//! ```text
//! 1. Render      notebooks/hiking.ipynb   →  markup + { "output_1_0.png": bytes }
//! 2. Relocate    output_1_0.png           →  assets/images/hiking_1_0.png
//!                ](output_1_0.png)        →  ](/assets/images/hiking_1_0.png)
//! 3. Concatenate front matter bytes ++ rewritten markup
//! 4. Write       _posts/2024-01-01-hiking.md
//! ```
//!
//! ## Output naming
//!
//! Renderer output ids are only unique within one notebook, so every id has
//! its output token (`"output"` by default) replaced with the logical id.
//! Every output the renderer reports is written, whether or not the markup
//! links to it.
//!
//! ## Site references
//!
//! Links are rewritten to the image path as seen from the site root: a
//! leading `./` on the images directory loses its `.`, so
//! `./assets/images` is linked as `/assets/images/...`. A relative directory
//! without `./` is linked as-is.
//!
//! ## Concatenation
//!
//! The post is the front-matter file's bytes followed directly by the
//! markup. No separator is inserted; a front-matter file that should be
//! followed by a blank line has to end with one.

use crate::config::ConvertConfig;
use crate::render::{NotebookRenderer, RenderError, RenderedNotebook};
use crate::scan::PostMatch;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("failed to render '{logical_id}': {source}")]
    Render {
        logical_id: String,
        #[source]
        source: RenderError,
    },
    #[error("failed to read front matter {path}: {source}")]
    ReadFrontMatter {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write image {path}: {source}")]
    WriteImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write post {path}: {source}")]
    WritePost {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AssembleError {
    /// Whether the notebook itself was the problem, as opposed to the
    /// filesystem around it.
    pub fn is_render_failure(&self) -> bool {
        matches!(self, AssembleError::Render { .. })
    }
}

/// An extracted output written to the images directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenImage {
    /// Id the renderer assigned, e.g. `output_1_0.png`.
    pub output_id: String,
    pub path: PathBuf,
    /// Link target substituted into the markup.
    pub reference: String,
    pub bytes: usize,
}

/// Result of assembling one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPost {
    pub logical_id: String,
    pub post_path: PathBuf,
    pub bytes_written: usize,
    pub images: Vec<WrittenImage>,
}

/// Assemble one post. `on_image` sees each image right after it lands on
/// disk, so images written before a later step fails are still reported.
pub fn assemble(
    renderer: &impl NotebookRenderer,
    post: &PostMatch,
    config: &ConvertConfig,
    on_image: impl FnMut(&WrittenImage),
) -> Result<AssembledPost, AssembleError> {
    let paths = &config.paths;

    let notebook_path = paths.notebooks.join(&post.notebook);
    let rendered = renderer
        .render(&notebook_path)
        .map_err(|source| AssembleError::Render {
            logical_id: post.logical_id.clone(),
            source,
        })?;

    let (markup, images) = relocate_outputs(
        rendered,
        &post.logical_id,
        &paths.images,
        &config.naming.output_token,
        on_image,
    )?;

    let front_matter_path = paths.notebooks.join(&post.front_matter);
    let front_matter =
        fs::read(&front_matter_path).map_err(|source| AssembleError::ReadFrontMatter {
            path: front_matter_path.clone(),
            source,
        })?;
    let content = concatenate(front_matter, &markup);

    let post_path = paths.posts.join(&post.front_matter);
    fs::write(&post_path, &content).map_err(|source| AssembleError::WritePost {
        path: post_path.clone(),
        source,
    })?;

    Ok(AssembledPost {
        logical_id: post.logical_id.clone(),
        post_path,
        bytes_written: content.len(),
        images,
    })
}

/// Write every output to `image_dir` and point the markup at the new files.
///
/// Returns the rewritten markup and one [`WrittenImage`] per output, in
/// output-id order.
pub fn relocate_outputs(
    rendered: RenderedNotebook,
    logical_id: &str,
    image_dir: &Path,
    output_token: &str,
    mut on_image: impl FnMut(&WrittenImage),
) -> Result<(String, Vec<WrittenImage>), AssembleError> {
    let RenderedNotebook { mut markup, outputs } = rendered;
    let mut images = Vec::with_capacity(outputs.len());

    for (output_id, payload) in outputs {
        let filename = image_filename(&output_id, logical_id, output_token);
        let path = image_dir.join(&filename);
        fs::write(&path, &payload).map_err(|source| AssembleError::WriteImage {
            path: path.clone(),
            source,
        })?;

        let reference = site_reference(image_dir, &filename);
        markup = rewrite_references(&markup, &output_id, &reference);

        let image = WrittenImage {
            output_id,
            path,
            reference,
            bytes: payload.len(),
        };
        on_image(&image);
        images.push(image);
    }

    Ok((markup, images))
}

/// `output_3.png` with logical id `hiking` → `hiking_3.png`.
pub fn image_filename(output_id: &str, logical_id: &str, output_token: &str) -> String {
    output_id.replace(output_token, logical_id)
}

/// Path of an image as linked from the site root.
///
/// - `./assets/images` + `a.png` → `/assets/images/a.png`
/// - `images` + `a.png` → `images/a.png`
/// - `/srv/img` + `a.png` → `/srv/img/a.png`
///
/// Always uses `/`, whatever the platform separator.
pub fn site_reference(image_dir: &Path, filename: &str) -> String {
    let mut rooted = false;
    let mut parts: Vec<String> = Vec::new();
    for (i, component) in image_dir.components().enumerate() {
        match component {
            Component::CurDir if i == 0 => rooted = true,
            Component::RootDir => rooted = true,
            Component::ParentDir => parts.push("..".to_string()),
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir | Component::Prefix(_) => {}
        }
    }
    parts.push(filename.to_string());
    let joined = parts.join("/");
    if rooted { format!("/{joined}") } else { joined }
}

/// Replace every `](output_id)` link target with `](reference)`.
///
/// Only exact link targets are touched; the bare id elsewhere in the text
/// is left alone.
pub fn rewrite_references(markup: &str, output_id: &str, reference: &str) -> String {
    markup.replace(&format!("]({output_id})"), &format!("]({reference})"))
}

/// Front-matter bytes followed by the markup, nothing in between.
pub fn concatenate(mut front_matter: Vec<u8>, markup: &str) -> Vec<u8> {
    front_matter.extend_from_slice(markup.as_bytes());
    front_matter
}
