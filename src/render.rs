//! Notebook rendering.
//!
//! The [`NotebookRenderer`] trait is the only thing the assembler knows about
//! rendering: given a notebook path it returns markdown text plus every
//! binary output the notebook embeds, keyed by the output id the markdown
//! links to.
//!
//! The production implementation is [`MarkdownRenderer`], which reads
//! nbformat 4 JSON directly:
//!
//! | Cell / output | Markdown |
//! |---|---|
//! | markdown, raw cell | source verbatim |
//! | code cell | fenced block tagged with the kernel language |
//! | `stream` | text indented four spaces |
//! | `display_data`, `execute_result` | richest entry of the mime bundle, see below |
//! | `error` | traceback indented four spaces |
//!
//! A mime bundle is shown through the first entry present in this order:
//! `text/html`, `text/markdown`, `image/svg+xml`, `text/latex`, `image/png`,
//! `image/jpeg`, `text/plain`. HTML, markdown and LaTeX pass through
//! verbatim, plain text is indented.
//!
//! Image outputs are named `output_<cell>_<n>.<ext>` (cell index within the
//! notebook, output index within the cell; `svg`, `png`, `jpg`) and linked as
//! `![<ext>](output_<cell>_<n>.<ext>)`. Rendering is deterministic: the same
//! notebook bytes always produce the same markup and outputs.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to read notebook {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid notebook JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported nbformat {major} in {path} (need 4 or later)")]
    UnsupportedFormat { path: PathBuf, major: u64 },
    #[error("output {output_id} in {path} is not valid base64: {source}")]
    Base64 {
        path: PathBuf,
        output_id: String,
        #[source]
        source: base64::DecodeError,
    },
    #[error("malformed notebook {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Result of rendering one notebook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedNotebook {
    /// Markdown body. Links to outputs use the bare output id as target.
    pub markup: String,
    /// Raw payload per output id, e.g. `"output_3_0.png"` → PNG bytes.
    pub outputs: BTreeMap<String, Vec<u8>>,
}

/// Turns a notebook file into markdown plus its binary outputs.
pub trait NotebookRenderer {
    fn render(&self, path: &Path) -> Result<RenderedNotebook, RenderError>;
}

/// Native nbformat 4 → markdown renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl NotebookRenderer for MarkdownRenderer {
    fn render(&self, path: &Path) -> Result<RenderedNotebook, RenderError> {
        let bytes = fs::read(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        render_notebook_bytes(&bytes, path)
    }
}

// ============================================================================
// nbformat 4 document model (only the fields rendering needs)
// ============================================================================

#[derive(Debug, Deserialize)]
struct Notebook {
    #[serde(default)]
    metadata: NotebookMetadata,
    cells: Vec<Cell>,
}

#[derive(Debug, Default, Deserialize)]
struct NotebookMetadata {
    #[serde(default)]
    language_info: Option<LanguageInfo>,
    #[serde(default)]
    kernelspec: Option<KernelSpec>,
}

#[derive(Debug, Deserialize)]
struct LanguageInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct KernelSpec {
    #[serde(default)]
    language: Option<String>,
}

/// nbformat stores multi-line text either as one string or a list of lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MultilineString {
    One(String),
    Many(Vec<String>),
}

impl MultilineString {
    fn joined(&self) -> String {
        match self {
            MultilineString::One(s) => s.clone(),
            MultilineString::Many(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
enum Cell {
    Markdown {
        source: MultilineString,
    },
    Raw {
        source: MultilineString,
    },
    Code {
        source: MultilineString,
        #[serde(default)]
        outputs: Vec<Output>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
enum Output {
    Stream {
        text: MultilineString,
    },
    DisplayData {
        #[serde(default)]
        data: BTreeMap<String, Value>,
    },
    ExecuteResult {
        #[serde(default)]
        data: BTreeMap<String, Value>,
    },
    Error {
        #[serde(default)]
        traceback: Vec<String>,
    },
}

/// How a mime-bundle entry is written into the markdown.
#[derive(Debug, Clone, Copy)]
enum Presentation {
    Verbatim,
    Indented,
    /// Extracted to an output file. Raster payloads are base64 in the
    /// notebook; SVG is stored as text.
    Image { ext: &'static str, encoded: bool },
}

/// Mime types in display preference order.
const DISPLAY_PRIORITY: &[(&str, Presentation)] = &[
    ("text/html", Presentation::Verbatim),
    ("text/markdown", Presentation::Verbatim),
    ("image/svg+xml", Presentation::Image { ext: "svg", encoded: false }),
    ("text/latex", Presentation::Verbatim),
    ("image/png", Presentation::Image { ext: "png", encoded: true }),
    ("image/jpeg", Presentation::Image { ext: "jpg", encoded: true }),
    ("text/plain", Presentation::Indented),
];

/// Render an in-memory notebook. `path` is only used in error messages.
pub fn render_notebook_bytes(bytes: &[u8], path: &Path) -> Result<RenderedNotebook, RenderError> {
    let json_err = |source: serde_json::Error| RenderError::Json {
        path: path.to_path_buf(),
        source,
    };
    let value: Value = serde_json::from_slice(bytes).map_err(json_err)?;
    let major = value.get("nbformat").and_then(Value::as_u64).unwrap_or(0);
    if major < 4 {
        return Err(RenderError::UnsupportedFormat {
            path: path.to_path_buf(),
            major,
        });
    }
    let notebook: Notebook = serde_json::from_value(value).map_err(json_err)?;
    let language = notebook_language(&notebook.metadata);

    let mut blocks = Vec::new();
    let mut outputs = BTreeMap::new();

    for (cell_index, cell) in notebook.cells.iter().enumerate() {
        match cell {
            Cell::Markdown { source } | Cell::Raw { source } => {
                let text = source.joined();
                if !text.trim().is_empty() {
                    blocks.push(text.trim_end_matches('\n').to_string());
                }
            }
            Cell::Code {
                source,
                outputs: cell_outputs,
            } => {
                let code = source.joined();
                if !code.trim().is_empty() {
                    blocks.push(format!(
                        "```{}\n{}\n```",
                        language,
                        code.trim_end_matches('\n')
                    ));
                }
                for (output_index, output) in cell_outputs.iter().enumerate() {
                    let output_id_stem = format!("output_{cell_index}_{output_index}");
                    if let Some(block) =
                        render_output(output, &output_id_stem, path, &mut outputs)?
                    {
                        blocks.push(block);
                    }
                }
            }
        }
    }

    let mut markup = blocks.join("\n\n");
    if !markup.is_empty() {
        markup.push('\n');
    }
    Ok(RenderedNotebook { markup, outputs })
}

fn notebook_language(metadata: &NotebookMetadata) -> &str {
    metadata
        .language_info
        .as_ref()
        .map(|info| info.name.as_str())
        .or_else(|| {
            metadata
                .kernelspec
                .as_ref()
                .and_then(|k| k.language.as_deref())
        })
        .unwrap_or("python")
}

/// Render one code-cell output, registering any binary payload in `outputs`.
fn render_output(
    output: &Output,
    output_id_stem: &str,
    path: &Path,
    outputs: &mut BTreeMap<String, Vec<u8>>,
) -> Result<Option<String>, RenderError> {
    match output {
        Output::Stream { text } => Ok(non_empty(indent(&text.joined()))),
        Output::Error { traceback } => Ok(non_empty(indent(&traceback.join("\n")))),
        Output::DisplayData { data } | Output::ExecuteResult { data } => {
            let Some((mime, display, value)) = DISPLAY_PRIORITY
                .iter()
                .find_map(|&(mime, display)| data.get(mime).map(|value| (mime, display, value)))
            else {
                return Ok(None);
            };
            let text = mime_text(value, mime, path)?;
            match display {
                Presentation::Verbatim => Ok(non_empty(text.trim_end_matches('\n').to_string())),
                Presentation::Indented => Ok(non_empty(indent(&text))),
                Presentation::Image { ext, encoded } => {
                    let output_id = format!("{output_id_stem}.{ext}");
                    let payload = if encoded {
                        decode_base64(&text, &output_id, path)?
                    } else {
                        text.into_bytes()
                    };
                    let link = format!("![{ext}]({output_id})");
                    outputs.insert(output_id, payload);
                    Ok(Some(link))
                }
            }
        }
    }
}

/// Extract text from a mime bundle entry (string or list of strings).
fn mime_text(value: &Value, mime: &str, path: &Path) -> Result<String, RenderError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str())
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.concat())
            .ok_or_else(|| malformed(path, mime)),
        _ => Err(malformed(path, mime)),
    }
}

fn malformed(path: &Path, mime: &str) -> RenderError {
    RenderError::Malformed {
        path: path.to_path_buf(),
        reason: format!("{mime} output is neither a string nor a list of strings"),
    }
}

fn decode_base64(text: &str, output_id: &str, path: &Path) -> Result<Vec<u8>, RenderError> {
    let cleaned: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(cleaned)
        .map_err(|source| RenderError::Base64 {
            path: path.to_path_buf(),
            output_id: output_id.to_string(),
            source,
        })
}

/// Indent every line by four spaces (markdown preformatted block).
fn indent(text: &str) -> String {
    text.trim_end_matches('\n')
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Renderer with canned results keyed by notebook filename.
    /// Records every path it was asked to render.
    #[derive(Default)]
    pub struct MockRenderer {
        pub documents: HashMap<String, RenderedNotebook>,
        pub failures: Vec<String>,
        pub calls: Mutex<Vec<PathBuf>>,
    }

    impl MockRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_document(
            mut self,
            notebook: &str,
            markup: &str,
            outputs: &[(&str, &[u8])],
        ) -> Self {
            let outputs = outputs
                .iter()
                .map(|(id, bytes)| (id.to_string(), bytes.to_vec()))
                .collect();
            self.documents.insert(
                notebook.to_string(),
                RenderedNotebook {
                    markup: markup.to_string(),
                    outputs,
                },
            );
            self
        }

        pub fn with_failure(mut self, notebook: &str) -> Self {
            self.failures.push(notebook.to_string());
            self
        }

        pub fn rendered_names(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        }
    }

    impl NotebookRenderer for MockRenderer {
        fn render(&self, path: &Path) -> Result<RenderedNotebook, RenderError> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if self.failures.contains(&name) {
                return Err(RenderError::Malformed {
                    path: path.to_path_buf(),
                    reason: "mock failure".to_string(),
                });
            }
            self.documents
                .get(&name)
                .cloned()
                .ok_or_else(|| RenderError::Malformed {
                    path: path.to_path_buf(),
                    reason: "no mock document".to_string(),
                })
        }
    }

    fn render_json(json: &str) -> Result<RenderedNotebook, RenderError> {
        render_notebook_bytes(json.as_bytes(), Path::new("test.ipynb"))
    }

    // "PNGDATA" in base64
    const PNG_B64: &str = "UE5HREFUQQ==";

    #[test]
    fn mock_records_calls() {
        let mock = MockRenderer::new().with_document("a.ipynb", "body", &[]);
        let doc = mock.render(Path::new("/nb/a.ipynb")).unwrap();
        assert_eq!(doc.markup, "body");
        assert_eq!(mock.rendered_names(), vec!["a.ipynb"]);
    }

    #[test]
    fn mock_failure_is_error() {
        let mock = MockRenderer::new().with_failure("bad.ipynb");
        assert!(mock.render(Path::new("bad.ipynb")).is_err());
    }

    #[test]
    fn markdown_cell_verbatim() {
        let doc = render_json(
            r##"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "markdown", "metadata": {}, "source": ["# Title\n", "Some *text*"]}]}"##,
        )
        .unwrap();
        assert_eq!(doc.markup, "# Title\nSome *text*\n");
        assert!(doc.outputs.is_empty());
    }

    #[test]
    fn code_cell_fenced_with_language() {
        let doc = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5,
                "metadata": {"language_info": {"name": "julia"}},
                "cells": [{"cell_type": "code", "execution_count": 1, "metadata": {},
                           "source": "println(1)", "outputs": []}]}"#,
        )
        .unwrap();
        assert_eq!(doc.markup, "```julia\nprintln(1)\n```\n");
    }

    #[test]
    fn language_falls_back_to_kernelspec_then_python() {
        let doc = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5,
                "metadata": {"kernelspec": {"name": "ir", "language": "R"}},
                "cells": [{"cell_type": "code", "metadata": {}, "source": "1", "outputs": []}]}"#,
        )
        .unwrap();
        assert!(doc.markup.starts_with("```R\n"));

        let doc = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "code", "metadata": {}, "source": "1", "outputs": []}]}"#,
        )
        .unwrap();
        assert!(doc.markup.starts_with("```python\n"));
    }

    #[test]
    fn stream_output_indented() {
        let doc = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "code", "metadata": {}, "source": "print('a\\nb')",
                           "outputs": [{"output_type": "stream", "name": "stdout", "text": ["a\n", "b\n"]}]}]}"#,
        )
        .unwrap();
        assert_eq!(doc.markup, "```python\nprint('a\\nb')\n```\n\n    a\n    b\n");
    }

    #[test]
    fn image_output_extracted_and_linked() {
        let json = format!(
            r#"{{"nbformat": 4, "nbformat_minor": 5, "metadata": {{}},
                "cells": [
                  {{"cell_type": "markdown", "metadata": {{}}, "source": "intro"}},
                  {{"cell_type": "code", "metadata": {{}}, "source": "plot()",
                    "outputs": [{{"output_type": "display_data", "metadata": {{}},
                                 "data": {{"image/png": "{PNG_B64}\n", "text/plain": "<Figure>"}}}}]}}]}}"#
        );
        let doc = render_json(&json).unwrap();
        assert!(doc.markup.contains("![png](output_1_0.png)"));
        assert!(!doc.markup.contains("<Figure>"));
        assert_eq!(doc.outputs.len(), 1);
        assert_eq!(doc.outputs["output_1_0.png"], b"PNGDATA");
    }

    #[test]
    fn svg_output_kept_as_text() {
        let doc = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "code", "metadata": {}, "source": "svg()",
                           "outputs": [{"output_type": "display_data", "metadata": {},
                                        "data": {"image/svg+xml": ["<svg>", "</svg>"]}}]}]}"#,
        )
        .unwrap();
        assert_eq!(doc.outputs["output_0_0.svg"], b"<svg></svg>");
        assert!(doc.markup.contains("![svg](output_0_0.svg)"));
    }

    #[test]
    fn execute_result_plain_text_indented() {
        let doc = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "code", "metadata": {}, "source": "1 + 1", "execution_count": 3,
                           "outputs": [{"output_type": "execute_result", "execution_count": 3, "metadata": {},
                                        "data": {"text/plain": ["2"]}}]}]}"#,
        )
        .unwrap();
        assert!(doc.markup.ends_with("\n\n    2\n"));
    }

    #[test]
    fn markdown_output_preferred_over_plain() {
        let doc = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "code", "metadata": {}, "source": "md()",
                           "outputs": [{"output_type": "display_data", "metadata": {},
                                        "data": {"text/markdown": "**bold**", "text/plain": "bold"}}]}]}"#,
        )
        .unwrap();
        assert!(doc.markup.ends_with("\n\n**bold**\n"));
    }

    #[test]
    fn html_output_passed_through_before_plain() {
        let doc = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "code", "metadata": {}, "source": "df", "execution_count": 1,
                           "outputs": [{"output_type": "execute_result", "execution_count": 1, "metadata": {},
                                        "data": {"text/html": ["<table>\n", "<tr><td>1</td></tr>\n", "</table>\n"],
                                                 "text/plain": "   a\n0  1"}}]}]}"#,
        )
        .unwrap();
        assert!(doc
            .markup
            .ends_with("\n\n<table>\n<tr><td>1</td></tr>\n</table>\n"));
        assert!(!doc.markup.contains("0  1"));
    }

    #[test]
    fn latex_output_passed_through() {
        let doc = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "code", "metadata": {}, "source": "sym()",
                           "outputs": [{"output_type": "display_data", "metadata": {},
                                        "data": {"text/latex": "$x^2$", "text/plain": "x**2"}}]}]}"#,
        )
        .unwrap();
        assert!(doc.markup.ends_with("\n\n$x^2$\n"));
    }

    #[test]
    fn jpeg_output_uses_jpg_extension() {
        let json = format!(
            r#"{{"nbformat": 4, "nbformat_minor": 5, "metadata": {{}},
                "cells": [{{"cell_type": "code", "metadata": {{}}, "source": "photo()",
                           "outputs": [{{"output_type": "display_data", "metadata": {{}},
                                        "data": {{"image/jpeg": "{PNG_B64}"}}}}]}}]}}"#
        );
        let doc = render_json(&json).unwrap();
        assert!(doc.markup.contains("![jpg](output_0_0.jpg)"));
        assert_eq!(doc.outputs["output_0_0.jpg"], b"PNGDATA");
    }

    #[test]
    fn error_traceback_indented() {
        let doc = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "code", "metadata": {}, "source": "1/0",
                           "outputs": [{"output_type": "error", "ename": "ZeroDivisionError",
                                        "evalue": "division by zero",
                                        "traceback": ["Traceback", "ZeroDivisionError: division by zero"]}]}]}"#,
        )
        .unwrap();
        assert!(doc
            .markup
            .ends_with("    Traceback\n    ZeroDivisionError: division by zero\n"));
    }

    #[test]
    fn empty_cells_are_skipped() {
        let doc = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "markdown", "metadata": {}, "source": ""},
                          {"cell_type": "code", "metadata": {}, "source": [], "outputs": []},
                          {"cell_type": "markdown", "metadata": {}, "source": "only"}]}"#,
        )
        .unwrap();
        assert_eq!(doc.markup, "only\n");
    }

    #[test]
    fn empty_notebook_renders_empty() {
        let doc = render_json(r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {}, "cells": []}"#)
            .unwrap();
        assert_eq!(doc, RenderedNotebook::default());
    }

    #[test]
    fn old_nbformat_rejected() {
        let result = render_json(r#"{"nbformat": 3, "nbformat_minor": 0, "worksheets": []}"#);
        assert!(matches!(
            result,
            Err(RenderError::UnsupportedFormat { major: 3, .. })
        ));
    }

    #[test]
    fn invalid_json_rejected() {
        assert!(matches!(render_json("{not json"), Err(RenderError::Json { .. })));
    }

    #[test]
    fn bad_base64_names_output() {
        let err = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "code", "metadata": {}, "source": "x",
                           "outputs": [{"output_type": "display_data", "metadata": {},
                                        "data": {"image/png": "!!!"}}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(&err, RenderError::Base64 { output_id, .. } if output_id == "output_0_0.png"));
    }

    #[test]
    fn non_string_mime_value_is_malformed() {
        let result = render_json(
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "code", "metadata": {}, "source": "x",
                           "outputs": [{"output_type": "execute_result", "metadata": {},
                                        "data": {"text/plain": 42}}]}]}"#,
        );
        assert!(matches!(result, Err(RenderError::Malformed { .. })));
    }

    #[test]
    fn rendering_is_deterministic() {
        let json = format!(
            r#"{{"nbformat": 4, "nbformat_minor": 5, "metadata": {{}},
                "cells": [{{"cell_type": "code", "metadata": {{}}, "source": "p()",
                    "outputs": [{{"output_type": "display_data", "metadata": {{}}, "data": {{"image/png": "{PNG_B64}"}}}},
                                {{"output_type": "display_data", "metadata": {{}}, "data": {{"image/png": "{PNG_B64}"}}}}]}}]}}"#
        );
        let a = render_json(&json).unwrap();
        let b = render_json(&json).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.outputs.keys().collect::<Vec<_>>(),
            vec!["output_0_0.png", "output_0_1.png"]
        );
    }

    #[test]
    fn render_reads_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.ipynb");
        fs::write(
            &path,
            r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
                "cells": [{"cell_type": "markdown", "metadata": {}, "source": "hi"}]}"#,
        )
        .unwrap();
        let doc = MarkdownRenderer::new().render(&path).unwrap();
        assert_eq!(doc.markup, "hi\n");
    }

    #[test]
    fn render_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = MarkdownRenderer::new().render(&tmp.path().join("missing.ipynb"));
        assert!(matches!(result, Err(RenderError::Io { .. })));
    }
}
