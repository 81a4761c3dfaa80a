//! Filename conventions that pair front matter with notebooks.
//!
//! The notebook directory holds two kinds of files that belong together:
//!
//! ```text
//! notebooks/
//! ├── 2024-01-01-hiking.md     # front matter: YYYY-MM-DD-<name>.<markup-ext>
//! ├── hiking.ipynb             # notebook:     <name>.<notebook-ext>
//! └── scratch.txt              # neither, ignored
//! ```
//!
//! The shared `<name>` part is the **logical id**. It is the only thing that
//! ties the two files together; the date lives in the front-matter filename
//! alone and is carried through to the published post's filename.
//!
//! The date prefix is checked for shape only (`\d{4}-\d{2}-\d{2}-`), not for
//! calendar validity. Extensions are matched case-sensitively.

use crate::config::NamingConfig;

/// Which side of a post a file supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileKind {
    FrontMatter,
    Notebook,
}

impl FileKind {
    pub fn label(self) -> &'static str {
        match self {
            FileKind::FrontMatter => "front matter",
            FileKind::Notebook => "notebook",
        }
    }
}

/// A classified directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Filename as listed in the directory (no path).
    pub name: String,
    pub kind: FileKind,
    /// Shared stem that pairs this file with its counterpart.
    pub logical_id: String,
}

/// Classify a filename against both conventions.
///
/// - `"2024-01-01-hiking.md"` → FrontMatter, logical_id = `"hiking"`
/// - `"hiking.ipynb"` → Notebook, logical_id = `"hiking"`
/// - `"2024-01-01-.md"` → None (empty logical name)
/// - `"notes.md"` → None (no date prefix)
/// - `"2024-01-01-hiking.ipynb"` → Notebook, logical_id = `"2024-01-01-hiking"`
pub fn classify(name: &str, naming: &NamingConfig) -> Option<SourceFile> {
    if let Some(logical_id) = parse_front_matter_name(name, &naming.markup_extension) {
        return Some(SourceFile {
            name: name.to_string(),
            kind: FileKind::FrontMatter,
            logical_id: logical_id.to_string(),
        });
    }
    parse_notebook_name(name, &naming.notebook_extension).map(|logical_id| SourceFile {
        name: name.to_string(),
        kind: FileKind::Notebook,
        logical_id: logical_id.to_string(),
    })
}

/// Extract the logical id from `YYYY-MM-DD-<name>.<ext>`.
pub fn parse_front_matter_name<'a>(name: &'a str, extension: &str) -> Option<&'a str> {
    let stem = strip_extension(name, extension)?;
    strip_date_prefix(stem).filter(|rest| !rest.is_empty())
}

/// Extract the logical id from `<name>.<ext>`.
pub fn parse_notebook_name<'a>(name: &'a str, extension: &str) -> Option<&'a str> {
    strip_extension(name, extension).filter(|stem| !stem.is_empty())
}

fn strip_extension<'a>(name: &'a str, extension: &str) -> Option<&'a str> {
    name.strip_suffix(extension)?.strip_suffix('.')
}

/// Strip a leading `DDDD-DD-DD-` and return the remainder.
fn strip_date_prefix(stem: &str) -> Option<&str> {
    const SHAPE: &[u8] = b"dddd-dd-dd-";
    let bytes = stem.as_bytes();
    if bytes.len() < SHAPE.len() {
        return None;
    }
    let fits = SHAPE.iter().zip(bytes).all(|(&expected, &actual)| match expected {
        b'd' => actual.is_ascii_digit(),
        _ => actual == expected,
    });
    // SHAPE is pure ASCII, so its length is always a char boundary.
    fits.then(|| &stem[SHAPE.len()..])
}
