//! Converter configuration.
//!
//! Handles loading, merging, and validating `nb2post.toml`. Stock defaults
//! reproduce the classic Jekyll layout, so running with no config file and no
//! flags converts `./notebooks` into `./_posts` and `./assets/images`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! notebooks = "./notebooks"     # Front matter + notebooks live here
//! posts = "./_posts"            # Assembled posts are written here
//! images = "./assets/images"    # Extracted notebook outputs are written here
//!
//! [naming]
//! markup_extension = "md"       # YYYY-MM-DD-<name>.md
//! notebook_extension = "ipynb"  # <name>.ipynb
//! output_token = "output"       # Replaced by <name> in output filenames
//!
//! [run]
//! keep_going = false            # Skip notebooks that fail to render
//! ```
//!
//! Config files are sparse; override just the values you want. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config filename, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "nb2post.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration.
///
/// Passed explicitly into [`convert::run`](crate::convert::run); nothing in the
/// crate reads paths from ambient state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Input and output directories.
    pub paths: PathsConfig,
    /// Filename conventions.
    pub naming: NamingConfig,
    /// Failure policy.
    pub run: RunConfig,
}

impl ConvertConfig {
    /// Validate values that serde alone cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let naming = &self.naming;
        for (key, ext) in [
            ("naming.markup_extension", &naming.markup_extension),
            ("naming.notebook_extension", &naming.notebook_extension),
        ] {
            if ext.is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
            if ext.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "{key} must not start with a dot (got {ext:?})"
                )));
            }
        }
        if naming.markup_extension == naming.notebook_extension {
            return Err(ConfigError::Validation(
                "naming.markup_extension and naming.notebook_extension must differ".into(),
            ));
        }
        if naming.output_token.is_empty() {
            return Err(ConfigError::Validation(
                "naming.output_token must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Directory triple the converter reads from and writes to.
///
/// None of these are created or checked ahead of time; a missing output
/// directory surfaces as a write error on the first post that needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub notebooks: PathBuf,
    pub posts: PathBuf,
    pub images: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            notebooks: PathBuf::from("./notebooks"),
            posts: PathBuf::from("./_posts"),
            images: PathBuf::from("./assets/images"),
        }
    }
}

/// Filename conventions used to pair files and name extracted outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    /// Extension of front-matter files, without the dot.
    pub markup_extension: String,
    /// Extension of notebook files, without the dot.
    pub notebook_extension: String,
    /// Literal in renderer output ids that is replaced by the logical id.
    pub output_token: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            markup_extension: "md".to_string(),
            notebook_extension: "ipynb".to_string(),
            output_token: "output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Skip a post whose notebook fails to render instead of halting.
    /// Filesystem errors halt the run either way.
    pub keep_going: bool,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a TOML table: the layer a config file is laid over.
pub fn stock_defaults_table() -> Result<toml::Table, ConfigError> {
    match toml::Value::try_from(ConvertConfig::default())? {
        toml::Value::Table(table) => Ok(table),
        other => Err(ConfigError::Validation(format!(
            "stock defaults serialized to a {}, not a table",
            other.type_str()
        ))),
    }
}

/// Lay `overlay` over `base` in place.
///
/// A table in the overlay descends into the matching table in `base`; any
/// other value replaces whatever `base` held under that key.
pub fn overlay_table(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(nested) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => overlay_table(existing, nested),
                _ => {
                    base.insert(key, toml::Value::Table(nested));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

/// Parse the config file at `path`, or `None` when there is no such file.
pub fn read_overlay(path: &Path) -> Result<Option<toml::Table>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(toml::from_str(&content)?))
}

/// Load config from the given file, falling back to stock defaults when the
/// file is absent.
pub fn load_config(path: &Path) -> Result<ConvertConfig, ConfigError> {
    let mut table = stock_defaults_table()?;
    if let Some(overlay) = read_overlay(path)? {
        overlay_table(&mut table, overlay);
    }
    let config: ConvertConfig = toml::Value::Table(table).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `nb2post.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# nb2post Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Directories
# ---------------------------------------------------------------------------
[paths]
# Holds both the dated front-matter files and the notebooks.
notebooks = "./notebooks"

# Each assembled post is written here under its front-matter filename.
posts = "./_posts"

# Images extracted from notebook outputs are written here. Links in the
# post point at this directory with the leading "." removed, so
# "./assets/images" becomes "/assets/images/..." on the site.
images = "./assets/images"

# ---------------------------------------------------------------------------
# Filename conventions
# ---------------------------------------------------------------------------
[naming]
# Front matter: YYYY-MM-DD-<name>.<markup_extension>
markup_extension = "md"

# Notebook: <name>.<notebook_extension>
notebook_extension = "ipynb"

# Rendered outputs are named like "output_3_0.png"; this token is replaced
# by <name> so images from different posts never collide.
output_token = "output"

# ---------------------------------------------------------------------------
# Failure policy
# ---------------------------------------------------------------------------
[run]
# When true, a notebook that fails to render is reported and skipped.
# When false (default), the first failure stops the run.
# Filesystem errors always stop the run.
keep_going = false
"##
}
