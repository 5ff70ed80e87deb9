//! Shared data context bound into every page render.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// Structured-data formats accepted for the context file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
    Toml,
}

impl DataFormat {
    /// Pick a format from the file extension. Unknown extensions are read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => DataFormat::Yaml,
            Some("toml") => DataFormat::Toml,
            _ => DataFormat::Json,
        }
    }

    fn parse(self, content: &str) -> Result<Value, String> {
        match self {
            DataFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            DataFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            DataFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Errors raised while loading the data context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Failed to read data file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed data file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Data file {} must contain a mapping at the top level", .path.display())]
    NotAMapping { path: PathBuf },
}

/// Read-only key/value tree loaded once per build.
///
/// The root is always a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct DataContext {
    root: Value,
}

impl Default for DataContext {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }
}

impl DataContext {
    /// Load and parse the data file at `path`.
    pub fn load(path: &Path) -> Result<Self, ContextError> {
        let content = fs::read_to_string(path).map_err(|source| ContextError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let root = DataFormat::from_path(path)
            .parse(&content)
            .map_err(|message| ContextError::Parse {
                path: path.to_path_buf(),
                message,
            })?;

        if !root.is_object() {
            return Err(ContextError::NotAMapping {
                path: path.to_path_buf(),
            });
        }

        Ok(Self { root })
    }

    /// Nested value addressed by a JSON pointer such as `/menu/0/title`.
    /// The empty pointer addresses the whole document.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.root.pointer(pointer)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.root.as_object().map_or(0, Map::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into the value handed to the template engine.
    pub fn to_template_value(&self) -> minijinja::Value {
        minijinja::Value::from_serialize(&self.root)
    }
}
