use crate::config::ToolConfig;
use crate::marker::CommentMarker;
use crate::pairs::{extract_pairs, DependencyEntry};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml_edit::{DocumentMut, Item};
use tracing::debug;

/// Group name for the unconditioned `project.dependencies` list.
pub const BASE_GROUP: &str = "base";

/// Pseudo-extra exposing `build-system.requires` as a dependency group.
pub const BUILD_SYSTEM_GROUP: &str = "build-system.requires";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest '{origin}': {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml_edit::TomlError,
    },
    #[error("invalid [tool.pyproject2conda] table in '{origin}': {source}")]
    ToolTable {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("comment marker must not be empty or whitespace")]
    InvalidMarker,
    #[error("invalid p2c directive in comment '{comment}': {message}")]
    Directive { comment: String, message: String },
    #[error("manifest has no `{0}`")]
    MissingField(&'static str),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Default, Deserialize)]
struct PyprojectTool {
    #[serde(default)]
    tool: ToolSection,
}

#[derive(Debug, Default, Deserialize)]
struct ToolSection {
    #[serde(default)]
    pyproject2conda: ToolConfig,
}

/// A loaded `pyproject.toml`.
///
/// The document is kept in its comment-preserving form; it is never mutated
/// after load. The `[tool.pyproject2conda]` table is additionally decoded into
/// [`ToolConfig`].
#[derive(Debug, Clone)]
pub struct Manifest {
    origin: String,
    doc: DocumentMut,
    tool: ToolConfig,
}

impl Manifest {
    fn parse(input: &str, origin: String) -> Result<Self, ManifestError> {
        let doc: DocumentMut = input.parse().map_err(|source| ManifestError::Parse {
            origin: origin.clone(),
            source,
        })?;
        let tool = toml::from_str::<PyprojectTool>(input)
            .map_err(|source| ManifestError::ToolTable {
                origin: origin.clone(),
                source,
            })?
            .tool
            .pyproject2conda;
        Ok(Self { origin, doc, tool })
    }

    /// Where the manifest came from: a file path, or `<string>`.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn tool(&self) -> &ToolConfig {
        &self.tool
    }

    /// Descend `keys` through nested tables and return the value found.
    ///
    /// Any missing segment, or a non-table encountered before the last key,
    /// yields `None`.
    pub fn get_in(&self, keys: &[&str]) -> Option<&Item> {
        keys.iter()
            .try_fold(self.doc.as_item(), |item, key| item.get(*key))
    }

    /// Like [`Manifest::get_in`] but falls back to `default`.
    pub fn get_in_or<'a>(&'a self, keys: &[&str], default: &'a Item) -> &'a Item {
        self.get_in(keys).unwrap_or(default)
    }

    /// `project.name`.
    pub fn package_name(&self) -> Option<&str> {
        self.get_in(&["project", "name"]).and_then(Item::as_str)
    }

    /// `project.requires-python`.
    pub fn requires_python(&self) -> Result<&str, ManifestError> {
        self.get_in(&["project", "requires-python"])
            .and_then(Item::as_str)
            .ok_or(ManifestError::MissingField("project.requires-python"))
    }

    /// Optional-dependency group names in document order, then
    /// [`BUILD_SYSTEM_GROUP`].
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .get_in(&["project", "optional-dependencies"])
            .and_then(Item::as_table_like)
            .map(|table| table.iter().map(|(k, _)| k.to_owned()).collect())
            .unwrap_or_default();
        names.push(BUILD_SYSTEM_GROUP.to_owned());
        names
    }

    /// Whether `name` refers to a group this manifest declares.
    ///
    /// [`BASE_GROUP`] and [`BUILD_SYSTEM_GROUP`] always exist, possibly empty.
    pub fn has_group(&self, name: &str) -> bool {
        name == BASE_GROUP || self.group_names().iter().any(|g| g == name)
    }

    /// The raw array backing a dependency group.
    pub fn group_array(&self, name: &str) -> Option<&toml_edit::Array> {
        let keys: &[&str] = match name {
            BASE_GROUP => &["project", "dependencies"],
            BUILD_SYSTEM_GROUP => &["build-system", "requires"],
            extra => &["project", "optional-dependencies", extra],
        };
        self.get_in(keys).and_then(Item::as_array)
    }

    /// Entries of a dependency group, or `None` when the group is absent.
    pub fn group_entries(&self, name: &str, marker: &CommentMarker) -> Option<Vec<DependencyEntry>> {
        let array = self.group_array(name);
        if array.is_none() {
            debug!("dependency group '{name}' not found in {}", self.origin);
        }
        array.map(|a| extract_pairs(a, marker))
    }
}

impl std::str::FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, "<string>".to_owned())
    }
}

pub fn parse_manifest_str(input: &str) -> Result<Manifest, ManifestError> {
    input.parse()
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("loaded manifest from {}", path.display());
    Manifest::parse(&content, path.display().to_string())
}
