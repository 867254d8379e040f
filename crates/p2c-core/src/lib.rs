//! Dependency merging and rendering for p2c.
//!
//! This crate turns the dependency groups exposed by `p2c-schema` into output
//! text: it merges and filters groups, routes each requirement to the conda or
//! pip side, and serializes the result as a conda environment file, a pip
//! requirements list, a pair of conda/pip lists, or JSON. It also owns the
//! autogenerated header block and the rules for writing output files.

pub mod classify;
pub mod extract;
pub mod header;
pub mod markers;
pub mod order;
pub mod output;
pub mod render;
pub mod yaml;

pub use classify::{classify, python_include_line, Classified, ClassifyOptions};
pub use extract::{group_entries, merge, MergeOptions};
pub use header::{add_header, create_header};
pub use markers::{
    clean_conda_requirement, clean_pip_requirement, format_marker, marker_allows, PythonTarget,
};
pub use order::{sort_entries, unique_entries};
pub use output::{update_target, write_output};
pub use render::{
    render, render_conda_requirements, render_json, render_requirements, OutputFormat,
    RenderRequest, Rendered, DEFAULT_CHANNEL,
};
pub use yaml::render_conda;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] p2c_schema::ManifestError),
    #[error("unknown dependency group '{group}' (available: {})", available.join(", "))]
    UnknownGroup {
        group: String,
        available: Vec<String>,
    },
    #[error("unknown output format '{0}' (expected: yaml, requirements, conda-requirements, json)")]
    UnknownFormat(String),
    #[error("invalid requirement '{requirement}': {message}")]
    InvalidRequirement { requirement: String, message: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("no dependencies for this environment (pass --allow-empty to write an empty file)")]
    Empty,
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
