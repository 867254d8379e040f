//! Manifest reading, dependency entries, comment directives, and tool configuration for p2c.
//!
//! This crate defines the schema layer: comment-preserving `pyproject.toml`
//! loading (`Manifest`) with path lookup, extraction of `(requirement, comment)`
//! entries from dependency arrays (`extract_pairs`), the configurable inline
//! comment marker (`CommentMarker`), `p2c:` comment directives (`Directive`),
//! and the `[tool.pyproject2conda]` table (`ToolConfig`).

pub mod config;
pub mod directive;
pub mod manifest;
pub mod marker;
pub mod pairs;
pub mod requirement;

pub use config::{
    EnvSettings, EnvStyle, EnvTarget, ExtrasSpec, OneOrMany, Overwrite, ResolvedEnv, ToolConfig,
};
pub use directive::Directive;
pub use manifest::{
    parse_manifest_file, parse_manifest_str, Manifest, ManifestError, BASE_GROUP,
    BUILD_SYSTEM_GROUP,
};
pub use marker::CommentMarker;
pub use pairs::{extract_pairs, parse_requirements_text, DependencyEntry};
pub use requirement::{normalize_name, requirement_extras, requirement_name};
