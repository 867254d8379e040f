pub mod completions;
pub mod conda_requirements;
pub mod json;
pub mod list;
pub mod man_pages;
pub mod project;
pub mod render;
pub mod requirements;
pub mod yaml;

use clap::Args;
use p2c_core::{write_output, OutputFormat, RenderRequest, Rendered};
use p2c_schema::{parse_manifest_file, CommentMarker, Manifest};
use std::path::Path;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_CONFIG_ERROR: u8 = 3;
pub const EXIT_WRITE_ERROR: u8 = 4;
pub const EXIT_MISSING_GROUP: u8 = 5;

/// Options shared by every rendering subcommand.
#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Optional-dependency group to include (repeatable).
    #[arg(short = 'e', long = "extra", value_name = "EXTRA")]
    pub extras: Vec<String>,

    /// Include project.dependencies (default).
    #[arg(long, overrides_with = "no_base")]
    pub base: bool,
    /// Leave out project.dependencies.
    #[arg(long, overrides_with = "base")]
    pub no_base: bool,

    /// Sort output lists (default).
    #[arg(long, overrides_with = "no_sort")]
    pub sort: bool,
    /// Keep manifest order.
    #[arg(long, overrides_with = "sort")]
    pub no_sort: bool,

    /// Drop repeated requirements (default).
    #[arg(long, overrides_with = "no_unique")]
    pub unique: bool,
    /// Keep repeated requirements.
    #[arg(long, overrides_with = "unique")]
    pub no_unique: bool,

    /// Strip whitespace from requirement strings (default).
    #[arg(long, overrides_with = "no_remove_whitespace")]
    pub remove_whitespace: bool,
    /// Keep canonical spacing in requirement strings.
    #[arg(long, overrides_with = "remove_whitespace")]
    pub no_remove_whitespace: bool,

    /// Write manifest comments next to requirements.
    #[arg(long, overrides_with = "no_annotate")]
    pub annotate: bool,
    /// Drop manifest comments (default).
    #[arg(long, overrides_with = "annotate")]
    pub no_annotate: bool,

    /// Include the autogenerated header (default: only when writing a file).
    #[arg(long, overrides_with = "no_header")]
    pub header: bool,
    #[arg(long, overrides_with = "header")]
    pub no_header: bool,

    /// Fail if a requested extra does not exist.
    #[arg(long)]
    pub strict: bool,

    /// Conda channel (repeatable). Defaults to [tool.pyproject2conda].channels.
    #[arg(short = 'c', long = "channel", value_name = "CHANNEL")]
    pub channels: Vec<String>,

    /// Environment name.
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Python line to put first; `infer` uses project.requires-python.
    #[arg(long)]
    pub python_include: Option<String>,

    /// Python version used to evaluate `python_version` markers.
    #[arg(long)]
    pub python_version: Option<String>,

    /// Shorthand for `--python-include python=X --python-version X`.
    #[arg(short = 'p', long)]
    pub python: Option<String>,

    /// Additional conda dependency (repeatable).
    #[arg(short = 'd', long = "deps", value_name = "DEP")]
    pub deps: Vec<String>,

    /// Additional pip requirement (repeatable).
    #[arg(short = 'r', long = "reqs", value_name = "REQ")]
    pub reqs: Vec<String>,

    /// Produce a placeholder instead of failing when nothing is selected.
    #[arg(long)]
    pub allow_empty: bool,

    /// Delimiter between a requirement and its comment.
    #[arg(long, default_value = "#")]
    pub comment_marker: String,
}

/// Collapse a `--flag/--no-flag` pair; `None` when neither was given.
pub fn tri_state(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl RenderArgs {
    /// Build a request; `writes_file` decides the header default.
    pub fn to_request(
        &self,
        format: OutputFormat,
        writes_file: bool,
        header_cmd: &str,
    ) -> Result<RenderRequest, String> {
        let marker = CommentMarker::new(&self.comment_marker).map_err(|e| e.to_string())?;
        let mut request = RenderRequest {
            format,
            extras: self.extras.clone(),
            include_base: tri_state(self.base, self.no_base).unwrap_or(true),
            strict: self.strict,
            channels: self.channels.clone(),
            name: self.name.clone(),
            header: tri_state(self.header, self.no_header).unwrap_or(writes_file),
            header_cmd: Some(header_cmd.to_owned()),
            sort: tri_state(self.sort, self.no_sort).unwrap_or(true),
            unique: tri_state(self.unique, self.no_unique).unwrap_or(true),
            remove_whitespace: tri_state(self.remove_whitespace, self.no_remove_whitespace)
                .unwrap_or(true),
            annotate: tri_state(self.annotate, self.no_annotate).unwrap_or(false),
            python_include: self.python_include.clone(),
            python_version: self.python_version.clone(),
            deps: self.deps.clone(),
            reqs: self.reqs.clone(),
            prepend_channel: false,
            allow_empty: self.allow_empty,
            marker,
        };
        if let Some(python) = &self.python {
            request = request.with_python(python);
        }
        Ok(request)
    }
}

pub fn load_manifest(path: &Path) -> Result<Manifest, String> {
    parse_manifest_file(path).map_err(|e| e.to_string())
}

/// Render one single-stream output to `output` or stdout.
pub fn emit(
    manifest_path: &Path,
    args: &RenderArgs,
    format: OutputFormat,
    output: Option<&Path>,
    header_cmd: &str,
) -> Result<u8, String> {
    let request = args.to_request(format, output.is_some(), header_cmd)?;
    let manifest = load_manifest(manifest_path)?;
    let text = p2c_core::render(&manifest, &request)
        .map_err(|e| e.to_string())?
        .combined();
    write_or_print(output, &text)?;
    Ok(EXIT_SUCCESS)
}

pub fn write_or_print(output: Option<&Path>, text: &str) -> Result<(), String> {
    match output {
        Some(path) => write_output(path, text).map_err(|e| e.to_string()),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

/// Rendered text for either output shape.
pub fn rendered_parts(rendered: Rendered) -> (String, Option<String>) {
    match rendered {
        Rendered::Text(text) => (text, None),
        Rendered::Split { conda, pip } => (conda, Some(pip)),
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Map an error message to its exit code.
pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("unknown dependency group") {
        EXIT_MISSING_GROUP
    } else if msg.starts_with("failed to write") {
        EXIT_WRITE_ERROR
    } else if msg.starts_with("unknown output format")
        || msg.starts_with("comment marker")
        || msg.contains("configuration error:")
    {
        EXIT_CONFIG_ERROR
    } else if msg.starts_with("manifest error:")
        || msg.starts_with("invalid requirement")
        || msg.starts_with("failed to parse manifest")
        || msg.starts_with("failed to read manifest")
        || msg.starts_with("invalid [tool.pyproject2conda]")
        || msg.starts_with("invalid p2c directive")
    {
        EXIT_MANIFEST_ERROR
    } else {
        EXIT_FAILURE
    }
}
