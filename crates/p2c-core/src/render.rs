use crate::classify::{classify, python_include_line, Classified, ClassifyOptions};
use crate::extract::{merge, MergeOptions};
use crate::header::add_header;
use crate::markers::clean_pip_requirement;
use crate::order::{sort_entries, unique_entries};
use crate::yaml::render_conda;
use crate::CoreError;
use p2c_schema::{CommentMarker, DependencyEntry, Manifest};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub use crate::yaml::DEFAULT_CHANNEL;

const EMPTY_MESSAGE: &str = "No dependencies for this environment\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Yaml,
    Requirements,
    CondaRequirements,
    Json,
}

impl FromStr for OutputFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yaml" | "conda" => Ok(Self::Yaml),
            "requirements" | "pip" => Ok(Self::Requirements),
            "conda-requirements" => Ok(Self::CondaRequirements),
            "json" => Ok(Self::Json),
            _ => Err(CoreError::UnknownFormat(s.to_owned())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yaml => "yaml",
            Self::Requirements => "requirements",
            Self::CondaRequirements => "conda-requirements",
            Self::Json => "json",
        })
    }
}

/// Everything needed to turn a manifest into one output.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub format: OutputFormat,
    pub extras: Vec<String>,
    pub include_base: bool,
    pub strict: bool,
    /// Overrides `[tool.pyproject2conda].channels` when non-empty.
    pub channels: Vec<String>,
    pub name: Option<String>,
    pub header: bool,
    /// Command line shown in the header.
    pub header_cmd: Option<String>,
    pub sort: bool,
    pub unique: bool,
    /// Strip all whitespace from requirement strings.
    pub remove_whitespace: bool,
    pub annotate: bool,
    pub python_include: Option<String>,
    pub python_version: Option<String>,
    pub deps: Vec<String>,
    pub reqs: Vec<String>,
    pub prepend_channel: bool,
    pub allow_empty: bool,
    pub marker: CommentMarker,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            format: OutputFormat::Yaml,
            extras: Vec::new(),
            include_base: true,
            strict: false,
            channels: Vec::new(),
            name: None,
            header: false,
            header_cmd: None,
            sort: true,
            unique: true,
            remove_whitespace: true,
            annotate: false,
            python_include: None,
            python_version: None,
            deps: Vec::new(),
            reqs: Vec::new(),
            prepend_channel: false,
            allow_empty: false,
            marker: CommentMarker::default(),
        }
    }
}

impl RenderRequest {
    /// `--python X`: include `python=X` and filter markers for `X`.
    #[must_use]
    pub fn with_python(mut self, python: &str) -> Self {
        self.python_include = Some(format!("python={python}"));
        self.python_version = Some(python.to_owned());
        self
    }

    fn header_text(&self, text: &str) -> String {
        if self.header && !text.is_empty() {
            add_header(text, self.header_cmd.as_deref())
        } else {
            text.to_owned()
        }
    }
}

/// Result of [`render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Text(String),
    /// `conda-requirements`: separate conda and pip lists.
    Split { conda: String, pip: String },
}

impl Rendered {
    /// Single-stream form; split output gets section markers.
    pub fn combined(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Split { conda, pip } => {
                format!("#conda requirements\n{conda}\n#pip requirements\n{pip}")
            }
        }
    }
}

/// Render `request` against `manifest`. The manifest is never modified.
pub fn render(manifest: &Manifest, request: &RenderRequest) -> Result<Rendered, CoreError> {
    let merged = merge(
        manifest,
        &MergeOptions {
            extras: &request.extras,
            include_base: request.include_base,
            strict: request.strict,
            marker: &request.marker,
        },
    )?;
    debug!(
        "merged {} entries for {} from {}",
        merged.len(),
        request.format,
        manifest.origin()
    );

    if request.format == OutputFormat::Requirements {
        let mut entries = Vec::with_capacity(merged.len() + request.reqs.len());
        for entry in merged {
            let requirement = entry
                .requirement
                .as_deref()
                .map(|r| clean_pip_requirement(r, request.remove_whitespace))
                .transpose()?;
            entries.push(DependencyEntry { requirement, ..entry });
        }
        for r in &request.reqs {
            let requirement = clean_pip_requirement(r, request.remove_whitespace)?;
            entries.push(DependencyEntry::new(requirement, None));
        }
        if request.unique {
            entries = unique_entries(entries);
        }
        if request.sort {
            sort_entries(&mut entries);
        }
        if entries.iter().all(|e| e.requirement.is_none()) {
            return empty(request);
        }
        let text = render_requirements(&entries, request.annotate, &request.marker);
        return Ok(Rendered::Text(request.header_text(&text)));
    }

    let python_include = python_include_line(
        request.python_include.as_deref(),
        manifest,
        request.remove_whitespace,
    )?;
    let classified = classify(
        &merged,
        &ClassifyOptions {
            marker: &request.marker,
            tool: manifest.tool(),
            python_version: request.python_version.as_deref(),
            python_include: python_include.as_deref(),
            deps: &request.deps,
            reqs: &request.reqs,
            sort: request.sort,
            unique: request.unique,
            remove_whitespace: request.remove_whitespace,
        },
    )?;
    let channels = if request.channels.is_empty() {
        manifest.tool().channels()
    } else {
        request.channels.clone()
    };

    match request.format {
        OutputFormat::Json => Ok(Rendered::Text(render_json(
            request.name.as_deref(),
            &channels,
            &classified,
        )?)),
        _ if classified.is_empty() => empty(request),
        OutputFormat::CondaRequirements => {
            let (conda, pip) = render_conda_requirements(&classified, &channels, request.prepend_channel)?;
            Ok(Rendered::Split {
                conda: request.header_text(&conda),
                pip: request.header_text(&pip),
            })
        }
        _ => {
            let text = render_conda(
                request.name.as_deref(),
                &channels,
                &classified.conda,
                &classified.pip,
                request.annotate,
            );
            Ok(Rendered::Text(request.header_text(&text)))
        }
    }
}

fn empty(request: &RenderRequest) -> Result<Rendered, CoreError> {
    if request.allow_empty {
        Ok(Rendered::Text(EMPTY_MESSAGE.to_owned()))
    } else {
        Err(CoreError::Empty)
    }
}

/// Pip requirements text, one entry per line.
///
/// With `annotate`, comments follow as `<req>  <marker> <comment>` and
/// comment-only entries are kept as `<marker> <comment>`, so the text parses
/// back into the same entries.
pub fn render_requirements(entries: &[DependencyEntry], annotate: bool, marker: &CommentMarker) -> String {
    let m = marker.as_str();
    let mut out = String::new();
    for entry in entries {
        let line = match (&entry.requirement, &entry.comment, annotate) {
            (Some(r), Some(c), true) => format!("{r}  {m} {c}"),
            (Some(r), _, _) => r.clone(),
            (None, Some(c), true) => format!("{m} {c}"),
            (None, _, _) => continue,
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Plain conda and pip lists.
///
/// With `prepend_channel`, conda lines without a `channel::` prefix get the
/// single configured channel; more than one channel is a configuration error.
pub fn render_conda_requirements(
    classified: &Classified,
    channels: &[String],
    prepend_channel: bool,
) -> Result<(String, String), CoreError> {
    let mut conda: Vec<String> = classified
        .conda_requirements()
        .into_iter()
        .map(str::to_owned)
        .collect();
    if prepend_channel && !conda.is_empty() {
        match channels {
            [] => {}
            [channel] => {
                for dep in &mut conda {
                    if !dep.contains("::") {
                        *dep = format!("{channel}::{dep}");
                    }
                }
            }
            _ => {
                return Err(CoreError::Config(format!(
                    "--prepend-channel needs exactly one channel, got {}",
                    channels.join(", ")
                )))
            }
        }
    }
    Ok((lines(conda.iter().map(String::as_str)), lines(classified.pip_requirements())))
}

fn lines<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items.into_iter().fold(String::new(), |mut acc, item| {
        acc.push_str(item);
        acc.push('\n');
        acc
    })
}

#[derive(Serialize)]
struct JsonEnvironment<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    channels: Vec<&'a str>,
    dependencies: Vec<&'a str>,
    pip: Vec<&'a str>,
}

/// `{"channels": [...], "dependencies": [...], "pip": [...]}`.
pub fn render_json(name: Option<&str>, channels: &[String], classified: &Classified) -> Result<String, CoreError> {
    let channels = if channels.is_empty() {
        vec![DEFAULT_CHANNEL]
    } else {
        channels.iter().map(String::as_str).collect()
    };
    let env = JsonEnvironment {
        name,
        channels,
        dependencies: classified.conda_requirements(),
        pip: classified.pip_requirements(),
    };
    Ok(serde_json::to_string_pretty(&env)? + "\n")
}
