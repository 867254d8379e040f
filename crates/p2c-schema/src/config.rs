//! The `[tool.pyproject2conda]` table.
//!
//! ```toml
//! [tool.pyproject2conda]
//! channels = ["conda-forge"]
//! default_envs = ["test"]
//!
//! [tool.pyproject2conda.dependencies]
//! build = { pip = true }
//!
//! [tool.pyproject2conda.envs.dev]
//! extras = ["test", "dev"]
//! style = ["yaml", "requirements"]
//!
//! [[tool.pyproject2conda.overrides]]
//! envs = ["dev"]
//! base = false
//! ```

use crate::directive::Directive;
use crate::manifest::ManifestError;
use crate::requirement::normalize_name;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A TOML value that may be written as one string or a list of strings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s.clone()],
            Self::Many(v) => v.clone(),
        }
    }
}

/// `extras = true | "name" | ["a", "b"]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExtrasSpec {
    /// `true` selects the extra named like the env; `false` selects none.
    Flag(bool),
    One(String),
    Many(Vec<String>),
}

impl ExtrasSpec {
    pub fn resolve(&self, env_name: &str) -> Vec<String> {
        match self {
            Self::Flag(true) => vec![env_name.to_owned()],
            Self::Flag(false) => Vec::new(),
            Self::One(s) => vec![s.clone()],
            Self::Many(v) => v.clone(),
        }
    }
}

/// Per-package entry of `[tool.pyproject2conda.dependencies]`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct OverrideSpec {
    #[serde(default)]
    pub pip: bool,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub packages: Option<OneOrMany>,
}

impl From<&OverrideSpec> for Directive {
    fn from(spec: &OverrideSpec) -> Self {
        Directive::new(
            spec.pip,
            spec.skip,
            spec.channel.clone(),
            spec.packages.as_ref().map(OneOrMany::to_vec).unwrap_or_default(),
        )
    }
}

/// Settings shared by env definitions, `overrides` entries, and the top level.
///
/// Every field is optional so layers can be merged with [`EnvSettings::or`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EnvSettings {
    pub extras: Option<ExtrasSpec>,
    pub style: Option<OneOrMany>,
    pub output: Option<String>,
    pub template: Option<String>,
    pub name: Option<String>,
    pub channels: Option<OneOrMany>,
    pub python: Option<OneOrMany>,
    pub template_python: Option<String>,
    pub remove_whitespace: Option<bool>,
    pub python_include: Option<String>,
    pub python_version: Option<String>,
    pub sort: Option<bool>,
    pub base: Option<bool>,
    pub header: Option<bool>,
    pub deps: Option<OneOrMany>,
    pub reqs: Option<OneOrMany>,
    pub allow_empty: Option<bool>,
    pub overwrite: Option<String>,
    pub yaml_ext: Option<String>,
    pub reqs_ext: Option<String>,
}

impl EnvSettings {
    /// Field-wise merge: values set on `self` win over `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            extras: self.extras.or(fallback.extras),
            style: self.style.or(fallback.style),
            output: self.output.or(fallback.output),
            template: self.template.or(fallback.template),
            name: self.name.or(fallback.name),
            channels: self.channels.or(fallback.channels),
            python: self.python.or(fallback.python),
            template_python: self.template_python.or(fallback.template_python),
            remove_whitespace: self.remove_whitespace.or(fallback.remove_whitespace),
            python_include: self.python_include.or(fallback.python_include),
            python_version: self.python_version.or(fallback.python_version),
            sort: self.sort.or(fallback.sort),
            base: self.base.or(fallback.base),
            header: self.header.or(fallback.header),
            deps: self.deps.or(fallback.deps),
            reqs: self.reqs.or(fallback.reqs),
            allow_empty: self.allow_empty.or(fallback.allow_empty),
            overwrite: self.overwrite.or(fallback.overwrite),
            yaml_ext: self.yaml_ext.or(fallback.yaml_ext),
            reqs_ext: self.reqs_ext.or(fallback.reqs_ext),
        }
    }
}

/// One `[[tool.pyproject2conda.overrides]]` entry.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EnvOverride {
    pub envs: Vec<String>,
    #[serde(flatten)]
    pub settings: EnvSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub dependencies: BTreeMap<String, OverrideSpec>,
    #[serde(default)]
    pub envs: IndexMap<String, EnvSettings>,
    #[serde(default)]
    pub default_envs: Vec<String>,
    #[serde(default)]
    pub overrides: Vec<EnvOverride>,
    #[serde(flatten)]
    pub defaults: EnvSettings,
}

impl ToolConfig {
    /// Top-level `channels`.
    pub fn channels(&self) -> Vec<String> {
        self.defaults
            .channels
            .as_ref()
            .map(OneOrMany::to_vec)
            .unwrap_or_default()
    }

    /// Directive from the override table for a package, matched by
    /// normalized name.
    pub fn override_for(&self, package: &str) -> Option<Directive> {
        let wanted = normalize_name(package);
        self.dependencies
            .iter()
            .find(|(name, _)| normalize_name(name) == wanted)
            .map(|(_, spec)| Directive::from(spec))
    }

    /// Env names in declaration order: `envs` first, then `default_envs`.
    pub fn env_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.envs.keys().cloned().collect();
        for name in &self.default_envs {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Resolve an env: `overrides` beat the env definition, which beats the
    /// top-level table, which beats built-in defaults.
    pub fn resolve_env(&self, env: &str) -> Result<ResolvedEnv, ManifestError> {
        let own = match self.envs.get(env) {
            Some(settings) => settings.clone(),
            None if self.default_envs.iter().any(|e| e == env) => EnvSettings {
                extras: Some(ExtrasSpec::Flag(true)),
                ..EnvSettings::default()
            },
            None => {
                return Err(ManifestError::Config(format!(
                    "env '{env}' not in [tool.pyproject2conda.envs] (available: {})",
                    self.env_names().join(", ")
                )))
            }
        };

        let overridden = self
            .overrides
            .iter()
            .filter(|o| o.envs.iter().any(|e| e == env))
            .fold(EnvSettings::default(), |acc, o| o.settings.clone().or(acc));

        // `output` names a single file and is never inherited.
        let top = EnvSettings {
            output: None,
            ..self.defaults.clone()
        };
        let s = overridden.or(own).or(top);

        let styles = match &s.style {
            Some(style) => style
                .to_vec()
                .iter()
                .map(|v| v.parse())
                .collect::<Result<Vec<EnvStyle>, _>>()?,
            None => vec![EnvStyle::Yaml],
        };
        let overwrite = s.overwrite.as_deref().unwrap_or("check").parse()?;
        let pythons = s.python.as_ref().map(OneOrMany::to_vec).unwrap_or_default();
        if let Some(bad) = pythons.iter().find(|py| py.trim().is_empty()) {
            return Err(ManifestError::Config(format!("env '{env}': invalid python '{bad}'")));
        }

        Ok(ResolvedEnv {
            env: env.to_owned(),
            extras: s.extras.as_ref().map(|e| e.resolve(env)).unwrap_or_default(),
            styles,
            output: s.output,
            template: s.template.unwrap_or_else(|| "{env}".to_owned()),
            name: s.name,
            channels: s.channels.as_ref().map(OneOrMany::to_vec).unwrap_or_default(),
            pythons,
            template_python: s.template_python.unwrap_or_else(|| "py{py}-{env}".to_owned()),
            python_include: s.python_include,
            python_version: s.python_version,
            remove_whitespace: s.remove_whitespace,
            sort: s.sort.unwrap_or(true),
            base: s.base.unwrap_or(true),
            header: s.header,
            deps: s.deps.as_ref().map(OneOrMany::to_vec).unwrap_or_default(),
            reqs: s.reqs.as_ref().map(OneOrMany::to_vec).unwrap_or_default(),
            allow_empty: s.allow_empty.unwrap_or(false),
            overwrite,
            yaml_ext: s.yaml_ext.unwrap_or_else(|| ".yaml".to_owned()),
            reqs_ext: s.reqs_ext.unwrap_or_else(|| ".txt".to_owned()),
        })
    }
}

/// Output style of a configured env.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvStyle {
    Yaml,
    Requirements,
}

impl FromStr for EnvStyle {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yaml" => Ok(Self::Yaml),
            "requirements" => Ok(Self::Requirements),
            other => Err(ManifestError::Config(format!(
                "unknown style '{other}' (expected: yaml, requirements)"
            ))),
        }
    }
}

impl fmt::Display for EnvStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => f.write_str("yaml"),
            Self::Requirements => f.write_str("requirements"),
        }
    }
}

/// What to do when an env's output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    /// Rewrite only if the manifest is newer than the output.
    Check,
    Force,
    Skip,
}

impl FromStr for Overwrite {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "check" => Ok(Self::Check),
            "force" => Ok(Self::Force),
            "skip" => Ok(Self::Skip),
            other => Err(ManifestError::Config(format!(
                "unknown overwrite mode '{other}' (expected: check, force, skip)"
            ))),
        }
    }
}

/// A fully resolved `[tool.pyproject2conda.envs.<env>]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnv {
    pub env: String,
    pub extras: Vec<String>,
    pub styles: Vec<EnvStyle>,
    pub output: Option<String>,
    pub template: String,
    pub name: Option<String>,
    pub channels: Vec<String>,
    /// Pythons to emit one yaml file each for.
    pub pythons: Vec<String>,
    pub template_python: String,
    pub python_include: Option<String>,
    pub python_version: Option<String>,
    pub remove_whitespace: Option<bool>,
    pub sort: bool,
    pub base: bool,
    pub header: Option<bool>,
    pub deps: Vec<String>,
    pub reqs: Vec<String>,
    pub allow_empty: bool,
    pub overwrite: Overwrite,
    pub yaml_ext: String,
    pub reqs_ext: String,
}

impl ResolvedEnv {
    /// Output file for `style`: the explicit `output` when the env has a
    /// single style, else the template with `{env}` substituted plus the
    /// style's extension.
    pub fn output_path(&self, style: EnvStyle) -> String {
        if let (Some(output), 1) = (&self.output, self.styles.len()) {
            return output.clone();
        }
        let ext = match style {
            EnvStyle::Yaml => &self.yaml_ext,
            EnvStyle::Requirements => &self.reqs_ext,
        };
        format!("{}{ext}", self.template.replace("{env}", &self.env))
    }

    /// Every file the env produces. Yaml output fans out to one file per
    /// entry of `python`, named by `template_python`; requirements output
    /// does not depend on the python.
    pub fn targets(&self) -> Vec<EnvTarget> {
        let mut targets = Vec::new();
        for &style in &self.styles {
            if style == EnvStyle::Yaml && !self.pythons.is_empty() {
                for py in &self.pythons {
                    let stem = self
                        .template_python
                        .replace("{py_version}", py)
                        .replace("{py}", &py.replace('.', ""))
                        .replace("{env}", &self.env);
                    targets.push(EnvTarget {
                        style,
                        path: format!("{stem}{}", self.yaml_ext),
                        python: Some(py.clone()),
                    });
                }
            } else {
                targets.push(EnvTarget {
                    style,
                    path: self.output_path(style),
                    python: None,
                });
            }
        }
        targets
    }
}

/// One output file of an env.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvTarget {
    pub style: EnvStyle,
    pub path: String,
    /// Set when the file is pinned to one python of the env's `python` list.
    pub python: Option<String>,
}
