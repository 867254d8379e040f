//! PEP 508 requirements and environment markers.
//!
//! Requirements are parsed with `pep508_rs` and written back in one
//! canonical spelling: the name as written, sorted extras, sorted version
//! specifiers, and a marker with single spaces and double-quoted values.
//! Markers are evaluated against the host platform with the target python
//! standing in for `python_version` and `python_full_version`.

use crate::CoreError;
use p2c_schema::{requirement_extras, requirement_name};
use pep508_rs::{MarkerEnvironment, Requirement as PepRequirement, StringVersion, VersionOrUrl};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

fn marker_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"'[^']*'|"[^"]*"|\(|\)|===|==|!=|~=|<=|>=|<|>|[A-Za-z_][A-Za-z0-9_.]*"#)
            .expect("valid marker token pattern")
    })
}

/// Python version used to evaluate markers.
#[derive(Debug)]
pub struct PythonTarget {
    version: String,
    env: MarkerEnvironment,
}

impl PythonTarget {
    pub fn new(version: &str) -> Result<Self, CoreError> {
        let version = version.trim();
        let parse = |v: &str| {
            StringVersion::from_str(v)
                .map_err(|e| CoreError::Config(format!("invalid python version '{version}': {e}")))
        };
        let (os_name, sys_platform, platform_system) = host_platform();
        let env = MarkerEnvironment {
            implementation_name: "cpython".into(),
            implementation_version: parse(version)?,
            os_name: os_name.into(),
            platform_machine: std::env::consts::ARCH.into(),
            platform_python_implementation: "CPython".into(),
            platform_release: String::new(),
            platform_system: platform_system.into(),
            platform_version: String::new(),
            python_full_version: parse(version)?,
            python_version: parse(version)?,
            sys_platform: sys_platform.into(),
        };
        Ok(Self {
            version: version.to_owned(),
            env,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn admits(&self, requirement: &PepRequirement) -> bool {
        requirement.marker.is_none() || requirement.evaluate_markers(&self.env, &[])
    }
}

/// `(os_name, sys_platform, platform_system)` of the running host.
fn host_platform() -> (&'static str, &'static str, &'static str) {
    match std::env::consts::OS {
        "windows" => ("nt", "win32", "Windows"),
        "macos" => ("posix", "darwin", "Darwin"),
        "linux" => ("posix", "linux", "Linux"),
        other => ("posix", other, other),
    }
}

fn parse(raw: &str) -> Result<PepRequirement, CoreError> {
    let raw = raw.trim();
    PepRequirement::from_str(raw).map_err(|e| CoreError::InvalidRequirement {
        requirement: raw.to_owned(),
        message: e.to_string(),
    })
}

/// Whether a marker expression holds for `python` on this host.
pub fn marker_allows(marker: &str, python: &PythonTarget) -> Result<bool, CoreError> {
    let requirement = parse(&format!("python ; {marker}"))?;
    Ok(python.admits(&requirement))
}

/// Canonical marker text: single spaces between tokens, none inside
/// parentheses, values in double quotes, one redundant outer group dropped.
pub fn format_marker(marker: &str) -> String {
    let mut tokens: Vec<&str> = marker_token_re()
        .find_iter(marker)
        .map(|m| m.as_str())
        .collect();
    if tokens.first() == Some(&"(") && closing_paren(&tokens) == Some(tokens.len() - 1) {
        tokens = tokens[1..tokens.len() - 1].to_vec();
    }

    let mut out = String::new();
    for token in tokens {
        if token != ")" && !out.is_empty() && !out.ends_with('(') {
            out.push(' ');
        }
        match token.chars().next() {
            Some(q @ ('\'' | '"')) => {
                let value = token.trim_matches(q);
                if value.contains('"') {
                    out.push_str(&format!("'{value}'"));
                } else {
                    out.push_str(&format!("\"{value}\""));
                }
            }
            _ => out.push_str(token),
        }
    }
    out
}

/// Index of the `)` matching the leading `(`.
fn closing_paren(tokens: &[&str]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match *token {
            "(" => depth += 1,
            ")" => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn squeeze(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Canonical text of a parsed requirement.
fn canonical(raw: &str, parsed: &PepRequirement, keep_extras_and_marker: bool) -> String {
    let raw = raw.trim();
    let mut out = requirement_name(raw).map_or_else(|| parsed.name.to_string(), str::to_owned);

    if keep_extras_and_marker {
        let mut extras = requirement_extras(raw);
        extras.sort();
        if !extras.is_empty() {
            out.push('[');
            out.push_str(&extras.join(","));
            out.push(']');
        }
    }

    let mut is_url = false;
    match &parsed.version_or_url {
        Some(VersionOrUrl::VersionSpecifier(specifiers)) => {
            let mut specs: Vec<String> = specifiers.iter().map(ToString::to_string).collect();
            specs.sort();
            out.push_str(&specs.join(","));
        }
        Some(VersionOrUrl::Url(_)) => {
            let after_at = raw.split_once('@').map_or("", |(_, rest)| rest);
            let url = match after_at.rsplit_once(';') {
                Some((url, _)) if parsed.marker.is_some() => url,
                _ => after_at,
            };
            out.push_str("@ ");
            out.push_str(url.trim());
            is_url = true;
        }
        None => {}
    }

    if keep_extras_and_marker && parsed.marker.is_some() {
        let marker = if is_url {
            raw.rsplit_once(';')
        } else {
            raw.split_once(';')
        }
        .map_or("", |(_, m)| m);
        if is_url {
            out.push(' ');
        }
        out.push_str("; ");
        out.push_str(&format_marker(marker));
    }
    out
}

/// Pip form of a requirement: canonical spelling, markers and extras kept.
pub fn clean_pip_requirement(raw: &str, remove_whitespace: bool) -> Result<String, CoreError> {
    let text = canonical(raw, &parse(raw)?, true);
    Ok(if remove_whitespace { squeeze(&text) } else { text })
}

/// Conda form of a requirement: marker and extras removed, optionally
/// prefixed with `channel::`.
///
/// A requirement may carry its own `channel::` prefix (extra conda packages
/// usually do); an explicit `channel` replaces it. Returns `None` when
/// `python` is given and the marker excludes it.
pub fn clean_conda_requirement(
    raw: &str,
    python: Option<&PythonTarget>,
    channel: Option<&str>,
    remove_whitespace: bool,
) -> Result<Option<String>, CoreError> {
    let (own_channel, rest) = match raw.split_once("::") {
        Some((c, r)) => (Some(c.trim()), r),
        None => (None, raw),
    };
    let parsed = parse(rest)?;
    if let Some(python) = python {
        if !python.admits(&parsed) {
            debug!("dropping '{raw}': marker excludes python {}", python.version());
            return Ok(None);
        }
    }
    let text = canonical(rest, &parsed, false);
    let text = match channel.or(own_channel) {
        Some(c) if !c.is_empty() => format!("{c}::{text}"),
        _ => text,
    };
    Ok(Some(if remove_whitespace { squeeze(&text) } else { text }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn py(v: &str) -> PythonTarget {
        PythonTarget::new(v).unwrap()
    }

    fn allows(marker: &str, v: &str) -> bool {
        marker_allows(marker, &py(v)).unwrap()
    }

    #[test]
    fn evaluates_python_version_clauses() {
        assert!(allows("python_version < '3.9'", "3.8"));
        assert!(!allows("python_version < '3.9'", "3.10"));
        assert!(allows(r#"python_version >= "3.10""#, "3.11"));
        assert!(!allows("python_version == '3.8'", "3.9"));
    }

    #[test]
    fn combines_and_or() {
        let m = "python_version >= '3.8' and python_version < '3.10'";
        assert!(allows(m, "3.9"));
        assert!(!allows(m, "3.10"));
        let m = "python_version < '3.8' or python_version > '3.11'";
        assert!(!allows(m, "3.9"));
        assert!(allows(m, "3.12"));
    }

    #[test]
    fn parentheses_group_before_and() {
        let m = "(python_version < '3.8' or python_version > '3.11') and python_version != '3.7'";
        assert!(!allows(m, "3.7"));
        assert!(!allows(m, "3.9"));
        assert!(allows(m, "3.12"));
        let m = "python_version < '3.8' or (python_version > '3.11' and python_version != '3.12')";
        assert!(allows(m, "3.7"));
        assert!(!allows(m, "3.12"));
        assert!(allows(m, "3.13"));
    }

    #[test]
    fn platform_markers_use_the_host() {
        assert!(!allows("sys_platform == 'no-such-platform'", "3.8"));
        assert!(allows("sys_platform != 'no-such-platform'", "3.8"));
        assert!(!allows("extra == 'test'", "3.8"));
    }

    #[test]
    fn invalid_python_version_is_config_error() {
        assert!(matches!(PythonTarget::new("three"), Err(CoreError::Config(_))));
    }

    #[test]
    fn marker_formatting() {
        assert_eq!(format_marker("python_version<'3.10'"), r#"python_version < "3.10""#);
        assert_eq!(
            format_marker("( python_version<'3.8' or os_name=='nt' )and extra == 'a'"),
            r#"(python_version < "3.8" or os_name == "nt") and extra == "a""#
        );
        assert_eq!(format_marker("(python_version < '3.8')"), r#"python_version < "3.8""#);
        assert_eq!(format_marker("sys_platform not in 'win32'"), r#"sys_platform not in "win32""#);
    }

    #[test]
    fn pip_requirements_are_canonical() {
        assert_eq!(
            clean_pip_requirement("cthing; python_version < '3.10'", true).unwrap(),
            r#"cthing;python_version<"3.10""#
        );
        assert_eq!(
            clean_pip_requirement("thing;python_version<'3.10'", false).unwrap(),
            r#"thing; python_version < "3.10""#
        );
        assert_eq!(clean_pip_requirement("numpy >= 1.0", true).unwrap(), "numpy>=1.0");
        assert_eq!(clean_pip_requirement("numpy>=1.0", true).unwrap(), "numpy>=1.0");
        assert_eq!(
            clean_pip_requirement("Dask[ dataframe,array ] >=2023.1, <2024", true).unwrap(),
            "Dask[array,dataframe]<2024,>=2023.1"
        );
    }

    #[test]
    fn url_requirements_keep_the_url() {
        assert_eq!(
            clean_pip_requirement("pkg @ https://example.com/pkg-1.0.tar.gz", false).unwrap(),
            "pkg@ https://example.com/pkg-1.0.tar.gz"
        );
    }

    #[test]
    fn invalid_requirement_is_reported() {
        let err = clean_pip_requirement("numpy; python_version <", true).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequirement { .. }));
        assert!(err.to_string().contains("invalid requirement 'numpy; python_version <'"));
    }

    #[test]
    fn strips_markers_and_extras() {
        assert_eq!(
            clean_conda_requirement("dask[dataframe] >= 2023.1", None, None, true).unwrap().as_deref(),
            Some("dask>=2023.1")
        );
        assert_eq!(
            clean_conda_requirement("typing-extensions; python_version < '3.10'", None, None, true)
                .unwrap()
                .as_deref(),
            Some("typing-extensions")
        );
    }

    #[test]
    fn filters_by_python_version() {
        let req = "tomli; python_version < '3.11'";
        assert_eq!(
            clean_conda_requirement(req, Some(&py("3.10")), None, true).unwrap().as_deref(),
            Some("tomli")
        );
        assert_eq!(clean_conda_requirement(req, Some(&py("3.11")), None, true).unwrap(), None);
        let grouped = "tomli; (python_version < '3.8' or python_version > '3.11') and python_version != '3.7'";
        assert_eq!(clean_conda_requirement(grouped, Some(&py("3.7")), None, true).unwrap(), None);
    }

    #[test]
    fn applies_channels() {
        assert_eq!(
            clean_conda_requirement("pytest", None, Some("conda-forge"), true).unwrap().as_deref(),
            Some("conda-forge::pytest")
        );
        assert_eq!(
            clean_conda_requirement("bioconda::samtools >=1.17", None, None, true).unwrap().as_deref(),
            Some("bioconda::samtools>=1.17")
        );
        assert_eq!(
            clean_conda_requirement("bioconda::samtools", None, Some("conda-forge"), true)
                .unwrap()
                .as_deref(),
            Some("conda-forge::samtools")
        );
    }
}
