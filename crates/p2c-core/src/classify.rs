use crate::markers::{clean_conda_requirement, clean_pip_requirement, PythonTarget};
use crate::order::{sort_entries, unique_entries};
use crate::CoreError;
use p2c_schema::{requirement_name, CommentMarker, DependencyEntry, Manifest, ToolConfig};
use tracing::{debug, warn};

/// Inputs for splitting merged entries into conda and pip lists.
#[derive(Debug, Clone)]
pub struct ClassifyOptions<'a> {
    pub marker: &'a CommentMarker,
    /// Source of the `[tool.pyproject2conda.dependencies]` override table.
    pub tool: &'a ToolConfig,
    pub python_version: Option<&'a str>,
    /// Resolved python line, placed first in the conda list.
    pub python_include: Option<&'a str>,
    /// Extra conda packages.
    pub deps: &'a [String],
    /// Extra pip requirements.
    pub reqs: &'a [String],
    pub sort: bool,
    pub unique: bool,
    pub remove_whitespace: bool,
}

/// The conda and pip sides of an environment.
///
/// Entry comments have their `p2c:` directive removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub conda: Vec<DependencyEntry>,
    pub pip: Vec<DependencyEntry>,
}

impl Classified {
    pub fn is_empty(&self) -> bool {
        self.conda.is_empty() && self.pip.is_empty()
    }

    pub fn conda_requirements(&self) -> Vec<&str> {
        requirements_of(&self.conda)
    }

    pub fn pip_requirements(&self) -> Vec<&str> {
        requirements_of(&self.pip)
    }
}

fn requirements_of(entries: &[DependencyEntry]) -> Vec<&str> {
    entries.iter().filter_map(|e| e.requirement.as_deref()).collect()
}

/// `infer` becomes `python` followed by `project.requires-python`; anything
/// else is used as given.
pub fn python_include_line(
    include: Option<&str>,
    manifest: &Manifest,
    remove_whitespace: bool,
) -> Result<Option<String>, CoreError> {
    let line = match include.map(str::trim) {
        None | Some("") => return Ok(None),
        Some("infer") => format!("python{}", manifest.requires_python()?),
        Some(other) => other.to_owned(),
    };
    Ok(Some(if remove_whitespace {
        line.split_whitespace().collect()
    } else {
        line
    }))
}

/// Route each entry by its directive (inline first, then the override
/// table): pip entries go to the pip list, skipped ones are dropped, the
/// rest become conda requirements, and directive packages are appended to
/// the conda list.
pub fn classify(entries: &[DependencyEntry], opts: &ClassifyOptions<'_>) -> Result<Classified, CoreError> {
    let python = opts.python_version.map(PythonTarget::new).transpose()?;
    let python = python.as_ref();
    let rw = opts.remove_whitespace;
    let conda_entry = |requirement: &str, channel: Option<&str>, comment: Option<String>| {
        clean_conda_requirement(requirement, python, channel, rw).map(|r| {
            r.map(|r| DependencyEntry {
                requirement: Some(r),
                comment,
            })
        })
    };

    let mut pip = Vec::new();
    for r in opts.reqs {
        pip.push(DependencyEntry::new(clean_pip_requirement(r, rw)?, None));
    }
    let mut conda = Vec::new();
    for d in opts.deps {
        conda.extend(conda_entry(d, None, None)?);
    }

    for entry in entries {
        let inline = entry.directive(opts.marker)?;
        let directive = inline.or_else(|| {
            entry
                .requirement
                .as_deref()
                .and_then(requirement_name)
                .and_then(|name| opts.tool.override_for(name))
        });
        let annotation = entry.annotation(opts.marker);

        let Some(directive) = directive else {
            if let Some(requirement) = &entry.requirement {
                conda.extend(conda_entry(requirement, None, annotation)?);
            }
            continue;
        };

        match (&entry.requirement, directive.pip, directive.skip) {
            (Some(requirement), true, _) => pip.push(DependencyEntry {
                requirement: Some(clean_pip_requirement(requirement, rw)?),
                comment: annotation,
            }),
            (Some(_), false, true) => debug!("skipping {:?} on the conda side", entry.requirement),
            (Some(requirement), false, false) => {
                conda.extend(conda_entry(requirement, directive.channel.as_deref(), annotation)?);
            }
            (None, ..) if directive.pip || directive.channel.is_some() => {
                warn!(
                    "directive in '{}' has no requirement to apply to",
                    entry.comment.as_deref().unwrap_or_default()
                );
            }
            (None, ..) => {}
        }
        for package in &directive.packages {
            conda.extend(conda_entry(package, None, None)?);
        }
    }

    let finish = |mut list: Vec<DependencyEntry>| {
        if opts.unique {
            list = unique_entries(list);
        }
        if opts.sort {
            sort_entries(&mut list);
        }
        list
    };
    let pip = finish(pip);
    let mut conda = finish(conda);

    if let Some(line) = opts.python_include {
        conda.insert(0, DependencyEntry::new(line, None));
    }

    // pip goes last whenever the pip side is used
    if let Some(pos) = conda.iter().position(|e| e.requirement.as_deref() == Some("pip")) {
        let entry = conda.remove(pos);
        conda.push(entry);
    } else if !pip.is_empty() {
        conda.push(DependencyEntry::new("pip", None));
    }

    Ok(Classified { conda, pip })
}

#[cfg(test)]
mod tests {
    use super::*;
    use p2c_schema::parse_manifest_str;

    fn entry(req: &str, comment: Option<&str>) -> DependencyEntry {
        DependencyEntry::new(req, comment)
    }

    fn run(entries: &[DependencyEntry], tool: &ToolConfig, sort: bool) -> Classified {
        let marker = CommentMarker::default();
        classify(
            entries,
            &ClassifyOptions {
                marker: &marker,
                tool,
                python_version: None,
                python_include: None,
                deps: &[],
                reqs: &[],
                sort,
                unique: true,
                remove_whitespace: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn routes_by_directive() {
        let entries = vec![
            entry("athing", Some("p2c: -p # a comment")),
            entry("bthing", Some("p2c: -s bthing-conda")),
            entry("cthing", Some("p2c: -c conda-forge")),
        ];
        let out = run(&entries, &ToolConfig::default(), true);
        assert_eq!(out.conda_requirements(), vec!["bthing-conda", "conda-forge::cthing", "pip"]);
        assert_eq!(out.pip_requirements(), vec!["athing"]);
        assert_eq!(out.pip[0].comment.as_deref(), Some("a comment"));
        assert_eq!(out.conda[1].comment, None);
    }

    #[test]
    fn standalone_directive_adds_packages() {
        let entries = vec![
            DependencyEntry::comment_only("p2c: -s additional-thing # this is an additional conda package"),
            entry("matplotlib", Some("p2c: -s conda-matplotlib")),
            DependencyEntry::comment_only("just a note"),
        ];
        let out = run(&entries, &ToolConfig::default(), false);
        assert_eq!(out.conda_requirements(), vec!["additional-thing", "conda-matplotlib"]);
        assert!(out.pip.is_empty());
    }

    #[test]
    fn override_table_applies_without_inline_directive() {
        let manifest = parse_manifest_str(
            r#"
[tool.pyproject2conda.dependencies]
athing = { pip = true }
bthing = { channel = "bioconda" }
"#,
        )
        .unwrap();
        let entries = vec![
            entry("athing>=1", None),
            entry("bthing", None),
            entry("Bthing", Some("p2c: -c conda-forge")),
        ];
        let out = run(&entries, manifest.tool(), false);
        assert_eq!(out.pip_requirements(), vec!["athing>=1"]);
        assert_eq!(
            out.conda_requirements(),
            vec!["bioconda::bthing", "conda-forge::Bthing", "pip"]
        );
    }

    #[test]
    fn pip_moves_last_and_python_goes_first() {
        let marker = CommentMarker::default();
        let deps = vec!["pip".to_owned(), "zlib".to_owned()];
        let reqs = vec!["requests".to_owned()];
        let out = classify(
            &[entry("numpy", None)],
            &ClassifyOptions {
                marker: &marker,
                tool: &ToolConfig::default(),
                python_version: None,
                python_include: Some("python>=3.8"),
                deps: &deps,
                reqs: &reqs,
                sort: true,
                unique: true,
                remove_whitespace: true,
            },
        )
        .unwrap();
        assert_eq!(out.conda_requirements(), vec!["python>=3.8", "numpy", "zlib", "pip"]);
        assert_eq!(out.pip_requirements(), vec!["requests"]);
    }

    #[test]
    fn python_version_filters_markers() {
        let marker = CommentMarker::default();
        let entries = vec![
            entry("tomli; python_version < '3.11'", None),
            entry("typing-extensions; python_version < '3.10'", Some("p2c: -p")),
        ];
        let out = classify(
            &entries,
            &ClassifyOptions {
                marker: &marker,
                tool: &ToolConfig::default(),
                python_version: Some("3.10"),
                python_include: None,
                deps: &[],
                reqs: &[],
                sort: true,
                unique: true,
                remove_whitespace: true,
            },
        )
        .unwrap();
        assert_eq!(out.conda_requirements(), vec!["tomli", "pip"]);
        // pip keeps markers for pip to evaluate
        assert_eq!(out.pip_requirements(), vec![r#"typing-extensions;python_version<"3.10""#]);
    }

    #[test]
    fn invalid_python_version_is_config_error() {
        let marker = CommentMarker::default();
        let err = classify(
            &[],
            &ClassifyOptions {
                marker: &marker,
                tool: &ToolConfig::default(),
                python_version: Some("three"),
                python_include: None,
                deps: &[],
                reqs: &[],
                sort: true,
                unique: true,
                remove_whitespace: true,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn python_include_infer() {
        let manifest = parse_manifest_str("[project]\nrequires-python = \">=3.8, <3.11\"\n").unwrap();
        assert_eq!(
            python_include_line(Some("infer"), &manifest, true).unwrap().as_deref(),
            Some("python>=3.8,<3.11")
        );
        assert_eq!(
            python_include_line(Some("infer"), &manifest, false).unwrap().as_deref(),
            Some("python>=3.8, <3.11")
        );
        assert_eq!(
            python_include_line(Some("python=3.9"), &manifest, true).unwrap().as_deref(),
            Some("python=3.9")
        );
        assert_eq!(python_include_line(None, &manifest, true).unwrap(), None);

        let bare = parse_manifest_str("[project]\nname = \"x\"\n").unwrap();
        assert!(matches!(
            python_include_line(Some("infer"), &bare, true),
            Err(CoreError::Manifest(_))
        ));
    }

    #[test]
    fn equivalent_spellings_collapse_after_normalization() {
        let marker = CommentMarker::default();
        let entries = vec![
            entry("numpy >= 1.0", None),
            entry("numpy>=1.0", None),
            entry("cthing; python_version < '3.10'", Some("p2c: -p")),
            entry("cthing ;python_version<\"3.10\"", Some("p2c: -p")),
        ];
        let out = classify(
            &entries,
            &ClassifyOptions {
                marker: &marker,
                tool: &ToolConfig::default(),
                python_version: None,
                python_include: None,
                deps: &[],
                reqs: &[],
                sort: true,
                unique: true,
                remove_whitespace: true,
            },
        )
        .unwrap();
        assert_eq!(out.conda_requirements(), vec!["numpy>=1.0", "pip"]);
        assert_eq!(out.pip_requirements(), vec![r#"cthing;python_version<"3.10""#]);
    }

    #[test]
    fn grouped_markers_filter_conda_side() {
        let marker = CommentMarker::default();
        let entries = vec![
            entry("old-compat; (python_version < '3.8' or python_version > '3.11') and python_version != '3.7'", None),
            entry("numpy", None),
        ];
        let run_for = |python: &str| {
            classify(
                &entries,
                &ClassifyOptions {
                    marker: &marker,
                    tool: &ToolConfig::default(),
                    python_version: Some(python),
                    python_include: None,
                    deps: &[],
                    reqs: &[],
                    sort: true,
                    unique: true,
                    remove_whitespace: true,
                },
            )
            .unwrap()
        };
        assert_eq!(run_for("3.7").conda_requirements(), vec!["numpy"]);
        assert_eq!(run_for("3.12").conda_requirements(), vec!["numpy", "old-compat"]);
    }
}
