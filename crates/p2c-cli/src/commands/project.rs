use super::{load_manifest, EXIT_SUCCESS};
use console::Style;
use p2c_core::{render, update_target, write_output, OutputFormat, RenderRequest};
use p2c_schema::{CommentMarker, EnvStyle, EnvTarget, Overwrite, ResolvedEnv};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ProjectOptions<'a> {
    /// Subset of envs; empty means all.
    pub envs: &'a [String],
    pub dry: bool,
    /// Replaces each env's own overwrite mode.
    pub overwrite: Option<Overwrite>,
    pub comment_marker: &'a str,
}

fn request_for(env: &ResolvedEnv, target: &EnvTarget, marker: &CommentMarker) -> RenderRequest {
    let format = match target.style {
        EnvStyle::Yaml => OutputFormat::Yaml,
        EnvStyle::Requirements => OutputFormat::Requirements,
    };
    let request = RenderRequest {
        format,
        extras: env.extras.clone(),
        include_base: env.base,
        strict: true,
        channels: env.channels.clone(),
        name: env.name.clone(),
        header: env.header.unwrap_or(true),
        header_cmd: Some(format!("p2c project --envs {}", env.env)),
        sort: env.sort,
        unique: true,
        annotate: false,
        python_include: env.python_include.clone(),
        python_version: env.python_version.clone(),
        deps: env.deps.clone(),
        reqs: env.reqs.clone(),
        prepend_channel: false,
        allow_empty: env.allow_empty,
        // yaml files are whitespace free by default, requirements files are not
        remove_whitespace: env
            .remove_whitespace
            .unwrap_or(target.style == EnvStyle::Yaml),
        marker: marker.clone(),
    };
    match &target.python {
        Some(py) => request.with_python(py),
        None => request,
    }
}

/// Render every configured env to its output file(s).
pub fn run(manifest_path: &Path, opts: &ProjectOptions<'_>) -> Result<u8, String> {
    let marker = CommentMarker::new(opts.comment_marker).map_err(|e| e.to_string())?;
    let manifest = load_manifest(manifest_path)?;
    let tool = manifest.tool();
    let names = if opts.envs.is_empty() {
        tool.env_names()
    } else {
        opts.envs.to_vec()
    };
    if names.is_empty() {
        return Err("configuration error: no envs defined in [tool.pyproject2conda]".to_owned());
    }

    let skipped = Style::new().dim();
    for name in &names {
        let env = tool.resolve_env(name).map_err(|e| e.to_string())?;
        for target in env.targets() {
            let style = target.style;
            let path = PathBuf::from(&target.path);
            let overwrite = opts.overwrite.unwrap_or(env.overwrite);
            if !opts.dry && !update_target(&path, &[manifest_path], overwrite) {
                println!("{}", skipped.apply_to(format!("skipping {}", path.display())));
                continue;
            }
            let request = request_for(&env, &target, &marker);
            let text = render(&manifest, &request)
                .map_err(|e| e.to_string())?
                .combined();
            if opts.dry {
                println!("# --- {name} ({style}) -> {}", path.display());
                print!("{text}");
            } else {
                write_output(&path, &text).map_err(|e| e.to_string())?;
                info!("env '{name}' rendered as {style}");
                println!("created {}", path.display());
            }
        }
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use p2c_schema::parse_manifest_str;

    #[test]
    fn request_follows_env_settings() {
        let manifest = parse_manifest_str(
            r#"
[tool.pyproject2conda]
channels = ["conda-forge"]

[tool.pyproject2conda.envs.test]
extras = true
base = false
header = false
python = "3.9"
deps = ["zlib"]
"#,
        )
        .unwrap();
        let env = manifest.tool().resolve_env("test").unwrap();
        let targets = env.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].path, "py39-test.yaml");
        let request = request_for(&env, &targets[0], &CommentMarker::default());
        assert_eq!(request.format, OutputFormat::Yaml);
        assert_eq!(request.extras, vec!["test"]);
        assert!(!request.include_base);
        assert!(!request.header);
        assert!(request.strict);
        assert!(request.remove_whitespace);
        assert_eq!(request.python_include.as_deref(), Some("python=3.9"));
        assert_eq!(request.python_version.as_deref(), Some("3.9"));
        assert_eq!(request.deps, vec!["zlib"]);
        assert_eq!(request.channels, vec!["conda-forge"]);
    }

    #[test]
    fn one_request_per_python_and_whitespace_defaults() {
        let manifest = parse_manifest_str(
            r#"
[tool.pyproject2conda.envs.test]
extras = true
python = ["3.8", "3.11"]
style = ["yaml", "requirements"]

[tool.pyproject2conda.envs.lint]
style = "requirements"
remove_whitespace = true
"#,
        )
        .unwrap();
        let marker = CommentMarker::default();
        let env = manifest.tool().resolve_env("test").unwrap();
        let requests: Vec<_> = env
            .targets()
            .iter()
            .map(|t| (t.path.clone(), request_for(&env, t, &marker)))
            .collect();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].0, "py38-test.yaml");
        assert_eq!(requests[0].1.python_version.as_deref(), Some("3.8"));
        assert_eq!(requests[1].0, "py311-test.yaml");
        assert_eq!(requests[1].1.python_include.as_deref(), Some("python=3.11"));
        assert_eq!(requests[2].0, "test.txt");
        assert_eq!(requests[2].1.python_version, None);
        assert!(!requests[2].1.remove_whitespace);

        let lint = manifest.tool().resolve_env("lint").unwrap();
        let target = &lint.targets()[0];
        assert!(request_for(&lint, target, &marker).remove_whitespace);
    }
}
