use super::{load_manifest, rendered_parts, write_or_print, RenderArgs, EXIT_SUCCESS};
use p2c_core::{write_output, OutputFormat};
use std::path::{Path, PathBuf};

/// Destinations for the conda and pip lists.
#[derive(Debug, Clone, Default)]
pub struct Paths {
    pub conda: Option<PathBuf>,
    pub pip: Option<PathBuf>,
    /// `<prefix>conda.txt` and `<prefix>pip.txt`.
    pub prefix: Option<String>,
}

impl Paths {
    fn resolve(&self) -> Result<Option<(PathBuf, PathBuf)>, String> {
        match (&self.conda, &self.pip, &self.prefix) {
            (None, None, None) => Ok(None),
            (None, None, Some(prefix)) => Ok(Some((
                PathBuf::from(format!("{prefix}conda.txt")),
                PathBuf::from(format!("{prefix}pip.txt")),
            ))),
            (Some(conda), Some(pip), None) => Ok(Some((conda.clone(), pip.clone()))),
            (Some(_), Some(_), Some(_)) => Err(
                "configuration error: specify PATH_CONDA and PATH_PIP or --prefix, not both"
                    .to_owned(),
            ),
            _ => Err(
                "configuration error: specify both PATH_CONDA and PATH_PIP, or neither".to_owned(),
            ),
        }
    }
}

pub fn run(
    manifest_path: &Path,
    args: &RenderArgs,
    paths: &Paths,
    prepend_channel: bool,
    header_cmd: &str,
) -> Result<u8, String> {
    let targets = paths.resolve()?;
    let mut request = args.to_request(OutputFormat::CondaRequirements, targets.is_some(), header_cmd)?;
    request.prepend_channel = prepend_channel;
    let manifest = load_manifest(manifest_path)?;
    let rendered = p2c_core::render(&manifest, &request).map_err(|e| e.to_string())?;

    let Some((conda_path, pip_path)) = targets else {
        write_or_print(None, &rendered.combined())?;
        return Ok(EXIT_SUCCESS);
    };
    let (conda, pip) = rendered_parts(rendered);
    if !conda.is_empty() {
        write_output(&conda_path, &conda).map_err(|e| e.to_string())?;
    }
    if let Some(pip) = pip.filter(|p| !p.is_empty()) {
        write_output(&pip_path, &pip).map_err(|e| e.to_string())?;
    }
    Ok(EXIT_SUCCESS)
}
