use super::{emit, RenderArgs};
use p2c_core::{CoreError, OutputFormat};
use std::path::Path;

/// `render --format <token>`. The token is checked before the manifest is
/// read; `conda-requirements` output is written in its single-stream form.
pub fn run(
    manifest: &Path,
    format: &str,
    args: &RenderArgs,
    output: Option<&Path>,
    header_cmd: &str,
) -> Result<u8, String> {
    let format: OutputFormat = format.parse().map_err(|e: CoreError| e.to_string())?;
    emit(manifest, args, format, output, header_cmd)
}
