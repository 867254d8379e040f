use super::{emit, RenderArgs};
use p2c_core::OutputFormat;
use std::path::Path;

pub fn run(
    manifest: &Path,
    args: &RenderArgs,
    output: Option<&Path>,
    header_cmd: &str,
) -> Result<u8, String> {
    emit(manifest, args, OutputFormat::Json, output, header_cmd)
}
