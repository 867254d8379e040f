use crate::CoreError;
use p2c_schema::Overwrite;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Atomically replace `dest` with `content`.
///
/// The temp file lives next to `dest` so the final rename stays on one
/// filesystem. Missing parent directories are created.
pub fn write_output(dest: &Path, content: &str) -> Result<(), CoreError> {
    let err = |source: std::io::Error| CoreError::Write {
        path: dest.to_path_buf(),
        source,
    };
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(err)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(err)?;
    tmp.write_all(content.as_bytes()).map_err(err)?;
    tmp.as_file().sync_all().map_err(err)?;
    tmp.persist(dest).map_err(|e| err(e.error))?;
    info!("wrote {}", dest.display());
    Ok(())
}

/// Whether `target` should be (re)written.
///
/// `Check` rewrites when the target is missing or older than any existing
/// file in `sources`; `Skip` only writes missing targets.
pub fn update_target(target: &Path, sources: &[&Path], overwrite: Overwrite) -> bool {
    let update = match overwrite {
        Overwrite::Force => true,
        Overwrite::Skip => !target.exists(),
        Overwrite::Check => match modified(target) {
            None => true,
            Some(target_time) => sources
                .iter()
                .filter_map(|s| modified(s))
                .any(|source_time| source_time > target_time),
        },
    };
    debug!("update {}: {update} ({overwrite:?})", target.display());
    update
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
