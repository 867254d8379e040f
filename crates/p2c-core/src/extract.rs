use crate::CoreError;
use p2c_schema::{
    normalize_name, requirement_extras, requirement_name, CommentMarker, DependencyEntry,
    Manifest, BASE_GROUP, BUILD_SYSTEM_GROUP,
};
use tracing::debug;

/// Which groups to merge and how.
#[derive(Debug, Clone)]
pub struct MergeOptions<'a> {
    pub extras: &'a [String],
    pub include_base: bool,
    pub strict: bool,
    pub marker: &'a CommentMarker,
}

/// Entries of one group, with references to the project's own extras
/// (`hello[test]` inside `hello`'s optional dependencies) replaced by the
/// entries of those extras.
///
/// Returns `None` when the manifest has no such group.
pub fn group_entries(
    manifest: &Manifest,
    group: &str,
    marker: &CommentMarker,
) -> Option<Vec<DependencyEntry>> {
    // these two always exist, possibly empty
    if group == BASE_GROUP || group == BUILD_SYSTEM_GROUP {
        return Some(manifest.group_entries(group, marker).unwrap_or_default());
    }
    let entries = manifest.group_entries(group, marker)?;
    let Some(package) = manifest.package_name().map(normalize_name) else {
        return Some(entries);
    };
    let mut path = vec![group.to_owned()];
    Some(expand(manifest, entries, &package, marker, &mut path))
}

fn expand(
    manifest: &Manifest,
    entries: Vec<DependencyEntry>,
    package: &str,
    marker: &CommentMarker,
    path: &mut Vec<String>,
) -> Vec<DependencyEntry> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let self_ref = entry
            .requirement
            .as_deref()
            .filter(|r| requirement_name(r).is_some_and(|n| normalize_name(n) == package));
        let Some(requirement) = self_ref else {
            out.push(entry);
            continue;
        };
        for extra in requirement_extras(requirement) {
            if path.contains(&extra) {
                debug!("skipping cyclic self reference to extra '{extra}'");
                continue;
            }
            let Some(nested) = manifest.group_entries(&extra, marker) else {
                debug!("self reference to missing extra '{extra}'");
                continue;
            };
            path.push(extra);
            out.extend(expand(manifest, nested, package, marker, path));
            path.pop();
        }
    }
    out
}

/// Concatenate the requested groups in caller order, `base` first when
/// `include_base` is set.
///
/// A missing group contributes nothing, unless `strict` is set, in which case
/// it is an [`CoreError::UnknownGroup`].
pub fn merge(manifest: &Manifest, opts: &MergeOptions<'_>) -> Result<Vec<DependencyEntry>, CoreError> {
    let mut out = Vec::new();
    if opts.include_base {
        out.extend(manifest.group_entries(BASE_GROUP, opts.marker).unwrap_or_default());
    }
    for extra in opts.extras {
        match group_entries(manifest, extra, opts.marker) {
            Some(entries) => out.extend(entries),
            None if opts.strict => {
                return Err(CoreError::UnknownGroup {
                    group: extra.clone(),
                    available: manifest.group_names(),
                })
            }
            None => debug!("group '{extra}' not found, treating as empty"),
        }
    }
    Ok(out)
}
