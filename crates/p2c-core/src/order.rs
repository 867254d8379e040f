use p2c_schema::DependencyEntry;
use std::collections::HashSet;

/// Stable sort by requirement string. Comment-only entries sort as `""`.
pub fn sort_entries(entries: &mut [DependencyEntry]) {
    entries.sort_by(|a, b| {
        let a = a.requirement.as_deref().unwrap_or_default();
        let b = b.requirement.as_deref().unwrap_or_default();
        a.cmp(b)
    });
}

/// Drop entries whose requirement already appeared; the first one wins.
///
/// Comment-only entries are never deduplicated.
pub fn unique_entries(entries: Vec<DependencyEntry>) -> Vec<DependencyEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| match &e.requirement {
            Some(r) => seen.insert(r.clone()),
            None => true,
        })
        .collect()
}
