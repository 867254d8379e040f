use p2c_schema::DependencyEntry;
use std::fmt::Write;

/// Channel used when neither the caller nor the manifest names one.
pub const DEFAULT_CHANNEL: &str = "conda-forge";

/// Conda environment file text.
///
/// An empty `channels` list falls back to [`DEFAULT_CHANNEL`]. Pip entries
/// are nested under `- pip:`. With `annotate`, entry comments are written
/// after the requirement. Requirement-less entries are skipped.
pub fn render_conda(
    name: Option<&str>,
    channels: &[String],
    conda: &[DependencyEntry],
    pip: &[DependencyEntry],
    annotate: bool,
) -> String {
    let mut out = String::new();
    if let Some(name) = name {
        let _ = writeln!(out, "name: {name}");
    }
    out.push_str("channels:\n");
    if channels.is_empty() {
        let _ = writeln!(out, "  - {DEFAULT_CHANNEL}");
    }
    for channel in channels {
        let _ = writeln!(out, "  - {channel}");
    }
    out.push_str("dependencies:\n");
    for entry in conda {
        push_item(&mut out, "  - ", entry, annotate);
    }
    if pip.iter().any(|e| e.requirement.is_some()) {
        out.push_str("  - pip:\n");
        for entry in pip {
            push_item(&mut out, "      - ", entry, annotate);
        }
    }
    out
}

fn push_item(out: &mut String, prefix: &str, entry: &DependencyEntry, annotate: bool) {
    let Some(requirement) = &entry.requirement else {
        return;
    };
    match (&entry.comment, annotate) {
        (Some(comment), true) => {
            let _ = writeln!(out, "{prefix}{requirement}  # {comment}");
        }
        _ => {
            let _ = writeln!(out, "{prefix}{requirement}");
        }
    }
}
