//! Lightweight inspection of PEP 508 requirement strings.
//!
//! Only the distribution name and extras are needed here; version
//! specifiers and markers are passed through untouched.

use regex::Regex;
use std::sync::OnceLock;

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[([^\]]*)\])?")
            .expect("valid requirement pattern")
    })
}

/// The distribution name at the start of a requirement string.
pub fn requirement_name(requirement: &str) -> Option<&str> {
    name_re()
        .captures(requirement)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Extras requested by a requirement (`pkg[a, b]` -> `["a", "b"]`).
pub fn requirement_extras(requirement: &str) -> Vec<String> {
    name_re()
        .captures(requirement)
        .and_then(|c| c.get(2))
        .map(|m| {
            m.as_str()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// PEP 503 normalization: lowercase, runs of `-`, `_`, `.` become `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_sep = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_sep {
                out.push('-');
            }
            in_sep = true;
        } else {
            out.push(c.to_ascii_lowercase());
            in_sep = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_names() {
        assert_eq!(requirement_name("numpy"), Some("numpy"));
        assert_eq!(requirement_name("scikit-learn>=1.0"), Some("scikit-learn"));
        assert_eq!(requirement_name("hello[test,dev]"), Some("hello"));
        assert_eq!(requirement_name("a-package; python_version < '3.9'"), Some("a-package"));
        assert_eq!(requirement_name("  zope.interface ~= 5.0"), Some("zope.interface"));
        assert_eq!(requirement_name(">=1.0"), None);
    }

    #[test]
    fn extracts_extras() {
        assert_eq!(requirement_extras("hello[test, dev-extras]"), vec!["test", "dev-extras"]);
        assert_eq!(requirement_extras("hello [test]>=1"), vec!["test"]);
        assert!(requirement_extras("hello").is_empty());
        assert!(requirement_extras("hello[]").is_empty());
    }

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize_name("Foo_Bar"), "foo-bar");
        assert_eq!(normalize_name("zope.interface"), "zope-interface");
        assert_eq!(normalize_name("a__-.b"), "a-b");
        assert_eq!(normalize_name("numpy"), "numpy");
    }
}
