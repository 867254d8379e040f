use crate::directive::Directive;
use crate::manifest::ManifestError;
use crate::marker::CommentMarker;
use serde::Serialize;
use toml_edit::{Array, RawString, Value};
use tracing::warn;

/// A requirement string paired with its trailing annotation.
///
/// `requirement` is `None` for a comment standing on its own line inside a
/// dependency array; such entries only matter for the directives they carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEntry {
    pub requirement: Option<String>,
    pub comment: Option<String>,
}

impl DependencyEntry {
    pub fn new(requirement: impl Into<String>, comment: Option<&str>) -> Self {
        Self {
            requirement: Some(requirement.into()),
            comment: comment.map(str::to_owned),
        }
    }

    pub fn comment_only(comment: impl Into<String>) -> Self {
        Self {
            requirement: None,
            comment: Some(comment.into()),
        }
    }

    /// The `p2c:` directive embedded in the comment, if any.
    pub fn directive(&self, marker: &CommentMarker) -> Result<Option<Directive>, ManifestError> {
        match &self.comment {
            Some(comment) => Directive::from_comment(comment, marker),
            None => Ok(None),
        }
    }

    /// The comment with any `p2c:` directive cut out.
    pub fn annotation(&self, marker: &CommentMarker) -> Option<String> {
        let comment = self.comment.as_deref()?;
        let Some((start, _, end)) = marker.directive_span(comment) else {
            return Some(comment.to_owned());
        };
        let before = comment[..start].trim();
        let after = marker.strip_leading(&comment[end..]);
        let text = match (before.is_empty(), after.is_empty()) {
            (true, true) => return None,
            (false, true) => before.to_owned(),
            (true, false) => after.to_owned(),
            (false, false) => format!("{before} {} {after}", marker.as_str()),
        };
        Some(text)
    }
}

/// Extract `(requirement, comment)` entries from a TOML dependency array.
///
/// A comment on the same line as an element is attached to it; comments on
/// lines of their own become requirement-less entries in source order.
pub fn extract_pairs(array: &Array, marker: &CommentMarker) -> Vec<DependencyEntry> {
    let values: Vec<&Value> = array.iter().collect();
    let mut out = Vec::with_capacity(values.len());

    // Comments in the gap before the first element sit on lines of their own.
    match values.first() {
        Some(first) => {
            let gap = Gap::parse(raw(first.decor().prefix()));
            out.extend(gap.head.into_iter().chain(gap.rest).map(DependencyEntry::comment_only));
        }
        None => {
            let gap = Gap::parse(raw(Some(array.trailing())));
            out.extend(gap.head.into_iter().chain(gap.rest).map(DependencyEntry::comment_only));
            return out;
        }
    }

    for (i, value) in values.iter().enumerate() {
        let suffix = Gap::parse(raw(value.decor().suffix()));
        let next = Gap::parse(match values.get(i + 1) {
            Some(next) => raw(next.decor().prefix()),
            None => raw(Some(array.trailing())),
        });

        let mut standalone = suffix.rest;
        let mut toml_comment = suffix.head;
        match (toml_comment.is_some(), next.head) {
            (false, head) => toml_comment = head,
            (true, Some(head)) => standalone.push(head),
            (true, None) => {}
        }
        standalone.extend(next.rest);

        match value.as_str() {
            Some(text) => {
                let (requirement, inline) = marker.split(text);
                let comment = match (inline, toml_comment) {
                    (Some(inline), Some(extra)) => Some(format!("{inline} {} {extra}", marker.as_str())),
                    (inline, extra) => inline.or(extra),
                };
                if requirement.is_some() || comment.is_some() {
                    out.push(DependencyEntry { requirement, comment });
                }
            }
            None => {
                warn!("ignoring non-string dependency entry: {}", value.to_string().trim());
                out.extend(toml_comment.map(DependencyEntry::comment_only));
            }
        }
        out.extend(standalone.into_iter().map(DependencyEntry::comment_only));
    }
    out
}

/// Reparse a rendered requirements list into entries.
///
/// Blank lines are skipped; a line that starts with the marker is a
/// comment-only entry.
pub fn parse_requirements_text(text: &str, marker: &CommentMarker) -> Vec<DependencyEntry> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let (requirement, comment) = marker.split(line);
            if requirement.is_none() && comment.is_none() {
                None
            } else {
                Some(DependencyEntry { requirement, comment })
            }
        })
        .collect()
}

fn raw(s: Option<&RawString>) -> &str {
    s.and_then(RawString::as_str).unwrap_or_default()
}

/// Whitespace and comments between array elements, split into the comment on
/// the first line (`head`) and the whole-line comments after it (`rest`).
struct Gap {
    head: Option<String>,
    rest: Vec<String>,
}

impl Gap {
    fn parse(text: &str) -> Self {
        let mut lines = text.split('\n');
        let head = lines.next().and_then(toml_comment);
        let rest = lines.filter_map(toml_comment).collect();
        Self { head, rest }
    }
}

/// TOML comments always open with `#`, whatever the annotation marker is.
fn toml_comment(line: &str) -> Option<String> {
    let body = line.trim().strip_prefix('#')?.trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml_edit::DocumentMut;

    fn array_of(src: &str) -> Vec<DependencyEntry> {
        let doc: DocumentMut = src.parse().unwrap();
        let array = doc["deps"].as_array().unwrap();
        extract_pairs(array, &CommentMarker::default())
    }

    fn pair(req: &str, comment: Option<&str>) -> DependencyEntry {
        DependencyEntry::new(req, comment)
    }

    #[test]
    fn preserves_order_and_count() {
        let entries = array_of(r#"deps = ["c", "a", "b", "a"]"#);
        let reqs: Vec<_> = entries.iter().filter_map(|e| e.requirement.as_deref()).collect();
        assert_eq!(reqs, vec!["c", "a", "b", "a"]);
    }

    #[test]
    fn attaches_same_line_comments() {
        let entries = array_of(
            r#"deps = [
"athing", # p2c: -p # a comment
"bthing", # p2c: -s bthing-conda
"cthing", # p2c: -c conda-forge
]
"#,
        );
        assert_eq!(
            entries,
            vec![
                pair("athing", Some("p2c: -p # a comment")),
                pair("bthing", Some("p2c: -s bthing-conda")),
                pair("cthing", Some("p2c: -c conda-forge")),
            ]
        );
    }

    #[test]
    fn last_element_without_trailing_comma() {
        let entries = array_of(
            r#"deps = [
  "a",
  "b" # last one
]
"#,
        );
        assert_eq!(entries, vec![pair("a", None), pair("b", Some("last one"))]);
    }

    #[test]
    fn whole_line_comments_become_comment_only_entries() {
        let entries = array_of(
            r#"deps = [
# p2c: -s additional-thing # this is an additional conda package
"matplotlib", # p2c: -s conda-matplotlib
# between
"numpy",
]
"#,
        );
        assert_eq!(
            entries,
            vec![
                DependencyEntry::comment_only(
                    "p2c: -s additional-thing # this is an additional conda package"
                ),
                pair("matplotlib", Some("p2c: -s conda-matplotlib")),
                DependencyEntry::comment_only("between"),
                pair("numpy", None),
            ]
        );
    }

    #[test]
    fn comment_inside_requirement_string() {
        let entries = array_of(r#"deps = ["pandas # needed for io"]"#);
        assert_eq!(entries, vec![pair("pandas", Some("needed for io"))]);
    }

    #[test]
    fn empty_array_with_comment() {
        let entries = array_of(
            r#"deps = [
  # p2c: -s only-conda
]
"#,
        );
        assert_eq!(entries, vec![DependencyEntry::comment_only("p2c: -s only-conda")]);
    }

    #[test]
    fn non_string_values_are_ignored() {
        let entries = array_of(r#"deps = ["a", 3, "b"]"#);
        assert_eq!(entries, vec![pair("a", None), pair("b", None)]);
    }

    #[test]
    fn annotation_drops_directive() {
        let marker = CommentMarker::default();
        assert_eq!(
            pair("a", Some("p2c: -p # a comment")).annotation(&marker).as_deref(),
            Some("a comment")
        );
        assert_eq!(pair("a", Some("p2c: -p")).annotation(&marker), None);
        assert_eq!(
            pair("a", Some("keep me")).annotation(&marker).as_deref(),
            Some("keep me")
        );
        assert_eq!(
            pair("a", Some("before # p2c: -s # after")).annotation(&marker).as_deref(),
            Some("before # after")
        );
        assert_eq!(pair("a", None).annotation(&marker), None);
    }

    #[test]
    fn requirements_text_reparse() {
        let marker = CommentMarker::default();
        let text = "# header\n\nnumpy\npandas  # needed for io\n";
        assert_eq!(
            parse_requirements_text(text, &marker),
            vec![
                DependencyEntry::comment_only("header"),
                pair("numpy", None),
                pair("pandas", Some("needed for io")),
            ]
        );
    }
}
