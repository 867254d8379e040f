use crate::manifest::ManifestError;
use regex::Regex;

/// The inline comment delimiter separating a requirement from its annotation.
///
/// The first occurrence splits; escaping is not supported. The marker also
/// bounds `p2c:` directives inside a comment and, when doubled, disables them.
#[derive(Debug, Clone)]
pub struct CommentMarker {
    marker: String,
    directive: Regex,
    disabled: Regex,
}

impl CommentMarker {
    pub fn new(marker: &str) -> Result<Self, ManifestError> {
        if marker.trim().is_empty() {
            return Err(ManifestError::InvalidMarker);
        }
        let m = regex::escape(marker);
        // p2c: at the start of the comment, or right after a marker
        let directive = Regex::new(&format!(r"(?:^|{m})\s*p2c:"))
            .map_err(|_| ManifestError::InvalidMarker)?;
        // `## p2c:` in the source; one marker is already stripped by then
        let disabled = Regex::new(&format!(r"(?:^{m}|{m}{m})\s*p2c:"))
            .map_err(|_| ManifestError::InvalidMarker)?;
        Ok(Self {
            marker: marker.to_owned(),
            directive,
            disabled,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.marker
    }

    /// Split `text` at the first marker into trimmed requirement and comment.
    ///
    /// Empty halves become `None`.
    pub fn split(&self, text: &str) -> (Option<String>, Option<String>) {
        let (head, tail) = match text.split_once(self.marker.as_str()) {
            Some((head, tail)) => (head, Some(tail)),
            None => (text, None),
        };
        (non_empty(head), tail.and_then(non_empty))
    }

    /// Remove one leading marker (and surrounding whitespace) from `text`.
    pub fn strip_leading<'a>(&self, text: &'a str) -> &'a str {
        let t = text.trim_start();
        t.strip_prefix(self.marker.as_str()).unwrap_or(t).trim()
    }

    /// Byte range of the `p2c:` directive inside a comment, covering the
    /// directive text up to (not including) the next marker.
    ///
    /// Returns `(start, args_start, end)`: `start` is where the directive (or
    /// the marker preceding it) begins, `args_start` is just past `p2c:`.
    pub(crate) fn directive_span(&self, comment: &str) -> Option<(usize, usize, usize)> {
        if self.disabled.is_match(comment) {
            return None;
        }
        let found = self.directive.find(comment)?;
        let args_start = found.end();
        let end = comment[args_start..]
            .find(self.marker.as_str())
            .map_or(comment.len(), |i| args_start + i);
        Some((found.start(), args_start, end))
    }
}

impl Default for CommentMarker {
    fn default() -> Self {
        Self::new("#").expect("escaped marker is a valid pattern")
    }
}

impl PartialEq for CommentMarker {
    fn eq(&self, other: &Self) -> bool {
        self.marker == other.marker
    }
}

impl Eq for CommentMarker {}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_owned())
    }
}
