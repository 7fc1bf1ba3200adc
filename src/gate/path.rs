//! Request path canonicalization.
//!
//! The upstream resolves `.` and `..` segments (plain or percent-encoded)
//! before routing, so the gate has to classify the same path the upstream
//! will eventually serve. `canonical_path` produces that path and the
//! middleware forwards it in place of the raw one.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("request path must start with '/'")]
    NotAbsolute,
    #[error("request path contains a control character")]
    ControlCharacter,
    #[error("request path contains an encoded or alternate separator")]
    AmbiguousSeparator,
}

/// Resolves dot segments and collapses empty segments.
///
/// A trailing slash survives when the raw path ends in one or in a dot
/// segment. Backslashes and percent-encoded separators are refused because
/// the upstream may treat them as `/` after classification.
pub fn canonical_path(raw: &str) -> Result<String, PathError> {
    if !raw.starts_with('/') {
        return Err(PathError::NotAbsolute);
    }
    if raw.chars().any(|c| c.is_ascii_control()) {
        return Err(PathError::ControlCharacter);
    }
    let lowered = raw.to_ascii_lowercase();
    if raw.contains('\\') || lowered.contains("%2f") || lowered.contains("%5c") {
        return Err(PathError::AmbiguousSeparator);
    }

    let mut segments: Vec<&str> = Vec::new();
    let mut trailing_slash = false;
    for segment in raw.split('/').skip(1) {
        trailing_slash = false;
        match dot_segment(segment) {
            Some(DotSegment::Current) => trailing_slash = true,
            Some(DotSegment::Parent) => {
                segments.pop();
                trailing_slash = true;
            }
            None if segment.is_empty() => trailing_slash = true,
            None => segments.push(segment),
        }
    }

    let mut path = String::with_capacity(raw.len());
    for segment in &segments {
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() || trailing_slash {
        path.push('/');
    }
    Ok(path)
}

enum DotSegment {
    Current,
    Parent,
}

fn dot_segment(segment: &str) -> Option<DotSegment> {
    let is_dot = |s: &str| s == "." || s.eq_ignore_ascii_case("%2e");
    if is_dot(segment) {
        return Some(DotSegment::Current);
    }
    let parent = ["..", ".%2e", "%2e.", "%2e%2e"];
    parent
        .iter()
        .any(|p| segment.eq_ignore_ascii_case(p))
        .then_some(DotSegment::Parent)
}
