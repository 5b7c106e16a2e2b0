//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse a route path into literal and `{name}` placeholder segments
//! - Match a request path segment by segment
//! - Capture placeholder values in left-to-right order
//!
//! # Design Decisions
//! - Leading/trailing slashes are trimmed on both sides before splitting
//! - Segment count must match exactly; no wildcards, no optional segments
//! - Literal segments compare case-sensitively
//! - No regex in the hot path

/// One segment of a route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// `{name}`: matches any single segment and captures it.
    Placeholder(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) if is_word(name) => Segment::Placeholder(name.to_string()),
            _ => Segment::Literal(raw.to_string()),
        }
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `/` + path with surrounding slashes removed.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/')
}

/// A compiled route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        Self {
            segments: split(pattern).map(Segment::parse).collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in pattern order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Captured placeholder values when `path` matches, `None` otherwise.
    pub fn matches(&self, path: &str) -> Option<Vec<String>> {
        let parts: Vec<&str> = split(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut captures = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Placeholder(_) => captures.push(part.to_string()),
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
            }
        }
        Some(captures)
    }
}

/// Match `path` against the route pattern text `pattern`.
pub fn match_path(pattern: &str, path: &str) -> Option<Vec<String>> {
    PathPattern::parse(pattern).matches(path)
}
