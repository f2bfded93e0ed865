//! Common types shared between the provider, engine and session modules.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

// ============================================================================
// Span
// ============================================================================

/// Byte offsets into file content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: u64,
    /// End byte offset (exclusive).
    pub end: u64,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: u64, end: u64) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if the offset falls inside this span.
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ============================================================================
// Project Identity
// ============================================================================

/// Stable identity of a project, derived from its root path.
///
/// Two sessions opened on the same (canonical) root share an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(String);

impl ProjectId {
    /// Compute the identity of a project root.
    ///
    /// The caller is responsible for canonicalizing the path first.
    pub fn from_root(root: &Path) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(root.to_string_lossy().as_bytes());
        let result = hasher.finalize();
        ProjectId(hex::encode(&result[..8]))
    }

    /// The hex identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project_{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod span_tests {
        use super::*;

        #[test]
        fn span_len_and_empty() {
            let span = Span::new(10, 14);
            assert_eq!(span.len(), 4);
            assert!(!span.is_empty());
            assert!(Span::new(3, 3).is_empty());
        }

        #[test]
        fn span_contains_is_half_open() {
            let span = Span::new(10, 14);
            assert!(span.contains(10));
            assert!(span.contains(13));
            assert!(!span.contains(14));
        }

        #[test]
        fn span_cover() {
            let covered = Span::new(10, 14).cover(Span::new(14, 20));
            assert_eq!(covered, Span::new(10, 20));
        }

        #[test]
        #[should_panic(expected = "must be <= end")]
        fn span_rejects_inverted_bounds() {
            let _ = Span::new(5, 1);
        }
    }

    mod project_id_tests {
        use super::*;

        #[test]
        fn project_id_is_deterministic() {
            let a = ProjectId::from_root(Path::new("/work/app"));
            let b = ProjectId::from_root(Path::new("/work/app"));
            assert_eq!(a, b);
            assert_eq!(a.as_str().len(), 16);
        }

        #[test]
        fn project_id_differs_per_root() {
            let a = ProjectId::from_root(Path::new("/work/app"));
            let b = ProjectId::from_root(Path::new("/work/other"));
            assert_ne!(a, b);
            assert!(a.to_string().starts_with("project_"));
        }
    }
}
