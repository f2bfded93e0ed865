//! Search scopes for project-wide usage walks.
//!
//! A scope is either the whole project or a set of gitignore-style glob
//! patterns over workspace-relative paths.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use thiserror::Error;

/// Error type for scope construction.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// Invalid glob pattern.
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// A compiled set of file patterns.
#[derive(Debug, Clone)]
pub struct FileScope {
    patterns: Vec<String>,
    set: GlobSet,
}

impl FileScope {
    /// Compile patterns into a scope.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ScopeError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|e| ScopeError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| ScopeError::InvalidPattern {
            pattern: patterns
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join(","),
            message: e.to_string(),
        })?;
        Ok(FileScope {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            set,
        })
    }

    /// The source patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether a workspace-relative path is inside the scope.
    pub fn matches(&self, path: &str) -> bool {
        self.set.is_match(Path::new(path))
    }
}

/// Where a usage search may look.
#[derive(Debug, Clone, Default)]
pub enum SearchScope {
    /// Every file of the project.
    #[default]
    Project,
    /// Only files matching the patterns.
    Files(FileScope),
}

impl SearchScope {
    /// Build a file-restricted scope.
    pub fn files<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ScopeError> {
        Ok(SearchScope::Files(FileScope::new(patterns)?))
    }

    /// Whether a workspace-relative path is inside the scope.
    pub fn contains(&self, path: &str) -> bool {
        match self {
            SearchScope::Project => true,
            SearchScope::Files(scope) => scope.matches(path),
        }
    }
}
