//! Analysis error taxonomy.
//!
//! Extraction and resolution failures are never fatal to the caller:
//! - `NoPayload` aborts the current navigation action (silent no-op)
//! - `UnresolvedReference` skips one candidate during batch assembly
//!
//! Persistence failures live in [`crate::allowlist::StoreError`] and are the
//! only errors surfaced to users.

use thiserror::Error;

use crate::types::Span;

/// Errors raised while classifying or extracting payload types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// A call or declaration had no argument to carry a payload.
    #[error("no event payload at {span}")]
    NoPayload { span: Span },

    /// A class, method or type could not be resolved.
    #[error("unresolved reference: {name}")]
    UnresolvedReference { name: String },
}

impl AnalysisError {
    /// Build an `UnresolvedReference` error.
    pub fn unresolved(name: impl Into<String>) -> Self {
        AnalysisError::UnresolvedReference { name: name.into() }
    }
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = AnalysisError::NoPayload {
            span: Span::new(4, 14),
        };
        assert_eq!(err.to_string(), "no event payload at 4..14");

        let err = AnalysisError::unresolved("com.app.Missing.post");
        assert_eq!(err.to_string(), "unresolved reference: com.app.Missing.post");
    }
}
