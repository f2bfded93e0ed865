//! Error types and error code constants for busnav.
//!
//! This module provides a unified error type (`BusnavError`) that bridges
//! the errors of the engine's subsystems (allow-list, session, config,
//! scope, analysis) into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from the host or a bad config file)
//! - `3`: Resolution errors (project not found, nothing to navigate)
//! - `4`: Persistence errors (allow-list could not be read or written)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use busnav_core::allowlist::StoreError;
use busnav_core::config::ConfigError;
use busnav_core::error::AnalysisError;
use busnav_core::scope::ScopeError;
use busnav_core::session::SessionError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable numeric error codes for JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from the host, or invalid configuration.
    InvalidArguments = 2,
    /// Resolution errors (project or payload not found).
    ResolutionError = 3,
    /// Allow-list persistence failed.
    PersistenceError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for host-facing output.
#[derive(Debug, Error)]
pub enum BusnavError {
    /// Invalid arguments from the host.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Project configuration could not be used.
    #[error("invalid configuration at {}: {message}", path.display())]
    InvalidConfig { path: PathBuf, message: String },

    /// Project root does not exist.
    #[error("project not found: {}", path.display())]
    ProjectNotFound { path: PathBuf },

    /// Nothing could be resolved at the requested element.
    #[error("{message}")]
    Unresolved { message: String },

    /// The allow-list could not be read or written.
    #[error("allow-list persistence failed at {}: {message}", path.display())]
    Persistence { path: PathBuf, message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

/// Result type for host-facing operations.
pub type BusnavResult<T> = Result<T, BusnavError>;

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&BusnavError> for OutputErrorCode {
    fn from(err: &BusnavError) -> Self {
        match err {
            BusnavError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            BusnavError::InvalidConfig { .. } => OutputErrorCode::InvalidArguments,
            BusnavError::ProjectNotFound { .. } => OutputErrorCode::ResolutionError,
            BusnavError::Unresolved { .. } => OutputErrorCode::ResolutionError,
            BusnavError::Persistence { .. } => OutputErrorCode::PersistenceError,
            BusnavError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl BusnavError {
    /// Stable output code for this error.
    pub fn code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<StoreError> for BusnavError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Read { path, source } | StoreError::Write { path, source } => {
                BusnavError::Persistence {
                    path,
                    message: source.to_string(),
                }
            }
        }
    }
}

impl From<ConfigError> for BusnavError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Corrupt { path, reason } => BusnavError::InvalidConfig {
                path,
                message: reason,
            },
            ConfigError::Io { path, source } => BusnavError::InvalidConfig {
                path,
                message: source.to_string(),
            },
        }
    }
}

impl From<SessionError> for BusnavError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ProjectNotFound { path } => BusnavError::ProjectNotFound { path },
            SessionError::Config(config_err) => BusnavError::from(config_err),
            SessionError::Io(io_err) => BusnavError::InternalError {
                message: format!("IO error: {}", io_err),
            },
        }
    }
}

impl From<ScopeError> for BusnavError {
    fn from(err: ScopeError) -> Self {
        BusnavError::InvalidArguments {
            message: err.to_string(),
        }
    }
}

impl From<AnalysisError> for BusnavError {
    fn from(err: AnalysisError) -> Self {
        BusnavError::Unresolved {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
