//! JSON output types for editor front-ends.
//!
//! Every response carries `status` first and a `schema_version`, so
//! front-ends can detect incompatible changes. Output is deterministic: the
//! same resolution always serializes to the same bytes.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use busnav_core::adapter::Usage;
use busnav_core::classify::Role;
use busnav_core::matcher::Direction;
use busnav_core::navigate::{NavigationMarker, Resolution};

use crate::error::{BusnavError, OutputErrorCode};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Common Types
// ============================================================================

/// One navigation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    /// File path (workspace-relative).
    pub file: String,
    /// Byte offset of the start (inclusive).
    pub byte_start: u64,
    /// Byte offset of the end (exclusive).
    pub byte_end: u64,
    /// `"call"` or `"declaration"`.
    pub kind: String,
    /// Fully-qualified name of the called or declared method, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UsageInfo {
    /// Describe a usage.
    pub fn from_usage(usage: &Usage) -> Self {
        let (kind, name) = match usage {
            Usage::Call(call) => ("call", call.target_name()),
            Usage::Declaration(method) => ("declaration", Some(method.fully_qualified_name())),
        };
        let span = usage.span();
        UsageInfo {
            file: usage.file().to_string(),
            byte_start: span.start,
            byte_end: span.end,
            kind: kind.to_string(),
            name,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Response for a navigation query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version.
    pub schema_version: String,
    /// Role of the queried element.
    pub role: Role,
    /// Direction searched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Payload type, when one was extracted. Explicit `null` otherwise.
    pub payload: Option<String>,
    /// Navigation targets, in provider order.
    pub usages: Vec<UsageInfo>,
    /// Whether more targets existed than were returned.
    pub truncated: bool,
}

impl NavigationResponse {
    /// Build a response from a resolution.
    pub fn from_resolution(resolution: &Resolution) -> Self {
        let (usages, truncated) = match &resolution.result {
            Some(result) => (
                result.iter().map(UsageInfo::from_usage).collect(),
                result.truncated,
            ),
            None => (vec![], false),
        };
        NavigationResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            role: resolution.role,
            direction: resolution.direction,
            payload: resolution.payload.as_ref().map(|p| p.to_string()),
            usages,
            truncated,
        }
    }
}

/// Response listing gutter markers for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkersResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version.
    pub schema_version: String,
    /// Markers, in the order they were requested.
    pub markers: Vec<NavigationMarker>,
}

impl MarkersResponse {
    /// Wrap a list of markers.
    pub fn new(markers: Vec<NavigationMarker>) -> Self {
        MarkersResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            markers,
        }
    }
}

/// Error information for error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
}

impl ErrorInfo {
    /// Create from a BusnavError.
    pub fn from_error(err: &BusnavError) -> Self {
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
        }
    }
}

/// Response for a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version.
    pub schema_version: String,
    /// What went wrong.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Build an error response.
    pub fn from_error(err: &BusnavError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON (single line) to a writer.
pub fn emit_response_compact<T: Serialize>(
    response: &T,
    writer: &mut impl Write,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
