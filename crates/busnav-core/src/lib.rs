//! Core engine for busnav.
//!
//! This crate links event-bus posters to receivers using only the static type
//! of the event payload:
//! - Syntax tree provider trait for pluggable language support
//! - Persisted allow-list of poster methods
//! - Role classification of call sites and method declarations
//! - Payload type extraction with generic erasure
//! - Usage filters and the match engine
//! - Analysis sessions keyed by project identity
//! - Configuration resolution with precedence tracking
//! - The navigation query consumed by editor front-ends

pub mod adapter;
pub mod allowlist;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod matcher;
pub mod navigate;
pub mod payload;
pub mod scope;
pub mod session;
pub mod types;
