//! busnav: static poster/receiver navigation for event-bus code
//!
//! Links the call sites that publish an event onto a bus with the methods
//! registered to receive it, using only the static type of the event
//! payload. Editor front-ends drive it through [`classify_and_resolve`] and
//! render the results from [`output`].

// Core engine - re-exported from busnav-core
pub use busnav_core::adapter;
pub use busnav_core::allowlist;
pub use busnav_core::classify;
pub use busnav_core::config;
pub use busnav_core::extract;
pub use busnav_core::filter;
pub use busnav_core::matcher;
pub use busnav_core::navigate;
pub use busnav_core::payload;
pub use busnav_core::scope;
pub use busnav_core::session;
pub use busnav_core::types;

// Reference provider
pub use busnav_facts as facts;
pub use busnav_facts::FactsStore;

// Front-end entry points
pub use busnav_core::error::{AnalysisError, AnalysisResult};
pub use busnav_core::navigate::{
    add_poster, can_mark_poster, classify_and_resolve, mark_poster, marker_for, NavigationMarker,
    Resolution,
};

// Host-facing infrastructure
pub mod error;
pub mod logging;
pub mod output;
