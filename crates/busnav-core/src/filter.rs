//! Usage filters handed to the provider's usage search.
//!
//! The provider walks usages; a filter decides which of them are real
//! matches for the payload type being navigated.

use crate::adapter::{SyntaxTreeProvider, Usage};
use crate::classify::is_receiver_declaration;
use crate::extract::{call_payload_type, declared_payload_type};
use crate::payload::PayloadType;

/// Predicate over candidate usages.
pub trait UsageFilter {
    /// Whether `usage` should be reported.
    fn accepts(&self, provider: &dyn SyntaxTreeProvider, usage: &Usage) -> bool;
}

/// Accepts every usage. Used for plain reference searches.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl UsageFilter for AcceptAll {
    fn accepts(&self, _provider: &dyn SyntaxTreeProvider, _usage: &Usage) -> bool {
        true
    }
}

/// Accepts poster call sites whose first argument has the payload type.
#[derive(Debug, Clone)]
pub struct PosterFilter {
    payload: PayloadType,
}

impl PosterFilter {
    pub fn new(payload: PayloadType) -> Self {
        PosterFilter { payload }
    }
}

impl UsageFilter for PosterFilter {
    fn accepts(&self, provider: &dyn SyntaxTreeProvider, usage: &Usage) -> bool {
        match usage {
            Usage::Call(call) => call_payload_type(provider, call)
                .map(|payload| payload == self.payload)
                .unwrap_or(false),
            Usage::Declaration(_) => false,
        }
    }
}

/// Accepts receiver declarations whose parameter has the payload type.
#[derive(Debug, Clone)]
pub struct ReceiverFilter {
    payload: PayloadType,
    subscriber_annotation: String,
}

impl ReceiverFilter {
    pub fn new(payload: PayloadType, subscriber_annotation: impl Into<String>) -> Self {
        ReceiverFilter {
            payload,
            subscriber_annotation: subscriber_annotation.into(),
        }
    }
}

impl UsageFilter for ReceiverFilter {
    fn accepts(&self, _provider: &dyn SyntaxTreeProvider, usage: &Usage) -> bool {
        match usage {
            Usage::Declaration(method) => {
                is_receiver_declaration(method, &self.subscriber_annotation)
                    && declared_payload_type(method).is_ok_and(|payload| payload == self.payload)
            }
            Usage::Call(_) => false,
        }
    }
}
