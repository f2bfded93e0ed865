//! Role classification of syntax elements.
//!
//! Rules, first match wins:
//! 1. A call whose resolved target is a post method on a bus type, or an
//!    allow-listed method, is a [`Role::PosterCall`].
//! 2. A single-parameter method carrying the subscriber annotation is a
//!    [`Role::ReceiverDeclaration`].
//! 3. A method whose fully-qualified name is allow-listed is a
//!    [`Role::BusMethodDeclaration`].
//! 4. Anything else is [`Role::None`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::adapter::{CallExpression, MethodHandle, SyntaxElement};
use crate::config::BusConfig;

/// Mutually exclusive role of a syntax element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A call publishing an event.
    PosterCall,
    /// A method handling events of its single parameter type.
    ReceiverDeclaration,
    /// A declaration of an allow-listed poster method.
    BusMethodDeclaration,
    /// Not part of the event flow.
    None,
}

impl Role {
    /// Stable string form for output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::PosterCall => "poster_call",
            Role::ReceiverDeclaration => "receiver_declaration",
            Role::BusMethodDeclaration => "bus_method_declaration",
            Role::None => "none",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies elements against the bus conventions and a snapshot of the
/// poster allow-list.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    config: &'a BusConfig,
    posters: &'a BTreeSet<String>,
}

impl<'a> Classifier<'a> {
    /// Create a classifier.
    pub fn new(config: &'a BusConfig, posters: &'a BTreeSet<String>) -> Self {
        Classifier { config, posters }
    }

    /// Decide the role of `element`.
    pub fn classify(&self, element: &SyntaxElement) -> Role {
        match element {
            SyntaxElement::Call(call) if self.is_poster_call(call) => Role::PosterCall,
            SyntaxElement::Method(method) if self.is_receiver(method) => Role::ReceiverDeclaration,
            SyntaxElement::Method(method) if self.is_bus_method(method) => {
                Role::BusMethodDeclaration
            }
            _ => Role::None,
        }
    }

    /// Whether a call publishes an event. Unresolved targets never do.
    pub fn is_poster_call(&self, call: &CallExpression) -> bool {
        let Some(target) = &call.target else {
            return false;
        };
        (self.config.is_bus_type(&target.owner) && self.config.is_post_method(&target.name))
            || self.posters.contains(&target.fully_qualified_name())
    }

    /// Whether a declaration follows the receiver convention.
    pub fn is_receiver(&self, method: &MethodHandle) -> bool {
        is_receiver_declaration(method, &self.config.subscriber_annotation)
    }

    /// Whether a declaration is an allow-listed poster method.
    pub fn is_bus_method(&self, method: &MethodHandle) -> bool {
        self.posters.contains(&method.fully_qualified_name())
    }
}

/// Receiver convention: exactly one parameter and the subscriber annotation.
pub fn is_receiver_declaration(method: &MethodHandle, subscriber_annotation: &str) -> bool {
    method.params.len() == 1 && method.has_annotation(subscriber_annotation)
}

// ============================================================================
// Tests
// ============================================================================
