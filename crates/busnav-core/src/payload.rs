//! Normalized event payload types.
//!
//! A [`PayloadType`] is the fully-qualified name of the event class with all
//! generic arguments erased. Posters and receivers match iff their payload
//! types are equal; no subtyping or variance is applied.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::adapter::TypeNode;

/// Normalized payload type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadType(String);

impl PayloadType {
    /// Normalize a resolved type.
    ///
    /// Returns `None` for unknown types.
    pub fn from_type(node: &TypeNode) -> Option<Self> {
        match node {
            TypeNode::Named { name, .. } => PayloadType::parse(name),
            TypeNode::Array { element } => {
                PayloadType::from_type(element).map(|inner| PayloadType(format!("{}[]", inner.0)))
            }
            TypeNode::Unknown => None,
        }
    }

    /// Normalize a textual type such as `com.app.Wrapper<com.app.Foo>`.
    ///
    /// Every balanced `<...>` group is removed and whitespace is dropped.
    /// Returns `None` when nothing is left.
    pub fn parse(text: &str) -> Option<Self> {
        let erased = erase_generics(text);
        if erased.is_empty() {
            None
        } else {
            Some(PayloadType(erased))
        }
    }

    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment of the normalized name.
    pub fn simple_name(&self) -> &str {
        crate::adapter::simple_name(&self.0)
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn erase_generics(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if depth == 0 && !c.is_whitespace() => out.push(c),
            _ => {}
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_type_without_args() {
        let payload = PayloadType::from_type(&TypeNode::named("com.app.FooEvent")).unwrap();
        assert_eq!(payload.as_str(), "com.app.FooEvent");
        assert_eq!(payload.simple_name(), "FooEvent");
    }

    #[test]
    fn generic_arguments_are_erased() {
        let with_bar = TypeNode::named_with_args(
            "com.app.Envelope",
            vec![TypeNode::named("com.app.Bar")],
        );
        let with_baz = TypeNode::named_with_args(
            "com.app.Envelope",
            vec![TypeNode::named_with_args(
                "java.util.List",
                vec![TypeNode::named("com.app.Baz")],
            )],
        );
        let a = PayloadType::from_type(&with_bar).unwrap();
        let b = PayloadType::from_type(&with_baz).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "com.app.Envelope");
    }

    #[test]
    fn textual_generics_are_erased() {
        assert_eq!(
            PayloadType::parse("com.app.Envelope<com.app.Bar>").unwrap(),
            PayloadType::parse("com.app.Envelope< java.util.Map<K, V> >").unwrap()
        );
        assert_eq!(
            PayloadType::parse("Envelope<Foo<Bar>>[]").unwrap().as_str(),
            "Envelope[]"
        );
    }

    #[test]
    fn erasure_is_idempotent() {
        let once = PayloadType::parse("com.app.Envelope<X>").unwrap();
        let twice = PayloadType::parse(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn arrays_keep_their_suffix() {
        let node = TypeNode::array(TypeNode::named("com.app.FooEvent"));
        assert_eq!(
            PayloadType::from_type(&node).unwrap().as_str(),
            "com.app.FooEvent[]"
        );
    }

    #[test]
    fn unknown_and_empty_are_not_payloads() {
        assert!(PayloadType::from_type(&TypeNode::Unknown).is_none());
        assert!(PayloadType::parse("   ").is_none());
        assert!(PayloadType::parse("<T>").is_none());
    }

    #[test]
    fn serializes_as_plain_string() {
        let payload = PayloadType::parse("com.app.FooEvent").unwrap();
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            "\"com.app.FooEvent\""
        );
    }
}
