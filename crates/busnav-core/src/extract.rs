//! Payload type extraction.
//!
//! Posters carry the payload as their first argument; receivers and bus
//! methods declare it as their first parameter. Both are normalized into a
//! [`PayloadType`] with generic arguments erased.

use crate::adapter::{CallExpression, MethodHandle, SyntaxElement, SyntaxTreeProvider};
use crate::classify::Role;
use crate::error::{AnalysisError, AnalysisResult};
use crate::payload::PayloadType;

/// Extract the payload type of an element already classified as `role`.
///
/// Fails with `NoPayload` when the element has no argument or parameter, or
/// when its shape does not fit the role.
pub fn extract_payload_type(
    provider: &dyn SyntaxTreeProvider,
    element: &SyntaxElement,
    role: Role,
) -> AnalysisResult<PayloadType> {
    match (role, element) {
        (Role::PosterCall, SyntaxElement::Call(call)) => call_payload_type(provider, call),
        (Role::ReceiverDeclaration | Role::BusMethodDeclaration, SyntaxElement::Method(method)) => {
            declared_payload_type(method)
        }
        _ => Err(AnalysisError::NoPayload {
            span: element.span(),
        }),
    }
}

/// Payload type of a call: the resolved type of its first argument.
pub fn call_payload_type(
    provider: &dyn SyntaxTreeProvider,
    call: &CallExpression,
) -> AnalysisResult<PayloadType> {
    let arg = call
        .first_arg()
        .ok_or(AnalysisError::NoPayload { span: call.span })?;
    let ty = provider
        .resolve_expression_type(&call.file, arg)
        .ok_or_else(|| AnalysisError::unresolved(&arg.text))?;
    PayloadType::from_type(&ty).ok_or_else(|| AnalysisError::unresolved(&arg.text))
}

/// Payload type of a declaration: its first declared parameter type.
pub fn declared_payload_type(method: &MethodHandle) -> AnalysisResult<PayloadType> {
    let param = method
        .first_param()
        .ok_or(AnalysisError::NoPayload { span: method.span })?;
    PayloadType::from_type(&param.ty).ok_or_else(|| {
        AnalysisError::unresolved(format!(
            "{}({})",
            method.fully_qualified_name(),
            param.name
        ))
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{
        ArgumentList, ClassHandle, Expression, RawCall, SearchSeed, TypeNode, Usage,
    };
    use crate::filter::UsageFilter;
    use crate::scope::SearchScope;
    use crate::types::Span;
    use std::collections::HashMap;

    /// Provider that only answers expression types.
    #[derive(Default)]
    struct TypeTable {
        types: HashMap<Span, TypeNode>,
    }

    impl SyntaxTreeProvider for TypeTable {
        fn find_class(&self, _qualified_name: &str) -> Option<ClassHandle> {
            None
        }

        fn find_methods_by_name(&self, _class: &ClassHandle, _name: &str) -> Vec<MethodHandle> {
            vec![]
        }

        fn resolve_expression_type(&self, _file: &str, expr: &Expression) -> Option<TypeNode> {
            self.types.get(&expr.span).cloned()
        }

        fn search_usages(
            &self,
            _seeds: &[SearchSeed],
            _scope: &SearchScope,
            _filter: &dyn UsageFilter,
            _limit: usize,
        ) -> Vec<Usage> {
            vec![]
        }
    }

    fn bus_post() -> MethodHandle {
        MethodHandle::new("com.app.Bus", "post", "Bus.java", Span::new(0, 30))
            .with_param("event", TypeNode::named("java.lang.Object"))
    }

    fn event_arg() -> Expression {
        Expression::new("new FooEvent()", Span::new(50, 64))
    }

    fn provider() -> TypeTable {
        let mut table = TypeTable::default();
        table
            .types
            .insert(event_arg().span, TypeNode::named("com.app.FooEvent"));
        table
    }

    #[test]
    fn poster_payload_is_first_argument_type() {
        let call = CallExpression::new(
            Some(bus_post()),
            vec![event_arg()],
            "Main.java",
            Span::new(40, 65),
        );
        let payload =
            extract_payload_type(&provider(), &SyntaxElement::Call(call), Role::PosterCall)
                .unwrap();
        assert_eq!(payload.as_str(), "com.app.FooEvent");
    }

    #[test]
    fn extraction_is_deterministic() {
        let element = SyntaxElement::Call(CallExpression::new(
            Some(bus_post()),
            vec![event_arg()],
            "Main.java",
            Span::new(40, 65),
        ));
        let provider = provider();
        let first = extract_payload_type(&provider, &element, Role::PosterCall).unwrap();
        let second = extract_payload_type(&provider, &element, Role::PosterCall).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn both_call_syntaxes_extract_the_same_payload() {
        let direct = RawCall::MethodCall {
            target: Some(bus_post()),
            arguments: ArgumentList::new(vec![event_arg()], Span::new(49, 65)),
            span: Span::new(40, 65),
            file: "Main.kt".to_string(),
        }
        .normalize();
        let sibling = RawCall::ReferenceWithArguments {
            target: Some(bus_post()),
            reference_span: Span::new(40, 49),
            next_sibling: Some(ArgumentList::new(vec![event_arg()], Span::new(49, 65))),
            file: "Main.kt".to_string(),
        }
        .normalize();

        let provider = provider();
        assert_eq!(
            call_payload_type(&provider, &direct).unwrap(),
            call_payload_type(&provider, &sibling).unwrap()
        );
    }

    #[test]
    fn zero_argument_call_has_no_payload() {
        let call = CallExpression::new(Some(bus_post()), vec![], "Main.java", Span::new(40, 50));
        let err = extract_payload_type(&provider(), &SyntaxElement::Call(call), Role::PosterCall)
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::NoPayload {
                span: Span::new(40, 50)
            }
        );
    }

    #[test]
    fn unresolvable_argument_is_unresolved_reference() {
        let call = CallExpression::new(
            Some(bus_post()),
            vec![Expression::new("mystery", Span::new(90, 97))],
            "Main.java",
            Span::new(80, 98),
        );
        let err = call_payload_type(&provider(), &call).unwrap_err();
        assert_eq!(err, AnalysisError::unresolved("mystery"));
    }

    #[test]
    fn receiver_payload_is_first_parameter_with_generics_erased() {
        let receiver = MethodHandle::new("com.app.Screen", "onFoo", "Screen.java", Span::new(0, 9))
            .with_param(
                "event",
                TypeNode::named_with_args("com.app.Envelope", vec![TypeNode::named("X")]),
            )
            .with_annotation("Subscribe");
        let payload = extract_payload_type(
            &provider(),
            &SyntaxElement::Method(receiver),
            Role::ReceiverDeclaration,
        )
        .unwrap();
        assert_eq!(payload.as_str(), "com.app.Envelope");
    }

    #[test]
    fn parameterless_declaration_has_no_payload() {
        let emit = MethodHandle::new("com.app.Hub", "emit", "Hub.java", Span::new(3, 20));
        let err = extract_payload_type(
            &provider(),
            &SyntaxElement::Method(emit),
            Role::BusMethodDeclaration,
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::NoPayload { .. }));
    }

    #[test]
    fn role_shape_mismatch_has_no_payload() {
        let err = extract_payload_type(
            &provider(),
            &SyntaxElement::Method(bus_post()),
            Role::PosterCall,
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::NoPayload { .. }));
    }
}
