//! Syntax tree provider trait and the handle types exchanged with the engine.
//!
//! The engine never parses source code. Everything it knows about a project
//! comes from a [`SyntaxTreeProvider`]: class and method lookups, static type
//! resolution of argument expressions, and the project-wide usage search.
//!
//! # Architecture
//!
//! Providers hand the engine plain owned handles ([`MethodHandle`],
//! [`CallExpression`], [`ClassHandle`]). Handles are transient: the engine
//! holds them for the duration of a single query and never caches them.
//!
//! # Call Syntax Normalization
//!
//! Languages disagree on the shape of a call. A direct method call carries
//! its own argument list, while some grammars produce a bare reference
//! expression whose argument list is the next sibling node. Adapters describe
//! what they saw with [`RawCall`] and call [`RawCall::normalize`], so the
//! engine only ever sees one [`CallExpression`] shape.
//!
//! ## Example
//!
//! ```
//! use busnav_core::adapter::{ArgumentList, CallSyntax, Expression, MethodHandle, RawCall};
//! use busnav_core::types::Span;
//!
//! let post = MethodHandle::new("com.app.Bus", "post", "Bus.java", Span::new(0, 40));
//! let raw = RawCall::ReferenceWithArguments {
//!     target: Some(post),
//!     reference_span: Span::new(100, 108),
//!     next_sibling: Some(ArgumentList::new(
//!         vec![Expression::new("FooEvent()", Span::new(109, 119))],
//!         Span::new(108, 120),
//!     )),
//!     file: "Main.kt".to_string(),
//! };
//!
//! let call = raw.normalize();
//! assert_eq!(call.syntax, CallSyntax::ReferenceWithArguments);
//! assert_eq!(call.args.len(), 1);
//! assert_eq!(call.span, Span::new(100, 120));
//! ```

use serde::{Deserialize, Serialize};

use crate::filter::UsageFilter;
use crate::scope::SearchScope;
use crate::types::Span;

// ============================================================================
// Types
// ============================================================================

/// Structured semantic type as resolved by a provider.
///
/// Generic arguments are kept here; the engine erases them when it turns a
/// type into a [`PayloadType`](crate::payload::PayloadType).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeNode {
    /// A named type (class, interface, primitive).
    Named {
        /// The fully-qualified type name.
        name: String,
        /// Generic type arguments, if any.
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        args: Vec<TypeNode>,
    },
    /// An array of some element type.
    Array {
        /// The element type.
        element: Box<TypeNode>,
    },
    /// Unknown/unresolved type.
    Unknown,
}

impl TypeNode {
    /// Create a named type without arguments.
    pub fn named(name: impl Into<String>) -> Self {
        TypeNode::Named {
            name: name.into(),
            args: vec![],
        }
    }

    /// Create a named type with arguments.
    pub fn named_with_args(name: impl Into<String>, args: Vec<TypeNode>) -> Self {
        TypeNode::Named {
            name: name.into(),
            args,
        }
    }

    /// Create an array type.
    pub fn array(element: TypeNode) -> Self {
        TypeNode::Array {
            element: Box::new(element),
        }
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// A class as known to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassHandle {
    /// Fully-qualified class name.
    pub qualified_name: String,
    /// Containing file (workspace-relative).
    pub file: String,
    /// Declaration span.
    pub span: Span,
}

impl ClassHandle {
    /// Create a class handle.
    pub fn new(qualified_name: impl Into<String>, file: impl Into<String>, span: Span) -> Self {
        ClassHandle {
            qualified_name: qualified_name.into(),
            file: file.into(),
            span,
        }
    }
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: TypeNode,
}

impl Parameter {
    /// Create a parameter.
    pub fn new(name: impl Into<String>, ty: TypeNode) -> Self {
        Parameter {
            name: name.into(),
            ty,
        }
    }
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodHandle {
    /// Fully-qualified name of the owning type.
    pub owner: String,
    /// Method name.
    pub name: String,
    /// Declared parameters, in order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub params: Vec<Parameter>,
    /// Annotation names as written or resolved (simple or fully-qualified).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub annotations: Vec<String>,
    /// Span of the whole declaration.
    pub span: Span,
    /// Span of the name identifier (used as the navigation anchor).
    pub name_span: Span,
    /// Containing file (workspace-relative).
    pub file: String,
}

impl MethodHandle {
    /// Create a method handle without parameters or annotations.
    ///
    /// The name span defaults to the declaration span.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        file: impl Into<String>,
        span: Span,
    ) -> Self {
        MethodHandle {
            owner: owner.into(),
            name: name.into(),
            params: vec![],
            annotations: vec![],
            span,
            name_span: span,
            file: file.into(),
        }
    }

    /// Append a parameter.
    pub fn with_param(mut self, name: impl Into<String>, ty: TypeNode) -> Self {
        self.params.push(Parameter::new(name, ty));
        self
    }

    /// Append an annotation.
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Set the name identifier span.
    pub fn with_name_span(mut self, span: Span) -> Self {
        self.name_span = span;
        self
    }

    /// `owner.name`, the form stored in the poster allow-list.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    /// The first declared parameter, if any.
    pub fn first_param(&self) -> Option<&Parameter> {
        self.params.first()
    }

    /// Whether the method carries the given annotation.
    ///
    /// When both names are fully qualified they must be equal. Otherwise the
    /// simple names are compared, since adapters do not always resolve
    /// annotation imports.
    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.iter().any(|a| {
            if a.contains('.') && annotation.contains('.') {
                a == annotation
            } else {
                simple_name(a) == simple_name(annotation)
            }
        })
    }
}

/// Last segment of a dotted name.
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

// ============================================================================
// Calls
// ============================================================================

/// An argument expression at a call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expression {
    /// Source text of the expression.
    pub text: String,
    /// Byte span of the expression.
    pub span: Span,
}

impl Expression {
    /// Create an expression.
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Expression {
            text: text.into(),
            span,
        }
    }
}

/// Surface syntax a call was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSyntax {
    /// A call expression owning its argument list: `bus.post(event)`.
    MethodCall,
    /// A bare reference whose argument list is the next sibling node.
    ReferenceWithArguments,
}

/// The normalized call shape consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallExpression {
    /// Resolved target method. `None` when the provider could not resolve it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<MethodHandle>,
    /// Argument expressions, in call order.
    pub args: Vec<Expression>,
    /// Byte span of the whole call.
    pub span: Span,
    /// Containing file (workspace-relative).
    pub file: String,
    /// Surface syntax the call came from.
    pub syntax: CallSyntax,
}

impl CallExpression {
    /// Create a direct method call.
    pub fn new(
        target: Option<MethodHandle>,
        args: Vec<Expression>,
        file: impl Into<String>,
        span: Span,
    ) -> Self {
        CallExpression {
            target,
            args,
            span,
            file: file.into(),
            syntax: CallSyntax::MethodCall,
        }
    }

    /// The first argument, which carries the event payload.
    pub fn first_arg(&self) -> Option<&Expression> {
        self.args.first()
    }

    /// Fully-qualified name of the resolved target.
    pub fn target_name(&self) -> Option<String> {
        self.target.as_ref().map(MethodHandle::fully_qualified_name)
    }
}

/// An argument list node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgumentList {
    /// The arguments.
    pub args: Vec<Expression>,
    /// Span of the list including delimiters.
    pub span: Span,
}

impl ArgumentList {
    /// Create an argument list.
    pub fn new(args: Vec<Expression>, span: Span) -> Self {
        ArgumentList { args, span }
    }
}

/// A call as an adapter encountered it, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCall {
    /// Call expression with its own argument list.
    MethodCall {
        target: Option<MethodHandle>,
        arguments: ArgumentList,
        span: Span,
        file: String,
    },
    /// Reference expression followed by a sibling argument list.
    ReferenceWithArguments {
        target: Option<MethodHandle>,
        reference_span: Span,
        next_sibling: Option<ArgumentList>,
        file: String,
    },
}

impl RawCall {
    /// Collapse either surface shape into a [`CallExpression`].
    ///
    /// A reference without an argument-list sibling becomes a call with no
    /// arguments.
    pub fn normalize(self) -> CallExpression {
        match self {
            RawCall::MethodCall {
                target,
                arguments,
                span,
                file,
            } => CallExpression {
                target,
                args: arguments.args,
                span,
                file,
                syntax: CallSyntax::MethodCall,
            },
            RawCall::ReferenceWithArguments {
                target,
                reference_span,
                next_sibling,
                file,
            } => {
                let (args, span) = match next_sibling {
                    Some(list) => (list.args, reference_span.cover(list.span)),
                    None => (vec![], reference_span),
                };
                CallExpression {
                    target,
                    args,
                    span,
                    file,
                    syntax: CallSyntax::ReferenceWithArguments,
                }
            }
        }
    }
}

// ============================================================================
// Elements and Usages
// ============================================================================

/// A source element the navigator is asked about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxElement {
    /// A call expression.
    Call(CallExpression),
    /// A method declaration.
    Method(MethodHandle),
    /// Anything else.
    Other { file: String, span: Span },
}

impl SyntaxElement {
    /// Span of the element.
    pub fn span(&self) -> Span {
        match self {
            SyntaxElement::Call(call) => call.span,
            SyntaxElement::Method(method) => method.span,
            SyntaxElement::Other { span, .. } => *span,
        }
    }

    /// Containing file.
    pub fn file(&self) -> &str {
        match self {
            SyntaxElement::Call(call) => &call.file,
            SyntaxElement::Method(method) => &method.file,
            SyntaxElement::Other { file, .. } => file,
        }
    }
}

/// One hit of a project-wide usage search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Usage {
    /// A call site.
    Call(CallExpression),
    /// A method declaration.
    Declaration(MethodHandle),
}

impl Usage {
    /// Span of the usage.
    pub fn span(&self) -> Span {
        match self {
            Usage::Call(call) => call.span,
            Usage::Declaration(method) => method.span,
        }
    }

    /// Containing file.
    pub fn file(&self) -> &str {
        match self {
            Usage::Call(call) => &call.file,
            Usage::Declaration(method) => &method.file,
        }
    }
}

/// Starting point of a usage search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchSeed {
    /// Find call sites of this method.
    Method(MethodHandle),
    /// Find usages of this type: annotated declarations and calls on it.
    Type(ClassHandle),
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Language-specific source of structure, types and usages.
///
/// Implementations wrap a parser and type checker, a language server client,
/// or a pre-populated index such as `busnav_facts::FactsStore`.
pub trait SyntaxTreeProvider {
    /// Look up a class by fully-qualified name.
    fn find_class(&self, qualified_name: &str) -> Option<ClassHandle>;

    /// Methods of `class` named `name`, in declaration order.
    fn find_methods_by_name(&self, class: &ClassHandle, name: &str) -> Vec<MethodHandle>;

    /// Static type of an expression in `file`, if it can be resolved.
    fn resolve_expression_type(&self, file: &str, expr: &Expression) -> Option<TypeNode>;

    /// Walk the usages of `seeds` inside `scope`, keeping those accepted by
    /// `filter`, and stop after `limit` accepted hits.
    ///
    /// Results come back in the provider's natural traversal order.
    fn search_usages(
        &self,
        seeds: &[SearchSeed],
        scope: &SearchScope,
        filter: &dyn UsageFilter,
        limit: usize,
    ) -> Vec<Usage>;
}

// ============================================================================
// Tests
// ============================================================================
