//! Navigation queries consumed by editor front-ends.
//!
//! [`classify_and_resolve`] is the single entry point for "jump to the other
//! side": it classifies the element, extracts its payload type and runs the
//! matching search. [`marker_for`] describes the gutter marker an element
//! should carry, and [`mark_poster`] backs the "mark as poster" action.
//!
//! Analysis failures never surface here: an element whose payload cannot be
//! extracted resolves to its role alone. Allow-list I/O failures are the one
//! exception and are returned to the caller as
//! [`StoreError`](crate::allowlist::StoreError).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::{MethodHandle, SyntaxElement, SyntaxTreeProvider};
use crate::allowlist::StoreResult;
use crate::classify::{Classifier, Role};
use crate::extract::extract_payload_type;
use crate::matcher::{Direction, MatchEngine, MatchQuery, SearchResult};
use crate::payload::PayloadType;
use crate::scope::SearchScope;
use crate::session::AnalysisSession;
use crate::types::Span;

// ============================================================================
// Resolution
// ============================================================================

/// Outcome of a navigation query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Role of the queried element.
    pub role: Role,
    /// Direction searched, if any search ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Payload type of the element, when it could be extracted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<PayloadType>,
    /// Counterpart usages, when a search ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SearchResult>,
}

impl Resolution {
    fn role_only(role: Role) -> Self {
        Resolution {
            role,
            direction: None,
            payload: None,
            result: None,
        }
    }

    /// Whether a search ran and found something.
    pub fn has_matches(&self) -> bool {
        self.result.as_ref().is_some_and(|r| !r.is_empty())
    }
}

/// Classify `element` and find its counterparts within `scope`.
///
/// | Role | Search |
/// |------|--------|
/// | `PosterCall` | receivers of the call's payload |
/// | `ReceiverDeclaration` | posters of the parameter's payload |
/// | `BusMethodDeclaration` | plain references to the method |
/// | `None` | nothing |
///
/// Fails only when the allow-list cannot be read.
pub fn classify_and_resolve(
    session: &AnalysisSession,
    provider: &dyn SyntaxTreeProvider,
    element: &SyntaxElement,
    scope: &SearchScope,
) -> StoreResult<Resolution> {
    let posters = session.allow_list().load()?;
    let config = session.config();
    let role = Classifier::new(config, &posters).classify(element);
    let engine = MatchEngine::new(provider, config, &posters);

    let query = match (role, element) {
        (Role::PosterCall | Role::ReceiverDeclaration, _) => {
            let payload = match extract_payload_type(provider, element, role) {
                Ok(payload) => payload,
                Err(err) => {
                    debug!(%role, span = %element.span(), error = %err, "no payload, nothing to navigate");
                    return Ok(Resolution::role_only(role));
                }
            };
            if role == Role::PosterCall {
                MatchQuery::Receivers(payload)
            } else {
                MatchQuery::Posters(payload)
            }
        }
        (Role::BusMethodDeclaration, SyntaxElement::Method(method)) => {
            MatchQuery::References(method.clone())
        }
        _ => return Ok(Resolution::role_only(role)),
    };

    // Bus methods report their payload for display only.
    let payload = match &query {
        MatchQuery::Posters(payload) | MatchQuery::Receivers(payload) => Some(payload.clone()),
        MatchQuery::References(_) => extract_payload_type(provider, element, role).ok(),
    };
    let direction = query.direction();
    let result = engine.find_matches(&query, scope);
    debug!(%role, ?direction, matches = result.len(), "resolved navigation");
    Ok(Resolution {
        role,
        direction: Some(direction),
        payload,
        result: Some(result),
    })
}

// ============================================================================
// Markers
// ============================================================================

/// Kind of gutter marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Poster or receiver: navigates to the other side.
    Navigate,
    /// Allow-listed bus method: navigates to its callers.
    Bus,
}

/// Gutter marker descriptor for one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationMarker {
    /// Role of the marked element.
    pub role: Role,
    /// Which marker to draw.
    pub kind: MarkerKind,
    /// Where the marker attaches: the call for posters, the name identifier
    /// for declarations.
    pub anchor: Span,
    /// Containing file (workspace-relative).
    pub file: String,
    /// Tooltip text.
    pub label: String,
}

/// Marker for `element`, or `None` when it plays no part in the event flow.
pub fn marker_for(
    session: &AnalysisSession,
    element: &SyntaxElement,
) -> StoreResult<Option<NavigationMarker>> {
    let posters = session.allow_list().load()?;
    let role = Classifier::new(session.config(), &posters).classify(element);
    let (kind, label) = match role {
        Role::PosterCall => (MarkerKind::Navigate, "Show Receivers"),
        Role::ReceiverDeclaration => (MarkerKind::Navigate, "Show Posters"),
        Role::BusMethodDeclaration => (MarkerKind::Bus, "Show References"),
        Role::None => return Ok(None),
    };
    let anchor = match element {
        SyntaxElement::Method(method) => method.name_span,
        other => other.span(),
    };
    Ok(Some(NavigationMarker {
        role,
        kind,
        anchor,
        file: element.file().to_string(),
        label: label.to_string(),
    }))
}

// ============================================================================
// Allow-list Actions
// ============================================================================

/// Whether `method` can still be marked as a poster, i.e. is not already
/// allow-listed.
pub fn can_mark_poster(session: &AnalysisSession, method: &MethodHandle) -> StoreResult<bool> {
    let listed = session.allow_list().contains(&method.fully_qualified_name())?;
    Ok(!listed)
}

/// Add a fully-qualified method name to the allow-list.
pub fn add_poster(session: &AnalysisSession, name: &str) -> StoreResult<bool> {
    session.add_poster(name)
}

/// Mark a declared method as a poster.
pub fn mark_poster(session: &AnalysisSession, method: &MethodHandle) -> StoreResult<bool> {
    add_poster(session, &method.fully_qualified_name())
}

// ============================================================================
// Tests
// ============================================================================
