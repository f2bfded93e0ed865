//! Match engine: from a payload type to its counterparts.
//!
//! The engine assembles search seeds and picks the usage filter; the
//! provider performs the scope-wide walk. Three directions exist:
//!
//! | Direction | Seeds | Filter |
//! |-----------|-------|--------|
//! | `FindPosters` | every resolvable allow-listed method | [`PosterFilter`] |
//! | `FindReceivers` | the subscription-point type | [`ReceiverFilter`] |
//! | `FindReferences` | the method itself | [`AcceptAll`] |
//!
//! Resolution failures while assembling seeds skip that one candidate. The
//! engine never fails; results are capped at `max_usages` and otherwise left
//! in the provider's traversal order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::adapter::{MethodHandle, SearchSeed, SyntaxTreeProvider, Usage};
use crate::config::BusConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::filter::{AcceptAll, PosterFilter, ReceiverFilter, UsageFilter};
use crate::payload::PayloadType;
use crate::scope::SearchScope;

/// Navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// From a receiver to the calls posting its payload.
    FindPosters,
    /// From a poster call to the receivers of its payload.
    FindReceivers,
    /// From a bus method to every call of it, unfiltered.
    FindReferences,
}

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchQuery {
    Posters(PayloadType),
    Receivers(PayloadType),
    References(MethodHandle),
}

impl MatchQuery {
    /// Direction of this query.
    pub fn direction(&self) -> Direction {
        match self {
            MatchQuery::Posters(_) => Direction::FindPosters,
            MatchQuery::Receivers(_) => Direction::FindReceivers,
            MatchQuery::References(_) => Direction::FindReferences,
        }
    }
}

/// Capped list of usages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matches in provider traversal order.
    pub usages: Vec<Usage>,
    /// More matches existed beyond the cap.
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub truncated: bool,
}

impl SearchResult {
    /// An empty result.
    pub fn empty() -> Self {
        SearchResult::default()
    }

    /// Keep at most `max` usages, remembering whether any were dropped.
    pub fn capped(mut usages: Vec<Usage>, max: usize) -> Self {
        let truncated = usages.len() > max;
        usages.truncate(max);
        SearchResult { usages, truncated }
    }

    /// Number of usages.
    pub fn len(&self) -> usize {
        self.usages.len()
    }

    /// Whether there are no usages.
    pub fn is_empty(&self) -> bool {
        self.usages.is_empty()
    }

    /// Iterate over usages.
    pub fn iter(&self) -> impl Iterator<Item = &Usage> {
        self.usages.iter()
    }
}

/// Runs match queries against a provider.
pub struct MatchEngine<'a> {
    provider: &'a dyn SyntaxTreeProvider,
    config: &'a BusConfig,
    posters: &'a BTreeSet<String>,
}

impl<'a> MatchEngine<'a> {
    /// Create an engine over a provider, configuration and allow-list snapshot.
    pub fn new(
        provider: &'a dyn SyntaxTreeProvider,
        config: &'a BusConfig,
        posters: &'a BTreeSet<String>,
    ) -> Self {
        MatchEngine {
            provider,
            config,
            posters,
        }
    }

    /// Run a query.
    pub fn find_matches(&self, query: &MatchQuery, scope: &SearchScope) -> SearchResult {
        match query {
            MatchQuery::Posters(payload) => self.find_posters(payload, scope),
            MatchQuery::Receivers(payload) => self.find_receivers(payload, scope),
            MatchQuery::References(method) => self.find_references(method, scope),
        }
    }

    /// Call sites of allow-listed posters whose payload is `payload`.
    pub fn find_posters(&self, payload: &PayloadType, scope: &SearchScope) -> SearchResult {
        let seeds: Vec<SearchSeed> = self
            .poster_candidates()
            .into_iter()
            .map(SearchSeed::Method)
            .collect();
        if seeds.is_empty() {
            debug!(%payload, "no resolvable poster methods");
            return SearchResult::empty();
        }
        self.search(&seeds, scope, &PosterFilter::new(payload.clone()))
    }

    /// Receiver declarations for `payload`, found through the usages of the
    /// subscription-point type.
    pub fn find_receivers(&self, payload: &PayloadType, scope: &SearchScope) -> SearchResult {
        let annotation = &self.config.subscriber_annotation;
        let Some(seed) = self.provider.find_class(annotation) else {
            debug!(subscriber = %annotation, "subscription-point type not found");
            return SearchResult::empty();
        };
        self.search(
            &[SearchSeed::Type(seed)],
            scope,
            &ReceiverFilter::new(payload.clone(), annotation.clone()),
        )
    }

    /// Every call of `method`, without type filtering.
    pub fn find_references(&self, method: &MethodHandle, scope: &SearchScope) -> SearchResult {
        self.search(&[SearchSeed::Method(method.clone())], scope, &AcceptAll)
    }

    /// Allow-list entries resolved to method handles. Unresolvable entries
    /// are skipped.
    pub fn poster_candidates(&self) -> Vec<MethodHandle> {
        self.posters
            .iter()
            .filter_map(|entry| match self.resolve_poster(entry) {
                Ok(method) => Some(method),
                Err(err) => {
                    debug!(poster = %entry, error = %err, "skipping poster entry");
                    None
                }
            })
            .collect()
    }

    /// Resolve `Owner.method` to the first method of that name on the owner.
    pub fn resolve_poster(&self, entry: &str) -> AnalysisResult<MethodHandle> {
        let (class_name, method_name) = entry
            .rsplit_once('.')
            .ok_or_else(|| AnalysisError::unresolved(entry))?;
        let class = self
            .provider
            .find_class(class_name)
            .ok_or_else(|| AnalysisError::unresolved(class_name))?;
        self.provider
            .find_methods_by_name(&class, method_name)
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::unresolved(entry))
    }

    fn search(
        &self,
        seeds: &[SearchSeed],
        scope: &SearchScope,
        filter: &dyn UsageFilter,
    ) -> SearchResult {
        let max = self.config.max_usages;
        let hits = self
            .provider
            .search_usages(seeds, scope, filter, max.saturating_add(1));
        let result = SearchResult::capped(hits, max);
        debug!(
            seeds = seeds.len(),
            matches = result.len(),
            truncated = result.truncated,
            "usage search finished"
        );
        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{CallExpression, ClassHandle, Expression, TypeNode};
    use crate::types::Span;
    use std::cell::RefCell;

    /// Provider with a fixed class table and a flat list of usages.
    #[derive(Default)]
    struct FixtureProvider {
        classes: Vec<ClassHandle>,
        methods: Vec<MethodHandle>,
        usages: Vec<Usage>,
        seen_seeds: RefCell<Vec<SearchSeed>>,
        seen_limit: RefCell<Option<usize>>,
    }

    impl SyntaxTreeProvider for FixtureProvider {
        fn find_class(&self, qualified_name: &str) -> Option<ClassHandle> {
            self.classes
                .iter()
                .find(|c| c.qualified_name == qualified_name)
                .cloned()
        }

        fn find_methods_by_name(&self, class: &ClassHandle, name: &str) -> Vec<MethodHandle> {
            self.methods
                .iter()
                .filter(|m| m.owner == class.qualified_name && m.name == name)
                .cloned()
                .collect()
        }

        fn resolve_expression_type(&self, _file: &str, expr: &Expression) -> Option<TypeNode> {
            Some(TypeNode::named(expr.text.clone()))
        }

        fn search_usages(
            &self,
            seeds: &[SearchSeed],
            scope: &SearchScope,
            filter: &dyn UsageFilter,
            limit: usize,
        ) -> Vec<Usage> {
            self.seen_seeds.borrow_mut().extend_from_slice(seeds);
            *self.seen_limit.borrow_mut() = Some(limit);
            self.usages
                .iter()
                .filter(|u| scope.contains(u.file()))
                .filter(|u| filter.accepts(self, u))
                .take(limit)
                .cloned()
                .collect()
        }
    }

    fn bus_class() -> ClassHandle {
        ClassHandle::new("com.app.Bus", "Bus.java", Span::new(0, 100))
    }

    fn post() -> MethodHandle {
        MethodHandle::new("com.app.Bus", "post", "Bus.java", Span::new(10, 40))
            .with_param("event", TypeNode::named("java.lang.Object"))
    }

    fn post_call(event: &str, at: u64) -> Usage {
        Usage::Call(CallExpression::new(
            Some(post()),
            vec![Expression::new(event, Span::new(at + 9, at + 20))],
            "Main.java",
            Span::new(at, at + 21),
        ))
    }

    fn config(max_usages: usize) -> BusConfig {
        BusConfig {
            bus_types: vec!["com.app.Bus".to_string()],
            max_usages,
            ..BusConfig::default()
        }
    }

    fn posters(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn foo() -> PayloadType {
        PayloadType::parse("com.app.FooEvent").unwrap()
    }

    #[test]
    fn find_posters_filters_by_payload() {
        let provider = FixtureProvider {
            classes: vec![bus_class()],
            methods: vec![post()],
            usages: vec![
                post_call("com.app.FooEvent", 100),
                post_call("com.app.BarEvent", 200),
                post_call("com.app.FooEvent", 300),
            ],
            ..Default::default()
        };
        let (config, posters) = (config(100), posters(&["com.app.Bus.post"]));
        let engine = MatchEngine::new(&provider, &config, &posters);

        let result = engine.find_posters(&foo(), &SearchScope::Project);
        assert_eq!(result.len(), 2);
        assert!(!result.truncated);
        assert_eq!(
            provider.seen_seeds.borrow().as_slice(),
            &[SearchSeed::Method(post())]
        );
    }

    #[test]
    fn find_posters_never_exceeds_cap() {
        let usages = (0..250).map(|i| post_call("com.app.FooEvent", i * 100)).collect();
        let provider = FixtureProvider {
            classes: vec![bus_class()],
            methods: vec![post()],
            usages,
            ..Default::default()
        };
        let (config, posters) = (config(100), posters(&["com.app.Bus.post"]));
        let engine = MatchEngine::new(&provider, &config, &posters);

        let result = engine.find_posters(&foo(), &SearchScope::Project);
        assert_eq!(result.len(), 100);
        assert!(result.truncated);
        assert_eq!(*provider.seen_limit.borrow(), Some(101));
    }

    #[test]
    fn unresolvable_entries_are_skipped() {
        let provider = FixtureProvider {
            classes: vec![bus_class()],
            methods: vec![post()],
            ..Default::default()
        };
        let config = config(100);
        let posters = posters(&[
            "com.app.Bus.post",
            "com.app.Bus.missing",
            "com.gone.Hub.emit",
            "nodots",
        ]);
        let engine = MatchEngine::new(&provider, &config, &posters);
        assert_eq!(engine.poster_candidates(), vec![post()]);
        assert_eq!(
            engine.resolve_poster("com.gone.Hub.emit").unwrap_err(),
            AnalysisError::unresolved("com.gone.Hub")
        );
    }

    #[test]
    fn no_candidates_means_empty_result() {
        let provider = FixtureProvider {
            usages: vec![post_call("com.app.FooEvent", 100)],
            ..Default::default()
        };
        let (config, posters) = (config(100), posters(&["com.app.Bus.post"]));
        let engine = MatchEngine::new(&provider, &config, &posters);
        assert!(engine.find_posters(&foo(), &SearchScope::Project).is_empty());
        assert!(provider.seen_seeds.borrow().is_empty());
    }

    #[test]
    fn find_receivers_seeds_with_subscription_type() {
        let subscribe =
            ClassHandle::new("org.greenrobot.eventbus.Subscribe", "Subscribe.java", Span::new(0, 5));
        let on_foo = MethodHandle::new("com.app.Screen", "onFoo", "Screen.java", Span::new(0, 50))
            .with_param("event", TypeNode::named("com.app.FooEvent"))
            .with_annotation("Subscribe");
        let on_bar = MethodHandle::new("com.app.Screen", "onBar", "Screen.java", Span::new(60, 99))
            .with_param("event", TypeNode::named("com.app.BarEvent"))
            .with_annotation("Subscribe");
        let provider = FixtureProvider {
            classes: vec![subscribe.clone()],
            usages: vec![
                Usage::Declaration(on_foo.clone()),
                Usage::Declaration(on_bar),
            ],
            ..Default::default()
        };
        let (config, posters) = (config(100), posters(&[]));
        let engine = MatchEngine::new(&provider, &config, &posters);

        let result = engine.find_matches(&MatchQuery::Receivers(foo()), &SearchScope::Project);
        assert_eq!(result.usages, vec![Usage::Declaration(on_foo)]);
        assert_eq!(
            provider.seen_seeds.borrow().as_slice(),
            &[SearchSeed::Type(subscribe)]
        );
    }

    #[test]
    fn missing_subscription_type_means_empty_result() {
        let provider = FixtureProvider::default();
        let (config, posters) = (config(100), posters(&[]));
        let engine = MatchEngine::new(&provider, &config, &posters);
        assert!(engine.find_receivers(&foo(), &SearchScope::Project).is_empty());
    }

    #[test]
    fn find_references_is_unfiltered() {
        let provider = FixtureProvider {
            usages: vec![
                post_call("com.app.FooEvent", 100),
                post_call("com.app.BarEvent", 200),
            ],
            ..Default::default()
        };
        let (config, posters) = (config(100), posters(&[]));
        let engine = MatchEngine::new(&provider, &config, &posters);
        let query = MatchQuery::References(post());
        assert_eq!(query.direction(), Direction::FindReferences);
        assert_eq!(engine.find_matches(&query, &SearchScope::Project).len(), 2);
    }

    #[test]
    fn scope_restricts_results() {
        let provider = FixtureProvider {
            classes: vec![bus_class()],
            methods: vec![post()],
            usages: vec![post_call("com.app.FooEvent", 100)],
            ..Default::default()
        };
        let (config, posters) = (config(100), posters(&["com.app.Bus.post"]));
        let engine = MatchEngine::new(&provider, &config, &posters);
        let scope = SearchScope::files(&["test/**"]).unwrap();
        assert!(engine.find_posters(&foo(), &scope).is_empty());
    }

    #[test]
    fn capped_marks_truncation_only_when_dropping() {
        let exact = SearchResult::capped(vec![post_call("A", 0), post_call("B", 100)], 2);
        assert!(!exact.truncated);
        let over = SearchResult::capped(vec![post_call("A", 0), post_call("B", 100)], 1);
        assert!(over.truncated);
        assert_eq!(over.len(), 1);
    }
}
