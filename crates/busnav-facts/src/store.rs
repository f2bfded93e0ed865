//! Facts tables, indexes and the provider implementation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

use busnav_core::adapter::{
    simple_name, CallExpression, ClassHandle, Expression, MethodHandle, RawCall, SearchSeed,
    SyntaxTreeProvider, TypeNode, Usage,
};
use busnav_core::filter::UsageFilter;
use busnav_core::scope::SearchScope;
use busnav_core::types::Span;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a file within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a new file ID.
    pub fn new(id: u32) -> Self {
        FileId(id)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file_{}", self.0)
    }
}

/// Unique identifier for a class within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    /// Create a new class ID.
    pub fn new(id: u32) -> Self {
        ClassId(id)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class_{}", self.0)
    }
}

/// Unique identifier for a method within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct MethodId(pub u32);

impl MethodId {
    /// Create a new method ID.
    pub fn new(id: u32) -> Self {
        MethodId(id)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "meth_{}", self.0)
    }
}

/// Unique identifier for a call site within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct CallId(pub u32);

impl CallId {
    /// Create a new call ID.
    pub fn new(id: u32) -> Self {
        CallId(id)
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call_{}", self.0)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub file_id: FileId,
    /// Workspace-relative path.
    pub path: String,
}

/// A class declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFact {
    pub class_id: ClassId,
    pub file_id: FileId,
    pub handle: ClassHandle,
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodFact {
    pub method_id: MethodId,
    pub file_id: FileId,
    pub handle: MethodHandle,
}

/// A normalized call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFact {
    pub call_id: CallId,
    pub file_id: FileId,
    pub call: CallExpression,
}

/// Traversal key: file order, then source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Entry {
    Method(MethodId),
    Call(CallId),
}

type TraversalKey = (FileId, Span, Entry);

// ============================================================================
// FactsStore
// ============================================================================

/// In-memory, index-backed syntax tree provider.
#[derive(Debug, Default)]
pub struct FactsStore {
    // Primary storage (BTreeMap for deterministic iteration)
    files: BTreeMap<FileId, File>,
    classes: BTreeMap<ClassId, ClassFact>,
    methods: BTreeMap<MethodId, MethodFact>,
    calls: BTreeMap<CallId, CallFact>,

    // Expression types ((file, span) → type)
    expression_types: HashMap<(FileId, Span), TypeNode>,

    // Secondary indexes
    /// path → FileId.
    file_by_path: HashMap<String, FileId>,
    /// qualified name → ClassId (last declaration wins).
    class_by_name: HashMap<String, ClassId>,

    // Postings lists
    /// owner class FQN → method_ids[] (declaration order).
    methods_by_owner: HashMap<String, Vec<MethodId>>,
    /// annotation simple name → method_ids[].
    methods_by_annotation: HashMap<String, Vec<MethodId>>,
    /// callee method FQN → call_ids[].
    calls_by_callee: HashMap<String, Vec<CallId>>,
    /// callee owner class FQN → call_ids[].
    calls_by_owner: HashMap<String, Vec<CallId>>,
    /// file_id → call_ids[].
    calls_by_file: HashMap<FileId, Vec<CallId>>,

    // ID generators
    next_file_id: u32,
    next_class_id: u32,
    next_method_id: u32,
    next_call_id: u32,
}

impl FactsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        FactsStore::default()
    }

    // ------------------------------------------------------------------------
    // ID generation
    // ------------------------------------------------------------------------

    fn next_file_id(&mut self) -> FileId {
        let id = FileId::new(self.next_file_id);
        self.next_file_id += 1;
        id
    }

    fn next_class_id(&mut self) -> ClassId {
        let id = ClassId::new(self.next_class_id);
        self.next_class_id += 1;
        id
    }

    fn next_method_id(&mut self) -> MethodId {
        let id = MethodId::new(self.next_method_id);
        self.next_method_id += 1;
        id
    }

    fn next_call_id(&mut self) -> CallId {
        let id = CallId::new(self.next_call_id);
        self.next_call_id += 1;
        id
    }

    // ------------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------------

    /// Register a file path, returning its id. Idempotent.
    pub fn add_file(&mut self, path: &str) -> FileId {
        if let Some(&id) = self.file_by_path.get(path) {
            return id;
        }
        let file_id = self.next_file_id();
        self.file_by_path.insert(path.to_string(), file_id);
        self.files.insert(
            file_id,
            File {
                file_id,
                path: path.to_string(),
            },
        );
        file_id
    }

    /// Insert a class declaration.
    pub fn add_class(&mut self, handle: ClassHandle) -> ClassId {
        let file_id = self.add_file(&handle.file);
        let class_id = self.next_class_id();
        if let Some(previous) = self
            .class_by_name
            .insert(handle.qualified_name.clone(), class_id)
        {
            debug!(class = %handle.qualified_name, %previous, "class redeclared");
        }
        self.classes.insert(
            class_id,
            ClassFact {
                class_id,
                file_id,
                handle,
            },
        );
        class_id
    }

    /// Insert a method declaration.
    pub fn add_method(&mut self, handle: MethodHandle) -> MethodId {
        let file_id = self.add_file(&handle.file);
        let method_id = self.next_method_id();

        self.methods_by_owner
            .entry(handle.owner.clone())
            .or_default()
            .push(method_id);

        for annotation in &handle.annotations {
            self.methods_by_annotation
                .entry(simple_name(annotation).to_string())
                .or_default()
                .push(method_id);
        }

        self.methods.insert(
            method_id,
            MethodFact {
                method_id,
                file_id,
                handle,
            },
        );
        method_id
    }

    /// Insert an already-normalized call site.
    pub fn add_call(&mut self, call: CallExpression) -> CallId {
        let file_id = self.add_file(&call.file);
        let call_id = self.next_call_id();

        if let Some(target) = &call.target {
            self.calls_by_callee
                .entry(target.fully_qualified_name())
                .or_default()
                .push(call_id);
            self.calls_by_owner
                .entry(target.owner.clone())
                .or_default()
                .push(call_id);
        }
        self.calls_by_file.entry(file_id).or_default().push(call_id);

        self.calls.insert(
            call_id,
            CallFact {
                call_id,
                file_id,
                call,
            },
        );
        call_id
    }

    /// Normalize a call in either surface syntax and insert it.
    pub fn register_call(&mut self, raw: RawCall) -> CallId {
        self.add_call(raw.normalize())
    }

    /// Record the static type of the expression at `span` in `file`.
    pub fn set_expression_type(&mut self, file: &str, span: Span, ty: TypeNode) {
        let file_id = self.add_file(file);
        self.expression_types.insert((file_id, span), ty);
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// Get a file by ID.
    pub fn file(&self, id: FileId) -> Option<&File> {
        self.files.get(&id)
    }

    /// Get a file ID by path.
    pub fn file_by_path(&self, path: &str) -> Option<FileId> {
        self.file_by_path.get(path).copied()
    }

    /// Get a class by ID.
    pub fn class(&self, id: ClassId) -> Option<&ClassFact> {
        self.classes.get(&id)
    }

    /// Get a method by ID.
    pub fn method(&self, id: MethodId) -> Option<&MethodFact> {
        self.methods.get(&id)
    }

    /// Get a call site by ID.
    pub fn call(&self, id: CallId) -> Option<&CallFact> {
        self.calls.get(&id)
    }

    /// All files in id order.
    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.files.values()
    }

    /// Call sites in a file, in insertion order.
    pub fn calls_in_file(&self, path: &str) -> Vec<&CallFact> {
        self.file_by_path(path)
            .and_then(|id| self.calls_by_file.get(&id))
            .map(|ids| ids.iter().filter_map(|id| self.calls.get(id)).collect())
            .unwrap_or_default()
    }

    /// Number of files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of classes.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Number of methods.
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Number of call sites.
    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    // ------------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------------

    fn method_key(&self, id: MethodId) -> Option<TraversalKey> {
        self.methods
            .get(&id)
            .map(|m| (m.file_id, m.handle.span, Entry::Method(id)))
    }

    fn call_key(&self, id: CallId) -> Option<TraversalKey> {
        self.calls
            .get(&id)
            .map(|c| (c.file_id, c.call.span, Entry::Call(id)))
    }

    fn collect_candidates(&self, seeds: &[SearchSeed]) -> BTreeSet<TraversalKey> {
        let mut candidates = BTreeSet::new();
        for seed in seeds {
            match seed {
                SearchSeed::Method(method) => {
                    let callers = self.calls_by_callee.get(&method.fully_qualified_name());
                    candidates.extend(
                        callers
                            .into_iter()
                            .flatten()
                            .filter_map(|&id| self.call_key(id)),
                    );
                }
                SearchSeed::Type(class) => {
                    let annotated = self
                        .methods_by_annotation
                        .get(simple_name(&class.qualified_name))
                        .into_iter()
                        .flatten()
                        .filter(|id| {
                            self.methods
                                .get(*id)
                                .is_some_and(|m| m.handle.has_annotation(&class.qualified_name))
                        });
                    candidates.extend(annotated.filter_map(|&id| self.method_key(id)));

                    let calls_on_type = self.calls_by_owner.get(&class.qualified_name);
                    candidates.extend(
                        calls_on_type
                            .into_iter()
                            .flatten()
                            .filter_map(|&id| self.call_key(id)),
                    );
                }
            }
        }
        candidates
    }

    fn usage(&self, entry: Entry) -> Option<Usage> {
        match entry {
            Entry::Method(id) => self
                .methods
                .get(&id)
                .map(|m| Usage::Declaration(m.handle.clone())),
            Entry::Call(id) => self.calls.get(&id).map(|c| Usage::Call(c.call.clone())),
        }
    }
}

// ============================================================================
// Provider
// ============================================================================

impl SyntaxTreeProvider for FactsStore {
    fn find_class(&self, qualified_name: &str) -> Option<ClassHandle> {
        self.class_by_name
            .get(qualified_name)
            .and_then(|id| self.classes.get(id))
            .map(|c| c.handle.clone())
    }

    fn find_methods_by_name(&self, class: &ClassHandle, name: &str) -> Vec<MethodHandle> {
        self.methods_by_owner
            .get(&class.qualified_name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.methods.get(id))
            .filter(|m| m.handle.name == name)
            .map(|m| m.handle.clone())
            .collect()
    }

    fn resolve_expression_type(&self, file: &str, expr: &Expression) -> Option<TypeNode> {
        let file_id = self.file_by_path(file)?;
        self.expression_types.get(&(file_id, expr.span)).cloned()
    }

    fn search_usages(
        &self,
        seeds: &[SearchSeed],
        scope: &SearchScope,
        filter: &dyn UsageFilter,
        limit: usize,
    ) -> Vec<Usage> {
        let candidates = self.collect_candidates(seeds);
        let mut hits = Vec::new();
        for (file_id, _, entry) in &candidates {
            if hits.len() >= limit {
                break;
            }
            let in_scope = self
                .files
                .get(file_id)
                .is_some_and(|file| scope.contains(&file.path));
            if !in_scope {
                continue;
            }
            if let Some(usage) = self.usage(*entry) {
                if filter.accepts(self, &usage) {
                    hits.push(usage);
                }
            }
        }
        debug!(
            seeds = seeds.len(),
            candidates = candidates.len(),
            hits = hits.len(),
            "facts usage search"
        );
        hits
    }
}

// ============================================================================
// Tests
// ============================================================================
