//! Analysis sessions: per-project configuration and allow-list ownership.
//!
//! A session is opened for one project root and lives as long as the host
//! keeps it. It owns:
//! - The resolved configuration (with source tracking)
//! - The allow-list store at `<root>/<config_dir>/post-methods`
//!
//! There is no process-wide session. Hosts construct a [`SessionRegistry`]
//! and ask it for the session of a project; the registry creates each
//! session once per [`ProjectId`] and shares it behind an `Arc`.
//!
//! The allow-list store is the exception: every live session on the same
//! project holds the same store, so all of them see one cache and write
//! under one lock, however the sessions were opened.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, Weak};

use thiserror::Error;
use tracing::{debug, info};

use crate::allowlist::{AllowListStore, StoreResult, POSTER_FILE_NAME};
use crate::config::{BusConfig, ConfigError, ConfigOverrides, ResolvedConfig};
use crate::types::ProjectId;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur opening a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Project root does not exist.
    #[error("project not found at {path}")]
    ProjectNotFound { path: PathBuf },

    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error while resolving the project root.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

// ============================================================================
// Analysis Session
// ============================================================================

/// Per-project analysis state.
#[derive(Debug)]
pub struct AnalysisSession {
    project_id: ProjectId,
    project_root: PathBuf,
    config: BusConfig,
    resolved: ResolvedConfig,
    allow_list: Arc<AllowListStore>,
}

impl AnalysisSession {
    /// Open a session for `project_root`, resolving configuration from the
    /// project config, the environment and `overrides`.
    pub fn open(project_root: impl AsRef<Path>, overrides: &ConfigOverrides) -> SessionResult<Self> {
        let project_root = canonical_root(project_root.as_ref())?;
        let resolved = ResolvedConfig::resolve(&project_root, overrides)?;
        Ok(Self::build(project_root, resolved))
    }

    /// Open a session with an already-effective configuration.
    ///
    /// No configuration sources are consulted; every value is reported as
    /// an override.
    pub fn with_config(project_root: impl AsRef<Path>, config: BusConfig) -> SessionResult<Self> {
        let project_root = canonical_root(project_root.as_ref())?;
        let overrides = ConfigOverrides {
            bus_types: Some(config.bus_types),
            post_methods: Some(config.post_methods),
            subscriber_annotation: Some(config.subscriber_annotation),
            max_usages: Some(config.max_usages),
            config_dir: Some(config.config_dir),
        };
        let resolved = ResolvedConfig::resolve_with_env(&project_root, &overrides, |_| None)?;
        Ok(Self::build(project_root, resolved))
    }

    fn build(project_root: PathBuf, resolved: ResolvedConfig) -> Self {
        let config = resolved.to_bus_config();
        let project_id = ProjectId::from_root(&project_root);
        let store_path = project_root.join(&config.config_dir).join(POSTER_FILE_NAME);
        let allow_list = shared_allow_list(store_path, config.default_posters());
        debug!(
            project = %project_id,
            root = %project_root.display(),
            "opened analysis session"
        );
        AnalysisSession {
            project_id,
            project_root,
            config,
            resolved,
            allow_list,
        }
    }

    /// Identity of the project.
    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// Canonical project root.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Effective configuration.
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Configuration with the source of every value.
    pub fn resolved_config(&self) -> &ResolvedConfig {
        &self.resolved
    }

    /// The poster allow-list.
    pub fn allow_list(&self) -> &AllowListStore {
        &self.allow_list
    }

    /// Add a fully-qualified method name to the allow-list.
    pub fn add_poster(&self, name: &str) -> StoreResult<bool> {
        self.allow_list.add(name)
    }
}

/// Stores of live sessions, keyed by allow-list path.
static ALLOW_LISTS: LazyLock<Mutex<HashMap<PathBuf, Weak<AllowListStore>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// The store for `path`, shared with any live session already using it.
///
/// Defaults are taken from the session that first opened the store.
fn shared_allow_list(path: PathBuf, defaults: Vec<String>) -> Arc<AllowListStore> {
    let mut stores = ALLOW_LISTS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(store) = stores.get(&path).and_then(Weak::upgrade) {
        debug!(path = %path.display(), "sharing allow-list store");
        return store;
    }
    stores.retain(|_, store| store.strong_count() > 0);
    let store = Arc::new(AllowListStore::new(path.clone(), defaults));
    stores.insert(path, Arc::downgrade(&store));
    store
}

fn canonical_root(root: &Path) -> SessionResult<PathBuf> {
    if !root.exists() {
        return Err(SessionError::ProjectNotFound {
            path: root.to_path_buf(),
        });
    }
    Ok(root.canonicalize()?)
}

// ============================================================================
// Session Registry
// ============================================================================

/// Hands out one shared session per project.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ProjectId, Arc<AnalysisSession>>>,
    overrides: ConfigOverrides,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    /// Create a registry that opens every session with `overrides`.
    pub fn with_overrides(overrides: ConfigOverrides) -> Self {
        SessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            overrides,
        }
    }

    /// The session for `project_root`, opening it on first request.
    ///
    /// Creation happens under the registry lock, so concurrent first
    /// requests for the same project share one session.
    pub fn session_for(
        &self,
        project_root: impl AsRef<Path>,
    ) -> SessionResult<Arc<AnalysisSession>> {
        let root = canonical_root(project_root.as_ref())?;
        let id = ProjectId::from_root(&root);

        let mut sessions = self.lock();
        if let Some(session) = sessions.get(&id) {
            return Ok(Arc::clone(session));
        }
        let session = Arc::new(AnalysisSession::open(&root, &self.overrides)?);
        sessions.insert(id.clone(), Arc::clone(&session));
        info!(project = %id, root = %root.display(), "registered analysis session");
        Ok(session)
    }

    /// The session for `id`, if one is open.
    pub fn get(&self, id: &ProjectId) -> Option<Arc<AnalysisSession>> {
        self.lock().get(id).cloned()
    }

    /// Drop the registry's handle on a session. Returns whether it was open.
    pub fn close(&self, id: &ProjectId) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            debug!(project = %id, "closed analysis session");
        }
        removed
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no session is open.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ProjectId, Arc<AnalysisSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, DEFAULT_CONFIG_DIR};
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    mod session_tests {
        use super::*;

        #[test]
        fn open_missing_root_fails() {
            let dir = TempDir::new().unwrap();
            let missing = dir.path().join("gone");
            let err = AnalysisSession::open(&missing, &ConfigOverrides::default()).unwrap_err();
            assert!(matches!(err, SessionError::ProjectNotFound { .. }));
        }

        #[test]
        fn allow_list_lives_in_config_dir() {
            let dir = TempDir::new().unwrap();
            let session = AnalysisSession::with_config(dir.path(), BusConfig::default()).unwrap();
            let expected = session
                .project_root()
                .join(DEFAULT_CONFIG_DIR)
                .join(POSTER_FILE_NAME);
            assert_eq!(session.allow_list().path(), expected);
            assert!(!session.allow_list().is_loaded());
        }

        #[test]
        fn defaults_come_from_config() {
            let dir = TempDir::new().unwrap();
            let config = BusConfig {
                bus_types: vec!["com.app.Bus".to_string()],
                post_methods: vec!["emit".to_string()],
                ..BusConfig::default()
            };
            let session = AnalysisSession::with_config(dir.path(), config).unwrap();
            let entries = session.allow_list().load().unwrap();
            assert_eq!(
                entries.into_iter().collect::<Vec<_>>(),
                vec!["com.app.Bus.emit".to_string()]
            );
        }

        #[test]
        fn with_config_reports_overrides() {
            let dir = TempDir::new().unwrap();
            let session = AnalysisSession::with_config(dir.path(), BusConfig::default()).unwrap();
            assert_eq!(
                session.resolved_config().max_usages.source,
                ConfigSource::Override
            );
        }

        #[test]
        fn add_poster_persists() {
            let dir = TempDir::new().unwrap();
            let session = AnalysisSession::with_config(dir.path(), BusConfig::default()).unwrap();
            assert!(session.add_poster("com.app.Hub.emit").unwrap());
            let content = fs::read_to_string(session.allow_list().path()).unwrap();
            assert!(content.lines().any(|line| line == "com.app.Hub.emit"));
        }

        #[test]
        fn sessions_on_one_project_share_the_allow_list() {
            let dir = TempDir::new().unwrap();
            let a = AnalysisSession::with_config(dir.path(), BusConfig::default()).unwrap();
            let b = AnalysisSession::with_config(dir.path(), BusConfig::default()).unwrap();
            a.allow_list().load().unwrap();
            b.allow_list().load().unwrap();

            assert!(a.add_poster("com.app.A.post").unwrap());
            assert!(b.add_poster("com.app.B.post").unwrap());

            let content = fs::read_to_string(a.allow_list().path()).unwrap();
            assert!(content.lines().any(|line| line == "com.app.A.post"));
            assert!(content.lines().any(|line| line == "com.app.B.post"));
            assert!(a.allow_list().contains("com.app.B.post").unwrap());
            assert!(!b.add_poster("com.app.A.post").unwrap());
        }

        #[test]
        fn store_is_released_with_its_last_session() {
            let dir = TempDir::new().unwrap();
            let session = AnalysisSession::with_config(dir.path(), BusConfig::default()).unwrap();
            session.add_poster("com.app.A.post").unwrap();
            let path = session.allow_list().path().to_path_buf();
            drop(session);

            fs::write(&path, "com.app.Edited.post").unwrap();
            let reopened = AnalysisSession::with_config(dir.path(), BusConfig::default()).unwrap();
            let entries = reopened.allow_list().load().unwrap();
            assert!(entries.contains("com.app.Edited.post"));
            assert!(!entries.contains("com.app.A.post"));
        }

        #[test]
        fn project_id_is_stable_for_root() {
            let dir = TempDir::new().unwrap();
            let a = AnalysisSession::with_config(dir.path(), BusConfig::default()).unwrap();
            let b = AnalysisSession::with_config(dir.path(), BusConfig::default()).unwrap();
            assert_eq!(a.project_id(), b.project_id());
        }
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn session_is_shared_per_project() {
            let dir = TempDir::new().unwrap();
            let registry = SessionRegistry::new();
            let a = registry.session_for(dir.path()).unwrap();
            let b = registry.session_for(dir.path()).unwrap();
            assert!(Arc::ptr_eq(&a, &b));
            assert_eq!(registry.len(), 1);
        }

        #[test]
        fn distinct_projects_get_distinct_sessions() {
            let one = TempDir::new().unwrap();
            let two = TempDir::new().unwrap();
            let registry = SessionRegistry::new();
            let a = registry.session_for(one.path()).unwrap();
            let b = registry.session_for(two.path()).unwrap();
            assert_ne!(a.project_id(), b.project_id());
            assert_eq!(registry.len(), 2);
        }

        #[test]
        fn close_forgets_session() {
            let dir = TempDir::new().unwrap();
            let registry = SessionRegistry::new();
            let session = registry.session_for(dir.path()).unwrap();
            let id = session.project_id().clone();
            assert!(registry.get(&id).is_some());
            assert!(registry.close(&id));
            assert!(!registry.close(&id));
            assert!(registry.is_empty());
        }

        #[test]
        fn reopened_session_shares_store_with_old_handle() {
            let dir = TempDir::new().unwrap();
            let registry = SessionRegistry::new();
            let old = registry.session_for(dir.path()).unwrap();
            old.allow_list().load().unwrap();
            registry.close(old.project_id());

            let new = registry.session_for(dir.path()).unwrap();
            assert!(!Arc::ptr_eq(&old, &new));
            old.add_poster("com.app.Old.post").unwrap();
            new.add_poster("com.app.New.post").unwrap();

            let entries = old.allow_list().reload().unwrap();
            assert!(entries.contains("com.app.Old.post"));
            assert!(entries.contains("com.app.New.post"));
        }

        #[test]
        fn overrides_apply_to_new_sessions() {
            let dir = TempDir::new().unwrap();
            let registry = SessionRegistry::with_overrides(ConfigOverrides {
                max_usages: Some(5),
                ..Default::default()
            });
            let session = registry.session_for(dir.path()).unwrap();
            assert_eq!(session.config().max_usages, 5);
        }

        #[test]
        fn concurrent_first_use_creates_one_session() {
            let dir = TempDir::new().unwrap();
            let registry = Arc::new(SessionRegistry::new());
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = Arc::clone(&registry);
                    let root = dir.path().to_path_buf();
                    thread::spawn(move || registry.session_for(&root).unwrap())
                })
                .collect();
            let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
            assert_eq!(registry.len(), 1);
        }
    }
}
