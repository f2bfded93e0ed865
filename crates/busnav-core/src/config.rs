//! Configuration: bus conventions, limits and their resolution.
//!
//! Every setting is resolved from several sources and remembers where its
//! value came from. Precedence (highest to lowest):
//! 1. Explicit overrides from the host
//! 2. Environment variables (`BUSNAV_*`)
//! 3. Project config (`<root>/.busnav/config.json`)
//! 4. Built-in defaults

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

// ============================================================================
// Constants
// ============================================================================

/// Default event bus type.
pub const DEFAULT_BUS_TYPE: &str = "org.greenrobot.eventbus.EventBus";

/// Default post method names on a bus type.
pub const DEFAULT_POST_METHODS: [&str; 2] = ["post", "postAsync"];

/// Default subscription-point type (the subscriber annotation).
pub const DEFAULT_SUBSCRIBER_ANNOTATION: &str = "org.greenrobot.eventbus.Subscribe";

/// Default cap on search results.
pub const MAX_USAGES: usize = 100;

/// Default configuration directory, relative to the project root.
pub const DEFAULT_CONFIG_DIR: &str = ".busnav";

/// Project config file name inside the configuration directory.
pub const PROJECT_CONFIG_FILE: &str = "config.json";

/// Environment variable for bus types (comma separated).
pub const ENV_BUS_TYPE: &str = "BUSNAV_BUS_TYPE";

/// Environment variable for the subscriber annotation.
pub const ENV_SUBSCRIBER: &str = "BUSNAV_SUBSCRIBER";

/// Environment variable for the result cap.
pub const ENV_MAX_USAGES: &str = "BUSNAV_MAX_USAGES";

// ============================================================================
// Error Types
// ============================================================================

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The project config file is not valid.
    #[error("project config is corrupt at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The project config file could not be read.
    #[error("failed to read project config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

// ============================================================================
// Effective Configuration
// ============================================================================

/// Effective configuration used by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Fully-qualified names of event bus types.
    pub bus_types: Vec<String>,
    /// Method names on a bus type that publish events.
    pub post_methods: Vec<String>,
    /// Annotation marking receiver methods; also the seed type for receiver searches.
    pub subscriber_annotation: String,
    /// Maximum number of usages returned by one search.
    pub max_usages: usize,
    /// Configuration directory, relative to the project root.
    pub config_dir: PathBuf,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            bus_types: vec![DEFAULT_BUS_TYPE.to_string()],
            post_methods: DEFAULT_POST_METHODS.iter().map(|m| m.to_string()).collect(),
            subscriber_annotation: DEFAULT_SUBSCRIBER_ANNOTATION.to_string(),
            max_usages: MAX_USAGES,
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
        }
    }
}

impl BusConfig {
    /// Built-in allow-list entries: every post method on every bus type.
    pub fn default_posters(&self) -> Vec<String> {
        self.bus_types
            .iter()
            .flat_map(|bus| {
                self.post_methods
                    .iter()
                    .map(move |method| format!("{}.{}", bus, method))
            })
            .collect()
    }

    /// Whether `owner` is a configured bus type.
    pub fn is_bus_type(&self, owner: &str) -> bool {
        self.bus_types.iter().any(|bus| bus == owner)
    }

    /// Whether `name` is a configured post method name.
    pub fn is_post_method(&self, name: &str) -> bool {
        self.post_methods.iter().any(|method| method == name)
    }
}

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From `<config_dir>/config.json`.
    ProjectConfig = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From explicit host overrides (highest precedence).
    Override = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    /// Create a new config value with the given source.
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

/// Explicit overrides supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bus_types: Option<Vec<String>>,
    pub post_methods: Option<Vec<String>>,
    pub subscriber_annotation: Option<String>,
    pub max_usages: Option<usize>,
    pub config_dir: Option<PathBuf>,
}

/// On-disk project config. All fields optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectConfigFile {
    bus_types: Option<Vec<String>>,
    post_methods: Option<Vec<String>>,
    subscriber_annotation: Option<String>,
    max_usages: Option<usize>,
}

// ============================================================================
// Configuration Resolution
// ============================================================================

/// Resolved configuration with precedence information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub bus_types: ConfigValue<Vec<String>>,
    pub post_methods: ConfigValue<Vec<String>>,
    pub subscriber_annotation: ConfigValue<String>,
    pub max_usages: ConfigValue<usize>,
    pub config_dir: ConfigValue<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let defaults = BusConfig::default();
        ResolvedConfig {
            bus_types: ConfigValue::new(defaults.bus_types, ConfigSource::Default),
            post_methods: ConfigValue::new(defaults.post_methods, ConfigSource::Default),
            subscriber_annotation: ConfigValue::new(
                defaults.subscriber_annotation,
                ConfigSource::Default,
            ),
            max_usages: ConfigValue::new(defaults.max_usages, ConfigSource::Default),
            config_dir: ConfigValue::new(defaults.config_dir, ConfigSource::Default),
        }
    }
}

impl ResolvedConfig {
    /// Resolve configuration from all sources, reading the process environment.
    pub fn resolve(project_root: &Path, overrides: &ConfigOverrides) -> ConfigResult<Self> {
        Self::resolve_with_env(project_root, overrides, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn resolve_with_env<F>(
        project_root: &Path,
        overrides: &ConfigOverrides,
        env: F,
    ) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ResolvedConfig::default();

        // The config directory locates the project config, so only an
        // override can move it.
        if let Some(ref dir) = overrides.config_dir {
            config.config_dir = ConfigValue::new(dir.clone(), ConfigSource::Override);
        }

        let project_config = project_root
            .join(&config.config_dir.value)
            .join(PROJECT_CONFIG_FILE);
        if project_config.exists() {
            config.apply_project_config(&project_config)?;
        }

        config.apply_env_vars(env);
        config.apply_overrides(overrides);

        Ok(config)
    }

    /// The effective values.
    pub fn to_bus_config(&self) -> BusConfig {
        BusConfig {
            bus_types: self.bus_types.value.clone(),
            post_methods: self.post_methods.value.clone(),
            subscriber_annotation: self.subscriber_annotation.value.clone(),
            max_usages: self.max_usages.value,
            config_dir: self.config_dir.value.clone(),
        }
    }

    fn apply_project_config(&mut self, path: &Path) -> ConfigResult<()> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ProjectConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let source = ConfigSource::ProjectConfig;
        if let Some(bus_types) = file.bus_types {
            self.bus_types = self.bus_types.clone().merge(ConfigValue::new(bus_types, source));
        }
        if let Some(post_methods) = file.post_methods {
            self.post_methods = self
                .post_methods
                .clone()
                .merge(ConfigValue::new(post_methods, source));
        }
        if let Some(annotation) = file.subscriber_annotation {
            self.subscriber_annotation = self
                .subscriber_annotation
                .clone()
                .merge(ConfigValue::new(annotation, source));
        }
        if let Some(max) = file.max_usages {
            self.max_usages = self.max_usages.clone().merge(ConfigValue::new(max, source));
        }
        Ok(())
    }

    fn apply_env_vars<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = env(ENV_BUS_TYPE) {
            let bus_types = split_list(&value);
            if bus_types.is_empty() {
                warn!(var = ENV_BUS_TYPE, "ignoring empty environment value");
            } else {
                self.bus_types = ConfigValue::new(bus_types, ConfigSource::EnvVar);
            }
        }

        if let Some(value) = env(ENV_SUBSCRIBER) {
            let value = value.trim();
            if value.is_empty() {
                warn!(var = ENV_SUBSCRIBER, "ignoring empty environment value");
            } else {
                self.subscriber_annotation =
                    ConfigValue::new(value.to_string(), ConfigSource::EnvVar);
            }
        }

        if let Some(value) = env(ENV_MAX_USAGES) {
            match value.trim().parse::<usize>() {
                Ok(max) => self.max_usages = ConfigValue::new(max, ConfigSource::EnvVar),
                Err(e) => warn!(var = ENV_MAX_USAGES, value = %value, error = %e, "ignoring invalid environment value"),
            }
        }
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref bus_types) = overrides.bus_types {
            self.bus_types = ConfigValue::new(bus_types.clone(), ConfigSource::Override);
        }
        if let Some(ref post_methods) = overrides.post_methods {
            self.post_methods = ConfigValue::new(post_methods.clone(), ConfigSource::Override);
        }
        if let Some(ref annotation) = overrides.subscriber_annotation {
            self.subscriber_annotation =
                ConfigValue::new(annotation.clone(), ConfigSource::Override);
        }
        if let Some(max) = overrides.max_usages {
            self.max_usages = ConfigValue::new(max, ConfigSource::Override);
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
