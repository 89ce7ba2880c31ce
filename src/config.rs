//! Layered configuration for dailies.
//!
//! Later layers win: built-in defaults, then `~/.config/dailies/config.yaml`,
//! then every `.dailies-config/manifest.yaml` from the filesystem root down to
//! the working directory. `DAILIES_*` variables and CLI flags are consulted
//! where a value is used.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration for the dailies CLI.
#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Database location and locking
    pub storage: StorageConfig,
    /// Display settings
    pub display: DisplayConfig,
    /// Behavior settings
    pub behavior: BehaviorConfig,
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file (null = <data dir>/dailies/dailies.db)
    pub path: Option<String>,
    /// Milliseconds a save waits for another writer before failing
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
        }
    }
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DisplayConfig {
    /// Maximum rows in `todo list`
    pub list_limit: usize,
    /// Maximum rows in `dates`
    pub dates_limit: usize,
    /// Maximum rows in `topic list`
    pub topics_limit: usize,
    /// Maximum entries in `topic show`
    pub entries_limit: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            list_limit: 200,
            dates_limit: 120,
            topics_limit: 200,
            entries_limit: 500,
        }
    }
}

/// Behavior defaults.
#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Suppress hints
    pub quiet: bool,
}

// ============================================================================
// Config Source Tracking
// ============================================================================

/// Source of a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in default
    Default,
    /// User global config (~/.config/dailies/config.yaml)
    UserGlobal,
    /// Project manifest (.dailies-config/manifest.yaml)
    ProjectManifest(String),
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::UserGlobal => write!(f, "~/.config/dailies/config.yaml"),
            ConfigSource::ProjectManifest(path) => write!(f, "{}", path),
        }
    }
}

// ============================================================================
// Environment Variable Registry
// ============================================================================

/// Environment variable definition for documentation.
pub struct EnvVar {
    /// Variable name (e.g., "DAILIES_DB")
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Default value or behavior
    pub default: &'static str,
    /// Config path this maps to (e.g., "storage.path")
    pub config_path: &'static str,
    /// Valid values (if enumerable)
    pub values: Option<&'static str>,
}

pub const DB_ENV: &str = "DAILIES_DB";
pub const QUIET_ENV: &str = "DAILIES_QUIET";
pub const LOG_ENV: &str = "DAILIES_LOG";

/// Registry of all supported environment variables.
pub const ENV_VARS: &[EnvVar] = &[
    EnvVar {
        name: "NO_COLOR",
        description: "Disable colored output (standard)",
        default: "unset",
        config_path: "-",
        values: Some("any non-empty value"),
    },
    EnvVar {
        name: "DAILIES_FORMAT",
        description: "Default output format",
        default: "pretty (auto-detects TTY)",
        config_path: "-",
        values: Some("pretty, plain, json, yaml"),
    },
    EnvVar {
        name: DB_ENV,
        description: "Database file",
        default: "<data dir>/dailies/dailies.db",
        config_path: "storage.path",
        values: Some("path"),
    },
    EnvVar {
        name: QUIET_ENV,
        description: "Suppress hint messages",
        default: "false",
        config_path: "behavior.quiet",
        values: Some("1, true, yes"),
    },
    EnvVar {
        name: LOG_ENV,
        description: "Log filter (env_logger syntax)",
        default: "warn",
        config_path: "-",
        values: Some("error, warn, info, debug, trace"),
    },
];

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Parse a boolean environment variable.
///
/// Returns `Some(true)` for 1/true/yes, `Some(false)` for 0/false/no,
/// and `None` if unset, empty or unrecognized.
pub fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|v| {
        match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        }
    })
}

/// Returns `Some(value)` if set and non-empty, `None` otherwise.
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ============================================================================
// Config Loading
// ============================================================================

/// Manifest file name within .dailies-config/
pub const MANIFEST_FILE: &str = "manifest.yaml";

/// Config directory name
pub const CONFIG_DIR: &str = ".dailies-config";

/// Merged configuration plus the layers it was built from.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// Applied layers, lowest precedence first
    pub sources: Vec<ConfigSource>,
}

/// Load configuration from defaults, the user global file and project manifests.
///
/// Env vars and CLI flags are applied at point of use.
pub fn load_config(cwd: &Path) -> LoadedConfig {
    let mut config = Config::default();
    let mut sources = vec![ConfigSource::Default];

    if let Some(path) = user_config_path()
        && let Some(user_config) = load_manifest(&path)
    {
        merge(&mut config, &user_config);
        sources.push(ConfigSource::UserGlobal);
    }

    for path in collect_manifest_paths(cwd) {
        if let Some(manifest_config) = load_manifest(&path) {
            merge(&mut config, &manifest_config);
            sources.push(ConfigSource::ProjectManifest(
                path.to_string_lossy().to_string(),
            ));
        }
    }

    LoadedConfig { config, sources }
}

/// Get the user config file path (~/.config/dailies/config.yaml).
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("dailies").join("config.yaml"))
}

/// Parse one YAML layer. Missing files are silent, malformed ones are logged and skipped.
pub fn load_manifest(path: &Path) -> Option<Config> {
    let content = fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("ignoring {}: {}", path.display(), e);
            None
        }
    }
}

/// Manifests from the filesystem root down to `cwd`, so nearer ones override.
fn collect_manifest_paths(cwd: &Path) -> Vec<PathBuf> {
    let cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
    let mut paths: Vec<PathBuf> = cwd
        .ancestors()
        .map(|dir| dir.join(CONFIG_DIR).join(MANIFEST_FILE))
        .filter(|manifest| manifest.exists())
        .collect();
    paths.reverse();
    paths
}

/// Merge overlay config into base config.
///
/// Non-default values in overlay override values in base.
pub fn merge(base: &mut Config, overlay: &Config) {
    let default_storage = StorageConfig::default();
    if overlay.storage.path.is_some() {
        base.storage.path = overlay.storage.path.clone();
    }
    if overlay.storage.busy_timeout_ms != default_storage.busy_timeout_ms {
        base.storage.busy_timeout_ms = overlay.storage.busy_timeout_ms;
    }

    let default_display = DisplayConfig::default();
    if overlay.display.list_limit != default_display.list_limit {
        base.display.list_limit = overlay.display.list_limit;
    }
    if overlay.display.dates_limit != default_display.dates_limit {
        base.display.dates_limit = overlay.display.dates_limit;
    }
    if overlay.display.topics_limit != default_display.topics_limit {
        base.display.topics_limit = overlay.display.topics_limit;
    }
    if overlay.display.entries_limit != default_display.entries_limit {
        base.display.entries_limit = overlay.display.entries_limit;
    }

    if overlay.behavior.quiet {
        base.behavior.quiet = true;
    }
}

/// Generate JSON schema for the config.
pub fn json_schema() -> String {
    let schema = schemars::schema_for!(Config);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}

/// Resolve the database path: `DAILIES_DB`, then `storage.path`, then the data dir.
pub fn resolve_db_path(config: &Config) -> Result<PathBuf, String> {
    if let Some(path) = env_string(DB_ENV) {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = &config.storage.path {
        return Ok(expand_home(path));
    }
    dirs::data_dir()
        .map(|dir| dir.join("dailies").join("dailies.db"))
        .ok_or_else(|| format!("no data directory; set {} or storage.path", DB_ENV))
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

pub fn busy_timeout(config: &Config) -> Duration {
    Duration::from_millis(config.storage.busy_timeout_ms)
}

/// Check if quiet mode is enabled (suppress hints).
pub fn is_quiet(config: &Config) -> bool {
    config.behavior.quiet || env_bool(QUIET_ENV).unwrap_or(false)
}

/// Generate a template manifest with comments.
pub fn template_manifest() -> String {
    r#"# dailies configuration manifest
# Place in .dailies-config/manifest.yaml

# Database settings
# storage:
#   path: null              # null = <data dir>/dailies/dailies.db
#   busy_timeout_ms: 5000   # wait for a concurrent save before failing

# Display settings
# display:
#   list_limit: 200         # dailies todo list
#   dates_limit: 120        # dailies dates
#   topics_limit: 200       # dailies topic list
#   entries_limit: 500      # dailies topic show

# Behavior settings
# behavior:
#   quiet: false
"#
    .to_string()
}

// ============================================================================
// Tests
// ============================================================================
