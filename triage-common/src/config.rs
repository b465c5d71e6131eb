//! Configuration loading and root folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority, applied by the binary)
//! 2. Environment variable (`TRIAGE_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: the service logs a
//! warning and starts on defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the SQLite file created inside the root folder
pub const DATABASE_FILE_NAME: &str = "triage.db";

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "TRIAGE_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the local database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Identifier stamped on every screening record created here
    #[serde(default)]
    pub device_id: Option<String>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub collaborators: CollaboratorConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Sync reconciler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between reconcile cycles
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,

    /// Base URL of the remote record store; `None` means offline-only
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Reachability URL; defaults to `{remote_url}/health`
    #[serde(default)]
    pub probe_url: Option<String>,

    /// Per-request timeout for probe and upsert calls
    #[serde(default = "default_sync_request_timeout")]
    pub request_timeout_secs: u64,

    /// First retry delay after a failed upsert
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,

    /// Upper bound on the retry delay
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: u64,

    /// How long a reconciler holds the store lease without renewing it
    #[serde(default = "default_lease")]
    pub lease_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval(),
            remote_url: None,
            probe_url: None,
            request_timeout_secs: default_sync_request_timeout(),
            backoff_base_secs: default_backoff_base(),
            backoff_max_secs: default_backoff_max(),
            lease_secs: default_lease(),
        }
    }
}

impl SyncConfig {
    /// Probe URL, derived from the remote URL when not set explicitly
    pub fn effective_probe_url(&self) -> Option<String> {
        self.probe_url.clone().or_else(|| {
            self.remote_url
                .as_ref()
                .map(|base| format!("{}/health", base.trim_end_matches('/')))
        })
    }
}

/// External collaborator endpoints and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// Imaging classifier base URL; `None` means symptom-only deployments
    #[serde(default)]
    pub imaging_url: Option<String>,

    /// Conversational model base URL; `None` disables free-text replies
    #[serde(default)]
    pub converse_url: Option<String>,

    #[serde(default = "default_converse_model")]
    pub converse_model: String,

    /// Bound on a single interview turn round trip
    #[serde(default = "default_turn_timeout")]
    pub turn_timeout_secs: u64,

    /// Bound on summary generation
    #[serde(default = "default_summary_timeout")]
    pub summary_timeout_secs: u64,

    /// Bound on an imaging classification
    #[serde(default = "default_imaging_timeout")]
    pub imaging_timeout_secs: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            imaging_url: None,
            converse_url: None,
            converse_model: default_converse_model(),
            turn_timeout_secs: default_turn_timeout(),
            summary_timeout_secs: default_summary_timeout(),
            imaging_timeout_secs: default_imaging_timeout(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sync_interval() -> u64 {
    300
}

fn default_sync_request_timeout() -> u64 {
    15
}

fn default_backoff_base() -> u64 {
    30
}

fn default_backoff_max() -> u64 {
    3600
}

fn default_lease() -> u64 {
    600
}

fn default_converse_model() -> String {
    "triage".to_string()
}

fn default_turn_timeout() -> u64 {
    45
}

fn default_summary_timeout() -> u64 {
    60
}

fn default_imaging_timeout() -> u64 {
    60
}

impl TomlConfig {
    /// Load from an explicit path, or the platform default location
    ///
    /// Missing files yield defaults with a warning; a file that exists but
    /// fails to parse is a configuration error.
    pub fn load(explicit: Option<&Path>, module_name: &str) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(module_name),
        };

        let Some(path) = path else {
            warn!("No configuration file location available, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `TRIAGE_*` environment overrides on top of file values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var(ROOT_FOLDER_ENV) {
            self.root_folder = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("TRIAGE_DEVICE_ID") {
            self.device_id = Some(v);
        }
        if let Ok(v) = std::env::var("TRIAGE_PORT") {
            self.server.port = v
                .parse()
                .map_err(|e| Error::Config(format!("Invalid TRIAGE_PORT '{}': {}", v, e)))?;
        }
        if let Ok(v) = std::env::var("TRIAGE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("TRIAGE_SYNC_REMOTE_URL") {
            self.sync.remote_url = Some(v);
        }
        if let Ok(v) = std::env::var("TRIAGE_SYNC_INTERVAL_SECS") {
            self.sync.interval_secs = v.parse().map_err(|e| {
                Error::Config(format!("Invalid TRIAGE_SYNC_INTERVAL_SECS '{}': {}", v, e))
            })?;
        }
        if let Ok(v) = std::env::var("TRIAGE_IMAGING_URL") {
            self.collaborators.imaging_url = Some(v);
        }
        if let Ok(v) = std::env::var("TRIAGE_CONVERSE_URL") {
            self.collaborators.converse_url = Some(v);
        }
        Ok(())
    }

    /// Reject values that would make the service misbehave silently
    pub fn validate(&self) -> Result<()> {
        if self.sync.interval_secs == 0 {
            return Err(Error::Config("sync.interval_secs must be positive".to_string()));
        }
        if self.sync.backoff_base_secs > self.sync.backoff_max_secs {
            return Err(Error::Config(format!(
                "sync.backoff_base_secs ({}) exceeds sync.backoff_max_secs ({})",
                self.sync.backoff_base_secs, self.sync.backoff_max_secs
            )));
        }
        if self.collaborators.turn_timeout_secs == 0 || self.collaborators.summary_timeout_secs == 0 {
            return Err(Error::Config("collaborator timeouts must be positive".to_string()));
        }
        Ok(())
    }
}

/// Platform config file path: `<config_dir>/triage/<module>.toml`,
/// falling back to `/etc/triage/<module>.toml` on Linux
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    let file_name = format!("{}.toml", module_name);
    let user_config = dirs::config_dir().map(|d| d.join("triage").join(&file_name));

    if cfg!(target_os = "linux") {
        if let Some(path) = &user_config {
            if path.exists() {
                return user_config;
            }
        }
        let system_config = PathBuf::from("/etc/triage").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }
    user_config
}

/// Resolves the root folder from CLI, environment, TOML, then compiled default
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_value: Option<PathBuf>) -> Self {
        Self { cli_arg, toml_value }
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        default_root_folder()
    }
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("triage"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/triage"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("triage"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/triage"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("triage"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\triage"))
    } else {
        PathBuf::from("./triage_data")
    }
}

/// Creates the root folder on first run and locates files inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.server.port, 5780);
        assert_eq!(config.sync.interval_secs, 300);
        assert_eq!(config.collaborators.turn_timeout_secs, 45);
        assert_eq!(config.collaborators.summary_timeout_secs, 60);
        assert!(config.sync.remote_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            device_id = "clinic-07"
            [sync]
            remote_url = "https://records.example.org/"
            "#,
        )
        .unwrap();

        assert_eq!(config.device_id.as_deref(), Some("clinic-07"));
        assert_eq!(config.sync.backoff_max_secs, 3600);
        assert_eq!(
            config.sync.effective_probe_url().as_deref(),
            Some("https://records.example.org/health")
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let mut config = TomlConfig::default();
        config.sync.backoff_base_secs = 7200;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_database_path_inside_root() {
        let init = RootFolderInitializer::new(PathBuf::from("/tmp/triage-root"));
        assert_eq!(init.database_path(), PathBuf::from("/tmp/triage-root/triage.db"));
    }
}
