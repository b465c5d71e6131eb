//! Configuration resolution for triage-server
//!
//! Priority for every setting: command line > environment (`TRIAGE_*`) >
//! TOML file > compiled default. The command line tier arrives through
//! clap, which also reads the environment for the flags it declares.

use std::path::PathBuf;
use tracing::info;
use triage_common::config::{CollaboratorConfig, RootFolderResolver, SyncConfig, TomlConfig};
use triage_common::Result;

/// Values given on the command line; `None` defers to lower tiers
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub device_id: Option<String>,
    pub remote_url: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    /// Configured device id; generated and persisted on first run when absent
    pub device_id: Option<String>,
    pub log_level: String,
    pub sync: SyncConfig,
    pub collaborators: CollaboratorConfig,
}

impl ServiceConfig {
    /// Merge tiers and validate
    pub fn resolve(mut toml: TomlConfig, cli: CliOverrides) -> Result<Self> {
        toml.apply_env_overrides()?;

        if let Some(host) = cli.host {
            toml.server.host = host;
        }
        if let Some(port) = cli.port {
            toml.server.port = port;
        }
        if let Some(device_id) = cli.device_id {
            toml.device_id = Some(device_id);
        }
        if let Some(url) = cli.remote_url {
            toml.sync.remote_url = Some(url);
        }
        if let Some(level) = cli.log_level {
            toml.logging.level = level;
        }
        toml.validate()?;

        let root_folder = RootFolderResolver::new(cli.root_folder, toml.root_folder.clone()).resolve();

        let config = Self {
            root_folder,
            host: toml.server.host,
            port: toml.server.port,
            device_id: toml.device_id.filter(|id| !id.trim().is_empty()),
            log_level: toml.logging.level,
            sync: toml.sync,
            collaborators: toml.collaborators,
        };

        info!(
            root_folder = %config.root_folder.display(),
            port = config.port,
            remote = config.sync.remote_url.as_deref().unwrap_or("none"),
            "Configuration resolved"
        );
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
