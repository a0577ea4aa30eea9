//! Configuration file support for quarry.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `QUARRY_`, sections separated by
//!    `__`, e.g. `QUARRY_BITBUCKET__APP_PASSWORD`)
//! 3. Config file (./quarry.toml, then ~/.config/quarry/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [connection]
//! id = 1
//! name = "Bitbucket Cloud"
//!
//! [bitbucket]
//! username = "alice"
//! app_password = "..."  # or use QUARRY_BITBUCKET__APP_PASSWORD
//! git_url_type = "http"  # or "ssh"
//! teams = ["acme"]
//! requests_per_second = 2
//!
//! [[bitbucket.exclude]]
//! pattern = "^acme/tmp-"
//!
//! [[bitbucket.exclude]]
//! name = "acme/legacy"
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use quarry::{ConnectionConfig, ExternalService, KIND_BITBUCKET_CLOUD};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity of the configured connection.
    pub connection: ConnectionIdentity,
    /// Bitbucket Cloud connection settings.
    pub bitbucket: ConnectionConfig,
}

/// How the connection identifies itself in listed records.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConnectionIdentity {
    /// Numeric id, part of every record's source URN.
    pub id: i64,
    /// Display name.
    pub name: String,
}

impl Default for ConnectionIdentity {
    fn default() -> Self {
        Self {
            id: 1,
            name: "Bitbucket Cloud".to_string(),
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/quarry/config.toml)
    /// 3. Local config file (./quarry.toml)
    /// 4. Environment variables with QUARRY_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let local_config = PathBuf::from("quarry.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./quarry.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g. QUARRY_BITBUCKET__TEAMS=acme,umbrella -> bitbucket.teams
        builder = builder.add_source(
            Environment::with_prefix("QUARRY")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("bitbucket.teams")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// The connection identity as the library expects it.
    pub fn external_service(&self) -> ExternalService {
        ExternalService::new(
            self.connection.id,
            KIND_BITBUCKET_CLOUD,
            self.connection.name.as_str(),
        )
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "quarry").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
