use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::export::ExportFormat;
use crate::schema::{interactions, tickets};
use crate::session::Credentials;
use crate::store::UpsertPolicy;

/// Prefix for environment overrides, e.g. `CRM_LOGGER__STORAGE__BACKEND=sqlite`
pub const ENV_PREFIX: &str = "CRM_LOGGER";

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub export: ExportConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: String, // "csv" or "sqlite"
    pub data_dir: String,
    pub database_file: String,
    pub upsert_policy: String, // "increment_only" or "merge_incoming"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub default_format: String,
    pub output_directory: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Which table backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// One CSV file per table
    Csv,
    /// One SQLite database for both tables
    Sqlite,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(anyhow::anyhow!("Invalid storage backend: {other}. Must be one of: csv, sqlite")),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: "csv".to_string(),
                data_dir: "./data".to_string(),
                database_file: "crm_logger.db".to_string(),
                upsert_policy: UpsertPolicy::default().as_str().to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            export: ExportConfig {
                default_format: "csv".to_string(),
                output_directory: "./output".to_string(),
            },
            // Override with CRM_LOGGER__AUTH__PASSWORD or a local config file
            auth: AuthConfig {
                username: "admin".to_string(),
                password: "password123".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    ///
    /// Defaults, then `config/default.*`, `config/local.*`, the explicit file if
    /// given, then `CRM_LOGGER__SECTION__KEY` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_from(explicit, ENV_PREFIX)
    }

    /// [`Self::load`] with a custom environment prefix.
    pub fn load_from(explicit: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default()).context("Failed to serialize default configuration")?)
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to load configuration")?;

        let app_config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate storage config
        self.storage.backend_kind()?;
        self.storage.policy()?;
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("storage.data_dir must not be empty"));
        }
        if self.storage.database_file.trim().is_empty() {
            return Err(anyhow::anyhow!("storage.database_file must not be empty"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate export config
        self.export.format()?;

        // Validate auth config
        if self.auth.username.trim().is_empty() || self.auth.password.is_empty() {
            return Err(anyhow::anyhow!("auth.username and auth.password must be set"));
        }

        Ok(())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Effective configuration as YAML, with the password masked.
    pub fn to_redacted_yaml(&self) -> Result<String> {
        let mut shown = self.clone();
        shown.auth.password = "***".to_string();
        serde_yaml::to_string(&shown).context("Failed to render configuration")
    }
}

impl StorageConfig {
    /// Parsed backend name.
    pub fn backend_kind(&self) -> Result<BackendKind> {
        self.backend.parse()
    }

    /// Parsed upsert policy.
    pub fn policy(&self) -> Result<UpsertPolicy> {
        self.upsert_policy.parse().map_err(anyhow::Error::from)
    }

    /// SQLite database path.
    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.database_file)
    }

    /// CSV file paths for the interaction and ticket tables.
    pub fn csv_paths(&self) -> (PathBuf, PathBuf) {
        let dir = Path::new(&self.data_dir);
        (
            dir.join(format!("{}.csv", interactions::TABLE)),
            dir.join(format!("{}.csv", tickets::TABLE)),
        )
    }

    /// Files the configured backend keeps its tables in.
    pub fn table_locations(&self) -> Result<Vec<PathBuf>> {
        Ok(match self.backend_kind()? {
            BackendKind::Csv => {
                let (log, tickets) = self.csv_paths();
                vec![log, tickets]
            },
            BackendKind::Sqlite => vec![self.database_path()],
        })
    }
}

impl ExportConfig {
    /// Parsed default export format.
    pub fn format(&self) -> Result<ExportFormat> {
        self.default_format.parse().map_err(anyhow::Error::from)
    }
}

impl AuthConfig {
    /// The configured credential pair.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}
