use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::store::is_valid_collection_name;
use crate::platform::{NativePlatform, Platform};

pub const DEFAULT_CONFIG_FILE: &str = "sheetpatch.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// File the values were read from; `None` when defaults were used.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for one multipart request body.
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to `records.db` in the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_db_name")]
    pub name: String,

    #[serde(default = "default_collection")]
    pub collection: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `sheetpatch=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_max_upload_mb() -> usize {
    25
}
fn default_db_name() -> String {
    "sheetpatch".to_string()
}
fn default_collection() -> String {
    "records".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            name: default_db_name(),
            collection: default_collection(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load `SHEETPATCH_CONFIG` (or `./sheetpatch.toml`), then apply
    /// environment overrides.
    pub async fn load() -> Result<Self> {
        let path = std::env::var_os("SHEETPATCH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = Self::load_from(&path).await?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let mut config =
            Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay `SHEETPATCH_*` variables resolved through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SHEETPATCH_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SHEETPATCH_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("SHEETPATCH_PORT is not a port number: {port}"))?;
        }
        if let Some(path) = lookup("SHEETPATCH_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(name) = lookup("SHEETPATCH_DB_NAME") {
            self.database.name = name;
        }
        if let Some(collection) = lookup("SHEETPATCH_COLLECTION") {
            self.database.collection = collection;
        }
        if let Some(level) = lookup("SHEETPATCH_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_collection_name(&self.database.collection) {
            bail!(
                "database.collection '{}' must start with a letter or underscore and contain only letters, digits and underscores",
                self.database.collection
            );
        }
        if self.database.name.trim().is_empty() {
            bail!("database.name cannot be empty");
        }
        if self.server.max_upload_mb == 0 {
            bail!("server.max_upload_mb must be at least 1");
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| NativePlatform::data_dir().join("records.db"))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
