// crates/slugmap-config/src/config.rs
// ============================================================================
// Module: Slugmap Configuration
// Description: Configuration loading and validation for Slugmap.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: slugmap-core, slugmap-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file yields a runnable in-memory
//! server on `127.0.0.1:3000`. Missing or invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use slugmap_core::DEFAULT_MAX_KIND_BYTES;
use slugmap_core::DEFAULT_MAX_SLUG_BYTES;
use slugmap_core::MappingPolicy;
use slugmap_store_sqlite::SqliteStoreConfig;
use slugmap_store_sqlite::SqliteStoreMode;
use slugmap_store_sqlite::SqliteSyncMode;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "slugmap.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SLUGMAP_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address.
const DEFAULT_BIND: &str = "127.0.0.1:3000";
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
/// Maximum allowed request body size in bytes.
const MAX_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default per-request storage timeout in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
/// Minimum per-request storage timeout in milliseconds.
const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum per-request storage timeout in milliseconds.
const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;
/// Default `SQLite` busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default `SQLite` read pool size.
const DEFAULT_READ_POOL_SIZE: usize = 4;
/// Maximum `SQLite` read pool size.
const MAX_READ_POOL_SIZE: usize = 64;
/// Maximum configurable slug length in bytes.
const MAX_MAX_SLUG_BYTES: usize = 64 * 1024;
/// Maximum configurable kind length in bytes.
const MAX_MAX_KIND_BYTES: usize = 1024;
/// Maximum number of allow-listed kinds.
const MAX_ALLOWED_KINDS: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Slugmap configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlugmapConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Mapping store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Mapping validation configuration.
    #[serde(default)]
    pub mapping: MappingConfig,
}

impl SlugmapConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then [`CONFIG_ENV_VAR`], then
    /// `slugmap.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        self.mapping.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Per-request storage timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Optional directory holding the front-end build.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    /// Cross-origin configuration.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_ms: default_request_timeout_ms(),
            static_dir: None,
            cors: CorsConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("server.bind is not a valid address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_MAX_BODY_BYTES}"
            )));
        }
        if !(MIN_REQUEST_TIMEOUT_MS ..= MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms)
        {
            return Err(ConfigError::Invalid(format!(
                "server.request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if let Some(dir) = &self.static_dir {
            validate_path_string("server.static_dir", &dir.to_string_lossy())?;
        }
        self.audit.validate()
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allow any origin to call the API.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
        }
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

/// Mapping store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Mapping store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of `SQLite` read connections.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: default_read_pool_size(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store configuration, if the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match self.store_type {
            StoreType::Memory => None,
            StoreType::Sqlite => self.path.as_ref().map(|path| SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
                read_pool_size: self.read_pool_size,
            }),
        }
    }

    /// Validates mapping store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())?;
                if self.read_pool_size == 0 || self.read_pool_size > MAX_READ_POOL_SIZE {
                    return Err(ConfigError::Invalid(format!(
                        "store.read_pool_size must be between 1 and {MAX_READ_POOL_SIZE}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Mapping validation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    /// Optional kind allow-list; empty accepts any kind.
    #[serde(default)]
    pub allowed_kinds: Vec<String>,
    /// Maximum slug length in bytes.
    #[serde(default = "default_max_slug_bytes")]
    pub max_slug_bytes: usize,
    /// Maximum kind length in bytes.
    #[serde(default = "default_max_kind_bytes")]
    pub max_kind_bytes: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            allowed_kinds: Vec::new(),
            max_slug_bytes: default_max_slug_bytes(),
            max_kind_bytes: default_max_kind_bytes(),
        }
    }
}

impl MappingConfig {
    /// Builds the service validation policy.
    #[must_use]
    pub fn policy(&self) -> MappingPolicy {
        MappingPolicy {
            allowed_kinds: self.allowed_kinds.iter().cloned().collect(),
            max_slug_bytes: self.max_slug_bytes,
            max_kind_bytes: self.max_kind_bytes,
        }
    }

    /// Validates mapping configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_slug_bytes == 0 || self.max_slug_bytes > MAX_MAX_SLUG_BYTES {
            return Err(ConfigError::Invalid(format!(
                "mapping.max_slug_bytes must be between 1 and {MAX_MAX_SLUG_BYTES}"
            )));
        }
        if self.max_kind_bytes == 0 || self.max_kind_bytes > MAX_MAX_KIND_BYTES {
            return Err(ConfigError::Invalid(format!(
                "mapping.max_kind_bytes must be between 1 and {MAX_MAX_KIND_BYTES}"
            )));
        }
        if self.allowed_kinds.len() > MAX_ALLOWED_KINDS {
            return Err(ConfigError::Invalid(format!(
                "mapping.allowed_kinds exceeds {MAX_ALLOWED_KINDS} entries"
            )));
        }
        for kind in &self.allowed_kinds {
            if kind.is_empty() {
                return Err(ConfigError::Invalid(
                    "mapping.allowed_kinds entries must be non-empty".to_string(),
                ));
            }
            if kind.len() > self.max_kind_bytes {
                return Err(ConfigError::Invalid(
                    "mapping.allowed_kinds entry exceeds max_kind_bytes".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns the default per-request storage timeout.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Returns true.
const fn default_true() -> bool {
    true
}

/// Returns the default `SQLite` busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default `SQLite` read pool size.
const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

/// Returns the default maximum slug length.
const fn default_max_slug_bytes() -> usize {
    DEFAULT_MAX_SLUG_BYTES
}

/// Returns the default maximum kind length.
const fn default_max_kind_bytes() -> usize {
    DEFAULT_MAX_KIND_BYTES
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::ConfigError;
    use super::validate_path_string;

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        assert!(matches!(validate_path_string("field", "   "), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_path_string_rejects_long_component() {
        let value = format!("dir/{}", "a".repeat(256));
        let err = validate_path_string("store.path", &value).expect_err("too long");
        assert!(err.to_string().contains("store.path path component too long"));
    }

    #[test]
    fn validate_path_string_accepts_nested_path() {
        assert!(validate_path_string("field", " data/slugmap.db ").is_ok());
    }
}
