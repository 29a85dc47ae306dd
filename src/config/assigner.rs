//! Assigner and store backend configuration structures.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, AssignmentPolicy, DEFAULT_CAPACITY_PER_WORKER, DEFAULT_COOK_ROLE};

/// Environment variable for [`AssignerConfig::capacity_per_worker`].
pub const ENV_CAPACITY: &str = "KITCHEN_CAPACITY_PER_WORKER";
/// Environment variable for [`AssignerConfig::cook_role`].
pub const ENV_COOK_ROLE: &str = "KITCHEN_COOK_ROLE";
/// Environment variable for [`AssignerConfig::serialize_passes`].
pub const ENV_SERIALIZE_PASSES: &str = "KITCHEN_SERIALIZE_PASSES";
/// Environment variable for [`AssignerConfig::audit_buffer`].
pub const ENV_AUDIT_BUFFER: &str = "KITCHEN_AUDIT_BUFFER";
/// Environment variable selecting the SQLite backend.
pub const ENV_DATABASE_URL: &str = "KITCHEN_DATABASE_URL";
/// Environment variable for the SQLite pool size.
pub const ENV_DATABASE_MAX_CONNECTIONS: &str = "KITCHEN_DATABASE_MAX_CONNECTIONS";

const fn default_max_connections() -> u32 {
    5
}

/// Store backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// In-memory store for development/testing.
    #[default]
    InMemory,
    /// SQLite database through sqlx.
    Sqlite {
        /// Connection URL, e.g. `sqlite://kitchen.db` or `sqlite::memory:`.
        url: String,
        /// Pool size.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

/// Root assigner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignerConfig {
    /// Maximum open items per worker.
    pub capacity_per_worker: u32,
    /// Role whose enabled accounts form the fallback roster.
    pub cook_role: String,
    /// Serialize assignment passes within the process.
    pub serialize_passes: bool,
    /// Events kept by the in-memory audit sink; 0 disables auditing.
    pub audit_buffer: usize,
    /// Store backend selection.
    pub store: StoreBackendConfig,
}

impl Default for AssignerConfig {
    fn default() -> Self {
        Self {
            capacity_per_worker: DEFAULT_CAPACITY_PER_WORKER,
            cook_role: DEFAULT_COOK_ROLE.to_string(),
            serialize_passes: true,
            audit_buffer: 1024,
            store: StoreBackendConfig::InMemory,
        }
    }
}

impl AssignerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity_per_worker == 0 {
            return Err("capacity_per_worker must be greater than 0".into());
        }
        if self.cook_role.trim().is_empty() {
            return Err("cook_role must not be empty".into());
        }
        if let StoreBackendConfig::Sqlite {
            url,
            max_connections,
        } = &self.store
        {
            if url.trim().is_empty() {
                return Err("sqlite url must not be empty".into());
            }
            if *max_connections == 0 {
                return Err("sqlite max_connections must be greater than 0".into());
            }
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment, reading `.env` first
    /// when present.
    pub fn from_env() -> AppResult<Self> {
        dotenv_loaded(dotenvy::dotenv().map(|_| ()))?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a key lookup, starting from defaults.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(ENV_CAPACITY) {
            cfg.capacity_per_worker = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_CAPACITY} must be an unsigned integer, got `{raw}`"))?;
        }
        if let Some(raw) = lookup(ENV_COOK_ROLE) {
            cfg.cook_role = raw.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_SERIALIZE_PASSES) {
            cfg.serialize_passes = parse_flag(&raw)
                .ok_or_else(|| anyhow!("{ENV_SERIALIZE_PASSES} must be a boolean, got `{raw}`"))?;
        }
        if let Some(raw) = lookup(ENV_AUDIT_BUFFER) {
            cfg.audit_buffer = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_AUDIT_BUFFER} must be an unsigned integer, got `{raw}`"))?;
        }
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            let max_connections = match lookup(ENV_DATABASE_MAX_CONNECTIONS) {
                Some(raw) => raw.trim().parse().with_context(|| {
                    format!("{ENV_DATABASE_MAX_CONNECTIONS} must be an unsigned integer, got `{raw}`")
                })?,
                None => default_max_connections(),
            };
            cfg.store = StoreBackendConfig::Sqlite {
                url: url.trim().to_string(),
                max_connections,
            };
        }

        cfg.validate().map_err(|e| anyhow!("config invalid: {e}"))?;
        Ok(cfg)
    }

    /// Assignment policy derived from this configuration.
    pub fn policy(&self) -> AssignmentPolicy {
        AssignmentPolicy {
            capacity_per_worker: self.capacity_per_worker,
            cook_role: self.cook_role.clone(),
            serialize_passes: self.serialize_passes,
        }
    }
}

/// A missing `.env` is fine; an unreadable or malformed one is not.
fn dotenv_loaded(result: Result<(), dotenvy::Error>) -> AppResult<()> {
    match result {
        Err(err) if err.not_found() => Ok(()),
        other => other.context("loading .env"),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
