/// Runtime configuration for the classreg service
use crate::sync::{EngineConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which store backend the service talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process store, for development and tests.
    Memory,
    /// Remote document store service.
    Rest {
        #[serde(rename = "baseUrl")]
        base_url: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub bind_address: String,
    pub store: StoreConfig,
    /// Journal database path; markers are kept in memory when omitted.
    pub journal_path: Option<PathBuf>,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub cas_attempts: u32,
    pub reconcile_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8075".to_string(),
            store: StoreConfig::Memory,
            journal_path: None,
            retry_max_attempts: 4,
            retry_base_delay_ms: 250,
            cas_attempts: 3,
            reconcile_interval_secs: 30,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a JSON file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            retry: RetryPolicy {
                max_attempts: self.retry_max_attempts,
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
            },
            cas_attempts: self.cas_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_memory_store() {
        let config = AppConfig::default();
        assert!(matches!(config.store, StoreConfig::Memory));
        assert!(config.journal_path.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{ "bindAddress": "0.0.0.0:9000",
                 "store": { "backend": "rest", "baseUrl": "http://store.local/api/" } }"#,
        )
        .unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert!(matches!(config.store, StoreConfig::Rest { .. }));
        assert_eq!(config.cas_attempts, AppConfig::default().cas_attempts);
    }
}
