use crate::domain::value_objects::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval_ms: u64,
    pub max_attempts: u32,
    pub retry_delays_ms: Vec<u64>,
    pub completed_retention: usize,
    pub event_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join("kukuri"))
            .unwrap_or_else(|| "./data".into());
        Self {
            url: format!(
                "sqlite:{}?mode=rwc",
                data_dir.join("sync_queue.db").display()
            ),
            max_connections: 5,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval_ms: 30_000,
            max_attempts: 5,
            retry_delays_ms: vec![1_000, 5_000, 15_000, 60_000, 300_000],
            completed_retention: 100,
            event_capacity: 64,
        }
    }
}

impl SyncConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_delays_ms
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
            self.max_attempts,
        )
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("KUKURI_SYNC_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("KUKURI_SYNC_AUTO") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = env_u64("KUKURI_SYNC_INTERVAL_MS") {
            cfg.sync.sync_interval_ms = value;
        }
        if let Some(value) = env_u64("KUKURI_SYNC_MAX_ATTEMPTS") {
            cfg.sync.max_attempts = u32::try_from(value).unwrap_or(u32::MAX);
        }
        if let Some(value) = env_u64("KUKURI_SYNC_RETENTION") {
            cfg.sync.completed_retention = usize::try_from(value).unwrap_or(usize::MAX);
        }
        if let Ok(v) = std::env::var("KUKURI_SYNC_RETRY_DELAYS_MS") {
            let delays: Option<Vec<u64>> = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_u64)
                .collect();
            // 1つでも読めない値があれば既定値を維持
            if let Some(delays) = delays {
                if !delays.is_empty() {
                    cfg.sync.retry_delays_ms = delays;
                }
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.max_attempts == 0 {
            return Err("Sync max_attempts must be greater than 0".to_string());
        }
        if self.sync.retry_delays_ms.is_empty() {
            return Err("Sync retry_delays_ms must not be empty".to_string());
        }
        if self.sync.sync_interval_ms == 0 {
            return Err("Sync sync_interval_ms must be greater than 0".to_string());
        }
        if self.sync.event_capacity == 0 {
            return Err("Sync event_capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().as_deref().and_then(parse_u64)
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
