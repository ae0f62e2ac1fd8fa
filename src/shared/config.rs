use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub name: String,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub stale_threshold_minutes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                name: "planner-offline".to_string(),
                max_connections: 4,
                busy_timeout_secs: 5,
            },
            remote: RemoteConfig {
                base_url: "http://localhost:3000".to_string(),
                timeout_secs: 30,
                auth_token: None,
                default_headers: BTreeMap::new(),
            },
            sync: SyncConfig {
                auto_sync: true,
                stale_threshold_minutes: 15,
            },
        }
    }
}

fn default_database_url() -> String {
    match dirs::data_local_dir() {
        Some(dir) => format!(
            "sqlite://{}?mode=rwc",
            dir.join("planner").join("offline.db").display()
        ),
        None => "sqlite://data/offline.db?mode=rwc".to_string(),
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("OFFLINE_SYNC_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("OFFLINE_SYNC_MAX_CONNECTIONS") {
            if let Some(value) = parse_u64(&v) {
                cfg.database.max_connections = value.clamp(1, u32::MAX as u64) as u32;
            }
        }

        if let Ok(v) = std::env::var("OFFLINE_SYNC_REMOTE_URL") {
            if !v.trim().is_empty() {
                cfg.remote.base_url = v.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(v) = std::env::var("OFFLINE_SYNC_REMOTE_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.remote.timeout_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("OFFLINE_SYNC_AUTH_TOKEN") {
            let token = v.trim();
            cfg.remote.auth_token = if token.is_empty() {
                None
            } else {
                Some(token.to_string())
            };
        }
        // "X-Client=planner,X-Locale=fr"
        if let Ok(v) = std::env::var("OFFLINE_SYNC_DEFAULT_HEADERS") {
            for pair in v.split(',') {
                if let Some((name, value)) = pair.split_once('=') {
                    let name = name.trim();
                    if !name.is_empty() {
                        cfg.remote
                            .default_headers
                            .insert(name.to_string(), value.trim().to_string());
                    }
                }
            }
        }

        if let Ok(v) = std::env::var("OFFLINE_SYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Ok(v) = std::env::var("OFFLINE_SYNC_STALE_MINUTES") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.stale_threshold_minutes = value;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.trim().is_empty() {
            return Err("Database url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if !(self.remote.base_url.starts_with("http://")
            || self.remote.base_url.starts_with("https://"))
        {
            return Err(format!(
                "Remote base_url must be an http(s) URL, got {}",
                self.remote.base_url
            ));
        }
        if self.remote.timeout_secs == 0 {
            return Err("Remote timeout_secs must be greater than 0".to_string());
        }
        if self.sync.stale_threshold_minutes == 0 {
            return Err("Sync stale_threshold_minutes must be greater than 0".to_string());
        }
        Ok(())
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_http_remote() {
        let mut cfg = AppConfig::default();
        cfg.remote.base_url = "ftp://example.com".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parse_bool_falls_back_to_default() {
        assert!(parse_bool("on", false));
        assert!(!parse_bool("OFF", true));
        assert!(parse_bool("maybe", true));
    }
}
