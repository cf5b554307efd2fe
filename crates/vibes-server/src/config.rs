//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so a local instance starts with no
//! configuration at all.

use std::net::SocketAddr;
use std::path::PathBuf;

use vibes_shared::constants::{DEFAULT_HTTP_PORT, MAX_THUMBNAIL_SIZE};

#[derive(Clone)]
pub struct ServerConfig {
    /// Env: `HTTP_ADDR`. Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite file. `None` uses the platform data directory.
    /// Env: `DATABASE_PATH`
    pub database_path: Option<PathBuf>,

    /// Root for uploaded files.
    /// Env: `BLOB_STORAGE_PATH`. Default: `./files`
    pub blob_storage_path: PathBuf,

    /// Env: `MAX_BLOB_SIZE` (bytes). Default: 2 MiB
    pub max_blob_size: usize,

    /// Screenshot service root.
    /// Env: `THUMBNAIL_API_BASE`. Default: `https://api.thumbnail.ws/api`
    pub thumbnail_api_base: String,

    /// Env: `THUMBNAIL_API_KEY`. Without it the proxy answers 502.
    pub thumbnail_api_key: Option<String>,

    /// Bearer token for `/admin/*`. Empty disables the admin API.
    /// Env: `ADMIN_TOKEN`
    pub admin_token: Option<String>,

    /// Env: `INSTANCE_NAME`. Default: `"GoodVibes Gallery"`
    pub instance_name: String,

    /// Sustained requests per second per client on write and proxy routes.
    /// Env: `RATE_LIMIT_PER_SEC`. Default: 5
    pub rate_limit_per_sec: f64,

    /// Env: `RATE_LIMIT_BURST`. Default: 20
    pub rate_limit_burst: f64,
}

// Secrets stay out of the startup log.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("blob_storage_path", &self.blob_storage_path)
            .field("max_blob_size", &self.max_blob_size)
            .field("thumbnail_api_base", &self.thumbnail_api_base)
            .field("thumbnail_api_key", &self.thumbnail_api_key.as_ref().map(|_| "***"))
            .field("admin_token", &self.admin_token.as_ref().map(|_| "***"))
            .field("instance_name", &self.instance_name)
            .field("rate_limit_per_sec", &self.rate_limit_per_sec)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            blob_storage_path: PathBuf::from("./files"),
            max_blob_size: MAX_THUMBNAIL_SIZE,
            thumbnail_api_base: "https://api.thumbnail.ws/api".to_string(),
            thumbnail_api_key: None,
            admin_token: None,
            instance_name: vibes_shared::constants::APP_NAME.to_string(),
            rate_limit_per_sec: 5.0,
            rate_limit_burst: 20.0,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(path) = non_empty(lookup("DATABASE_PATH")) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(path) = non_empty(lookup("BLOB_STORAGE_PATH")) {
            config.blob_storage_path = PathBuf::from(path);
        }

        if let Some(val) = lookup("MAX_BLOB_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_blob_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_BLOB_SIZE, using default"),
            }
        }

        if let Some(base) = non_empty(lookup("THUMBNAIL_API_BASE")) {
            config.thumbnail_api_base = base.trim_end_matches('/').to_string();
        }

        config.thumbnail_api_key = non_empty(lookup("THUMBNAIL_API_KEY"));
        config.admin_token = non_empty(lookup("ADMIN_TOKEN"));

        if let Some(name) = non_empty(lookup("INSTANCE_NAME")) {
            config.instance_name = name;
        }

        if let Some(val) = lookup("RATE_LIMIT_PER_SEC") {
            match val.parse::<f64>() {
                Ok(n) if n > 0.0 => config.rate_limit_per_sec = n,
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_PER_SEC, using default"),
            }
        }

        if let Some(val) = lookup("RATE_LIMIT_BURST") {
            match val.parse::<f64>() {
                Ok(n) if n >= 1.0 => config.rate_limit_burst = n,
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_BURST, using default"),
            }
        }

        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_blob_size, 2 * 1024 * 1024);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("THUMBNAIL_API_BASE", "http://shots.local/api/"),
            ("THUMBNAIL_API_KEY", "k"),
            ("ADMIN_TOKEN", "secret"),
            ("MAX_BLOB_SIZE", "1024"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.thumbnail_api_base, "http://shots.local/api");
        assert_eq!(config.thumbnail_api_key.as_deref(), Some("k"));
        assert_eq!(config.admin_token.as_deref(), Some("secret"));
        assert_eq!(config.max_blob_size, 1024);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = from_map(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("MAX_BLOB_SIZE", "-3"),
            ("ADMIN_TOKEN", ""),
            ("RATE_LIMIT_BURST", "0"),
        ]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_blob_size, 2 * 1024 * 1024);
        assert!(config.admin_token.is_none());
        assert_eq!(config.rate_limit_burst, 20.0);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = from_map(&[("ADMIN_TOKEN", "hunter2")]);
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
