// src/config.rs - Configuration management with hot reload support
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub lookup: LookupConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub hot_reload: HotReloadConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub keep_alive: u64,
    /// Directory with the web client's static build; served when present.
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub api_base: String,
    pub backup_filename: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LookupConfig {
    /// Empty key disables the lookup surface.
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub max_request_size: usize,
    pub require_https: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HotReloadConfig {
    pub enabled: bool,
    pub watch_paths: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            keep_alive: 30,
            static_dir: "./static".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com".to_string(),
            backup_filename: crate::sync::BACKUP_FILENAME.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-3-flash-preview".to_string(),
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://127.0.0.1:8080".to_string(),
                "http://localhost:8080".to_string(),
            ],
            max_request_size: 16 * 1024 * 1024,
            require_https: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            watch_paths: vec![".env".to_string(), "config.toml".to_string()],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            sync: SyncConfig::default(),
            lookup: LookupConfig::default(),
            security: SecurityConfig::default(),
            logging: LoggingConfig::default(),
            hot_reload: HotReloadConfig::default(),
        }
    }
}

#[derive(Clone)]
pub struct ReloadableConfig(Arc<RwLock<Config>>);

impl ReloadableConfig {
    pub fn new(config: Config) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    pub fn get(&self) -> Config {
        self.0.read().unwrap().clone()
    }

    pub fn reload(&self) -> Result<()> {
        let config = load_config()?;
        *self.0.write().unwrap() = config;
        Ok(())
    }
}

pub fn load_config() -> Result<Config> {
    load_env_file()?;

    let mut config = if let Ok(config_file) = env::var("CONFIG_FILE") {
        let path = Path::new(&config_file);
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", config_file))?;
        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", config_file))?
    } else {
        Config::default()
    };

    override_with_env(&mut config)?;

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

fn override_with_env(config: &mut Config) -> Result<()> {
    if let Ok(host) = env::var("BIND_ADDRESS") {
        config.server.host = host;
    }
    if let Ok(port_str) = env::var("VALIDADE_PORT") {
        if let Ok(port) = port_str.parse::<u16>() {
            config.server.port = port;
        }
    }
    if let Ok(workers_str) = env::var("VALIDADE_WORKERS") {
        if let Ok(workers) = workers_str.parse::<usize>() {
            config.server.workers = Some(workers);
        }
    }
    if let Ok(static_dir) = env::var("VALIDADE_STATIC_DIR") {
        config.server.static_dir = static_dir;
    }
    if let Ok(data_dir) = env::var("VALIDADE_DATA_DIR") {
        config.storage.data_dir = data_dir;
    }
    if let Ok(api_key) = env::var("GEMINI_API_KEY") {
        config.lookup.api_key = api_key;
    }
    if let Ok(model) = env::var("GEMINI_MODEL") {
        config.lookup.model = model;
    }
    if let Ok(origins_str) = env::var("ALLOWED_ORIGINS") {
        config.security.allowed_origins = origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(level) = env::var("RUST_LOG") {
        config.logging.level = level;
    }

    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("storage.data_dir must not be empty"));
        }

        if self.sync.backup_filename.trim().is_empty() {
            return Err(anyhow::anyhow!("sync.backup_filename must not be empty"));
        }

        if self.is_production() && self.security.allowed_origins.contains(&"*".to_string()) {
            return Err(anyhow::anyhow!(
                "Wildcard CORS origins not allowed in production!"
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        env::var("VALIDADE_ENV")
            .map(|v| v == "production")
            .unwrap_or(false)
    }

    pub fn print_startup_info(&self) {
        log::info!("Validade starting up...");
        log::info!("Server: {}:{}", self.server.host, self.server.port);
        log::info!("Data directory: {}", self.storage.data_dir);
        log::info!(
            "AI lookup: {}",
            if self.lookup.api_key.is_empty() {
                "disabled (no API key)"
            } else {
                "enabled"
            }
        );
        log::info!("Logging: {} level", self.logging.level);
        log::info!(
            "Hot Reload: {}",
            if self.hot_reload.enabled {
                "Enabled"
            } else {
                "Disabled"
            }
        );

        if !self.is_production() {
            log::warn!("Running in development mode");
        }
    }
}

pub fn load_env_file() -> Result<()> {
    if let Ok(env_file) = env::var("ENV_FILE") {
        dotenvy::from_filename(&env_file)
            .with_context(|| format!("Failed to load environment file: {}", env_file))?;
    } else if Path::new(".env").exists() {
        dotenvy::dotenv().context("Failed to load .env file")?;
    }
    Ok(())
}

/// Watches the configured paths and reloads the shared config on change.
/// Runs on its own thread for the lifetime of the process.
pub fn start_hot_reload(reloadable: ReloadableConfig) {
    let config = reloadable.get();
    if !config.hot_reload.enabled {
        return;
    }
    let watch_paths = config.hot_reload.watch_paths.clone();

    std::thread::spawn(move || {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut debouncer = match new_debouncer(Duration::from_secs(2), tx) {
            Ok(debouncer) => debouncer,
            Err(e) => {
                log::warn!("Config hot reload disabled: {}", e);
                return;
            }
        };

        for path in &watch_paths {
            if Path::new(path).exists() {
                if let Err(e) = debouncer
                    .watcher()
                    .watch(Path::new(path), RecursiveMode::NonRecursive)
                {
                    log::warn!("Cannot watch {}: {}", path, e);
                }
            }
        }

        for events in rx.into_iter().flatten() {
            if events.is_empty() {
                continue;
            }
            match reloadable.reload() {
                Ok(()) => log::info!("Configuration reloaded"),
                Err(e) => log::error!("Configuration reload failed: {}", e),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        env::remove_var("VALIDADE_ENV");
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.data_dir, "./data");
        assert!(config.lookup.api_key.is_empty());
        assert!(config.hot_reload.enabled);
        assert!(!config.is_production());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.storage.data_dir = "  ".to_string();
        assert!(config.validate().is_err());

        config.storage.data_dir = "./data".to_string();
        config.sync.backup_filename = String::new();
        assert!(config.validate().is_err());

        config.sync.backup_filename = "backup.json".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_loading() -> Result<()> {
        let toml_content = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [storage]
        data_dir = "/tmp/validade-test"

        [lookup]
        api_key = "test-key"
        "#;

        let config: Config = toml::from_str(toml_content)?;
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.data_dir, "/tmp/validade-test");
        assert_eq!(config.lookup.api_key, "test-key");
        // Sections absent from the file keep their defaults.
        assert_eq!(config.sync.api_base, "https://www.googleapis.com");

        Ok(())
    }

    #[test]
    fn test_env_override() {
        env::set_var("VALIDADE_PORT", "9090");
        env::set_var("VALIDADE_DATA_DIR", "/tmp/elsewhere");

        let mut config = Config::default();
        override_with_env(&mut config).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.storage.data_dir, "/tmp/elsewhere");

        env::remove_var("VALIDADE_PORT");
        env::remove_var("VALIDADE_DATA_DIR");
    }
}
