use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for HikeBot
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HikeBotConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Social data persistence
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    /// LLM used by the group trip planner
    #[serde(default)]
    pub llm: LLMConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    /// Route catalog sources
    #[serde(default)]
    pub trails: TrailsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend: "memory" or "sqlite"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Database file when using the sqlite backend
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret for bearer tokens. Header authentication only when unset.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl AuthConfig {
    pub fn jwt_secret(&self) -> Option<SecretString> {
        self.jwt_secret
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::from(s.clone()))
    }
}

/// LLM configuration for the trip planner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default)]
    pub enabled: bool,

    /// LLM provider: "openai", "ollama", "lmstudio", "openai-compatible"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_lmstudio_url")]
    pub lmstudio_url: String,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Base URL for custom OpenAI-compatible endpoints
    #[serde(default)]
    pub openai_compatible_url: Option<String>,

    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_llm_provider(),
            model: default_llm_model(),
            openai_base_url: default_openai_base_url(),
            lmstudio_url: default_lmstudio_url(),
            ollama_url: default_ollama_url(),
            openai_compatible_url: None,
            openai_api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_open_meteo_url")]
    pub base_url: String,

    #[serde(default = "default_weather_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_weather_timeout")]
    pub timeout_secs: u64,

    /// Skip the network entirely and serve seasonal fixtures
    #[serde(default)]
    pub offline: bool,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_open_meteo_url(),
            cache_ttl_secs: default_weather_ttl(),
            timeout_secs: default_weather_timeout(),
            offline: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrailsConfig {
    /// Waymarked Trails endpoint; fixtures are used when unset
    #[serde(default)]
    pub waymarked_url: Option<String>,

    /// "min_lon,min_lat,max_lon,max_lat"
    #[serde(default)]
    pub waymarked_bbox: Option<String>,

    #[serde(default)]
    pub waymarked_limit: Option<usize>,

    /// JSON file with an array of routes
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_storage_backend() -> String {
    "memory".to_string()
}
fn default_sqlite_path() -> PathBuf {
    PathBuf::from("hikebot.db")
}
fn default_token_ttl_hours() -> i64 {
    24
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_lmstudio_url() -> String {
    "http://localhost:1234".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> usize {
    800
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}
fn default_open_meteo_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}
fn default_weather_ttl() -> u64 {
    3600
}
fn default_weather_timeout() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration manager with layered sources
pub struct ConfigManager {
    config: HikeBotConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (hikebot.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading HikeBot configuration");

        Self::load_dotenv();
        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Same as [`ConfigManager::load`] but with an explicit config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_dotenv();
        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(config: HikeBotConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!(path = %path.display(), "Configuration loaded"),
            None => info!("Configuration loaded from defaults"),
        }
        info!(
            storage = %config.storage.backend,
            llm_enabled = config.llm.enabled,
            llm_provider = %config.llm.provider,
            weather_offline = config.weather.offline,
            waymarked = config.trails.waymarked_url.is_some(),
            "Effective settings"
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".hikebot.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .hikebot.env: {}", e);
                } else {
                    info!("Loaded .hikebot.env from home directory");
                }
            }
        }
    }

    /// Search order: ./hikebot.toml, ~/.hikebot/config.toml, defaults
    fn load_config_file() -> Result<(HikeBotConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new("hikebot.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".hikebot").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((HikeBotConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<HikeBotConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<HikeBotConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(config: HikeBotConfig) -> HikeBotConfig {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    fn apply_overrides(
        mut config: HikeBotConfig,
        var: impl Fn(&str) -> Option<String>,
    ) -> HikeBotConfig {
        // Server
        if let Some(host) = var("HIKEBOT_HOST") {
            config.server.host = host;
        }
        if let Some(port) = var("HIKEBOT_PORT").and_then(|p| p.parse().ok()) {
            config.server.port = port;
        }

        // Storage
        if let Some(backend) = var("HIKEBOT_STORAGE") {
            config.storage.backend = backend;
        }
        if let Some(path) = var("HIKEBOT_SQLITE_PATH") {
            config.storage.sqlite_path = PathBuf::from(path);
        }

        // Auth
        if let Some(secret) = var("HIKEBOT_JWT_SECRET") {
            config.auth.jwt_secret = Some(secret);
        }

        // LLM
        if let Some(provider) = var("HIKEBOT_LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Some(model) = var("HIKEBOT_LLM_MODEL") {
            config.llm.model = model;
            config.llm.enabled = true;
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key);
            config.llm.enabled = true;
        }
        if let Some(url) = var("HIKEBOT_OPENAI_COMPATIBLE_URL") {
            config.llm.openai_compatible_url = Some(url);
        }
        if let Some(enabled) = var("HIKEBOT_LLM_ENABLED") {
            config.llm.enabled = parse_flag(&enabled);
        }

        // Weather
        if let Some(offline) = var("HIKEBOT_WEATHER_OFFLINE") {
            config.weather.offline = parse_flag(&offline);
        }
        if let Some(ttl) = var("HIKEBOT_WEATHER_TTL_SECS").and_then(|t| t.parse().ok()) {
            config.weather.cache_ttl_secs = ttl;
        }

        // Trails
        if let Some(url) = var("HIKEBOT_WAYMARKED_URL") {
            config.trails.waymarked_url = Some(url);
        }
        if let Some(bbox) = var("HIKEBOT_WAYMARKED_BBOX") {
            config.trails.waymarked_bbox = Some(bbox);
        }
        if let Some(limit) = var("HIKEBOT_WAYMARKED_LIMIT").and_then(|l| l.parse().ok()) {
            config.trails.waymarked_limit = Some(limit);
        }
        if let Some(path) = var("HIKEBOT_SEED_PATH") {
            config.trails.seed_path = Some(PathBuf::from(path));
        }

        // Logging
        if let Some(level) = var("RUST_LOG") {
            config.logging.level = level;
        }

        config
    }

    fn validate_config(config: &HikeBotConfig) -> Result<(), ConfigError> {
        match config.storage.backend.as_str() {
            "memory" | "sqlite" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid storage backend: {}. Must be one of: memory, sqlite",
                    other
                )))
            }
        }

        match config.llm.provider.as_str() {
            "openai" | "ollama" | "lmstudio" | "openai-compatible" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid LLM provider: {}. Must be one of: openai, ollama, lmstudio, openai-compatible",
                    other
                )))
            }
        }

        if config.llm.provider == "openai-compatible" && config.llm.openai_compatible_url.is_none()
        {
            return Err(ConfigError::ValidationError(
                "llm.openai_compatible_url is required for the openai-compatible provider"
                    .to_string(),
            ));
        }

        if config.weather.cache_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "weather.cache_ttl_secs must be greater than zero".to_string(),
            ));
        }

        if config.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_ttl_hours must be positive".to_string(),
            ));
        }

        // RUST_LOG may carry a full filter directive; only the bare level is checked
        let level = config.logging.level.as_str();
        if !level.contains('=') && !level.contains(',') {
            match level {
                "trace" | "debug" | "info" | "warn" | "error" => {}
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        other
                    )))
                }
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &HikeBotConfig {
        &self.config
    }

    pub fn into_config(self) -> HikeBotConfig {
        self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = HikeBotConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = HikeBotConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.storage.backend, "memory");
        assert!(!config.llm.enabled);
        assert_eq!(config.weather.cache_ttl_secs, 3600);
        assert!(config.auth.jwt_secret().is_none());
    }

    #[test]
    fn test_config_validation() {
        let config = HikeBotConfig::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        let mut bad = config.clone();
        bad.storage.backend = "postgres".to_string();
        assert!(ConfigManager::validate_config(&bad).is_err());

        let mut bad = config.clone();
        bad.llm.provider = "openai-compatible".to_string();
        assert!(ConfigManager::validate_config(&bad).is_err());

        let mut directive = config;
        directive.logging.level = "hikebot_api=debug,tower_http=info".to_string();
        assert!(ConfigManager::validate_config(&directive).is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ConfigManager::parse(
            r#"
            [server]
            port = 9100

            [weather]
            offline = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.weather.offline);
        assert_eq!(config.weather.cache_ttl_secs, 3600);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HIKEBOT_PORT", "7000"),
            ("HIKEBOT_STORAGE", "sqlite"),
            ("HIKEBOT_WEATHER_OFFLINE", "1"),
            ("HIKEBOT_LLM_MODEL", "llama3"),
            ("HIKEBOT_JWT_SECRET", "s3cret"),
        ]
        .into_iter()
        .collect();

        let config = ConfigManager::apply_overrides(HikeBotConfig::default(), |k| {
            vars.get(k).map(|v| v.to_string())
        });
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.storage.backend, "sqlite");
        assert!(config.weather.offline);
        assert!(config.llm.enabled);
        assert_eq!(config.llm.model, "llama3");
        assert!(config.auth.jwt_secret().is_some());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hikebot.toml");
        std::fs::write(&path, "[storage]\nbackend = \"sqlite\"\n").unwrap();

        let manager = ConfigManager::load_from(&path).unwrap();
        assert_eq!(manager.config().storage.backend, "sqlite");
        assert_eq!(manager.config_path(), Some(path.as_path()));

        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            ConfigManager::load_from(&missing),
            Err(ConfigError::NotFound(_))
        ));
    }
}
