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

/// Main configuration for CodeOptim
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CodeOptimConfig {
    /// HTTP server binding
    #[serde(default)]
    pub server: ServerConfig,

    /// Code-analysis model (Captain)
    #[serde(default)]
    pub captain: CaptainConfig,

    /// Fast code-patch model (Morph)
    #[serde(default)]
    pub morph: MorphConfig,

    /// Web search used to research optimization techniques (Exa)
    #[serde(default)]
    pub research: ResearchConfig,

    /// Documentation scraping (Firecrawl)
    #[serde(default)]
    pub docs: DocsConfig,

    /// Local execution of generated variants
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Source hosting API
    #[serde(default)]
    pub github: GitHubConfig,

    /// Experiment defaults and pacing
    #[serde(default)]
    pub experiment: ExperimentConfig,

    /// Logging configuration
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

/// Captain analysis model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptainConfig {
    /// OpenAI-compatible base URL
    #[serde(default = "default_captain_base_url")]
    pub base_url: String,

    #[serde(default = "default_captain_model")]
    pub model: String,

    /// API key; analysis falls back to an error result when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sent as the `X-Organization-ID` header
    #[serde(default)]
    pub org_id: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_captain_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for CaptainConfig {
    fn default() -> Self {
        Self {
            base_url: default_captain_base_url(),
            model: default_captain_model(),
            api_key: None,
            org_id: None,
            temperature: default_temperature(),
            max_tokens: default_captain_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Morph Fast Apply configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorphConfig {
    #[serde(default = "default_morph_base_url")]
    pub base_url: String,

    #[serde(default = "default_morph_model")]
    pub model: String,

    /// API key; variants use the local fallback transformation when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            base_url: default_morph_base_url(),
            model: default_morph_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_exa_base_url")]
    pub base_url: String,

    /// Exa API key; the built-in knowledge base is used when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Upper bound on search calls per research request
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,

    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    #[serde(default = "default_service_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_exa_base_url(),
            api_key: None,
            max_queries: default_max_queries(),
            results_per_query: default_results_per_query(),
            timeout_secs: default_service_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    #[serde(default = "default_firecrawl_base_url")]
    pub base_url: String,

    /// Firecrawl API key; fallback documentation is synthesized when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_max_urls")]
    pub max_urls: usize,

    #[serde(default = "default_service_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            base_url: default_firecrawl_base_url(),
            api_key: None,
            max_urls: default_max_urls(),
            timeout_secs: default_service_timeout_secs(),
        }
    }
}

/// Execution of variants in a local interpreter.
///
/// When disabled every measurement is simulated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_python_bin")]
    pub python_bin: String,

    #[serde(default = "default_node_bin")]
    pub node_bin: String,

    #[serde(default = "default_service_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            python_bin: default_python_bin(),
            node_bin: default_node_bin(),
            timeout_secs: default_service_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_github_api_base")]
    pub api_base: String,

    /// Optional for public repositories
    #[serde(default)]
    pub token: Option<String>,

    /// Maximum number of code files fetched per repository
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default = "default_service_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api_base(),
            token: None,
            max_files: default_max_files(),
            timeout_secs: default_service_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_variants")]
    pub default_variants: usize,

    #[serde(default = "default_iterations")]
    pub default_iterations: u32,

    /// Requests asking for more variants are rejected
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,

    /// Pause between two generated variants (ms)
    #[serde(default = "default_variant_delay_ms")]
    pub variant_delay_ms: u64,

    /// How often a progress stream checks the experiment (ms)
    #[serde(default = "default_stream_poll_interval_ms")]
    pub stream_poll_interval_ms: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            default_variants: default_variants(),
            default_iterations: default_iterations(),
            max_variants: default_max_variants(),
            variant_delay_ms: default_variant_delay_ms(),
            stream_poll_interval_ms: default_stream_poll_interval_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
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
fn default_captain_base_url() -> String {
    "https://api.runcaptain.com/v1".to_string()
}
fn default_captain_model() -> String {
    "captain-voyager-latest".to_string()
}
fn default_captain_max_tokens() -> usize {
    6000
}
fn default_morph_base_url() -> String {
    "https://api.morphllm.com/v1".to_string()
}
fn default_morph_model() -> String {
    "morph-v3-fast".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    2
}
fn default_exa_base_url() -> String {
    "https://api.exa.ai".to_string()
}
fn default_max_queries() -> usize {
    3
}
fn default_results_per_query() -> usize {
    3
}
fn default_firecrawl_base_url() -> String {
    "https://api.firecrawl.dev".to_string()
}
fn default_max_urls() -> usize {
    5
}
fn default_service_timeout_secs() -> u64 {
    30
}
fn default_python_bin() -> String {
    "python3".to_string()
}
fn default_node_bin() -> String {
    "node".to_string()
}
fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_max_files() -> usize {
    50
}
fn default_variants() -> usize {
    50
}
fn default_iterations() -> u32 {
    1000
}
fn default_max_variants() -> usize {
    100
}
fn default_variant_delay_ms() -> u64 {
    100
}
fn default_stream_poll_interval_ms() -> u64 {
    500
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with smart defaults
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: CodeOptimConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.codeoptim.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading CodeOptim configuration...");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok());
        Self::validate_config(&config)?;

        info!("Configuration loaded successfully");
        match config_path {
            Some(ref path) => info!("   Config file: {}", path.display()),
            None => info!("   Config file: NONE (using defaults)"),
        }
        info!(
            "   Captain: {}",
            if config.captain.api_key.is_some() { "configured" } else { "not configured (fallback)" }
        );
        info!(
            "   Morph: {}",
            if config.morph.api_key.is_some() { "configured" } else { "not configured (fallback)" }
        );
        info!(
            "   Sandbox: {}",
            if config.sandbox.enabled { "enabled" } else { "disabled (simulated)" }
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Wrap an already built configuration after validating it
    pub fn from_config(config: CodeOptimConfig) -> Result<Self, ConfigError> {
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    /// Load a specific TOML file, still honouring environment overrides
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::read_toml_file(path)?;
        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok());
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        for name in [".env", ".ENV"] {
            if Path::new(name).exists() {
                match dotenv::from_filename(name) {
                    Ok(_) => info!("Loaded {} from current directory", name),
                    Err(e) => warn!("Failed to load {}: {}", name, e),
                }
                return;
            }
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".codeoptim.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .codeoptim.env: {}", e);
                } else {
                    info!("Loaded .codeoptim.env from home directory");
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.codeoptim.toml (current directory)
    /// 2. ~/.codeoptim/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(CodeOptimConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".codeoptim.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".codeoptim").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((CodeOptimConfig::default(), None))
    }

    /// Read TOML config file
    fn read_toml_file(path: &Path) -> Result<CodeOptimConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides<F>(mut config: CodeOptimConfig, var: F) -> CodeOptimConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = var("CODEOPTIM_HOST") {
            config.server.host = host;
        }
        if let Some(port) = var("CODEOPTIM_PORT") {
            match port.parse() {
                Ok(p) => config.server.port = p,
                Err(_) => warn!("Ignoring invalid CODEOPTIM_PORT: {}", port),
            }
        }

        // Captain
        if let Some(url) = var("CAPTAIN_BASE_URL") {
            config.captain.base_url = url;
        }
        if let Some(model) = var("CAPTAIN_MODEL") {
            config.captain.model = model;
        }
        if let Some(key) = var("CAPTAIN_API_KEY") {
            config.captain.api_key = Some(key);
        }
        if let Some(org) = var("CAPTAIN_ORG_ID") {
            config.captain.org_id = Some(org);
        }

        // Morph
        if let Some(url) = var("MORPH_BASE_URL") {
            config.morph.base_url = url;
        }
        if let Some(model) = var("MORPH_MODEL") {
            config.morph.model = model;
        }
        if let Some(key) = var("MORPH_API_KEY") {
            config.morph.api_key = Some(key);
        }

        // Research and documentation
        if let Some(url) = var("EXA_BASE_URL") {
            config.research.base_url = url;
        }
        if let Some(key) = var("EXA_API_KEY") {
            config.research.api_key = Some(key);
        }
        if let Some(url) = var("FIRECRAWL_BASE_URL") {
            config.docs.base_url = url;
        }
        if let Some(key) = var("FIRECRAWL_API_KEY") {
            config.docs.api_key = Some(key);
        }

        // Sandbox
        if let Some(enabled) = var("CODEOPTIM_SANDBOX_ENABLED") {
            config.sandbox.enabled = matches!(enabled.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        // GitHub
        if let Some(base) = var("GITHUB_API_BASE") {
            config.github.api_base = base;
        }
        if let Some(token) = var("GITHUB_TOKEN") {
            config.github.token = Some(token);
        }

        // Logging
        if let Some(level) = var("CODEOPTIM_LOG_LEVEL") {
            config.logging.level = level;
        }

        config
    }

    /// Validate configuration
    fn validate_config(config: &CodeOptimConfig) -> Result<(), ConfigError> {
        if config.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }

        let experiment = &config.experiment;
        if experiment.max_variants == 0 {
            return Err(ConfigError::ValidationError(
                "experiment.max_variants must be at least 1".to_string(),
            ));
        }
        if experiment.default_variants == 0 || experiment.default_variants > experiment.max_variants
        {
            return Err(ConfigError::ValidationError(format!(
                "experiment.default_variants must be between 1 and {}",
                experiment.max_variants
            )));
        }
        if experiment.stream_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "experiment.stream_poll_interval_ms must be positive".to_string(),
            ));
        }

        if config.sandbox.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sandbox.timeout_secs must be positive".to_string(),
            ));
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log format '{}'. Must be one of: {:?}",
                config.logging.format, valid_formats
            )));
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CodeOptimConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = CodeOptimConfig::default();
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_string).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        info!("Created default config at: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CodeOptimConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.captain.model, "captain-voyager-latest");
        assert_eq!(config.morph.model, "morph-v3-fast");
        assert_eq!(config.experiment.default_variants, 50);
        assert_eq!(config.experiment.stream_poll_interval_ms, 500);
        assert!(!config.sandbox.enabled);
        assert!(config.captain.api_key.is_none());
    }

    #[test]
    fn test_config_validation() {
        let config = CodeOptimConfig::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        let mut bad_format = config.clone();
        bad_format.logging.format = "xml".to_string();
        assert!(ConfigManager::validate_config(&bad_format).is_err());

        let mut bad_variants = config.clone();
        bad_variants.experiment.default_variants = 500;
        assert!(ConfigManager::validate_config(&bad_variants).is_err());

        let mut bad_poll = config;
        bad_poll.experiment.stream_poll_interval_ms = 0;
        assert!(ConfigManager::validate_config(&bad_poll).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CAPTAIN_API_KEY", "cap-key"),
            ("CAPTAIN_ORG_ID", "org-1"),
            ("MORPH_API_KEY", "morph-key"),
            ("CODEOPTIM_PORT", "9100"),
            ("CODEOPTIM_SANDBOX_ENABLED", "true"),
            ("GITHUB_TOKEN", "gh"),
        ]
        .into_iter()
        .collect();

        let config = ConfigManager::apply_env_overrides(CodeOptimConfig::default(), |k| {
            env.get(k).map(|v| v.to_string())
        });

        assert_eq!(config.captain.api_key.as_deref(), Some("cap-key"));
        assert_eq!(config.captain.org_id.as_deref(), Some("org-1"));
        assert_eq!(config.morph.api_key.as_deref(), Some("morph-key"));
        assert_eq!(config.server.port, 9100);
        assert!(config.sandbox.enabled);
        assert_eq!(config.github.token.as_deref(), Some("gh"));
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let config = ConfigManager::apply_env_overrides(CodeOptimConfig::default(), |k| {
            (k == "CODEOPTIM_PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_partial_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[experiment]\ndefault_variants = 5\nvariant_delay_ms = 0\n\n[sandbox]\nenabled = true\n",
        )
        .unwrap();

        let config = ConfigManager::read_toml_file(&path).unwrap();
        assert_eq!(config.experiment.default_variants, 5);
        assert_eq!(config.experiment.variant_delay_ms, 0);
        assert_eq!(config.experiment.max_variants, 100);
        assert!(config.sandbox.enabled);
        assert_eq!(config.captain.base_url, "https://api.runcaptain.com/v1");
    }

    #[test]
    fn test_default_config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        ConfigManager::create_default_config(&path).unwrap();
        let config = ConfigManager::read_toml_file(&path).unwrap();
        assert_eq!(config.github.max_files, 50);
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigManager::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
