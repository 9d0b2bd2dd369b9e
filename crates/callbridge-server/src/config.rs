//! Server configuration loading from file and environment variables.

use callbridge_pipeline::PipelineConfig;
use callbridge_voice::{
    DeepgramConfig, ElevenLabsConfig, GeminiConfig, OpenAiConfig, DEFAULT_WORKER_POOL_SIZE,
};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Where the restaurant knowledge base lives.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Engine selection and credentials.
    #[serde(default)]
    pub engines: EnginesConfig,

    /// Per-call pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL (e.g. `https://voice.example.com`).
    ///
    /// Used to build the media stream URL handed to the telephony provider.
    /// When unset, the `Host` header of the incoming request is used.
    #[serde(default)]
    pub public_url: Option<String>,

    /// Deployment label reported by `/health`.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Largest accepted HTTP request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "callbridge_pipeline=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Knowledge base location.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory holding `config.json`, `menu.json` and `faq.json`.
    #[serde(default = "default_knowledge_dir")]
    pub dir: PathBuf,
}

/// Which dialogue engine answers callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogueProvider {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl FromStr for DialogueProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown dialogue provider: {}", other)),
        }
    }
}

/// Engine selection and credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct EnginesConfig {
    #[serde(default)]
    pub dialogue_provider: DialogueProvider,

    /// Threads available to blocking engine clients.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    #[serde(default)]
    pub deepgram: DeepgramConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_knowledge_dir() -> PathBuf {
    PathBuf::from("knowledge_base")
}

fn default_worker_pool_size() -> usize {
    DEFAULT_WORKER_POOL_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
            environment: default_environment(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dir: default_knowledge_dir(),
        }
    }
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            dialogue_provider: DialogueProvider::default(),
            worker_pool_size: default_worker_pool_size(),
            deepgram: DeepgramConfig::default(),
            gemini: GeminiConfig::default(),
            openai: OpenAiConfig::default(),
            elevenlabs: ElevenLabsConfig::default(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides (see [`apply_overrides`]).
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies overrides read through `lookup`.
///
/// - `CALLBRIDGE_HOST`, `CALLBRIDGE_PORT`, `CALLBRIDGE_PUBLIC_URL`,
///   `CALLBRIDGE_ENVIRONMENT` override `server.*`
/// - `CALLBRIDGE_LOG_LEVEL`, `CALLBRIDGE_LOG_JSON` ("true" or "1") override `logging.*`
/// - `CALLBRIDGE_KNOWLEDGE_DIR` overrides `knowledge.dir`
/// - `CALLBRIDGE_DIALOGUE_PROVIDER` overrides `engines.dialogue_provider`
/// - `DEEPGRAM_API_KEY`, `GEMINI_API_KEY`, `OPENAI_API_KEY`,
///   `ELEVENLABS_API_KEY` set the engine keys
/// - `LLM_MODEL_NAME`, `LLM_TEMPERATURE` override `engines.openai.*`
/// - `ELEVENLABS_VOICE_ID` overrides `pipeline.voice.voice_id`
///
/// Values that do not parse are ignored with a warning.
pub fn apply_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(host) = var("CALLBRIDGE_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => tracing::warn!(value = %host, "ignoring invalid CALLBRIDGE_HOST"),
        }
    }
    if let Some(port) = var("CALLBRIDGE_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid CALLBRIDGE_PORT"),
        }
    }
    if let Some(url) = var("CALLBRIDGE_PUBLIC_URL") {
        config.server.public_url = Some(url);
    }
    if let Some(environment) = var("CALLBRIDGE_ENVIRONMENT") {
        config.server.environment = environment;
    }
    if let Some(level) = var("CALLBRIDGE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("CALLBRIDGE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(dir) = var("CALLBRIDGE_KNOWLEDGE_DIR") {
        config.knowledge.dir = PathBuf::from(dir);
    }
    if let Some(provider) = var("CALLBRIDGE_DIALOGUE_PROVIDER") {
        match provider.parse() {
            Ok(parsed) => config.engines.dialogue_provider = parsed,
            Err(e) => tracing::warn!("ignoring CALLBRIDGE_DIALOGUE_PROVIDER: {}", e),
        }
    }

    if let Some(key) = var("DEEPGRAM_API_KEY") {
        config.engines.deepgram.api_key = key;
    }
    if let Some(key) = var("GEMINI_API_KEY") {
        config.engines.gemini.api_key = key;
    }
    if let Some(key) = var("OPENAI_API_KEY") {
        config.engines.openai.api_key = key;
    }
    if let Some(key) = var("ELEVENLABS_API_KEY") {
        config.engines.elevenlabs.api_key = key;
    }
    if let Some(model) = var("LLM_MODEL_NAME") {
        config.engines.openai.model = model;
    }
    if let Some(temperature) = var("LLM_TEMPERATURE") {
        match temperature.parse() {
            Ok(parsed) => config.engines.openai.temperature = parsed,
            Err(_) => tracing::warn!(value = %temperature, "ignoring invalid LLM_TEMPERATURE"),
        }
    }
    if let Some(voice_id) = var("ELEVENLABS_VOICE_ID") {
        config.pipeline.voice.voice_id = voice_id;
    }
}
