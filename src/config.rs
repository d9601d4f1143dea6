use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// A pair of values violated a cross-field constraint.
    #[error("Invalid configuration: {0}")]
    Constraint(String),
}

/// Runtime configuration for the pdfsilo server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the object-store gateway that receives index artifacts.
    pub object_store_url: String,
    /// Destination bucket for uploaded artifacts.
    pub bucket_name: String,
    /// Optional API key required by the object store.
    pub object_store_api_key: Option<String>,
    /// Embedding provider dialect used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Base URL of the embedding endpoint.
    pub embedding_url: String,
    /// Optional bearer token for hosted embedding providers.
    pub embedding_api_key: Option<String>,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Chunk window size in characters.
    pub chunk_size: usize,
    /// Overlap carried between adjacent chunks, in characters.
    pub chunk_overlap: usize,
    /// Local scratch directory for per-request files.
    pub scratch_dir: PathBuf,
    /// Remote key prefix for the uploaded index artifacts.
    pub artifact_key_prefix: String,
    /// When true, remote artifact keys embed the request identifier.
    pub namespace_remote_artifacts: bool,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Maximum accepted multipart upload size in bytes.
    pub max_upload_bytes: usize,
}

/// Supported embedding endpoint dialects.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime (`/api/embed`).
    Ollama,
    /// OpenAI-compatible embeddings API (`/embeddings`).
    OpenAI,
}

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            object_store_url: load_env("OBJECT_STORE_URL")?,
            bucket_name: load_env("BUCKET_NAME")?,
            object_store_api_key: load_env_optional("OBJECT_STORE_API_KEY"),
            embedding_provider: load_env("EMBEDDING_PROVIDER")?.parse().map_err(|()| {
                ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string())
            })?,
            embedding_url: load_env("EMBEDDING_URL")?,
            embedding_api_key: load_env_optional("EMBEDDING_API_KEY"),
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            chunk_size: load_env_parsed("CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE),
            chunk_overlap: load_env_parsed("CHUNK_OVERLAP")?.unwrap_or(DEFAULT_CHUNK_OVERLAP),
            scratch_dir: load_env_optional("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp")),
            artifact_key_prefix: load_env_optional("ARTIFACT_KEY_PREFIX")
                .unwrap_or_else(|| "my_index".to_string()),
            namespace_remote_artifacts: load_env_flag("NAMESPACE_REMOTE_ARTIFACTS")?
                .unwrap_or(false),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            max_upload_bytes: load_env_parsed("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dimension == 0 {
            return Err(ConfigError::Constraint(
                "EMBEDDING_DIMENSION must be greater than zero".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Constraint(
                "CHUNK_SIZE must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Constraint(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed(key: &str) -> Result<Option<usize>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn load_env_flag(key: &str) -> Result<Option<bool>, ConfigError> {
    load_env_optional(key)
        .map(|value| match value.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        })
        .transpose()
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        object_store_url = %config.object_store_url,
        bucket = %config.bucket_name,
        embedding_provider = ?config.embedding_provider,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
