//! Configuration for the slideforge service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// LLM (chat completion) configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embedding backend configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// File storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content)
                    .map_err(|e| Error::config(format!("Invalid config file: {}", e)))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("GROQ_MODEL") {
            self.llm.model = model;
        }
        if let Ok(host) = std::env::var("BACKEND_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("BACKEND_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(url) = std::env::var("EMBEDDINGS_URL") {
            self.embeddings.base_url = url;
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// LLM (chat completion) configuration
///
/// Targets an OpenAI-compatible chat completions API (Groq by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL
    pub base_url: String,
    /// API key (from GROQ_API_KEY)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Generation model name
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            model: "llama-3.3-70b-versatile".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Embedding backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the dense embedding service (Ollama-compatible)
    pub base_url: String,
    /// Dense embedding model name
    pub model: String,
    /// Dense embedding dimensions (384 for all-minilm)
    pub dimensions: usize,
    /// Maximum dimensions of the lexical fallback space
    pub fallback_dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            fallback_dimensions: 512,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

/// Retrieval configuration for chat grounding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per chat turn
    pub top_k: usize,
    /// Token budget for the assembled context window
    pub max_context_tokens: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            max_context_tokens: 1500,
        }
    }
}

/// File storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for uploaded documents
    pub upload_dir: PathBuf,
    /// Directory for generated decks
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.embeddings.fallback_dimensions, 512);
        assert!(config.chunking.chunk_overlap < config.chunking.chunk_size);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.llm.model, config.llm.model);
    }
}
