use anyhow::{anyhow, Context, Result};
use lexibot_rag::chat_service::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use lexibot_rag::document_processor::DEFAULT_CHUNK_SIZE;
use lexibot_rag::embedding_service::DEFAULT_EMBEDDING_MODEL;
use lexibot_rag::retrieval_service::DEFAULT_INDEX_PATH;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub vector_index_path: PathBuf,
    pub embedding_model_name: String,
    pub chunk_size: usize,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let openai_api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| anyhow!("OPENAI_API_KEY not found, add it to your .env"))?;

        let chunk_size: usize = parse_or(&get, "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        if chunk_size == 0 {
            return Err(anyhow!("CHUNK_SIZE must be greater than zero"));
        }

        Ok(Self {
            openai_api_key,
            openai_model: or("OPENAI_MODEL", DEFAULT_MODEL),
            openai_base_url: or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            vector_index_path: PathBuf::from(or("VECTOR_INDEX_PATH", DEFAULT_INDEX_PATH)),
            embedding_model_name: or("EMBEDDING_MODEL_NAME", DEFAULT_EMBEDDING_MODEL),
            chunk_size,
            host: or("HOST", "0.0.0.0"),
            port: parse_or(&get, "PORT", 8000)?,
            cors_origins: or("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .with_context(|| format!("invalid bind address {addr}"))
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
