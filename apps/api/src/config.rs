use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// HuggingFace model id that produced both the index vectors and the
    /// live query vectors. Must match the index dimension at startup.
    pub embedding_model_id: String,
    pub index_path: PathBuf,
    pub index_mapping_path: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            embedding_model_id: std::env::var("EMBEDDING_MODEL_ID")
                .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string()),
            index_path: std::env::var("INDEX_PATH")
                .unwrap_or_else(|_| "data/processed/occupations.index".to_string())
                .into(),
            index_mapping_path: std::env::var("INDEX_MAPPING_PATH")
                .unwrap_or_else(|_| "data/processed/occupation_mapping.csv".to_string())
                .into(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
