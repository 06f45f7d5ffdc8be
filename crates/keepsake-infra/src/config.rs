//! Environment-driven configuration.
//!
//! Keepsake reads its settings from the environment at startup; there is
//! no config file. The Gemini API key is wrapped in `SecretString` and
//! never appears in Debug output or logs.

use std::path::PathBuf;

use secrecy::SecretString;

/// Default generation model.
const DEFAULT_GENERATION_MODEL: &str = "gemini-1.5-flash";

/// Default embedding model (768-dimensional vectors).
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Runtime configuration resolved from the environment.
pub struct Config {
    /// Directory holding the SQLite database.
    pub data_dir: PathBuf,
    /// Gemini API key. `None` disables generation and embedding; the
    /// server still runs with retrieval in recency-fallback mode.
    pub gemini_api_key: Option<SecretString>,
    /// Model for interview turns, extraction, and synthesis.
    pub generation_model: String,
    /// Model for fragment/query embeddings.
    pub embedding_model: String,
}

impl Config {
    /// Resolve configuration from the environment.
    ///
    /// - `KEEPSAKE_DATA_DIR` (default `~/.keepsake`)
    /// - `GEMINI_API_KEY`
    /// - `KEEPSAKE_GENERATION_MODEL` (default `gemini-1.5-flash`)
    /// - `KEEPSAKE_EMBEDDING_MODEL` (default `text-embedding-004`)
    pub fn from_env() -> Self {
        let data_dir = std::env::var("KEEPSAKE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".keepsake")
            });

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(SecretString::from);

        if gemini_api_key.is_none() {
            tracing::warn!(
                "GEMINI_API_KEY not set; generation and embedding are disabled, \
                 retrieval falls back to recency order"
            );
        }

        let generation_model = std::env::var("KEEPSAKE_GENERATION_MODEL")
            .unwrap_or_else(|_| DEFAULT_GENERATION_MODEL.to_string());
        let embedding_model = std::env::var("KEEPSAKE_EMBEDDING_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());

        Self {
            data_dir,
            gemini_api_key,
            generation_model,
            embedding_model,
        }
    }

    /// SQLite URL for the database inside the data directory.
    pub fn database_url(&self) -> String {
        format!(
            "sqlite://{}?mode=rwc",
            self.data_dir.join("keepsake.db").display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_shape() {
        let config = Config {
            data_dir: PathBuf::from("/tmp/keepsake-test"),
            gemini_api_key: None,
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        };
        assert_eq!(
            config.database_url(),
            "sqlite:///tmp/keepsake-test/keepsake.db?mode=rwc"
        );
    }
}
