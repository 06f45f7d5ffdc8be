//! Infrastructure implementations for Keepsake.
//!
//! SQLite repositories (sqlx, split reader/writer pool), the Gemini REST
//! generation provider and embedder, and environment-driven configuration.

pub mod config;
pub mod llm;
pub mod sqlite;
