//! Gemini REST backend: generation provider and embedder.
//!
//! Talks to the Generative Language API (`generateContent`,
//! `streamGenerateContent`, `batchEmbedContents`) with the API key in the
//! `x-goog-api-key` header.

pub mod client;
pub mod embedding;
pub mod streaming;
pub mod types;

pub use client::GeminiProvider;
pub use embedding::GeminiEmbedder;
