//! Shared domain types for Keepsake.
//!
//! This crate contains the core domain types used across the Keepsake
//! backend: memory fragments, seeds, narratives, interview sessions, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod error;
pub mod fragment;
pub mod llm;
pub mod narrative;
pub mod seed;
pub mod session;
pub mod transcript;
