//! Generation provider abstraction.
//!
//! `GenerationProvider` is the trait concrete LLM backends implement;
//! `BoxGenerationProvider` is the object-safe wrapper services hold.

pub mod box_provider;
pub mod provider;
