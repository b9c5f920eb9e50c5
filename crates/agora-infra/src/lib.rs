//! Infrastructure layer for Agora.
//!
//! Contains implementations of the traits defined in `agora-core`:
//! SQLite storage with split read/write pools, the Gemini HTTP provider,
//! and the configuration loader.

pub mod config;
pub mod llm;
pub mod sqlite;
