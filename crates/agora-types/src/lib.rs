//! Shared domain types for Agora.
//!
//! This crate contains the core domain types used across the Agora chat
//! service: messages, channels, personas, the WebSocket wire protocol, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod message;
pub mod persona;
pub mod protocol;
