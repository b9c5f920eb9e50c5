//! Message dispatch and AI-response orchestration for Agora.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the real-time core built on them:
//! the connection registry, the inbound message intake pipeline, the
//! responder engine, the persona directory, and the autonomous conversation
//! scheduler. It depends only on `agora-types` -- never on `agora-infra` or
//! any database/HTTP crate.

pub mod intake;
pub mod llm;
pub mod personas;
pub mod registry;
pub mod repository;
pub mod responder;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testutil;
