//! Domain layer containing the gateway's core types and policies.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, identity, errors)
//! - `agent` - Per-agent generation settings and their source
//! - `conversation` - Cached handles to remote conversation threads
//! - `routing` - Backend routes and soft circuit-breaker health
//! - `run` - Asynchronous run lifecycle, poll schedules and outcomes
//! - `stream` - Client-facing event protocol and stream metrics

pub mod agent;
pub mod conversation;
pub mod foundation;
pub mod routing;
pub mod run;
pub mod stream;
