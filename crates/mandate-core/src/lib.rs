//! Cross-cutting plumbing shared by Mandate services: tracing setup, health
//! probes, request-id propagation, and serde helpers for wire timestamps.

pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
