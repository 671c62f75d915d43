//! Domain types shared across the Mandate CRM services.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers; `infra/` converts at the edge.

pub mod id;
pub mod lead;
pub mod outreach;
