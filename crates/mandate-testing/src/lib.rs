//! Test utilities for Mandate services.
//!
//! Provides a JSON fixture loader and a deterministic clock.
//! Import in tests only, never in production code.

pub mod clock;
pub mod fixture;
