//! Rental request lifecycle and identity document verification engine.
//!
//! The [`rentals`] module holds the aggregate, the transition tables, and the
//! service that admin front ends drive. Configuration, telemetry, and the
//! top-level error type live alongside it so the HTTP service can stay thin.

pub mod config;
pub mod error;
pub mod rentals;
pub mod telemetry;
