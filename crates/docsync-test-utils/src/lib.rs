//! Shared test utilities for the docsync workspace.
//!
//! This crate provides standardised data directory fixtures so crate test
//! suites do not each hand-roll their own. It is a dev-dependency only and
//! never published.
//!
//! # Modules
//!
//! - [`data`]: [`TestDataDir`] builder and the [`seeded_store`] fixture
//! - [`schemas`]: sample schema and document values

pub mod data;
pub mod schemas;

pub use data::{TestDataDir, seeded_store, write_doc};
pub use schemas::{sample_users, users_schema};
