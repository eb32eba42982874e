//! Ordered task taxonomies.
//!
//! Categories, priorities and statuses are kept as live, user-ordered
//! collections over a [`store::DocumentStore`]. This module exports the core
//! components for the binary, testing and integration.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod manager;
pub mod normalizer;
pub mod projection;
pub mod seed;
pub mod stats;
pub mod store;
pub mod types;
