// src/errors.rs

//! Crate-wide error aliases.
//!
//! Application-level plumbing uses `anyhow`; the typed graph-construction
//! errors live in [`crate::dag::graph::GraphError`].

pub use anyhow::{Error, Result};
