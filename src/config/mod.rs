// src/config/mod.rs

//! Configuration: TOML model, loading, and validation.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{parse_duration, ConfigFile, PipelineSection, RunSection};
pub use validate::validate_config;
