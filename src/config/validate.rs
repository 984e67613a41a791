// src/config/validate.rs

use anyhow::{anyhow, Context, Result};

use crate::config::model::ConfigFile;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - dataset URLs are non-empty http(s) URLs
/// - `max_attempts >= 1`
/// - `retry_delay` parses as a duration string
/// - `concurrency`, if set, is >= 1
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_urls(cfg)?;
    validate_run(cfg)?;
    Ok(())
}

fn validate_urls(cfg: &ConfigFile) -> Result<()> {
    for (field, url) in [
        ("population_url", &cfg.pipeline.population_url),
        ("gdp_url", &cfg.pipeline.gdp_url),
    ] {
        if url.trim().is_empty() {
            return Err(anyhow!("[pipeline].{field} must not be empty"));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!(
                "[pipeline].{field} must be an http(s) URL (got '{url}')"
            ));
        }
    }
    Ok(())
}

fn validate_run(cfg: &ConfigFile) -> Result<()> {
    if cfg.run.max_attempts == 0 {
        return Err(anyhow!("[run].max_attempts must be >= 1 (got 0)"));
    }

    cfg.run
        .retry_delay_duration()
        .map_err(|e| anyhow!(e))
        .context("invalid [run].retry_delay")?;

    if cfg.run.concurrency == Some(0) {
        return Err(anyhow!("[run].concurrency must be >= 1 (got 0)"));
    }

    Ok(())
}
