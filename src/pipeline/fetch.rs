// src/pipeline/fetch.rs

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Download `url` and write the body to `dest`.
///
/// The write replaces any existing file, so a retried attempt cannot observe
/// a partial download from the previous one.
pub async fn fetch_to_file(client: &reqwest::Client, url: &str, dest: &Path) -> Result<()> {
    info!(%url, ?dest, "downloading dataset");

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("requesting {url}"))?
        .error_for_status()
        .with_context(|| format!("fetching {url}"))?;

    let body = response
        .text()
        .await
        .with_context(|| format!("reading response body from {url}"))?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating directory {:?}", parent))?;
    }
    tokio::fs::write(dest, &body)
        .await
        .with_context(|| format!("writing downloaded data to {:?}", dest))?;

    info!(?dest, bytes = body.len(), "dataset downloaded");
    Ok(())
}
