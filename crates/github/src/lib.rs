pub mod models;
pub mod webhook;

use std::{path::Path, pin::pin, time::Duration};

use anyhow::{Context, Result};
use futures_util::TryStreamExt;
use preview_sync_core::{SyncError, config::GitHubConfig};
use reqwest::{Client, header};
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

use crate::models::{Artifact, ArtifactList};

/// Name of the artifact holding the rendered site.
pub const ARTIFACT_NAME: &str = "generated_html";
/// Applies to every outbound request, connect through body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_BUFFER_SIZE: usize = 8 * 1024;
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the GitHub Actions artifact endpoints.
#[derive(Clone)]
pub struct GitHub {
    client: Client,
    token: String,
}

impl GitHub {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, token: config.token.clone() })
    }

    /// Fetch the artifact listing of a workflow run. The request is sent
    /// without credentials.
    pub async fn list_artifacts(&self, url: &Url) -> Result<ArtifactList, SyncError> {
        tracing::debug!("Fetching artifact listing {url}");
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| SyncError::Upstream(format!("Failed to fetch artifact listing: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Upstream(format!("Artifact listing returned HTTP {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| SyncError::Upstream(format!("Failed to decode artifact listing: {e}")))
    }

    /// Stream an artifact archive to `dest`, returning the number of bytes
    /// written. Nothing is written unless the response is a success.
    pub async fn download_artifact(&self, artifact: &Artifact, dest: &Path) -> Result<u64, SyncError> {
        tracing::debug!("Downloading artifact {} from {}", artifact.name, artifact.download_url);
        let response = self
            .client
            .get(artifact.download_url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SyncError::Upstream(format!("Failed to download {}: {e}", artifact.name)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Upstream(format!(
                "Artifact {} download returned HTTP {status}",
                artifact.name
            )));
        }

        let write_err =
            |e: std::io::Error| SyncError::Filesystem(format!("Failed to write {}: {e}", dest.display()));
        let file = tokio::fs::File::create(dest).await.map_err(write_err)?;
        let mut writer = BufWriter::with_capacity(DOWNLOAD_BUFFER_SIZE, file);
        let mut stream = pin!(response.bytes_stream());
        let mut written = 0u64;
        while let Some(chunk) = stream
            .try_next()
            .await
            .map_err(|e| SyncError::Upstream(format!("Failed to download {}: {e}", artifact.name)))?
        {
            writer.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(write_err)?;
        Ok(written)
    }
}
