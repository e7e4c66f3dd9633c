use async_trait::async_trait;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tracing::debug;

use super::ArtifactFetcher;
use crate::core::error::{LauncherError, LauncherResult};

/// reqwest-backed fetcher shared by every store and reader.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactFetcher for Downloader {
    async fn fetch(&self, url: &str) -> LauncherResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Lowercase hex SHA-1 of an in-memory buffer.
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
