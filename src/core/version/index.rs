// ─── Version Index ───
// The remote list of published versions (Mojang version_manifest_v2).

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::ArtifactFetcher;
use crate::core::error::LauncherResult;

pub const VERSION_INDEX_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

#[derive(Debug, Deserialize)]
pub struct VersionIndex {
    pub versions: Vec<VersionIndexEntry>,
}

/// A single entry in the index.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionIndexEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionIndex {
    pub async fn fetch(fetcher: &dyn ArtifactFetcher, url: &str) -> LauncherResult<Self> {
        info!("Fetching version index from {}", url);
        let bytes = fetcher.fetch(url).await?;
        let index: VersionIndex = serde_json::from_slice(&bytes)?;
        info!("Loaded {} versions from index", index.versions.len());
        Ok(index)
    }

    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionIndexEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_version_by_id() {
        let index: VersionIndex = serde_json::from_value(serde_json::json!({
            "latest": {"release": "1.20.4", "snapshot": "24w01a"},
            "versions": [
                {"id": "1.20.4", "type": "release", "url": "https://example.com/1.20.4.json",
                 "time": "x", "releaseTime": "x", "sha1": "abc123"},
                {"id": "1.20.1", "type": "release", "url": "https://example.com/1.20.1.json"}
            ]
        }))
        .unwrap();

        let entry = index.find_version("1.20.1").unwrap();
        assert_eq!(entry.url, "https://example.com/1.20.1.json");
        assert!(index.find_version("0.0.0").is_none());
    }
}
