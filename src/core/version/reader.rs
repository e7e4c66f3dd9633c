// ─── Manifest Reader ───
// Loads version descriptors from the store (or the remote index on a miss)
// and resolves `inheritsFrom` chains.

use std::collections::HashSet;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::index::{VersionIndex, VERSION_INDEX_URL};
use super::manifest::VersionManifest;
use super::rules::Arch;
use super::version_file::VersionJson;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::store::ArtifactStore;

/// Maximum number of `inheritsFrom` hops followed.
pub const MAX_INHERITANCE_DEPTH: usize = 8;

pub struct ManifestReader {
    store: ArtifactStore,
    index_url: String,
    arch: Arch,
    index: OnceCell<VersionIndex>,
}

impl ManifestReader {
    pub fn new(store: ArtifactStore) -> Self {
        Self::with_index_url(store, VERSION_INDEX_URL)
    }

    pub fn with_index_url(store: ArtifactStore, index_url: impl Into<String>) -> Self {
        Self {
            store,
            index_url: index_url.into(),
            arch: Arch::current(),
            index: OnceCell::new(),
        }
    }

    pub fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = arch;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Load `id` and merge every ancestor into it.
    pub async fn load(&self, id: &str) -> LauncherResult<VersionManifest> {
        let mut chain: Vec<VersionManifest> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = id.to_string();

        loop {
            if !seen.insert(current.clone()) {
                return Err(LauncherError::ManifestParse {
                    id: id.to_string(),
                    reason: format!("inheritance cycle through {}", current),
                });
            }
            if chain.len() > MAX_INHERITANCE_DEPTH {
                return Err(LauncherError::ManifestParse {
                    id: id.to_string(),
                    reason: format!(
                        "inheritance deeper than {} levels",
                        MAX_INHERITANCE_DEPTH
                    ),
                });
            }

            let manifest = self.load_shallow(&current).await?;
            let parent = manifest.inherits_from.clone();
            chain.push(manifest);

            match parent {
                Some(parent) => {
                    debug!("{} inherits from {}", current, parent);
                    current = parent;
                }
                None => break,
            }
        }

        let mut merged = match chain.pop() {
            Some(root) => root,
            None => {
                return Err(LauncherError::ManifestNotFound { id: id.to_string() });
            }
        };
        while let Some(child) = chain.pop() {
            merged = child.merged_over(merged);
        }

        if merged.main_class.trim().is_empty() {
            return Err(LauncherError::ManifestParse {
                id: id.to_string(),
                reason: "no mainClass in descriptor chain".into(),
            });
        }

        info!(
            "Loaded manifest {} ({} libraries, main {})",
            merged.id,
            merged.libraries.len(),
            merged.main_class
        );
        Ok(merged)
    }

    /// Load a single descriptor without following `inheritsFrom`.
    pub async fn load_shallow(&self, id: &str) -> LauncherResult<VersionManifest> {
        if let Some(cached) = self.read_cached(id).await? {
            return Ok(cached);
        }

        let entry_url = {
            let index = match self.index().await {
                Ok(index) => index,
                Err(e) => {
                    warn!("Version index unavailable while looking up {}: {}", id, e);
                    return Err(LauncherError::ManifestNotFound { id: id.to_string() });
                }
            };
            match index.find_version(id) {
                Some(entry) => entry.url.clone(),
                None => return Err(LauncherError::ManifestNotFound { id: id.to_string() }),
            }
        };

        let bytes = self.store.fetch_bytes(&entry_url).await.map_err(|e| {
            warn!("Descriptor download for {} failed: {}", id, e);
            LauncherError::ManifestNotFound { id: id.to_string() }
        })?;
        let raw = String::from_utf8_lossy(&bytes).into_owned();
        let manifest = self.parse(id, &raw)?;

        self.store.write_version_descriptor(id, &raw).await?;
        Ok(manifest)
    }

    /// Read `versions/<id>/<id>.json` if it exists.
    pub async fn read_cached(&self, id: &str) -> LauncherResult<Option<VersionManifest>> {
        let path = self.store.version_descriptor_path(id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LauncherError::io(path, e)),
        };
        self.parse(id, &raw).map(Some)
    }

    /// Parse raw descriptor JSON into a normalized manifest.
    pub fn parse(&self, id: &str, raw: &str) -> LauncherResult<VersionManifest> {
        let json: VersionJson =
            serde_json::from_str(raw).map_err(|e| LauncherError::ManifestParse {
                id: id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(VersionManifest::from_json(json, id, self.arch))
    }

    async fn index(&self) -> LauncherResult<&VersionIndex> {
        self.index
            .get_or_try_init(|| VersionIndex::fetch(self.store.fetcher(), &self.index_url))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::store::testing::FakeFetcher;

    const INDEX: &str = "https://meta.test/index.json";

    fn reader(fetcher: Arc<FakeFetcher>, root: &std::path::Path) -> ManifestReader {
        ManifestReader::with_index_url(ArtifactStore::new(root, fetcher), INDEX)
    }

    fn serve_index(fetcher: &FakeFetcher) {
        fetcher.serve(
            INDEX,
            serde_json::json!({"versions": [
                {"id": "1.20.1", "type": "release", "url": "https://meta.test/1.20.1.json"}
            ]})
            .to_string(),
        );
    }

    #[tokio::test]
    async fn remote_descriptor_is_cached_and_index_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        serve_index(&fetcher);
        fetcher.serve(
            "https://meta.test/1.20.1.json",
            serde_json::json!({"id": "1.20.1", "mainClass": "net.minecraft.client.main.Main"})
                .to_string(),
        );
        let reader = reader(fetcher.clone(), dir.path());

        let manifest = reader.load("1.20.1").await.unwrap();
        assert_eq!(manifest.main_class, "net.minecraft.client.main.Main");
        assert!(dir.path().join("versions/1.20.1/1.20.1.json").exists());
        assert_eq!(fetcher.request_count(), 2);

        reader.load("1.20.1").await.unwrap();
        assert_eq!(fetcher.request_count(), 2);

        let missing = reader.load("9.9.9").await.unwrap_err();
        assert!(matches!(missing, LauncherError::ManifestNotFound { id } if id == "9.9.9"));
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn overlay_merges_cached_parent() {
        let dir = tempfile::tempdir().unwrap();
        let reader = reader(Arc::new(FakeFetcher::new()), dir.path());
        let store = reader.store().clone();
        store
            .write_version_descriptor(
                "1.20.1",
                r#"{"id":"1.20.1","mainClass":"vanilla.Main","assetIndex":{"id":"5"},
                    "libraries":[{"name":"com.google.guava:guava:31.1-jre"}]}"#,
            )
            .await
            .unwrap();
        store
            .write_version_descriptor(
                "fabric-loader-0.15.0-1.20.1",
                r#"{"id":"fabric-loader-0.15.0-1.20.1","inheritsFrom":"1.20.1",
                    "mainClass":"net.fabricmc.loader.impl.launch.knot.KnotClient",
                    "libraries":[{"name":"net.fabricmc:fabric-loader:0.15.0","url":"https://maven.fabricmc.net/"}]}"#,
            )
            .await
            .unwrap();

        let merged = reader.load("fabric-loader-0.15.0-1.20.1").await.unwrap();
        assert_eq!(merged.main_class, "net.fabricmc.loader.impl.launch.knot.KnotClient");
        assert_eq!(merged.asset_index.as_deref(), Some("5"));
        assert_eq!(merged.libraries.len(), 2);
        assert!(merged.libraries[0].coordinate.starts_with("com.google.guava"));
    }

    #[tokio::test]
    async fn cycles_and_garbage_are_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let reader = reader(Arc::new(FakeFetcher::new()), dir.path());
        let store = reader.store().clone();
        store
            .write_version_descriptor("a", r#"{"id":"a","inheritsFrom":"b","mainClass":"M"}"#)
            .await
            .unwrap();
        store
            .write_version_descriptor("b", r#"{"id":"b","inheritsFrom":"a"}"#)
            .await
            .unwrap();
        store
            .write_version_descriptor("broken", "{ not json")
            .await
            .unwrap();

        assert!(matches!(
            reader.load("a").await,
            Err(LauncherError::ManifestParse { .. })
        ));
        assert!(matches!(
            reader.load("broken").await,
            Err(LauncherError::ManifestParse { .. })
        ));
    }
}
