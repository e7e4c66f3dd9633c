// ─── Artifact Store ───
// On-disk cache of libraries, version descriptors and installers.
// Constructed once and passed by reference; never global.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::downloader::{sha1_hex, ArtifactFetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::{DependencyEntry, EntryKind};

#[derive(Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    fetcher: Arc<dyn ArtifactFetcher>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self {
            root: root.into(),
            fetcher,
        }
    }

    // ── Layout ──────────────────────────────────────────

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn installers_dir(&self) -> PathBuf {
        self.root.join("installers")
    }

    pub fn natives_dir(&self) -> PathBuf {
        self.root.join("natives")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn game_logs_dir(&self) -> PathBuf {
        self.root.join("logs").join("games")
    }

    /// Create every top-level directory.
    pub async fn ensure_layout(&self) -> LauncherResult<()> {
        for dir in [
            self.libraries_dir(),
            self.versions_dir(),
            self.installers_dir(),
            self.natives_dir(),
            self.assets_dir(),
            self.game_logs_dir(),
        ] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| LauncherError::io(&dir, e))?;
        }
        Ok(())
    }

    pub fn fetcher(&self) -> &dyn ArtifactFetcher {
        self.fetcher.as_ref()
    }

    // ── Entries ─────────────────────────────────────────

    /// Absolute path for an entry.
    pub fn path_for(&self, entry: &DependencyEntry) -> PathBuf {
        let base = match entry.kind {
            EntryKind::GameClient => self.versions_dir(),
            EntryKind::Library | EntryKind::Native => self.libraries_dir(),
        };
        base.join(&entry.path)
    }

    /// File exists and, when a size is declared, matches it.
    pub async fn is_present(&self, entry: &DependencyEntry) -> bool {
        match tokio::fs::metadata(self.path_for(entry)).await {
            Ok(meta) if meta.is_file() => entry.size.map_or(true, |size| meta.len() == size),
            _ => false,
        }
    }

    /// Download an entry, overwriting whatever is on disk.
    pub async fn fetch(&self, entry: &DependencyEntry) -> LauncherResult<PathBuf> {
        let fetch_failed = |http_status: Option<u16>| LauncherError::DependencyFetchFailed {
            coordinate: entry.coordinate.clone(),
            http_status,
        };

        let url = entry.url.as_deref().ok_or_else(|| fetch_failed(None))?;
        let dest = self.path_for(entry);

        match self
            .fetch_verified(url, &dest, entry.sha1.as_deref(), entry.size)
            .await
        {
            Ok(()) => {
                debug!("Fetched {} -> {:?}", entry.coordinate, dest);
                Ok(dest)
            }
            Err(e) => {
                debug!("Fetch of {} failed: {}", entry.coordinate, e);
                Err(fetch_failed(e.http_status()))
            }
        }
    }

    // ── Raw transfers ───────────────────────────────────

    /// Fetch metadata into memory.
    pub async fn fetch_bytes(&self, url: &str) -> LauncherResult<Vec<u8>> {
        self.fetcher.fetch(url).await
    }

    /// Fetch `url` to `dest`, validating SHA-1 before anything is written.
    pub async fn fetch_to(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<()> {
        self.fetch_verified(url, dest, sha1_expected, None).await
    }

    /// `fetch_to` plus a declared-size check; a short or long body is
    /// rejected before it reaches disk.
    async fn fetch_verified(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
        size_expected: Option<u64>,
    ) -> LauncherResult<()> {
        let bytes = self.fetcher.fetch(url).await?;

        if let Some(expected) = size_expected {
            let actual = bytes.len() as u64;
            if actual != expected {
                return Err(LauncherError::SizeMismatch {
                    path: dest.to_path_buf(),
                    expected,
                    actual,
                });
            }
        }

        if let Some(expected) = sha1_expected.filter(|s| !s.is_empty()) {
            let actual = sha1_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(LauncherError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        write_file(dest, &bytes).await
    }

    // ── Version descriptors ─────────────────────────────

    /// `versions/<id>/<id>.json`
    pub fn version_descriptor_path(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id).join(format!("{}.json", id))
    }

    pub async fn write_version_descriptor(&self, id: &str, raw: &str) -> LauncherResult<PathBuf> {
        let path = self.version_descriptor_path(id);
        write_file(&path, raw.as_bytes()).await?;
        debug!("Cached version descriptor {} at {:?}", id, path);
        Ok(path)
    }
}

/// Create parent directories and write `bytes`, closing the handle before
/// returning.
pub(crate) async fn write_file(dest: &Path, bytes: &[u8]) -> LauncherResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }

    {
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;
        file.flush().await.map_err(|e| LauncherError::io(dest, e))?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::core::downloader::ArtifactFetcher;
    use crate::core::error::{LauncherError, LauncherResult};

    /// In-memory fetcher that counts every request.
    #[derive(Default)]
    pub struct FakeFetcher {
        responses: Mutex<HashMap<String, Vec<u8>>>,
        /// Remaining 503 answers per URL before the real body is served.
        flaky: Mutex<HashMap<String, usize>>,
        requests: AtomicUsize,
        log: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), body.into());
        }

        /// Answer the first `times` requests for `url` with a 503.
        pub fn fail_first(&self, url: &str, times: usize) {
            self.flaky.lock().unwrap().insert(url.to_string(), times);
        }

        pub fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }

        pub fn requested(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ArtifactFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> LauncherResult<Vec<u8>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(url.to_string());
            if let Some(remaining) = self.flaky.lock().unwrap().get_mut(url) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(LauncherError::DownloadFailed {
                        url: url.to_string(),
                        status: 503,
                    });
                }
            }
            self.responses
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| LauncherError::DownloadFailed {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }
}
