use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{build_http_client, DEFAULT_USER_AGENT};
use crate::core::launch::{Launcher, DEFAULT_MEMORY_FLOOR_MB};
use crate::core::resolve::{ResolverOptions, DEFAULT_FETCH_CONCURRENCY};
use crate::core::store::ArtifactStore;
use crate::core::version::{Platform, VERSION_INDEX_URL};

const APP_DIR_NAME: &str = "DRK Launcher";
const BOOTSTRAP_FILE: &str = "launcher_bootstrap.json";
const SETTINGS_FILE: &str = "launcher_settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Parallel artifact downloads.
    pub fetch_concurrency: usize,
    /// Retry batches after the first failed pass.
    pub fetch_retries: usize,
    pub memory_floor_mb: u32,
    pub version_index_url: String,
    pub user_agent: String,
    /// Searched after the vendor repositories in fallback resolution.
    pub extra_repositories: Vec<String>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            fetch_retries: 1,
            memory_floor_mb: DEFAULT_MEMORY_FLOOR_MB,
            version_index_url: VERSION_INDEX_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            extra_repositories: Vec::new(),
        }
    }
}

impl LauncherSettings {
    /// Read `<data_dir>/launcher_settings.json`. Missing or unreadable files
    /// fall back to the defaults.
    pub async fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("Cannot read {:?}, using defaults: {}", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str::<LauncherSettings>(&raw) {
            Ok(settings) => settings.normalized(),
            Err(e) => {
                warn!("Corrupt {:?}, using defaults: {}", path, e);
                Self::default()
            }
        }
    }

    pub async fn save(&self, data_dir: &Path) -> LauncherResult<()> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| LauncherError::io(data_dir, e))?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| LauncherError::io(&path, e))
    }

    pub fn resolver_options(&self, platform: Platform) -> ResolverOptions {
        ResolverOptions {
            concurrency: self.fetch_concurrency,
            retries: self.fetch_retries,
            platform,
        }
    }

    fn normalized(mut self) -> Self {
        if self.fetch_concurrency == 0 {
            warn!("fetch_concurrency 0 is invalid, using {}", DEFAULT_FETCH_CONCURRENCY);
            self.fetch_concurrency = DEFAULT_FETCH_CONCURRENCY;
        }
        if self.version_index_url.trim().is_empty() {
            self.version_index_url = VERSION_INDEX_URL.to_string();
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = DEFAULT_USER_AGENT.to_string();
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BootstrapConfig {
    data_dir: PathBuf,
}

/// Pick the data root: an explicit path, else the bootstrap redirect,
/// else `<data_dir>/DRK Launcher`.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    resolve_data_dir_from(&default_base_dir(), explicit)
}

fn resolve_data_dir_from(base: &Path, explicit: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }

    let bootstrap_path = base.join(BOOTSTRAP_FILE);
    if let Ok(raw) = std::fs::read_to_string(&bootstrap_path) {
        match serde_json::from_str::<BootstrapConfig>(&raw) {
            Ok(cfg) => return cfg.data_dir,
            Err(e) => warn!("Ignoring malformed {:?}: {}", bootstrap_path, e),
        }
    }

    base.join(APP_DIR_NAME)
}

fn default_base_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Everything a launch needs, built once per process.
pub struct LauncherState {
    pub data_dir: PathBuf,
    pub settings: LauncherSettings,
    pub http_client: Client,
    pub store: ArtifactStore,
}

impl LauncherState {
    pub async fn initialize(explicit_dir: Option<PathBuf>) -> LauncherResult<Self> {
        let data_dir = resolve_data_dir(explicit_dir);
        let settings = LauncherSettings::load(&data_dir).await;

        let http_client = build_http_client(&settings.user_agent)?;
        let downloader = Arc::new(Downloader::new(http_client.clone()));
        let store = ArtifactStore::new(&data_dir, downloader);
        store.ensure_layout().await?;

        info!("Data root: {:?}", data_dir);
        Ok(Self {
            data_dir,
            settings,
            http_client,
            store,
        })
    }

    pub fn launcher(&self) -> Launcher {
        Launcher::new(self.store.clone(), self.settings.clone())
    }
}
