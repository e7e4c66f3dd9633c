use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::auth::LaunchIdentity;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::{normalize_loader_version, InstanceMetadata, LoaderType};

/// Heap bounds in MB. `min_mb` defaults to a quarter of the max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryBounds {
    #[serde(default)]
    pub min_mb: Option<u32>,
    pub max_mb: u32,
}

impl Default for MemoryBounds {
    fn default() -> Self {
        Self {
            min_mb: None,
            max_mb: 2048,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub width: u32,
    pub height: u32,
}

/// Inputs for one launch. Not mutated once the launch starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub java_path: PathBuf,
    /// Game version id, e.g. `1.20.1`.
    pub version_id: String,
    /// Instance working directory (`--gameDir`).
    pub game_dir: PathBuf,
    #[serde(default)]
    pub memory: MemoryBounds,
    #[serde(default)]
    pub extra_jvm_args: Vec<String>,
    #[serde(default)]
    pub extra_game_args: Vec<String>,
    #[serde(default)]
    pub identity: LaunchIdentity,
    #[serde(default)]
    pub window: Option<WindowGeometry>,
    #[serde(default)]
    pub loader: LoaderType,
    #[serde(default)]
    pub loader_version: Option<String>,
    #[serde(default)]
    pub instance: InstanceMetadata,
}

impl LaunchRequest {
    pub fn vanilla(
        java_path: impl Into<PathBuf>,
        version_id: &str,
        game_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            java_path: java_path.into(),
            version_id: version_id.to_string(),
            game_dir: game_dir.into(),
            memory: MemoryBounds::default(),
            extra_jvm_args: Vec::new(),
            extra_game_args: Vec::new(),
            identity: LaunchIdentity::default(),
            window: None,
            loader: LoaderType::Vanilla,
            loader_version: None,
            instance: InstanceMetadata {
                name: version_id.to_string(),
                ..InstanceMetadata::default()
            },
        }
    }

    pub fn with_loader(mut self, loader: LoaderType, loader_version: &str) -> Self {
        self.loader = loader;
        self.loader_version = Some(loader_version.to_string());
        self
    }

    pub async fn from_file(path: &Path) -> LauncherResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        let request: LaunchRequest = serde_json::from_str(&raw)
            .map_err(|e| LauncherError::InvalidRequest(format!("{}: {}", path.display(), e)))?;
        Ok(request)
    }

    pub fn validate(&self) -> LauncherResult<()> {
        if self.version_id.trim().is_empty() {
            return Err(LauncherError::InvalidRequest("versionId is empty".into()));
        }
        if self.java_path.as_os_str().is_empty() {
            return Err(LauncherError::InvalidRequest("javaPath is empty".into()));
        }
        if self.game_dir.as_os_str().is_empty() {
            return Err(LauncherError::InvalidRequest("gameDir is empty".into()));
        }
        if self.memory.max_mb == 0 {
            return Err(LauncherError::InvalidRequest("memory.maxMb must be positive".into()));
        }
        if self.loader.is_overlay() && self.loader_version().is_none() {
            return Err(LauncherError::InvalidRequest(format!(
                "loader {} requires a loaderVersion",
                self.loader
            )));
        }
        if let Some(window) = self.window {
            if window.width == 0 || window.height == 0 {
                return Err(LauncherError::InvalidRequest(format!(
                    "window geometry {}x{} is not usable",
                    window.width, window.height
                )));
            }
        }
        Ok(())
    }

    /// Normalized loader version; `None` for vanilla or when not given.
    pub fn loader_version(&self) -> Option<String> {
        if !self.loader.is_overlay() {
            return None;
        }
        self.loader_version
            .as_deref()
            .map(|raw| normalize_loader_version(&self.version_id, raw))
            .filter(|v| !v.is_empty())
    }

    /// Name passed as `--version` and `${version_name}`.
    pub fn version_name(&self) -> String {
        match self.loader_version() {
            Some(lv) => format!("{}-{}", self.version_id, lv),
            None => self.version_id.clone(),
        }
    }
}
