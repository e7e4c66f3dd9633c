use std::path::Path;

use crate::core::instance::{normalize_loader_version, LoaderType};
use crate::core::store::ArtifactStore;

/// Everything a loader vendor needs to produce an overlay.
pub struct AcquisitionContext<'a> {
    pub minecraft_version: &'a str,
    /// Normalized: never carries the `<mc>-` prefix.
    pub loader_version: String,
    pub store: &'a ArtifactStore,
    /// Runtime used to execute vendor installers.
    pub java_path: &'a Path,
    /// User-configured repositories tried after the vendor's own.
    pub extra_repositories: &'a [String],
}

impl<'a> AcquisitionContext<'a> {
    pub fn new(
        minecraft_version: &'a str,
        raw_loader_version: &str,
        store: &'a ArtifactStore,
        java_path: &'a Path,
    ) -> Self {
        Self {
            minecraft_version,
            loader_version: normalize_loader_version(minecraft_version, raw_loader_version),
            store,
            java_path,
            extra_repositories: &[],
        }
    }

    pub fn with_extra_repositories(mut self, repos: &'a [String]) -> Self {
        self.extra_repositories = repos;
        self
    }

    /// `{mc}-{loader}-{loaderVersion}`, the id overlays are cached under.
    pub fn overlay_id(&self, loader: LoaderType) -> String {
        format!(
            "{}-{}-{}",
            self.minecraft_version,
            loader.as_str(),
            self.loader_version
        )
    }
}
