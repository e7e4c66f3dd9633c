// ─── Dependency Resolver ───
// Base manifest + optional loader overlay → deduplicated, on-disk artifacts.
//
// Order of work:
//   1. overlay acquisition, merged over the base manifest
//   2. rule evaluation (per platform) and foreign natives
//   3. dedup by coordinate and basename
//   4. singleton modules keep their first occurrence
//   5. installer / server / umbrella jars are dropped
//   6. fetch whatever is still missing; dropped jars are never downloaded

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::LoaderType;
use crate::core::loaders::{acquire_overlay, AcquisitionContext, AcquisitionReport, Vendor};
use crate::core::store::ArtifactStore;
use crate::core::version::rules::is_foreign_native_classifier;
use crate::core::version::{
    is_allowed, DependencyEntry, ManifestArgument, ManifestReader, Platform, VersionManifest,
};

pub const DEFAULT_FETCH_CONCURRENCY: usize = 10;

/// Loader bootstrap/core modules that must appear at most once.
pub const SINGLETON_PREFIXES: &[&str] = &[
    "cpw.mods:bootstraplauncher:",
    "cpw.mods:modlauncher:",
    "cpw.mods:securejarhandler:",
    "net.minecraftforge:securemodules:",
    "net.minecraftforge:fmlloader:",
    "net.minecraftforge:fmlcore:",
    "net.neoforged.fancymodloader:loader:",
    "net.fabricmc:fabric-loader:",
    "org.quiltmc:quilt-loader:",
];

/// Installer, server-only and umbrella jars never belong on a client launch.
const EXCLUDED_SUFFIXES: &[&str] = &[
    "-installer.jar",
    "-server.jar",
    "-shim.jar",
    "-universal.jar",
    "-all.jar",
    "-fat.jar",
];
const EXCLUDED_PREFIXES: &[&str] = &["server-"];

/// An entry that passed rule evaluation and is confirmed on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    pub entry: DependencyEntry,
    pub path: PathBuf,
}

impl ResolvedArtifact {
    pub fn basename(&self) -> &str {
        self.entry.basename()
    }
}

/// A fetch that failed at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub coordinate: String,
    pub http_status: Option<u16>,
    /// `true` when a retry later succeeded.
    pub recovered: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub version_id: String,
    pub main_class: String,
    pub asset_index: Option<String>,
    pub artifacts: Vec<ResolvedArtifact>,
    pub jvm_arguments: Vec<ManifestArgument>,
    pub game_arguments: Vec<ManifestArgument>,
    pub legacy_arguments: Option<String>,
    pub java_major: Option<u32>,
    pub version_type: Option<String>,
    pub acquisition: Option<AcquisitionReport>,
    pub fetch_failures: Vec<FetchFailure>,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    pub concurrency: usize,
    /// Extra batches for failed fetches.
    pub retries: usize,
    pub platform: Platform,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_FETCH_CONCURRENCY,
            retries: 1,
            platform: Platform::current(),
        }
    }
}

/// The loader half of a resolution request.
pub struct OverlayRequest<'a> {
    pub loader: LoaderType,
    pub loader_version: &'a str,
    pub java_path: &'a Path,
    pub extra_repositories: &'a [String],
}

pub struct DependencyResolver<'a> {
    store: &'a ArtifactStore,
    reader: &'a ManifestReader,
    options: ResolverOptions,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(store: &'a ArtifactStore, reader: &'a ManifestReader) -> Self {
        Self {
            store,
            reader,
            options: ResolverOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn resolve(
        &self,
        base: VersionManifest,
        overlay: Option<OverlayRequest<'_>>,
    ) -> LauncherResult<Resolution> {
        let minecraft_version = base.id.clone();

        let (manifest, acquisition) = match overlay.and_then(|o| Vendor::for_loader(o.loader).map(|v| (v, o))) {
            Some((vendor, request)) => {
                let ctx = AcquisitionContext::new(
                    &minecraft_version,
                    request.loader_version,
                    self.store,
                    request.java_path,
                )
                .with_extra_repositories(request.extra_repositories);
                let acquired = acquire_overlay(&vendor, &ctx, self.reader).await?;
                (acquired.manifest.merged_over(base), Some(acquired.report))
            }
            None => (base, None),
        };

        let declared = manifest.libraries.len();
        let applicable = self.applicable_entries(&manifest.libraries);
        let entries = exclude_unwanted(dedup_singletons(dedup_entries(applicable)));
        debug!(
            "{} of {} declared entries survive rules and dedup",
            entries.len(),
            declared
        );

        let fetch_failures = self.fetch_missing(&entries).await?;

        let mut artifacts = Vec::with_capacity(entries.len());
        let mut missing = Vec::new();
        for entry in entries {
            if self.store.is_present(&entry).await {
                let path = self.store.path_for(&entry);
                artifacts.push(ResolvedArtifact { entry, path });
            } else if entry.is_required() {
                missing.push(entry.coordinate);
            } else {
                warn!(
                    "Skipping {}: not on disk and not downloadable",
                    entry.coordinate
                );
            }
        }
        if !missing.is_empty() {
            missing.sort();
            return Err(LauncherError::ResolutionIncomplete { missing });
        }

        info!(
            "Resolved {} artifacts for {}",
            artifacts.len(),
            manifest.id
        );

        Ok(Resolution {
            version_id: manifest.id,
            main_class: manifest.main_class,
            asset_index: manifest.asset_index,
            artifacts,
            jvm_arguments: manifest.jvm_arguments,
            game_arguments: manifest.game_arguments,
            legacy_arguments: manifest.legacy_arguments,
            java_major: manifest.java_major,
            version_type: manifest.version_type,
            acquisition,
            fetch_failures,
        })
    }

    /// Rule evaluation plus the foreign-natives exception.
    fn applicable_entries(&self, entries: &[DependencyEntry]) -> Vec<DependencyEntry> {
        let platform = self.options.platform;
        entries
            .iter()
            .filter(|entry| {
                if !is_allowed(&entry.rules, platform) {
                    debug!("Skipping {} (platform rule)", entry.coordinate);
                    return false;
                }
                if entry
                    .classifier()
                    .is_some_and(|c| is_foreign_native_classifier(c, platform))
                {
                    debug!("Skipping {} (foreign natives)", entry.coordinate);
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }

    /// Fetch missing or size-mismatched entries; one extra batch per retry.
    async fn fetch_missing(&self, entries: &[DependencyEntry]) -> LauncherResult<Vec<FetchFailure>> {
        let mut pending = Vec::new();
        for entry in entries {
            if entry.is_required() && !self.store.is_present(entry).await {
                pending.push(entry);
            }
        }
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            "Fetching {} missing artifacts (concurrency {})",
            pending.len(),
            self.options.concurrency
        );

        let mut failures: Vec<FetchFailure> = Vec::new();
        for attempt in 0..=self.options.retries {
            if pending.is_empty() {
                break;
            }
            if attempt > 0 {
                info!("Retrying {} failed fetches", pending.len());
            }

            let results: Vec<_> = stream::iter(pending.iter().copied())
                .map(|entry| async move { (entry, self.store.fetch(entry).await) })
                .buffer_unordered(self.options.concurrency.max(1))
                .collect()
                .await;

            let mut still_failing = Vec::new();
            for (entry, result) in results {
                match result {
                    Ok(_) => {
                        for failure in failures.iter_mut().filter(|f| f.coordinate == entry.coordinate) {
                            failure.recovered = true;
                        }
                    }
                    Err(e) => {
                        warn!("{}", e);
                        failures.push(FetchFailure {
                            coordinate: entry.coordinate.clone(),
                            http_status: e.http_status(),
                            recovered: false,
                        });
                        still_failing.push(entry);
                    }
                }
            }
            pending = still_failing;
        }

        if !pending.is_empty() {
            let mut missing: Vec<String> = pending.iter().map(|e| e.coordinate.clone()).collect();
            missing.sort();
            return Err(LauncherError::ResolutionIncomplete { missing });
        }

        Ok(failures)
    }
}

// ── Pure steps ──

fn basename_key(name: &str) -> String {
    if cfg!(target_os = "windows") {
        name.to_lowercase()
    } else {
        name.to_string()
    }
}

/// Drop later entries repeating a coordinate or a basename.
pub fn dedup_entries(entries: Vec<DependencyEntry>) -> Vec<DependencyEntry> {
    let mut coordinates = HashSet::new();
    let mut basenames = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            let fresh_coordinate = coordinates.insert(entry.coordinate.clone());
            let fresh_basename = basenames.insert(basename_key(entry.basename()));
            if !(fresh_coordinate && fresh_basename) {
                debug!("Dropping duplicate {}", entry.coordinate);
            }
            fresh_coordinate && fresh_basename
        })
        .collect()
}

/// Keep only the first entry per singleton `group:artifact` prefix.
pub fn dedup_singletons(entries: Vec<DependencyEntry>) -> Vec<DependencyEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            // Natives and other classifiers of a singleton are separate jars.
            if entry.classifier().is_some() {
                return true;
            }
            let prefix = entry.group_artifact_prefix();
            if !SINGLETON_PREFIXES.contains(&prefix.as_str()) {
                return true;
            }
            let first = seen.insert(prefix);
            if !first {
                debug!("Dropping second copy of singleton {}", entry.coordinate);
            }
            first
        })
        .collect()
}

pub fn is_excluded_basename(basename: &str) -> bool {
    let lower = basename.to_ascii_lowercase();
    EXCLUDED_SUFFIXES.iter().any(|s| lower.ends_with(s))
        || EXCLUDED_PREFIXES.iter().any(|p| lower.starts_with(p))
}

pub fn exclude_unwanted(entries: Vec<DependencyEntry>) -> Vec<DependencyEntry> {
    entries
        .into_iter()
        .filter(|entry| {
            let excluded = is_excluded_basename(entry.basename());
            if excluded {
                debug!("Excluding {}", entry.basename());
            }
            !excluded
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::core::downloader::ArtifactFetcher;
    use crate::core::store::testing::FakeFetcher;
    use crate::core::version::{Arch, EntryKind, OsName, PlatformRule};

    fn lib(coordinate: &str, path: &str, url: Option<&str>) -> DependencyEntry {
        DependencyEntry {
            coordinate: coordinate.into(),
            path: path.into(),
            url: url.map(str::to_string),
            size: None,
            sha1: None,
            rules: vec![],
            kind: EntryKind::Library,
        }
    }

    fn manifest(libraries: Vec<DependencyEntry>) -> VersionManifest {
        VersionManifest {
            id: "1.20.1".into(),
            main_class: "net.minecraft.client.main.Main".into(),
            libraries,
            asset_index: Some("5".into()),
            ..VersionManifest::default()
        }
    }

    fn linux() -> ResolverOptions {
        ResolverOptions {
            platform: Platform::new(OsName::Linux, Arch::X86_64),
            ..ResolverOptions::default()
        }
    }

    #[test]
    fn same_basename_under_different_coordinates_resolves_once() {
        let entries = vec![
            lib(
                "com.google.guava:guava:31.0.1-jre",
                "com/google/guava/guava/31.0.1-jre/guava-31.0.1-jre.jar",
                None,
            ),
            lib(
                "com.google:guava-relocated:31.0.1-jre",
                "com/google/relocated/31.0.1-jre/guava-31.0.1-jre.jar",
                None,
            ),
        ];
        let kept = dedup_entries(entries);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].coordinate, "com.google.guava:guava:31.0.1-jre");
    }

    #[test]
    fn singleton_keeps_first_occurrence() {
        let entries = vec![
            lib("cpw.mods:modlauncher:10.0.9", "a/modlauncher-10.0.9.jar", None),
            lib("cpw.mods:modlauncher:9.1.3", "b/modlauncher-9.1.3.jar", None),
            lib("org.lwjgl:lwjgl:3.3.1", "c/lwjgl-3.3.1.jar", None),
        ];
        let kept = dedup_singletons(entries);
        let coords: Vec<_> = kept.iter().map(|e| e.coordinate.as_str()).collect();
        assert_eq!(coords, vec!["cpw.mods:modlauncher:10.0.9", "org.lwjgl:lwjgl:3.3.1"]);
    }

    #[test]
    fn umbrella_and_installer_jars_are_excluded_but_combined_client_is_not() {
        assert!(is_excluded_basename("forge-1.20.1-47.2.0-installer.jar"));
        assert!(is_excluded_basename("forge-1.20.1-47.2.0-universal.jar"));
        assert!(is_excluded_basename("server-1.20.1-srg.jar"));
        assert!(is_excluded_basename("something-all.jar"));
        assert!(!is_excluded_basename("forge-1.20.1-47.2.0-client.jar"));
        assert!(!is_excluded_basename("guava-31.1-jre.jar"));
    }

    #[tokio::test]
    async fn second_resolution_fetches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.serve("https://repo.test/guava.jar", b"guava".to_vec());
        fetcher.serve("https://repo.test/lwjgl.jar", b"lwjgl".to_vec());
        let store = ArtifactStore::new(dir.path(), fetcher.clone());
        let reader = ManifestReader::new(store.clone());
        let resolver = DependencyResolver::new(&store, &reader).with_options(linux());

        let base = manifest(vec![
            lib("com.google.guava:guava:31.1-jre", "g/guava-31.1-jre.jar", Some("https://repo.test/guava.jar")),
            lib("org.lwjgl:lwjgl:3.3.1", "l/lwjgl-3.3.1.jar", Some("https://repo.test/lwjgl.jar")),
        ]);

        let first = resolver.resolve(base.clone(), None).await.unwrap();
        assert_eq!(first.artifacts.len(), 2);
        assert_eq!(fetcher.request_count(), 2);

        let second = resolver.resolve(base, None).await.unwrap();
        assert_eq!(second.artifacts, first.artifacts);
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn missing_required_entry_fails_after_retry() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        let store = ArtifactStore::new(dir.path(), fetcher.clone());
        let reader = ManifestReader::new(store.clone());
        let resolver = DependencyResolver::new(&store, &reader).with_options(linux());

        let base = manifest(vec![
            lib("org.lwjgl:lwjgl:3.3.1", "l/lwjgl-3.3.1.jar", Some("https://repo.test/lwjgl.jar")),
            lib("local:only:1", "x/only-1.jar", None),
        ]);

        let err = resolver.resolve(base, None).await.unwrap_err();
        match err {
            LauncherError::ResolutionIncomplete { missing } => {
                assert_eq!(missing, vec!["org.lwjgl:lwjgl:3.3.1".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn flaky_fetch_recovers_in_retry_batch() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.serve("https://repo.test/lwjgl.jar", b"lwjgl".to_vec());
        fetcher.fail_first("https://repo.test/lwjgl.jar", 1);
        let store = ArtifactStore::new(dir.path(), fetcher.clone());
        let reader = ManifestReader::new(store.clone());
        let resolver = DependencyResolver::new(&store, &reader).with_options(linux());

        let resolution = resolver
            .resolve(
                manifest(vec![lib(
                    "org.lwjgl:lwjgl:3.3.1",
                    "l/lwjgl-3.3.1.jar",
                    Some("https://repo.test/lwjgl.jar"),
                )]),
                None,
            )
            .await
            .unwrap();

        assert_eq!(resolution.artifacts.len(), 1);
        assert_eq!(fetcher.request_count(), 2);
        assert_eq!(
            resolution.fetch_failures,
            vec![FetchFailure {
                coordinate: "org.lwjgl:lwjgl:3.3.1".into(),
                http_status: Some(503),
                recovered: true,
            }]
        );
    }

    #[tokio::test]
    async fn wrong_size_on_disk_is_refetched_and_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.serve("https://repo.test/guava.jar", b"guava".to_vec());
        let store = ArtifactStore::new(dir.path(), fetcher.clone());
        let reader = ManifestReader::new(store.clone());
        let resolver = DependencyResolver::new(&store, &reader).with_options(linux());

        let mut guava = lib(
            "com.google.guava:guava:31.1-jre",
            "g/guava-31.1-jre.jar",
            Some("https://repo.test/guava.jar"),
        );
        guava.size = Some(5);
        let stale = store.path_for(&guava);
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, b"old").unwrap();

        let resolution = resolver.resolve(manifest(vec![guava]), None).await.unwrap();
        assert_eq!(fetcher.request_count(), 1);
        assert_eq!(resolution.artifacts.len(), 1);
        assert_eq!(std::fs::read(&stale).unwrap(), b"guava");
    }

    #[tokio::test]
    async fn body_shorter_than_declared_size_is_reported_missing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.serve("https://repo.test/guava.jar", b"abc".to_vec());
        let store = ArtifactStore::new(dir.path(), fetcher.clone());
        let reader = ManifestReader::new(store.clone());
        let resolver = DependencyResolver::new(&store, &reader).with_options(linux());

        let mut guava = lib(
            "com.google.guava:guava:31.1-jre",
            "g/guava-31.1-jre.jar",
            Some("https://repo.test/guava.jar"),
        );
        guava.size = Some(999);

        match resolver.resolve(manifest(vec![guava]), None).await.unwrap_err() {
            LauncherError::ResolutionIncomplete { missing } => {
                assert_eq!(missing, vec!["com.google.guava:guava:31.1-jre".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
        // First pass plus one retry batch.
        assert_eq!(fetcher.request_count(), 2);
    }

    /// Counts fetches in flight and remembers the peak.
    #[derive(Default)]
    struct InFlightFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ArtifactFetcher for InFlightFetcher {
        async fn fetch(&self, _url: &str) -> LauncherResult<Vec<u8>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(b"jar".to_vec())
        }
    }

    #[tokio::test]
    async fn fetches_never_exceed_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(InFlightFetcher::default());
        let store = ArtifactStore::new(dir.path(), fetcher.clone());
        let reader = ManifestReader::new(store.clone());
        let resolver = DependencyResolver::new(&store, &reader).with_options(ResolverOptions {
            concurrency: 2,
            ..linux()
        });

        let libraries = (0..6)
            .map(|i| {
                lib(
                    &format!("org.example:lib{i}:1.0"),
                    &format!("org/example/lib{i}-1.0.jar"),
                    Some(&format!("https://repo.test/lib{i}.jar")),
                )
            })
            .collect();

        let resolution = resolver.resolve(manifest(libraries), None).await.unwrap();
        assert_eq!(resolution.artifacts.len(), 6);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rule_excluded_entries_are_never_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        let store = ArtifactStore::new(dir.path(), fetcher.clone());
        let reader = ManifestReader::new(store.clone());
        let resolver = DependencyResolver::new(&store, &reader).with_options(linux());

        let mut mac_only = lib("ca.weblite:java-objc-bridge:1.1", "c/java-objc-bridge-1.1.jar", Some("https://repo.test/objc.jar"));
        mac_only.rules = vec![PlatformRule::allow().for_os("osx")];
        let windows_natives = lib(
            "org.lwjgl:lwjgl:3.3.1:natives-windows",
            "l/lwjgl-3.3.1-natives-windows.jar",
            Some("https://repo.test/win.jar"),
        );
        let installer = lib(
            "net.minecraftforge:forge:1.20.1-47.2.0:installer",
            "f/forge-1.20.1-47.2.0-installer.jar",
            Some("https://repo.test/installer.jar"),
        );

        let resolution = resolver
            .resolve(manifest(vec![mac_only, windows_natives, installer]), None)
            .await
            .unwrap();
        assert!(resolution.artifacts.is_empty());
        assert_eq!(fetcher.request_count(), 0);
    }
}
