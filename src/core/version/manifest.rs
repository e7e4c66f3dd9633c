// ─── Version Manifest ───
// Normalized view of a version descriptor: one flat dependency list with
// explicit paths, URLs and rules, plus the declared launch arguments.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rules::{Arch, PlatformRule};
use super::version_file::{ArgumentValue, LibraryEntry, VersionJson};
use crate::core::maven::{MavenArtifact, MOJANG_LIBRARIES};

/// Where an entry lives and how it is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Library,
    Native,
    /// The base game jar. Stored under `versions/`.
    GameClient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
    /// `group:artifact:version[:classifier][@ext]`
    pub coordinate: String,
    /// Relative to `libraries/` (or `versions/` for the game client).
    pub path: String,
    /// `None` means produced locally (installer output), not downloadable.
    pub url: Option<String>,
    pub size: Option<u64>,
    pub sha1: Option<String>,
    #[serde(default)]
    pub rules: Vec<PlatformRule>,
    pub kind: EntryKind,
}

impl DependencyEntry {
    /// Entry for a plain Maven coordinate hosted in `repo_base`.
    pub fn from_maven(artifact: &MavenArtifact, repo_base: &str) -> Self {
        let kind = if artifact.native_classifier().is_some() {
            EntryKind::Native
        } else {
            EntryKind::Library
        };
        Self {
            coordinate: artifact.to_string(),
            path: artifact.local_path().to_string_lossy().replace('\\', "/"),
            url: Some(artifact.url(repo_base)),
            size: None,
            sha1: None,
            rules: Vec::new(),
            kind,
        }
    }

    /// File name component of `path`.
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Classifier segment of the coordinate, if any.
    pub fn classifier(&self) -> Option<&str> {
        let head = self.coordinate.split('@').next().unwrap_or(&self.coordinate);
        head.split(':').nth(3)
    }

    /// `group:artifact:` prefix of the coordinate.
    pub fn group_artifact_prefix(&self) -> String {
        let mut parts = self.coordinate.split(':');
        match (parts.next(), parts.next()) {
            (Some(g), Some(a)) => format!("{}:{}:", g, a),
            _ => self.coordinate.clone(),
        }
    }

    /// Entries with a concrete URL must be on disk before launch.
    pub fn is_required(&self) -> bool {
        self.url.is_some()
    }
}

/// One declared argument group and the rules guarding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestArgument {
    pub values: Vec<String>,
    #[serde(default)]
    pub rules: Vec<PlatformRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionManifest {
    pub id: String,
    pub main_class: String,
    pub libraries: Vec<DependencyEntry>,
    pub asset_index: Option<String>,
    pub inherits_from: Option<String>,
    pub jvm_arguments: Vec<ManifestArgument>,
    pub game_arguments: Vec<ManifestArgument>,
    /// Pre-1.13 single-string `minecraftArguments`.
    pub legacy_arguments: Option<String>,
    pub java_major: Option<u32>,
    pub version_type: Option<String>,
}

impl VersionManifest {
    /// Normalize a raw descriptor. `fallback_id` is used when the JSON omits `id`.
    pub fn from_json(raw: VersionJson, fallback_id: &str, arch: Arch) -> Self {
        let id = raw
            .id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| fallback_id.to_string());

        let mut libraries = Vec::new();

        if let Some(client) = raw.downloads.as_ref().and_then(|d| d.client.as_ref()) {
            libraries.push(DependencyEntry {
                coordinate: format!("com.mojang:minecraft:{}:client", id),
                path: format!("{id}/{id}.jar"),
                url: non_empty(Some(client.url.clone())),
                size: client.size,
                sha1: client.sha1.clone(),
                rules: Vec::new(),
                kind: EntryKind::GameClient,
            });
        }

        for lib in &raw.libraries {
            libraries.extend(library_entries(lib, arch));
        }

        let (jvm_arguments, game_arguments) = match raw.arguments {
            Some(args) => (
                args.jvm.into_iter().map(ManifestArgument::from).collect(),
                args.game.into_iter().map(ManifestArgument::from).collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        Self {
            id,
            main_class: raw.main_class.unwrap_or_default(),
            libraries,
            asset_index: raw.asset_index.map(|a| a.id).or(raw.assets),
            inherits_from: raw.inherits_from.filter(|s| !s.trim().is_empty()),
            jvm_arguments,
            game_arguments,
            legacy_arguments: raw.minecraft_arguments.filter(|s| !s.trim().is_empty()),
            java_major: raw.java_version.map(|j| j.major_version),
            version_type: raw.version_type,
        }
    }

    /// Merge this (child) manifest over `parent`.
    ///
    /// Parent fields are defaults; libraries and argument lists are
    /// concatenated parent first.
    pub fn merged_over(self, parent: VersionManifest) -> VersionManifest {
        let mut libraries = parent.libraries;
        libraries.extend(self.libraries);

        let mut jvm_arguments = parent.jvm_arguments;
        jvm_arguments.extend(self.jvm_arguments);

        let mut game_arguments = parent.game_arguments;
        game_arguments.extend(self.game_arguments);

        VersionManifest {
            id: self.id,
            main_class: if self.main_class.trim().is_empty() {
                parent.main_class
            } else {
                self.main_class
            },
            libraries,
            asset_index: self.asset_index.or(parent.asset_index),
            inherits_from: self.inherits_from,
            jvm_arguments,
            game_arguments,
            legacy_arguments: self.legacy_arguments.or(parent.legacy_arguments),
            java_major: self.java_major.or(parent.java_major),
            version_type: self.version_type.or(parent.version_type),
        }
    }

    pub fn game_client(&self) -> Option<&DependencyEntry> {
        self.libraries
            .iter()
            .find(|entry| entry.kind == EntryKind::GameClient)
    }
}

impl From<ArgumentValue> for ManifestArgument {
    fn from(value: ArgumentValue) -> Self {
        match value {
            ArgumentValue::Plain(s) => ManifestArgument {
                values: vec![s],
                rules: Vec::new(),
            },
            ArgumentValue::Conditional { rules, value } => ManifestArgument {
                values: value.into_vec(),
                rules,
            },
        }
    }
}

fn non_empty(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

/// Expand one raw library into its main artifact and any legacy natives.
fn library_entries(lib: &LibraryEntry, arch: Arch) -> Vec<DependencyEntry> {
    let rules = lib.rules.clone().unwrap_or_default();
    let mut out = Vec::new();

    let maven = match MavenArtifact::parse(&lib.name) {
        Ok(a) => Some(a),
        Err(e) => {
            debug!("Library name is not a Maven coordinate ({}): {}", lib.name, e);
            None
        }
    };

    let downloads = lib.downloads.as_ref();
    let declared = downloads.and_then(|d| d.artifact.as_ref());
    let has_legacy_natives = lib.natives.as_ref().is_some_and(|n| !n.is_empty());

    let main = match (declared, &maven) {
        (Some(artifact), _) => {
            let path = artifact
                .path
                .clone()
                .or_else(|| maven.as_ref().map(maven_path));
            path.map(|path| DependencyEntry {
                coordinate: lib.name.clone(),
                path,
                url: non_empty(artifact.url.clone()),
                size: artifact.size,
                sha1: artifact.sha1.clone(),
                rules: rules.clone(),
                kind: kind_for(maven.as_ref()),
            })
        }
        // Natives-only legacy library (e.g. lwjgl-platform).
        (None, Some(_)) if downloads.is_some() && has_legacy_natives => None,
        (None, Some(artifact)) => {
            let repo = lib
                .url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(MOJANG_LIBRARIES);
            Some(DependencyEntry {
                url: Some(artifact.url(repo)),
                size: lib.size,
                sha1: lib.sha1.clone(),
                rules: rules.clone(),
                coordinate: lib.name.clone(),
                path: maven_path(artifact),
                kind: kind_for(Some(artifact)),
            })
        }
        (None, None) => None,
    };
    out.extend(main);

    if let (Some(natives), Some(artifact)) = (&lib.natives, &maven) {
        let classifiers = downloads.and_then(|d| d.classifiers.as_ref());
        for (os_key, template) in natives {
            let classifier = template.replace("${arch}", arch.pointer_width());
            let mut native = artifact.clone();
            native.classifier = Some(classifier.clone());

            let declared = classifiers.and_then(|c| c.get(&classifier));
            let mut native_rules = rules.clone();
            native_rules.push(PlatformRule::allow().for_os(os_key));
            // An OS-specific allow must come first so the library-level rules
            // can still disallow it.
            native_rules.rotate_right(1);

            out.push(DependencyEntry {
                coordinate: native.to_string(),
                path: declared
                    .and_then(|d| d.path.clone())
                    .unwrap_or_else(|| maven_path(&native)),
                url: match declared {
                    Some(d) => non_empty(d.url.clone()),
                    None => Some(native.url(lib.url.as_deref().unwrap_or(MOJANG_LIBRARIES))),
                },
                size: declared.and_then(|d| d.size),
                sha1: declared.and_then(|d| d.sha1.clone()),
                rules: native_rules,
                kind: EntryKind::Native,
            });
        }
    }

    out
}

fn maven_path(artifact: &MavenArtifact) -> String {
    artifact.local_path().to_string_lossy().replace('\\', "/")
}

fn kind_for(artifact: Option<&MavenArtifact>) -> EntryKind {
    match artifact.and_then(|a| a.native_classifier()) {
        Some(_) => EntryKind::Native,
        None => EntryKind::Library,
    }
}
