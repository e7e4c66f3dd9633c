// ─── Classpath / Module-Path Partitioner ───
// Decides, per resolved artifact, whether it is loaded as a named module or
// from the legacy classpath.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::instance::LoaderType;
use crate::core::resolve::ResolvedArtifact;
use crate::core::version::EntryKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Module,
    Classpath,
}

/// How a table row matches a lowercase basename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePattern {
    Prefix(&'static str),
    Suffix(&'static str),
    Contains(&'static str),
}

impl NamePattern {
    pub fn matches(self, basename: &str) -> bool {
        match self {
            NamePattern::Prefix(p) => basename.starts_with(p),
            NamePattern::Suffix(s) => basename.ends_with(s),
            NamePattern::Contains(c) => basename.contains(c),
        }
    }
}

/// Forge/NeoForge classification, first match wins. Unmatched → classpath.
pub const CLASSIFICATION_TABLE: &[(NamePattern, Placement)] = &[
    // Game jars stay on the classpath even if a keyword below matches.
    (NamePattern::Prefix("client-"), Placement::Classpath),
    (NamePattern::Suffix("-official.jar"), Placement::Classpath),
    (NamePattern::Prefix("minecraft-"), Placement::Classpath),
    // Core loader
    (NamePattern::Contains("fmlloader"), Placement::Module),
    (NamePattern::Contains("fmlcore"), Placement::Module),
    (NamePattern::Contains("fmlearlydisplay"), Placement::Module),
    // Bootstrap
    (NamePattern::Contains("bootstraplauncher"), Placement::Module),
    (NamePattern::Contains("modlauncher"), Placement::Module),
    // Secure jar handling
    (NamePattern::Contains("securejarhandler"), Placement::Module),
    (NamePattern::Contains("securemodules"), Placement::Module),
    (NamePattern::Contains("jarjar"), Placement::Module),
    // Bytecode manipulation
    (NamePattern::Prefix("asm-"), Placement::Module),
    // Logging
    (NamePattern::Prefix("log4j-"), Placement::Module),
    (NamePattern::Prefix("slf4j-"), Placement::Module),
];

/// Without these a Forge-like module layer will not boot.
const CRITICAL_MODULES: &[(&str, &str)] = &[
    ("modlauncher", "modlauncher"),
    ("bootstrap", "bootstraplauncher"),
    ("log4j-core", "log4j-core"),
    ("log4j-api", "log4j-api"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClasspathPlan {
    pub module_path: Vec<PathBuf>,
    pub classpath: Vec<PathBuf>,
    pub main_class: String,
}

impl ClasspathPlan {
    pub fn is_empty(&self) -> bool {
        self.module_path.is_empty() && self.classpath.is_empty()
    }
}

pub fn classify(basename: &str) -> Placement {
    let lower = basename.to_ascii_lowercase();
    CLASSIFICATION_TABLE
        .iter()
        .find(|(pattern, _)| pattern.matches(&lower))
        .map(|(_, placement)| *placement)
        .unwrap_or(Placement::Classpath)
}

/// `forge-<v>-client.jar` / `neoforge-<v>-client.jar`.
pub fn is_combined_client(basename: &str) -> bool {
    let lower = basename.to_ascii_lowercase();
    (lower.starts_with("forge-") || lower.starts_with("neoforge-")) && lower.ends_with("-client.jar")
}

fn expected_client_pattern(loader: LoaderType) -> &'static str {
    match loader {
        LoaderType::NeoForge => "neoforge-*-client.jar",
        _ => "forge-*-client.jar",
    }
}

fn basename_of(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if cfg!(target_os = "windows") {
        name.to_lowercase()
    } else {
        name
    }
}

/// Build the plan. Pure: same inputs, same plan.
pub fn partition(artifacts: &[ResolvedArtifact], loader: LoaderType, main_class: &str) -> ClasspathPlan {
    let artifacts = dedup_by_basename(artifacts);

    let plan = if loader.is_forge_like() {
        partition_modular(&artifacts, loader)
    } else {
        partition_flat(&artifacts)
    };

    ClasspathPlan {
        main_class: main_class.to_string(),
        ..plan
    }
}

fn dedup_by_basename(artifacts: &[ResolvedArtifact]) -> Vec<&ResolvedArtifact> {
    let mut seen = HashSet::new();
    artifacts
        .iter()
        .filter(|artifact| {
            let fresh = seen.insert(basename_of(&artifact.path));
            if !fresh {
                debug!("Partitioner dropped duplicate basename {:?}", artifact.path);
            }
            fresh
        })
        .collect()
}

/// Vanilla, Fabric and Quilt: classpath only, game client last.
fn partition_flat(artifacts: &[&ResolvedArtifact]) -> ClasspathPlan {
    let (clients, libraries): (Vec<&&ResolvedArtifact>, Vec<&&ResolvedArtifact>) = artifacts
        .iter()
        .partition(|a| a.entry.kind == EntryKind::GameClient);

    ClasspathPlan {
        module_path: Vec::new(),
        classpath: libraries
            .into_iter()
            .chain(clients)
            .map(|a| a.path.clone())
            .collect(),
        main_class: String::new(),
    }
}

fn partition_modular(artifacts: &[&ResolvedArtifact], loader: LoaderType) -> ClasspathPlan {
    let mut combined_client = None;
    let mut module_path = Vec::new();
    let mut classpath = Vec::new();

    for artifact in artifacts {
        let basename = artifact.basename();
        if combined_client.is_none() && is_combined_client(basename) {
            combined_client = Some(artifact.path.clone());
            continue;
        }
        match classify(basename) {
            Placement::Module => module_path.push(artifact.path.clone()),
            Placement::Classpath => classpath.push(artifact.path.clone()),
        }
    }

    prioritize_bootstrap_entries(&mut module_path);

    match combined_client {
        Some(client) => module_path.insert(0, client),
        None => warn!(
            "No combined {} client jar ({}) among {} artifacts; the JVM will not find its client entry",
            loader,
            expected_client_pattern(loader),
            artifacts.len()
        ),
    }

    for (label, needle) in CRITICAL_MODULES {
        let present = module_path
            .iter()
            .any(|p| basename_of(p).to_ascii_lowercase().contains(needle));
        if !present {
            warn!("Critical module missing from module path: {}", label);
        }
    }

    ClasspathPlan {
        module_path,
        classpath,
        main_class: String::new(),
    }
}

/// ModLauncher stacks are order-sensitive: bootstrap jars go first.
fn prioritize_bootstrap_entries(entries: &mut Vec<PathBuf>) {
    fn score(entry: &Path) -> usize {
        let lower = basename_of(entry).to_ascii_lowercase();
        if lower.contains("bootstraplauncher") {
            0
        } else if lower.contains("modlauncher") {
            1
        } else if lower.contains("securejarhandler") {
            2
        } else {
            10
        }
    }

    // Stable: equal scores keep resolution order.
    entries.sort_by_key(|entry| score(entry));
}
