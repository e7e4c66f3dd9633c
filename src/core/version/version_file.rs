// ─── Version File ───
// Raw serde model of a version descriptor (Mojang, loader meta or installer
// output). Normalization into `VersionManifest` lives in `manifest.rs`.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::rules::PlatformRule;

/// A version JSON exactly as it appears on disk or on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    /// Some loader profiles only carry the bare asset id.
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
    #[serde(default, rename = "type")]
    pub version_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexInfo {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgumentValue>,
    #[serde(default)]
    pub jvm: Vec<ArgumentValue>,
}

/// One element of `arguments.game` / `arguments.jvm`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<PlatformRule>,
        value: ArgumentValues,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValues {
    One(String),
    Many(Vec<String>),
}

impl ArgumentValues {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ArgumentValues::One(s) => vec![s],
            ArgumentValues::Many(v) => v,
        }
    }
}

// ─── Library Entry ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<PlatformRule>>,
    /// Legacy `{ "windows": "natives-windows-${arch}" }` map.
    #[serde(default)]
    pub natives: Option<BTreeMap<String, String>>,
    /// Repository base for `{name, url}` style entries.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<BTreeMap<String, LibDownloadArtifact>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::rules::RuleAction;

    #[test]
    fn parses_mixed_argument_forms() {
        let parsed: VersionJson = serde_json::from_value(serde_json::json!({
            "id": "test",
            "mainClass": "net.minecraft.client.main.Main",
            "arguments": {
                "game": [
                    "--username",
                    "${auth_player_name}",
                    {
                        "rules": [{"action": "allow", "features": {"is_demo_user": true}}],
                        "value": "--demo"
                    },
                    {
                        "rules": [{"action": "allow", "os": {"name": "osx", "version": "^10\\."}}],
                        "value": ["-XstartOnFirstThread"]
                    }
                ]
            }
        }))
        .unwrap();

        let game = parsed.arguments.unwrap().game;
        assert_eq!(game.len(), 4);
        match &game[2] {
            ArgumentValue::Conditional { rules, value } => {
                assert_eq!(rules[0].action, RuleAction::Allow);
                assert_eq!(rules[0].features.get("is_demo_user"), Some(&true));
                assert_eq!(value.clone().into_vec(), vec!["--demo".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_loader_meta_library_without_downloads() {
        let lib: LibraryEntry = serde_json::from_value(serde_json::json!({
            "name": "net.fabricmc:intermediary:1.20.1",
            "url": "https://maven.fabricmc.net/"
        }))
        .unwrap();
        assert!(lib.downloads.is_none());
        assert_eq!(lib.url.as_deref(), Some("https://maven.fabricmc.net/"));
    }
}
