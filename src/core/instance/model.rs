use serde::{Deserialize, Serialize};

/// Supported mod loaders.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LoaderType {
    #[default]
    #[serde(rename = "none", alias = "vanilla")]
    Vanilla,
    Forge,
    Fabric,
    #[serde(alias = "neo_forge")]
    NeoForge,
    Quilt,
}

impl LoaderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderType::Vanilla => "none",
            LoaderType::Forge => "forge",
            LoaderType::Fabric => "fabric",
            LoaderType::NeoForge => "neoforge",
            LoaderType::Quilt => "quilt",
        }
    }

    /// Forge and NeoForge boot through the module path.
    pub fn is_forge_like(&self) -> bool {
        matches!(self, LoaderType::Forge | LoaderType::NeoForge)
    }

    pub fn is_overlay(&self) -> bool {
        !matches!(self, LoaderType::Vanilla)
    }
}

impl std::fmt::Display for LoaderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller knows about the instance being launched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceMetadata {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    /// Loader recorded when the instance was created, if any.
    #[serde(default)]
    pub loader: Option<LoaderType>,
    #[serde(default)]
    pub loader_version: Option<String>,
}

impl InstanceMetadata {
    /// File-system friendly form of the instance name.
    pub fn safe_name(&self) -> String {
        let name = safe_name(&self.name);
        if name.is_empty() {
            self.id
                .as_deref()
                .map(safe_name)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "instance".to_string())
        } else {
            name
        }
    }
}

/// Lowercase, strip Latin accents, keep word characters, spaces and `-`,
/// turn whitespace into `-`, collapse dashes and trim them.
pub fn safe_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = false;

    for ch in name.trim().chars().flat_map(char::to_lowercase) {
        let ch = strip_accent(ch);
        let mapped = if ch.is_whitespace() || ch == '-' {
            '-'
        } else if ch.is_alphanumeric() || ch == '_' {
            ch
        } else {
            continue;
        };

        if mapped == '-' {
            if last_dash {
                continue;
            }
            last_dash = true;
        } else {
            last_dash = false;
        }
        out.push(mapped);
    }

    out.trim_matches('-').to_string()
}

fn strip_accent(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => 'u',
        'ý' | 'ÿ' => 'y',
        'š' | 'ś' => 's',
        'ž' | 'ź' | 'ż' => 'z',
        'ř' => 'r',
        'ď' => 'd',
        'ť' => 't',
        'ł' => 'l',
        other => other,
    }
}

/// `1.20.1-47.2.0` → `47.2.0` when the prefix is the game version.
pub fn normalize_loader_version(minecraft_version: &str, raw: &str) -> String {
    let raw = raw.trim();
    raw.strip_prefix(minecraft_version)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(raw)
        .to_string()
}
