// ─── Platform Rules ───
// OS/arch conditional inclusion for libraries and declared arguments.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

/// Operating systems as they appear in version descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsName {
    Windows,
    Linux,
    MacOs,
}

impl OsName {
    /// Descriptor spelling (`"osx"` for macOS).
    pub fn as_str(self) -> &'static str {
        match self {
            OsName::Windows => "windows",
            OsName::Linux => "linux",
            OsName::MacOs => "osx",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "windows" => Some(OsName::Windows),
            "linux" => Some(OsName::Linux),
            "osx" | "macos" => Some(OsName::MacOs),
            _ => None,
        }
    }

    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsName::Windows
        } else if cfg!(target_os = "macos") {
            OsName::MacOs
        } else {
            OsName::Linux
        }
    }

    /// Native classifier keys (`natives-<key>`) used by this OS.
    fn classifier_keys(self) -> &'static [&'static str] {
        match self {
            OsName::Windows => &["windows"],
            OsName::Linux => &["linux"],
            OsName::MacOs => &["osx", "macos"],
        }
    }
}

impl fmt::Display for OsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    X86,
    Aarch64,
    Other,
}

impl Arch {
    pub fn current() -> Self {
        if cfg!(target_arch = "x86_64") {
            Arch::X86_64
        } else if cfg!(target_arch = "x86") {
            Arch::X86
        } else if cfg!(target_arch = "aarch64") {
            Arch::Aarch64
        } else {
            Arch::Other
        }
    }

    /// Whether a descriptor arch token names this architecture.
    pub fn matches(self, raw: &str) -> bool {
        let raw = raw.trim().to_ascii_lowercase();
        match self {
            Arch::X86_64 => matches!(raw.as_str(), "x86_64" | "amd64" | "x64"),
            Arch::X86 => matches!(raw.as_str(), "x86" | "i386" | "i686"),
            Arch::Aarch64 => matches!(raw.as_str(), "arm64" | "aarch64" | "aarch_64"),
            Arch::Other => false,
        }
    }

    /// Value substituted for `${arch}` in legacy native classifiers.
    pub fn pointer_width(self) -> &'static str {
        match self {
            Arch::X86 => "32",
            _ => "64",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::X86 => "x86",
            Arch::Aarch64 => "arm64",
            Arch::Other => "unknown",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The OS/arch pair rules are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: OsName,
    pub arch: Arch,
}

impl Platform {
    pub fn new(os: OsName, arch: Arch) -> Self {
        Self { os, arch }
    }

    pub fn current() -> Self {
        Self::new(OsName::current(), Arch::current())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsConstraint>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, bool>,
}

impl PlatformRule {
    pub fn allow() -> Self {
        Self {
            action: RuleAction::Allow,
            os: None,
            features: BTreeMap::new(),
        }
    }

    pub fn disallow() -> Self {
        Self {
            action: RuleAction::Disallow,
            ..Self::allow()
        }
    }

    pub fn for_os(mut self, name: &str) -> Self {
        self.os.get_or_insert_with(OsConstraint::default).name = Some(name.to_string());
        self
    }

    fn matches(&self, platform: Platform, features: &BTreeMap<String, bool>) -> bool {
        if let Some(os) = &self.os {
            if let Some(name) = &os.name {
                if OsName::parse(name) != Some(platform.os) {
                    return false;
                }
            }
            if let Some(arch) = &os.arch {
                if !platform.arch.matches(arch) {
                    return false;
                }
            }
        }

        self.features
            .iter()
            .all(|(key, wanted)| features.get(key).copied().unwrap_or(false) == *wanted)
    }
}

/// Fold a rule list for `platform`.
///
/// An empty list is allowed. Lists containing any `allow` rule start from
/// disallowed, pure `disallow` lists start from allowed; the last matching
/// rule wins.
pub fn is_allowed(rules: &[PlatformRule], platform: Platform) -> bool {
    is_allowed_with_features(rules, platform, &BTreeMap::new())
}

/// Feature-aware variant used for declared arguments. Unlisted features
/// count as `false`.
pub fn is_allowed_with_features(
    rules: &[PlatformRule],
    platform: Platform,
    features: &BTreeMap<String, bool>,
) -> bool {
    let mut allowed = !rules.iter().any(|r| r.action == RuleAction::Allow);

    for rule in rules {
        if rule.matches(platform, features) {
            allowed = rule.action == RuleAction::Allow;
        }
    }

    allowed
}

/// Whether a classifier names natives built for a different OS or arch.
///
/// `natives-linux` on Windows and `natives-windows-arm64` on x86_64 are both
/// foreign. Classifiers that are not native bundles are never foreign.
pub fn is_foreign_native_classifier(classifier: &str, platform: Platform) -> bool {
    let Some(rest) = classifier.strip_prefix("natives-") else {
        return false;
    };

    let (os_key, arch_suffix) = match rest.split_once('-') {
        Some((os, arch)) => (os, Some(arch)),
        None => (rest, None),
    };

    if !platform.os.classifier_keys().contains(&os_key) {
        return true;
    }

    match arch_suffix {
        None => false,
        Some("32") | Some("64") => false,
        Some(arch) => !platform.arch.matches(arch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOWS: Platform = Platform {
        os: OsName::Windows,
        arch: Arch::X86_64,
    };
    const LINUX: Platform = Platform {
        os: OsName::Linux,
        arch: Arch::X86_64,
    };
    const MAC_ARM: Platform = Platform {
        os: OsName::MacOs,
        arch: Arch::Aarch64,
    };

    #[test]
    fn empty_rules_are_allowed() {
        assert!(is_allowed(&[], WINDOWS));
        assert!(is_allowed(&[], LINUX));
    }

    #[test]
    fn unconditional_disallow_is_never_allowed() {
        let rules = vec![PlatformRule::disallow()];
        assert!(!is_allowed(&rules, WINDOWS));
        assert!(!is_allowed(&rules, LINUX));
        assert!(!is_allowed(&rules, MAC_ARM));
    }

    #[test]
    fn disallow_linux_only_blocks_linux() {
        let rules = vec![PlatformRule::disallow().for_os("linux")];
        assert!(is_allowed(&rules, WINDOWS));
        assert!(!is_allowed(&rules, LINUX));
    }

    #[test]
    fn allow_osx_only_excludes_other_systems() {
        let rules = vec![PlatformRule::allow().for_os("osx")];
        assert!(is_allowed(&rules, MAC_ARM));
        assert!(!is_allowed(&rules, WINDOWS));
    }

    #[test]
    fn last_matching_rule_wins() {
        let rules = vec![PlatformRule::allow(), PlatformRule::disallow().for_os("osx")];
        assert!(is_allowed(&rules, LINUX));
        assert!(!is_allowed(&rules, MAC_ARM));
    }

    #[test]
    fn arch_constraint_is_honoured() {
        let mut rule = PlatformRule::allow();
        rule.os = Some(OsConstraint {
            name: None,
            arch: Some("arm64".into()),
        });
        assert!(is_allowed(&[rule.clone()], MAC_ARM));
        assert!(!is_allowed(&[rule], WINDOWS));
    }

    #[test]
    fn feature_rules_need_every_feature() {
        let mut rule = PlatformRule::allow();
        rule.features.insert("has_custom_resolution".into(), true);
        let rules = vec![rule];

        assert!(!is_allowed(&rules, LINUX));

        let mut features = BTreeMap::new();
        features.insert("has_custom_resolution".to_string(), true);
        assert!(is_allowed_with_features(&rules, LINUX, &features));
    }

    #[test]
    fn foreign_native_classifiers() {
        assert!(is_foreign_native_classifier("natives-linux", WINDOWS));
        assert!(!is_foreign_native_classifier("natives-windows", WINDOWS));
        assert!(is_foreign_native_classifier("natives-windows-arm64", WINDOWS));
        assert!(!is_foreign_native_classifier("natives-macos-arm64", MAC_ARM));
        assert!(!is_foreign_native_classifier("natives-osx", MAC_ARM));
        assert!(!is_foreign_native_classifier("natives-windows-64", WINDOWS));
        assert!(!is_foreign_native_classifier("sources", WINDOWS));
    }

    #[test]
    fn os_name_accepts_both_mac_spellings() {
        assert_eq!(OsName::parse("osx"), Some(OsName::MacOs));
        assert_eq!(OsName::parse("macos"), Some(OsName::MacOs));
        assert_eq!(OsName::parse("beos"), None);
    }
}
