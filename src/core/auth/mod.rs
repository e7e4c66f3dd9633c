// ─── Launch Identity ───
// The authentication subsystem lives outside this crate; it hands over an
// already-authenticated identity that is used verbatim.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

pub const OFFLINE_ACCESS_TOKEN: &str = "offline_access_token";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    #[default]
    Offline,
    Microsoft,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchIdentity {
    #[serde(default)]
    pub mode: AccountMode,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub user_type: String,
}

impl Default for LaunchIdentity {
    fn default() -> Self {
        Self::offline("Player")
    }
}

impl LaunchIdentity {
    pub fn offline(username: &str) -> Self {
        let username = username.trim().to_string();
        Self {
            mode: AccountMode::Offline,
            uuid: offline_uuid(&username),
            username,
            access_token: OFFLINE_ACCESS_TOKEN.into(),
            user_type: "legacy".into(),
        }
    }

    /// Fill empty fields with offline defaults. Non-empty values are kept as-is.
    pub fn sanitized(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = "Player".into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = offline_uuid(&self.username);
        }
        if self.access_token.trim().is_empty() {
            self.access_token = OFFLINE_ACCESS_TOKEN.into();
        }
        if self.user_type.trim().is_empty() {
            self.user_type = match self.mode {
                AccountMode::Offline => "legacy".into(),
                AccountMode::Microsoft => "msa".into(),
            };
        }
        self
    }
}

/// Name-based UUID the vanilla server assigns to offline players
/// (MD5 of `OfflinePlayer:<name>`, version 3).
pub fn offline_uuid(username: &str) -> String {
    let digest = Md5::digest(format!("OfflinePlayer:{}", username).as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    uuid::Builder::from_md5_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_uuid_is_stable_name_based() {
        let a = offline_uuid("Steve");
        assert_eq!(a, offline_uuid("Steve"));
        assert_ne!(a, offline_uuid("Alex"));
        assert_eq!(a.len(), 36);
        assert_eq!(&a[14..15], "3");
    }

    #[test]
    fn sanitized_fills_only_empty_fields() {
        let identity = LaunchIdentity {
            mode: AccountMode::Microsoft,
            username: "Steve".into(),
            uuid: String::new(),
            access_token: "token".into(),
            user_type: String::new(),
        }
        .sanitized();

        assert_eq!(identity.username, "Steve");
        assert_eq!(identity.access_token, "token");
        assert_eq!(identity.user_type, "msa");
        assert_eq!(identity.uuid, offline_uuid("Steve"));
    }
}
