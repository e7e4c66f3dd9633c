use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::context::AcquisitionContext;
use super::installer::{FallbackSet, LoaderVendor};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{FABRIC_MAVEN, MAVEN_CENTRAL, QUILT_MAVEN};

const FABRIC_META_BASE: &str = "https://meta.fabricmc.net/v2";
const QUILT_META_BASE: &str = "https://meta.quiltmc.org/v3";

/// Fabric and Quilt share the same meta API shape; only hosts and
/// coordinates differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaFlavor {
    Fabric,
    Quilt,
}

pub struct FabricVendor {
    flavor: MetaFlavor,
}

impl FabricVendor {
    pub fn fabric() -> Self {
        Self {
            flavor: MetaFlavor::Fabric,
        }
    }

    pub fn quilt() -> Self {
        Self {
            flavor: MetaFlavor::Quilt,
        }
    }

    fn label(&self) -> &'static str {
        match self.flavor {
            MetaFlavor::Fabric => "Fabric",
            MetaFlavor::Quilt => "Quilt",
        }
    }

    pub fn profile_url(&self, minecraft_version: &str, loader_version: &str) -> String {
        let base = match self.flavor {
            MetaFlavor::Fabric => FABRIC_META_BASE,
            MetaFlavor::Quilt => QUILT_META_BASE,
        };
        format!(
            "{}/versions/loader/{}/{}/profile/json",
            base, minecraft_version, loader_version
        )
    }

    fn loader_coordinate(&self, loader_version: &str) -> String {
        match self.flavor {
            MetaFlavor::Fabric => format!("net.fabricmc:fabric-loader:{}", loader_version),
            MetaFlavor::Quilt => format!("org.quiltmc:quilt-loader:{}", loader_version),
        }
    }

    fn loader_repository(&self) -> &'static str {
        match self.flavor {
            MetaFlavor::Fabric => FABRIC_MAVEN,
            MetaFlavor::Quilt => QUILT_MAVEN,
        }
    }

    async fn fetch_profile(&self, ctx: &AcquisitionContext<'_>) -> LauncherResult<Value> {
        let url = self.profile_url(ctx.minecraft_version, &ctx.loader_version);
        let bytes = ctx.store.fetch_bytes(&url).await?;
        let profile: Value = serde_json::from_slice(&bytes)?;

        let has_main_class = profile
            .get("mainClass")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !has_main_class {
            return Err(LauncherError::Other(format!(
                "{} profile from {} has no mainClass",
                self.label(),
                url
            )));
        }

        Ok(profile)
    }

    /// Make sure the loader jar itself is listed; some profiles omit it.
    fn ensure_loader_artifact(&self, profile: &mut Value, loader_version: &str) {
        let coordinate = self.loader_coordinate(loader_version);
        let Some(libraries) = profile.get_mut("libraries").and_then(Value::as_array_mut) else {
            profile["libraries"] = json!([{ "name": coordinate, "url": self.loader_repository() }]);
            return;
        };

        let present = libraries
            .iter()
            .any(|lib| lib.get("name").and_then(Value::as_str) == Some(coordinate.as_str()));
        if !present {
            libraries.push(json!({ "name": coordinate, "url": self.loader_repository() }));
        }
    }
}

#[async_trait]
impl LoaderVendor for FabricVendor {
    async fn prebuilt_archive(&self, ctx: &AcquisitionContext<'_>) -> LauncherResult<String> {
        info!(
            "Fetching {} profile {} for Minecraft {}",
            self.label(),
            ctx.loader_version,
            ctx.minecraft_version
        );

        let mut profile = self.fetch_profile(ctx).await?;
        self.ensure_loader_artifact(&mut profile, &ctx.loader_version);
        if profile.get("inheritsFrom").is_none() {
            profile["inheritsFrom"] = json!(ctx.minecraft_version);
        }

        Ok(serde_json::to_string_pretty(&profile)?)
    }

    fn fallback_set(&self, ctx: &AcquisitionContext<'_>) -> FallbackSet {
        let mc = ctx.minecraft_version;
        let mut repositories = vec![self.loader_repository().to_string()];
        if self.flavor == MetaFlavor::Quilt {
            repositories.push(FABRIC_MAVEN.to_string());
        }
        repositories.push(MAVEN_CENTRAL.to_string());
        repositories.extend(ctx.extra_repositories.iter().cloned());

        let mut coordinates = vec![
            self.loader_coordinate(&ctx.loader_version),
            format!("net.fabricmc:intermediary:{}", mc),
        ];
        let main_class = match self.flavor {
            MetaFlavor::Fabric => {
                coordinates.push("net.fabricmc:sponge-mixin:0.15.4+mixin.0.8.7".into());
                coordinates.extend(
                    ["asm", "asm-analysis", "asm-commons", "asm-tree", "asm-util"]
                        .iter()
                        .map(|a| format!("org.ow2.asm:{}:9.7.1", a)),
                );
                "net.fabricmc.loader.impl.launch.knot.KnotClient"
            }
            MetaFlavor::Quilt => "org.quiltmc.loader.impl.launch.knot.KnotClient",
        };

        FallbackSet {
            main_class,
            coordinates,
            repositories,
        }
    }
}
