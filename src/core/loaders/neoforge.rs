use async_trait::async_trait;
use tracing::info;

use super::context::AcquisitionContext;
use super::forge::{
    asm_coordinates, forge_family_repositories, install_from_routes, prebuilt_from_routes,
    InstallerRoute, FORGE_BOOTSTRAP_MAIN,
};
use super::installer::{FallbackSet, LoaderVendor};
use crate::core::error::LauncherResult;
use crate::core::maven::{MavenArtifact, NEOFORGE_MAVEN};

/// NeoForge: same installer format as Forge, different maven and ids.
pub struct NeoForgeVendor;

impl NeoForgeVendor {
    /// Modern `net.neoforged:neoforge` first, then the 1.20.1-era
    /// `net.neoforged:forge` publication.
    pub fn routes(ctx: &AcquisitionContext<'_>) -> Vec<InstallerRoute> {
        let version = &ctx.loader_version;
        let legacy_id = format!("{}-{}", ctx.minecraft_version, version);

        vec![
            InstallerRoute {
                installer_url: format!(
                    "{}/net/neoforged/neoforge/{}/neoforge-{}-installer.jar",
                    NEOFORGE_MAVEN, version, version
                ),
                installer_file: format!("neoforge-{}-installer.jar", version),
                client: client_artifact("neoforge", version),
                repository: NEOFORGE_MAVEN,
            },
            InstallerRoute {
                installer_url: format!(
                    "{}/net/neoforged/forge/{}/forge-{}-installer.jar",
                    NEOFORGE_MAVEN, legacy_id, legacy_id
                ),
                installer_file: format!("neoforged-forge-{}-installer.jar", legacy_id),
                client: client_artifact("forge", &legacy_id),
                repository: NEOFORGE_MAVEN,
            },
        ]
    }

    pub fn descriptor_aliases(ctx: &AcquisitionContext<'_>) -> Vec<String> {
        let version = &ctx.loader_version;
        vec![
            format!("{}-neoforge-{}", ctx.minecraft_version, version),
            format!("neoforge-{}", version),
            format!("{}-forge-{}", ctx.minecraft_version, version),
        ]
    }
}

fn client_artifact(artifact_id: &str, version: &str) -> MavenArtifact {
    MavenArtifact {
        group_id: "net.neoforged".into(),
        artifact_id: artifact_id.into(),
        version: version.into(),
        classifier: Some("client".into()),
        packaging: "jar".into(),
    }
}

#[async_trait]
impl LoaderVendor for NeoForgeVendor {
    async fn prebuilt_archive(&self, ctx: &AcquisitionContext<'_>) -> LauncherResult<String> {
        info!(
            "Reading NeoForge {} profile for MC {}",
            ctx.loader_version, ctx.minecraft_version
        );
        prebuilt_from_routes(ctx, &Self::routes(ctx)).await
    }

    async fn vendor_installer(&self, ctx: &AcquisitionContext<'_>) -> LauncherResult<String> {
        install_from_routes(ctx, &Self::routes(ctx), &Self::descriptor_aliases(ctx)).await
    }

    fn fallback_set(&self, ctx: &AcquisitionContext<'_>) -> FallbackSet {
        let mut coordinates = vec![
            "cpw.mods:bootstraplauncher:2.0.2".to_string(),
            "cpw.mods:securejarhandler:3.0.8".to_string(),
            "cpw.mods:modlauncher:11.0.4".to_string(),
            "net.sf.jopt-simple:jopt-simple:5.0.4".to_string(),
        ];
        coordinates.extend(asm_coordinates());
        coordinates.push(format!("net.neoforged:neoforge:{}:client", ctx.loader_version));

        FallbackSet {
            main_class: FORGE_BOOTSTRAP_MAIN,
            coordinates,
            repositories: forge_family_repositories(NEOFORGE_MAVEN, ctx),
        }
    }
}
