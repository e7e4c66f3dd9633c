use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::context::AcquisitionContext;
use super::installer::{FallbackSet, LoaderVendor};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenArtifact, FORGE_MAVEN, MAVEN_CENTRAL, MOJANG_LIBRARIES};
use crate::core::store::{write_file, ArtifactStore};
use crate::core::version::DependencyEntry;

pub const FORGE_BOOTSTRAP_MAIN: &str = "cpw.mods.bootstraplauncher.BootstrapLauncher";

/// Where one publication of a Forge-family loader lives.
#[derive(Debug, Clone)]
pub struct InstallerRoute {
    pub installer_url: String,
    pub installer_file: String,
    /// The combined `*-client.jar` produced for this publication.
    pub client: MavenArtifact,
    pub repository: &'static str,
}

/// Installs Forge from its official installer archive.
pub struct ForgeVendor;

impl ForgeVendor {
    pub fn routes(ctx: &AcquisitionContext<'_>) -> Vec<InstallerRoute> {
        let forge_id = format!("{}-{}", ctx.minecraft_version, ctx.loader_version);
        let installer_file = format!("forge-{}-installer.jar", forge_id);
        vec![InstallerRoute {
            installer_url: format!(
                "{}/net/minecraftforge/forge/{}/{}",
                FORGE_MAVEN, forge_id, installer_file
            ),
            installer_file,
            client: MavenArtifact {
                group_id: "net.minecraftforge".into(),
                artifact_id: "forge".into(),
                version: forge_id,
                classifier: Some("client".into()),
                packaging: "jar".into(),
            },
            repository: FORGE_MAVEN,
        }]
    }

    pub fn descriptor_aliases(ctx: &AcquisitionContext<'_>) -> Vec<String> {
        vec![
            format!("{}-forge-{}", ctx.minecraft_version, ctx.loader_version),
            format!("forge-{}-{}", ctx.minecraft_version, ctx.loader_version),
            format!("{}-forge{}-{}", ctx.minecraft_version, ctx.minecraft_version, ctx.loader_version),
        ]
    }
}

#[async_trait]
impl LoaderVendor for ForgeVendor {
    async fn prebuilt_archive(&self, ctx: &AcquisitionContext<'_>) -> LauncherResult<String> {
        info!(
            "Reading Forge {} profile for MC {}",
            ctx.loader_version, ctx.minecraft_version
        );
        prebuilt_from_routes(ctx, &Self::routes(ctx)).await
    }

    async fn vendor_installer(&self, ctx: &AcquisitionContext<'_>) -> LauncherResult<String> {
        install_from_routes(ctx, &Self::routes(ctx), &Self::descriptor_aliases(ctx)).await
    }

    fn fallback_set(&self, ctx: &AcquisitionContext<'_>) -> FallbackSet {
        let forge_id = format!("{}-{}", ctx.minecraft_version, ctx.loader_version);
        let mut coordinates = vec![
            "cpw.mods:bootstraplauncher:1.1.2".to_string(),
            "cpw.mods:securejarhandler:2.1.10".to_string(),
            "cpw.mods:modlauncher:10.0.9".to_string(),
            format!("net.minecraftforge:fmlloader:{}", forge_id),
            format!("net.minecraftforge:fmlcore:{}", forge_id),
            "net.sf.jopt-simple:jopt-simple:5.0.4".to_string(),
        ];
        coordinates.extend(asm_coordinates());
        coordinates.push(format!("net.minecraftforge:forge:{}:client", forge_id));

        FallbackSet {
            main_class: FORGE_BOOTSTRAP_MAIN,
            coordinates,
            repositories: forge_family_repositories(FORGE_MAVEN, ctx),
        }
    }
}

// ── Shared Forge-family machinery ──

pub(crate) fn asm_coordinates() -> impl Iterator<Item = String> {
    ["asm", "asm-analysis", "asm-commons", "asm-tree", "asm-util"]
        .into_iter()
        .map(|a| format!("org.ow2.asm:{}:9.7.1", a))
}

pub(crate) fn forge_family_repositories(
    vendor_maven: &str,
    ctx: &AcquisitionContext<'_>,
) -> Vec<String> {
    let mut repos = vec![
        vendor_maven.to_string(),
        MOJANG_LIBRARIES.to_string(),
        MAVEN_CENTRAL.to_string(),
    ];
    repos.extend(ctx.extra_repositories.iter().cloned());
    repos
}

/// Read the installer's embedded `version.json` and pair it with the
/// combined client jar. The installer is never executed here.
pub(crate) async fn prebuilt_from_routes(
    ctx: &AcquisitionContext<'_>,
    routes: &[InstallerRoute],
) -> LauncherResult<String> {
    let mut last_err = None;

    for route in routes {
        let attempt = async {
            let installer = ensure_installer(ctx.store, route).await?;
            let mut profile = read_installer_profile(&installer)?;

            let client = DependencyEntry::from_maven(&route.client, route.repository);
            if !ctx.store.is_present(&client).await {
                debug!("Combined client {} not cached, trying vendor maven", client.coordinate);
                ctx.store.fetch(&client).await?;
            }

            ensure_local_library(&mut profile, &client);
            if profile.get("inheritsFrom").is_none() {
                profile["inheritsFrom"] = json!(ctx.minecraft_version);
            }
            Ok::<_, LauncherError>(serde_json::to_string_pretty(&profile)?)
        };

        match attempt.await {
            Ok(raw) => return Ok(raw),
            Err(e) => {
                debug!("Route {} failed: {}", route.installer_url, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| LauncherError::Other("no installer routes".into())))
}

/// Run the official installer against the store root and read back the
/// descriptor it wrote. The exit code decides success.
pub(crate) async fn install_from_routes(
    ctx: &AcquisitionContext<'_>,
    routes: &[InstallerRoute],
    aliases: &[String],
) -> LauncherResult<String> {
    let mut installer = None;
    let mut last_err = None;
    for route in routes {
        match ensure_installer(ctx.store, route).await {
            Ok(path) => {
                installer = Some(path);
                break;
            }
            Err(e) => last_err = Some(e),
        }
    }
    let installer = match installer {
        Some(path) => path,
        None => {
            return Err(last_err
                .unwrap_or_else(|| LauncherError::Other("no installer routes".into())))
        }
    };

    let root = ctx.store.root();
    ensure_launcher_profiles(root).await?;
    run_installer(ctx.java_path, &installer, root).await?;

    for alias in aliases {
        let path = ctx.store.version_descriptor_path(alias);
        if let Ok(raw) = tokio::fs::read_to_string(&path).await {
            info!("Installer produced descriptor {}", alias);
            return Ok(raw);
        }
    }

    Err(LauncherError::Other(format!(
        "installer exited cleanly but none of [{}] was written",
        aliases.join(", ")
    )))
}

async fn ensure_installer(store: &ArtifactStore, route: &InstallerRoute) -> LauncherResult<PathBuf> {
    let path = store.installers_dir().join(&route.installer_file);
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(path);
    }
    store.fetch_to(&route.installer_url, &path, None).await?;
    Ok(path)
}

/// `version.json` from inside an installer archive.
pub(crate) fn read_installer_profile(installer: &Path) -> LauncherResult<Value> {
    let file = std::fs::File::open(installer).map_err(|e| LauncherError::io(installer, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let entry = archive.by_name("version.json").map_err(|e| {
        LauncherError::Other(format!(
            "version.json missing from {}: {}",
            installer.display(),
            e
        ))
    })?;
    Ok(serde_json::from_reader(entry)?)
}

/// List `client` as a locally produced library unless the profile already does.
fn ensure_local_library(profile: &mut Value, client: &DependencyEntry) {
    let entry = json!({
        "name": client.coordinate,
        "downloads": {"artifact": {"path": client.path, "url": ""}}
    });

    match profile.get_mut("libraries").and_then(Value::as_array_mut) {
        Some(libraries) => {
            let present = libraries
                .iter()
                .any(|lib| lib.get("name").and_then(Value::as_str) == Some(client.coordinate.as_str()));
            if !present {
                libraries.push(entry);
            }
        }
        None => profile["libraries"] = json!([entry]),
    }
}

async fn ensure_launcher_profiles(root: &Path) -> LauncherResult<()> {
    let path = root.join("launcher_profiles.json");
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        write_file(&path, br#"{"profiles":{},"selectedProfile":null}"#).await?;
    }
    Ok(())
}

async fn run_installer(java: &Path, installer: &Path, root: &Path) -> LauncherResult<()> {
    info!("Running installer {:?} with {:?}", installer, java);

    let output = tokio::process::Command::new(java)
        .arg("-jar")
        .arg(installer)
        .arg("--installClient")
        .arg(root)
        .current_dir(root)
        .output()
        .await
        .map_err(|source| LauncherError::Spawn {
            program: java.to_path_buf(),
            source,
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
    warn!("Installer failed with {:?}", output.status.code());
    Err(LauncherError::Other(format!(
        "installer exited with {:?}: {}",
        output.status.code(),
        tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
    )))
}
