// ─── Launch Pipeline ───
// validate → manifest → resolve → natives → partition → arguments → spawn

use std::path::PathBuf;

use tracing::{info, warn};

use super::arguments::{build_arguments, format_command_line, ArgumentContext};
use super::natives::{cleanup_natives, extract_natives, launch_natives_dir};
use super::partition::{partition, ClasspathPlan};
use super::request::LaunchRequest;
use super::supervisor::{LaunchCommand, LaunchProcess, ProcessHooks, ProcessSupervisor};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::resolve::{DependencyResolver, OverlayRequest, Resolution};
use crate::core::state::LauncherSettings;
use crate::core::store::ArtifactStore;
use crate::core::version::{ManifestReader, Platform};

/// Everything decided before the JVM starts.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub classpath: ClasspathPlan,
    pub resolution: Resolution,
    /// Per-launch directory holding extracted native libraries.
    pub natives_dir: PathBuf,
}

impl LaunchPlan {
    pub fn command_line(&self) -> String {
        format_command_line(&self.program, &self.args)
    }
}

pub struct Launcher {
    store: ArtifactStore,
    reader: ManifestReader,
    settings: LauncherSettings,
    platform: Platform,
}

impl Launcher {
    pub fn new(store: ArtifactStore, settings: LauncherSettings) -> Self {
        let reader = ManifestReader::with_index_url(store.clone(), &settings.version_index_url);
        Self {
            store,
            reader,
            settings,
            platform: Platform::current(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.reader = ManifestReader::with_index_url(self.store.clone(), &self.settings.version_index_url)
            .with_arch(platform.arch);
        self.platform = platform;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Every pre-spawn step. Nothing is executed except, when a loader has
    /// to be installed, its vendor installer.
    pub async fn plan(&self, request: &LaunchRequest) -> LauncherResult<LaunchPlan> {
        request.validate()?;
        warn_if_memory_exceeds_system(request.memory.max_mb);

        let base = self.reader.load(&request.version_id).await?;

        let loader_version = request.loader_version();
        let overlay = loader_version.as_deref().map(|loader_version| OverlayRequest {
            loader: request.loader,
            loader_version,
            java_path: &request.java_path,
            extra_repositories: &self.settings.extra_repositories,
        });

        let resolution = DependencyResolver::new(&self.store, &self.reader)
            .with_options(self.settings.resolver_options(self.platform))
            .resolve(base, overlay)
            .await?;
        info!(
            "Resolved {} artifacts for {}",
            resolution.artifacts.len(),
            request.version_name()
        );

        let natives_dir = launch_natives_dir(&self.store, &request.instance.safe_name());
        extract_natives(&resolution.artifacts, &natives_dir).await?;

        let classpath = partition(&resolution.artifacts, request.loader, &resolution.main_class);
        info!(
            "Partitioned: {} module path, {} classpath",
            classpath.module_path.len(),
            classpath.classpath.len()
        );

        let libraries_dir = self.store.libraries_dir();
        let assets_dir = self.store.assets_dir();
        let ctx = ArgumentContext {
            platform: self.platform,
            natives_dir: &natives_dir,
            libraries_dir: &libraries_dir,
            assets_dir: &assets_dir,
            asset_index: resolution.asset_index.as_deref(),
            version_type: resolution.version_type.as_deref(),
            jvm_arguments: &resolution.jvm_arguments,
            game_arguments: &resolution.game_arguments,
            legacy_arguments: resolution.legacy_arguments.as_deref(),
            memory_floor_mb: self.settings.memory_floor_mb,
        };
        let args = match build_arguments(request, &classpath, &ctx) {
            Ok(args) => args,
            Err(e) => {
                cleanup_natives(&natives_dir).await;
                return Err(e);
            }
        };

        Ok(LaunchPlan {
            program: request.java_path.clone(),
            args,
            classpath,
            resolution,
            natives_dir,
        })
    }

    /// Plan, then hand the process to the supervisor.
    pub async fn launch(&self, request: &LaunchRequest, hooks: ProcessHooks) -> LauncherResult<LaunchProcess> {
        let plan = self.plan(request).await?;

        tokio::fs::create_dir_all(&request.game_dir)
            .await
            .map_err(|e| LauncherError::io(&request.game_dir, e))?;

        let supervisor = ProcessSupervisor::new(self.store.game_logs_dir());
        let command = LaunchCommand {
            program: plan.program,
            args: plan.args,
            working_dir: request.game_dir.clone(),
            natives_dir: Some(plan.natives_dir),
            instance: request.instance.safe_name(),
        };
        Ok(supervisor.spawn(command, hooks).await)
    }
}

fn warn_if_memory_exceeds_system(max_mb: u32) {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    let total_mb = system.total_memory() / (1024 * 1024);
    if total_mb > 0 && u64::from(max_mb) > total_mb {
        warn!(
            "Requested {} MB heap but the system only has {} MB",
            max_mb, total_mb
        );
    }
}
