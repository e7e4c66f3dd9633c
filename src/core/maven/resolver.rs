use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use super::artifact::MavenArtifact;
use super::pom::PomDocument;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::store::ArtifactStore;
use crate::core::version::DependencyEntry;

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = LauncherResult<Vec<DependencyEntry>>> + Send + 'a>>;

/// Resolves Maven artifacts transitively into the artifact store, following
/// compile-scope POM dependencies.
pub struct MavenResolver {
    /// Ordered list of repository base URLs to search.
    pub repositories: Vec<String>,
    /// Artifacts already visited in this session (avoid cycles).
    resolved: HashSet<String>,
}

impl MavenResolver {
    pub fn new(repositories: Vec<String>) -> Self {
        Self {
            repositories,
            resolved: HashSet::new(),
        }
    }

    /// Resolve a coordinate and its compile-scope dependencies.
    ///
    /// Returns one entry per JAR now present in the store, pointing at the
    /// repository that served it. The requested coordinate comes first.
    pub async fn resolve(
        &mut self,
        coord: &str,
        store: &ArtifactStore,
    ) -> LauncherResult<Vec<DependencyEntry>> {
        let artifact = MavenArtifact::parse(coord)?;
        self.resolve_artifact(artifact, store).await
    }

    fn resolve_artifact<'a>(
        &'a mut self,
        artifact: MavenArtifact,
        store: &'a ArtifactStore,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            let key = artifact.to_string();
            if !self.resolved.insert(key) {
                return Ok(vec![]);
            }

            let mut collected = Vec::new();

            // 1. The JAR itself (skip for pom-only packaging)
            if !artifact.is_pom() {
                match self.locate(&artifact, store).await {
                    Ok(entry) => collected.push(entry),
                    Err(e) => {
                        warn!("JAR unavailable for {}: {}", artifact, e);
                        // It might be a POM-only artifact. Fall through.
                    }
                }
            }

            // 2. POM for transitive dependencies
            let pom_artifact = artifact.with_packaging("pom");
            let pom_entry = match self.locate(&pom_artifact, store).await {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("POM not available for {}: {}", artifact, e);
                    return Ok(collected);
                }
            };

            let pom_path = store.path_for(&pom_entry);
            let pom_content = tokio::fs::read_to_string(&pom_path)
                .await
                .map_err(|e| LauncherError::io(&pom_path, e))?;

            let pom = match PomDocument::parse(&pom_content) {
                Ok(p) => p,
                Err(e) => {
                    warn!("Failed to parse POM for {}: {}", artifact, e);
                    return Ok(collected);
                }
            };

            // 3. Compile-scope transitive dependencies
            for dep in pom.compile_dependencies() {
                let Some(version) = pom.resolve_version(&dep) else {
                    warn!(
                        "Cannot resolve version for {}:{} (skipping)",
                        dep.group_id, dep.artifact_id
                    );
                    continue;
                };
                if version.contains("${") {
                    debug!(
                        "Skipping property-based version {} for {}:{}",
                        version, dep.group_id, dep.artifact_id
                    );
                    continue;
                }

                let child = MavenArtifact {
                    group_id: dep.group_id.clone(),
                    artifact_id: dep.artifact_id.clone(),
                    version,
                    classifier: dep.classifier.clone(),
                    packaging: dep.dep_type.clone().unwrap_or_else(|| "jar".to_string()),
                };
                let child_entries = self.resolve_artifact(child, store).await?;
                collected.extend(child_entries);
            }

            Ok(collected)
        })
    }

    /// Use the stored copy if present, else try each repository in order.
    async fn locate(
        &self,
        artifact: &MavenArtifact,
        store: &ArtifactStore,
    ) -> LauncherResult<DependencyEntry> {
        let mut last_err: Option<LauncherError> = None;

        for repo in &self.repositories {
            let entry = DependencyEntry::from_maven(artifact, repo);
            if store.is_present(&entry).await {
                return Ok(entry);
            }
            match store.fetch(&entry).await {
                Ok(_) => return Ok(entry),
                Err(e) => {
                    debug!("Repository {} failed for {}: {}", repo, artifact, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            LauncherError::Other(format!("No repositories configured for {}", artifact))
        }))
    }
}
