// ─── Loader Acquisition ───
// Ordered strategies for producing a loader overlay manifest, tried by a
// small state machine. Each failure is recorded and feeds the next step.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use super::context::AcquisitionContext;
use super::installer::Vendor;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::MavenResolver;
use crate::core::version::{ManifestReader, VersionManifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionStrategy {
    PrebuiltArchive,
    VendorInstaller,
    FixedCoordinateFallback,
}

impl AcquisitionStrategy {
    pub const CHAIN: [AcquisitionStrategy; 3] = [
        AcquisitionStrategy::PrebuiltArchive,
        AcquisitionStrategy::VendorInstaller,
        AcquisitionStrategy::FixedCoordinateFallback,
    ];

    /// Overlays from degraded strategies are not worth caching.
    pub fn caches_result(self) -> bool {
        !matches!(self, AcquisitionStrategy::FixedCoordinateFallback)
    }
}

impl fmt::Display for AcquisitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AcquisitionStrategy::PrebuiltArchive => "prebuilt-archive",
            AcquisitionStrategy::VendorInstaller => "vendor-installer",
            AcquisitionStrategy::FixedCoordinateFallback => "fixed-coordinate-fallback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "strategy")]
pub enum OverlaySource {
    Cached,
    Acquired(AcquisitionStrategy),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyFailure {
    pub strategy: AcquisitionStrategy,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquisitionReport {
    pub overlay_id: String,
    pub source: OverlaySource,
    pub failures: Vec<StrategyFailure>,
    /// Coordinates taken from the hand-maintained fallback set.
    pub substituted: Vec<String>,
}

#[derive(Debug)]
pub struct AcquiredOverlay {
    /// Shallow overlay (not merged with its parent).
    pub manifest: VersionManifest,
    pub report: AcquisitionReport,
}

enum ChainState {
    Try(usize),
    Done(VersionManifest, AcquisitionStrategy, Vec<String>),
    Exhausted,
}

/// Look up a cached overlay or run the strategy chain.
pub async fn acquire_overlay(
    vendor: &Vendor,
    ctx: &AcquisitionContext<'_>,
    reader: &ManifestReader,
) -> LauncherResult<AcquiredOverlay> {
    let overlay_id = ctx.overlay_id(vendor.loader());

    match reader.read_cached(&overlay_id).await {
        Ok(Some(mut manifest)) => {
            info!("Using cached overlay {}", overlay_id);
            manifest.id = overlay_id.clone();
            return Ok(AcquiredOverlay {
                manifest,
                report: AcquisitionReport {
                    overlay_id,
                    source: OverlaySource::Cached,
                    failures: Vec::new(),
                    substituted: Vec::new(),
                },
            });
        }
        Ok(None) => {}
        Err(e) => warn!("Ignoring unreadable cached overlay {}: {}", overlay_id, e),
    }

    let mut failures = Vec::new();
    let mut state = ChainState::Try(0);

    loop {
        state = match state {
            ChainState::Try(i) if i >= AcquisitionStrategy::CHAIN.len() => ChainState::Exhausted,
            ChainState::Try(i) => {
                let strategy = AcquisitionStrategy::CHAIN[i];
                info!("Acquiring {} via {}", overlay_id, strategy);
                match run_strategy(strategy, vendor, ctx, reader, &overlay_id).await {
                    Ok((manifest, substituted)) => ChainState::Done(manifest, strategy, substituted),
                    Err(e) => {
                        warn!("{} failed for {}: {}", strategy, overlay_id, e);
                        failures.push(StrategyFailure {
                            strategy,
                            reason: e.to_string(),
                        });
                        ChainState::Try(i + 1)
                    }
                }
            }
            ChainState::Done(manifest, strategy, substituted) => {
                return Ok(AcquiredOverlay {
                    manifest,
                    report: AcquisitionReport {
                        overlay_id,
                        source: OverlaySource::Acquired(strategy),
                        failures,
                        substituted,
                    },
                });
            }
            ChainState::Exhausted => {
                return Err(LauncherError::LoaderAcquisitionFailed {
                    overlay_id,
                    attempts: failures
                        .iter()
                        .map(|f| format!("{}: {}", f.strategy, f.reason))
                        .collect(),
                });
            }
        };
    }
}

async fn run_strategy(
    strategy: AcquisitionStrategy,
    vendor: &Vendor,
    ctx: &AcquisitionContext<'_>,
    reader: &ManifestReader,
    overlay_id: &str,
) -> LauncherResult<(VersionManifest, Vec<String>)> {
    let raw = match strategy {
        AcquisitionStrategy::PrebuiltArchive => vendor.prebuilt_archive(ctx).await?,
        AcquisitionStrategy::VendorInstaller => vendor.vendor_installer(ctx).await?,
        AcquisitionStrategy::FixedCoordinateFallback => {
            return fixed_coordinate_overlay(vendor, ctx, overlay_id).await;
        }
    };

    let mut manifest = reader.parse(overlay_id, &raw)?;
    manifest.id = overlay_id.to_string();
    if manifest.inherits_from.is_none() {
        manifest.inherits_from = Some(ctx.minecraft_version.to_string());
    }

    if strategy.caches_result() {
        ctx.store.write_version_descriptor(overlay_id, &raw).await?;
    }
    Ok((manifest, Vec::new()))
}

async fn fixed_coordinate_overlay(
    vendor: &Vendor,
    ctx: &AcquisitionContext<'_>,
    overlay_id: &str,
) -> LauncherResult<(VersionManifest, Vec<String>)> {
    let set = vendor.fallback_set(ctx);
    let mut resolver = MavenResolver::new(set.repositories.clone());
    let mut libraries = Vec::new();
    let mut substituted = Vec::new();

    for coordinate in &set.coordinates {
        warn!("Substituting fixed coordinate {} for {}", coordinate, overlay_id);
        match resolver.resolve(coordinate, ctx.store).await {
            Ok(entries) if !entries.is_empty() => {
                substituted.push(coordinate.clone());
                libraries.extend(entries);
            }
            Ok(_) => warn!("Fixed coordinate {} is unavailable", coordinate),
            Err(e) => warn!("Fixed coordinate {} failed: {}", coordinate, e),
        }
    }

    // The loader core is always the first coordinate of a set.
    let core_ok = set
        .coordinates
        .first()
        .is_some_and(|core| substituted.contains(core));
    if !core_ok {
        return Err(LauncherError::Other(format!(
            "loader core {} unavailable from [{}]",
            set.coordinates.first().map(String::as_str).unwrap_or("?"),
            set.repositories.join(", ")
        )));
    }

    let manifest = VersionManifest {
        id: overlay_id.to_string(),
        main_class: set.main_class.to_string(),
        libraries,
        inherits_from: Some(ctx.minecraft_version.to_string()),
        ..VersionManifest::default()
    };
    Ok((manifest, substituted))
}
