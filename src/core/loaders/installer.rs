use async_trait::async_trait;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::LoaderType;

use super::{
    context::AcquisitionContext, fabric::FabricVendor, forge::ForgeVendor,
    neoforge::NeoForgeVendor,
};

/// Hand-maintained minimum a loader can boot with when its metadata is
/// unreachable.
#[derive(Debug, Clone)]
pub struct FallbackSet {
    pub main_class: &'static str,
    pub coordinates: Vec<String>,
    /// Searched in order for every coordinate.
    pub repositories: Vec<String>,
}

/// One loader vendor's ways of producing an overlay descriptor.
///
/// Every method yields the raw overlay JSON; parsing and caching are done by
/// the acquisition chain.
#[async_trait]
pub trait LoaderVendor: Send + Sync {
    /// Vendor metadata plus a ready-made combined archive, no installer run.
    async fn prebuilt_archive(&self, ctx: &AcquisitionContext<'_>) -> LauncherResult<String>;

    /// Run the vendor's own installer and read back what it produced.
    async fn vendor_installer(&self, _ctx: &AcquisitionContext<'_>) -> LauncherResult<String> {
        Err(LauncherError::Other(
            "this loader has no vendor installer".into(),
        ))
    }

    fn fallback_set(&self, ctx: &AcquisitionContext<'_>) -> FallbackSet;
}

/// Dispatcher sin Box<dyn>
pub enum Vendor {
    Fabric(FabricVendor),
    Quilt(FabricVendor),
    Forge(ForgeVendor),
    NeoForge(NeoForgeVendor),
}

impl Vendor {
    /// `None` for vanilla, which has no overlay.
    pub fn for_loader(loader: LoaderType) -> Option<Self> {
        match loader {
            LoaderType::Vanilla => None,
            LoaderType::Fabric => Some(Self::Fabric(FabricVendor::fabric())),
            LoaderType::Quilt => Some(Self::Quilt(FabricVendor::quilt())),
            LoaderType::Forge => Some(Self::Forge(ForgeVendor)),
            LoaderType::NeoForge => Some(Self::NeoForge(NeoForgeVendor)),
        }
    }

    pub fn loader(&self) -> LoaderType {
        match self {
            Vendor::Fabric(_) => LoaderType::Fabric,
            Vendor::Quilt(_) => LoaderType::Quilt,
            Vendor::Forge(_) => LoaderType::Forge,
            Vendor::NeoForge(_) => LoaderType::NeoForge,
        }
    }

    pub async fn prebuilt_archive(&self, ctx: &AcquisitionContext<'_>) -> LauncherResult<String> {
        match self {
            Vendor::Fabric(v) | Vendor::Quilt(v) => v.prebuilt_archive(ctx).await,
            Vendor::Forge(v) => v.prebuilt_archive(ctx).await,
            Vendor::NeoForge(v) => v.prebuilt_archive(ctx).await,
        }
    }

    pub async fn vendor_installer(&self, ctx: &AcquisitionContext<'_>) -> LauncherResult<String> {
        match self {
            Vendor::Fabric(v) | Vendor::Quilt(v) => v.vendor_installer(ctx).await,
            Vendor::Forge(v) => v.vendor_installer(ctx).await,
            Vendor::NeoForge(v) => v.vendor_installer(ctx).await,
        }
    }

    pub fn fallback_set(&self, ctx: &AcquisitionContext<'_>) -> FallbackSet {
        match self {
            Vendor::Fabric(v) | Vendor::Quilt(v) => v.fallback_set(ctx),
            Vendor::Forge(v) => v.fallback_set(ctx),
            Vendor::NeoForge(v) => v.fallback_set(ctx),
        }
    }
}
