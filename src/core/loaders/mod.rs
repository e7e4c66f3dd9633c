pub mod acquisition;
pub mod context;
pub mod fabric;
pub mod forge;
pub mod installer;
pub mod neoforge;

pub use acquisition::{
    acquire_overlay, AcquiredOverlay, AcquisitionReport, AcquisitionStrategy, OverlaySource,
    StrategyFailure,
};
pub use context::AcquisitionContext;
pub use installer::{FallbackSet, LoaderVendor, Vendor};
