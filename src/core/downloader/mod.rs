mod client;

pub use client::{sha1_hex, Downloader};

use async_trait::async_trait;

use crate::core::error::LauncherResult;

/// Network seam used by the artifact store and the metadata readers.
///
/// The production implementation is [`Downloader`]; tests swap in an
/// in-memory double.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// GET `url` and return the full body. Non-2xx statuses are errors
    /// carrying the status code.
    async fn fetch(&self, url: &str) -> LauncherResult<Vec<u8>>;
}
