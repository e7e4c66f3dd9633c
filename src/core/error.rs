use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launcher core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Size mismatch for {path:?}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    // ── Manifests ───────────────────────────────────────
    #[error("Version manifest not found: {id}")]
    ManifestNotFound { id: String },

    #[error("Malformed version manifest {id}: {reason}")]
    ManifestParse { id: String, reason: String },

    // ── Resolution ──────────────────────────────────────
    #[error("Failed to fetch {coordinate}{}", .http_status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    DependencyFetchFailed {
        coordinate: String,
        http_status: Option<u16>,
    },

    #[error("Resolution incomplete, missing required artifacts: {}", .missing.join(", "))]
    ResolutionIncomplete { missing: Vec<String> },

    #[error("Could not acquire loader overlay {overlay_id}: {}", .attempts.join("; "))]
    LoaderAcquisitionFailed {
        overlay_id: String,
        attempts: Vec<String>,
    },

    // ── Launch ──────────────────────────────────────────
    #[error("Classpath and module path are both empty, nothing to launch")]
    ClasspathEmpty,

    #[error("Failed to start {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid launch request: {0}")]
    InvalidRequest(String),

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    #[error("POM parse error: {0}")]
    PomParse(String),

    // ── XML ─────────────────────────────────────────────
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Settings ────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    /// Attach a path to a bare IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status carried by a network failure, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            LauncherError::DownloadFailed { status, .. } => Some(*status),
            LauncherError::DependencyFetchFailed { http_status, .. } => *http_status,
            LauncherError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
