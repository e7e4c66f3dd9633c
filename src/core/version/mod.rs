pub mod index;
pub mod manifest;
pub mod reader;
pub mod rules;
pub mod version_file;

pub use index::{VersionIndex, VersionIndexEntry, VERSION_INDEX_URL};
pub use manifest::{DependencyEntry, EntryKind, ManifestArgument, VersionManifest};
pub use reader::{ManifestReader, MAX_INHERITANCE_DEPTH};
pub use rules::{is_allowed, is_allowed_with_features, Arch, OsName, Platform, PlatformRule};
