pub mod model;

pub use model::{normalize_loader_version, safe_name, InstanceMetadata, LoaderType};
