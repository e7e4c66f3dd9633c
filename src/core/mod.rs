// ─── DRK Launcher Core ───
// Resolves a game version (plus an optional mod loader) into a JVM command
// line and supervises the running game.
//
// Architecture:
//   core/
//     store/      On-disk artifact cache behind the fetcher seam
//     version/    Version index, descriptors, inheritance, OS rules
//     maven/      Coordinates, POM parsing, transitive resolution
//     loaders/    Fabric, Quilt, Forge, NeoForge overlay acquisition
//     resolve/    Dependency set: rules, dedup, concurrent fetch
//     launch/     Partitioner, argument builder, process supervisor
//     downloader/ reqwest-backed fetcher with SHA-1 helpers
//     state/      Settings and data root

pub mod auth;
pub mod downloader;
pub mod error;
pub mod http;
pub mod instance;
pub mod launch;
pub mod loaders;
pub mod maven;
pub mod resolve;
pub mod state;
pub mod store;
pub mod version;
