use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::resolve::ResolvedArtifact;
use crate::core::store::ArtifactStore;
use crate::core::version::EntryKind;

const NATIVE_EXTENSIONS: &[&str] = &[".dll", ".so", ".dylib", ".jnilib"];

/// Fresh natives directory for one launch of `instance`.
pub fn launch_natives_dir(store: &ArtifactStore, instance: &str) -> PathBuf {
    store
        .natives_dir()
        .join(format!("{}-{}", instance, uuid::Uuid::new_v4().simple()))
}

/// Extract `.dll`/`.so`/`.dylib`/`.jnilib` files from every native artifact
/// into `natives_dir`. Returns how many files were written.
pub async fn extract_natives(artifacts: &[ResolvedArtifact], natives_dir: &Path) -> LauncherResult<usize> {
    if natives_dir.exists() {
        let _ = tokio::fs::remove_dir_all(natives_dir).await;
    }
    tokio::fs::create_dir_all(natives_dir)
        .await
        .map_err(|e| LauncherError::io(natives_dir, e))?;

    let mut extracted = 0;
    for artifact in artifacts.iter().filter(|a| a.entry.kind == EntryKind::Native) {
        let jar_bytes = tokio::fs::read(&artifact.path)
            .await
            .map_err(|e| LauncherError::io(&artifact.path, e))?;

        let dest_dir = natives_dir.to_path_buf();
        let path_debug = artifact.path.clone();
        extracted += tokio::task::spawn_blocking(move || extract_archive(jar_bytes, &dest_dir, &path_debug))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))?;
    }

    debug!("Extracted {} native files into {:?}", extracted, natives_dir);
    Ok(extracted)
}

fn extract_archive(jar_bytes: Vec<u8>, dest_dir: &Path, path_debug: &Path) -> usize {
    let cursor = std::io::Cursor::new(jar_bytes);
    let mut archive = match zip::ZipArchive::new(cursor) {
        Ok(a) => a,
        Err(e) => {
            warn!("Cannot open native JAR {:?}: {}", path_debug, e);
            return 0;
        }
    };

    let mut count = 0;
    for i in 0..archive.len() {
        let Ok(mut file) = archive.by_index(i) else {
            continue;
        };
        let name = file.name().to_string();

        // Only top-level libraries; nested entries belong to other platforms.
        if name.contains("META-INF") || name.contains('/') || name.contains('\\') {
            continue;
        }
        if !NATIVE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
            continue;
        }

        let dest = dest_dir.join(&name);
        let mut out = match std::fs::File::create(&dest) {
            Ok(file) => file,
            Err(e) => {
                warn!("Cannot create {:?}: {}", dest, e);
                continue;
            }
        };
        if std::io::copy(&mut file, &mut out).is_ok() {
            debug!("Extracted native: {}", name);
            count += 1;
        }
    }
    count
}

/// Remove a per-launch natives directory once the game has exited.
pub async fn cleanup_natives(natives_dir: &Path) {
    if natives_dir.exists() {
        let _ = tokio::fs::remove_dir_all(natives_dir).await;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::core::version::DependencyEntry;

    fn native_jar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn resolved(path: PathBuf, kind: EntryKind) -> ResolvedArtifact {
        ResolvedArtifact {
            entry: DependencyEntry {
                coordinate: "org.lwjgl.lwjgl:lwjgl-platform:2.9.4:natives-linux".into(),
                path: "lwjgl-platform-2.9.4-natives-linux.jar".into(),
                url: None,
                size: None,
                sha1: None,
                rules: vec![],
                kind,
            },
            path,
        }
    }

    #[tokio::test]
    async fn only_top_level_native_files_are_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("natives.jar");
        std::fs::write(
            &jar,
            native_jar(&[
                ("liblwjgl.so", b"so"),
                ("META-INF/MANIFEST.MF", b"mf"),
                ("linux/x64/libnested.so", b"nested"),
                ("readme.txt", b"txt"),
            ]),
        )
        .unwrap();
        let library = dir.path().join("library.jar");
        std::fs::write(&library, native_jar(&[("libignored.so", b"x")])).unwrap();

        let natives = dir.path().join("natives");
        let count = extract_natives(
            &[
                resolved(jar, EntryKind::Native),
                resolved(library, EntryKind::Library),
            ],
            &natives,
        )
        .await
        .unwrap();

        assert_eq!(count, 1);
        assert!(natives.join("liblwjgl.so").exists());
        assert!(!natives.join("libignored.so").exists());
        assert!(!natives.join("libnested.so").exists());

        cleanup_natives(&natives).await;
        assert!(!natives.exists());
    }
}
