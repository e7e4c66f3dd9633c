// ─── Launch Diagnostics ───
// Known failure signatures in game output, surfaced once per kind as hints.

use std::collections::HashSet;

use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaunchDiagnostic {
    CorruptedLibraryArchive,
    EarlyDisplayRendererCrash,
    MixinTargetMissing,
    ModuleResolutionConflict,
    WrongJavaVersion,
}

pub fn detect_launch_diagnostic(line: &str) -> Option<LaunchDiagnostic> {
    if line.contains("ZipException: zip END header not found")
        || line.contains("java.util.zip.ZipException: invalid")
    {
        return Some(LaunchDiagnostic::CorruptedLibraryArchive);
    }

    if line.contains("rendererFuture") || line.contains("DisplayWindow.takeOverGlfwWindow") {
        return Some(LaunchDiagnostic::EarlyDisplayRendererCrash);
    }

    if line.contains("InvalidMixinException") || line.contains("MixinTargetAlreadyLoadedException")
        || (line.contains("Mixin") && line.contains("target") && line.contains("was not found"))
    {
        return Some(LaunchDiagnostic::MixinTargetMissing);
    }

    if line.contains("java.lang.module.ResolutionException")
        || line.contains("java.lang.module.FindException")
        || line.contains("LayerInstantiationException")
    {
        return Some(LaunchDiagnostic::ModuleResolutionConflict);
    }

    if line.contains("UnsupportedClassVersionError")
        || line.contains("has been compiled by a more recent version of the Java Runtime")
    {
        return Some(LaunchDiagnostic::WrongJavaVersion);
    }

    None
}

pub fn diagnostic_message(diagnostic: LaunchDiagnostic) -> &'static str {
    match diagnostic {
        LaunchDiagnostic::CorruptedLibraryArchive => {
            "A library archive is damaged (zip END header not found). Delete the jar named in the log under libraries/ and launch again to force a clean download."
        }
        LaunchDiagnostic::EarlyDisplayRendererCrash => {
            "The loader's early display failed (rendererFuture is null). Update the loader, use a clean 64-bit Java 17/21 and disable GPU overlays."
        }
        LaunchDiagnostic::MixinTargetMissing => {
            "A mixin could not find its target class. A mod is probably built for a different game or loader version."
        }
        LaunchDiagnostic::ModuleResolutionConflict => {
            "The module layer could not be resolved. Two jars likely export the same package; check the module path for duplicates."
        }
        LaunchDiagnostic::WrongJavaVersion => {
            "Classes were compiled for a newer Java than the selected runtime. Pick a runtime matching the version's required Java."
        }
    }
}

/// Remembers which hints were already reported for one process.
#[derive(Debug, Default)]
pub struct DiagnosticTracker {
    seen: HashSet<LaunchDiagnostic>,
}

impl DiagnosticTracker {
    /// Returns the diagnostic the first time its signature shows up.
    pub fn observe(&mut self, line: &str) -> Option<LaunchDiagnostic> {
        let diagnostic = detect_launch_diagnostic(line)?;
        self.seen.insert(diagnostic).then_some(diagnostic)
    }

    /// `observe` plus the tracing report.
    pub fn report(&mut self, instance: &str, line: &str) {
        if let Some(diagnostic) = self.observe(line) {
            error!("[mc:{}] {}", instance, diagnostic_message(diagnostic));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_is_reported_once() {
        let mut tracker = DiagnosticTracker::default();
        let line = "java.util.zip.ZipException: zip END header not found";

        assert_eq!(tracker.observe(line), Some(LaunchDiagnostic::CorruptedLibraryArchive));
        assert_eq!(tracker.observe(line), None);
        assert_eq!(
            tracker.observe("Exception in thread \"main\" java.lang.module.ResolutionException: Modules a and b export package x"),
            Some(LaunchDiagnostic::ModuleResolutionConflict)
        );
        assert_eq!(tracker.observe("[Render thread/INFO]: Setting user: Steve"), None);
    }

    #[test]
    fn wrong_java_is_recognized() {
        let line = "java.lang.UnsupportedClassVersionError: net/minecraft/client/main/Main has been compiled by a more recent version of the Java Runtime (class file version 65.0)";
        assert_eq!(detect_launch_diagnostic(line), Some(LaunchDiagnostic::WrongJavaVersion));
    }
}
