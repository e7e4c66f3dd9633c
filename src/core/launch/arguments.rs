// ─── Launch Arguments ───
// Builds the full ordered argument vector for the game JVM.
//
//   memory → baseline → platform → dirs/brand → loader flags → manifest JVM
//   → caller JVM → module path / classpath → main class → game args
//   → loader game args → caller game args

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::partition::ClasspathPlan;
use super::request::LaunchRequest;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::LoaderType;
use crate::core::version::{is_allowed_with_features, ManifestArgument, OsName, Platform};

pub const DEFAULT_MEMORY_FLOOR_MB: u32 = 512;
pub const LAUNCHER_NAME: &str = "DRK-Launcher";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

const BASELINE_JVM_FLAGS: &[&str] = &[
    "-XX:+UnlockExperimentalVMOptions",
    "-XX:+UseG1GC",
    "-XX:G1NewSizePercent=30",
    "-XX:G1MaxNewSizePercent=40",
    "-XX:G1HeapRegionSize=8M",
    "-XX:G1ReservePercent=20",
    "-XX:MaxGCPauseMillis=120",
    "-XX:+ParallelRefProcEnabled",
    "-XX:+DisableExplicitGC",
    "-XX:ReservedCodeCacheSize=512M",
    "-Dfile.encoding=UTF-8",
    "-Djava.net.preferIPv4Stack=true",
];

/// Everything the builder needs besides the request and the plan.
#[derive(Debug, Clone)]
pub struct ArgumentContext<'a> {
    pub platform: Platform,
    pub natives_dir: &'a Path,
    pub libraries_dir: &'a Path,
    pub assets_dir: &'a Path,
    pub asset_index: Option<&'a str>,
    pub version_type: Option<&'a str>,
    pub jvm_arguments: &'a [ManifestArgument],
    pub game_arguments: &'a [ManifestArgument],
    /// Pre-1.13 `minecraftArguments`, used when no game arguments are declared.
    pub legacy_arguments: Option<&'a str>,
    pub memory_floor_mb: u32,
}

/// Substitution values shared by JVM and game placeholders.
struct Placeholders<'a> {
    request: &'a LaunchRequest,
    ctx: &'a ArgumentContext<'a>,
    classpath: String,
    separator: &'static str,
}

impl Placeholders<'_> {
    fn jvm(&self, raw: &str) -> String {
        raw.replace("${natives_directory}", &path_str(self.ctx.natives_dir))
            .replace("${library_directory}", &path_str(self.ctx.libraries_dir))
            .replace("${classpath_separator}", self.separator)
            .replace("${classpath}", &self.classpath)
            .replace("${game_directory}", &path_str(&self.request.game_dir))
            .replace("${version_name}", &self.request.version_name())
            .replace("${mc_version}", &self.request.version_id)
            .replace("${launcher_name}", LAUNCHER_NAME)
            .replace("${launcher_version}", LAUNCHER_VERSION)
    }

    fn game(&self, raw: &str) -> String {
        let identity = &self.request.identity;
        let mut resolved = raw
            .replace("${auth_player_name}", &identity.username)
            .replace("${version_name}", &self.request.version_name())
            .replace("${mc_version}", &self.request.version_id)
            .replace("${game_directory}", &path_str(&self.request.game_dir))
            .replace("${assets_root}", &path_str(self.ctx.assets_dir))
            .replace("${game_assets}", &path_str(self.ctx.assets_dir))
            .replace("${assets_index_name}", self.asset_index())
            .replace("${auth_uuid}", &identity.uuid)
            .replace("${auth_access_token}", &identity.access_token)
            .replace("${auth_session}", &identity.access_token)
            .replace("${auth_xuid}", "0")
            .replace("${user_properties}", "{}")
            .replace("${user_type}", &identity.user_type)
            .replace("${version_type}", self.version_type());

        if let Some(window) = self.request.window {
            resolved = resolved
                .replace("${resolution_width}", &window.width.to_string())
                .replace("${resolution_height}", &window.height.to_string());
        }
        resolved
    }

    fn asset_index(&self) -> &str {
        self.ctx.asset_index.unwrap_or("legacy")
    }

    fn version_type(&self) -> &str {
        self.ctx.version_type.unwrap_or("release")
    }
}

/// Assemble the argument vector. Fails before anything is spawned when
/// there is nothing to put on either path.
pub fn build_arguments(
    request: &LaunchRequest,
    plan: &ClasspathPlan,
    ctx: &ArgumentContext<'_>,
) -> LauncherResult<Vec<String>> {
    if plan.is_empty() {
        return Err(LauncherError::ClasspathEmpty);
    }

    let separator = match ctx.platform.os {
        OsName::Windows => ";",
        _ => ":",
    };
    let placeholders = Placeholders {
        request,
        ctx,
        classpath: join_paths(&plan.classpath, separator),
        separator,
    };
    let features = launcher_features(request);

    let mut args = memory_flags(request, ctx.memory_floor_mb);
    args.extend(BASELINE_JVM_FLAGS.iter().map(|f| f.to_string()));
    args.extend(platform_flags(ctx.platform));
    args.push(format!("-Djava.library.path={}", path_str(ctx.natives_dir)));
    args.push(format!("-DlibraryDirectory={}", path_str(ctx.libraries_dir)));
    args.push(format!("-Dminecraft.launcher.brand={}", LAUNCHER_NAME));
    args.push(format!("-Dminecraft.launcher.version={}", LAUNCHER_VERSION));

    // ── Loader + manifest JVM arguments ──
    let mut declared_jvm = sanitize_jvm_args(
        &flatten_arguments(ctx.jvm_arguments, ctx.platform, &features),
        &placeholders,
    );
    declared_jvm.retain(|arg| !args.contains(arg));
    let loader_flags = loader_jvm_flags(request, plan, &mut declared_jvm);
    args.extend(loader_flags);
    args.extend(declared_jvm);

    args.extend(request.extra_jvm_args.iter().cloned());

    // ── Paths ──
    if !plan.module_path.is_empty() {
        args.push("--module-path".into());
        args.push(join_paths(&plan.module_path, separator));
    }
    if !plan.classpath.is_empty() {
        args.push("-cp".into());
        args.push(placeholders.classpath.clone());
    }

    args.push(plan.main_class.clone());

    // ── Game arguments ──
    let identity = &request.identity;
    let mut game = vec![
        "--username".to_string(),
        identity.username.clone(),
        "--version".into(),
        request.version_name(),
        "--gameDir".into(),
        path_str(&request.game_dir),
        "--assetsDir".into(),
        path_str(ctx.assets_dir),
        "--assetIndex".into(),
        placeholders.asset_index().to_string(),
        "--uuid".into(),
        identity.uuid.clone(),
        "--accessToken".into(),
        identity.access_token.clone(),
        "--userType".into(),
        identity.user_type.clone(),
        "--versionType".into(),
        placeholders.version_type().to_string(),
    ];
    if let Some(window) = request.window {
        game.extend([
            "--width".to_string(),
            window.width.to_string(),
            "--height".into(),
            window.height.to_string(),
        ]);
    }

    let declared_game: Vec<String> = if ctx.game_arguments.is_empty() {
        ctx.legacy_arguments
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    } else {
        flatten_arguments(ctx.game_arguments, ctx.platform, &features)
    };
    let declared_game = sanitize_game_args(&declared_game, &placeholders);
    append_missing_flags(&mut game, declared_game);
    let game = ensure_loader_game_args(request, sanitize_numeric_window_args(game));

    args.extend(game);
    args.extend(request.extra_game_args.iter().cloned());

    debug!("Built {} launch arguments", args.len());
    Ok(args)
}

fn memory_flags(request: &LaunchRequest, floor_mb: u32) -> Vec<String> {
    let max = request.memory.max_mb.max(floor_mb);
    let min = request
        .memory
        .min_mb
        .unwrap_or(max / 4)
        .max(floor_mb)
        .min(max);
    vec![format!("-Xms{}m", min), format!("-Xmx{}m", max)]
}

fn platform_flags(platform: Platform) -> Vec<String> {
    match platform.os {
        OsName::MacOs => vec!["-XstartOnFirstThread".into()],
        OsName::Windows => vec![
            "-XX:HeapDumpPath=MojangTricksIntelDriversForPerformance_javaw.exe_minecraft.exe.heapdump".into(),
        ],
        OsName::Linux => Vec::new(),
    }
}

fn launcher_features(request: &LaunchRequest) -> BTreeMap<String, bool> {
    let mut features = BTreeMap::new();
    features.insert("is_demo_user".to_string(), false);
    features.insert("has_custom_resolution".to_string(), request.window.is_some());
    features.insert("has_quick_plays_support".to_string(), false);
    features
}

/// Rule-filtered, flattened argument values.
fn flatten_arguments(
    arguments: &[ManifestArgument],
    platform: Platform,
    features: &BTreeMap<String, bool>,
) -> Vec<String> {
    arguments
        .iter()
        .filter(|arg| is_allowed_with_features(&arg.rules, platform, features))
        .flat_map(|arg| arg.values.iter().cloned())
        .collect()
}

/// Path switches the builder controls itself; dropped with their value.
fn is_path_switch(arg: &str) -> bool {
    matches!(
        arg,
        "-cp" | "-classpath" | "--class-path" | "-p" | "--module-path"
    )
}

fn sanitize_jvm_args(raw_args: &[String], placeholders: &Placeholders<'_>) -> Vec<String> {
    let mut sanitized = Vec::new();
    let mut i = 0;

    while i < raw_args.len() {
        let arg = &raw_args[i];

        if is_path_switch(arg) {
            i += 2;
            continue;
        }
        if arg.starts_with("--module-path=") || arg.starts_with("--class-path=") {
            i += 1;
            continue;
        }

        let resolved = placeholders.jvm(arg);
        if resolved.contains("${") {
            debug!("Dropping unresolved JVM argument {}", arg);
            drop_dangling_option(&mut sanitized, &resolved);
            i += 1;
            continue;
        }

        sanitized.push(resolved);
        i += 1;
    }

    sanitized
}

fn sanitize_game_args(raw_args: &[String], placeholders: &Placeholders<'_>) -> Vec<String> {
    let mut sanitized = Vec::new();

    for arg in raw_args {
        let resolved = placeholders.game(arg);
        if resolved.contains("${") {
            debug!("Dropping unresolved game argument {}", arg);
            drop_dangling_option(&mut sanitized, &resolved);
            continue;
        }
        sanitized.push(resolved);
    }

    sanitized
}

/// An unresolved value takes its option with it; an unresolved
/// self-contained option (`-Dx=${..}`) goes alone.
fn drop_dangling_option(args: &mut Vec<String>, unresolved: &str) {
    if unresolved.starts_with('-') {
        return;
    }
    if args
        .last()
        .is_some_and(|last| last.starts_with('-') && !last.contains('='))
    {
        let _ = args.pop();
    }
}

/// Append declared `--flag [value]` groups whose flag is not set yet.
fn append_missing_flags(args: &mut Vec<String>, declared: Vec<String>) {
    let mut i = 0;
    while i < declared.len() {
        let flag = &declared[i];
        let value = declared
            .get(i + 1)
            .filter(|next| !next.starts_with("--"));
        let width = if value.is_some() { 2 } else { 1 };

        if !flag.starts_with("--") || !contains_flag(args, flag) {
            args.push(flag.clone());
            if let Some(value) = value {
                args.push(value.clone());
            }
        }
        i += width;
    }
}

fn contains_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

fn sanitize_numeric_window_args(args: Vec<String>) -> Vec<String> {
    let mut sanitized = Vec::with_capacity(args.len());
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        if arg == "--width" || arg == "--height" {
            let Some(value) = args.get(i + 1) else {
                i += 1;
                continue;
            };

            if value.starts_with('-') || value.parse::<u32>().is_err() {
                i += 1;
                continue;
            }

            sanitized.push(arg.clone());
            sanitized.push(value.clone());
            i += 2;
            continue;
        }

        sanitized.push(arg.clone());
        i += 1;
    }

    sanitized
}

// ── Loader specifics ──

fn modern_forge_jvm_arg_pairs() -> Vec<(&'static str, &'static str)> {
    vec![
        ("--add-opens", "java.base/java.util.jar=ALL-UNNAMED"),
        ("--add-opens", "java.base/java.lang=ALL-UNNAMED"),
        ("--add-opens", "java.base/java.util=ALL-UNNAMED"),
        ("--add-opens", "java.base/java.lang.invoke=ALL-UNNAMED"),
        ("--add-opens", "java.base/java.lang.reflect=ALL-UNNAMED"),
        ("--add-opens", "java.base/java.nio.file=ALL-UNNAMED"),
        ("--add-opens", "java.base/sun.security.util=ALL-UNNAMED"),
        ("--add-exports", "java.base/sun.security.action=ALL-UNNAMED"),
        ("--add-opens", "java.base/java.io=ALL-UNNAMED"),
        ("--add-opens", "java.base/java.net=ALL-UNNAMED"),
        ("--add-opens", "java.base/sun.nio.ch=ALL-UNNAMED"),
    ]
}

/// Loader JVM flags not already declared by the manifest. System
/// properties the loader must control are removed from `declared`.
fn loader_jvm_flags(
    request: &LaunchRequest,
    plan: &ClasspathPlan,
    declared: &mut Vec<String>,
) -> Vec<String> {
    let mut flags = Vec::new();
    if !request.loader.is_forge_like() {
        return flags;
    }

    if !plan.module_path.is_empty() {
        ensure_jvm_arg_present(&mut flags, declared, "--add-modules=ALL-MODULE-PATH");
        for (flag, value) in modern_forge_jvm_arg_pairs() {
            ensure_jvm_arg_pair_present(&mut flags, declared, flag, value);
        }
    }

    if request.loader == LoaderType::NeoForge {
        ensure_jvm_arg_present(&mut flags, declared, "--add-modules=jdk.naming.dns");
        set_jvm_system_property(&mut flags, declared, "ignoreList", "bootstraplauncher,neon-fml");
        // Early display crashes on some GPU/overlay setups.
        set_jvm_system_property(&mut flags, declared, "fml.earlyprogresswindow", "false");
        set_jvm_system_property(&mut flags, declared, "forge.earlywindow", "false");
        set_jvm_system_property(&mut flags, declared, "neoforge.earlydisplay", "false");
    }

    flags
}

fn ensure_jvm_arg_pair_present(args: &mut Vec<String>, declared: &[String], flag: &str, value: &str) {
    let combined = format!("{}={}", flag, value);
    let has_pair = |list: &[String]| {
        list.iter().any(|arg| arg == &combined)
            || list.windows(2).any(|w| w[0] == flag && w[1] == value)
    };
    if has_pair(args) || has_pair(declared) {
        return;
    }

    args.push(flag.to_string());
    args.push(value.to_string());
}

fn ensure_jvm_arg_present(args: &mut Vec<String>, declared: &[String], flag_with_value: &str) {
    if args.iter().chain(declared).any(|arg| arg == flag_with_value) {
        return;
    }

    args.push(flag_with_value.to_string());
}

fn set_jvm_system_property(args: &mut Vec<String>, declared: &mut Vec<String>, property: &str, value: &str) {
    let prefix = format!("-D{}=", property);
    args.retain(|arg| !arg.starts_with(&prefix));
    declared.retain(|arg| !arg.starts_with(&prefix));
    args.push(format!("{}{}", prefix, value));
}

fn launch_target(request: &LaunchRequest) -> Option<&'static str> {
    match request.loader {
        LoaderType::Forge => Some("forgeclient"),
        // The 1.20.1 NeoForge fork still ships Forge's launch target.
        LoaderType::NeoForge if request.version_id == "1.20.1" => Some("forgeclient"),
        LoaderType::NeoForge => Some("neoforgeclient"),
        _ => None,
    }
}

fn ensure_loader_game_args(request: &LaunchRequest, mut args: Vec<String>) -> Vec<String> {
    if !request.loader.is_forge_like() {
        return args;
    }

    if let Some(target) = launch_target(request) {
        if !contains_flag(&args, "--launchTarget") {
            args.push("--launchTarget".into());
            args.push(target.into());
        }
    }

    if !contains_flag(&args, "--fml.mcVersion") {
        args.push("--fml.mcVersion".into());
        args.push(request.version_id.clone());
    }

    let version_flag = match request.loader {
        LoaderType::NeoForge => "--fml.neoForgeVersion",
        _ => "--fml.forgeVersion",
    };
    if let Some(loader_version) = request.loader_version() {
        if !contains_flag(&args, version_flag) {
            args.push(version_flag.into());
            args.push(loader_version);
        }
    }

    args
}

// ── Paths and parsing helpers ──

/// Display form of a path; strips the Windows extended-length prefix,
/// which Java's classpath handling rejects.
pub fn path_str(path: &Path) -> String {
    let text = path.to_string_lossy().to_string();
    match text.strip_prefix(r"\\?\") {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

fn join_paths(paths: &[PathBuf], separator: &str) -> String {
    paths
        .iter()
        .map(|p| path_str(p))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Split the value following `flag` back into a path list.
pub fn split_path_argument(args: &[String], flag: &str, separator: &str) -> Option<Vec<PathBuf>> {
    let index = args.iter().position(|arg| arg == flag)?;
    let value = args.get(index + 1)?;
    Some(
        value
            .split(separator)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect(),
    )
}

/// Copy/paste-able command line for the logs.
pub fn format_command_line(program: &Path, args: &[String]) -> String {
    let program = shell_escape(&program.to_string_lossy());
    let args = args
        .iter()
        .map(|arg| shell_escape(arg))
        .collect::<Vec<_>>()
        .join(" ");

    if args.is_empty() {
        program
    } else {
        format!("{} {}", program, args)
    }
}

pub fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::core::auth::LaunchIdentity;
    use crate::core::launch::request::{MemoryBounds, WindowGeometry};
    use crate::core::version::{Arch, PlatformRule};

    const LINUX: Platform = Platform {
        os: OsName::Linux,
        arch: Arch::X86_64,
    };

    fn ctx<'a>(jvm: &'a [ManifestArgument], game: &'a [ManifestArgument]) -> ArgumentContext<'a> {
        ArgumentContext {
            platform: LINUX,
            natives_dir: Path::new("/data/natives/run"),
            libraries_dir: Path::new("/data/libraries"),
            assets_dir: Path::new("/data/assets"),
            asset_index: Some("5"),
            version_type: Some("release"),
            jvm_arguments: jvm,
            game_arguments: game,
            legacy_arguments: None,
            memory_floor_mb: DEFAULT_MEMORY_FLOOR_MB,
        }
    }

    fn plain(values: &[&str]) -> ManifestArgument {
        ManifestArgument {
            values: values.iter().map(|v| v.to_string()).collect(),
            rules: vec![],
        }
    }

    fn vanilla_plan() -> ClasspathPlan {
        ClasspathPlan {
            module_path: vec![],
            classpath: vec![
                PathBuf::from("/data/libraries/guava.jar"),
                PathBuf::from("/data/versions/1.20.1/1.20.1.jar"),
            ],
            main_class: "net.minecraft.client.main.Main".into(),
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        let i = args.iter().position(|a| a == flag)?;
        args.get(i + 1).map(String::as_str)
    }

    #[test]
    fn vanilla_request_uses_classpath_only() {
        let mut request = LaunchRequest::vanilla("/usr/bin/java", "1.20.1", "/games/vanilla");
        request.memory = MemoryBounds {
            min_mb: None,
            max_mb: 4096,
        };
        request.identity = LaunchIdentity::offline("Steve");

        let args = build_arguments(&request, &vanilla_plan(), &ctx(&[], &[])).unwrap();

        assert_eq!(args[0], "-Xms1024m");
        assert_eq!(args[1], "-Xmx4096m");
        assert!(!args.contains(&"--module-path".to_string()));
        assert!(args.contains(&"-cp".to_string()));
        assert_eq!(value_after(&args, "--version"), Some("1.20.1"));
        assert_eq!(value_after(&args, "--assetIndex"), Some("5"));

        let main = args.iter().position(|a| a == "net.minecraft.client.main.Main").unwrap();
        let cp = args.iter().position(|a| a == "-cp").unwrap();
        assert!(cp < main);
        assert_eq!(args[main + 1], "--username");
    }

    #[test]
    fn memory_floor_and_min_clamp() {
        let mut request = LaunchRequest::vanilla("java", "1.20.1", "/g");
        request.memory = MemoryBounds {
            min_mb: Some(8192),
            max_mb: 256,
        };
        assert_eq!(memory_flags(&request, 512), vec!["-Xms512m", "-Xmx512m"]);

        request.memory = MemoryBounds {
            min_mb: Some(100),
            max_mb: 2048,
        };
        assert_eq!(memory_flags(&request, 512), vec!["-Xms512m", "-Xmx2048m"]);
    }

    #[test]
    fn empty_plan_fails_fast() {
        let request = LaunchRequest::vanilla("java", "1.20.1", "/g");
        let plan = ClasspathPlan {
            main_class: "Main".into(),
            ..ClasspathPlan::default()
        };
        let err = build_arguments(&request, &plan, &ctx(&[], &[])).unwrap_err();
        assert!(matches!(err, LauncherError::ClasspathEmpty));
    }

    #[test]
    fn paths_round_trip_through_arguments() {
        let request = LaunchRequest::vanilla("java", "1.20.1", "/g").with_loader(LoaderType::Forge, "47.2.0");
        let plan = ClasspathPlan {
            module_path: vec![
                PathBuf::from("/lib/forge-1.20.1-47.2.0-client.jar"),
                PathBuf::from("/lib/bootstraplauncher-1.1.2.jar"),
                PathBuf::from("/lib/modlauncher-10.0.9.jar"),
            ],
            classpath: vec![
                PathBuf::from("/lib/guava-31.1-jre.jar"),
                PathBuf::from("/versions/1.20.1/1.20.1.jar"),
            ],
            main_class: "cpw.mods.bootstraplauncher.BootstrapLauncher".into(),
        };

        let args = build_arguments(&request, &plan, &ctx(&[], &[])).unwrap();

        let module_path = split_path_argument(&args, "--module-path", ":").unwrap();
        assert_eq!(module_path, plan.module_path);
        let classpath: HashSet<PathBuf> = split_path_argument(&args, "-cp", ":")
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(classpath, plan.classpath.iter().cloned().collect());

        assert!(args.contains(&"--add-modules=ALL-MODULE-PATH".to_string()));
        assert_eq!(value_after(&args, "--launchTarget"), Some("forgeclient"));
        assert_eq!(value_after(&args, "--fml.forgeVersion"), Some("47.2.0"));
        assert_eq!(value_after(&args, "--fml.mcVersion"), Some("1.20.1"));
    }

    #[test]
    fn manifest_jvm_args_lose_path_switches_and_unresolved_tokens() {
        let request = LaunchRequest::vanilla("java", "1.20.1", "/g");
        let jvm = vec![
            plain(&["-Djava.library.path=${natives_directory}"]),
            plain(&["-cp", "${classpath}"]),
            plain(&["-p", "${library_directory}/a.jar"]),
            plain(&["-Dsomething=${unknown_placeholder}"]),
            plain(&["-Dos.name=Windows 10"]),
            ManifestArgument {
                values: vec!["-XstartOnFirstThread".into()],
                rules: vec![PlatformRule::allow().for_os("osx")],
            },
        ];

        let args = build_arguments(&request, &vanilla_plan(), &ctx(&jvm, &[])).unwrap();

        assert_eq!(args.iter().filter(|a| *a == "-cp").count(), 1);
        assert!(!args.contains(&"-p".to_string()));
        assert!(!args.iter().any(|a| a.contains("${")));
        assert!(!args.contains(&"-XstartOnFirstThread".to_string()));
        assert_eq!(
            args.iter()
                .filter(|a| *a == "-Djava.library.path=/data/natives/run")
                .count(),
            1
        );
    }

    #[test]
    fn declared_game_args_do_not_repeat_existing_flags() {
        let mut request = LaunchRequest::vanilla("java", "1.20.1", "/g");
        request.window = Some(WindowGeometry {
            width: 1280,
            height: 720,
        });
        request.extra_game_args = vec!["--server".into(), "example.org".into()];
        let game = vec![
            plain(&["--username", "${auth_player_name}", "--version", "${version_name}"]),
            plain(&["--clientId", "${clientid}"]),
            ManifestArgument {
                values: vec![
                    "--width".into(),
                    "${resolution_width}".into(),
                    "--height".into(),
                    "${resolution_height}".into(),
                ],
                rules: vec![PlatformRule {
                    features: [("has_custom_resolution".to_string(), true)].into_iter().collect(),
                    ..PlatformRule::allow()
                }],
            },
            plain(&["--demo"]),
        ];

        let args = build_arguments(&request, &vanilla_plan(), &ctx(&[], &game)).unwrap();

        assert_eq!(args.iter().filter(|a| *a == "--username").count(), 1);
        assert_eq!(args.iter().filter(|a| *a == "--width").count(), 1);
        assert!(!args.contains(&"--clientId".to_string()));
        assert!(args.contains(&"--demo".to_string()));
        assert_eq!(&args[args.len() - 2..], ["--server", "example.org"]);
    }

    #[test]
    fn neoforge_overrides_early_display_properties() {
        let request = LaunchRequest::vanilla("java", "1.21.1", "/g").with_loader(LoaderType::NeoForge, "21.1.80");
        let plan = ClasspathPlan {
            module_path: vec![PathBuf::from("/lib/neoforge-21.1.80-client.jar")],
            classpath: vec![],
            main_class: "cpw.mods.bootstraplauncher.BootstrapLauncher".into(),
        };
        let jvm = vec![
            plain(&["-Dfml.earlyprogresswindow=true"]),
            plain(&["--add-modules=ALL-MODULE-PATH"]),
        ];

        let args = build_arguments(&request, &plan, &ctx(&jvm, &[])).unwrap();

        assert!(args.contains(&"-Dfml.earlyprogresswindow=false".to_string()));
        assert!(!args.contains(&"-Dfml.earlyprogresswindow=true".to_string()));
        assert!(args.contains(&"-Dneoforge.earlydisplay=false".to_string()));
        assert_eq!(
            args.iter().filter(|a| *a == "--add-modules=ALL-MODULE-PATH").count(),
            1
        );
        assert_eq!(value_after(&args, "--launchTarget"), Some("neoforgeclient"));
        assert_eq!(value_after(&args, "--fml.neoForgeVersion"), Some("21.1.80"));
    }

    #[test]
    fn command_line_is_shell_escaped() {
        let line = format_command_line(
            Path::new("/usr/bin/java"),
            &["-Dos.name=Windows 10".into(), "-cp".into(), "".into()],
        );
        assert_eq!(line, "/usr/bin/java \"-Dos.name=Windows 10\" -cp \"\"");
    }
}
