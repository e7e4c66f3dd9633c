use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::natives::cleanup_natives;
use crate::core::launch::{LaunchPlan, LaunchRequest, OutputStream, ProcessHooks, ProcessState};
use crate::core::loaders::AcquisitionReport;
use crate::core::resolve::FetchFailure;
use crate::core::state::LauncherState;
use crate::core::version::{is_allowed, Platform, PlatformRule};

#[derive(Debug, Parser)]
#[command(name = "drk-launcher", version, about = "Resolve, assemble and launch Minecraft")]
pub struct Cli {
    /// Data root; defaults to the bootstrap redirect or the platform data dir.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the game and stream its output until it exits.
    Launch {
        #[arg(long)]
        request: PathBuf,
    },
    /// Resolve everything and print the argument vector without spawning.
    Plan {
        #[arg(long)]
        request: PathBuf,
        /// Print a JSON summary instead of one argument per line.
        #[arg(long)]
        json: bool,
    },
    /// Print the detected platform, optionally evaluating a rules file.
    Rules {
        /// JSON array of platform rules.
        #[arg(long)]
        check: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanSummary<'a> {
    version_id: &'a str,
    main_class: &'a str,
    module_path: &'a [PathBuf],
    classpath: &'a [PathBuf],
    args: &'a [String],
    acquisition: Option<&'a AcquisitionReport>,
    fetch_failures: &'a [FetchFailure],
}

impl<'a> From<&'a LaunchPlan> for PlanSummary<'a> {
    fn from(plan: &'a LaunchPlan) -> Self {
        Self {
            version_id: &plan.resolution.version_id,
            main_class: &plan.classpath.main_class,
            module_path: &plan.classpath.module_path,
            classpath: &plan.classpath.classpath,
            args: &plan.args,
            acquisition: plan.resolution.acquisition.as_ref(),
            fetch_failures: &plan.resolution.fetch_failures,
        }
    }
}

/// Run one subcommand; the returned value is the process exit code.
pub async fn execute(cli: Cli) -> LauncherResult<i32> {
    match cli.command {
        Command::Launch { request } => launch(cli.data_dir, &request).await,
        Command::Plan { request, json } => plan(cli.data_dir, &request, json).await,
        Command::Rules { check } => rules(check.as_deref()).await,
    }
}

async fn launch(data_dir: Option<PathBuf>, request_path: &Path) -> LauncherResult<i32> {
    let state = LauncherState::initialize(data_dir).await?;
    let request = LaunchRequest::from_file(request_path).await?;

    let hooks = ProcessHooks::new(
        |stream, line| match stream {
            OutputStream::Stdout => println!("{}", line),
            OutputStream::Stderr => eprintln!("{}", line),
        },
        |code| match code {
            Some(code) => info!("Game exited with code {}", code),
            None => warn!("Game process could not be started"),
        },
    );

    let mut process = state.launcher().launch(&request, hooks).await?;
    if let Some(pid) = process.pid() {
        info!("Game running with PID {}", pid);
    }

    let finished = tokio::select! {
        state = process.wait() => Some(state),
        _ = tokio::signal::ctrl_c() => None,
    };
    let final_state = match finished {
        Some(state) => state,
        None => {
            warn!("Interrupted, stopping the game");
            process.stop();
            process.wait().await
        }
    };

    Ok(match final_state {
        ProcessState::Exited(code) => code,
        ProcessState::Failed => 1,
        ProcessState::Created | ProcessState::Running => {
            error!("Supervisor ended in non-terminal state {:?}", final_state);
            1
        }
    })
}

async fn plan(data_dir: Option<PathBuf>, request_path: &Path, json: bool) -> LauncherResult<i32> {
    let state = LauncherState::initialize(data_dir).await?;
    let request = LaunchRequest::from_file(request_path).await?;
    let plan = state.launcher().plan(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&PlanSummary::from(&plan))?);
    } else {
        let mut out = std::io::stdout().lock();
        for line in std::iter::once(plan.program.display().to_string()).chain(plan.args.iter().cloned()) {
            writeln!(out, "{}", line).map_err(|e| LauncherError::io("<stdout>", e))?;
        }
    }
    info!("Command line: {}", plan.command_line());

    cleanup_natives(&plan.natives_dir).await;
    Ok(0)
}

async fn rules(check: Option<&Path>) -> LauncherResult<i32> {
    let platform = Platform::current();
    println!("platform: {}", platform);

    let Some(path) = check else {
        return Ok(0);
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    let rules: Vec<PlatformRule> = serde_json::from_str(&raw)?;
    let allowed = is_allowed(&rules, platform);
    println!("{}: {}", path.display(), if allowed { "allowed" } else { "disallowed" });
    Ok(if allowed { 0 } else { 2 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "drk-launcher",
            "plan",
            "--request",
            "req.json",
            "--json",
            "--data-dir",
            "/tmp/drk",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/drk")));
        match cli.command {
            Command::Plan { request, json } => {
                assert_eq!(request, PathBuf::from("req.json"));
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn launch_requires_a_request_file() {
        assert!(Cli::try_parse_from(["drk-launcher", "launch"]).is_err());
    }

    #[tokio::test]
    async fn rules_check_reports_disallowed_with_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"[{"action": "disallow"}]"#).unwrap();
        assert_eq!(rules(Some(&path)).await.unwrap(), 2);

        std::fs::write(&path, "[]").unwrap();
        assert_eq!(rules(Some(&path)).await.unwrap(), 0);
    }
}
