// ─── Process Supervisor ───
// Created → Running → Exited(code) | Failed
//
// Two readers (stdout, stderr) write every line to the instance's daily log
// and to `on_data`. `on_exit` fires exactly once: with the exit code, or
// with `None` when the process never started.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::arguments::{format_command_line, path_str};
use super::diagnostics::DiagnosticTracker;
use super::log_sink::{GameLogSink, OutputStream};
use super::natives::cleanup_natives;

pub type DataCallback = Arc<dyn Fn(OutputStream, &str) + Send + Sync>;
pub type ExitCallback = Arc<dyn Fn(Option<i32>) + Send + Sync>;

/// Caller-supplied output and exit callbacks.
#[derive(Clone)]
pub struct ProcessHooks {
    pub on_data: DataCallback,
    pub on_exit: ExitCallback,
}

impl ProcessHooks {
    pub fn new(
        on_data: impl Fn(OutputStream, &str) + Send + Sync + 'static,
        on_exit: impl Fn(Option<i32>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_data: Arc::new(on_data),
            on_exit: Arc::new(on_exit),
        }
    }

    pub fn silent() -> Self {
        Self::new(|_, _| {}, |_| {})
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Created,
    Running,
    Exited(i32),
    /// The OS refused to start the process.
    Failed,
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Exited(_) | ProcessState::Failed)
    }
}

/// What to run and where.
#[derive(Debug, Clone)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Added to the platform library search path; removed after exit.
    pub natives_dir: Option<PathBuf>,
    /// File-system safe instance name used for the log file.
    pub instance: String,
}

/// Handle to a supervised game process.
pub struct LaunchProcess {
    pid: Option<u32>,
    state: watch::Receiver<ProcessState>,
    kill: Option<oneshot::Sender<()>>,
}

impl LaunchProcess {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    /// Request termination and drop the handle right away; does not wait
    /// for the process to die.
    pub fn stop(&mut self) {
        if let Some(kill) = self.kill.take() {
            info!("Stop requested for pid {:?}", self.pid);
            let _ = kill.send(());
        }
    }

    pub fn is_stoppable(&self) -> bool {
        self.kill.is_some()
    }

    /// Resolve once the state is terminal.
    pub async fn wait(&mut self) -> ProcessState {
        let terminal = self.state.wait_for(|s| s.is_terminal()).await.map(|s| *s);
        match terminal {
            Ok(state) => state,
            Err(_) => *self.state.borrow(),
        }
    }
}

pub struct ProcessSupervisor {
    logs_dir: PathBuf,
}

impl ProcessSupervisor {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
        }
    }

    /// Start the process. Never fails: a spawn error becomes
    /// `ProcessState::Failed` plus `on_exit(None)`.
    pub async fn spawn(&self, command: LaunchCommand, hooks: ProcessHooks) -> LaunchProcess {
        let (state_tx, state_rx) = watch::channel(ProcessState::Created);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(natives) = &command.natives_dir {
            configure_native_library_env(&mut cmd, natives);
        }
        configure_platform_spawn(&mut cmd);

        info!("Launching {} with {:?}", command.instance, command.program);
        debug!(
            "Command (copy/paste): {}",
            format_command_line(&command.program, &command.args)
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to start {:?}: {}", command.program, e);
                let _ = state_tx.send(ProcessState::Failed);
                (hooks.on_exit)(None);
                if let Some(natives) = &command.natives_dir {
                    cleanup_natives(natives).await;
                }
                return LaunchProcess {
                    pid: None,
                    state: state_rx,
                    kill: None,
                };
            }
        };

        let pid = child.id();
        let _ = state_tx.send(ProcessState::Running);
        info!("Instance {} running (PID {:?})", command.instance, pid);

        let sink = match GameLogSink::open(&self.logs_dir, &command.instance).await {
            Ok(sink) => Some(sink),
            Err(e) => {
                warn!("Game output will not be written to disk: {}", e);
                None
            }
        };
        let tracker = Arc::new(Mutex::new(DiagnosticTracker::default()));

        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(
                stdout,
                OutputStream::Stdout,
                command.instance.clone(),
                sink.clone(),
                hooks.on_data.clone(),
                tracker.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(
                stderr,
                OutputStream::Stderr,
                command.instance.clone(),
                sink.clone(),
                hooks.on_data.clone(),
                tracker,
            ));
        }

        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
        let instance = command.instance.clone();
        let natives_dir = command.natives_dir.clone();
        let on_exit = hooks.on_exit.clone();

        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                Ok(()) = &mut kill_rx => {
                    if let Err(e) = child.start_kill() {
                        warn!("Kill request for {} failed: {}", instance, e);
                    }
                    child.wait().await
                }
            };

            // Deliver every buffered line before reporting the exit.
            for reader in readers {
                let _ = reader.await;
            }

            let final_state = match status {
                Ok(status) => {
                    let code = exit_code(&status);
                    if code == 0 {
                        info!("Instance {} exited cleanly", instance);
                    } else {
                        error!("Instance {} exited with code {}", instance, code);
                    }
                    on_exit(Some(code));
                    ProcessState::Exited(code)
                }
                Err(e) => {
                    error!("Failed while waiting for {}: {}", instance, e);
                    on_exit(None);
                    ProcessState::Failed
                }
            };

            if let Some(natives) = &natives_dir {
                cleanup_natives(natives).await;
            }
            let _ = state_tx.send(final_state);
        });

        LaunchProcess {
            pid,
            state: state_rx,
            kill: Some(kill_tx),
        }
    }
}

fn spawn_reader<R>(
    stream: R,
    kind: OutputStream,
    instance: String,
    sink: Option<GameLogSink>,
    on_data: DataCallback,
    tracker: Arc<Mutex<DiagnosticTracker>>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("[mc:{}] {} reader stopped: {}", instance, kind.tag(), e);
                    break;
                }
            }
            // Console output is not always UTF-8 (cp1252 on Windows).
            let line = decode_line(&buf);

            if let Some(sink) = &sink {
                if let Err(e) = sink.append(kind, &line).await {
                    warn!("Cannot write game log: {}", e);
                }
            }
            on_data(kind, &line);
            tracker.lock().await.report(&instance, &line);
            debug!("[mc:{}][{}] {}", instance, kind.tag(), line);
        }
    })
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Exit code, or 128 + signal for processes killed by a signal.
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

fn configure_native_library_env(cmd: &mut Command, natives_dir: &std::path::Path) {
    let native_path = path_str(natives_dir);

    if cfg!(target_os = "windows") {
        cmd.env("PATH", append_env_path("PATH", &native_path));
    } else if cfg!(target_os = "linux") {
        cmd.env("LD_LIBRARY_PATH", append_env_path("LD_LIBRARY_PATH", &native_path));
    } else if cfg!(target_os = "macos") {
        cmd.env("DYLD_LIBRARY_PATH", append_env_path("DYLD_LIBRARY_PATH", &native_path));
    }
}

#[allow(unused_variables)]
fn configure_platform_spawn(cmd: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        cmd.creation_flags(CREATE_NO_WINDOW);

        // Terminal variables make LWJGL treat the game as a console session.
        cmd.env_remove("WT_SESSION");
        cmd.env_remove("TERM");
        cmd.env_remove("ConEmuANSI");
    }
}

fn append_env_path(var_name: &str, value: &str) -> String {
    let separator = if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    };
    match std::env::var(var_name) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", value, separator, existing)
        }
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use super::*;

    struct Recorder {
        data: Arc<StdMutex<Vec<(OutputStream, String)>>>,
        exits: Arc<StdMutex<Vec<Option<i32>>>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                data: Arc::new(StdMutex::new(Vec::new())),
                exits: Arc::new(StdMutex::new(Vec::new())),
            }
        }

        fn hooks(&self) -> ProcessHooks {
            let data = self.data.clone();
            let exits = self.exits.clone();
            ProcessHooks::new(
                move |stream, line| data.lock().unwrap().push((stream, line.to_string())),
                move |code| exits.lock().unwrap().push(code),
            )
        }
    }

    fn command(dir: &std::path::Path, program: &str, args: &[&str]) -> LaunchCommand {
        LaunchCommand {
            program: PathBuf::from(program),
            args: args.iter().map(|a| a.to_string()).collect(),
            working_dir: dir.to_path_buf(),
            natives_dir: None,
            instance: "test-instance".into(),
        }
    }

    #[tokio::test]
    async fn spawn_failure_reports_exit_none_once_and_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let data_calls = Arc::new(AtomicUsize::new(0));
        let exit_calls = Arc::new(AtomicUsize::new(0));
        let last_exit = Arc::new(StdMutex::new(Some(0)));

        let hooks = {
            let data_calls = data_calls.clone();
            let exit_calls = exit_calls.clone();
            let last_exit = last_exit.clone();
            ProcessHooks::new(
                move |_, _| {
                    data_calls.fetch_add(1, Ordering::SeqCst);
                },
                move |code| {
                    exit_calls.fetch_add(1, Ordering::SeqCst);
                    *last_exit.lock().unwrap() = code;
                },
            )
        };

        let supervisor = ProcessSupervisor::new(dir.path().join("logs"));
        let mut process = supervisor
            .spawn(command(dir.path(), "/definitely/not/a/java", &["-version"]), hooks)
            .await;

        assert_eq!(process.state(), ProcessState::Failed);
        assert_eq!(process.wait().await, ProcessState::Failed);
        assert_eq!(process.pid(), None);
        assert!(!process.is_stoppable());
        assert_eq!(exit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*last_exit.lock().unwrap(), None);
        assert_eq!(data_calls.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_is_streamed_logged_and_exit_code_reported() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new();
        let supervisor = ProcessSupervisor::new(dir.path().join("logs"));

        let mut process = supervisor
            .spawn(
                command(dir.path(), "sh", &["-c", "echo hello; echo oops 1>&2; exit 3"]),
                recorder.hooks(),
            )
            .await;
        assert!(process.pid().is_some());
        assert_eq!(process.wait().await, ProcessState::Exited(3));

        assert_eq!(*recorder.exits.lock().unwrap(), vec![Some(3)]);
        let data = recorder.data.lock().unwrap().clone();
        assert!(data.contains(&(OutputStream::Stdout, "hello".to_string())));
        assert!(data.contains(&(OutputStream::Stderr, "oops".to_string())));

        let log_dir = dir.path().join("logs");
        let log = std::fs::read_dir(&log_dir).unwrap().next().unwrap().unwrap().path();
        let text = std::fs::read_to_string(log).unwrap();
        assert!(text.contains("] OUT hello"));
        assert!(text.contains("] ERROR oops"));
    }

    #[test]
    fn decode_line_strips_line_endings_and_replaces_invalid_bytes() {
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"caf\xe9\n"), "caf\u{FFFD}");
        assert_eq!(decode_line(b"no newline"), "no newline");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn lines_after_invalid_utf8_are_still_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new();
        let supervisor = ProcessSupervisor::new(dir.path().join("logs"));

        let mut process = supervisor
            .spawn(
                command(
                    dir.path(),
                    "sh",
                    &["-c", "echo before; printf 'caf\\351\\n'; echo after"],
                ),
                recorder.hooks(),
            )
            .await;
        assert_eq!(process.wait().await, ProcessState::Exited(0));

        let stdout: Vec<String> = recorder
            .data
            .lock()
            .unwrap()
            .iter()
            .filter(|(stream, _)| *stream == OutputStream::Stdout)
            .map(|(_, line)| line.clone())
            .collect();
        assert_eq!(stdout, vec!["before", "caf\u{FFFD}", "after"]);

        let log_dir = dir.path().join("logs");
        let log = std::fs::read_dir(&log_dir).unwrap().next().unwrap().unwrap().path();
        let text = std::fs::read_to_string(log).unwrap();
        assert!(text.contains("] OUT caf\u{FFFD}"));
        assert!(text.contains("] OUT after"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_kills_and_reports_signal_exit() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new();
        let supervisor = ProcessSupervisor::new(dir.path().join("logs"));

        let mut process = supervisor
            .spawn(command(dir.path(), "sleep", &["30"]), recorder.hooks())
            .await;
        assert_eq!(process.state(), ProcessState::Running);

        process.stop();
        assert!(!process.is_stoppable());
        assert_eq!(process.wait().await, ProcessState::Exited(137));
        assert_eq!(*recorder.exits.lock().unwrap(), vec![Some(137)]);
    }
}
