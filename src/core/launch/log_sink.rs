use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, SecondsFormat, Utc};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn tag(self) -> &'static str {
        match self {
            OutputStream::Stdout => "OUT",
            OutputStream::Stderr => "ERROR",
        }
    }
}

/// Append-only `logs/games/<safeName>_<YYYY-MM-DD>.log`, shared by the
/// stdout and stderr readers of one process.
#[derive(Clone)]
pub struct GameLogSink {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

pub fn daily_log_path(logs_dir: &Path, safe_name: &str) -> PathBuf {
    logs_dir.join(format!("{}_{}.log", safe_name, Local::now().format("%Y-%m-%d")))
}

pub fn format_line(stream: OutputStream, line: &str) -> String {
    format!(
        "[{}] {} {}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        stream.tag(),
        line
    )
}

impl GameLogSink {
    pub async fn open(logs_dir: &Path, safe_name: &str) -> LauncherResult<Self> {
        tokio::fs::create_dir_all(logs_dir)
            .await
            .map_err(|e| LauncherError::io(logs_dir, e))?;

        let path = daily_log_path(logs_dir, safe_name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| LauncherError::io(&path, e))?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, stream: OutputStream, line: &str) -> LauncherResult<()> {
        let entry = format_line(stream, line);
        let mut file = self.file.lock().await;
        file.write_all(entry.as_bytes())
            .await
            .map_err(|e| LauncherError::io(&self.path, e))?;
        file.flush().await.map_err(|e| LauncherError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lines_are_appended_with_stream_tags() {
        let dir = tempfile::tempdir().unwrap();
        let sink = GameLogSink::open(dir.path(), "mi-mundo").await.unwrap();
        sink.append(OutputStream::Stdout, "hello").await.unwrap();
        sink.append(OutputStream::Stderr, "boom").await.unwrap();

        let file_name = sink.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("mi-mundo_"));
        assert!(file_name.ends_with(".log"));

        let text = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] OUT hello"));
        assert!(lines[1].ends_with("] ERROR boom"));

        // Reopening the same day appends.
        let again = GameLogSink::open(dir.path(), "mi-mundo").await.unwrap();
        again.append(OutputStream::Stdout, "more").await.unwrap();
        assert_eq!(std::fs::read_to_string(sink.path()).unwrap().lines().count(), 3);
    }
}
