use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

const LOG_PANE_LINES: usize = 500;

/// Bounded ring of formatted log lines shown in the dashboard log window.
#[derive(Clone, Debug)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(LOG_PANE_LINES)
    }
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    fn guard(&self) -> MutexGuard<'_, VecDeque<String>> {
        // A panic while formatting must not take the log pane down with it.
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, line: &str) {
        let mut lines = self.guard();
        lines.push_back(line.to_string());
        while lines.len() > self.capacity {
            lines.pop_front();
        }
    }

    /// Most recent `count` lines, oldest first.
    pub fn tail(&self, count: usize) -> Vec<String> {
        let lines = self.guard();
        let skip = lines.len().saturating_sub(count);
        lines.iter().skip(skip).cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

struct MultiWriter {
    buffer: LogBuffer,
    file: Option<Arc<Mutex<File>>>,
    pending: Vec<u8>,
}

impl MultiWriter {
    fn new(buffer: LogBuffer, file: Option<Arc<Mutex<File>>>) -> Self {
        Self {
            buffer,
            file,
            pending: Vec::new(),
        }
    }

    fn drain_lines(&mut self) {
        while let Some(pos) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end();
            if !text.is_empty() {
                self.buffer.push(text);
            }
        }
    }
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.drain_lines();
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.write_all(buf);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
        Ok(())
    }
}

impl Drop for MultiWriter {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            self.pending.push(b'\n');
            self.drain_lines();
        }
    }
}

/// Routes `tracing` output to the log pane and, if given, an append-only file.
/// Nothing goes to stdout/stderr while the dashboard owns the screen.
pub fn init_logging(log_file: Option<&Path>, buffer: LogBuffer) {
    let level = std::env::var("KITE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file = match log_file.map(open_log_file).transpose() {
        Ok(file) => file.map(|file| Arc::new(Mutex::new(file))),
        Err(err) => {
            buffer.push(&format!("log file unavailable: {err}"));
            None
        }
    };

    let make_writer = BoxMakeWriter::new(move || MultiWriter::new(buffer.clone(), file.clone()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

/// Log file path from the flag or the configured directory.
pub fn resolve_log_file(flag: Option<PathBuf>, log_dir: Option<&str>) -> Option<PathBuf> {
    if flag.is_some() {
        return flag;
    }
    log_dir
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .map(|dir| PathBuf::from(dir).join("kite.log"))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn buffer_keeps_only_the_newest_lines() {
        let buffer = LogBuffer::with_capacity(2);
        assert!(buffer.is_empty());
        buffer.push("one");
        buffer.push("two");
        buffer.push("three");
        assert_eq!(buffer.tail(10), vec!["two", "three"]);
        assert_eq!(buffer.tail(1), vec!["three"]);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn writer_splits_lines_and_appends_to_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("logs").join("kite.log");
        let file = open_log_file(&path).expect("open log");
        let buffer = LogBuffer::default();

        {
            let mut writer = MultiWriter::new(buffer.clone(), Some(Arc::new(Mutex::new(file))));
            writer.write_all(b"INFO first\nINFO sec").expect("write");
            writer.write_all(b"ond\nWARN partial").expect("write");
            writer.flush().expect("flush");
        }

        assert_eq!(buffer.tail(5), vec!["INFO first", "INFO second", "WARN partial"]);
        let content = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(content, "INFO first\nINFO second\nWARN partial");
    }

    #[test]
    fn flag_wins_over_log_dir() {
        assert_eq!(
            resolve_log_file(Some(PathBuf::from("/tmp/a.log")), Some("/var/log")),
            Some(PathBuf::from("/tmp/a.log"))
        );
        assert_eq!(
            resolve_log_file(None, Some("/var/log/kite")),
            Some(PathBuf::from("/var/log/kite/kite.log"))
        );
        assert_eq!(resolve_log_file(None, Some("  ")), None);
    }
}
