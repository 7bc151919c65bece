use kite_core::config::render_login_command;
use kite_core::ClusterTarget;
use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use std::env;
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);
const KILL_WAIT: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to spawn shell: {0}")]
    Spawn(String),
    #[error("session io error: {0}")]
    Io(#[from] io::Error),
    #[error("session input closed")]
    Closed,
    #[error("shell process {0} did not exit after kill")]
    Unreaped(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub rows: u16,
    pub cols: u16,
}

impl TermSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            rows: rows.max(1),
            cols: cols.max(1),
        }
    }

    fn pty_size(self) -> PtySize {
        PtySize {
            rows: self.rows.max(1),
            cols: self.cols.max(1),
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

/// What a new tab should run: a login for `target`, an explicit command, or a bare shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchSpec {
    pub target: Option<ClusterTarget>,
    pub command_line: Option<String>,
}

impl LaunchSpec {
    pub fn shell() -> Self {
        Self::default()
    }

    pub fn cluster_login(target: ClusterTarget) -> Self {
        Self {
            target: Some(target),
            command_line: None,
        }
    }
}

/// A running interactive shell bound to one terminal tab.
pub trait ShellSession: Send {
    /// Queues keystrokes for the shell; never blocks on the child.
    fn send(&mut self, bytes: Vec<u8>) -> Result<(), SessionError>;
    fn resize(&mut self, size: TermSize) -> Result<(), SessionError>;
    fn has_exited(&mut self) -> bool;
    /// Hangs up, waits at most `grace`, then kills and reaps.
    fn terminate(&mut self, grace: Duration) -> Result<(), SessionError>;
    fn process_id(&self) -> Option<u32>;
}

pub struct SpawnedSession {
    pub session: Box<dyn ShellSession>,
    /// Output chunks from the shell; disconnected once the PTY closes.
    pub output: Receiver<Vec<u8>>,
}

pub trait SessionSpawner {
    fn spawn(&mut self, spec: &LaunchSpec, size: TermSize) -> Result<SpawnedSession, SessionError>;
}

/// Spawns `$SHELL` inside a pseudo terminal, optionally running a login command first.
pub struct PtySpawner {
    shell: String,
    login_template: String,
}

impl PtySpawner {
    pub fn new(shell: String, login_template: String) -> Self {
        Self {
            shell,
            login_template,
        }
    }

    fn command_line(&self, spec: &LaunchSpec) -> Option<String> {
        if let Some(line) = spec.command_line.as_ref().filter(|line| !line.trim().is_empty()) {
            return Some(line.clone());
        }
        spec.target.as_ref().map(|target| {
            render_login_command(
                &self.login_template,
                &target.cluster_id,
                &target.cluster_name,
            )
        })
    }
}

impl SessionSpawner for PtySpawner {
    fn spawn(&mut self, spec: &LaunchSpec, size: TermSize) -> Result<SpawnedSession, SessionError> {
        let pair = native_pty_system()
            .openpty(size.pty_size())
            .map_err(|err| SessionError::Spawn(err.to_string()))?;

        let mut builder = CommandBuilder::new(&self.shell);
        if let Some(line) = self.command_line(spec) {
            builder.arg("-c");
            builder.arg(format!("{line}; exec {}", self.shell));
        }
        if env::var("TERM").is_err() {
            builder.env("TERM", "xterm-256color");
        }
        if let Ok(cwd) = env::current_dir() {
            builder.cwd(cwd);
        }

        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|err| SessionError::Spawn(err.to_string()))?;
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|err| SessionError::Spawn(err.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|err| SessionError::Spawn(err.to_string()))?;

        let pid = child.process_id();
        let (output_tx, output_rx) = mpsc::channel();
        thread::Builder::new()
            .name("kite-pty-reader".to_string())
            .spawn(move || read_loop(reader, output_tx))?;

        let (input_tx, input_rx) = mpsc::channel();
        thread::Builder::new()
            .name("kite-pty-writer".to_string())
            .spawn(move || write_loop(writer, input_rx))?;

        debug!(pid = ?pid, shell = %self.shell, "spawned pty session");
        Ok(SpawnedSession {
            session: Box::new(PtySession {
                master: Some(pair.master),
                input: Some(input_tx),
                child,
                exited: false,
            }),
            output: output_rx,
        })
    }
}

fn read_loop(mut reader: Box<dyn Read + Send>, output: Sender<Vec<u8>>) {
    let mut buffer = [0u8; 8192];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(count) => count,
            Err(_) => break,
        };
        if output.send(buffer[..read].to_vec()).is_err() {
            break;
        }
    }
}

fn write_loop(mut writer: Box<dyn Write + Send>, input: Receiver<Vec<u8>>) {
    for chunk in input {
        if writer.write_all(&chunk).and_then(|_| writer.flush()).is_err() {
            break;
        }
    }
}

struct PtySession {
    master: Option<Box<dyn MasterPty + Send>>,
    input: Option<Sender<Vec<u8>>>,
    child: Box<dyn Child + Send + Sync>,
    exited: bool,
}

impl PtySession {
    fn wait_exit(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.has_exited() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}

impl ShellSession for PtySession {
    fn send(&mut self, bytes: Vec<u8>) -> Result<(), SessionError> {
        let input = self.input.as_ref().ok_or(SessionError::Closed)?;
        input.send(bytes).map_err(|_| SessionError::Closed)
    }

    fn resize(&mut self, size: TermSize) -> Result<(), SessionError> {
        let Some(master) = &self.master else {
            return Ok(());
        };
        master
            .resize(size.pty_size())
            .map_err(|err| SessionError::Io(io::Error::new(io::ErrorKind::Other, err.to_string())))
    }

    fn has_exited(&mut self) -> bool {
        if self.exited {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(_)) => {
                self.exited = true;
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!("pty try_wait failed: {err}");
                false
            }
        }
    }

    fn terminate(&mut self, grace: Duration) -> Result<(), SessionError> {
        // Closing input drops the writer (EOT); dropping the master hangs up.
        self.input.take();
        self.master.take();
        if self.wait_exit(grace) {
            return Ok(());
        }
        if let Err(err) = self.child.kill() {
            warn!("failed to kill shell: {err}");
        }
        if self.wait_exit(KILL_WAIT) {
            return Ok(());
        }
        let pid = self
            .process_id()
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "?".to_string());
        Err(SessionError::Unreaped(pid))
    }

    fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        if !self.has_exited() {
            let _ = self.child.kill();
            let _ = self.child.try_wait();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn spawner() -> PtySpawner {
        PtySpawner::new("/bin/bash".to_string(), "ocm backplane login {cluster_id}".to_string())
    }

    #[test]
    fn cluster_target_renders_login_command() {
        let spec = LaunchSpec::cluster_login(ClusterTarget {
            cluster_id: "2abc".to_string(),
            cluster_name: "prod-east".to_string(),
        });
        assert_eq!(
            spawner().command_line(&spec).as_deref(),
            Some("ocm backplane login 2abc")
        );
    }

    #[test]
    fn cluster_id_cannot_smuggle_extra_commands() {
        let spec = LaunchSpec::cluster_login(ClusterTarget {
            cluster_id: "abc; touch /tmp/kite_x".to_string(),
            cluster_name: "prod-east".to_string(),
        });
        assert_eq!(
            spawner().command_line(&spec).as_deref(),
            Some("ocm backplane login 'abc; touch /tmp/kite_x'")
        );
    }

    #[cfg(unix)]
    #[test]
    fn terminate_kills_a_shell_that_ignores_hangup() {
        let mut spawner = PtySpawner::new("/bin/sh".to_string(), String::new());
        let spec = LaunchSpec {
            target: None,
            command_line: Some("trap '' HUP; exec sleep 30".to_string()),
        };
        let mut spawned = spawner.spawn(&spec, TermSize::new(80, 24)).expect("spawn");
        thread::sleep(Duration::from_millis(200));
        assert!(!spawned.session.has_exited());

        let started = Instant::now();
        spawned
            .session
            .terminate(Duration::from_millis(100))
            .expect("terminate");
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(spawned.session.has_exited());
        assert!(matches!(
            spawned.session.send(b"echo\r".to_vec()),
            Err(SessionError::Closed)
        ));
    }

    #[test]
    fn explicit_command_wins_and_bare_shell_has_none() {
        let spec = LaunchSpec {
            target: Some(ClusterTarget {
                cluster_id: "2abc".to_string(),
                cluster_name: String::new(),
            }),
            command_line: Some("echo hi".to_string()),
        };
        assert_eq!(spawner().command_line(&spec).as_deref(), Some("echo hi"));
        assert_eq!(spawner().command_line(&LaunchSpec::shell()), None);
    }

    #[test]
    fn term_size_never_zero() {
        let size = TermSize::new(0, 0);
        assert_eq!(size, TermSize { rows: 1, cols: 1 });
        let pty = size.pty_size();
        assert_eq!((pty.rows, pty.cols), (1, 1));
    }
}
