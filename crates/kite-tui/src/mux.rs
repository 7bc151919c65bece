//! Terminal multiplexer: an ordered set of shell tabs with slide-style
//! switching.
//!
//! In `Normal` mode keys go to the current tab's shell, except the
//! Ctrl+letter triggers below which are consumed and run a command:
//!
//! | chord  | command                               |
//! |--------|---------------------------------------|
//! | Ctrl+N | next tab                              |
//! | Ctrl+P | previous tab                          |
//! | Ctrl+A | add tab                               |
//! | Ctrl+E | close current tab                     |
//! | Ctrl+B | numeric jump: digits, then Enter/Esc  |
//! | Ctrl+Q | quit, terminating every shell         |
//!
//! Tab numbers typed after Ctrl+B are 1-based.

use crate::screen::TerminalScreen;
use crate::session::{LaunchSpec, SessionError, SessionSpawner, ShellSession, TermSize};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use kite_core::ClusterTarget;
use std::sync::mpsc::Receiver;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const TERMINAL_FOOTER_TEXT: &str = "[CTRL + N] Next Slide | [CTRL + P] Previous Slide | [CTRL + A] Add Slide | [CTRL + E] Exit Slide | [CTRL + B] + [Num] Change to Slide with [Num] | [CTRL + Q] Quit";
pub const ESCAPE_PROMPT: &str = "Enter the Slide Number to Switch To : ";
pub const CLOSE_GRACE: Duration = Duration::from_millis(500);
const EXITED_SUFFIX: &str = "(exited)";
/// Output chunks moved into a tab's screen per `pump`, so a chatty shell
/// cannot hold the event loop.
const PUMP_CHUNKS_PER_TAB: usize = 64;

#[derive(Debug, Error)]
pub enum MuxError {
    #[error("invalid slide number '{input}' ({count} slides open)")]
    InvalidSlide { input: String, count: usize },
    #[error(transparent)]
    Spawn(#[from] SessionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxCommand {
    NextTab,
    PrevTab,
    AddTab,
    CloseTab,
    Quit,
    BeginJump,
}

impl MuxCommand {
    /// Recognises the Ctrl+letter triggers.
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if !key.modifiers.contains(KeyModifiers::CONTROL) {
            return None;
        }
        let KeyCode::Char(letter) = key.code else {
            return None;
        };
        match letter.to_ascii_lowercase() {
            'n' => Some(MuxCommand::NextTab),
            'p' => Some(MuxCommand::PrevTab),
            'a' => Some(MuxCommand::AddTab),
            'e' => Some(MuxCommand::CloseTab),
            'q' => Some(MuxCommand::Quit),
            'b' => Some(MuxCommand::BeginJump),
            _ => None,
        }
    }
}

/// Numeric-jump capture. `digits` is empty whenever `active` is false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscapeState {
    active: bool,
    digits: String,
}

impl EscapeState {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    fn begin(&mut self) {
        self.active = true;
        self.digits.clear();
    }

    /// Leaves capture and hands back what was typed.
    fn finish(&mut self) -> String {
        self.active = false;
        std::mem::take(&mut self.digits)
    }
}

pub struct TerminalTab {
    label: String,
    session: Box<dyn ShellSession>,
    output: Receiver<Vec<u8>>,
    screen: TerminalScreen,
    exited: bool,
}

impl TerminalTab {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }

    pub fn screen(&self) -> &TerminalScreen {
        &self.screen
    }

    pub fn display_label(&self) -> String {
        if self.exited {
            format!("{} {EXITED_SUFFIX}", self.label)
        } else {
            self.label.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxOutcome {
    Stay,
    /// The multiplexer is empty; control returns to the dashboard.
    Leave,
}

pub struct Multiplexer {
    spawner: Box<dyn SessionSpawner>,
    tabs: Vec<TerminalTab>,
    current: Option<usize>,
    escape: EscapeState,
    status: Option<String>,
    size: TermSize,
    context: Option<ClusterTarget>,
    next_seq: usize,
}

impl Multiplexer {
    pub fn new(spawner: Box<dyn SessionSpawner>, size: TermSize) -> Self {
        Self {
            spawner,
            tabs: Vec::new(),
            current: None,
            escape: EscapeState::default(),
            status: None,
            size,
            context: None,
            next_seq: 1,
        }
    }

    pub fn tabs(&self) -> &[TerminalTab] {
        &self.tabs
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_tab(&self) -> Option<&TerminalTab> {
        self.current.and_then(|idx| self.tabs.get(idx))
    }

    pub fn escape(&self) -> &EscapeState {
        &self.escape
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    #[cfg(test)]
    pub fn size(&self) -> TermSize {
        self.size
    }

    /// Cluster that Ctrl+A logs into; `None` opens a plain shell.
    pub fn set_context(&mut self, context: Option<ClusterTarget>) {
        self.context = context;
    }

    /// Spawns a shell for `spec`, appends it and makes it current.
    pub fn add_tab(&mut self, spec: LaunchSpec) -> Result<usize, MuxError> {
        let spawned = self.spawner.spawn(&spec, self.size)?;
        let label = match &spec.target {
            Some(target) => target.label().to_string(),
            None => format!("shell-{}", self.next_seq),
        };
        self.next_seq += 1;
        info!(label = %label, pid = ?spawned.session.process_id(), "opened terminal tab");
        let mut screen = TerminalScreen::default();
        screen.set_width(self.size.cols as usize);
        self.tabs.push(TerminalTab {
            label,
            session: spawned.session,
            output: spawned.output,
            screen,
            exited: false,
        });
        let idx = self.tabs.len() - 1;
        self.current = Some(idx);
        Ok(idx)
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> MuxOutcome {
        if self.escape.is_active() {
            self.handle_jump_key(key);
            return MuxOutcome::Stay;
        }
        if let Some(command) = MuxCommand::from_key(key) {
            return self.run(command);
        }
        let Some(bytes) = key_bytes(key) else {
            return MuxOutcome::Stay;
        };
        self.status = None;
        let Some(tab) = self.current.and_then(|idx| self.tabs.get_mut(idx)) else {
            return MuxOutcome::Stay;
        };
        if tab.exited {
            return MuxOutcome::Stay;
        }
        if let Err(err) = tab.session.send(bytes) {
            warn!("write to {} failed: {err}", tab.label);
        }
        MuxOutcome::Stay
    }

    pub fn run(&mut self, command: MuxCommand) -> MuxOutcome {
        self.status = None;
        match command {
            MuxCommand::NextTab => self.step(1),
            MuxCommand::PrevTab => self.step(-1),
            MuxCommand::AddTab => {
                let spec = match self.context.clone() {
                    Some(target) => LaunchSpec::cluster_login(target),
                    None => LaunchSpec::shell(),
                };
                if let Err(err) = self.add_tab(spec) {
                    warn!("failed to add terminal tab: {err}");
                    self.status = Some(err.to_string());
                }
            }
            MuxCommand::CloseTab => return self.close_current(),
            MuxCommand::Quit => {
                self.quit();
                return MuxOutcome::Leave;
            }
            MuxCommand::BeginJump => self.escape.begin(),
        }
        if self.tabs.is_empty() {
            MuxOutcome::Leave
        } else {
            MuxOutcome::Stay
        }
    }

    fn handle_jump_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Char(ch) if ch.is_ascii_digit() => self.escape.digits.push(ch),
            KeyCode::Backspace => {
                self.escape.digits.pop();
            }
            KeyCode::Enter => {
                let input = self.escape.finish();
                if let Err(err) = self.jump_to(&input) {
                    self.status = Some(err.to_string());
                }
            }
            KeyCode::Esc => {
                self.escape.finish();
            }
            _ => {}
        }
    }

    /// Switches to the 1-based slide number in `input`.
    pub fn jump_to(&mut self, input: &str) -> Result<(), MuxError> {
        let count = self.tabs.len();
        match input.parse::<usize>() {
            Ok(number) if number >= 1 && number <= count => {
                self.current = Some(number - 1);
                Ok(())
            }
            _ => Err(MuxError::InvalidSlide {
                input: input.to_string(),
                count,
            }),
        }
    }

    fn step(&mut self, delta: isize) {
        let Some(current) = self.current else {
            return;
        };
        let len = self.tabs.len() as isize;
        let next = (current as isize + delta).rem_euclid(len);
        self.current = Some(next as usize);
    }

    /// Terminates and removes the current tab. The tab now at the same
    /// position becomes current, else the last one.
    pub fn close_current(&mut self) -> MuxOutcome {
        let Some(idx) = self.current else {
            return MuxOutcome::Leave;
        };
        if idx >= self.tabs.len() {
            self.current = self.tabs.len().checked_sub(1);
            return self.outcome();
        }
        let mut tab = self.tabs.remove(idx);
        terminate_tab(&mut tab);
        self.current = if self.tabs.is_empty() {
            None
        } else {
            Some(idx.min(self.tabs.len() - 1))
        };
        self.outcome()
    }

    /// Terminates every shell and empties the multiplexer.
    pub fn quit(&mut self) {
        for mut tab in self.tabs.drain(..) {
            terminate_tab(&mut tab);
        }
        self.current = None;
        self.escape.finish();
        self.status = None;
    }

    /// Moves pending shell output into each tab's screen and notes exits.
    pub fn pump(&mut self) {
        for tab in &mut self.tabs {
            for _ in 0..PUMP_CHUNKS_PER_TAB {
                let Ok(chunk) = tab.output.try_recv() else {
                    break;
                };
                tab.screen.feed(&chunk);
            }
            if !tab.exited && tab.session.has_exited() {
                info!("terminal tab {} exited", tab.label);
                tab.exited = true;
            }
        }
    }

    pub fn resize(&mut self, size: TermSize) {
        if size == self.size {
            return;
        }
        self.size = size;
        for tab in &mut self.tabs {
            tab.screen.set_width(size.cols as usize);
            if tab.exited {
                continue;
            }
            if let Err(err) = tab.session.resize(size) {
                warn!("resize of {} failed: {err}", tab.label);
            }
        }
    }

    fn outcome(&self) -> MuxOutcome {
        if self.tabs.is_empty() {
            MuxOutcome::Leave
        } else {
            MuxOutcome::Stay
        }
    }
}

impl Drop for Multiplexer {
    fn drop(&mut self) {
        self.quit();
    }
}

fn terminate_tab(tab: &mut TerminalTab) {
    match tab.session.terminate(CLOSE_GRACE) {
        Ok(()) => info!("closed terminal tab {}", tab.label),
        Err(err) => warn!("cleanup of terminal tab {} failed: {err}", tab.label),
    }
}

/// Bytes a terminal would send for `key`.
pub fn key_bytes(key: &KeyEvent) -> Option<Vec<u8>> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let mut bytes = match key.code {
        KeyCode::Char(ch) if ctrl => match ch.to_ascii_lowercase() {
            letter @ 'a'..='z' => vec![letter as u8 - b'a' + 1],
            ' ' | '@' | '2' => vec![0x00],
            '[' | '3' => vec![0x1b],
            '\\' | '4' => vec![0x1c],
            ']' | '5' => vec![0x1d],
            '^' | '6' => vec![0x1e],
            '_' | '-' | '7' => vec![0x1f],
            _ => return None,
        },
        KeyCode::Char(ch) => ch.to_string().into_bytes(),
        KeyCode::Enter => vec![b'\r'],
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::BackTab => b"\x1b[Z".to_vec(),
        KeyCode::Esc => vec![0x1b],
        KeyCode::Up => b"\x1b[A".to_vec(),
        KeyCode::Down => b"\x1b[B".to_vec(),
        KeyCode::Right => b"\x1b[C".to_vec(),
        KeyCode::Left => b"\x1b[D".to_vec(),
        KeyCode::Home => b"\x1b[H".to_vec(),
        KeyCode::End => b"\x1b[F".to_vec(),
        KeyCode::PageUp => b"\x1b[5~".to_vec(),
        KeyCode::PageDown => b"\x1b[6~".to_vec(),
        KeyCode::Delete => b"\x1b[3~".to_vec(),
        KeyCode::Insert => b"\x1b[2~".to_vec(),
        KeyCode::F(n @ 1..=4) => vec![0x1b, b'O', b'P' + (n - 1)],
        KeyCode::F(n @ 5..=12) => {
            let code = match n {
                5 => 15,
                6 => 17,
                7 => 18,
                8 => 19,
                9 => 20,
                10 => 21,
                11 => 23,
                _ => 24,
            };
            format!("\x1b[{code}~").into_bytes()
        }
        _ => return None,
    };
    if alt {
        bytes.insert(0, 0x1b);
    }
    Some(bytes)
}
