use std::collections::VecDeque;

pub const DEFAULT_SCROLLBACK: usize = 2000;
/// Widest line kept, whatever the PTY reports.
pub const MAX_WIDTH: usize = 4096;
const TAB_STOP: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseState {
    Ground,
    Escape,
    Csi(Vec<u8>),
    Osc,
    OscEscape,
    Charset,
}

/// Line buffer fed with raw PTY output.
///
/// Understands the control characters shells actually emit at a prompt
/// (CR, LF, backspace, tab) and the common CSI line/cursor edits. Colors,
/// OSC titles and charset switches are dropped. The cursor always lives on
/// the last line; vertical cursor motion is not modelled.
#[derive(Debug, Clone)]
pub struct TerminalScreen {
    lines: VecDeque<Vec<char>>,
    cursor_col: usize,
    width: usize,
    max_lines: usize,
    state: ParseState,
    utf8_carry: Vec<u8>,
}

impl Default for TerminalScreen {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLLBACK)
    }
}

impl TerminalScreen {
    pub fn new(max_lines: usize) -> Self {
        let mut lines = VecDeque::new();
        lines.push_back(Vec::new());
        Self {
            lines,
            cursor_col: 0,
            width: MAX_WIDTH,
            max_lines: max_lines.max(1),
            state: ParseState::Ground,
            utf8_carry: Vec::new(),
        }
    }

    /// Column count of the PTY. Cursor motion is clamped to it and
    /// printing past the last column wraps.
    pub fn set_width(&mut self, cols: usize) {
        self.width = cols.clamp(1, MAX_WIDTH);
        self.cursor_col = self.cursor_col.min(self.width);
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.step(byte);
        }
    }

    /// Last `height` lines, oldest first.
    pub fn visible_lines(&self, height: usize) -> Vec<String> {
        let skip = self.lines.len().saturating_sub(height);
        self.lines
            .iter()
            .skip(skip)
            .map(|line| line.iter().collect())
            .collect()
    }

    /// Cursor as (row within `visible_lines(height)`, column).
    pub fn cursor(&self, height: usize) -> (usize, usize) {
        let rows = self.lines.len().min(height.max(1));
        (rows.saturating_sub(1), self.cursor_col)
    }

    #[cfg(test)]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn step(&mut self, byte: u8) {
        let state = std::mem::replace(&mut self.state, ParseState::Ground);
        self.state = match state {
            ParseState::Ground => {
                self.ground(byte);
                return;
            }
            ParseState::Escape => match byte {
                b'[' => ParseState::Csi(Vec::new()),
                b']' => ParseState::Osc,
                b'(' | b')' | b'*' | b'+' => ParseState::Charset,
                _ => ParseState::Ground,
            },
            ParseState::Csi(mut params) => match byte {
                0x30..=0x3f | 0x20..=0x2f => {
                    params.push(byte);
                    ParseState::Csi(params)
                }
                0x40..=0x7e => {
                    self.apply_csi(&params, byte);
                    ParseState::Ground
                }
                // Malformed sequence, drop it.
                _ => ParseState::Ground,
            },
            ParseState::Osc => match byte {
                0x07 => ParseState::Ground,
                0x1b => ParseState::OscEscape,
                _ => ParseState::Osc,
            },
            ParseState::OscEscape | ParseState::Charset => ParseState::Ground,
        };
    }

    fn ground(&mut self, byte: u8) {
        if !self.utf8_carry.is_empty() || byte >= 0x80 {
            self.push_utf8(byte);
            return;
        }
        match byte {
            0x1b => self.state = ParseState::Escape,
            b'\r' => self.cursor_col = 0,
            b'\n' => self.new_line(),
            0x08 => self.cursor_col = self.cursor_col.saturating_sub(1),
            b'\t' => self.move_to((self.cursor_col / TAB_STOP + 1) * TAB_STOP),
            0x20..=0x7e => self.put_char(byte as char),
            _ => {}
        }
    }

    fn push_utf8(&mut self, byte: u8) {
        self.utf8_carry.push(byte);
        match std::str::from_utf8(&self.utf8_carry) {
            Ok(text) => {
                let chars: Vec<char> = text.chars().collect();
                self.utf8_carry.clear();
                for ch in chars {
                    self.put_char(ch);
                }
            }
            Err(err) if err.error_len().is_none() && self.utf8_carry.len() < 4 => {}
            Err(_) => {
                self.utf8_carry.clear();
                self.put_char(char::REPLACEMENT_CHARACTER);
            }
        }
    }

    fn current_line(&mut self) -> &mut Vec<char> {
        if self.lines.is_empty() {
            self.lines.push_back(Vec::new());
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }

    fn move_to(&mut self, col: usize) {
        self.cursor_col = col.min(self.width - 1);
    }

    fn put_char(&mut self, ch: char) {
        if self.cursor_col >= self.width {
            self.new_line();
            self.cursor_col = 0;
        }
        let col = self.cursor_col;
        let line = self.current_line();
        if col < line.len() {
            line[col] = ch;
        } else {
            line.resize(col, ' ');
            line.push(ch);
        }
        self.cursor_col += 1;
    }

    fn new_line(&mut self) {
        self.lines.push_back(Vec::new());
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    fn apply_csi(&mut self, params: &[u8], action: u8) {
        let private = params.first() == Some(&b'?');
        let numbers = parse_params(params);
        let first = numbers.first().copied().unwrap_or(0);
        let count = first.max(1);
        match action {
            _ if private => {}
            b'K' => {
                let col = self.cursor_col;
                let line = self.current_line();
                match first {
                    0 => line.truncate(col),
                    1 => {
                        let end = col.saturating_add(1).min(line.len());
                        line[..end].iter_mut().for_each(|ch| *ch = ' ');
                    }
                    _ => line.clear(),
                }
            }
            b'J' => match first {
                2 | 3 => {
                    self.lines.clear();
                    self.lines.push_back(Vec::new());
                    self.cursor_col = 0;
                }
                0 => {
                    let col = self.cursor_col;
                    self.current_line().truncate(col);
                }
                _ => {}
            },
            b'C' => self.move_to(self.cursor_col.saturating_add(count)),
            b'D' => self.cursor_col = self.cursor_col.saturating_sub(count),
            b'G' => self.move_to(count - 1),
            b'H' | b'f' => {
                let col = numbers.get(1).copied().unwrap_or(1).max(1);
                self.move_to(col - 1);
            }
            b'P' => {
                let col = self.cursor_col;
                let line = self.current_line();
                if col < line.len() {
                    let end = col.saturating_add(count).min(line.len());
                    line.drain(col..end);
                }
            }
            b'X' => {
                let col = self.cursor_col;
                let line = self.current_line();
                let end = col.saturating_add(count).min(line.len());
                if col < end {
                    line[col..end].iter_mut().for_each(|ch| *ch = ' ');
                }
            }
            _ => {}
        }
    }
}

fn parse_params(params: &[u8]) -> Vec<usize> {
    params
        .split(|byte| *byte == b';')
        .map(|part| {
            part.iter()
                .filter(|byte| byte.is_ascii_digit())
                .fold(0usize, |acc, byte| {
                    acc.saturating_mul(10).saturating_add((byte - b'0') as usize)
                })
        })
        .collect()
}
