//! Keybinding table for the dashboard.
//!
//! Bindings are declared once in [`KEYMAP`] as `(KeyPattern, PageScope, Action)`
//! rows. [`resolve`] picks the first row whose scope matches the front page
//! and whose pattern matches the key; page-scoped rows come before the
//! `Any` rows so a page can shadow a global key. Unmatched keys resolve to
//! `None` and are ignored by the caller.

use crate::pages::{INCIDENTS_PAGE, METADATA_PAGE};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Dashboard,
    Terminal,
}

/// Pages a binding applies to. `Contains` lets paginated pages such as
/// `Oncall Layer 2` share one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageScope {
    Any,
    Exact(&'static str),
    Contains(&'static str),
}

impl PageScope {
    fn matches(&self, title: &str) -> bool {
        match self {
            PageScope::Any => true,
            PageScope::Exact(expected) => title == *expected,
            PageScope::Contains(fragment) => title.contains(fragment),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Refresh,
    ShowAcknowledged,
    ShowTriggered,
    OpenRow,
    ToggleSelect,
    Acknowledge,
    Back,
    MoveDown,
    MoveUp,
    Top,
    Bottom,
    ClusterLogin,
    NextOncall,
    AllTeamsOncall,
    PrevLayer,
    NextLayer,
    /// Terminal mode: the key belongs to the multiplexer.
    Multiplexer,
}

/// Letters match case-insensitively and Shift is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPattern {
    pub code: KeyCode,
    pub ctrl: bool,
}

impl KeyPattern {
    fn matches(&self, event: &KeyEvent) -> bool {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl != self.ctrl || event.modifiers.contains(KeyModifiers::ALT) {
            return false;
        }
        match (self.code, event.code) {
            (KeyCode::Char(expected), KeyCode::Char(got)) => {
                expected.to_ascii_lowercase() == got.to_ascii_lowercase()
            }
            (expected, got) => expected == got,
        }
    }
}

const fn key(code: KeyCode) -> KeyPattern {
    KeyPattern { code, ctrl: false }
}

const fn ctrl(letter: char) -> KeyPattern {
    KeyPattern {
        code: KeyCode::Char(letter),
        ctrl: true,
    }
}

struct Binding {
    pattern: KeyPattern,
    scope: PageScope,
    action: Action,
}

const fn bind(pattern: KeyPattern, scope: PageScope, action: Action) -> Binding {
    Binding {
        pattern,
        scope,
        action,
    }
}

const ONCALL: PageScope = PageScope::Contains("Oncall");

static KEYMAP: &[Binding] = &[
    bind(ctrl('a'), PageScope::Exact(INCIDENTS_PAGE), Action::Acknowledge),
    bind(key(KeyCode::Char('y')), PageScope::Exact(METADATA_PAGE), Action::ClusterLogin),
    bind(key(KeyCode::Char('n')), ONCALL, Action::NextOncall),
    bind(key(KeyCode::Char('a')), ONCALL, Action::AllTeamsOncall),
    bind(key(KeyCode::Left), ONCALL, Action::PrevLayer),
    bind(key(KeyCode::Right), ONCALL, Action::NextLayer),
    bind(key(KeyCode::Char('q')), PageScope::Any, Action::Quit),
    bind(ctrl('c'), PageScope::Any, Action::Quit),
    bind(key(KeyCode::Char('r')), PageScope::Any, Action::Refresh),
    bind(key(KeyCode::Char('1')), PageScope::Any, Action::ShowAcknowledged),
    bind(key(KeyCode::Char('2')), PageScope::Any, Action::ShowTriggered),
    bind(key(KeyCode::Enter), PageScope::Any, Action::OpenRow),
    bind(key(KeyCode::Char(' ')), PageScope::Any, Action::ToggleSelect),
    bind(key(KeyCode::Esc), PageScope::Any, Action::Back),
    bind(key(KeyCode::Char('j')), PageScope::Any, Action::MoveDown),
    bind(key(KeyCode::Down), PageScope::Any, Action::MoveDown),
    bind(key(KeyCode::Char('k')), PageScope::Any, Action::MoveUp),
    bind(key(KeyCode::Up), PageScope::Any, Action::MoveUp),
    bind(key(KeyCode::Home), PageScope::Any, Action::Top),
    bind(key(KeyCode::End), PageScope::Any, Action::Bottom),
];

/// Maps a key to an action for the current mode and front page.
pub fn resolve(mode: InputMode, front_page: &str, event: &KeyEvent) -> Option<Action> {
    if mode == InputMode::Terminal {
        return Some(Action::Multiplexer);
    }
    KEYMAP
        .iter()
        .find(|binding| binding.scope.matches(front_page) && binding.pattern.matches(event))
        .map(|binding| binding.action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::{oncall_page_title, ALERTS_PAGE, NEXT_ONCALL_PAGE};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl_press(letter: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(letter), KeyModifiers::CONTROL)
    }

    #[test]
    fn global_keys_resolve_on_any_page() {
        assert_eq!(
            resolve(InputMode::Dashboard, ALERTS_PAGE, &press(KeyCode::Char('r'))),
            Some(Action::Refresh)
        );
        let shifted = KeyEvent::new(KeyCode::Char('R'), KeyModifiers::SHIFT);
        assert_eq!(
            resolve(InputMode::Dashboard, INCIDENTS_PAGE, &shifted),
            Some(Action::Refresh)
        );
        assert_eq!(
            resolve(InputMode::Dashboard, ALERTS_PAGE, &press(KeyCode::Char('2'))),
            Some(Action::ShowTriggered)
        );
    }

    #[test]
    fn page_scoped_bindings_only_fire_on_their_page() {
        assert_eq!(
            resolve(InputMode::Dashboard, INCIDENTS_PAGE, &ctrl_press('a')),
            Some(Action::Acknowledge)
        );
        assert_eq!(resolve(InputMode::Dashboard, ALERTS_PAGE, &ctrl_press('a')), None);
        assert_eq!(
            resolve(InputMode::Dashboard, METADATA_PAGE, &press(KeyCode::Char('y'))),
            Some(Action::ClusterLogin)
        );
        assert_eq!(
            resolve(InputMode::Dashboard, ALERTS_PAGE, &press(KeyCode::Char('y'))),
            None
        );
    }

    #[test]
    fn oncall_bindings_match_paginated_titles() {
        for title in [oncall_page_title(1), oncall_page_title(3), NEXT_ONCALL_PAGE.to_string()] {
            assert_eq!(
                resolve(InputMode::Dashboard, &title, &press(KeyCode::Right)),
                Some(Action::NextLayer)
            );
            assert_eq!(
                resolve(InputMode::Dashboard, &title, &press(KeyCode::Char('a'))),
                Some(Action::AllTeamsOncall)
            );
        }
        assert_eq!(resolve(InputMode::Dashboard, ALERTS_PAGE, &press(KeyCode::Right)), None);
    }

    #[test]
    fn unmatched_keys_are_noops_and_terminal_mode_defers() {
        assert_eq!(
            resolve(InputMode::Dashboard, ALERTS_PAGE, &press(KeyCode::F(5))),
            None
        );
        assert_eq!(
            resolve(InputMode::Terminal, ALERTS_PAGE, &press(KeyCode::Char('q'))),
            Some(Action::Multiplexer)
        );
    }
}
