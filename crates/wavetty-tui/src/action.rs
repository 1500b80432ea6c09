//! Action enum: everything a key press or terminal event can ask the app to do.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NextMode,
    NextScheme,
    CycleEq,
    ToggleAscii,
    SaveConfig,
    /// Terminal resized to `(cols, rows)`.
    Resize(u16, u16),
    Quit,
}

impl Action {
    pub fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::Key(key) => Self::from_key(key),
            Event::Resize(cols, rows) => Some(Action::Resize(*cols, *rows)),
            _ => None,
        }
    }

    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        // Windows reports both press and release
        if key.kind == KeyEventKind::Release {
            return None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Action::Quit),
                _ => None,
            };
        }
        match key.code {
            KeyCode::Char(' ') => Some(Action::NextMode),
            KeyCode::Enter => Some(Action::NextScheme),
            KeyCode::Char('w') | KeyCode::Char('W') => Some(Action::CycleEq),
            KeyCode::Char('b') | KeyCode::Char('B') => Some(Action::ToggleAscii),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::SaveConfig),
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Action::Quit),
            _ => None,
        }
    }
}
