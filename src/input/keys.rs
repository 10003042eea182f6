//! Keyboard translation
//!
//! Maps key events to reader commands. Continuous movement scrolls by a
//! fixed fraction of the viewport; Home/End jump to the absolute ends of
//! the scroll container; g/G drive discrete first/last navigation.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Fraction of the viewport height moved per scroll keypress.
pub const KEY_SCROLL_FRACTION: f32 = 0.85;

/// Commands produced by keyboard translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputCommand {
    /// Scroll by a signed fraction of the viewport height.
    ScrollBy(f32),
    /// Jump to the absolute top of the scroll container.
    ScrollTop,
    /// Jump to the absolute bottom of the scroll container.
    ScrollBottom,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    /// Open the go-to-page prompt.
    GoToPrompt,
    ZoomIn,
    ZoomOut,
    ToggleDarkMode,
    Quit,
}

/// Translate a key event, or `None` for keys the reader does not own.
#[must_use]
pub fn translate_key(key: &KeyEvent) -> Option<InputCommand> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(InputCommand::Quit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Down | KeyCode::Char('j') => Some(InputCommand::ScrollBy(KEY_SCROLL_FRACTION)),
        KeyCode::Up | KeyCode::Char('k') => Some(InputCommand::ScrollBy(-KEY_SCROLL_FRACTION)),
        KeyCode::Char(' ') | KeyCode::PageDown => Some(InputCommand::ScrollBy(KEY_SCROLL_FRACTION)),
        KeyCode::PageUp => Some(InputCommand::ScrollBy(-KEY_SCROLL_FRACTION)),
        KeyCode::Home => Some(InputCommand::ScrollTop),
        KeyCode::End => Some(InputCommand::ScrollBottom),
        KeyCode::Right | KeyCode::Char('n') => Some(InputCommand::NextPage),
        KeyCode::Left | KeyCode::Char('p') => Some(InputCommand::PrevPage),
        KeyCode::Char('g') => Some(InputCommand::FirstPage),
        KeyCode::Char('G') => Some(InputCommand::LastPage),
        KeyCode::Char(':') => Some(InputCommand::GoToPrompt),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(InputCommand::ZoomIn),
        KeyCode::Char('-') => Some(InputCommand::ZoomOut),
        KeyCode::Char('d') => Some(InputCommand::ToggleDarkMode),
        KeyCode::Char('q') | KeyCode::Esc => Some(InputCommand::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::empty(),
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    #[test]
    fn movement_keys_scroll_by_viewport_fraction() {
        for code in [KeyCode::Down, KeyCode::Char('j'), KeyCode::PageDown] {
            assert_eq!(
                translate_key(&key(code)),
                Some(InputCommand::ScrollBy(KEY_SCROLL_FRACTION))
            );
        }
        for code in [KeyCode::Up, KeyCode::Char('k'), KeyCode::PageUp] {
            assert_eq!(
                translate_key(&key(code)),
                Some(InputCommand::ScrollBy(-KEY_SCROLL_FRACTION))
            );
        }
    }

    #[test]
    fn home_and_end_are_absolute_jumps() {
        assert_eq!(translate_key(&key(KeyCode::Home)), Some(InputCommand::ScrollTop));
        assert_eq!(translate_key(&key(KeyCode::End)), Some(InputCommand::ScrollBottom));
    }

    #[test]
    fn unowned_keys_pass_through() {
        assert_eq!(translate_key(&key(KeyCode::Char('x'))), None);
        assert_eq!(translate_key(&key(KeyCode::F(5))), None);
    }
}
