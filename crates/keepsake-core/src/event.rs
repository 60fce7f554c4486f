#![forbid(unsafe_code)]

//! Canonical keyboard input types.
//!
//! Hosts translate their native key events into [`KeyEvent`]s. Key names
//! follow the DOM `KeyboardEvent.key` vocabulary so a browser shim can
//! forward them verbatim through [`KeyCode::from_key_name`].

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code that was pressed.
    pub code: KeyCode,

    /// The type of key event (press, repeat, or release).
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// A press of `code`.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            kind: KeyEventKind::Press,
        }
    }

    /// Create a key event with a specific kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether this key activates a focused control (Enter or Space).
    #[must_use]
    pub fn is_activation(&self) -> bool {
        matches!(self.code, KeyCode::Enter | KeyCode::Char(' '))
    }

    /// Whether this is a press (or auto-repeat) rather than a release.
    #[must_use]
    pub const fn is_press(&self) -> bool {
        !matches!(self.kind, KeyEventKind::Release)
    }
}

/// Key codes for keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A regular character key (including space).
    Char(char),

    /// Enter/Return key.
    Enter,

    /// Escape key.
    Escape,

    /// Left arrow key.
    Left,

    /// Right arrow key.
    Right,

    /// Media key: Play/Pause.
    MediaPlayPause,

    /// Media key: Next track.
    MediaNextTrack,

    /// Media key: Previous track.
    MediaPrevTrack,
}

impl KeyCode {
    /// Map a DOM `KeyboardEvent.key` value to a key code.
    ///
    /// Returns `None` for keys the page never reacts to.
    #[must_use]
    pub fn from_key_name(name: &str) -> Option<Self> {
        let code = match name {
            "Enter" => Self::Enter,
            "Escape" | "Esc" => Self::Escape,
            "ArrowLeft" => Self::Left,
            "ArrowRight" => Self::Right,
            "MediaPlayPause" => Self::MediaPlayPause,
            "MediaTrackNext" => Self::MediaNextTrack,
            "MediaTrackPrevious" => Self::MediaPrevTrack,
            "Space" | "Spacebar" => Self::Char(' '),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => return None,
                }
            }
        };
        Some(code)
    }
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Key was pressed (default when not distinguishable).
    #[default]
    Press,

    /// Key is being held (repeat event).
    Repeat,

    /// Key was released.
    Release,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_names_map_to_codes() {
        assert_eq!(KeyCode::from_key_name("Escape"), Some(KeyCode::Escape));
        assert_eq!(KeyCode::from_key_name("ArrowLeft"), Some(KeyCode::Left));
        assert_eq!(KeyCode::from_key_name("ArrowRight"), Some(KeyCode::Right));
        assert_eq!(KeyCode::from_key_name(" "), Some(KeyCode::Char(' ')));
        assert_eq!(KeyCode::from_key_name("a"), Some(KeyCode::Char('a')));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(KeyCode::from_key_name("F13"), None);
        assert_eq!(KeyCode::from_key_name(""), None);
        assert_eq!(KeyCode::from_key_name("ArrowUp"), None);
        assert_eq!(KeyCode::from_key_name("Tab"), None);
    }

    #[test]
    fn activation_keys() {
        assert!(KeyEvent::new(KeyCode::Enter).is_activation());
        assert!(KeyEvent::new(KeyCode::Char(' ')).is_activation());
        assert!(!KeyEvent::new(KeyCode::Escape).is_activation());
    }

    #[test]
    fn release_is_not_press() {
        let ev = KeyEvent::new(KeyCode::Left).with_kind(KeyEventKind::Release);
        assert!(!ev.is_press());
        assert!(KeyEvent::new(KeyCode::Left).is_press());
    }
}
