//! Keyboard shortcuts.
//!
//! The modifier is Ctrl or Cmd, whichever the platform uses; callers fold
//! both into `modifier`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shortcut {
    Undo,
    Redo,
    /// Export the article to a file
    Save,
}

/// A key press with its modifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub key: char,
    pub modifier: bool,
    pub shift: bool,
}

impl KeyChord {
    pub fn new(key: char, modifier: bool, shift: bool) -> Self {
        Self { key, modifier, shift }
    }

    /// Modifier + `key`
    pub fn modified(key: char) -> Self {
        Self::new(key, true, false)
    }

    /// Modifier + Shift + `key`
    pub fn modified_shift(key: char) -> Self {
        Self::new(key, true, true)
    }

    pub fn shortcut(&self) -> Option<Shortcut> {
        if !self.modifier {
            return None;
        }
        match (self.key.to_ascii_lowercase(), self.shift) {
            ('z', false) => Some(Shortcut::Undo),
            ('z', true) | ('y', _) => Some(Shortcut::Redo),
            ('s', _) => Some(Shortcut::Save),
            _ => None,
        }
    }
}
