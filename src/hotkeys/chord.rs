//! Key-chord parsing.
//!
//! Accepts the forms users actually type into the settings dialog:
//! `Ctrl+Shift+H`, `ctrl shift h` and the bracketed `<CTRL><ALT>H`.

use std::fmt;

use bitflags::bitflags;
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use thiserror::Error;

/// Errors that can occur when parsing a chord string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChordParseError {
    #[error("hotkey string is empty")]
    Empty,
    #[error("hotkey has no key, only modifiers")]
    MissingKey,
    #[error("unknown modifier '{0}' in hotkey")]
    UnknownModifier(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierMask: u8 {
        const CTRL = 1 << 0;
        const ALT = 1 << 1;
        const SHIFT = 1 << 2;
        const SUPER = 1 << 3;
    }
}

impl ModifierMask {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "ctrl" | "control" | "ctl" | "^" => Some(Self::CTRL),
            "alt" | "opt" | "option" => Some(Self::ALT),
            "shift" | "shft" => Some(Self::SHIFT),
            "super" | "win" | "cmd" | "command" | "meta" | "mod4" => Some(Self::SUPER),
            _ => None,
        }
    }

    fn to_hotkey_modifiers(self) -> Modifiers {
        let mut mods = Modifiers::empty();
        if self.contains(Self::CTRL) {
            mods |= Modifiers::CONTROL;
        }
        if self.contains(Self::ALT) {
            mods |= Modifiers::ALT;
        }
        if self.contains(Self::SHIFT) {
            mods |= Modifiers::SHIFT;
        }
        if self.contains(Self::SUPER) {
            mods |= Modifiers::SUPER;
        }
        mods
    }
}

/// Modifier bitmask plus exactly one base key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub modifiers: ModifierMask,
    pub code: Code,
    key: String,
}

impl KeyChord {
    pub fn parse(s: &str) -> Result<Self, ChordParseError> {
        let normalized: String = s
            .chars()
            .map(|c| if matches!(c, '+' | '<' | '>') { ' ' } else { c })
            .collect();
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let Some((key_token, modifier_tokens)) = tokens.split_last() else {
            return Err(ChordParseError::Empty);
        };

        let mut modifiers = ModifierMask::empty();
        for token in modifier_tokens {
            let mask = ModifierMask::from_token(&token.to_lowercase())
                .ok_or_else(|| ChordParseError::UnknownModifier(token.to_string()))?;
            modifiers |= mask;
        }

        if ModifierMask::from_token(&key_token.to_lowercase()).is_some() {
            return Err(ChordParseError::MissingKey);
        }

        let (code, key) =
            parse_key(key_token).ok_or_else(|| ChordParseError::UnknownKey(key_token.to_string()))?;

        Ok(Self {
            modifiers,
            code,
            key,
        })
    }

    pub fn to_hotkey(&self) -> HotKey {
        let mods = self.modifiers.to_hotkey_modifiers();
        HotKey::new((!mods.is_empty()).then_some(mods), self.code)
    }

    /// Canonical key label ("H", "F5", "Space").
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, label) in [
            (ModifierMask::CTRL, "Ctrl"),
            (ModifierMask::ALT, "Alt"),
            (ModifierMask::SHIFT, "Shift"),
            (ModifierMask::SUPER, "Super"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{}+", label)?;
            }
        }
        f.write_str(&self.key)
    }
}

fn parse_key(token: &str) -> Option<(Code, String)> {
    let lower = token.to_lowercase();

    if lower.chars().count() == 1 {
        let c = lower.chars().next()?;
        if let Some(code) = letter_code(c).or_else(|| digit_code(c)).or_else(|| punct_code(c)) {
            return Some((code, c.to_uppercase().collect()));
        }
    }

    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        return function_code(n).map(|code| (code, format!("F{}", n)));
    }

    let (code, label) = match lower.as_str() {
        "space" => (Code::Space, "Space"),
        "enter" | "return" => (Code::Enter, "Enter"),
        "tab" => (Code::Tab, "Tab"),
        "escape" | "esc" => (Code::Escape, "Escape"),
        "backspace" => (Code::Backspace, "Backspace"),
        "delete" | "del" => (Code::Delete, "Delete"),
        "insert" | "ins" => (Code::Insert, "Insert"),
        "home" => (Code::Home, "Home"),
        "end" => (Code::End, "End"),
        "pageup" | "pgup" => (Code::PageUp, "PageUp"),
        "pagedown" | "pgdn" => (Code::PageDown, "PageDown"),
        "up" | "arrowup" => (Code::ArrowUp, "Up"),
        "down" | "arrowdown" => (Code::ArrowDown, "Down"),
        "left" | "arrowleft" => (Code::ArrowLeft, "Left"),
        "right" | "arrowright" => (Code::ArrowRight, "Right"),
        "semicolon" => (Code::Semicolon, ";"),
        "comma" => (Code::Comma, ","),
        "period" => (Code::Period, "."),
        "slash" => (Code::Slash, "/"),
        "backslash" => (Code::Backslash, "\\"),
        "minus" => (Code::Minus, "-"),
        "equal" => (Code::Equal, "="),
        "backquote" | "grave" => (Code::Backquote, "`"),
        "quote" | "apostrophe" => (Code::Quote, "'"),
        "bracketleft" => (Code::BracketLeft, "["),
        "bracketright" => (Code::BracketRight, "]"),
        _ => return None,
    };
    Some((code, label.to_string()))
}

fn letter_code(c: char) -> Option<Code> {
    const LETTERS: [Code; 26] = [
        Code::KeyA,
        Code::KeyB,
        Code::KeyC,
        Code::KeyD,
        Code::KeyE,
        Code::KeyF,
        Code::KeyG,
        Code::KeyH,
        Code::KeyI,
        Code::KeyJ,
        Code::KeyK,
        Code::KeyL,
        Code::KeyM,
        Code::KeyN,
        Code::KeyO,
        Code::KeyP,
        Code::KeyQ,
        Code::KeyR,
        Code::KeyS,
        Code::KeyT,
        Code::KeyU,
        Code::KeyV,
        Code::KeyW,
        Code::KeyX,
        Code::KeyY,
        Code::KeyZ,
    ];
    c.is_ascii_lowercase()
        .then(|| LETTERS[(c as u8 - b'a') as usize])
}

fn digit_code(c: char) -> Option<Code> {
    const DIGITS: [Code; 10] = [
        Code::Digit0,
        Code::Digit1,
        Code::Digit2,
        Code::Digit3,
        Code::Digit4,
        Code::Digit5,
        Code::Digit6,
        Code::Digit7,
        Code::Digit8,
        Code::Digit9,
    ];
    c.to_digit(10).map(|d| DIGITS[d as usize])
}

fn punct_code(c: char) -> Option<Code> {
    Some(match c {
        ';' => Code::Semicolon,
        ',' => Code::Comma,
        '.' => Code::Period,
        '/' => Code::Slash,
        '\\' => Code::Backslash,
        '-' => Code::Minus,
        '=' => Code::Equal,
        '`' => Code::Backquote,
        '\'' => Code::Quote,
        '[' => Code::BracketLeft,
        ']' => Code::BracketRight,
        _ => return None,
    })
}

fn function_code(n: u8) -> Option<Code> {
    Some(match n {
        1 => Code::F1,
        2 => Code::F2,
        3 => Code::F3,
        4 => Code::F4,
        5 => Code::F5,
        6 => Code::F6,
        7 => Code::F7,
        8 => Code::F8,
        9 => Code::F9,
        10 => Code::F10,
        11 => Code::F11,
        12 => Code::F12,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plus_separated() {
        let chord = KeyChord::parse("Ctrl+Shift+H").unwrap();
        assert_eq!(chord.modifiers, ModifierMask::CTRL | ModifierMask::SHIFT);
        assert_eq!(chord.code, Code::KeyH);
        assert_eq!(chord.to_string(), "Ctrl+Shift+H");
    }

    #[test]
    fn test_parse_bracketed_form() {
        let chord = KeyChord::parse("<CTRL><ALT>H").unwrap();
        assert_eq!(chord.modifiers, ModifierMask::CTRL | ModifierMask::ALT);
        assert_eq!(chord.code, Code::KeyH);
    }

    #[test]
    fn test_parse_space_separated_lowercase() {
        let chord = KeyChord::parse("super f5").unwrap();
        assert_eq!(chord.modifiers, ModifierMask::SUPER);
        assert_eq!(chord.code, Code::F5);
        assert_eq!(chord.to_string(), "Super+F5");
    }

    #[test]
    fn test_same_chord_same_hotkey_id() {
        let a = KeyChord::parse("Ctrl+Alt+J").unwrap().to_hotkey();
        let b = KeyChord::parse("<ctrl><alt>j").unwrap().to_hotkey();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_unknown_modifier_fails() {
        assert_eq!(
            KeyChord::parse("Hyper+H"),
            Err(ChordParseError::UnknownModifier("Hyper".to_string()))
        );
    }

    #[test]
    fn test_unknown_key_fails() {
        assert_eq!(
            KeyChord::parse("Ctrl+Banana"),
            Err(ChordParseError::UnknownKey("Banana".to_string()))
        );
    }

    #[test]
    fn test_empty_and_modifier_only() {
        assert_eq!(KeyChord::parse("  "), Err(ChordParseError::Empty));
        assert_eq!(KeyChord::parse("Ctrl+Shift"), Err(ChordParseError::MissingKey));
    }
}
