//! Named colors available to the `color` statement

use serde::{Deserialize, Serialize};

use crate::error::{BugsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pack into a word suitable for an `AtomicU32`; `None` packs to zero.
    pub fn pack(color: Option<Color>) -> u32 {
        match color {
            Some(c) => 0x0100_0000 | (c.r as u32) << 16 | (c.g as u32) << 8 | c.b as u32,
            None => 0,
        }
    }

    pub fn unpack(word: u32) -> Option<Color> {
        if word & 0x0100_0000 == 0 {
            return None;
        }
        Some(Color::rgb((word >> 16) as u8, (word >> 8) as u8, word as u8))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

const NAMED: &[(&str, Color)] = &[
    ("black", Color::rgb(0, 0, 0)),
    ("blue", Color::rgb(0, 0, 255)),
    ("brown", Color::rgb(153, 102, 51)),
    ("cyan", Color::rgb(0, 255, 255)),
    ("darkGray", Color::rgb(64, 64, 64)),
    ("gray", Color::rgb(128, 128, 128)),
    ("green", Color::rgb(0, 255, 0)),
    ("lightGray", Color::rgb(192, 192, 192)),
    ("magenta", Color::rgb(255, 0, 255)),
    ("orange", Color::rgb(255, 200, 0)),
    ("pink", Color::rgb(255, 175, 175)),
    ("purple", Color::rgb(128, 0, 128)),
    ("red", Color::rgb(255, 0, 0)),
    ("white", Color::rgb(255, 255, 255)),
    ("yellow", Color::rgb(255, 255, 0)),
];

/// Resolve a color name. `none` is valid and means "do not draw".
pub fn lookup(name: &str) -> Result<Option<Color>> {
    if name == "none" {
        return Ok(None);
    }
    NAMED
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, color)| Some(*color))
        .ok_or_else(|| BugsError::UnknownColor(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::lexer::is_keyword;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("blue").unwrap(), Some(Color::rgb(0, 0, 255)));
        assert_eq!(lookup("lightGray").unwrap(), Some(Color::rgb(192, 192, 192)));
        assert_eq!(lookup("none").unwrap(), None);
        assert_eq!(
            lookup("loop").unwrap_err(),
            BugsError::UnknownColor("loop".to_string())
        );
    }

    #[test]
    fn test_every_color_is_a_keyword() {
        for name in NAMED.iter().map(|(name, _)| *name).chain(["none"]) {
            assert!(is_keyword(name), "{} should be reserved", name);
        }
    }

    #[test]
    fn test_pack() {
        for color in [None, Some(Color::BLACK), Some(Color::rgb(255, 200, 0))] {
            assert_eq!(Color::unpack(Color::pack(color)), color);
        }
        assert_ne!(Color::pack(Some(Color::BLACK)), Color::pack(None));
        assert_eq!(Color::rgb(255, 175, 175).to_hex(), "#ffafaf");
    }
}
