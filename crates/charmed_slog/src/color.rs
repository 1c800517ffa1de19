//! Level colors for the pretty encoding.

use std::collections::HashMap;

use crate::buffer::Buffer;
use crate::level::Level;

/// A single SGR foreground color code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogColor(pub u8);

impl LogColor {
    pub const FG_BLACK: Self = Self(30);
    pub const FG_RED: Self = Self(31);
    pub const FG_GREEN: Self = Self(32);
    pub const FG_YELLOW: Self = Self(33);
    pub const FG_BLUE: Self = Self(34);
    pub const FG_MAGENTA: Self = Self(35);
    pub const FG_CYAN: Self = Self(36);
    pub const FG_WHITE: Self = Self(37);
    pub const FG_HI_BLACK: Self = Self(90);
    pub const FG_HI_RED: Self = Self(91);
    pub const FG_HI_GREEN: Self = Self(92);
    pub const FG_HI_YELLOW: Self = Self(93);
    pub const FG_HI_BLUE: Self = Self(94);
    pub const FG_HI_MAGENTA: Self = Self(95);
    pub const FG_HI_CYAN: Self = Self(96);
    pub const FG_HI_WHITE: Self = Self(97);

    /// Writes `text` wrapped in this color and a reset sequence.
    pub(crate) fn paint(self, buf: &mut Buffer, text: &[u8]) {
        buf.write_str("\x1b[");
        buf.write_u64(u64::from(self.0));
        buf.write_byte(b'm');
        buf.write_bytes(text);
        buf.write_str("\x1b[0m");
    }
}

/// Color used for levels missing from a non-empty [`LevelColorMap`].
pub const DEFAULT_COLOR: LogColor = LogColor::FG_WHITE;

/// Mapping from level to the color of its `level` field.
///
/// An empty map disables coloring entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelColorMap(HashMap<Level, LogColor>);

impl LevelColorMap {
    /// A map with no entries; nothing is colored.
    #[must_use]
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// The colors used by pretty handlers unless configured otherwise.
    #[must_use]
    pub fn default_map() -> Self {
        Self::empty()
            .with(Level::FX, LogColor::FG_CYAN)
            .with(Level::FX_ERROR, LogColor::FG_HI_RED)
            .with(Level::DEBUG, LogColor::FG_BLUE)
            .with(Level::INFO, LogColor::FG_HI_GREEN)
            .with(Level::WARN, LogColor::FG_YELLOW)
            .with(Level::ERROR, LogColor::FG_RED)
    }

    /// Returns the map with `level` set to `color`.
    #[must_use]
    pub fn with(mut self, level: Level, color: LogColor) -> Self {
        self.0.insert(level, color);
        self
    }

    /// Returns the color registered for exactly `level`.
    #[must_use]
    pub fn get(&self, level: Level) -> Option<LogColor> {
        self.0.get(&level).copied()
    }

    /// Returns true when the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolves the color for `level`.
    ///
    /// `None` means "no color" and is only returned for an empty map;
    /// otherwise unknown levels fall back to [`DEFAULT_COLOR`].
    #[must_use]
    pub fn color_for(&self, level: Level) -> Option<LogColor> {
        if self.is_empty() {
            return None;
        }
        Some(self.get(level).unwrap_or(DEFAULT_COLOR))
    }
}

impl FromIterator<(Level, LogColor)> for LevelColorMap {
    fn from_iter<I: IntoIterator<Item = (Level, LogColor)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map_covers_named_levels() {
        let map = LevelColorMap::default_map();
        for level in [
            Level::FX,
            Level::FX_ERROR,
            Level::DEBUG,
            Level::INFO,
            Level::WARN,
            Level::ERROR,
        ] {
            assert!(map.get(level).is_some(), "{level} has no color");
        }
        assert_eq!(map.get(Level::INFO), Some(LogColor::FG_HI_GREEN));
    }

    #[test]
    fn test_color_for_fallback() {
        let map = LevelColorMap::default_map();
        assert_eq!(map.color_for(Level::new(3)), Some(DEFAULT_COLOR));
        assert_eq!(map.color_for(Level::ERROR), Some(LogColor::FG_RED));
    }

    #[test]
    fn test_empty_map_means_no_color() {
        assert_eq!(LevelColorMap::empty().color_for(Level::INFO), None);
    }

    #[test]
    fn test_paint() {
        let mut buf = Buffer::new();
        LogColor::FG_RED.paint(&mut buf, b"ERROR");
        assert_eq!(buf.as_slice(), b"\x1b[31mERROR\x1b[0m");
        buf.free();
    }
}
