//! Severity levels and the leveler abstraction used for filtering.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, Ordering};

use thiserror::Error;

use crate::value::{AnyValue, BoxError};

/// Severity of a log record.
///
/// Levels are plain integers so applications can define their own between
/// the named ones. Higher is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Level(i32);

impl Level {
    /// Level used for lifecycle framework events.
    pub const FX: Self = Self(-8);
    /// Level used for lifecycle framework failures.
    pub const FX_ERROR: Self = Self(-7);
    /// Debug level.
    pub const DEBUG: Self = Self(-4);
    /// Info level.
    pub const INFO: Self = Self(0);
    /// Warning level.
    pub const WARN: Self = Self(4);
    /// Error level.
    pub const ERROR: Self = Self(8);

    /// Creates a level from its numeric value.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the numeric value of the level.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns the name written to the `level` field.
    ///
    /// The two lifecycle levels have fixed short names; every other level
    /// uses its canonical form (see the [`Display`](fmt::Display) impl).
    #[must_use]
    pub fn display_name(self) -> Cow<'static, str> {
        match self {
            Self::FX => Cow::Borrowed("FX"),
            Self::FX_ERROR => Cow::Borrowed("FXERR"),
            Self::DEBUG => Cow::Borrowed("DEBUG"),
            Self::INFO => Cow::Borrowed("INFO"),
            Self::WARN => Cow::Borrowed("WARN"),
            Self::ERROR => Cow::Borrowed("ERROR"),
            other => Cow::Owned(other.to_string()),
        }
    }
}

/// Canonical form: the nearest named level at or below, plus an offset,
/// e.g. `INFO`, `WARN+1`, `DEBUG-4`.
impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (base, name) = if *self < Self::INFO {
            (Self::DEBUG, "DEBUG")
        } else if *self < Self::WARN {
            (Self::INFO, "INFO")
        } else if *self < Self::ERROR {
            (Self::WARN, "WARN")
        } else {
            (Self::ERROR, "ERROR")
        };
        let offset = i64::from(self.0) - i64::from(base.0);
        if offset == 0 {
            f.write_str(name)
        } else {
            write!(f, "{name}{offset:+}")
        }
    }
}

/// Error returned when parsing an invalid log level string.
///
/// Accepted forms are a level name (`debug`, `info`, `warn`, `error`, `fx`,
/// `fxerr`; case-insensitive) optionally followed by a signed offset such as
/// `+2` or `-4`.
///
/// # Example
///
/// ```rust
/// use charmed_slog::Level;
///
/// assert_eq!("info".parse::<Level>().unwrap(), Level::INFO);
/// assert_eq!("DEBUG-4".parse::<Level>().unwrap(), Level::FX);
/// assert!("verbose".parse::<Level>().is_err());
/// ```
#[derive(Error, Debug, Clone)]
#[error("invalid level: {0:?}")]
pub struct ParseLevelError(String);

/// A specialized [`Result`] type for level parsing operations.
pub type ParseResult<T> = std::result::Result<T, ParseLevelError>;

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> ParseResult<Self> {
        let err = || ParseLevelError(s.to_string());
        let (name, offset) = match s.find(['+', '-']) {
            Some(idx) => {
                let offset: i32 = s[idx..].parse().map_err(|_| err())?;
                (&s[..idx], offset)
            }
            None => (s, 0),
        };
        let base = match name.to_ascii_uppercase().as_str() {
            "DEBUG" => Self::DEBUG,
            "INFO" => Self::INFO,
            "WARN" => Self::WARN,
            "ERROR" => Self::ERROR,
            "FX" => Self::FX,
            "FXERR" => Self::FX_ERROR,
            _ => return Err(err()),
        };
        base.0.checked_add(offset).map(Self).ok_or_else(err)
    }
}

impl AnyValue for Level {
    fn marshal_text(&self) -> Option<Result<String, BoxError>> {
        Some(Ok(self.display_name().into_owned()))
    }

    fn marshal_json(&self) -> Option<Result<serde_json::Value, BoxError>> {
        Some(Ok(serde_json::Value::String(
            self.display_name().into_owned(),
        )))
    }
}

/// Source of the minimum level a handler accepts.
///
/// Implemented by [`Level`] for a fixed minimum and by [`LevelVar`] for a
/// minimum that can change while handlers are in use.
pub trait Leveler: Send + Sync {
    /// Returns the current minimum level.
    fn level(&self) -> Level;
}

impl Leveler for Level {
    fn level(&self) -> Level {
        *self
    }
}

/// A level that can be changed at runtime and shared between handlers.
///
/// ```rust
/// use charmed_slog::{Level, LevelVar, Leveler};
///
/// let var = LevelVar::new(Level::INFO);
/// var.set(Level::DEBUG);
/// assert_eq!(var.level(), Level::DEBUG);
/// ```
#[derive(Debug, Default)]
pub struct LevelVar(AtomicI32);

impl LevelVar {
    /// Creates a variable holding `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self(AtomicI32::new(level.0))
    }

    /// Replaces the stored level.
    pub fn set(&self, level: Level) {
        self.0.store(level.0, Ordering::Relaxed);
    }
}

impl Leveler for LevelVar {
    fn level(&self) -> Level {
        Level(self.0.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::FX < Level::FX_ERROR);
        assert!(Level::FX_ERROR < Level::DEBUG);
        assert!(Level::DEBUG < Level::INFO);
        assert!(Level::INFO < Level::WARN);
        assert!(Level::WARN < Level::ERROR);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::DEBUG.to_string(), "DEBUG");
        assert_eq!(Level::INFO.to_string(), "INFO");
        assert_eq!(Level::WARN.to_string(), "WARN");
        assert_eq!(Level::ERROR.to_string(), "ERROR");
        assert_eq!(Level::new(2).to_string(), "INFO+2");
        assert_eq!(Level::new(12).to_string(), "ERROR+4");
        assert_eq!(Level::FX.to_string(), "DEBUG-4");
        assert_eq!(Level::FX_ERROR.to_string(), "DEBUG-3");
    }

    #[test]
    fn test_display_name_custom_levels() {
        assert_eq!(Level::FX.display_name(), "FX");
        assert_eq!(Level::FX_ERROR.display_name(), "FXERR");
        assert_eq!(Level::new(-6).display_name(), "DEBUG-2");
        assert_eq!(Level::INFO.display_name(), "INFO");
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("debug".parse::<Level>().unwrap(), Level::DEBUG);
        assert_eq!("INFO".parse::<Level>().unwrap(), Level::INFO);
        assert_eq!("Warn+1".parse::<Level>().unwrap(), Level::new(5));
        assert_eq!("error-2".parse::<Level>().unwrap(), Level::new(6));
        assert_eq!("fx".parse::<Level>().unwrap(), Level::FX);
        assert_eq!("FXERR".parse::<Level>().unwrap(), Level::FX_ERROR);
        assert!("warning".parse::<Level>().is_err());
        assert!("info+".parse::<Level>().is_err());
        assert!("".parse::<Level>().is_err());
    }

    #[test]
    fn test_display_parse_roundtrip() {
        for n in -12..16 {
            let level = Level::new(n);
            assert_eq!(level.to_string().parse::<Level>().unwrap(), level);
        }
    }

    #[test]
    fn test_level_var() {
        let var = LevelVar::new(Level::WARN);
        assert_eq!(var.level(), Level::WARN);
        var.set(Level::FX);
        assert_eq!(var.level(), Level::FX);
    }
}
