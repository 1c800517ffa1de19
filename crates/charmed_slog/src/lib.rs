#![forbid(unsafe_code)]
// Allow pedantic lints for early-stage API ergonomics.
#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

//! # Charmed Slog
//!
//! Structured log record encoding with `log/slog` compatible output.
//!
//! A [`Handler`] turns [`Record`]s (time, level, message and a tree of
//! [`Attr`]s) into one line each and writes it to a shared sink:
//! - **Text**: `key=value` pairs, byte-compatible with slog's `TextHandler`
//! - **JSON**: one object per line, byte-compatible with slog's `JSONHandler`
//! - **Pretty**: bare, colored built-in fields for terminals
//!
//! Attributes and groups bound with [`Handler::with_attrs`] and
//! [`Handler::with_group`] are encoded once and reused by every record.
//!
//! ## Example
//!
//! ```rust
//! use charmed_slog::{Attr, Handler, HandlerOptions, Level, Record};
//!
//! let handler = Handler::text(std::io::stdout(), HandlerOptions::default())
//!     .with_group("request")
//!     .with_attrs(&[Attr::string("id", "42")]);
//!
//! let record = Record::now(Level::INFO, "served")
//!     .with_attrs([Attr::int("status", 200)]);
//! handler.handle(&record).unwrap();
//! ```

mod buffer;
mod builder;
mod color;
mod error;
mod escape;
mod handler;
mod level;
mod number;
mod record;
mod state;
mod time;
mod value;

pub use builder::HandlerBuilder;
pub use color::{DEFAULT_COLOR, LevelColorMap, LogColor};
pub use error::{ConfigError, MarshalError};
pub use escape::needs_quoting;
pub use handler::{Encoding, Handler, HandlerOptions, ReplaceAttr};
pub use level::{Level, LevelVar, Leveler, ParseLevelError, ParseResult};
pub use record::{Record, Source};
pub use value::{AnyValue, Attr, BoxError, Bytes, ErrorValue, Kind, LogValuer, Serialized, Value};

/// Keys of the built-in fields.
pub mod keys {
    /// Key for the record time.
    pub const TIME: &str = "time";
    /// Key for the level.
    pub const LEVEL: &str = "level";
    /// Key for the message.
    pub const MESSAGE: &str = "msg";
    /// Key for the source location.
    pub const SOURCE: &str = "source";
}

/// Field separator of text handlers.
pub const TEXT_SEP: &str = " ";
/// Field separator of JSON handlers. Always used in JSON mode.
pub const JSON_SEP: &str = ",";
/// Field separator of pretty handlers.
pub const PRETTY_SEP: &str = " ";

/// Default strftime layout of the time field.
pub const DEFAULT_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";
/// Default strftime layout of the pretty time field.
pub const DEFAULT_PRETTY_TIME_LAYOUT: &str = "%Y/%m/%d %H:%M:%S";

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        AnyValue, Attr, ConfigError, DEFAULT_PRETTY_TIME_LAYOUT, DEFAULT_TIME_LAYOUT, Encoding,
        Handler, HandlerBuilder, HandlerOptions, Level, LevelColorMap, LevelVar, Leveler,
        LogColor, LogValuer, Record, Source, Value, keys,
    };
}
