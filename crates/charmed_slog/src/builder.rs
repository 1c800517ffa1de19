//! Step-by-step handler configuration.

use std::fmt;
use std::io::{self, Write};

use chrono::format::{Item, StrftimeItems};
use tracing::debug;

use crate::color::LevelColorMap;
use crate::error::ConfigError;
use crate::handler::{Config, Encoding, Handler, HandlerOptions};
use crate::{DEFAULT_PRETTY_TIME_LAYOUT, DEFAULT_TIME_LAYOUT, JSON_SEP, PRETTY_SEP, TEXT_SEP};

/// Builds a [`Handler`].
///
/// Starts as a text handler writing to stdout with safe quoting, no colors,
/// [`DEFAULT_TIME_LAYOUT`] and a space separator. Empty layouts and
/// separators passed to the setters are ignored.
///
/// ```rust
/// use charmed_slog::{HandlerBuilder, LevelColorMap};
///
/// let handler = HandlerBuilder::new()
///     .with_pretty()
///     .with_color(LevelColorMap::default_map())
///     .with_time_layout("%H:%M:%S")
///     .with_writer(std::io::stderr())
///     .build()
///     .unwrap();
/// ```
pub struct HandlerBuilder {
    json: bool,
    pretty: bool,
    safe: bool,
    /// Set by `with_safe`; survives the pretty default of relaxed quoting.
    keep_safe: bool,
    colors: LevelColorMap,
    layout: String,
    sep: String,
    opts: HandlerOptions,
    writer: Box<dyn Write + Send>,
}

impl Default for HandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            json: false,
            pretty: false,
            safe: true,
            keep_safe: false,
            colors: LevelColorMap::empty(),
            layout: DEFAULT_TIME_LAYOUT.to_string(),
            sep: TEXT_SEP.to_string(),
            opts: HandlerOptions::default(),
            writer: Box::new(io::stdout()),
        }
    }

    /// Switches to the pretty encoding with its default colors, layout and
    /// separator. Pretty handlers write strings unquoted unless
    /// [`with_safe`](Self::with_safe) is also called.
    #[must_use]
    pub fn with_pretty(mut self) -> Self {
        self.pretty = true;
        self.safe = true;
        self.colors = LevelColorMap::default_map();
        self.layout = DEFAULT_PRETTY_TIME_LAYOUT.to_string();
        self.sep = PRETTY_SEP.to_string();
        self
    }

    #[must_use]
    pub fn with_color(mut self, colors: LevelColorMap) -> Self {
        self.colors = colors;
        self
    }

    /// Turns off quoting of unsafe values.
    #[must_use]
    pub fn with_insecure(mut self) -> Self {
        self.safe = false;
        self.keep_safe = false;
        self
    }

    /// Quotes unsafe values in every encoding, pretty included.
    #[must_use]
    pub fn with_safe(mut self) -> Self {
        self.safe = true;
        self.keep_safe = true;
        self
    }

    /// Sets the strftime layout of the pretty time field.
    #[must_use]
    pub fn with_time_layout(mut self, layout: &str) -> Self {
        if !layout.is_empty() {
            self.layout = layout.to_string();
        }
        self
    }

    #[must_use]
    pub fn with_separator(mut self, sep: &str) -> Self {
        if !sep.is_empty() {
            self.sep = sep.to_string();
        }
        self
    }

    #[must_use]
    pub fn with_options(mut self, opts: HandlerOptions) -> Self {
        self.opts = opts;
        self
    }

    #[must_use]
    pub fn with_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    /// Switches to JSON. Overrides pretty, colors, quoting and separator.
    #[must_use]
    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Builds the handler.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeLayout`] if the time layout has an
    /// unknown `%` specifier.
    pub fn build(self) -> Result<Handler, ConfigError> {
        let Self {
            json,
            mut pretty,
            mut safe,
            keep_safe,
            mut colors,
            layout,
            mut sep,
            opts,
            writer,
        } = self;

        if json {
            pretty = false;
            safe = true;
            sep = JSON_SEP.to_string();
            colors = LevelColorMap::empty();
        }
        if pretty && !keep_safe {
            safe = false;
        }
        if StrftimeItems::new(&layout).any(|item| matches!(item, Item::Error)) {
            debug!(layout = %layout, "rejected slog time layout");
            return Err(ConfigError::InvalidTimeLayout(layout));
        }

        let encoding = if json {
            Encoding::Json
        } else if pretty {
            Encoding::Pretty
        } else {
            Encoding::Text
        };
        let config = Config {
            encoding,
            safe,
            sep,
            layout,
            colors,
            opts,
        };
        Ok(Handler::from_config(config, writer))
    }
}

impl fmt::Debug for HandlerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBuilder")
            .field("json", &self.json)
            .field("pretty", &self.pretty)
            .field("safe", &self.safe)
            .field("keep_safe", &self.keep_safe)
            .field("colors", &self.colors)
            .field("layout", &self.layout)
            .field("sep", &self.sep)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build_text_handler() {
        let handler = HandlerBuilder::new().build().unwrap();
        assert_eq!(handler.encoding(), Encoding::Text);
    }

    #[test]
    fn test_json_overrides_pretty() {
        let builder = HandlerBuilder::new()
            .with_pretty()
            .with_separator("|")
            .with_json();
        let handler = builder.build().unwrap();
        assert_eq!(handler.encoding(), Encoding::Json);
    }

    #[test]
    fn test_empty_inputs_are_ignored() {
        let builder = HandlerBuilder::new().with_separator("").with_time_layout("");
        assert_eq!(builder.sep, TEXT_SEP);
        assert_eq!(builder.layout, DEFAULT_TIME_LAYOUT);
    }

    #[test]
    fn test_pretty_relaxes_quoting_unless_safe_requested() {
        let relaxed = HandlerBuilder::new().with_pretty().build().unwrap();
        assert!(!relaxed.is_safe());

        let safe = HandlerBuilder::new().with_pretty().with_safe().build().unwrap();
        assert_eq!(safe.encoding(), Encoding::Pretty);
        assert!(safe.is_safe());

        let order_free = HandlerBuilder::new().with_safe().with_pretty().build().unwrap();
        assert!(order_free.is_safe());

        let insecure = HandlerBuilder::new().with_safe().with_insecure().build().unwrap();
        assert!(!insecure.is_safe());
    }

    #[test]
    fn test_invalid_layout_is_rejected() {
        let err = HandlerBuilder::new()
            .with_pretty()
            .with_time_layout("%Y-%Q")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeLayout("%Y-%Q".into()));
    }
}
