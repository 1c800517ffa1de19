//! The record handler.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::buffer::Buffer;
use crate::color::LevelColorMap;
use crate::level::{Level, Leveler};
use crate::record::{Record, Source};
use crate::state::HandleState;
use crate::value::Attr;
use crate::{DEFAULT_PRETTY_TIME_LAYOUT, DEFAULT_TIME_LAYOUT, JSON_SEP, PRETTY_SEP, TEXT_SEP};

/// Rewrites or drops attributes before they are written.
///
/// Called with the names of the groups enclosing the attribute (empty for
/// the built-in `time`, `level`, `source` and `msg` fields) and the
/// attribute, with lazy values already resolved. Returning [`Attr::empty`]
/// drops the attribute. Group attributes are never passed in; their
/// children are.
pub type ReplaceAttr = Arc<dyn Fn(&[String], Attr) -> Attr + Send + Sync>;

/// Shared output sink.
pub(crate) type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Options shared by every encoding.
#[derive(Clone, Default)]
pub struct HandlerOptions {
    /// Adds a `source` field with the record's program location.
    pub add_source: bool,
    /// Minimum level to handle; [`Level::FX`] when unset.
    pub level: Option<Arc<dyn Leveler>>,
    pub replace_attr: Option<ReplaceAttr>,
}

impl HandlerOptions {
    /// Sets whether the source location is reported.
    #[must_use]
    pub fn add_source(mut self, add_source: bool) -> Self {
        self.add_source = add_source;
        self
    }

    /// Sets the minimum level.
    #[must_use]
    pub fn level(mut self, level: impl Leveler + 'static) -> Self {
        self.level = Some(Arc::new(level));
        self
    }

    /// Sets the replace callback.
    #[must_use]
    pub fn replace_attr<F>(mut self, replace: F) -> Self
    where
        F: Fn(&[String], Attr) -> Attr + Send + Sync + 'static,
    {
        self.replace_attr = Some(Arc::new(replace));
        self
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("add_source", &self.add_source)
            .field("level", &self.level.as_ref().map(|l| l.level()))
            .field("replace_attr", &self.replace_attr.is_some())
            .finish()
    }
}

/// Output encoding of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// `key=value` pairs, values quoted when needed.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
    /// Bare colored built-in fields followed by `key=value` attributes.
    Pretty,
}

/// Settings fixed when a handler is built; shared by all derived handlers.
#[derive(Debug)]
pub(crate) struct Config {
    pub(crate) encoding: Encoding,
    pub(crate) safe: bool,
    pub(crate) sep: String,
    /// strftime layout for the pretty encoding.
    pub(crate) layout: String,
    pub(crate) colors: LevelColorMap,
    pub(crate) opts: HandlerOptions,
}

impl Config {
    pub(crate) fn attr_sep(&self) -> &str {
        if self.encoding == Encoding::Json {
            JSON_SEP
        } else {
            &self.sep
        }
    }
}

pub(crate) struct HandlerInner {
    pub(crate) config: Arc<Config>,
    /// Attributes bound with `with_attrs`, already encoded.
    pub(crate) preformatted: Vec<u8>,
    /// Text key prefix of the groups opened in `preformatted`.
    pub(crate) group_prefix: String,
    /// Every group bound with `with_group`.
    pub(crate) groups: Vec<String>,
    /// How many of `groups` are opened in `preformatted`.
    pub(crate) n_open_groups: usize,
    pub(crate) sink: Sink,
}

/// Encodes records and writes them to a shared sink.
///
/// Handlers are cheap to clone and safe to share between threads. Binding
/// attributes or a group returns a new handler; the receiver is unchanged.
/// All handlers derived from one root write through the same lock, so lines
/// never interleave.
///
/// # Example
///
/// ```rust
/// use charmed_slog::{Attr, Handler, HandlerOptions, Level, Record};
///
/// let handler = Handler::json(std::io::stdout(), HandlerOptions::default())
///     .with_attrs(&[Attr::string("service", "payments")]);
/// let record = Record::new(None, Level::INFO, "started");
/// handler.handle(&record).unwrap();
/// ```
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerInner>,
}

impl Handler {
    pub(crate) fn from_config(config: Config, writer: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                config: Arc::new(config),
                preformatted: Vec::new(),
                group_prefix: String::new(),
                groups: Vec::new(),
                n_open_groups: 0,
                sink: Arc::new(Mutex::new(writer)),
            }),
        }
    }

    /// A JSON handler.
    pub fn json(writer: impl Write + Send + 'static, opts: HandlerOptions) -> Self {
        Self::from_config(
            Config {
                encoding: Encoding::Json,
                safe: true,
                sep: JSON_SEP.to_string(),
                layout: DEFAULT_TIME_LAYOUT.to_string(),
                colors: LevelColorMap::empty(),
                opts,
            },
            Box::new(writer),
        )
    }

    /// A `key=value` text handler with quoting of unsafe values.
    pub fn text(writer: impl Write + Send + 'static, opts: HandlerOptions) -> Self {
        Self::from_config(
            Config {
                encoding: Encoding::Text,
                safe: true,
                sep: TEXT_SEP.to_string(),
                layout: DEFAULT_TIME_LAYOUT.to_string(),
                colors: LevelColorMap::empty(),
                opts,
            },
            Box::new(writer),
        )
    }

    /// A pretty handler with the default colors and time layout. Strings are
    /// written bare; use [`HandlerBuilder::with_safe`](crate::HandlerBuilder::with_safe)
    /// for a pretty handler that quotes them.
    pub fn pretty(writer: impl Write + Send + 'static, opts: HandlerOptions) -> Self {
        Self::from_config(
            Config {
                encoding: Encoding::Pretty,
                safe: false,
                sep: PRETTY_SEP.to_string(),
                layout: DEFAULT_PRETTY_TIME_LAYOUT.to_string(),
                colors: LevelColorMap::default_map(),
                opts,
            },
            Box::new(writer),
        )
    }

    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.inner.config.encoding
    }

    /// Reports whether strings that are unsafe to print bare are quoted.
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.inner.config.safe
    }

    /// Reports whether records at `level` are handled.
    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        let min = self
            .inner
            .config
            .opts
            .level
            .as_ref()
            .map_or(Level::FX, |l| l.level());
        level >= min
    }

    /// Encodes `record` and writes it as one line.
    ///
    /// The level is not checked; see [`enabled`](Self::enabled).
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the write fails. Values that cannot be
    /// rendered do not fail the call; they are written as `!ERROR:...`.
    pub fn handle(&self, record: &Record) -> io::Result<()> {
        let inner = &*self.inner;
        let state = HandleState::new(&inner.config, Buffer::new(), "");
        let parts = state.encode_record(inner, record);

        let mut sink = inner.sink.lock().unwrap_or_else(|e| e.into_inner());
        let result = sink.write_all(parts.buf.as_slice());
        drop(sink);

        if let Err(err) = &result {
            debug!(error = %err, bytes = parts.buf.len(), "slog sink write failed");
        }
        parts.buf.free();
        result
    }

    /// Handles a record stamped with the current time, if `level` is
    /// enabled. The caller's location is recorded when sources are on.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the write fails.
    #[track_caller]
    pub fn log(&self, level: Level, message: &str, attrs: &[Attr]) -> io::Result<()> {
        if !self.enabled(level) {
            return Ok(());
        }
        let mut record = Record::now(level, message).with_attrs(attrs.iter().cloned());
        if self.inner.config.opts.add_source {
            record = record.with_source(Source::here());
        }
        self.handle(&record)
    }

    /// Returns a handler that writes `attrs` with every record.
    ///
    /// The attributes are encoded once, here. If every attribute is an empty
    /// group the same handler is returned.
    #[must_use]
    pub fn with_attrs(&self, attrs: &[Attr]) -> Self {
        if attrs.iter().all(|a| a.value.is_empty_group()) {
            return self.clone();
        }

        let inner = &*self.inner;
        let config = &*inner.config;
        let sep = if inner.preformatted.is_empty() {
            ""
        } else {
            config.attr_sep()
        };
        let mut state = HandleState::new(config, Buffer::from_vec(inner.preformatted.clone()), sep);
        state.open_handler_groups(inner);
        for attr in attrs {
            state.append_attr(attr);
        }
        let parts = state.into_parts();

        Self {
            inner: Arc::new(HandlerInner {
                config: Arc::clone(&inner.config),
                preformatted: parts.buf.into_vec(),
                group_prefix: parts.prefix,
                groups: inner.groups.clone(),
                n_open_groups: parts.materialized,
                sink: Arc::clone(&inner.sink),
            }),
        }
    }

    /// Returns a handler that nests all later attributes under `name`.
    ///
    /// Nothing is written for the group until an attribute lands in it.
    #[must_use]
    pub fn with_group(&self, name: &str) -> Self {
        let inner = &*self.inner;
        let mut groups = Vec::with_capacity(inner.groups.len() + 1);
        groups.extend(inner.groups.iter().cloned());
        groups.push(name.to_string());
        Self {
            inner: Arc::new(HandlerInner {
                config: Arc::clone(&inner.config),
                preformatted: inner.preformatted.clone(),
                group_prefix: inner.group_prefix.clone(),
                groups,
                n_open_groups: inner.n_open_groups,
                sink: Arc::clone(&inner.sink),
            }),
        }
    }

    /// Reports whether both handlers are the same binding point.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &*self.inner;
        f.debug_struct("Handler")
            .field("encoding", &inner.config.encoding)
            .field("safe", &inner.config.safe)
            .field("sep", &inner.config.sep)
            .field("groups", &inner.groups)
            .field("n_open_groups", &inner.n_open_groups)
            .field("preformatted_len", &inner.preformatted.len())
            .finish()
    }
}
