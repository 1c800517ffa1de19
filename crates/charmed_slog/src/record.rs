//! Log records and source locations.

use std::panic::Location;

use backtrace::Backtrace;
use chrono::{DateTime, FixedOffset, Local};

use crate::level::Level;
use crate::value::{AnyValue, Attr, Value};

/// A program location attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Source {
    /// Fully qualified function name, empty when unknown.
    pub function: String,
    /// Source file path.
    pub file: String,
    /// Line number, zero when unknown.
    pub line: u32,
}

impl Source {
    /// The location of the caller. Cheap; the function name is left empty.
    #[must_use]
    #[track_caller]
    pub fn here() -> Self {
        let location = Location::caller();
        Self {
            function: String::new(),
            file: location.file().to_string(),
            line: location.line(),
        }
    }

    /// Extracts caller information from the current call stack.
    ///
    /// `skip` is the number of frames above the immediate caller to skip.
    ///
    /// # Performance Warning
    ///
    /// This captures a full backtrace and resolves symbols, which is
    /// 100-1000x slower than formatting a record. Prefer [`Source::here`]
    /// on hot paths.
    #[must_use]
    pub fn capture(skip: usize) -> Option<Self> {
        let bt = Backtrace::new();

        // Skip frames from the backtrace crate and this function.
        for frame in bt.frames().iter().skip(skip + 2) {
            for symbol in frame.symbols() {
                let function = symbol
                    .name()
                    .map(|n| n.to_string())
                    .unwrap_or_default();
                if function.contains("backtrace::") || function.contains("Source::capture") {
                    continue;
                }
                let file = symbol
                    .filename()
                    .and_then(|p| p.to_str())
                    .unwrap_or_default()
                    .to_string();
                return Some(Self {
                    function,
                    file,
                    line: symbol.lineno().unwrap_or(0),
                });
            }
        }

        None
    }

    /// The location as a group of its non-empty fields.
    pub(crate) fn group_value(&self) -> Value {
        let mut attrs = Vec::with_capacity(3);
        if !self.function.is_empty() {
            attrs.push(Attr::string("function", self.function.as_str()));
        }
        if !self.file.is_empty() {
            attrs.push(Attr::string("file", self.file.as_str()));
        }
        if self.line != 0 {
            attrs.push(Attr::int("line", i64::from(self.line)));
        }
        Value::group(attrs)
    }
}

impl AnyValue for Source {
    fn as_source(&self) -> Option<&Source> {
        Some(self)
    }
}

/// One log event.
#[derive(Debug, Clone)]
pub struct Record {
    /// When the event happened; `None` omits the `time` field.
    pub time: Option<DateTime<FixedOffset>>,
    pub level: Level,
    pub message: String,
    /// Where the event was logged; used when the handler reports sources.
    pub source: Option<Source>,
    attrs: Vec<Attr>,
}

impl Record {
    #[must_use]
    pub fn new(
        time: Option<DateTime<FixedOffset>>,
        level: Level,
        message: impl Into<String>,
    ) -> Self {
        Self {
            time,
            level,
            message: message.into(),
            source: None,
            attrs: Vec::new(),
        }
    }

    /// A record stamped with the current local time.
    #[must_use]
    pub fn now(level: Level, message: impl Into<String>) -> Self {
        Self::new(Some(Local::now().fixed_offset()), level, message)
    }

    /// Appends attributes, in order.
    pub fn add_attrs(&mut self, attrs: impl IntoIterator<Item = Attr>) {
        self.attrs.extend(attrs);
    }

    #[must_use]
    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.add_attrs(attrs);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }

    #[must_use]
    pub fn num_attrs(&self) -> usize {
        self.attrs.len()
    }
}
