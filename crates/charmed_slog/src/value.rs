//! Attribute values.
//!
//! [`Value`] is a closed tagged union. Anything that does not fit one of the
//! scalar kinds goes into [`Value::Any`], whose payload advertises what it can
//! do through the optional capabilities of [`AnyValue`]. Deferred values are
//! [`Value::Lazy`] and must be [resolved](Value::resolve) before encoding.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use serde::Serialize;

use crate::error::MarshalError;
use crate::number;
use crate::record::Source;

/// Error currency for [`AnyValue`] capabilities.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Resolution stops after this many nested lazy values.
const MAX_LOG_VALUES: usize = 100;

/// Payload of [`Value::Any`].
///
/// Every method is an optional capability and returns `None` unless the
/// implementor supports it. The encoder checks them in a fixed order:
/// text mode tries [`marshal_text`](Self::marshal_text), then
/// [`as_bytes`](Self::as_bytes), then [`as_error`](Self::as_error); JSON mode tries
/// [`marshal_json`](Self::marshal_json), then [`as_error`](Self::as_error),
/// then bytes and text. The `Debug` form is the last resort.
pub trait AnyValue: fmt::Debug + Send + Sync {
    /// Text rendering used by the text encodings.
    fn marshal_text(&self) -> Option<Result<String, BoxError>> {
        None
    }

    /// JSON rendering used by the JSON encoding.
    fn marshal_json(&self) -> Option<Result<serde_json::Value, BoxError>> {
        None
    }

    /// The payload viewed as an error; both encodings render its message.
    fn as_error(&self) -> Option<&(dyn StdError + 'static)> {
        None
    }

    /// The payload viewed as raw bytes.
    fn as_bytes(&self) -> Option<&[u8]> {
        None
    }

    /// The payload viewed as a program location.
    fn as_source(&self) -> Option<&Source> {
        None
    }
}

/// A value whose computation is deferred until a record is encoded.
///
/// Implemented for every `Fn() -> Value` closure.
pub trait LogValuer: Send + Sync {
    /// Produces the value. May be called more than once.
    fn log_value(&self) -> Value;
}

impl<F> LogValuer for F
where
    F: Fn() -> Value + Send + Sync,
{
    fn log_value(&self) -> Value {
        self()
    }
}

/// Discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    String,
    Int64,
    Uint64,
    Float64,
    Bool,
    Duration,
    Time,
    Group,
    Any,
    Lazy,
}

/// An attribute value.
#[derive(Clone)]
pub enum Value {
    String(String),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Bool(bool),
    /// Signed duration with nanosecond resolution.
    Duration(TimeDelta),
    Time(DateTime<FixedOffset>),
    /// Ordered child attributes. Build with [`Value::group`] so empty child
    /// groups are dropped.
    Group(Vec<Attr>),
    /// Opaque payload, or nil when `None`.
    Any(Option<Arc<dyn AnyValue>>),
    Lazy(Arc<dyn LogValuer>),
}

impl Value {
    /// Builds a group value, dropping children that are empty groups.
    #[must_use]
    pub fn group(attrs: impl IntoIterator<Item = Attr>) -> Self {
        Self::Group(
            attrs
                .into_iter()
                .filter(|a| !a.value.is_empty_group())
                .collect(),
        )
    }

    /// Wraps an opaque payload.
    #[must_use]
    pub fn any(value: impl AnyValue + 'static) -> Self {
        Self::Any(Some(Arc::new(value)))
    }

    /// The nil value.
    #[must_use]
    pub const fn nil() -> Self {
        Self::Any(None)
    }

    /// Wraps an error; JSON renders its message.
    #[must_use]
    pub fn error(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::any(ErrorValue(Arc::new(err)))
    }

    /// Wraps raw bytes.
    #[must_use]
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::any(Bytes(bytes.into()))
    }

    /// Wraps a serializable value; JSON renders its serde representation.
    #[must_use]
    pub fn serialized<T>(value: T) -> Self
    where
        T: Serialize + fmt::Debug + Send + Sync + 'static,
    {
        Self::any(Serialized(value))
    }

    /// Defers computing the value until it is encoded.
    #[must_use]
    pub fn lazy(valuer: impl LogValuer + 'static) -> Self {
        Self::Lazy(Arc::new(valuer))
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::String(_) => Kind::String,
            Self::Int64(_) => Kind::Int64,
            Self::Uint64(_) => Kind::Uint64,
            Self::Float64(_) => Kind::Float64,
            Self::Bool(_) => Kind::Bool,
            Self::Duration(_) => Kind::Duration,
            Self::Time(_) => Kind::Time,
            Self::Group(_) => Kind::Group,
            Self::Any(_) => Kind::Any,
            Self::Lazy(_) => Kind::Lazy,
        }
    }

    /// Reports whether the value is a group with no attributes.
    #[must_use]
    pub fn is_empty_group(&self) -> bool {
        matches!(self, Self::Group(attrs) if attrs.is_empty())
    }

    /// Follows lazy values until a concrete one is produced.
    ///
    /// Resolving an already concrete value returns it unchanged. A chain of
    /// more than 100 lazy values resolves to an error value.
    #[must_use]
    pub fn resolve(self) -> Self {
        let mut value = self;
        for _ in 0..MAX_LOG_VALUES {
            let Self::Lazy(valuer) = &value else {
                return value;
            };
            value = valuer.log_value();
        }
        Self::error(MarshalError::TooManyResolutions(MAX_LOG_VALUES))
    }

    pub(crate) fn as_source(&self) -> Option<&Source> {
        match self {
            Self::Any(Some(any)) => any.as_source(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Int64(n) => f.debug_tuple("Int64").field(n).finish(),
            Self::Uint64(n) => f.debug_tuple("Uint64").field(n).finish(),
            Self::Float64(n) => f.debug_tuple("Float64").field(n).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
            Self::Time(t) => f.debug_tuple("Time").field(t).finish(),
            Self::Group(attrs) => f.debug_tuple("Group").field(attrs).finish(),
            Self::Any(any) => f.debug_tuple("Any").field(any).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Human-readable form, used when a value has no better rendering.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int64(n) => write!(f, "{n}"),
            Self::Uint64(n) => write!(f, "{n}"),
            Self::Float64(n) => number::write_float(f, *n),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Duration(d) => match d.num_nanoseconds() {
                Some(nanos) => number::write_duration(f, nanos),
                None => write!(f, "{d}"),
            },
            Self::Time(t) => write!(f, "{t}"),
            Self::Group(attrs) => {
                f.write_str("[")?;
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{attr}")?;
                }
                f.write_str("]")
            }
            Self::Any(None) => f.write_str("<nil>"),
            Self::Any(Some(any)) => write!(f, "{any:?}"),
            Self::Lazy(valuer) => write!(f, "{}", valuer.log_value()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int64(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int64(i64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Uint64(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Uint64(u64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float64(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<TimeDelta> for Value {
    fn from(d: TimeDelta) -> Self {
        Self::Duration(d)
    }
}

impl From<std::time::Duration> for Value {
    fn from(d: std::time::Duration) -> Self {
        Self::Duration(TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX))
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(t: DateTime<FixedOffset>) -> Self {
        Self::Time(t)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Time(t.fixed_offset())
    }
}

/// A key/value pair.
#[derive(Debug, Clone)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The canonical empty attribute (empty key, nil value). Encoders skip it.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            key: String::new(),
            value: Value::nil(),
        }
    }

    #[must_use]
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, Value::String(value.into()))
    }

    #[must_use]
    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, Value::Int64(value))
    }

    #[must_use]
    pub fn uint(key: impl Into<String>, value: u64) -> Self {
        Self::new(key, Value::Uint64(value))
    }

    #[must_use]
    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, Value::Float64(value))
    }

    #[must_use]
    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, Value::Bool(value))
    }

    #[must_use]
    pub fn duration(key: impl Into<String>, value: TimeDelta) -> Self {
        Self::new(key, Value::Duration(value))
    }

    #[must_use]
    pub fn time(key: impl Into<String>, value: DateTime<FixedOffset>) -> Self {
        Self::new(key, Value::Time(value))
    }

    /// A group attribute; an empty `key` inlines the children.
    #[must_use]
    pub fn group(key: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) -> Self {
        Self::new(key, Value::group(attrs))
    }

    #[must_use]
    pub fn any(key: impl Into<String>, value: impl AnyValue + 'static) -> Self {
        Self::new(key, Value::any(value))
    }

    #[must_use]
    pub fn error(key: impl Into<String>, err: impl StdError + Send + Sync + 'static) -> Self {
        Self::new(key, Value::error(err))
    }

    #[must_use]
    pub fn lazy(key: impl Into<String>, valuer: impl LogValuer + 'static) -> Self {
        Self::new(key, Value::lazy(valuer))
    }

    /// Reports whether this is the canonical empty attribute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && matches!(self.value, Value::Any(None))
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Raw bytes. Text mode quotes them; pretty mode without safe escaping
/// writes them verbatim; JSON renders base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl AnyValue for Bytes {
    fn as_bytes(&self) -> Option<&[u8]> {
        Some(&self.0)
    }
}

/// An error payload.
#[derive(Clone)]
pub struct ErrorValue(pub Arc<dyn StdError + Send + Sync>);

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl AnyValue for ErrorValue {
    fn as_error(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.0)
    }
}

/// A serde-serializable payload.
#[derive(Debug, Clone)]
pub struct Serialized<T>(pub T);

impl<T> AnyValue for Serialized<T>
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn marshal_json(&self) -> Option<Result<serde_json::Value, BoxError>> {
        Some(serde_json::to_value(&self.0).map_err(Into::into))
    }
}

impl AnyValue for serde_json::Value {
    fn marshal_text(&self) -> Option<Result<String, BoxError>> {
        Some(Ok(self.to_string()))
    }

    fn marshal_json(&self) -> Option<Result<serde_json::Value, BoxError>> {
        Some(Ok(self.clone()))
    }
}
