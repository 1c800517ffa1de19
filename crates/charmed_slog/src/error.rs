//! Error types.

use chrono::TimeDelta;
use thiserror::Error;

use crate::number;
use crate::value::BoxError;

/// A value that could not be rendered.
///
/// These never abort a record: the encoder writes `!ERROR:<message>` in place
/// of the value and carries on.
#[derive(Error, Debug)]
pub enum MarshalError {
    /// A capability of an [`AnyValue`](crate::AnyValue) payload failed.
    #[error("{0}")]
    Capability(BoxError),
    /// JSON has no representation for NaN or infinities.
    #[error("json: unsupported value: {}", number::FloatText(*.0))]
    UnsupportedFloat(f64),
    /// RFC 3339 requires a four-digit year.
    #[error("time year outside of range [0,9999]")]
    YearOutOfRange,
    /// The duration does not fit in 64-bit nanoseconds.
    #[error("duration {0} overflows int64 nanoseconds")]
    DurationOverflow(TimeDelta),
    /// The configured time layout failed to render.
    #[error("time layout {0:?} could not be rendered")]
    Layout(String),
    /// A chain of lazy values never produced a concrete one.
    #[error("log_value called more than {0} times")]
    TooManyResolutions(usize),
}

/// Invalid handler configuration, reported by
/// [`HandlerBuilder::build`](crate::HandlerBuilder::build).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The pretty time layout contains an unknown `%` specifier.
    #[error("invalid time layout: {0:?}")]
    InvalidTimeLayout(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marshal_error_messages() {
        assert_eq!(
            MarshalError::UnsupportedFloat(f64::NAN).to_string(),
            "json: unsupported value: NaN"
        );
        assert_eq!(
            MarshalError::UnsupportedFloat(f64::NEG_INFINITY).to_string(),
            "json: unsupported value: -Inf"
        );
        assert_eq!(
            MarshalError::YearOutOfRange.to_string(),
            "time year outside of range [0,9999]"
        );
        assert_eq!(
            MarshalError::Capability("boom".into()).to_string(),
            "boom"
        );
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::InvalidTimeLayout("%Q".into());
        assert_eq!(err.to_string(), "invalid time layout: \"%Q\"");
    }
}
