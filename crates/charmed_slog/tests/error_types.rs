//! Unit tests for charmed_slog error types.
//!
//! Tests verify:
//! - Error creation from parsing and building
//! - Display formatting
//! - Clone and Debug derives

#![allow(clippy::uninlined_format_args)]

use charmed_slog::{ConfigError, HandlerBuilder, Level, MarshalError, ParseLevelError, ParseResult};
use chrono::TimeDelta;
use std::error::Error as StdError;
use std::str::FromStr;

mod creation_tests {
    use super::*;

    #[test]
    fn test_parse_level_error_from_invalid_input() {
        let e = Level::from_str("invalid").unwrap_err();
        assert!(matches!(e, ParseLevelError { .. }));
    }

    #[test]
    fn test_various_invalid_inputs() {
        let invalid_inputs = ["", "foobar", "123", "VERBOSE", "warning", "info+", "-4", "error+x"];

        for input in invalid_inputs {
            assert!(
                Level::from_str(input).is_err(),
                "Expected error for input: {}",
                input
            );
        }
    }

    #[test]
    fn test_offsets_parse() {
        assert_eq!(Level::from_str("info+2").unwrap(), Level::new(2));
        assert_eq!(Level::from_str("Warn-1").unwrap(), Level::new(3));
        assert_eq!(Level::from_str("fxerr").unwrap(), Level::FX_ERROR);
    }

    #[test]
    fn test_config_error_from_builder() {
        let err = HandlerBuilder::new()
            .with_pretty()
            .with_time_layout("%Y-%Q")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeLayout("%Y-%Q".into()));
    }
}

mod display_tests {
    use super::*;

    #[test]
    fn test_display_contains_invalid_value() {
        let e = Level::from_str("badlevel").unwrap_err();
        let msg = format!("{}", e);
        assert!(msg.contains("invalid level"));
        assert!(msg.contains("badlevel"));
    }

    #[test]
    fn test_display_with_empty_string() {
        let e = Level::from_str("").unwrap_err();
        assert_eq!(e.to_string(), "invalid level: \"\"");
    }

    #[test]
    fn test_marshal_error_display() {
        assert_eq!(
            MarshalError::UnsupportedFloat(f64::INFINITY).to_string(),
            "json: unsupported value: +Inf"
        );
        assert_eq!(
            MarshalError::TooManyResolutions(100).to_string(),
            "log_value called more than 100 times"
        );
        assert!(
            MarshalError::DurationOverflow(TimeDelta::MAX)
                .to_string()
                .ends_with("overflows int64 nanoseconds")
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidTimeLayout("%!".into());
        assert_eq!(err.to_string(), "invalid time layout: \"%!\"");
    }
}

mod trait_tests {
    use super::*;

    #[test]
    fn test_parse_level_error_clone_and_debug() {
        let e = Level::from_str("nope").unwrap_err();
        let cloned = e.clone();
        assert_eq!(e.to_string(), cloned.to_string());
        assert!(format!("{:?}", e).contains("ParseLevelError"));
    }

    #[test]
    fn test_errors_implement_std_error() {
        let parse: Box<dyn StdError> = Box::new(Level::from_str("x").unwrap_err());
        assert!(parse.source().is_none());

        let config: Box<dyn StdError + Send + Sync> =
            Box::new(ConfigError::InvalidTimeLayout("%Q".into()));
        assert!(config.source().is_none());

        let marshal: Box<dyn StdError + Send + Sync> = Box::new(MarshalError::YearOutOfRange);
        assert_eq!(marshal.to_string(), "time year outside of range [0,9999]");
    }

    #[test]
    fn test_parse_result_alias() {
        fn parse(s: &str) -> ParseResult<Level> {
            s.parse()
        }
        assert_eq!(parse("debug").unwrap(), Level::DEBUG);
        assert!(parse("loud").is_err());
    }
}
