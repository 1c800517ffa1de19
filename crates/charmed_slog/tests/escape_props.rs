#![allow(clippy::uninlined_format_args)]

mod common;

use charmed_slog::needs_quoting;
use charmed_slog::prelude::*;
use common::Capture;
use proptest::prelude::*;

fn json_line(msg: &str, value: &str) -> serde_json::Value {
    let out = Capture::new();
    let handler = Handler::json(out.clone(), HandlerOptions::default());
    handler
        .handle(&Record::new(None, Level::INFO, msg).with_attrs([Attr::string("s", value)]))
        .unwrap();
    let line = out.take();
    assert!(line.ends_with('\n'));
    serde_json::from_str(line.trim_end_matches('\n')).unwrap()
}

// =============================================================================
// JSON escaping
// =============================================================================

proptest! {
    #[test]
    fn json_strings_survive_a_parse(msg in any::<String>(), value in any::<String>()) {
        let parsed = json_line(&msg, &value);
        prop_assert_eq!(parsed["msg"].as_str(), Some(msg.as_str()));
        prop_assert_eq!(parsed["s"].as_str(), Some(value.as_str()));
    }

    #[test]
    fn json_keys_survive_a_parse(key in "\\PC{0,12}") {
        let out = Capture::new();
        let handler = Handler::json(out.clone(), HandlerOptions::default());
        handler
            .handle(&Record::new(None, Level::INFO, "m").with_attrs([Attr::int(key.clone(), 1)]))
            .unwrap();
        let line = out.take();
        let parsed: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        // Duplicate keys collapse to the last one.
        if key != "msg" && key != "level" {
            prop_assert_eq!(parsed[key.as_str()].as_i64(), Some(1));
        }
    }
}

// =============================================================================
// Text quoting
// =============================================================================

proptest! {
    #[test]
    fn unquoted_text_values_are_verbatim(value in any::<String>()) {
        let out = Capture::new();
        let handler = Handler::text(out.clone(), HandlerOptions::default());
        handler
            .handle(&Record::new(None, Level::INFO, "m").with_attrs([Attr::string("s", value.clone())]))
            .unwrap();
        let line = out.take();
        if needs_quoting(&value) {
            prop_assert!(line.contains("s=\""), "expected quoted value in {:?}", line);
        } else {
            let expected = format!("level=INFO msg=m s={}\n", value);
            prop_assert_eq!(line, expected);
        }
    }

    #[test]
    fn text_lines_never_contain_raw_newlines(value in any::<String>()) {
        let out = Capture::new();
        let handler = Handler::text(out.clone(), HandlerOptions::default());
        handler
            .handle(&Record::new(None, Level::INFO, &value).with_attrs([Attr::string(value.clone(), value.clone())]))
            .unwrap();
        let line = out.take();
        prop_assert_eq!(line.matches('\n').count(), 1);
        prop_assert!(line.ends_with('\n'));
    }
}
