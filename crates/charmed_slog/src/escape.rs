//! String escaping for the text and JSON encodings.

use unicode_general_category::{GeneralCategory, get_general_category};

use crate::buffer::Buffer;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// `SAFE_SET[b]` is true when ASCII byte `b` can appear inside a JSON string
/// without escaping: everything except control bytes, `"` and `\`.
static SAFE_SET: [bool; 128] = {
    let mut set = [true; 128];
    let mut b = 0;
    while b < 0x20 {
        set[b] = false;
        b += 1;
    }
    set[b'"' as usize] = false;
    set[b'\\' as usize] = false;
    set
};

/// Reports whether a text-mode value must be quoted.
///
/// Empty strings, ASCII space, `=`, `"`, control bytes, whitespace and
/// non-printable characters all force quoting. A backslash alone does not.
#[must_use]
pub fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    s.chars().any(|c| {
        if c.is_ascii() {
            let b = c as u8;
            b != b'\\' && (b == b' ' || b == b'=' || !SAFE_SET[b as usize])
        } else {
            c.is_whitespace() || !is_print(c)
        }
    })
}

/// Appends `s` as a double-quoted string with backslash escapes.
///
/// Invalid UTF-8 bytes are written as `\xNN`.
pub(crate) fn append_quoted(buf: &mut Buffer, s: &[u8]) {
    buf.write_byte(b'"');
    for chunk in s.utf8_chunks() {
        for c in chunk.valid().chars() {
            append_escaped_char(buf, c);
        }
        for &b in chunk.invalid() {
            buf.write_str("\\x");
            buf.write_byte(HEX[usize::from(b >> 4)]);
            buf.write_byte(HEX[usize::from(b & 0xF)]);
        }
    }
    buf.write_byte(b'"');
}

fn append_escaped_char(buf: &mut Buffer, c: char) {
    let mut utf8 = [0u8; 4];
    if c == '"' || c == '\\' {
        buf.write_byte(b'\\');
        buf.write_byte(c as u8);
        return;
    }
    if is_print(c) {
        buf.write_str(c.encode_utf8(&mut utf8));
        return;
    }
    match c {
        '\u{07}' => buf.write_str("\\a"),
        '\u{08}' => buf.write_str("\\b"),
        '\u{0C}' => buf.write_str("\\f"),
        '\n' => buf.write_str("\\n"),
        '\r' => buf.write_str("\\r"),
        '\t' => buf.write_str("\\t"),
        '\u{0B}' => buf.write_str("\\v"),
        c if c < ' ' || c == '\u{7F}' => {
            let b = c as u8;
            buf.write_str("\\x");
            buf.write_byte(HEX[usize::from(b >> 4)]);
            buf.write_byte(HEX[usize::from(b & 0xF)]);
        }
        c => {
            let (prefix, digits) = if (c as u32) < 0x10000 {
                ("\\u", 4)
            } else {
                ("\\U", 8)
            };
            buf.write_str(prefix);
            for shift in (0..digits).rev() {
                buf.write_byte(HEX[((c as u32 >> (shift * 4)) & 0xF) as usize]);
            }
        }
    }
}

/// Appends `s` escaped for the inside of a JSON string literal.
///
/// HTML-significant characters (`<`, `>`, `&`) are left as is; U+2028 and
/// U+2029 are always escaped.
pub(crate) fn append_escaped_json(buf: &mut Buffer, s: &str) {
    let bytes = s.as_bytes();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        let escape: &[u8] = match c {
            c if c.is_ascii() && SAFE_SET[c as usize] => continue,
            '\\' => b"\\\\",
            '"' => b"\\\"",
            '\n' => b"\\n",
            '\r' => b"\\r",
            '\t' => b"\\t",
            '\u{2028}' => b"\\u2028",
            '\u{2029}' => b"\\u2029",
            c if c.is_ascii() => {
                let b = c as u8;
                buf.write_bytes(&bytes[start..i]);
                buf.write_str("\\u00");
                buf.write_byte(HEX[usize::from(b >> 4)]);
                buf.write_byte(HEX[usize::from(b & 0xF)]);
                start = i + 1;
                continue;
            }
            _ => continue,
        };
        buf.write_bytes(&bytes[start..i]);
        buf.write_bytes(escape);
        start = i + c.len_utf8();
    }
    buf.write_bytes(&bytes[start..]);
}

/// Reports whether `c` is printable: letters, marks, numbers, punctuation,
/// symbols and the ASCII space.
fn is_print(c: char) -> bool {
    if c.is_ascii() {
        return (' '..='~').contains(&c);
    }
    !matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::SpaceSeparator
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(s: &[u8]) -> String {
        let mut buf = Buffer::new();
        append_quoted(&mut buf, s);
        let out = String::from_utf8(buf.as_slice().to_vec()).unwrap();
        buf.free();
        out
    }

    fn json(s: &str) -> String {
        let mut buf = Buffer::new();
        append_escaped_json(&mut buf, s);
        let out = String::from_utf8(buf.as_slice().to_vec()).unwrap();
        buf.free();
        out
    }

    #[test]
    fn test_needs_quoting() {
        assert!(needs_quoting(""));
        assert!(needs_quoting("hello world"));
        assert!(needs_quoting("key=value"));
        assert!(needs_quoting("has\"quote"));
        assert!(needs_quoting("tab\there"));
        assert!(needs_quoting("nbsp\u{A0}here"));
        assert!(needs_quoting("zero\u{200B}width"));
        assert!(needs_quoting("a\u{0378}b"));
        assert!(needs_quoting("a\u{FFF0}b"));
        assert!(needs_quoting("private\u{E000}use"));
        assert!(!needs_quoting("simple"));
        assert!(!needs_quoting("back\\slash"));
        assert!(!needs_quoting("ünïcødé"));
        assert!(!needs_quoting("a.b/c:d"));
    }

    #[test]
    fn test_append_quoted() {
        assert_eq!(quoted(b"hello world"), "\"hello world\"");
        assert_eq!(quoted(b"say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quoted(b"a\\b"), "\"a\\\\b\"");
        assert_eq!(quoted(b"line1\nline2\t"), "\"line1\\nline2\\t\"");
        assert_eq!(quoted(b"\x00\x1b\x7f"), "\"\\x00\\x1b\\x7f\"");
        assert_eq!(quoted(b"\x07\x08\x0b\x0c\r"), "\"\\a\\b\\v\\f\\r\"");
        assert_eq!(quoted(b""), "\"\"");
        assert_eq!(quoted(b"bad\xffbyte"), "\"bad\\xffbyte\"");
        assert_eq!(quoted("café".as_bytes()), "\"café\"");
        assert_eq!(quoted("\u{2028}".as_bytes()), "\"\\u2028\"");
        assert_eq!(quoted("\u{E0001}".as_bytes()), "\"\\U000e0001\"");
        assert_eq!(quoted("a\u{0378}b".as_bytes()), "\"a\\u0378b\"");
        assert_eq!(quoted("\u{FFF0}".as_bytes()), "\"\\ufff0\"");
        assert_eq!(quoted("\u{A0}".as_bytes()), "\"\\u00a0\"");
    }

    #[test]
    fn test_escape_json() {
        assert_eq!(json("hello"), "hello");
        assert_eq!(json("hello \"world\""), "hello \\\"world\\\"");
        assert_eq!(json("line1\nline2"), "line1\\nline2");
        assert_eq!(json("a\\b\r\t"), "a\\\\b\\r\\t");
        assert_eq!(json("\x00\x1f"), "\\u0000\\u001f");
        assert_eq!(json("\u{2028}x\u{2029}"), "\\u2028x\\u2029");
        assert_eq!(json("<a href='x'>&amp;</a>"), "<a href='x'>&amp;</a>");
        assert_eq!(json("日本語"), "日本語");
        assert_eq!(json("\x7f"), "\x7f");
    }
}
