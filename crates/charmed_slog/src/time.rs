//! Timestamp formatting.
//!
//! The RFC 3339 writers emit digits directly instead of going through a
//! generic format string; they run on every record.

use std::fmt::Write;

use chrono::{DateTime, Datelike, FixedOffset, Timelike};

use crate::buffer::Buffer;
use crate::error::MarshalError;

/// Reports whether `t` can be written as RFC 3339 (four-digit year).
pub(crate) fn in_rfc3339_range(t: &DateTime<FixedOffset>) -> bool {
    (0..=9999).contains(&t.year())
}

/// Writes `2006-01-02T15:04:05.000Z07:00`, truncating to milliseconds.
pub(crate) fn write_rfc3339_millis(buf: &mut Buffer, t: &DateTime<FixedOffset>) {
    write_date_time(buf, t);
    buf.write_byte(b'.');
    buf.write_pos_int_width(nanos(t) / 1_000_000, 3);
    write_offset(buf, t);
}

/// Writes `2006-01-02T15:04:05.999999999Z07:00`: the fraction keeps only
/// significant digits and disappears when zero.
pub(crate) fn write_rfc3339_nano(buf: &mut Buffer, t: &DateTime<FixedOffset>) {
    write_date_time(buf, t);
    let mut ns = nanos(t);
    if ns != 0 {
        let mut width = 9;
        while ns % 10 == 0 {
            ns /= 10;
            width -= 1;
        }
        buf.write_byte(b'.');
        buf.write_pos_int_width(ns, width);
    }
    write_offset(buf, t);
}

/// Writes `t` with a strftime-style `layout`.
pub(crate) fn write_layout(
    buf: &mut Buffer,
    t: &DateTime<FixedOffset>,
    layout: &str,
) -> Result<(), MarshalError> {
    let start = buf.len();
    write!(buf, "{}", t.format(layout)).map_err(|_| {
        buf.truncate(start);
        MarshalError::Layout(layout.to_string())
    })
}

fn write_date_time(buf: &mut Buffer, t: &DateTime<FixedOffset>) {
    buf.write_pos_int_width(t.year().unsigned_abs(), 4);
    buf.write_byte(b'-');
    buf.write_pos_int_width(t.month(), 2);
    buf.write_byte(b'-');
    buf.write_pos_int_width(t.day(), 2);
    buf.write_byte(b'T');
    buf.write_pos_int_width(t.hour(), 2);
    buf.write_byte(b':');
    buf.write_pos_int_width(t.minute(), 2);
    buf.write_byte(b':');
    buf.write_pos_int_width(t.second(), 2);
}

/// Sub-second nanoseconds; a leap second folds into the last second.
fn nanos(t: &DateTime<FixedOffset>) -> u32 {
    t.nanosecond().min(999_999_999)
}

fn write_offset(buf: &mut Buffer, t: &DateTime<FixedOffset>) {
    let offset_seconds = t.offset().local_minus_utc();
    if offset_seconds == 0 {
        buf.write_byte(b'Z');
        return;
    }
    let mut offset_minutes = offset_seconds / 60;
    if offset_minutes < 0 {
        buf.write_byte(b'-');
        offset_minutes = -offset_minutes;
    } else {
        buf.write_byte(b'+');
    }
    let offset_minutes = offset_minutes.unsigned_abs();
    buf.write_pos_int_width(offset_minutes / 60, 2);
    buf.write_byte(b':');
    buf.write_pos_int_width(offset_minutes % 60, 2);
}
