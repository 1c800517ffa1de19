//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

/// A cloneable writer that collects everything written to it.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears the captured output.
    pub fn take(&self) -> String {
        let mut bytes = self.0.lock().unwrap();
        String::from_utf8(std::mem::take(&mut *bytes)).unwrap()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A writer that always fails.
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 2000-01-02T03:04:05.678901234 at the given UTC offset.
pub fn fixed_time(offset_secs: i32) -> DateTime<FixedOffset> {
    let naive = NaiveDate::from_ymd_opt(2000, 1, 2)
        .unwrap()
        .and_hms_nano_opt(3, 4, 5, 678_901_234)
        .unwrap();
    FixedOffset::east_opt(offset_secs)
        .unwrap()
        .from_local_datetime(&naive)
        .unwrap()
}
