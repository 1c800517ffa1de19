//! Locale-free number and duration formatting.
//!
//! Floats go through a shortest round-trip decimal expansion and are then
//! laid out either in `%g` style (text encodings) or with JSON's exponent
//! thresholds. The two disagree on several inputs (`1e+06` vs `1000000`),
//! which is why they are separate entry points.

use std::fmt::{self, Write};

/// Shortest decimal digits of a finite float: value = 0.d1d2...dn × 10^dp.
struct Decimal {
    digits: Vec<u8>,
    dp: i32,
    negative: bool,
}

impl Decimal {
    fn of(f: f64) -> Self {
        // `{:e}` yields the shortest digits that round-trip, e.g. "1.25e-7".
        let sci = format!("{:e}", f.abs());
        let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let digits = mantissa.bytes().filter(u8::is_ascii_digit).collect();
        Self {
            digits,
            dp: exp + 1,
            negative: f.is_sign_negative(),
        }
    }

    fn nd(&self) -> i32 {
        self.digits.len() as i32
    }

    fn digit(&self, i: i32) -> char {
        if i < 0 || i >= self.nd() {
            '0'
        } else {
            char::from(self.digits[i as usize])
        }
    }

    /// `d.ddde±XX`; `pad_exp` keeps at least two exponent digits.
    fn write_exp<W: Write>(&self, w: &mut W, pad_exp: bool) -> fmt::Result {
        if self.negative {
            w.write_char('-')?;
        }
        w.write_char(self.digit(0))?;
        if self.nd() > 1 {
            w.write_char('.')?;
            for i in 1..self.nd() {
                w.write_char(self.digit(i))?;
            }
        }
        let exp = self.dp - 1;
        w.write_char('e')?;
        w.write_char(if exp < 0 { '-' } else { '+' })?;
        let exp = exp.unsigned_abs();
        if pad_exp && exp < 10 {
            w.write_char('0')?;
        }
        write!(w, "{exp}")
    }

    /// Plain positional notation with exactly the significant digits.
    fn write_fixed<W: Write>(&self, w: &mut W) -> fmt::Result {
        if self.negative {
            w.write_char('-')?;
        }
        if self.dp > 0 {
            for i in 0..self.dp {
                w.write_char(self.digit(i))?;
            }
        } else {
            w.write_char('0')?;
        }
        let frac = (self.nd() - self.dp).max(0);
        if frac > 0 {
            w.write_char('.')?;
            for i in 0..frac {
                w.write_char(self.digit(self.dp + i))?;
            }
        }
        Ok(())
    }
}

/// Writes `f` the way text encodings show floats: shortest round-trip
/// digits, exponent form when the exponent is below -4 or at least 6.
pub(crate) fn write_float<W: Write>(w: &mut W, f: f64) -> fmt::Result {
    if f.is_nan() {
        return w.write_str("NaN");
    }
    if f.is_infinite() {
        return w.write_str(if f > 0.0 { "+Inf" } else { "-Inf" });
    }
    let d = Decimal::of(f);
    let exp = d.dp - 1;
    if exp < -4 || exp >= 6 {
        d.write_exp(w, true)
    } else {
        d.write_fixed(w)
    }
}

/// Displays a float the way [`write_float`] writes it.
pub(crate) struct FloatText(pub(crate) f64);

impl fmt::Display for FloatText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_float(f, self.0)
    }
}

/// Writes a finite `f` as a JSON number: positional unless
/// `|f| < 1e-6` or `|f| >= 1e21`, negative exponents unpadded.
pub(crate) fn write_json_float<W: Write>(w: &mut W, f: f64) -> fmt::Result {
    let abs = f.abs();
    let d = Decimal::of(f);
    if abs != 0.0 && !(1e-6..1e21).contains(&abs) {
        d.write_exp(w, d.dp - 1 >= 0)
    } else {
        d.write_fixed(w)
    }
}

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Writes a duration in the `72h3m0.5s` form: largest unit hours, seconds
/// with up to nine fraction digits, and `ns`/`µs`/`ms` below one second.
pub(crate) fn write_duration<W: Write>(w: &mut W, nanos: i64) -> fmt::Result {
    let mut buf = [0u8; 32];
    let mut pos = buf.len();
    let mut u = nanos.unsigned_abs();

    if u < NANOS_PER_SECOND {
        pos -= 1;
        buf[pos] = b's';
        pos -= 1;
        let prec = if u == 0 {
            return w.write_str("0s");
        } else if u < NANOS_PER_MICRO {
            buf[pos] = b'n';
            0
        } else if u < NANOS_PER_MILLI {
            pos -= 1;
            buf[pos..pos + 2].copy_from_slice("µ".as_bytes());
            3
        } else {
            buf[pos] = b'm';
            6
        };
        (pos, u) = write_frac(&mut buf, pos, u, prec);
        pos = write_int(&mut buf, pos, u);
    } else {
        pos -= 1;
        buf[pos] = b's';
        (pos, u) = write_frac(&mut buf, pos, u, 9);
        pos = write_int(&mut buf, pos, u % 60);
        u /= 60;
        if u > 0 {
            pos -= 1;
            buf[pos] = b'm';
            pos = write_int(&mut buf, pos, u % 60);
            u /= 60;
            if u > 0 {
                pos -= 1;
                buf[pos] = b'h';
                pos = write_int(&mut buf, pos, u);
            }
        }
    }

    if nanos < 0 {
        pos -= 1;
        buf[pos] = b'-';
    }
    w.write_str(std::str::from_utf8(&buf[pos..]).map_err(|_| fmt::Error)?)
}

/// Writes the low `prec` digits of `v` as a fraction ending at `pos`,
/// dropping trailing zeros (and the point when all are zero).
fn write_frac(buf: &mut [u8], mut pos: usize, mut v: u64, prec: usize) -> (usize, u64) {
    let mut print = false;
    for _ in 0..prec {
        let digit = (v % 10) as u8;
        print = print || digit != 0;
        if print {
            pos -= 1;
            buf[pos] = b'0' + digit;
        }
        v /= 10;
    }
    if print {
        pos -= 1;
        buf[pos] = b'.';
    }
    (pos, v)
}

fn write_int(buf: &mut [u8], mut pos: usize, mut v: u64) -> usize {
    loop {
        pos -= 1;
        buf[pos] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            return pos;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(f: f64) -> String {
        FloatText(f).to_string()
    }

    fn json(f: f64) -> String {
        let mut s = String::new();
        write_json_float(&mut s, f).unwrap();
        s
    }

    fn dur(nanos: i64) -> String {
        let mut s = String::new();
        write_duration(&mut s, nanos).unwrap();
        s
    }

    #[test]
    fn test_text_float() {
        assert_eq!(text(0.0), "0");
        assert_eq!(text(-0.0), "-0");
        assert_eq!(text(1.0), "1");
        assert_eq!(text(2.75), "2.75");
        assert_eq!(text(100.0), "100");
        assert_eq!(text(123456.0), "123456");
        assert_eq!(text(1e6), "1e+06");
        assert_eq!(text(1234567.0), "1.234567e+06");
        assert_eq!(text(0.0001), "0.0001");
        assert_eq!(text(0.00001), "1e-05");
        assert_eq!(text(1.5e-7), "1.5e-07");
        assert_eq!(text(1e100), "1e+100");
        assert_eq!(text(-2.5), "-2.5");
        assert_eq!(text(f64::NAN), "NaN");
        assert_eq!(text(f64::INFINITY), "+Inf");
        assert_eq!(text(f64::NEG_INFINITY), "-Inf");
    }

    #[test]
    fn test_json_float() {
        assert_eq!(json(0.0), "0");
        assert_eq!(json(1.0), "1");
        assert_eq!(json(2.75), "2.75");
        assert_eq!(json(1e6), "1000000");
        assert_eq!(json(1e20), "100000000000000000000");
        assert_eq!(json(1e21), "1e+21");
        assert_eq!(json(1.5e300), "1.5e+300");
        assert_eq!(json(0.000001), "0.000001");
        assert_eq!(json(1e-7), "1e-7");
        assert_eq!(json(1.25e-10), "1.25e-10");
        assert_eq!(json(-0.5), "-0.5");
    }

    #[test]
    fn test_duration() {
        assert_eq!(dur(0), "0s");
        assert_eq!(dur(1), "1ns");
        assert_eq!(dur(1_100), "1.1µs");
        assert_eq!(dur(2_200_000), "2.2ms");
        assert_eq!(dur(1_500_000_000), "1.5s");
        assert_eq!(dur(3_600_000_000_000), "1h0m0s");
        assert_eq!(dur(3_723_500_000_000), "1h2m3.5s");
        assert_eq!(dur(-90_000_000_000), "-1m30s");
        assert_eq!(dur(i64::MIN), "-2562047h47m16.854775808s");
    }
}
