//! Casting operators: `(float)`, `(int)`, `(short)`, `(string)`.
//!
//! Every cast accepts all four source types.  Numeric narrowing wraps
//! (`(short)0x12345 == 0x2345`), float to integer truncates toward zero, and
//! strings parse their leading numeric prefix with `0` as the fallback for
//! null or unparseable content.

use crate::error::Result;
use crate::format::format_value;
use crate::strbuf;
use crate::value::Value;

/// Default format for integral sources.
pub const INT_FORMAT: &[u8] = b"%d";
/// Default format for float sources.
pub const FLOAT_FORMAT: &[u8] = b"%f";

pub fn to_float(src: &Value) -> Value {
    Value::Float(match src {
        Value::U16(n) => f32::from(*n),
        Value::U32(n) => *n as f32,
        Value::Float(x) => *x,
        Value::Str(s) => s
            .as_ref()
            .map(|s| s.with(parse_leading_float) as f32)
            .unwrap_or(0.0),
    })
}

pub fn to_int(src: &Value) -> Value {
    Value::U32(match src {
        Value::U16(n) => u32::from(*n),
        Value::U32(n) => *n,
        Value::Float(x) => *x as i32 as u32,
        Value::Str(s) => s
            .as_ref()
            .map(|s| s.with(|b| parse_leading_int(b, 10)) as u32)
            .unwrap_or(0),
    })
}

pub fn to_short(src: &Value) -> Value {
    Value::U16(match src {
        Value::U16(n) => *n,
        Value::U32(n) => *n as u16,
        Value::Float(x) => *x as i32 as u16,
        Value::Str(s) => s
            .as_ref()
            .map(|s| s.with(|b| parse_leading_int(b, 10)) as u16)
            .unwrap_or(0),
    })
}

/// Convert `src` to a string, writing into `result`'s buffer.
///
/// `format` overrides the default `%d`/`%f` for numeric sources.  String
/// sources are copied; a null source yields an empty string.
pub fn to_string(result: &mut Value, src: &Value, format: Option<&[u8]>) -> Result<()> {
    let mut slot = match std::mem::take(result) {
        Value::Str(slot) => slot,
        _ => None,
    };
    let outcome = match src {
        Value::Str(s) => {
            let bytes = s.as_ref().map(|s| s.to_vec()).unwrap_or_default();
            strbuf::assign(&mut slot, &bytes).map(|_| ())
        }
        Value::Float(_) => {
            let text = format_value(format.unwrap_or(FLOAT_FORMAT), src);
            strbuf::format_into(&mut slot, &text).map(|_| ())
        }
        _ => {
            let text = format_value(format.unwrap_or(INT_FORMAT), src);
            strbuf::format_into(&mut slot, &text).map(|_| ())
        }
    };
    *result = Value::Str(slot);
    outcome
}

// ── Leading-prefix parsing ────────────────────────────────────────────────────

fn skip_space(b: &[u8]) -> &[u8] {
    let start = b
        .iter()
        .position(|c| !c.is_ascii_whitespace())
        .unwrap_or(b.len());
    &b[start..]
}

/// Parse the leading integer of `b` in `radix` (10 or 16), `strtol`-style:
/// leading whitespace, optional sign, optional `0x` for radix 16.  Stops at
/// the first non-digit; returns 0 when no digits are present.
pub fn parse_leading_int(b: &[u8], radix: u32) -> i64 {
    let mut b = skip_space(b);
    let negative = match b.first() {
        Some(b'-') => {
            b = &b[1..];
            true
        }
        Some(b'+') => {
            b = &b[1..];
            false
        }
        _ => false,
    };
    if radix == 16 && b.len() > 2 && b[0] == b'0' && matches!(b[1], b'x' | b'X') {
        b = &b[2..];
    }
    let mut n: i64 = 0;
    for &c in b {
        let Some(d) = (c as char).to_digit(radix) else {
            break;
        };
        n = n.saturating_mul(i64::from(radix)).saturating_add(i64::from(d));
    }
    if negative {
        -n
    } else {
        n
    }
}

/// Parse the leading floating-point number of `b`, `atof`-style.
pub fn parse_leading_float(b: &[u8]) -> f64 {
    let b = skip_space(b);
    let mut end = 0;
    if matches!(b.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let rest = &b[end..];
    for word in ["infinity", "inf", "nan"] {
        if rest.len() >= word.len() && rest[..word.len()].eq_ignore_ascii_case(word.as_bytes()) {
            let text = String::from_utf8_lossy(&b[..end + word.len()]);
            return text.parse().unwrap_or(0.0);
        }
    }

    let digits = |from: usize| b[from..].iter().take_while(|c| c.is_ascii_digit()).count();
    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if b.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        end += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return 0.0;
    }
    if matches!(b.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(b.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = digits(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }
    std::str::from_utf8(&b[..end])
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
