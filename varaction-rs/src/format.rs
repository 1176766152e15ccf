//! printf-style formatting of a single numeric argument.
//!
//! The `to-string` cast accepts a caller-supplied format such as `"%04x"` or
//! `"%.2f V"`.  Every conversion in the format consumes the same argument;
//! length modifiers (`h`, `l`, `ll`, …) are accepted and ignored.
//!
//! Supported conversions: `d i u x X o c f F e E g G s %`.
//!
//! Output past [`FORMAT_CAPACITY`] bytes is never kept, so widths and
//! precisions are clamped to it and formatting stops once the output is full.

use crate::strbuf::FORMAT_CAPACITY;
use crate::value::Value;

#[derive(Debug, Default, Clone, Copy)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
}

/// Format `arg` through `fmt`.
pub fn format_value(fmt: &[u8], arg: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(fmt.len() + 16);
    let mut i = 0;
    while i < fmt.len() && out.len() < FORMAT_CAPACITY {
        let c = fmt[i];
        i += 1;
        if c != b'%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&f) = fmt.get(i) {
            match f {
                b'-' => spec.left = true,
                b'+' => spec.plus = true,
                b' ' => spec.space = true,
                b'0' => spec.zero = true,
                b'#' => spec.alt = true,
                _ => break,
            }
            i += 1;
        }
        spec.width = number(fmt, &mut i);
        if fmt.get(i) == Some(&b'.') {
            i += 1;
            spec.precision = Some(number(fmt, &mut i));
        }
        while matches!(fmt.get(i), Some(b'h' | b'l' | b'L' | b'q' | b'j' | b'z' | b't')) {
            i += 1;
        }

        let Some(&conv) = fmt.get(i) else {
            // Dangling '%' at the end is copied through.
            out.push(b'%');
            break;
        };
        i += 1;

        let (sign, body) = match conv {
            b'%' => {
                out.push(b'%');
                continue;
            }
            b'd' | b'i' => signed(signed_arg(arg), &spec),
            b'u' => (String::new(), int_digits(unsigned_arg(arg), 10, false, &spec)),
            b'x' | b'X' => {
                let n = unsigned_arg(arg);
                let mut s = int_digits(n, 16, conv == b'X', &spec);
                if spec.alt && n != 0 {
                    s.insert_str(0, if conv == b'X' { "0X" } else { "0x" });
                }
                (String::new(), s)
            }
            b'o' => {
                let mut s = int_digits(unsigned_arg(arg), 8, false, &spec);
                if spec.alt && !s.starts_with('0') {
                    s.insert(0, '0');
                }
                (String::new(), s)
            }
            b'c' => {
                let byte = unsigned_arg(arg) as u8;
                pad(&mut out, "", &(byte as char).to_string(), &spec, false);
                continue;
            }
            b's' => {
                let mut s = arg.to_string();
                if let Some(p) = spec.precision {
                    s.truncate(p);
                }
                pad(&mut out, "", &s, &spec, false);
                continue;
            }
            b'f' | b'F' | b'e' | b'E' | b'g' | b'G' => float(float_arg(arg), conv, &spec),
            other => {
                // Unknown conversion: emit it verbatim.
                out.push(b'%');
                out.push(other);
                continue;
            }
        };
        let numeric_zero_pad = spec.zero
            && !spec.left
            && (matches!(conv, b'f' | b'F' | b'e' | b'E' | b'g' | b'G') || spec.precision.is_none());
        pad(&mut out, &sign, &body, &spec, numeric_zero_pad);
    }
    out
}

/// Read a run of decimal digits at `*i`, clamped to [`FORMAT_CAPACITY`].
fn number(fmt: &[u8], i: &mut usize) -> usize {
    let mut n: usize = 0;
    while let Some(d) = fmt.get(*i).filter(|d| d.is_ascii_digit()) {
        n = n.saturating_mul(10).saturating_add(usize::from(d - b'0'));
        *i += 1;
    }
    n.min(FORMAT_CAPACITY)
}

fn signed_arg(arg: &Value) -> i64 {
    match arg {
        Value::U16(n) => i64::from(*n),
        Value::U32(n) => i64::from(*n as i32),
        Value::Float(x) => *x as i64,
        Value::Str(_) => 0,
    }
}

fn unsigned_arg(arg: &Value) -> u64 {
    match arg {
        Value::U16(n) => u64::from(*n),
        Value::U32(n) => u64::from(*n),
        Value::Float(x) => u64::from(*x as i64 as u32),
        Value::Str(_) => 0,
    }
}

fn float_arg(arg: &Value) -> f64 {
    match arg {
        Value::U16(n) => f64::from(*n),
        Value::U32(n) => f64::from(*n),
        Value::Float(x) => f64::from(*x),
        Value::Str(_) => 0.0,
    }
}

fn sign_prefix(negative: bool, spec: &Spec) -> String {
    if negative {
        "-".into()
    } else if spec.plus {
        "+".into()
    } else if spec.space {
        " ".into()
    } else {
        String::new()
    }
}

fn signed(n: i64, spec: &Spec) -> (String, String) {
    (
        sign_prefix(n < 0, spec),
        int_digits(n.unsigned_abs(), 10, false, spec),
    )
}

fn int_digits(n: u64, radix: u32, upper: bool, spec: &Spec) -> String {
    let mut s = match radix {
        16 if upper => format!("{n:X}"),
        16 => format!("{n:x}"),
        8 => format!("{n:o}"),
        _ => n.to_string(),
    };
    if let Some(p) = spec.precision {
        if p == 0 && n == 0 {
            s.clear();
        } else if s.len() < p {
            s.insert_str(0, &"0".repeat(p - s.len()));
        }
    }
    s
}

fn float(x: f64, conv: u8, spec: &Spec) -> (String, String) {
    let upper = conv.is_ascii_uppercase();
    let sign = sign_prefix(x.is_sign_negative() && !x.is_nan(), spec);
    let x = x.abs();
    if !x.is_finite() {
        let s = if x.is_nan() { "nan" } else { "inf" };
        return (sign, if upper { s.to_uppercase() } else { s.into() });
    }
    let precision = spec.precision.unwrap_or(6);
    let body = match conv.to_ascii_lowercase() {
        b'f' => fixed(x, precision, spec.alt),
        b'e' => exponent(x, precision, spec.alt),
        _ => general(x, precision, spec.alt),
    };
    (sign, if upper { body.to_uppercase() } else { body })
}

fn fixed(x: f64, precision: usize, alt: bool) -> String {
    let mut s = format!("{x:.precision$}");
    if alt && precision == 0 {
        s.push('.');
    }
    s
}

/// `d.ddddde±XX`, with at least two exponent digits.
fn exponent(x: f64, precision: usize, alt: bool) -> String {
    let (mantissa, exp) = split_exp(x, precision);
    let mut s = mantissa;
    if alt && precision == 0 {
        s.push('.');
    }
    s.push_str(&format!("e{}{:02}", if exp < 0 { '-' } else { '+' }, exp.unsigned_abs()));
    s
}

fn split_exp(x: f64, precision: usize) -> (String, i32) {
    let s = format!("{x:.precision$e}");
    match s.split_once('e') {
        Some((m, e)) => (m.to_owned(), e.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

fn general(x: f64, precision: usize, alt: bool) -> String {
    let p = precision.max(1);
    let (_, exp) = split_exp(x, p - 1);
    let mut s = if exp < -4 || exp >= p as i32 {
        exponent(x, p - 1, alt)
    } else {
        fixed(x, (p as i32 - 1 - exp) as usize, alt)
    };
    if !alt {
        s = strip_fraction_zeros(&s);
    }
    s
}

fn strip_fraction_zeros(s: &str) -> String {
    let (mantissa, suffix) = match s.find('e') {
        Some(pos) => s.split_at(pos),
        None => (s, ""),
    };
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    format!("{mantissa}{suffix}")
}

fn pad(out: &mut Vec<u8>, sign: &str, body: &str, spec: &Spec, zero_pad: bool) {
    let len = sign.len() + body.len();
    let fill = spec.width.saturating_sub(len);
    if spec.left {
        out.extend_from_slice(sign.as_bytes());
        out.extend_from_slice(body.as_bytes());
        out.extend(std::iter::repeat(b' ').take(fill));
    } else if zero_pad {
        out.extend_from_slice(sign.as_bytes());
        // Keep a 0x/0X prefix ahead of the zero fill.
        let (prefix, digits) = match body.get(..2) {
            Some("0x") | Some("0X") => body.split_at(2),
            _ => ("", body),
        };
        out.extend_from_slice(prefix.as_bytes());
        out.extend(std::iter::repeat(b'0').take(fill));
        out.extend_from_slice(digits.as_bytes());
    } else {
        out.extend(std::iter::repeat(b' ').take(fill));
        out.extend_from_slice(sign.as_bytes());
        out.extend_from_slice(body.as_bytes());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
