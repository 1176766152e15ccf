//! `==`, `!=`, `>`, `<`, `>=`, `<=`.
//!
//! All comparisons produce a uint16 0/1.  Strings compare byte-wise, with a
//! null string ordering as the empty string.

use std::cmp::Ordering;

use crate::error::Result;
use crate::value::Value;

/// Order `left` against `right` read through `left`'s type.
///
/// `None` when floats are unordered (NaN).
fn order(left: &Value, right: &Value) -> Result<Option<Ordering>> {
    Ok(match left {
        Value::U16(a) => Some(a.cmp(&right.as_u16()?)),
        Value::U32(a) => Some(a.cmp(&right.as_u32()?)),
        Value::Float(a) => a.partial_cmp(&right.as_f32()?),
        Value::Str(a) => Some(Value::cmp_str(a.as_ref(), right.as_str_ref()?)),
    })
}

fn test(left: &Value, right: &Value, pred: fn(Ordering) -> bool) -> Result<Value> {
    Ok(Value::from(order(left, right)?.is_some_and(pred)))
}

pub fn equals(left: &Value, right: &Value) -> Result<Value> {
    test(left, right, Ordering::is_eq)
}

/// Complement of [`equals`].
pub fn not_equals(left: &Value, right: &Value) -> Result<Value> {
    Ok(Value::from(order(left, right)?.map_or(true, Ordering::is_ne)))
}

pub fn gt(left: &Value, right: &Value) -> Result<Value> {
    test(left, right, Ordering::is_gt)
}

pub fn lt(left: &Value, right: &Value) -> Result<Value> {
    test(left, right, Ordering::is_lt)
}

pub fn gte(left: &Value, right: &Value) -> Result<Value> {
    test(left, right, Ordering::is_ge)
}

pub fn lte(left: &Value, right: &Value) -> Result<Value> {
    test(left, right, Ordering::is_le)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
