//! `&&`, `||`, `!`.  Results are uint16 0/1.

use super::unsupported;
use crate::error::Result;
use crate::value::Value;

pub fn and(left: &Value, right: &Value) -> Result<Value> {
    match left {
        Value::U16(a) => Ok(Value::from(*a != 0 && right.as_u16()? != 0)),
        Value::U32(a) => Ok(Value::from(*a != 0 && right.as_u32()? != 0)),
        _ => Err(unsupported("And", left)),
    }
}

pub fn or(left: &Value, right: &Value) -> Result<Value> {
    match left {
        Value::U16(a) => Ok(Value::from(*a != 0 || right.as_u16()? != 0)),
        Value::U32(a) => Ok(Value::from(*a != 0 || right.as_u32()? != 0)),
        _ => Err(unsupported("Or", left)),
    }
}

/// Logical not; a null or empty string is false.
pub fn not(operand: &Value) -> Value {
    Value::from(match operand {
        Value::U16(a) => *a == 0,
        Value::U32(a) => *a == 0,
        Value::Float(x) => *x == 0.0,
        Value::Str(s) => s.as_ref().map_or(true, |s| s.is_empty()),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
