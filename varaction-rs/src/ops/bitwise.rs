//! `&`, `|`, `^`, `<<`, `>>`.  Integers only.

use super::unsupported;
use crate::error::Result;
use crate::value::Value;

fn integer(
    name: &str,
    left: &Value,
    right: &Value,
    f16: fn(u16, u16) -> u16,
    f32_: fn(u32, u32) -> u32,
) -> Result<Value> {
    match left {
        Value::U16(a) => Ok(Value::U16(f16(*a, right.as_u16()?))),
        Value::U32(a) => Ok(Value::U32(f32_(*a, right.as_u32()?))),
        _ => Err(unsupported(name, left)),
    }
}

pub fn band(left: &Value, right: &Value) -> Result<Value> {
    integer("Band", left, right, |a, b| a & b, |a, b| a & b)
}

pub fn bor(left: &Value, right: &Value) -> Result<Value> {
    integer("Bor", left, right, |a, b| a | b, |a, b| a | b)
}

pub fn xor(left: &Value, right: &Value) -> Result<Value> {
    integer("Xor", left, right, |a, b| a ^ b, |a, b| a ^ b)
}

/// Shift amounts wrap modulo the operand width.
pub fn shl(left: &Value, right: &Value) -> Result<Value> {
    integer(
        "LShift",
        left,
        right,
        |a, b| a.wrapping_shl(u32::from(b)),
        |a, b| a.wrapping_shl(b),
    )
}

pub fn shr(left: &Value, right: &Value) -> Result<Value> {
    integer(
        "RShift",
        left,
        right,
        |a, b| a.wrapping_shr(u32::from(b)),
        |a, b| a.wrapping_shr(b),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
