//! `=`, the compound assignments, and `++`/`--`.
//!
//! Each function mutates the target in place and returns the value the
//! result node takes.  For strings that value shares the target's buffer.
//! Writing the target back to the variable store is the evaluator's job.

use super::{arith, bitwise, unsupported};
use crate::error::Result;
use crate::strbuf;
use crate::value::Value;

/// `left = right`, converting through `left`'s type.
pub fn assign(left: &mut Value, right: &Value) -> Result<Value> {
    match left {
        Value::U16(a) => *a = right.as_u16()?,
        Value::U32(a) => *a = right.as_u32()?,
        Value::Float(a) => *a = right.as_f32()?,
        Value::Str(slot) => {
            let bytes = right
                .as_str_ref()?
                .map(|s| s.to_vec())
                .unwrap_or_default();
            let buf = strbuf::assign(slot, &bytes)?;
            return Ok(Value::Str(Some(buf)));
        }
    }
    Ok(left.clone())
}

fn update(left: &mut Value, right: &Value, f: fn(&Value, &Value) -> Result<Value>) -> Result<Value> {
    let v = f(left, right)?;
    *left = v.clone();
    Ok(v)
}

/// `left += right`; strings append in place.
pub fn plus_equals(left: &mut Value, right: &Value) -> Result<Value> {
    if let Value::Str(slot) = left {
        let Some(src) = right.as_str_ref()? else {
            return Err(unsupported("PlusEquals with null", right));
        };
        let bytes = src.to_vec();
        let buf = strbuf::append(slot, &bytes)?;
        return Ok(Value::Str(Some(buf)));
    }
    update(left, right, arith::sum)
}

pub fn minus_equals(left: &mut Value, right: &Value) -> Result<Value> {
    update(left, right, arith::sub)
}

pub fn times_equals(left: &mut Value, right: &Value) -> Result<Value> {
    update(left, right, arith::mul)
}

pub fn div_equals(left: &mut Value, right: &Value) -> Result<Value> {
    update(left, right, arith::div)
}

pub fn and_equals(left: &mut Value, right: &Value) -> Result<Value> {
    update(left, right, bitwise::band)
}

pub fn or_equals(left: &mut Value, right: &Value) -> Result<Value> {
    update(left, right, bitwise::bor)
}

pub fn xor_equals(left: &mut Value, right: &Value) -> Result<Value> {
    update(left, right, bitwise::xor)
}

/// Which side of the operand a `++`/`--` was written on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fix {
    /// `x++`: the result is the value before the step.
    Post,
    /// `++x`: the result is the value after the step.
    Pre,
}

fn step(name: &str, target: &mut Value, fix: Fix, delta: i8) -> Result<Value> {
    let after = match *target {
        Value::U16(n) => Value::U16(n.wrapping_add_signed(i16::from(delta))),
        Value::U32(n) => Value::U32(n.wrapping_add_signed(i32::from(delta))),
        _ => return Err(unsupported(name, target)),
    };
    let before = std::mem::replace(target, after.clone());
    Ok(match fix {
        Fix::Post => before,
        Fix::Pre => after,
    })
}

pub fn inc(target: &mut Value, fix: Fix) -> Result<Value> {
    step("Inc", target, fix, 1)
}

pub fn dec(target: &mut Value, fix: Fix) -> Result<Value> {
    step("Dec", target, fix, -1)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
